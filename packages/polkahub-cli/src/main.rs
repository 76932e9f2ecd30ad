use anyhow::{anyhow, Result};
use clap::Parser;
use polkahub::prelude::*;
use polkahub_cli::{
    app::CliApp,
    args::CliArgs,
    command::{Command, DerivedLog, ReadOnlyLog, SelectionLog, VaultLog},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();
    let config = HubConfig::load(&args.config)?;

    let mut tracing_env = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(config.log_level.as_str().parse()?);
    for directive in &config.tracing_directives {
        tracing_env = tracing_env.add_directive(directive.parse()?);
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .without_time()
                .with_target(false),
        )
        .with(tracing_env)
        .try_init()
        .map_err(|e| anyhow!("{e}"))?;

    // framing needs no accounts
    if let Command::Vault(command) = &args.command {
        return command.run(&config, print_vault);
    }

    let app = CliApp::new(config, args.storage_dir)?;
    match &args.command {
        Command::ReadOnly(command) => command.run(&app, print_read_only).await,
        Command::Multisig(command) => command.run(&app, print_derived).await,
        Command::Proxy(command) => command.run(&app, print_derived).await,
        Command::Selection(command) => command.run(&app, print_selection).await,
        Command::Vault(command) => command.run(&app.config, print_vault),
    }
}

fn describe(account: &Account) -> String {
    let mut line = format!("{} ({})", account.address, account.provider);
    if let Some(name) = &account.name {
        line.push_str(&format!(" \"{name}\""));
    }
    if !account.can_sign() {
        line.push_str(" [watch-only]");
    }
    line
}

fn print_read_only(log: ReadOnlyLog) {
    match log {
        ReadOnlyLog::Added(address) => println!("added {address}"),
        ReadOnlyLog::Removed(address) => println!("removed {address}"),
        ReadOnlyLog::List(addresses) => {
            for address in addresses {
                println!("{address}");
            }
        }
    }
}

fn print_derived(log: DerivedLog) {
    match log {
        DerivedLog::Added(account) => println!("added {}", describe(&account)),
        DerivedLog::Removed(address) => println!("removed {address}"),
        DerivedLog::Multisigs(multisigs) => {
            for (address, info) in multisigs {
                println!(
                    "{address} {}/{} {}",
                    info.threshold,
                    info.signatories.len(),
                    info.name.unwrap_or_default()
                );
            }
        }
        DerivedLog::Proxies(proxies) => {
            for info in proxies {
                println!(
                    "{} via {} ({}) {}",
                    info.real,
                    info.parent_signer.address,
                    info.parent_signer.provider,
                    info.name.unwrap_or_default()
                );
            }
        }
    }
}

fn print_selection(log: SelectionLog) {
    match log {
        SelectionLog::Selected(Some(account)) => println!("selected {}", describe(&account)),
        SelectionLog::Selected(None) => println!("nothing selected"),
    }
}

fn print_vault(log: VaultLog) {
    match log {
        VaultLog::Frames(frames) => {
            for frame in frames {
                println!("{frame}");
            }
        }
        VaultLog::Payload(payload) => println!("{payload}"),
    }
}
