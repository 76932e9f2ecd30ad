use crate::app::CliApp;
use anyhow::Result;
use clap::Subcommand;
use polkahub::prelude::*;

#[derive(Debug, Clone, Subcommand)]
pub enum MultisigCommand {
    Add {
        #[arg(long)]
        threshold: u16,
        /// Repeat for every signatory
        #[arg(long = "signatory", required = true)]
        signatories: Vec<String>,
        /// The signatory to sign as
        #[arg(long)]
        parent: Option<String>,
        #[arg(long, default_value = ProviderId::READ_ONLY)]
        parent_provider: String,
        #[arg(long)]
        name: Option<String>,
    },
    /// Removes a multisig by its own address
    Remove { address: String },
    List,
}

#[derive(Debug, Clone, Subcommand)]
pub enum ProxyCommand {
    Add {
        /// The proxied account
        #[arg(long)]
        real: String,
        /// The delegate that signs
        #[arg(long)]
        parent: String,
        #[arg(long, default_value = ProviderId::READ_ONLY)]
        parent_provider: String,
        #[arg(long)]
        name: Option<String>,
    },
    /// Without `--parent`, removes every proxy of `real`
    Remove {
        #[arg(long)]
        real: String,
        #[arg(long)]
        parent: Option<String>,
    },
    List,
}

pub enum DerivedLog {
    Added(Account),
    Removed(AccountAddress),
    Multisigs(Vec<(AccountAddress, MultisigInfo)>),
    Proxies(Vec<ProxyInfo>),
}

async fn parent_signer(app: &CliApp, provider: &str, address: &str) -> Result<SerializableAccount> {
    let account = app.account(provider, AccountAddress::new(address)?).await?;
    Ok(app.provider(provider)?.serialize(&account))
}

impl MultisigCommand {
    pub async fn run(&self, app: &CliApp, log: impl Fn(DerivedLog)) -> Result<()> {
        match self {
            MultisigCommand::Add {
                threshold,
                signatories,
                parent,
                parent_provider,
                name,
            } => {
                let signatories = signatories
                    .iter()
                    .map(|s| AccountAddress::new(s))
                    .collect::<std::result::Result<Vec<_>, _>>()?;

                let mut info = MultisigInfo::new(*threshold, signatories);
                if let Some(parent) = parent {
                    info = info.with_parent(parent_signer(app, parent_provider, parent).await?);
                }
                if let Some(name) = name {
                    info = info.with_name(name);
                }

                log(DerivedLog::Added(app.multisig.add_multisig(info).await?));
            }
            MultisigCommand::Remove { address } => {
                let address = AccountAddress::new(address)?;
                app.multisig.remove_multisig(&address);
                log(DerivedLog::Removed(address));
            }
            MultisigCommand::List => {
                let multisigs = app
                    .multisig
                    .multisigs()
                    .into_iter()
                    .map(|info| Ok((info.address()?, info)))
                    .collect::<Result<Vec<_>>>()?;
                log(DerivedLog::Multisigs(multisigs));
            }
        }
        Ok(())
    }
}

impl ProxyCommand {
    pub async fn run(&self, app: &CliApp, log: impl Fn(DerivedLog)) -> Result<()> {
        match self {
            ProxyCommand::Add {
                real,
                parent,
                parent_provider,
                name,
            } => {
                let mut info = ProxyInfo::new(
                    AccountAddress::new(real)?,
                    parent_signer(app, parent_provider, parent).await?,
                );
                if let Some(name) = name {
                    info = info.with_name(name);
                }

                log(DerivedLog::Added(app.proxy.add_proxy(info).await));
            }
            ProxyCommand::Remove { real, parent } => {
                let real = AccountAddress::new(real)?;
                let parent = parent.as_deref().map(AccountAddress::new).transpose()?;
                app.proxy.remove_proxy(&real, parent.as_ref());
                log(DerivedLog::Removed(real));
            }
            ProxyCommand::List => {
                log(DerivedLog::Proxies(app.proxy.proxies()));
            }
        }
        Ok(())
    }
}
