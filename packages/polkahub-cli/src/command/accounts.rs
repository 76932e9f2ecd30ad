use crate::app::CliApp;
use anyhow::Result;
use clap::Subcommand;
use polkahub::prelude::*;

#[derive(Debug, Clone, Subcommand)]
pub enum ReadOnlyCommand {
    /// Adds an address, SS58 or 0x-prefixed public key
    Add { address: String },
    Remove { address: String },
    List,
}

impl ReadOnlyCommand {
    pub async fn run(&self, app: &CliApp, log: impl Fn(ReadOnlyLog)) -> Result<()> {
        match self {
            ReadOnlyCommand::Add { address } => {
                let account = app.read_only.add_account(AccountAddress::new(address)?);
                log(ReadOnlyLog::Added(account.address));
            }
            ReadOnlyCommand::Remove { address } => {
                let address = AccountAddress::new(address)?;
                app.read_only.remove_account(&address);
                log(ReadOnlyLog::Removed(address));
            }
            ReadOnlyCommand::List => {
                log(ReadOnlyLog::List(app.read_only.addresses()));
            }
        }
        Ok(())
    }
}

pub enum ReadOnlyLog {
    Added(AccountAddress),
    Removed(AccountAddress),
    List(Vec<AccountAddress>),
}
