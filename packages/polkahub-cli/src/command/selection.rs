use crate::app::CliApp;
use anyhow::Result;
use clap::Subcommand;
use polkahub::prelude::*;

#[derive(Debug, Clone, Subcommand)]
pub enum SelectionCommand {
    /// Selects an account, remembered across runs
    Select {
        address: String,
        #[arg(long, default_value = ProviderId::READ_ONLY)]
        provider: String,
    },
    Deselect,
    /// Shows the selected account, if it can still be restored
    Selected,
}

impl SelectionCommand {
    pub async fn run(&self, app: &CliApp, log: impl Fn(SelectionLog)) -> Result<()> {
        let selected = &app.context.selected;

        match self {
            SelectionCommand::Select { address, provider } => {
                let account = app.account(provider, AccountAddress::new(address)?).await?;
                // settle any restoration first, so it can't override this
                selected.resolved().await;
                selected.set_account(Some(account));
            }
            SelectionCommand::Deselect => {
                selected.resolved().await;
                selected.set_account(None);
            }
            SelectionCommand::Selected => {
                selected.resolved().await;
            }
        }

        log(SelectionLog::Selected(selected.selected()));
        Ok(())
    }
}

pub enum SelectionLog {
    Selected(Option<Account>),
}
