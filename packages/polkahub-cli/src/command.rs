mod accounts;
mod derived;
mod selection;
mod vault;

pub use accounts::{ReadOnlyCommand, ReadOnlyLog};
pub use derived::{DerivedLog, MultisigCommand, ProxyCommand};
pub use selection::{SelectionCommand, SelectionLog};
pub use vault::{VaultCommand, VaultLog};

use clap::Subcommand;

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Watch-only addresses
    #[command(subcommand)]
    ReadOnly(ReadOnlyCommand),
    /// Multisig accounts signing through a read-only signatory
    #[command(subcommand)]
    Multisig(MultisigCommand),
    /// Proxied accounts
    #[command(subcommand)]
    Proxy(ProxyCommand),
    #[command(flatten)]
    Selection(SelectionCommand),
    /// Polkadot Vault QR framing
    #[command(subcommand)]
    Vault(VaultCommand),
}
