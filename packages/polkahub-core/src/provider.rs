use crate::{
    account::{Account, AccountGroup, ProviderId, SerializableAccount},
    error::Result,
    providers::{
        ledger::LedgerProvider, multisig::MultisigProvider, pjs_wallet::PjsWalletProvider,
        proxy::ProxyProvider, read_only::ReadOnlyProvider, vault::VaultProvider,
        wallet_connect::WalletConnectProvider,
    },
};
use async_trait::async_trait;
use futures::{future::BoxFuture, stream::BoxStream, StreamExt};

/// The capability surface every account source implements
#[async_trait]
pub trait AccountProvider: Send + Sync {
    fn id(&self) -> ProviderId;

    /// Replay-latest: every new stream starts with the current groups
    fn account_groups(&self) -> BoxStream<'static, Result<Vec<AccountGroup>>>;

    fn serialize(&self, account: &Account) -> SerializableAccount {
        SerializableAccount {
            provider: account.provider.clone(),
            address: account.address.clone(),
            name: account.name.clone(),
            extra: None,
        }
    }

    /// `None` when the account can't be reconstructed right now
    async fn deserialize(&self, account: &SerializableAccount) -> Option<Account>;

    fn accounts_eq(&self, a: &Account, b: &Account) -> bool {
        a.address == b.address
    }

    /// Called by the hub with the complete provider list whenever it changes
    fn receive_plugins(&self, _plugins: &[Provider]) {}

    /// Background work the hub keeps alive while this provider is registered
    fn subscription(&self) -> Option<BoxFuture<'static, Result<()>>> {
        None
    }
}

#[derive(Clone)]
pub enum Provider {
    ReadOnly(ReadOnlyProvider),
    Ledger(LedgerProvider),
    Vault(VaultProvider),
    PjsWallet(PjsWalletProvider),
    WalletConnect(WalletConnectProvider),
    Multisig(MultisigProvider),
    Proxy(ProxyProvider),
}

macro_rules! dispatch {
    ($self:ident, $p:ident => $body:expr) => {
        match $self {
            Provider::ReadOnly($p) => $body,
            Provider::Ledger($p) => $body,
            Provider::Vault($p) => $body,
            Provider::PjsWallet($p) => $body,
            Provider::WalletConnect($p) => $body,
            Provider::Multisig($p) => $body,
            Provider::Proxy($p) => $body,
        }
    };
}

impl Provider {
    pub fn id(&self) -> ProviderId {
        dispatch!(self, p => p.id())
    }

    pub fn account_groups(&self) -> BoxStream<'static, Result<Vec<AccountGroup>>> {
        dispatch!(self, p => p.account_groups())
    }

    /// All groups flattened
    pub fn accounts(&self) -> BoxStream<'static, Result<Vec<Account>>> {
        self.account_groups()
            .map(|groups| groups.map(|groups| groups.into_iter().flat_map(|g| g.accounts).collect()))
            .boxed()
    }

    pub fn serialize(&self, account: &Account) -> SerializableAccount {
        dispatch!(self, p => p.serialize(account))
    }

    pub async fn deserialize(&self, account: &SerializableAccount) -> Option<Account> {
        dispatch!(self, p => p.deserialize(account).await)
    }

    pub fn accounts_eq(&self, a: &Account, b: &Account) -> bool {
        dispatch!(self, p => p.accounts_eq(a, b))
    }

    pub fn receive_plugins(&self, plugins: &[Provider]) {
        dispatch!(self, p => p.receive_plugins(plugins))
    }

    pub fn subscription(&self) -> Option<BoxFuture<'static, Result<()>>> {
        dispatch!(self, p => p.subscription())
    }

    /// Whether both refer to the same provider instance
    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::ReadOnly(a), Self::ReadOnly(b)) => a.ptr_eq(b),
            (Self::Ledger(a), Self::Ledger(b)) => a.ptr_eq(b),
            (Self::Vault(a), Self::Vault(b)) => a.ptr_eq(b),
            (Self::PjsWallet(a), Self::PjsWallet(b)) => a.ptr_eq(b),
            (Self::WalletConnect(a), Self::WalletConnect(b)) => a.ptr_eq(b),
            (Self::Multisig(a), Self::Multisig(b)) => a.ptr_eq(b),
            (Self::Proxy(a), Self::Proxy(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    pub fn as_read_only(&self) -> Option<&ReadOnlyProvider> {
        match self {
            Self::ReadOnly(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_ledger(&self) -> Option<&LedgerProvider> {
        match self {
            Self::Ledger(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_vault(&self) -> Option<&VaultProvider> {
        match self {
            Self::Vault(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_multisig(&self) -> Option<&MultisigProvider> {
        match self {
            Self::Multisig(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_proxy(&self) -> Option<&ProxyProvider> {
        match self {
            Self::Proxy(p) => Some(p),
            _ => None,
        }
    }
}

// Instance identity, so signals of providers can be deduplicated
impl PartialEq for Provider {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl std::fmt::Debug for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Provider({})", self.id())
    }
}

impl From<ReadOnlyProvider> for Provider {
    fn from(p: ReadOnlyProvider) -> Self {
        Self::ReadOnly(p)
    }
}

impl From<LedgerProvider> for Provider {
    fn from(p: LedgerProvider) -> Self {
        Self::Ledger(p)
    }
}

impl From<VaultProvider> for Provider {
    fn from(p: VaultProvider) -> Self {
        Self::Vault(p)
    }
}

impl From<PjsWalletProvider> for Provider {
    fn from(p: PjsWalletProvider) -> Self {
        Self::PjsWallet(p)
    }
}

impl From<WalletConnectProvider> for Provider {
    fn from(p: WalletConnectProvider) -> Self {
        Self::WalletConnect(p)
    }
}

impl From<MultisigProvider> for Provider {
    fn from(p: MultisigProvider) -> Self {
        Self::Multisig(p)
    }
}

impl From<ProxyProvider> for Provider {
    fn from(p: ProxyProvider) -> Self {
        Self::Proxy(p)
    }
}
