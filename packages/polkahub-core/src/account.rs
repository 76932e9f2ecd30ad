use crate::providers::{
    ledger::LedgerAccountInfo, multisig::MultisigInfo, proxy::ProxyInfo, vault::GenesisHash,
};
use polkahub_address::AccountAddress;
use polkahub_signer::Signer;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fmt, sync::Arc};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProviderId(String);

impl ProviderId {
    pub const READ_ONLY: &'static str = "readonly";
    pub const LEDGER: &'static str = "ledger";
    pub const VAULT: &'static str = "polkadot-vault";
    pub const PJS_WALLET: &'static str = "pjs-wallet";
    pub const WALLET_CONNECT: &'static str = "walletconnect";
    pub const MULTISIG: &'static str = "multisig";
    pub const PROXY: &'static str = "proxy";

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProviderId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl PartialEq<str> for ProviderId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for ProviderId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Whatever a provider needs to recognise one of its own accounts
#[derive(Debug, Clone, PartialEq, Default)]
pub enum AccountDetails {
    #[default]
    None,
    Ledger(LedgerAccountInfo),
    Vault {
        genesis: GenesisHash,
    },
    PjsWallet {
        extension: String,
    },
    WalletConnect {
        topic: String,
    },
    Multisig(MultisigInfo),
    Proxy(ProxyInfo),
}

/// An account as handed out by a provider
/// These are recreated whenever the provider's list changes, so hold on to the
/// serialized form (or use the provider's `accounts_eq`) to track one across updates
#[derive(Clone)]
pub struct Account {
    pub provider: ProviderId,
    pub address: AccountAddress,
    pub name: Option<String>,
    /// `None` when the account can be shown but can't sign right now
    pub signer: Option<Arc<dyn Signer>>,
    pub details: AccountDetails,
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("provider", &self.provider)
            .field("address", &self.address)
            .field("name", &self.name)
            .field("can_sign", &self.signer.is_some())
            .field("details", &self.details)
            .finish()
    }
}

impl Account {
    pub fn new(provider: impl Into<ProviderId>, address: AccountAddress) -> Self {
        Self {
            provider: provider.into(),
            address,
            name: None,
            signer: None,
            details: AccountDetails::None,
        }
    }

    pub fn with_name(mut self, name: Option<String>) -> Self {
        self.name = name;
        self
    }

    pub fn with_signer(mut self, signer: Option<Arc<dyn Signer>>) -> Self {
        self.signer = signer;
        self
    }

    pub fn with_details(mut self, details: AccountDetails) -> Self {
        self.details = details;
        self
    }

    pub fn can_sign(&self) -> bool {
        self.signer.is_some()
    }
}

/// The durable projection of an account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializableAccount {
    pub provider: ProviderId,
    pub address: AccountAddress,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<serde_json::Value>,
}

impl SerializableAccount {
    pub fn new(provider: impl Into<ProviderId>, address: AccountAddress) -> Self {
        Self {
            provider: provider.into(),
            address,
            name: None,
            extra: None,
        }
    }

    pub fn with_extra(mut self, extra: serde_json::Value) -> Self {
        self.extra = Some(extra);
        self
    }

    /// `extra` parsed as `T`, `None` if it's missing or doesn't fit
    pub fn extra_as<T: serde::de::DeserializeOwned>(&self) -> Option<T> {
        let extra = self.extra.clone()?;
        match serde_json::from_value(extra) {
            Ok(extra) => Some(extra),
            Err(e) => {
                tracing::warn!("unexpected extra for {} account: {e}", self.provider);
                None
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct AccountGroup {
    pub provider: ProviderId,
    /// the provider id for single-group providers, the extension name for injected wallets
    pub key: String,
    pub accounts: Vec<Account>,
}

impl AccountGroup {
    pub fn new(provider: ProviderId, accounts: Vec<Account>) -> Self {
        Self {
            key: provider.to_string(),
            provider,
            accounts,
        }
    }

    pub fn keyed(provider: ProviderId, key: impl ToString, accounts: Vec<Account>) -> Self {
        Self {
            provider,
            key: key.to_string(),
            accounts,
        }
    }
}

/// Everything the hub knows about, in provider order
#[derive(Debug, Clone, Default)]
pub struct AvailableAccounts {
    groups: Vec<AccountGroup>,
}

impl AvailableAccounts {
    pub fn new(groups: Vec<AccountGroup>) -> Self {
        Self { groups }
    }

    pub fn groups(&self) -> &[AccountGroup] {
        &self.groups
    }

    pub fn by_key(&self) -> HashMap<String, Vec<Account>> {
        let mut map: HashMap<String, Vec<Account>> = HashMap::new();
        for group in &self.groups {
            map.entry(group.key.clone())
                .or_default()
                .extend(group.accounts.iter().cloned());
        }
        map
    }

    pub fn for_provider(&self, provider: &ProviderId) -> Vec<Account> {
        self.groups
            .iter()
            .filter(|g| &g.provider == provider)
            .flat_map(|g| g.accounts.iter().cloned())
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Account> {
        self.groups.iter().flat_map(|g| g.accounts.iter())
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }
}
