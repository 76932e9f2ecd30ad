use crate::{
    account::{Account, AccountDetails, AccountGroup, ProviderId, SerializableAccount},
    error::Result,
    persist::{PersistedState, PersistenceProvider},
    provider::{AccountProvider, Provider},
    providers::{resolve_on_change, resolve_parent_signer, resolved_group},
};
use async_trait::async_trait;
use futures::{
    future::{join_all, BoxFuture},
    stream::BoxStream,
};
use futures_signals::signal::Mutable;
use polkahub_address::{addr_eq, multisig_address, AccountAddress};
use polkahub_config::{HubConfig, MultisigCallIndex};
use polkahub_signer::{MultisigChainApi, MultisigSigner, Signer};
use serde::{Deserialize, Serialize};
use std::{sync::Arc, time::Duration};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultisigInfo {
    pub threshold: u16,
    pub signatories: Vec<AccountAddress>,
    /// the signatory this device signs as
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_signer: Option<SerializableAccount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl MultisigInfo {
    pub fn new(threshold: u16, signatories: Vec<AccountAddress>) -> Self {
        Self {
            threshold,
            signatories,
            parent_signer: None,
            name: None,
        }
    }

    pub fn with_parent(mut self, parent: SerializableAccount) -> Self {
        self.parent_signer = Some(parent);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn address(&self) -> Result<AccountAddress> {
        Ok(multisig_address(&self.signatories, self.threshold)?)
    }
}

#[derive(Clone)]
pub struct MultisigOptions {
    /// Without it multisig accounts can be shown but not signed with
    pub chain: Option<Arc<dyn MultisigChainApi>>,
    pub call_index: MultisigCallIndex,
    pub parent_timeout: Duration,
}

impl Default for MultisigOptions {
    fn default() -> Self {
        Self::from(&HubConfig::default())
    }
}

impl From<&HubConfig> for MultisigOptions {
    fn from(config: &HubConfig) -> Self {
        Self {
            chain: None,
            call_index: config.multisig_call_index,
            parent_timeout: config.parent_timeout(),
        }
    }
}

impl MultisigOptions {
    pub fn with_chain(mut self, chain: Arc<dyn MultisigChainApi>) -> Self {
        self.chain = Some(chain);
        self
    }
}

/// Multisig accounts, signing through one of the signatories held by another provider
#[derive(Clone)]
pub struct MultisigProvider {
    inner: Arc<MultisigInner>,
}

struct MultisigInner {
    infos: PersistedState<Vec<MultisigInfo>>,
    plugins: Mutable<Vec<Provider>>,
    accounts: Mutable<Option<Vec<Account>>>,
    options: MultisigOptions,
}

impl MultisigProvider {
    pub fn new(persist: Arc<dyn PersistenceProvider>, options: MultisigOptions) -> Self {
        Self {
            inner: Arc::new(MultisigInner {
                infos: PersistedState::load(persist, Vec::new()),
                plugins: Mutable::new(Vec::new()),
                accounts: Mutable::new(None),
                options,
            }),
        }
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn multisigs(&self) -> Vec<MultisigInfo> {
        self.inner.infos.get()
    }

    /// Registers the multisig (unless one with the same address exists) and resolves it
    pub async fn add_multisig(&self, info: MultisigInfo) -> Result<Account> {
        let address = info.address()?;
        let added = info.clone();
        self.inner.infos.update(move |infos| {
            let exists = infos
                .iter()
                .any(|i| i.address().is_ok_and(|a| addr_eq(&a, &address)));
            if !exists {
                infos.push(added);
            }
            !exists
        });

        self.inner.to_account(info).await
    }

    pub fn remove_multisig(&self, address: &AccountAddress) {
        self.inner.infos.update(|infos| {
            let len = infos.len();
            infos.retain(|i| !i.address().is_ok_and(|a| addr_eq(&a, address)));
            infos.len() != len
        });
    }

    pub fn set_multisigs(&self, infos: Vec<MultisigInfo>) {
        self.inner.infos.set(infos);
    }
}

impl MultisigInner {
    async fn signer(&self, info: &MultisigInfo, address: &AccountAddress) -> Option<Arc<dyn Signer>> {
        let chain = self.options.chain.clone()?;
        let parent = info.parent_signer.as_ref()?;
        let parent =
            resolve_parent_signer(&self.plugins, parent, self.options.parent_timeout).await?;

        match MultisigSigner::new(
            address.clone(),
            info.threshold,
            &info.signatories,
            parent,
            chain,
            self.options.call_index,
        ) {
            Ok(signer) => Some(Arc::new(signer)),
            Err(e) => {
                tracing::warn!("can't sign for multisig {address}: {e}");
                None
            }
        }
    }

    async fn to_account(&self, info: MultisigInfo) -> Result<Account> {
        let address = info.address()?;
        let signer = self.signer(&info, &address).await;

        Ok(Account::new(ProviderId::MULTISIG, address)
            .with_name(info.name.clone())
            .with_signer(signer)
            .with_details(AccountDetails::Multisig(info)))
    }

    async fn resolve_all(self: Arc<Self>, infos: Vec<MultisigInfo>) -> Vec<Account> {
        join_all(infos.into_iter().map(|info| self.to_account(info)))
            .await
            .into_iter()
            .filter_map(|account| match account {
                Ok(account) => Some(account),
                Err(e) => {
                    tracing::warn!("skipping invalid multisig: {e}");
                    None
                }
            })
            .collect()
    }
}

fn parent_address(account: &Account) -> Option<&AccountAddress> {
    match &account.details {
        AccountDetails::Multisig(info) => info.parent_signer.as_ref().map(|p| &p.address),
        _ => None,
    }
}

#[async_trait]
impl AccountProvider for MultisigProvider {
    fn id(&self) -> ProviderId {
        ProviderId::MULTISIG.into()
    }

    fn account_groups(&self) -> BoxStream<'static, Result<Vec<AccountGroup>>> {
        resolved_group(self.id(), &self.inner.accounts)
    }

    fn serialize(&self, account: &Account) -> SerializableAccount {
        let serialized = SerializableAccount {
            provider: account.provider.clone(),
            address: account.address.clone(),
            name: account.name.clone(),
            extra: None,
        };

        match &account.details {
            AccountDetails::Multisig(info) => match serde_json::to_value(info) {
                Ok(extra) => serialized.with_extra(extra),
                Err(e) => {
                    tracing::warn!("can't serialize multisig {}: {e}", account.address);
                    serialized
                }
            },
            _ => serialized,
        }
    }

    async fn deserialize(&self, account: &SerializableAccount) -> Option<Account> {
        let info = account.extra_as::<MultisigInfo>().or_else(|| {
            self.inner
                .infos
                .get()
                .into_iter()
                .find(|i| i.address().is_ok_and(|a| addr_eq(&a, &account.address)))
        })?;

        match self.inner.to_account(info).await {
            Ok(restored) if addr_eq(&restored.address, &account.address) => Some(restored),
            Ok(restored) => {
                tracing::warn!(
                    "multisig info resolves to {} instead of {}",
                    restored.address,
                    account.address
                );
                None
            }
            Err(e) => {
                tracing::warn!("can't restore multisig {}: {e}", account.address);
                None
            }
        }
    }

    fn accounts_eq(&self, a: &Account, b: &Account) -> bool {
        addr_eq(&a.address, &b.address) && parent_address(a) == parent_address(b)
    }

    fn receive_plugins(&self, plugins: &[Provider]) {
        self.inner.plugins.set(plugins.to_vec());
    }

    fn subscription(&self) -> Option<BoxFuture<'static, Result<()>>> {
        let inner = self.inner.clone();
        Some(resolve_on_change(
            self.inner.infos.signal(),
            &self.inner.plugins,
            self.inner.accounts.clone(),
            move |infos| inner.clone().resolve_all(infos),
        ))
    }
}
