use crate::{
    account::{Account, AccountGroup, AvailableAccounts, ProviderId},
    provider::Provider,
    providers::wait_for_provider,
    task::{self, TaskGuard},
};
use futures::{future::BoxFuture, FutureExt, StreamExt};
use futures_signals::signal::{Mutable, Signal, SignalExt};
use parking_lot::{Mutex, RwLock};
use polkahub_address::AccountAddress;
use serde::{Deserialize, Serialize};
use std::{
    sync::{Arc, Weak},
    time::Duration,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub name: String,
    pub verified: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub value: u128,
    pub decimals: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
}

pub type IdentityResolver =
    Arc<dyn Fn(AccountAddress) -> BoxFuture<'static, Option<Identity>> + Send + Sync>;
pub type BalanceResolver =
    Arc<dyn Fn(AccountAddress) -> BoxFuture<'static, Option<Balance>> + Send + Sync>;

#[derive(Clone)]
pub struct HubOptions {
    pub identity: IdentityResolver,
    pub balance: BalanceResolver,
}

impl Default for HubOptions {
    fn default() -> Self {
        Self {
            identity: Arc::new(|_| async { None }.boxed()),
            balance: Arc::new(|_| async { None }.boxed()),
        }
    }
}

impl HubOptions {
    pub fn with_identity<F>(mut self, f: F) -> Self
    where
        F: Fn(AccountAddress) -> BoxFuture<'static, Option<Identity>> + Send + Sync + 'static,
    {
        self.identity = Arc::new(f);
        self
    }

    pub fn with_balance<F>(mut self, f: F) -> Self
    where
        F: Fn(AccountAddress) -> BoxFuture<'static, Option<Balance>> + Send + Sync + 'static,
    {
        self.balance = Arc::new(f);
        self
    }
}

/// The registry: a set of providers and the live aggregate of their accounts
///
/// Cloning is cheap and clones share state. The hub tears itself down when the
/// last clone is dropped, or explicitly via [PolkaHub::destroy].
#[derive(Clone)]
pub struct PolkaHub {
    inner: Arc<HubInner>,
}

struct HubInner {
    plugins: Mutable<Vec<Provider>>,
    available: Mutable<AvailableAccounts>,
    entries: Mutex<Vec<Entry>>,
    options: RwLock<HubOptions>,
}

// one per registered provider, the guards stop its tasks on removal
struct Entry {
    provider: Provider,
    groups: Vec<AccountGroup>,
    _accounts: TaskGuard,
    _subscription: Option<TaskGuard>,
}

impl Entry {
    fn start(hub: Weak<HubInner>, provider: Provider) -> Self {
        let accounts = task::spawn(forward_groups(hub, provider.clone()));

        let subscription = provider.subscription().map(|subscription| {
            let id = provider.id();
            task::spawn(async move {
                if let Err(e) = subscription.await {
                    tracing::error!("subscription of provider {id} failed: {e}");
                }
            })
        });

        Self {
            provider,
            groups: Vec::new(),
            _accounts: accounts,
            _subscription: subscription,
        }
    }
}

async fn forward_groups(hub: Weak<HubInner>, provider: Provider) {
    let mut groups = provider.account_groups();

    while let Some(item) = groups.next().await {
        let groups = match item {
            Ok(groups) => groups,
            Err(e) => {
                tracing::error!("provider {} failed to list accounts: {e}", provider.id());
                Vec::new()
            }
        };

        let Some(hub) = hub.upgrade() else {
            break;
        };
        let mut entries = hub.entries.lock();
        if let Some(entry) = entries.iter_mut().find(|e| e.provider.ptr_eq(&provider)) {
            entry.groups = groups;
            hub.recompute(&entries);
        }
    }
}

impl HubInner {
    fn recompute(&self, entries: &[Entry]) {
        let groups = entries.iter().flat_map(|e| e.groups.iter().cloned()).collect();
        self.available.set(AvailableAccounts::new(groups));
    }

    fn teardown(&self, entries: Vec<Entry>) {
        self.available.set(AvailableAccounts::default());
        for entry in &entries {
            entry.provider.receive_plugins(&[]);
        }
        // dropping the entries aborts their tasks
        drop(entries);
    }
}

impl Drop for HubInner {
    fn drop(&mut self) {
        let entries = std::mem::take(self.entries.get_mut());
        for entry in &entries {
            entry.provider.receive_plugins(&[]);
        }
    }
}

impl PolkaHub {
    pub fn new(plugins: Vec<Provider>, options: HubOptions) -> Self {
        let hub = Self {
            inner: Arc::new(HubInner {
                plugins: Mutable::new(Vec::new()),
                available: Mutable::new(AvailableAccounts::default()),
                entries: Mutex::new(Vec::new()),
                options: RwLock::new(options),
            }),
        };
        hub.set_plugins(plugins);
        hub
    }

    /// Replaces the provider set. Instances present before and after keep running,
    /// removed or swapped ones are stopped.
    pub fn set_plugins(&self, plugins: Vec<Provider>) {
        let removed = {
            let mut entries = self.inner.entries.lock();
            let mut previous = std::mem::take(&mut *entries);

            for provider in &plugins {
                let entry = match previous.iter().position(|e| e.provider.ptr_eq(provider)) {
                    Some(index) => previous.swap_remove(index),
                    None => {
                        tracing::debug!("registering provider {}", provider.id());
                        Entry::start(Arc::downgrade(&self.inner), provider.clone())
                    }
                };
                entries.push(entry);
            }

            self.inner.recompute(&entries);
            previous
        };

        for entry in &removed {
            tracing::debug!("removing provider {}", entry.provider.id());
            entry.provider.receive_plugins(&[]);
        }
        drop(removed);

        for provider in &plugins {
            provider.receive_plugins(&plugins);
        }
        self.inner.plugins.set(plugins);
    }

    pub fn plugins(&self) -> Vec<Provider> {
        self.inner.plugins.get_cloned()
    }

    pub fn plugins_signal(&self) -> impl Signal<Item = Vec<Provider>> {
        self.inner.plugins.signal_cloned()
    }

    pub fn plugin(&self, id: &str) -> Option<Provider> {
        self.inner
            .plugins
            .lock_ref()
            .iter()
            .find(|p| p.id() == id)
            .cloned()
    }

    /// Only changes when a different instance takes the id
    pub fn plugin_signal(&self, id: impl Into<ProviderId>) -> impl Signal<Item = Option<Provider>> {
        let id = id.into();
        self.inner
            .plugins
            .signal_ref(move |plugins| plugins.iter().find(|p| p.id() == id).cloned())
            .dedupe_cloned()
    }

    /// `None` if no provider with this id is registered within `timeout`
    pub async fn wait_for_plugin(&self, id: impl Into<ProviderId>, timeout: Duration) -> Option<Provider> {
        wait_for_provider(&self.inner.plugins, &id.into(), timeout).await
    }

    pub fn available_accounts(&self) -> AvailableAccounts {
        self.inner.available.get_cloned()
    }

    pub fn available_accounts_signal(&self) -> impl Signal<Item = AvailableAccounts> {
        self.inner.available.signal_cloned()
    }

    pub fn plugin_accounts(&self, id: impl Into<ProviderId>) -> Vec<Account> {
        self.inner.available.lock_ref().for_provider(&id.into())
    }

    pub fn plugin_accounts_signal(&self, id: impl Into<ProviderId>) -> impl Signal<Item = Vec<Account>> {
        let id = id.into();
        self.inner
            .available
            .signal_ref(move |available| available.for_provider(&id))
    }

    pub fn set_options(&self, options: HubOptions) {
        *self.inner.options.write() = options;
    }

    pub async fn identity(&self, address: AccountAddress) -> Option<Identity> {
        let resolver = self.inner.options.read().identity.clone();
        resolver(address).await
    }

    pub async fn balance(&self, address: AccountAddress) -> Option<Balance> {
        let resolver = self.inner.options.read().balance.clone();
        resolver(address).await
    }

    /// Stops every provider task and lets go of the providers
    pub fn destroy(&self) {
        let entries = std::mem::take(&mut *self.inner.entries.lock());
        self.inner.plugins.set(Vec::new());
        self.inner.teardown(entries);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        account::SerializableAccount,
        error::Result,
        persist::MemoryPersistence,
        provider::AccountProvider,
        providers::{
            multisig::{MultisigInfo, MultisigOptions, MultisigProvider},
            read_only::{ReadOnlyOptions, ReadOnlyProvider},
            wallet_connect::{
                PendingSession, RequiredNamespace, WalletConnectClient, WalletConnectProvider,
                WcNamespace, WcRequest, WcSession,
            },
        },
        test_util::eventually,
    };
    use async_trait::async_trait;
    use std::collections::BTreeMap;

    fn addr(n: u8) -> AccountAddress {
        AccountAddress::from_public_key([n; 32], 0).unwrap()
    }

    fn read_only(addresses: &[u8]) -> ReadOnlyProvider {
        let provider = ReadOnlyProvider::new(
            Arc::new(MemoryPersistence::new()),
            ReadOnlyOptions { fake_signer: true },
        );
        provider.set_accounts(addresses.iter().map(|n| addr(*n)).collect());
        provider
    }

    struct NoClient;

    #[async_trait]
    impl WalletConnectClient for NoClient {
        async fn connect(&self, _namespace: RequiredNamespace) -> Result<PendingSession> {
            Err(crate::error::HubError::wallet_connect("offline"))
        }

        async fn disconnect(&self, _topic: &str) -> Result<()> {
            Ok(())
        }

        async fn request(
            &self,
            _topic: &str,
            _chain_id: &str,
            _request: WcRequest,
        ) -> Result<serde_json::Value> {
            Err(crate::error::HubError::wallet_connect("offline"))
        }
    }

    fn broken_wallet_connect() -> WalletConnectProvider {
        let session = WcSession {
            topic: "t".to_string(),
            namespaces: BTreeMap::from([(
                "polkadot".to_string(),
                WcNamespace {
                    accounts: vec!["garbage".to_string()],
                    methods: vec![],
                    events: vec![],
                },
            )]),
        };
        let persist = MemoryPersistence::with_value(serde_json::to_string(&Some(session)).unwrap());
        WalletConnectProvider::new(Arc::new(NoClient), None, vec![], Arc::new(persist))
    }

    #[tokio::test]
    async fn aggregates_in_provider_order() {
        let first = read_only(&[1, 2]);
        let hub = PolkaHub::new(vec![first.clone().into()], HubOptions::default());

        let available = hub.clone();
        eventually(move || available.available_accounts().len() == 2).await;

        let accounts = hub.plugin_accounts(ProviderId::READ_ONLY);
        assert_eq!(accounts[0].address, addr(1));
        assert_eq!(accounts[1].address, addr(2));

        first.add_account(addr(3));
        let available = hub.clone();
        eventually(move || available.available_accounts().len() == 3).await;

        let by_key = hub.available_accounts().by_key();
        assert_eq!(by_key["readonly"].len(), 3);
    }

    #[tokio::test]
    async fn failing_provider_is_isolated() {
        let hub = PolkaHub::new(
            vec![broken_wallet_connect().into(), read_only(&[1]).into()],
            HubOptions::default(),
        );

        let available = hub.clone();
        eventually(move || available.available_accounts().len() == 1).await;
        assert!(hub.plugin_accounts(ProviderId::WALLET_CONNECT).is_empty());
        assert_eq!(hub.plugin_accounts(ProviderId::READ_ONLY).len(), 1);
    }

    #[tokio::test]
    async fn swapping_providers() {
        let hub = PolkaHub::new(vec![read_only(&[1]).into()], HubOptions::default());
        let first = hub.plugin(ProviderId::READ_ONLY).unwrap();

        // same instance again keeps everything as is
        hub.set_plugins(vec![first.clone()]);
        assert!(hub.plugin(ProviderId::READ_ONLY).unwrap().ptr_eq(&first));

        hub.set_plugins(vec![read_only(&[4, 5]).into()]);
        assert!(!hub.plugin(ProviderId::READ_ONLY).unwrap().ptr_eq(&first));

        let available = hub.clone();
        eventually(move || {
            let accounts = available.plugin_accounts(ProviderId::READ_ONLY);
            accounts.len() == 2 && accounts[0].address == addr(4)
        })
        .await;

        hub.set_plugins(Vec::new());
        assert!(hub.plugin(ProviderId::READ_ONLY).is_none());
        assert!(hub.available_accounts().is_empty());
    }

    #[tokio::test]
    async fn derived_providers_find_parents() {
        let parent = read_only(&[1]);
        let multisig = MultisigProvider::new(
            Arc::new(MemoryPersistence::new()),
            MultisigOptions {
                parent_timeout: Duration::from_millis(500),
                ..Default::default()
            },
        );
        multisig.set_multisigs(vec![MultisigInfo::new(2, vec![addr(1), addr(2)])
            .with_parent(SerializableAccount::new(ProviderId::READ_ONLY, addr(1)))]);

        let hub = PolkaHub::new(
            vec![parent.into(), multisig.into()],
            HubOptions::default(),
        );

        let available = hub.clone();
        eventually(move || available.plugin_accounts(ProviderId::MULTISIG).len() == 1).await;

        hub.destroy();
        assert!(hub.plugins().is_empty());
        assert!(hub.available_accounts().is_empty());
    }

    #[tokio::test]
    async fn resolvers() {
        let hub = PolkaHub::new(Vec::new(), HubOptions::default());
        assert_eq!(hub.identity(addr(1)).await, None);
        assert_eq!(hub.balance(addr(1)).await, None);

        hub.set_options(HubOptions::default().with_balance(|_| {
            async {
                Some(Balance {
                    value: 10_000_000_000,
                    decimals: 10,
                    symbol: Some("DOT".to_string()),
                })
            }
            .boxed()
        }));
        assert_eq!(hub.balance(addr(1)).await.unwrap().value, 10_000_000_000);
        assert_eq!(hub.identity(addr(1)).await, None);
    }

    #[tokio::test]
    async fn plugin_signal_dedupes() {
        let provider: Provider = read_only(&[]).into();
        let hub = PolkaHub::new(vec![provider.clone()], HubOptions::default());

        let mut changes = hub.plugin_signal(ProviderId::READ_ONLY).to_stream().boxed();
        assert!(changes.next().await.unwrap().unwrap().ptr_eq(&provider));

        // re-registering the same instance next to a new provider isn't a change
        hub.set_plugins(vec![provider.clone(), broken_wallet_connect().into()]);
        assert!(task::timeout(Duration::from_millis(20), changes.next()).await.is_none());

        hub.set_plugins(Vec::new());
        assert!(changes.next().await.unwrap().is_none());
    }
}
