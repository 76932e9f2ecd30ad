use crate::{
    account::{Account, AccountDetails, AccountGroup, ProviderId, SerializableAccount},
    error::{HubError, Result},
    persist::{PersistedState, PersistenceProvider},
    provider::AccountProvider,
    task::{self, TaskGuard},
};
use async_trait::async_trait;
use futures::{
    future::{ready, BoxFuture},
    stream::BoxStream,
    FutureExt, StreamExt,
};
use futures_signals::signal::{Mutable, Signal, SignalExt};
use polkahub_address::AccountAddress;
use polkahub_config::HubConfig;
use polkahub_signer::Signer;
use std::{collections::HashMap, sync::Arc, time::Duration};

// how often to look for extensions until the first one shows up
const FAST_POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Clone)]
pub struct InjectedAccount {
    pub address: AccountAddress,
    pub name: Option<String>,
    pub signer: Arc<dyn Signer>,
}

/// Whatever injects wallet extensions into the environment
#[async_trait]
pub trait ExtensionHost: Send + Sync {
    fn injected_extensions(&self) -> Vec<String>;

    /// Fails with [HubError::PendingAuthorization] while the user hasn't answered yet
    async fn connect(&self, name: &str) -> Result<Arc<dyn InjectedExtension>>;
}

pub trait InjectedExtension: Send + Sync {
    fn name(&self) -> String;

    fn accounts(&self) -> Vec<InjectedAccount>;

    /// Yields whenever the extension's accounts change
    fn subscribe(&self) -> BoxStream<'static, ()>;

    fn disconnect(&self);
}

#[derive(Debug, Clone)]
pub struct PjsWalletOptions {
    pub poll_interval: Duration,
    pub retry_delay: Duration,
    pub deserialize_timeout: Duration,
}

impl Default for PjsWalletOptions {
    fn default() -> Self {
        Self::from(&HubConfig::default())
    }
}

impl From<&HubConfig> for PjsWalletOptions {
    fn from(config: &HubConfig) -> Self {
        Self {
            poll_interval: config.extension_poll_interval(),
            retry_delay: config.extension_retry_delay(),
            deserialize_timeout: config.extension_timeout(),
        }
    }
}

/// Browser-injected wallets, one account group per connected extension
#[derive(Clone)]
pub struct PjsWalletProvider {
    inner: Arc<PjsInner>,
}

struct PjsInner {
    host: Arc<dyn ExtensionHost>,
    options: PjsWalletOptions,
    available: Mutable<Vec<String>>,
    connected: PersistedState<Vec<String>>,
    groups: Mutable<Vec<AccountGroup>>,
}

impl PjsWalletProvider {
    pub fn new(
        host: Arc<dyn ExtensionHost>,
        persist: Arc<dyn PersistenceProvider>,
        options: PjsWalletOptions,
    ) -> Self {
        Self {
            inner: Arc::new(PjsInner {
                host,
                options,
                available: Mutable::new(Vec::new()),
                connected: PersistedState::load(persist, Vec::new()),
                groups: Mutable::new(Vec::new()),
            }),
        }
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn available_extensions(&self) -> Vec<String> {
        self.inner.available.get_cloned()
    }

    pub fn available_extensions_signal(&self) -> impl Signal<Item = Vec<String>> {
        self.inner.available.signal_cloned()
    }

    pub fn connected_extensions(&self) -> Vec<String> {
        self.inner.connected.get()
    }

    pub fn connected_extensions_signal(&self) -> impl Signal<Item = Vec<String>> {
        self.inner.connected.signal()
    }

    pub fn set_connected_extensions(&self, names: Vec<String>) {
        self.inner.connected.set(names);
    }

    pub fn connect_extension(&self, name: &str) {
        self.inner.connected.update(|names| {
            if names.iter().any(|n| n == name) {
                false
            } else {
                names.push(name.to_string());
                true
            }
        });
    }

    pub fn disconnect_extension(&self, name: &str) {
        self.inner.forget(name);
    }
}

impl PjsInner {
    fn forget(&self, name: &str) {
        self.connected.update(|names| {
            let len = names.len();
            names.retain(|n| n != name);
            names.len() != len
        });
    }

    fn set_group(&self, name: &str, accounts: Vec<Account>) {
        let order = self.connected.get();
        let mut groups = self.groups.lock_mut();
        groups.retain(|g| g.key != name);
        groups.push(AccountGroup::keyed(
            ProviderId::PJS_WALLET.into(),
            name,
            accounts,
        ));
        groups.sort_by_key(|g| order.iter().position(|n| n == &g.key).unwrap_or(usize::MAX));
    }

    fn retain_groups(&self, names: &[String]) {
        if self.groups.lock_ref().iter().any(|g| !names.contains(&g.key)) {
            self.groups.lock_mut().retain(|g| names.contains(&g.key));
        }
    }

    async fn poll_available(self: Arc<Self>) {
        let mut found = false;
        loop {
            let extensions = self.host.injected_extensions();
            found |= !extensions.is_empty();
            self.available.set_neq(extensions);

            task::sleep(if found {
                self.options.poll_interval
            } else {
                FAST_POLL_INTERVAL
            })
            .await;
        }
    }

    /// Keeps exactly one connection task per connected extension
    async fn manage_connections(self: Arc<Self>) {
        let mut tasks: HashMap<String, TaskGuard> = HashMap::new();
        let inner = self.clone();

        self.connected
            .signal()
            .for_each(move |names| {
                tasks.retain(|name, _| names.contains(name));
                inner.retain_groups(&names);

                for name in names {
                    if !tasks.contains_key(&name) {
                        let guard = task::spawn(inner.clone().run_extension(name.clone()));
                        tasks.insert(name, guard);
                    }
                }
                ready(())
            })
            .await;
    }

    async fn run_extension(self: Arc<Self>, name: String) {
        let wanted = name.clone();
        self.available
            .signal_ref(move |available| available.contains(&wanted))
            .wait_for(true)
            .await;

        let extension = loop {
            match self.host.connect(&name).await {
                Ok(extension) => break extension,
                Err(HubError::PendingAuthorization(_)) => {
                    tracing::debug!("{name} is waiting on the user, retrying");
                    task::sleep(self.options.retry_delay).await;
                }
                Err(e) => {
                    tracing::error!("failed to connect to {name}: {e}");
                    self.forget(&name);
                    return;
                }
            }
        };

        tracing::debug!("connected to {name}");
        let _connection = Connection(extension.clone());
        let mut updates = extension.subscribe();

        loop {
            let accounts = extension
                .accounts()
                .into_iter()
                .map(|injected| to_account(&name, injected))
                .collect();
            self.set_group(&name, accounts);

            if updates.next().await.is_none() {
                break;
            }
        }

        // stay connected until this extension is dropped from the list
        futures::future::pending::<()>().await;
    }
}

// Disconnects when the task owning it goes away
struct Connection(Arc<dyn InjectedExtension>);

impl Drop for Connection {
    fn drop(&mut self) {
        tracing::debug!("disconnecting from {}", self.0.name());
        self.0.disconnect();
    }
}

fn to_account(extension: &str, injected: InjectedAccount) -> Account {
    Account::new(ProviderId::PJS_WALLET, injected.address)
        .with_name(injected.name)
        .with_signer(Some(injected.signer))
        .with_details(AccountDetails::PjsWallet {
            extension: extension.to_string(),
        })
}

fn extension_of(account: &Account) -> Option<&str> {
    match &account.details {
        AccountDetails::PjsWallet { extension } => Some(extension),
        _ => None,
    }
}

#[async_trait]
impl AccountProvider for PjsWalletProvider {
    fn id(&self) -> ProviderId {
        ProviderId::PJS_WALLET.into()
    }

    fn account_groups(&self) -> BoxStream<'static, Result<Vec<AccountGroup>>> {
        self.inner.groups.signal_cloned().to_stream().map(Ok).boxed()
    }

    fn serialize(&self, account: &Account) -> SerializableAccount {
        let mut serialized = SerializableAccount::new(account.provider.clone(), account.address.clone());
        serialized.name = account.name.clone();
        serialized.extra = extension_of(account).map(|ext| serde_json::Value::String(ext.to_string()));
        serialized
    }

    /// Waits a little for the extension to connect and report the account
    async fn deserialize(&self, account: &SerializableAccount) -> Option<Account> {
        let extension: String = account.extra_as()?;
        let address = account.address.clone();

        let mut found = self
            .inner
            .groups
            .signal_ref(move |groups| {
                groups
                    .iter()
                    .find(|g| g.key == extension)
                    .and_then(|g| g.accounts.iter().find(|a| a.address == address))
                    .cloned()
            })
            .to_stream()
            .filter_map(ready);

        task::timeout(self.inner.options.deserialize_timeout, found.next())
            .await
            .flatten()
    }

    fn accounts_eq(&self, a: &Account, b: &Account) -> bool {
        a.address == b.address && extension_of(a) == extension_of(b)
    }

    fn subscription(&self) -> Option<BoxFuture<'static, Result<()>>> {
        let inner = self.inner.clone();
        Some(
            async move {
                futures::future::join(
                    inner.clone().poll_available(),
                    inner.manage_connections(),
                )
                .await;
                Ok(())
            }
            .boxed(),
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{persist::MemoryPersistence, test_util::eventually};
    use polkahub_signer::FakeSigner;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    struct MockExtension {
        name: String,
        accounts: Mutable<Vec<InjectedAccount>>,
        disconnected: AtomicBool,
    }

    impl InjectedExtension for MockExtension {
        fn name(&self) -> String {
            self.name.clone()
        }

        fn accounts(&self) -> Vec<InjectedAccount> {
            self.accounts.get_cloned()
        }

        fn subscribe(&self) -> BoxStream<'static, ()> {
            self.accounts.signal_ref(|_| ()).to_stream().skip(1).boxed()
        }

        fn disconnect(&self) {
            self.disconnected.store(true, Ordering::SeqCst);
        }
    }

    #[derive(Default)]
    struct MockHost {
        available: parking_lot::Mutex<Vec<String>>,
        extensions: parking_lot::Mutex<HashMap<String, Arc<MockExtension>>>,
        pending_authorizations: AtomicUsize,
    }

    impl MockHost {
        fn inject(&self, name: &str, accounts: Vec<InjectedAccount>) -> Arc<MockExtension> {
            let extension = Arc::new(MockExtension {
                name: name.to_string(),
                accounts: Mutable::new(accounts),
                disconnected: AtomicBool::new(false),
            });
            self.available.lock().push(name.to_string());
            self.extensions
                .lock()
                .insert(name.to_string(), extension.clone());
            extension
        }
    }

    #[async_trait]
    impl ExtensionHost for MockHost {
        fn injected_extensions(&self) -> Vec<String> {
            self.available.lock().clone()
        }

        async fn connect(&self, name: &str) -> Result<Arc<dyn InjectedExtension>> {
            let remaining = self.pending_authorizations.load(Ordering::SeqCst);
            if remaining > 0 {
                self.pending_authorizations.store(remaining - 1, Ordering::SeqCst);
                return Err(HubError::PendingAuthorization(name.to_string()));
            }

            match self.extensions.lock().get(name) {
                Some(ext) => Ok(ext.clone() as Arc<dyn InjectedExtension>),
                None => Err(HubError::extension(format!("{name} refused"))),
            }
        }
    }

    fn injected(n: u8) -> InjectedAccount {
        InjectedAccount {
            address: AccountAddress::from_public_key([n; 32], 42).unwrap(),
            name: Some(format!("account {n}")),
            signer: Arc::new(FakeSigner::new([n; 32])),
        }
    }

    fn options() -> PjsWalletOptions {
        PjsWalletOptions {
            poll_interval: Duration::from_millis(10),
            retry_delay: Duration::from_millis(10),
            deserialize_timeout: Duration::from_millis(500),
        }
    }

    #[tokio::test]
    async fn connects_and_follows_accounts() {
        let host = Arc::new(MockHost::default());
        host.pending_authorizations.store(2, Ordering::SeqCst);
        let talisman = host.inject("talisman", vec![injected(1)]);

        let persist = Arc::new(MemoryPersistence::new());
        let provider = PjsWalletProvider::new(host.clone(), persist.clone(), options());
        provider.connect_extension("talisman");
        assert_eq!(persist.load().as_deref(), Some(r#"["talisman"]"#));

        let _sub = task::spawn(provider.subscription().unwrap().map(|_| ()));

        let groups = provider.clone();
        eventually(move || groups.inner.groups.lock_ref().len() == 1).await;
        assert_eq!(provider.inner.groups.lock_ref()[0].key, "talisman");

        talisman.accounts.lock_mut().push(injected(2));
        let groups = provider.clone();
        eventually(move || groups.inner.groups.lock_ref()[0].accounts.len() == 2).await;

        let account = provider.inner.groups.lock_ref()[0].accounts[1].clone();
        let serialized = provider.serialize(&account);
        assert_eq!(serialized.extra, Some(serde_json::json!("talisman")));
        let restored = provider.deserialize(&serialized).await.unwrap();
        assert!(provider.accounts_eq(&account, &restored));

        provider.disconnect_extension("talisman");
        eventually(move || talisman.disconnected.load(Ordering::SeqCst)).await;
        let groups = provider.clone();
        eventually(move || groups.inner.groups.lock_ref().is_empty()).await;
    }

    #[tokio::test]
    async fn failed_connection_is_forgotten() {
        let host = Arc::new(MockHost::default());
        host.available.lock().push("ghost".to_string());

        let provider = PjsWalletProvider::new(host, Arc::new(MemoryPersistence::new()), options());
        provider.set_connected_extensions(vec!["ghost".to_string()]);

        let _sub = task::spawn(provider.subscription().unwrap().map(|_| ()));

        let connected = provider.clone();
        eventually(move || connected.connected_extensions().is_empty()).await;
    }

    #[tokio::test]
    async fn eq_needs_same_extension() {
        let provider = PjsWalletProvider::new(
            Arc::new(MockHost::default()),
            Arc::new(MemoryPersistence::new()),
            options(),
        );
        let a = to_account("talisman", injected(1));
        let b = to_account("polkadot-js", injected(1));
        assert!(provider.accounts_eq(&a, &a));
        assert!(!provider.accounts_eq(&a, &b));

        // nothing connected, so this gives up
        let serialized = provider.serialize(&a);
        assert!(provider.deserialize(&serialized).await.is_none());
    }
}
