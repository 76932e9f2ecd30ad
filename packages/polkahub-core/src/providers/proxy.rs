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
use polkahub_address::{addr_eq, AccountAddress};
use polkahub_config::{CallIndex, HubConfig};
use polkahub_signer::{ProxySigner, Signer};
use serde::{Deserialize, Serialize};
use std::{sync::Arc, time::Duration};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyInfo {
    /// the proxied account
    pub real: AccountAddress,
    /// the delegate, held by another provider
    pub parent_signer: SerializableAccount,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ProxyInfo {
    pub fn new(real: AccountAddress, parent_signer: SerializableAccount) -> Self {
        Self {
            real,
            parent_signer,
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    fn same_proxy(&self, other: &ProxyInfo) -> bool {
        addr_eq(&self.real, &other.real)
            && addr_eq(&self.parent_signer.address, &other.parent_signer.address)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ProxyOptions {
    pub call_index: CallIndex,
    pub parent_timeout: Duration,
}

impl Default for ProxyOptions {
    fn default() -> Self {
        Self::from(&HubConfig::default())
    }
}

impl From<&HubConfig> for ProxyOptions {
    fn from(config: &HubConfig) -> Self {
        Self {
            call_index: config.proxy_call_index,
            parent_timeout: config.parent_timeout(),
        }
    }
}

/// Accounts controlled through a proxy delegate
#[derive(Clone)]
pub struct ProxyProvider {
    inner: Arc<ProxyInner>,
}

struct ProxyInner {
    infos: PersistedState<Vec<ProxyInfo>>,
    plugins: Mutable<Vec<Provider>>,
    accounts: Mutable<Option<Vec<Account>>>,
    options: ProxyOptions,
}

impl ProxyProvider {
    pub fn new(persist: Arc<dyn PersistenceProvider>, options: ProxyOptions) -> Self {
        Self {
            inner: Arc::new(ProxyInner {
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

    pub fn proxies(&self) -> Vec<ProxyInfo> {
        self.inner.infos.get()
    }

    pub async fn add_proxy(&self, info: ProxyInfo) -> Account {
        let added = info.clone();
        self.inner.infos.update(move |infos| {
            if infos.iter().any(|i| i.same_proxy(&added)) {
                false
            } else {
                infos.push(added);
                true
            }
        });

        self.inner.to_account(info).await
    }

    /// Removes every proxy for `real`, or just the one through `parent` if given
    pub fn remove_proxy(&self, real: &AccountAddress, parent: Option<&AccountAddress>) {
        self.inner.infos.update(|infos| {
            let len = infos.len();
            infos.retain(|i| {
                !(addr_eq(&i.real, real)
                    && parent.map_or(true, |p| addr_eq(&i.parent_signer.address, p)))
            });
            infos.len() != len
        });
    }

    pub fn set_proxies(&self, infos: Vec<ProxyInfo>) {
        self.inner.infos.set(infos);
    }
}

impl ProxyInner {
    async fn to_account(&self, info: ProxyInfo) -> Account {
        let signer = resolve_parent_signer(
            &self.plugins,
            &info.parent_signer,
            self.options.parent_timeout,
        )
        .await
        .map(|parent| {
            Arc::new(ProxySigner::new(
                info.real.clone(),
                parent,
                self.options.call_index,
            )) as Arc<dyn Signer>
        });

        Account::new(ProviderId::PROXY, info.real.clone())
            .with_name(info.name.clone())
            .with_signer(signer)
            .with_details(AccountDetails::Proxy(info))
    }

    async fn resolve_all(self: Arc<Self>, infos: Vec<ProxyInfo>) -> Vec<Account> {
        join_all(infos.into_iter().map(|info| self.to_account(info))).await
    }
}

fn proxy_info(account: &Account) -> Option<&ProxyInfo> {
    match &account.details {
        AccountDetails::Proxy(info) => Some(info),
        _ => None,
    }
}

#[async_trait]
impl AccountProvider for ProxyProvider {
    fn id(&self) -> ProviderId {
        ProviderId::PROXY.into()
    }

    fn account_groups(&self) -> BoxStream<'static, Result<Vec<AccountGroup>>> {
        resolved_group(self.id(), &self.inner.accounts)
    }

    fn serialize(&self, account: &Account) -> SerializableAccount {
        let extra = proxy_info(account).and_then(|info| serde_json::to_value(info).ok());

        SerializableAccount {
            provider: account.provider.clone(),
            address: account.address.clone(),
            name: account.name.clone(),
            extra,
        }
    }

    async fn deserialize(&self, account: &SerializableAccount) -> Option<Account> {
        let info = match account.extra_as::<ProxyInfo>() {
            Some(info) => info,
            None => self
                .inner
                .infos
                .get()
                .into_iter()
                .find(|i| addr_eq(&i.real, &account.address))?,
        };

        if !addr_eq(&info.real, &account.address) {
            tracing::warn!("proxy info for {} doesn't match {}", info.real, account.address);
            return None;
        }

        Some(self.inner.to_account(info).await)
    }

    fn accounts_eq(&self, a: &Account, b: &Account) -> bool {
        addr_eq(&a.address, &b.address)
            && proxy_info(a).map(|i| &i.parent_signer.address)
                == proxy_info(b).map(|i| &i.parent_signer.address)
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

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        persist::MemoryPersistence,
        providers::read_only::{ReadOnlyOptions, ReadOnlyProvider},
        task,
        test_util::eventually,
    };
    use futures::FutureExt;
    use polkahub_signer::{TxPayload, FAKE_SIGNATURE};

    fn addr(n: u8) -> AccountAddress {
        AccountAddress::from_public_key([n; 32], 0).unwrap()
    }

    fn setup() -> (ReadOnlyProvider, ProxyProvider) {
        let read_only = ReadOnlyProvider::new(
            Arc::new(MemoryPersistence::new()),
            ReadOnlyOptions { fake_signer: true },
        );
        let proxy = ProxyProvider::new(
            Arc::new(MemoryPersistence::new()),
            ProxyOptions {
                parent_timeout: Duration::from_millis(50),
                ..Default::default()
            },
        );
        proxy.receive_plugins(&[read_only.clone().into(), proxy.clone().into()]);
        (read_only, proxy)
    }

    fn delegate(read_only: &ReadOnlyProvider, n: u8) -> SerializableAccount {
        read_only.serialize(&read_only.to_account(addr(n)))
    }

    #[tokio::test]
    async fn wraps_calls_for_real_account() {
        let (read_only, proxy) = setup();
        let account = proxy
            .add_proxy(ProxyInfo::new(addr(9), delegate(&read_only, 1)).with_name("stash"))
            .await;

        assert_eq!(account.address, addr(9));
        let signer = account.signer.unwrap();
        assert_eq!(signer.public_key(), [1; 32]);

        let payload = TxPayload {
            call_data: vec![5, 0],
            ..Default::default()
        };
        let tx = signer.sign_tx(&payload).await.unwrap();
        let mut wrapped = vec![29, 0, 0];
        wrapped.extend([9; 32]);
        wrapped.extend([0, 5, 0]);
        assert!(tx.ends_with(&wrapped));
        assert!(tx.windows(FAKE_SIGNATURE.len()).any(|w| w == &FAKE_SIGNATURE[..]));
    }

    #[tokio::test]
    async fn dedup_and_remove() {
        let (read_only, proxy) = setup();
        proxy.add_proxy(ProxyInfo::new(addr(9), delegate(&read_only, 1))).await;
        proxy.add_proxy(ProxyInfo::new(addr(9), delegate(&read_only, 1))).await;
        proxy.add_proxy(ProxyInfo::new(addr(9), delegate(&read_only, 2))).await;
        assert_eq!(proxy.proxies().len(), 2);

        proxy.remove_proxy(&addr(9), Some(&addr(2)));
        assert_eq!(proxy.proxies().len(), 1);
        proxy.remove_proxy(&addr(9), None);
        assert!(proxy.proxies().is_empty());
    }

    #[tokio::test]
    async fn missing_parent_keeps_account() {
        let (_read_only, proxy) = setup();
        let _sub = task::spawn(proxy.subscription().unwrap().map(|_| ()));

        let parent = SerializableAccount::new(ProviderId::VAULT, addr(1));
        let account = proxy.add_proxy(ProxyInfo::new(addr(9), parent)).await;
        assert!(!account.can_sign());

        let accounts = proxy.inner.accounts.clone();
        eventually(move || {
            accounts
                .lock_ref()
                .as_ref()
                .is_some_and(|a| a.len() == 1 && !a[0].can_sign())
        })
        .await;

        let serialized = proxy.serialize(&account);
        let restored = proxy.deserialize(&serialized).await.unwrap();
        assert!(proxy.accounts_eq(&account, &restored));
        assert!(restored.signer.is_none());
    }
}
