use crate::{
    account::{Account, AccountGroup, ProviderId, SerializableAccount},
    error::Result,
    persist::{PersistedState, PersistenceProvider},
    provider::AccountProvider,
    providers::single_group,
};
use async_trait::async_trait;
use futures::stream::BoxStream;
use futures_signals::signal::SignalExt;
use polkahub_address::AccountAddress;
use polkahub_signer::{FakeSigner, Signer};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, Default)]
pub struct ReadOnlyOptions {
    /// Give every account a signer that produces placeholder signatures,
    /// useful for fee estimation
    pub fake_signer: bool,
}

/// Manually entered addresses
#[derive(Clone)]
pub struct ReadOnlyProvider {
    inner: Arc<ReadOnlyInner>,
}

struct ReadOnlyInner {
    addresses: PersistedState<Vec<AccountAddress>>,
    options: ReadOnlyOptions,
}

impl ReadOnlyProvider {
    pub fn new(persist: Arc<dyn PersistenceProvider>, options: ReadOnlyOptions) -> Self {
        Self {
            inner: Arc::new(ReadOnlyInner {
                addresses: PersistedState::load(persist, Vec::new()),
                options,
            }),
        }
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn addresses(&self) -> Vec<AccountAddress> {
        self.inner.addresses.get()
    }

    pub fn to_account(&self, address: AccountAddress) -> Account {
        self.inner.to_account(address)
    }

    pub fn add_account(&self, address: AccountAddress) -> Account {
        self.inner.addresses.update(|addresses| {
            if addresses.contains(&address) {
                false
            } else {
                addresses.push(address.clone());
                true
            }
        });
        self.to_account(address)
    }

    pub fn remove_account(&self, address: &AccountAddress) {
        self.inner.addresses.update(|addresses| {
            let len = addresses.len();
            addresses.retain(|a| a != address);
            addresses.len() != len
        });
    }

    pub fn set_accounts(&self, addresses: Vec<AccountAddress>) {
        let mut deduped: Vec<AccountAddress> = Vec::with_capacity(addresses.len());
        for address in addresses {
            if !deduped.contains(&address) {
                deduped.push(address);
            }
        }
        self.inner.addresses.set(deduped);
    }
}

impl ReadOnlyInner {
    fn to_account(&self, address: AccountAddress) -> Account {
        let signer = self
            .options
            .fake_signer
            .then(|| Arc::new(FakeSigner::new(*address.public_key())) as Arc<dyn Signer>);

        Account::new(ProviderId::READ_ONLY, address).with_signer(signer)
    }
}

#[async_trait]
impl AccountProvider for ReadOnlyProvider {
    fn id(&self) -> ProviderId {
        ProviderId::READ_ONLY.into()
    }

    fn account_groups(&self) -> BoxStream<'static, Result<Vec<AccountGroup>>> {
        let inner = self.inner.clone();
        single_group(
            self.id(),
            self.inner.addresses.signal().map(move |addresses| {
                addresses
                    .into_iter()
                    .map(|address| inner.to_account(address))
                    .collect()
            }),
        )
    }

    async fn deserialize(&self, account: &SerializableAccount) -> Option<Account> {
        Some(
            self.to_account(account.address.clone())
                .with_name(account.name.clone()),
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::persist::MemoryPersistence;
    use futures::StreamExt;

    fn addr(n: u8) -> AccountAddress {
        AccountAddress::from_public_key([n; 32], 0).unwrap()
    }

    #[tokio::test]
    async fn add_remove_readd() {
        let persist = Arc::new(MemoryPersistence::new());
        let provider = ReadOnlyProvider::new(persist.clone(), ReadOnlyOptions::default());

        provider.add_account(addr(1));
        provider.remove_account(&addr(1));
        provider.add_account(addr(1));
        provider.add_account(addr(1));

        assert_eq!(provider.addresses(), vec![addr(1)]);
        assert_eq!(
            persist.load().unwrap(),
            serde_json::to_string(&vec![addr(1)]).unwrap()
        );

        let groups = provider.account_groups().next().await.unwrap().unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].key, "readonly");
        assert_eq!(groups[0].accounts.len(), 1);
        assert!(groups[0].accounts[0].signer.is_none());
    }

    #[tokio::test]
    async fn restores_from_persistence() {
        let persist = Arc::new(MemoryPersistence::with_value(
            serde_json::to_string(&vec![addr(2), addr(3)]).unwrap(),
        ));
        let provider = ReadOnlyProvider::new(persist, ReadOnlyOptions::default());
        assert_eq!(provider.addresses(), vec![addr(2), addr(3)]);
    }

    #[tokio::test]
    async fn round_trip_with_fake_signer() {
        let provider = ReadOnlyProvider::new(
            Arc::new(MemoryPersistence::new()),
            ReadOnlyOptions { fake_signer: true },
        );
        let account = provider.add_account(addr(4)).with_name(Some("me".to_string()));

        let serialized = provider.serialize(&account);
        assert_eq!(serialized.extra, None);

        let restored = provider.deserialize(&serialized).await.unwrap();
        assert!(provider.accounts_eq(&account, &restored));
        assert_eq!(restored.name.as_deref(), Some("me"));

        let sig = restored.signer.unwrap().sign_bytes(b"x").await.unwrap();
        assert_eq!(&sig[..4], &[0xde, 0xad, 0xbe, 0xef]);
    }
}
