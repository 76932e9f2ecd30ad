use crate::{
    account::{Account, AccountDetails, AccountGroup, ProviderId, SerializableAccount},
    error::Result,
    persist::{PersistedState, PersistenceProvider},
    provider::AccountProvider,
    providers::single_group,
};
use async_trait::async_trait;
use futures::stream::BoxStream;
use futures_signals::signal::SignalExt;
use polkahub_address::{AccountAddress, PublicKey};
use polkahub_signer::{SignerError, Signer, TxPayload};
use serde::{Deserialize, Serialize};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerAccountInfo {
    pub address: AccountAddress,
    pub device_id: u32,
    pub index: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInfo {
    pub ss58_format: u16,
    pub decimals: u8,
    pub token_symbol: String,
}

/// Opens connections to a Ledger device
#[async_trait]
pub trait LedgerBackend: Send + Sync {
    async fn open(&self) -> std::result::Result<Box<dyn LedgerDevice>, SignerError>;

    async fn network_info(&self) -> std::result::Result<NetworkInfo, SignerError>;
}

/// One open connection to a device
#[async_trait]
pub trait LedgerDevice: Send + Sync {
    async fn device_id(&mut self) -> std::result::Result<u32, SignerError>;

    async fn public_key(&mut self, index: u32) -> std::result::Result<PublicKey, SignerError>;

    async fn sign_bytes(
        &mut self,
        index: u32,
        data: &[u8],
    ) -> std::result::Result<Vec<u8>, SignerError>;

    /// Returns the signed extrinsic
    async fn sign_tx(
        &mut self,
        index: u32,
        network: &NetworkInfo,
        payload: &TxPayload,
    ) -> std::result::Result<Vec<u8>, SignerError>;

    fn close(&mut self);
}

// Released on drop
struct BusyFlag(Arc<AtomicBool>);

impl BusyFlag {
    fn acquire(flag: &Arc<AtomicBool>) -> std::result::Result<Self, SignerError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| SignerError::DeviceBusy)?;
        Ok(Self(flag.clone()))
    }
}

impl Drop for BusyFlag {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Exclusive use of the device, closed and released however the operation ends
struct LedgerSession {
    device: Box<dyn LedgerDevice>,
    _busy: BusyFlag,
}

impl LedgerSession {
    async fn open(
        backend: &dyn LedgerBackend,
        busy: &Arc<AtomicBool>,
    ) -> std::result::Result<Self, SignerError> {
        let busy = BusyFlag::acquire(busy)?;
        let device = backend.open().await?;
        Ok(Self {
            device,
            _busy: busy,
        })
    }
}

impl Drop for LedgerSession {
    fn drop(&mut self) {
        self.device.close();
    }
}

#[derive(Clone)]
pub struct LedgerProvider {
    inner: Arc<LedgerInner>,
}

struct LedgerInner {
    backend: Arc<dyn LedgerBackend>,
    busy: Arc<AtomicBool>,
    accounts: PersistedState<Vec<LedgerAccountInfo>>,
}

impl LedgerProvider {
    pub fn new(backend: Arc<dyn LedgerBackend>, persist: Arc<dyn PersistenceProvider>) -> Self {
        Self {
            inner: Arc::new(LedgerInner {
                backend,
                busy: Arc::new(AtomicBool::new(false)),
                accounts: PersistedState::load(persist, Vec::new()),
            }),
        }
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn account_infos(&self) -> Vec<LedgerAccountInfo> {
        self.inner.accounts.get()
    }

    /// Derives the accounts at each index, all within one device session
    pub async fn ledger_accounts(
        &self,
        indices: &[u32],
    ) -> std::result::Result<Vec<LedgerAccountInfo>, SignerError> {
        let mut session = LedgerSession::open(self.inner.backend.as_ref(), &self.inner.busy).await?;
        let network = self.inner.backend.network_info().await?;
        let device_id = session.device.device_id().await?;

        let mut infos = Vec::with_capacity(indices.len());
        for index in indices {
            let public_key = session.device.public_key(*index).await?;
            infos.push(LedgerAccountInfo {
                address: AccountAddress::from_public_key(public_key, network.ss58_format)?,
                device_id,
                index: *index,
            });
        }

        Ok(infos)
    }

    pub fn to_account(&self, info: LedgerAccountInfo) -> Account {
        self.inner.to_account(info)
    }

    pub fn add_account(&self, info: LedgerAccountInfo) -> Account {
        self.inner.accounts.update(|accounts| {
            if accounts.iter().any(|a| same_slot(a, &info)) {
                false
            } else {
                accounts.push(info.clone());
                true
            }
        });
        self.to_account(info)
    }

    pub fn remove_account(&self, info: &LedgerAccountInfo) {
        self.inner.accounts.update(|accounts| {
            let len = accounts.len();
            accounts.retain(|a| !same_slot(a, info));
            accounts.len() != len
        });
    }

    pub fn set_accounts(&self, accounts: Vec<LedgerAccountInfo>) {
        self.inner.accounts.set(accounts);
    }
}

fn same_slot(a: &LedgerAccountInfo, b: &LedgerAccountInfo) -> bool {
    a.device_id == b.device_id && a.index == b.index
}

impl LedgerInner {
    fn to_account(self: &Arc<Self>, info: LedgerAccountInfo) -> Account {
        let signer = LedgerSigner {
            inner: self.clone(),
            public_key: *info.address.public_key(),
            index: info.index,
        };

        Account::new(ProviderId::LEDGER, info.address.clone())
            .with_signer(Some(Arc::new(signer)))
            .with_details(AccountDetails::Ledger(info))
    }
}

/// Reopens the device for every operation and checks it still holds the account
pub struct LedgerSigner {
    inner: Arc<LedgerInner>,
    public_key: PublicKey,
    index: u32,
}

impl LedgerSigner {
    async fn session(&self) -> std::result::Result<LedgerSession, SignerError> {
        let mut session = LedgerSession::open(self.inner.backend.as_ref(), &self.inner.busy).await?;
        if session.device.public_key(self.index).await? != self.public_key {
            return Err(SignerError::DeviceMismatch);
        }
        Ok(session)
    }
}

#[async_trait]
impl Signer for LedgerSigner {
    fn public_key(&self) -> PublicKey {
        self.public_key
    }

    async fn sign_bytes(&self, data: &[u8]) -> std::result::Result<Vec<u8>, SignerError> {
        let mut session = self.session().await?;
        session.device.sign_bytes(self.index, data).await
    }

    async fn sign_tx(&self, payload: &TxPayload) -> std::result::Result<Vec<u8>, SignerError> {
        let network = self.inner.backend.network_info().await?;
        let mut session = self.session().await?;
        session.device.sign_tx(self.index, &network, payload).await
    }
}

#[async_trait]
impl AccountProvider for LedgerProvider {
    fn id(&self) -> ProviderId {
        ProviderId::LEDGER.into()
    }

    fn account_groups(&self) -> BoxStream<'static, Result<Vec<AccountGroup>>> {
        let inner = self.inner.clone();
        single_group(
            self.id(),
            self.inner.accounts.signal().map(move |infos| {
                infos
                    .into_iter()
                    .map(|info| inner.to_account(info))
                    .collect()
            }),
        )
    }

    fn serialize(&self, account: &Account) -> SerializableAccount {
        let mut serialized = SerializableAccount::new(account.provider.clone(), account.address.clone());
        serialized.name = account.name.clone();
        if let AccountDetails::Ledger(info) = &account.details {
            serialized.extra = Some(serde_json::json!({
                "deviceId": info.device_id,
                "index": info.index,
            }));
        }
        serialized
    }

    async fn deserialize(&self, account: &SerializableAccount) -> Option<Account> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Extra {
            device_id: u32,
            index: u32,
        }

        let extra: Extra = account.extra_as()?;
        Some(self.to_account(LedgerAccountInfo {
            address: account.address.clone(),
            device_id: extra.device_id,
            index: extra.index,
        }))
    }

    fn accounts_eq(&self, a: &Account, b: &Account) -> bool {
        match (&a.details, &b.details) {
            (AccountDetails::Ledger(a), AccountDetails::Ledger(b)) => same_slot(a, b),
            _ => false,
        }
    }
}
