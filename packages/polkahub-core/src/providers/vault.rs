use crate::{
    account::{Account, AccountDetails, AccountGroup, ProviderId, SerializableAccount},
    error::Result,
    persist::{PersistedState, PersistenceProvider},
    provider::AccountProvider,
    providers::single_group,
    qr::{self, VaultQrEncryption, DEFAULT_MAX_FRAME_SIZE},
};
use async_trait::async_trait;
use futures::{channel::oneshot, stream::BoxStream};
use futures_signals::signal::{Mutable, Signal, SignalExt};
use parking_lot::Mutex;
use polkahub_address::{addr_eq, AccountAddress, PublicKey};
use polkahub_signer::{signed_extrinsic_v4, SignatureScheme, Signer, SignerError, TxPayload};
use serde::{Deserialize, Serialize};
use std::{
    fmt,
    str::FromStr,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

const CHECK_METADATA_HASH: &str = "CheckMetadataHash";
const CHECK_GENESIS: &str = "CheckGenesis";

#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GenesisHash(pub [u8; 32]);

impl GenesisHash {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for GenesisHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for GenesisHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GenesisHash({self})")
    }
}

impl FromStr for GenesisHash {
    type Err = SignerError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let bytes = hex::decode(s.strip_prefix("0x").unwrap_or(s))
            .map_err(|e| SignerError::Other(format!("invalid genesis hash {s}: {e}")))?;
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|_| SignerError::Other(format!("genesis hash {s} is not 32 bytes")))?;
        Ok(Self(bytes))
    }
}

impl TryFrom<String> for GenesisHash {
    type Error = SignerError;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<GenesisHash> for String {
    fn from(genesis: GenesisHash) -> Self {
        genesis.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultAccountInfo {
    pub address: AccountAddress,
    pub genesis: GenesisHash,
}

/// Lets Vault verify a transaction against a metadata proof instead of needing
/// the whole metadata loaded beforehand
pub trait MetadataProver: Send + Sync {
    fn digest(&self, metadata: &[u8]) -> std::result::Result<[u8; 32], SignerError>;

    fn proof_for_extrinsic_parts(
        &self,
        metadata: &[u8],
        call_data: &[u8],
        extra: &[u8],
        additional_signed: &[u8],
    ) -> std::result::Result<Vec<u8>, SignerError>;
}

#[derive(Clone)]
pub struct VaultOptions {
    pub max_frame_size: usize,
    pub metadata_prover: Option<Arc<dyn MetadataProver>>,
}

impl Default for VaultOptions {
    fn default() -> Self {
        Self {
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            metadata_prover: None,
        }
    }
}

/// A payload waiting to be scanned by the device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultRequest {
    pub id: u64,
    pub payload: Vec<u8>,
    pub frames: Vec<Vec<u8>>,
}

struct Pending {
    id: u64,
    reply: oneshot::Sender<Option<Vec<u8>>>,
}

/// Air-gapped signing over QR codes
#[derive(Clone)]
pub struct VaultProvider {
    inner: Arc<VaultInner>,
}

struct VaultInner {
    accounts: PersistedState<Vec<VaultAccountInfo>>,
    active_tx: Mutable<Option<VaultRequest>>,
    pending: Mutex<Option<Pending>>,
    next_id: AtomicU64,
    options: VaultOptions,
}

impl VaultProvider {
    pub fn new(persist: Arc<dyn PersistenceProvider>, options: VaultOptions) -> Self {
        Self {
            inner: Arc::new(VaultInner {
                accounts: PersistedState::load(persist, Vec::new()),
                active_tx: Mutable::new(None),
                pending: Mutex::new(None),
                next_id: AtomicU64::new(0),
                options,
            }),
        }
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn account_infos(&self) -> Vec<VaultAccountInfo> {
        self.inner.accounts.get()
    }

    pub fn to_account(&self, info: VaultAccountInfo) -> Account {
        self.inner.to_account(info)
    }

    pub fn add_account(&self, info: VaultAccountInfo) -> Account {
        self.inner.accounts.update(|accounts| {
            if accounts
                .iter()
                .any(|a| a.address == info.address && a.genesis == info.genesis)
            {
                false
            } else {
                accounts.push(info.clone());
                true
            }
        });
        self.to_account(info)
    }

    pub fn remove_account(&self, address: &AccountAddress) {
        self.inner.accounts.update(|accounts| {
            let len = accounts.len();
            accounts.retain(|a| &a.address != address);
            accounts.len() != len
        });
    }

    pub fn set_accounts(&self, accounts: Vec<VaultAccountInfo>) {
        self.inner.accounts.set(accounts);
    }

    pub fn active_tx(&self) -> Option<VaultRequest> {
        self.inner.active_tx.get_cloned()
    }

    pub fn active_tx_signal(&self) -> impl Signal<Item = Option<VaultRequest>> {
        self.inner.active_tx.signal_cloned()
    }

    /// Resolves the pending request with the signature scanned from the device
    pub fn set_signature(&self, signature: Vec<u8>) {
        let pending = self.inner.pending.lock().take();
        self.inner.active_tx.set(None);
        match pending {
            Some(pending) => {
                let _ = pending.reply.send(Some(signature));
            }
            None => tracing::warn!("received a vault signature with no pending request"),
        }
    }

    pub fn cancel_tx(&self) {
        let pending = self.inner.pending.lock().take();
        self.inner.active_tx.set(None);
        if let Some(pending) = pending {
            tracing::debug!("vault request {} cancelled", pending.id);
            let _ = pending.reply.send(None);
        }
    }
}

impl VaultInner {
    fn to_account(self: &Arc<Self>, info: VaultAccountInfo) -> Account {
        let signer = VaultSigner {
            inner: self.clone(),
            public_key: *info.address.public_key(),
            genesis: info.genesis,
        };

        Account::new(ProviderId::VAULT, info.address)
            .with_signer(Some(Arc::new(signer)))
            .with_details(AccountDetails::Vault {
                genesis: info.genesis,
            })
    }

    /// Publishes the payload and waits for the scanned reply
    /// A newer request cancels this one
    async fn request(self: &Arc<Self>, payload: Vec<u8>) -> std::result::Result<Vec<u8>, SignerError> {
        let frames = qr::create_frames(&payload, self.options.max_frame_size)
            .map_err(|e| SignerError::Other(e.to_string()))?;

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (reply, receiver) = oneshot::channel();

        {
            let mut pending = self.pending.lock();
            if let Some(previous) = pending.replace(Pending { id, reply }) {
                tracing::debug!("vault request {} superseded by {id}", previous.id);
                let _ = previous.reply.send(None);
            }
            self.active_tx.set(Some(VaultRequest {
                id,
                payload,
                frames,
            }));
        }

        let _clear = ClearPending {
            inner: self.clone(),
            id,
        };

        match receiver.await {
            Ok(Some(signature)) => Ok(signature),
            Ok(None) | Err(_) => Err(SignerError::Cancelled),
        }
    }
}

// If the signing future is dropped, its request goes away too
struct ClearPending {
    inner: Arc<VaultInner>,
    id: u64,
}

impl Drop for ClearPending {
    fn drop(&mut self) {
        let mut pending = self.inner.pending.lock();
        if pending.as_ref().map(|p| p.id) == Some(self.id) {
            pending.take();
            self.inner.active_tx.set(None);
        }
    }
}

pub struct VaultSigner {
    inner: Arc<VaultInner>,
    public_key: PublicKey,
    genesis: GenesisHash,
}

impl VaultSigner {
    fn extensions(
        &self,
        payload: &TxPayload,
    ) -> std::result::Result<(Vec<u8>, Vec<u8>, bool), SignerError> {
        let mut extra = Vec::new();
        let mut additional_signed = Vec::new();
        let mut proofed = false;

        for ext in &payload.signed_extensions {
            if ext.identifier == CHECK_METADATA_HASH {
                match &self.inner.options.metadata_prover {
                    Some(prover) => {
                        let digest = prover.digest(&payload.metadata)?;
                        extra.push(1);
                        additional_signed.push(1);
                        additional_signed.extend_from_slice(&digest);
                        proofed = true;
                        continue;
                    }
                    None => tracing::warn!(
                        "the chain supports CheckMetadataHash but no metadata prover is configured, \
                         Polkadot Vault will need the whole metadata loaded beforehand"
                    ),
                }
            }
            extra.extend_from_slice(&ext.value);
            additional_signed.extend_from_slice(&ext.additional_signed);
        }

        Ok((extra, additional_signed, proofed))
    }
}

#[async_trait]
impl Signer for VaultSigner {
    fn public_key(&self) -> PublicKey {
        self.public_key
    }

    async fn sign_bytes(&self, data: &[u8]) -> std::result::Result<Vec<u8>, SignerError> {
        let payload = qr::qr_message(
            VaultQrEncryption::Sr25519,
            &self.public_key,
            data,
            self.genesis.as_bytes(),
        );
        self.inner.request(payload).await
    }

    async fn sign_tx(&self, payload: &TxPayload) -> std::result::Result<Vec<u8>, SignerError> {
        let (extra, additional_signed, proofed) = self.extensions(payload)?;

        let mut extensions = extra.clone();
        extensions.extend_from_slice(&additional_signed);

        let genesis = payload
            .extension(CHECK_GENESIS)
            .map(|ext| ext.additional_signed.clone())
            .unwrap_or_else(|| self.genesis.as_bytes().to_vec());

        let qr_payload = match (&self.inner.options.metadata_prover, proofed) {
            (Some(prover), true) => {
                let proof = prover.proof_for_extrinsic_parts(
                    &payload.metadata,
                    &payload.call_data,
                    &extra,
                    &additional_signed,
                )?;
                qr::qr_proofed_transaction(
                    VaultQrEncryption::Sr25519,
                    &self.public_key,
                    &proof,
                    &payload.call_data,
                    &extensions,
                    &genesis,
                )
            }
            _ => qr::qr_transaction(
                VaultQrEncryption::Sr25519,
                &self.public_key,
                &payload.call_data,
                &extensions,
                &genesis,
            ),
        };

        let signature = self.inner.request(qr_payload).await?;

        // the first byte is the scheme the device signed with
        let (scheme, signature) = signature
            .split_first()
            .ok_or_else(|| SignerError::InvalidSignature("empty signature".to_string()))?;
        let scheme = SignatureScheme::from_tag(*scheme).ok_or_else(|| {
            SignerError::InvalidSignature(format!("unknown signature scheme {scheme:#04x}"))
        })?;

        Ok(signed_extrinsic_v4(
            &self.public_key,
            scheme,
            signature,
            &extra,
            &payload.call_data,
        ))
    }
}

#[async_trait]
impl AccountProvider for VaultProvider {
    fn id(&self) -> ProviderId {
        ProviderId::VAULT.into()
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
        if let AccountDetails::Vault { genesis } = &account.details {
            serialized.extra = Some(serde_json::Value::String(genesis.to_string()));
        }
        serialized
    }

    /// Only accounts that are still registered come back
    async fn deserialize(&self, account: &SerializableAccount) -> Option<Account> {
        let genesis: GenesisHash = account.extra_as()?;
        self.inner
            .accounts
            .get()
            .into_iter()
            .find(|info| addr_eq(&info.address, &account.address) && info.genesis == genesis)
            .map(|info| self.to_account(info))
    }

    fn accounts_eq(&self, a: &Account, b: &Account) -> bool {
        match (&a.details, &b.details) {
            (AccountDetails::Vault { genesis: ga }, AccountDetails::Vault { genesis: gb }) => {
                a.address == b.address && ga == gb
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{persist::MemoryPersistence, qr::assemble_frames};
    use futures::StreamExt;
    use polkahub_signer::SignedExtension;
    use std::time::Duration;

    fn provider(options: VaultOptions) -> VaultProvider {
        VaultProvider::new(Arc::new(MemoryPersistence::new()), options)
    }

    fn info(n: u8) -> VaultAccountInfo {
        VaultAccountInfo {
            address: AccountAddress::from_public_key([n; 32], 0).unwrap(),
            genesis: GenesisHash([0x91; 32]),
        }
    }

    async fn next_request(provider: &VaultProvider) -> VaultRequest {
        let mut requests = provider.active_tx_signal().to_stream();
        loop {
            if let Some(request) = requests.next().await.unwrap() {
                return request;
            }
        }
    }

    fn payload() -> TxPayload {
        TxPayload {
            call_data: vec![5, 3],
            signed_extensions: vec![
                SignedExtension::new("CheckNonce", vec![8], vec![]),
                SignedExtension::new(CHECK_GENESIS, vec![], vec![0x22; 32]),
            ],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn sign_tx_handshake() {
        let provider = provider(VaultOptions::default());
        let account = provider.add_account(info(1));
        let signer = account.signer.unwrap();

        let signing = tokio::spawn(async move { signer.sign_tx(&payload()).await });

        let request = next_request(&provider).await;
        let scanned = assemble_frames(request.frames.iter().map(|f| f.as_slice())).unwrap();
        assert_eq!(scanned, request.payload);
        assert_eq!(&request.payload[..3], &[0x53, 0x01, 0x02]);
        // call, then extra, then additional signed, then genesis from CheckGenesis
        let mut tail = vec![8, 5, 3, 8];
        tail.extend([0x22; 32]);
        tail.extend([0x22; 32]);
        assert!(request.payload.ends_with(&tail[1..]));

        let mut signature = vec![0x01];
        signature.extend([0xab; 64]);
        provider.set_signature(signature);

        let tx = signing.await.unwrap().unwrap();
        assert!(tx.ends_with(&[8, 5, 3]));
        assert!(provider.active_tx().is_none());
    }

    #[tokio::test]
    async fn cancel_and_supersede() {
        let provider = provider(VaultOptions::default());
        let signer = provider.add_account(info(1)).signer.unwrap();

        let first = tokio::spawn({
            let signer = signer.clone();
            async move { signer.sign_bytes(b"one").await }
        });
        let first_request = next_request(&provider).await;

        let second = tokio::spawn({
            let signer = signer.clone();
            async move { signer.sign_bytes(b"two").await }
        });

        // wait for the second request to replace the first
        let mut requests = provider.active_tx_signal().to_stream();
        while let Some(request) = requests.next().await {
            if matches!(&request, Some(r) if r.id != first_request.id) {
                break;
            }
        }

        assert_eq!(first.await.unwrap(), Err(SignerError::Cancelled));

        provider.cancel_tx();
        assert_eq!(second.await.unwrap(), Err(SignerError::Cancelled));
        assert!(provider.active_tx().is_none());
    }

    #[tokio::test]
    async fn dropped_request_clears_active_tx() {
        let provider = provider(VaultOptions::default());
        let signer = provider.add_account(info(1)).signer.unwrap();

        let res = tokio::time::timeout(Duration::from_millis(20), signer.sign_bytes(b"x")).await;
        assert!(res.is_err());
        assert!(provider.active_tx().is_none());
    }

    struct Prover;

    impl MetadataProver for Prover {
        fn digest(&self, _metadata: &[u8]) -> std::result::Result<[u8; 32], SignerError> {
            Ok([0xdd; 32])
        }

        fn proof_for_extrinsic_parts(
            &self,
            _metadata: &[u8],
            _call_data: &[u8],
            _extra: &[u8],
            _additional_signed: &[u8],
        ) -> std::result::Result<Vec<u8>, SignerError> {
            Ok(vec![0xee; 3])
        }
    }

    #[tokio::test]
    async fn metadata_hash_is_proofed() {
        let provider = provider(VaultOptions {
            metadata_prover: Some(Arc::new(Prover)),
            ..Default::default()
        });
        let signer = provider.add_account(info(1)).signer.unwrap();

        let mut payload = payload();
        payload
            .signed_extensions
            .push(SignedExtension::new(CHECK_METADATA_HASH, vec![0], vec![0]));

        let signing = tokio::spawn(async move { signer.sign_tx(&payload).await });
        let request = next_request(&provider).await;

        assert_eq!(request.payload[2], 0x06);
        assert_eq!(&request.payload[35..38], &[0xee; 3]);
        let mut digest = vec![1];
        digest.extend([0xdd; 32]);
        assert!(request
            .payload
            .windows(digest.len())
            .any(|w| w == digest.as_slice()));

        provider.cancel_tx();
        assert_eq!(signing.await.unwrap(), Err(SignerError::Cancelled));
    }

    #[tokio::test]
    async fn round_trip_and_eq() {
        let provider = provider(VaultOptions::default());
        let account = provider.add_account(info(1));
        provider.add_account(info(1));
        assert_eq!(provider.account_infos().len(), 1);

        let serialized = provider.serialize(&account);
        assert_eq!(
            serialized.extra,
            Some(serde_json::Value::String(format!("0x{}", "91".repeat(32))))
        );

        let restored = provider.deserialize(&serialized).await.unwrap();
        assert!(provider.accounts_eq(&account, &restored));

        let other_chain = provider.to_account(VaultAccountInfo {
            genesis: GenesisHash([0x01; 32]),
            ..info(1)
        });
        assert!(!provider.accounts_eq(&account, &other_chain));

        provider.remove_account(&account.address);
        assert!(provider.deserialize(&serialized).await.is_none());
    }
}
