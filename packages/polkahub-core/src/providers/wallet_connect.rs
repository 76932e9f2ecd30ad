use crate::{
    account::{Account, AccountDetails, AccountGroup, ProviderId, SerializableAccount},
    error::{HubError, Result},
    persist::{PersistedState, PersistenceProvider},
    provider::AccountProvider,
    task::{self, TaskGuard},
};
use async_trait::async_trait;
use futures::{future::BoxFuture, stream::BoxStream, StreamExt};
use futures_signals::signal::{Mutable, Signal, SignalExt};
use parking_lot::Mutex;
use polkahub_address::{AccountAddress, PublicKey};
use polkahub_config::util::{caip_chain_reference, caip_network_id, rpc_url_pair};
use polkahub_signer::{signed_extrinsic_v4, SignatureScheme, Signer, SignerError, TxPayload};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, sync::Arc};

pub const SIGN_TRANSACTION: &str = "polkadot_signTransaction";
pub const SIGN_MESSAGE: &str = "polkadot_signMessage";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WcNamespace {
    /// `polkadot:<genesis prefix>:<address>`
    #[serde(default)]
    pub accounts: Vec<String>,
    #[serde(default)]
    pub methods: Vec<String>,
    #[serde(default)]
    pub events: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WcSession {
    pub topic: String,
    pub namespaces: BTreeMap<String, WcNamespace>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequiredNamespace {
    pub chains: Vec<String>,
    pub methods: Vec<String>,
    pub events: Vec<String>,
}

impl RequiredNamespace {
    pub fn polkadot(chains: Vec<String>) -> Self {
        Self {
            chains,
            methods: vec![SIGN_TRANSACTION.to_string(), SIGN_MESSAGE.to_string()],
            events: vec!["chainChanged".to_string(), "accountsChanged".to_string()],
        }
    }
}

/// A session proposal: show `uri` to the user, then wait for `approval`
pub struct PendingSession {
    pub uri: Option<String>,
    pub approval: BoxFuture<'static, Result<WcSession>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WcRequest {
    SignTransaction {
        address: String,
        transaction_payload: serde_json::Value,
    },
    SignMessage {
        address: String,
        message: String,
    },
}

impl WcRequest {
    pub fn method(&self) -> &'static str {
        match self {
            Self::SignTransaction { .. } => SIGN_TRANSACTION,
            Self::SignMessage { .. } => SIGN_MESSAGE,
        }
    }

    pub fn params(&self) -> serde_json::Value {
        match self {
            Self::SignTransaction {
                address,
                transaction_payload,
            } => serde_json::json!({
                "address": address,
                "transactionPayload": transaction_payload,
            }),
            Self::SignMessage { address, message } => serde_json::json!({
                "address": address,
                "message": message,
            }),
        }
    }
}

#[async_trait]
pub trait WalletConnectClient: Send + Sync {
    async fn connect(&self, namespace: RequiredNamespace) -> Result<PendingSession>;

    async fn disconnect(&self, topic: &str) -> Result<()>;

    async fn request(
        &self,
        topic: &str,
        chain_id: &str,
        request: WcRequest,
    ) -> Result<serde_json::Value>;
}

/// Where the pairing uri is shown
pub trait ConnectModal: Send + Sync {
    fn open(&self, uri: &str);
    fn close(&self);
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Currency {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

impl Currency {
    pub fn new(name: &str, symbol: &str, decimals: u8) -> Self {
        Self {
            name: name.to_string(),
            symbol: symbol.to_string(),
            decimals,
        }
    }

    pub fn dot() -> Self {
        Self::new("Polkadot", "DOT", 10)
    }

    pub fn ksm() -> Self {
        Self::new("Kusama", "KSM", 12)
    }

    pub fn pas() -> Self {
        Self::new("Paseo", "PAS", 12)
    }
}

/// A chain as WalletConnect sees it
/// https://github.com/ChainAgnostic/CAIPs/blob/main/CAIPs/caip-13.md
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolkadotChain {
    /// first 32 hex chars of the genesis hash
    pub id: String,
    pub name: String,
    pub currency: Currency,
    pub rpc_http: String,
    pub rpc_ws: String,
    pub explorer: Option<String>,
}

impl PolkadotChain {
    pub fn new(
        name: &str,
        genesis: &str,
        currency: Currency,
        rpc_url: &str,
        explorer: Option<&str>,
    ) -> Result<Self> {
        let (rpc_http, rpc_ws) = rpc_url_pair(rpc_url)?;
        Ok(Self {
            id: caip_chain_reference(genesis),
            name: name.to_string(),
            currency,
            rpc_http,
            rpc_ws,
            explorer: explorer.map(|url| {
                if url.contains("://") {
                    url.to_string()
                } else {
                    format!("https://{url}/")
                }
            }),
        })
    }

    pub fn caip_network_id(&self) -> String {
        caip_network_id(&self.id)
    }

    fn known(name: &str, id: &str, currency: Currency, host: &str, explorer: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            currency,
            rpc_http: format!("https://{host}/"),
            rpc_ws: format!("wss://{host}/"),
            explorer: Some(format!("https://{explorer}/")),
        }
    }

    pub fn polkadot() -> Self {
        Self::known(
            "Polkadot",
            "91b171bb158e2d3848fa23a9f1c25182",
            Currency::dot(),
            "rpc.polkadot.io",
            "polkadot.subscan.io",
        )
    }

    pub fn polkadot_asset_hub() -> Self {
        Self::known(
            "Polkadot AssetHub",
            "68d56f15f85d3136970ec16946040bc1",
            Currency::dot(),
            "asset-hub-polkadot-rpc.dwellir.com",
            "assethub-polkadot.subscan.io",
        )
    }

    pub fn kusama() -> Self {
        Self::known(
            "Kusama",
            "b0a8d493285c2df73290dfb7e61f870f",
            Currency::ksm(),
            "kusama-rpc.dwellir.com",
            "kusama.subscan.io",
        )
    }

    pub fn kusama_asset_hub() -> Self {
        Self::known(
            "Kusama AssetHub",
            "48239ef607d7928874027a43a6768920",
            Currency::ksm(),
            "kusama-asset-hub-rpc.polkadot.io",
            "assethub-kusama.subscan.io",
        )
    }

    pub fn paseo() -> Self {
        Self::known(
            "Paseo",
            "77afd6190f1554ad45fd0d31aee62aac",
            Currency::pas(),
            "paseo-rpc.dwellir.com",
            "paseo.subscan.io",
        )
    }

    pub fn paseo_asset_hub() -> Self {
        Self::known(
            "Paseo AssetHub",
            "d6eec26135305a8ad257a20d00335728",
            Currency::pas(),
            "asset-hub-paseo-rpc.dwellir.com",
            "assethub-paseo.subscan.io",
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WalletConnectStatus {
    Disconnected,
    Connecting,
    Connected(WcSession),
}

/// Accounts from a remote wallet paired over WalletConnect
#[derive(Clone)]
pub struct WalletConnectProvider {
    inner: Arc<WcInner>,
}

struct WcInner {
    client: Arc<dyn WalletConnectClient>,
    modal: Option<Arc<dyn ConnectModal>>,
    chains: Vec<PolkadotChain>,
    session: PersistedState<Option<WcSession>>,
    status: Mutable<WalletConnectStatus>,
    // generation of the in-flight connection attempt
    connecting: Mutex<Option<(u64, TaskGuard)>>,
    disconnecting: Mutex<Option<TaskGuard>>,
    generation: Mutex<u64>,
}

impl WalletConnectProvider {
    pub fn new(
        client: Arc<dyn WalletConnectClient>,
        modal: Option<Arc<dyn ConnectModal>>,
        chains: Vec<PolkadotChain>,
        persist: Arc<dyn PersistenceProvider>,
    ) -> Self {
        let session = PersistedState::load(persist, None);
        let status = match session.get() {
            Some(session) => WalletConnectStatus::Connected(session),
            None => WalletConnectStatus::Disconnected,
        };

        Self {
            inner: Arc::new(WcInner {
                client,
                modal,
                chains,
                session,
                status: Mutable::new(status),
                connecting: Mutex::new(None),
                disconnecting: Mutex::new(None),
                generation: Mutex::new(0),
            }),
        }
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn status(&self) -> WalletConnectStatus {
        self.inner.status.get_cloned()
    }

    pub fn status_signal(&self) -> impl Signal<Item = WalletConnectStatus> {
        self.inner.status.signal_cloned()
    }

    pub fn chains(&self) -> &[PolkadotChain] {
        &self.inner.chains
    }

    /// Connects when disconnected, disconnects when connected,
    /// and abandons an attempt that's still in progress
    pub fn toggle(&self) {
        match self.status() {
            WalletConnectStatus::Disconnected => self.connect(),
            WalletConnectStatus::Connecting => self.cancel_connect(),
            WalletConnectStatus::Connected(session) => self.disconnect(session),
        }
    }

    /// The user dismissed the pairing modal
    pub fn cancel_connect(&self) {
        let attempt = self.inner.connecting.lock().take();
        if attempt.is_some() {
            tracing::debug!("walletconnect connection cancelled");
            self.inner.status.set(WalletConnectStatus::Disconnected);
        }
    }

    fn connect(&self) {
        let mut connecting = self.inner.connecting.lock();
        let generation = {
            let mut generation = self.inner.generation.lock();
            *generation += 1;
            *generation
        };

        self.inner.status.set(WalletConnectStatus::Connecting);
        let guard = task::spawn(self.inner.clone().run_connect(generation));
        *connecting = Some((generation, guard));
    }

    fn disconnect(&self, session: WcSession) {
        self.inner.session.set(None);
        self.inner.status.set(WalletConnectStatus::Disconnected);

        let client = self.inner.client.clone();
        let guard = task::spawn(async move {
            if let Err(e) = client.disconnect(&session.topic).await {
                tracing::warn!("failed to disconnect walletconnect session: {e}");
            }
        });
        *self.inner.disconnecting.lock() = Some(guard);
    }
}

// Closes the modal when the connection attempt ends, however it ends
struct CloseModal(Option<Arc<dyn ConnectModal>>);

impl Drop for CloseModal {
    fn drop(&mut self) {
        if let Some(modal) = self.0.take() {
            modal.close();
        }
    }
}

impl WcInner {
    async fn run_connect(self: Arc<Self>, generation: u64) {
        let mut close_modal = CloseModal(None);

        let result = async {
            let chains = self.chains.iter().map(|c| c.caip_network_id()).collect();
            let pending = self.client.connect(RequiredNamespace::polkadot(chains)).await?;

            if let (Some(uri), Some(modal)) = (&pending.uri, &self.modal) {
                modal.open(uri);
                close_modal.0 = Some(modal.clone());
            }

            pending.approval.await
        }
        .await;

        let mut connecting = self.connecting.lock();
        if connecting.as_ref().map(|(g, _)| *g) != Some(generation) {
            return;
        }
        // our own guard, the task is finishing anyway
        let _own = connecting.take();

        match result {
            Ok(session) => {
                tracing::debug!("walletconnect session {} established", session.topic);
                self.session.set(Some(session.clone()));
                self.status.set(WalletConnectStatus::Connected(session));
            }
            Err(e) => {
                tracing::warn!("walletconnect connection failed: {e}");
                self.status.set(WalletConnectStatus::Disconnected);
            }
        }
    }

    fn accounts(self: &Arc<Self>, status: &WalletConnectStatus) -> Result<Vec<Account>> {
        let WalletConnectStatus::Connected(session) = status else {
            return Ok(Vec::new());
        };

        let mut accounts: Vec<Account> = Vec::new();
        for wc_account in session.namespaces.values().flat_map(|ns| ns.accounts.iter()) {
            let address = wc_account
                .splitn(3, ':')
                .nth(2)
                .ok_or_else(|| HubError::wallet_connect(format!("malformed account {wc_account}")))?;
            let address = AccountAddress::new(address)?;

            if accounts.iter().any(|a| a.address == address) {
                continue;
            }

            let signer = WcSigner {
                inner: self.clone(),
                topic: session.topic.clone(),
                address: address.clone(),
            };
            accounts.push(
                Account::new(ProviderId::WALLET_CONNECT, address)
                    .with_signer(Some(Arc::new(signer)))
                    .with_details(AccountDetails::WalletConnect {
                        topic: session.topic.clone(),
                    }),
            );
        }

        Ok(accounts)
    }
}

pub struct WcSigner {
    inner: Arc<WcInner>,
    topic: String,
    address: AccountAddress,
}

impl WcSigner {
    async fn request(
        &self,
        chain_id: &str,
        request: WcRequest,
    ) -> std::result::Result<Vec<u8>, SignerError> {
        let response = self
            .inner
            .client
            .request(&self.topic, chain_id, request)
            .await
            .map_err(|e| SignerError::Transport(e.to_string()))?;

        let signature = response
            .get("signature")
            .and_then(|s| s.as_str())
            .ok_or_else(|| SignerError::InvalidSignature(format!("unexpected response {response}")))?;

        hex::decode(signature.strip_prefix("0x").unwrap_or(signature))
            .map_err(|e| SignerError::InvalidSignature(e.to_string()))
    }
}

fn hex_0x(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

#[async_trait]
impl Signer for WcSigner {
    fn public_key(&self) -> PublicKey {
        *self.address.public_key()
    }

    async fn sign_bytes(&self, data: &[u8]) -> std::result::Result<Vec<u8>, SignerError> {
        let chain = self
            .inner
            .chains
            .first()
            .ok_or_else(|| SignerError::Other("no chains configured".to_string()))?;

        self.request(
            &chain.caip_network_id(),
            WcRequest::SignMessage {
                address: self.address.to_string(),
                message: hex_0x(data),
            },
        )
        .await
    }

    async fn sign_tx(&self, payload: &TxPayload) -> std::result::Result<Vec<u8>, SignerError> {
        let genesis = payload
            .extension("CheckGenesis")
            .ok_or_else(|| SignerError::MissingSignedExtension("CheckGenesis".to_string()))?;
        let genesis = hex_0x(&genesis.additional_signed);
        let extra = payload.extra();

        let transaction_payload = serde_json::json!({
            "address": self.address.to_string(),
            "genesisHash": genesis,
            "method": hex_0x(&payload.call_data),
            "signedExtensions": payload
                .signed_extensions
                .iter()
                .map(|ext| ext.identifier.clone())
                .collect::<Vec<_>>(),
            "extra": hex_0x(&extra),
            "additionalSigned": hex_0x(&payload.additional_signed()),
            "blockNumber": payload.at_block_number,
            "version": 4,
        });

        let signature = self
            .request(
                &caip_network_id(&genesis),
                WcRequest::SignTransaction {
                    address: self.address.to_string(),
                    transaction_payload,
                },
            )
            .await?;

        let (scheme, signature) = signature
            .split_first()
            .ok_or_else(|| SignerError::InvalidSignature("empty signature".to_string()))?;
        let scheme = SignatureScheme::from_tag(*scheme).ok_or_else(|| {
            SignerError::InvalidSignature(format!("unknown signature scheme {scheme:#04x}"))
        })?;

        Ok(signed_extrinsic_v4(
            &self.public_key(),
            scheme,
            signature,
            &extra,
            &payload.call_data,
        ))
    }
}

#[async_trait]
impl AccountProvider for WalletConnectProvider {
    fn id(&self) -> ProviderId {
        ProviderId::WALLET_CONNECT.into()
    }

    fn account_groups(&self) -> BoxStream<'static, Result<Vec<AccountGroup>>> {
        let inner = self.inner.clone();
        let id = self.id();
        self.inner
            .status
            .signal_cloned()
            .to_stream()
            .map(move |status| {
                inner
                    .accounts(&status)
                    .map(|accounts| vec![AccountGroup::new(id.clone(), accounts)])
            })
            .boxed()
    }

    async fn deserialize(&self, account: &SerializableAccount) -> Option<Account> {
        let status = self.inner.status.get_cloned();
        match self.inner.accounts(&status) {
            Ok(accounts) => accounts.into_iter().find(|a| a.address == account.address),
            Err(e) => {
                tracing::warn!("can't read walletconnect accounts: {e}");
                None
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{persist::MemoryPersistence, test_util::eventually};
    use futures::FutureExt;
    use polkahub_signer::SignedExtension;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn addr(n: u8) -> AccountAddress {
        AccountAddress::from_public_key([n; 32], 0).unwrap()
    }

    fn session(accounts: Vec<String>) -> WcSession {
        WcSession {
            topic: "topic-1".to_string(),
            namespaces: BTreeMap::from([(
                "polkadot".to_string(),
                WcNamespace {
                    accounts,
                    methods: vec![SIGN_TRANSACTION.to_string()],
                    events: vec![],
                },
            )]),
        }
    }

    struct MockClient {
        session: WcSession,
        approve: Mutable<bool>,
        disconnected: Mutex<Vec<String>>,
        requests: Mutex<Vec<(String, WcRequest)>>,
    }

    impl MockClient {
        fn new(session: WcSession) -> Self {
            Self {
                session,
                approve: Mutable::new(false),
                disconnected: Mutex::new(Vec::new()),
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl WalletConnectClient for MockClient {
        async fn connect(&self, namespace: RequiredNamespace) -> Result<PendingSession> {
            assert_eq!(namespace.methods.len(), 2);
            let approve = self.approve.signal().wait_for(true);
            let session = self.session.clone();
            Ok(PendingSession {
                uri: Some("wc:abc".to_string()),
                approval: async move {
                    approve.await;
                    Ok(session)
                }
                .boxed(),
            })
        }

        async fn disconnect(&self, topic: &str) -> Result<()> {
            self.disconnected.lock().push(topic.to_string());
            Ok(())
        }

        async fn request(
            &self,
            _topic: &str,
            chain_id: &str,
            request: WcRequest,
        ) -> Result<serde_json::Value> {
            self.requests.lock().push((chain_id.to_string(), request));
            let mut signature = vec![0x01];
            signature.extend([0x77; 64]);
            Ok(serde_json::json!({ "id": 1, "signature": hex_0x(&signature) }))
        }
    }

    #[derive(Default)]
    struct MockModal {
        opened: Mutex<Vec<String>>,
        closed: AtomicUsize,
    }

    impl ConnectModal for MockModal {
        fn open(&self, uri: &str) {
            self.opened.lock().push(uri.to_string());
        }

        fn close(&self) {
            self.closed.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn wc_account(n: u8) -> String {
        format!("polkadot:{}:{}", PolkadotChain::polkadot().id, addr(n))
    }

    #[tokio::test]
    async fn toggle_connect_and_disconnect() {
        let client = Arc::new(MockClient::new(session(vec![wc_account(1), wc_account(2)])));
        let modal = Arc::new(MockModal::default());
        let persist = Arc::new(MemoryPersistence::new());
        let provider = WalletConnectProvider::new(
            client.clone(),
            Some(modal.clone()),
            vec![PolkadotChain::polkadot()],
            persist.clone(),
        );

        provider.toggle();
        assert_eq!(provider.status(), WalletConnectStatus::Connecting);

        let opened = modal.clone();
        eventually(move || !opened.opened.lock().is_empty()).await;
        assert_eq!(modal.opened.lock()[0], "wc:abc");

        client.approve.set(true);
        let status = provider.clone();
        eventually(move || matches!(status.status(), WalletConnectStatus::Connected(_))).await;
        let closed = modal.clone();
        eventually(move || closed.closed.load(Ordering::SeqCst) == 1).await;
        assert!(persist.load().is_some());

        let groups = provider.account_groups().next().await.unwrap().unwrap();
        assert_eq!(groups[0].accounts.len(), 2);

        // a fresh provider picks the session back up
        let restored = WalletConnectProvider::new(
            client.clone(),
            None,
            vec![PolkadotChain::polkadot()],
            persist.clone(),
        );
        assert!(matches!(restored.status(), WalletConnectStatus::Connected(_)));

        provider.toggle();
        assert_eq!(provider.status(), WalletConnectStatus::Disconnected);
        assert!(persist.load().is_none());
        let disconnected = client.clone();
        eventually(move || disconnected.disconnected.lock().as_slice() == ["topic-1".to_string()]).await;
    }

    #[tokio::test]
    async fn cancelling_closes_modal() {
        let client = Arc::new(MockClient::new(session(vec![])));
        let modal = Arc::new(MockModal::default());
        let provider = WalletConnectProvider::new(
            client.clone(),
            Some(modal.clone()),
            vec![PolkadotChain::polkadot()],
            Arc::new(MemoryPersistence::new()),
        );

        provider.toggle();
        let opened = modal.clone();
        eventually(move || !opened.opened.lock().is_empty()).await;

        provider.cancel_connect();
        assert_eq!(provider.status(), WalletConnectStatus::Disconnected);
        let closed = modal.clone();
        eventually(move || closed.closed.load(Ordering::SeqCst) == 1).await;

        // a late approval changes nothing
        client.approve.set(true);
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert_eq!(provider.status(), WalletConnectStatus::Disconnected);
    }

    #[tokio::test]
    async fn signs_through_session() {
        let client = Arc::new(MockClient::new(session(vec![wc_account(3)])));
        let persist = Arc::new(MemoryPersistence::with_value(
            serde_json::to_string(&Some(session(vec![wc_account(3)]))).unwrap(),
        ));
        let provider = WalletConnectProvider::new(
            client.clone(),
            None,
            vec![PolkadotChain::polkadot()],
            persist,
        );

        let serialized = SerializableAccount::new(ProviderId::WALLET_CONNECT, addr(3));
        let account = provider.deserialize(&serialized).await.unwrap();
        let signer = account.signer.unwrap();

        let mut genesis = [0u8; 32];
        genesis[0] = 0x91;
        let payload = TxPayload {
            call_data: vec![1, 2],
            signed_extensions: vec![
                SignedExtension::new("CheckNonce", vec![0], vec![]),
                SignedExtension::new("CheckGenesis", vec![], genesis.to_vec()),
            ],
            ..Default::default()
        };
        let tx = signer.sign_tx(&payload).await.unwrap();
        assert!(tx.ends_with(&[0, 1, 2]));

        let requests = client.requests.lock();
        let (chain_id, request) = &requests[0];
        assert_eq!(chain_id, &format!("polkadot:91{}", "0".repeat(30)));
        assert_eq!(request.method(), SIGN_TRANSACTION);
        assert_eq!(request.params()["transactionPayload"]["method"], "0x0102");

        let missing = signer
            .sign_tx(&TxPayload::default())
            .await
            .unwrap_err();
        assert!(matches!(missing, SignerError::MissingSignedExtension(_)));
    }

    #[tokio::test]
    async fn malformed_session_is_an_error() {
        let persist = Arc::new(MemoryPersistence::with_value(
            serde_json::to_string(&Some(session(vec!["polkadot:nope".to_string()]))).unwrap(),
        ));
        let provider = WalletConnectProvider::new(
            Arc::new(MockClient::new(session(vec![]))),
            None,
            vec![],
            persist,
        );

        assert!(provider.account_groups().next().await.unwrap().is_err());
    }

    #[test]
    fn chain_ids() {
        let chain = PolkadotChain::new(
            "Local",
            "0x91b171bb158e2d3848fa23a9f1c25182fb8e20313b2c1eb49219da7a70ce90c3",
            Currency::dot(),
            "ws://localhost:9944",
            Some("polkadot.subscan.io"),
        )
        .unwrap();

        assert_eq!(chain.caip_network_id(), "polkadot:91b171bb158e2d3848fa23a9f1c25182");
        assert_eq!(chain.rpc_http, "http://localhost:9944/");
        assert_eq!(chain.rpc_ws, "ws://localhost:9944/");
        assert_eq!(chain.explorer.as_deref(), Some("https://polkadot.subscan.io/"));
        assert_eq!(PolkadotChain::polkadot().caip_network_id(), chain.caip_network_id());
    }
}
