//! Shared fixtures for the end-to-end flows: tracing setup and in-process
//! stand-ins for a Ledger device and a chain.

use async_trait::async_trait;
use polkahub::prelude::*;
use polkahub::signer::{MultisigStatus, Weight};
use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Safe to call from every test, only the first one installs the subscriber
pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .without_time()
                .with_target(false)
                .with_test_writer(),
        )
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

pub fn addr(n: u8) -> AccountAddress {
    AccountAddress::from_public_key([n; 32], 0).unwrap()
}

/// Polls `f` until it holds, panics after two seconds
pub async fn eventually(f: impl Fn() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !f() {
        if tokio::time::Instant::now() > deadline {
            panic!("condition never became true");
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// A device whose key at `index` is `[device_id + index; 32]`, and whose
/// "signed extrinsic" is the call data it was asked to sign
pub struct MockLedger {
    pub device_id: u32,
    pub opened: Arc<AtomicUsize>,
    pub signed: Arc<Mutex<Vec<TxPayload>>>,
}

impl MockLedger {
    pub fn new(device_id: u32) -> Self {
        Self {
            device_id,
            opened: Arc::new(AtomicUsize::new(0)),
            signed: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

struct MockLedgerDevice {
    device_id: u32,
    signed: Arc<Mutex<Vec<TxPayload>>>,
}

#[async_trait]
impl LedgerBackend for MockLedger {
    async fn open(&self) -> std::result::Result<Box<dyn LedgerDevice>, SignerError> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockLedgerDevice {
            device_id: self.device_id,
            signed: self.signed.clone(),
        }))
    }

    async fn network_info(&self) -> std::result::Result<NetworkInfo, SignerError> {
        Ok(NetworkInfo {
            ss58_format: 0,
            decimals: 10,
            token_symbol: "DOT".to_string(),
        })
    }
}

#[async_trait]
impl LedgerDevice for MockLedgerDevice {
    async fn device_id(&mut self) -> std::result::Result<u32, SignerError> {
        Ok(self.device_id)
    }

    async fn public_key(&mut self, index: u32) -> std::result::Result<PublicKey, SignerError> {
        Ok([(self.device_id + index) as u8; 32])
    }

    async fn sign_bytes(
        &mut self,
        _index: u32,
        _data: &[u8],
    ) -> std::result::Result<Vec<u8>, SignerError> {
        Ok(vec![0xee; 64])
    }

    async fn sign_tx(
        &mut self,
        _index: u32,
        _network: &NetworkInfo,
        payload: &TxPayload,
    ) -> std::result::Result<Vec<u8>, SignerError> {
        self.signed.lock().unwrap().push(payload.clone());
        Ok(payload.call_data.clone())
    }

    fn close(&mut self) {}
}

/// A chain with no open multisig operations
#[derive(Default)]
pub struct MockChain;

#[async_trait]
impl MultisigChainApi for MockChain {
    async fn multisig_status(
        &self,
        _multisig: &AccountAddress,
        _call_hash: [u8; 32],
    ) -> std::result::Result<Option<MultisigStatus>, SignerError> {
        Ok(None)
    }

    async fn call_weight(&self, _call_data: &[u8]) -> std::result::Result<Weight, SignerError> {
        Ok(Weight {
            ref_time: 1_000,
            proof_size: 10,
        })
    }
}
