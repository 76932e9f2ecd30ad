use crate::{
    error::Result,
    signer::{Signer, TxPayload},
};
use async_trait::async_trait;
use polkahub_address::{AccountAddress, PublicKey};
use polkahub_config::CallIndex;
use std::sync::Arc;

const MULTI_ADDRESS_ID: u8 = 0x00;
const NO_FORCE_PROXY_TYPE: u8 = 0x00;

/// `Proxy::proxy(real, None, call)`
pub fn proxy_call(call_index: CallIndex, real: &PublicKey, call_data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(2 + 1 + 32 + 1 + call_data.len());
    out.extend_from_slice(&call_index.to_bytes());
    out.push(MULTI_ADDRESS_ID);
    out.extend_from_slice(real);
    out.push(NO_FORCE_PROXY_TYPE);
    out.extend_from_slice(call_data);
    out
}

/// Signs as the delegate, wrapping every call in a proxy call on behalf of `real`
#[derive(Clone)]
pub struct ProxySigner {
    real: AccountAddress,
    parent: Arc<dyn Signer>,
    call_index: CallIndex,
}

impl std::fmt::Debug for ProxySigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxySigner")
            .field("real", &self.real)
            .field("delegate", &hex::encode(self.parent.public_key()))
            .finish()
    }
}

impl ProxySigner {
    pub fn new(real: AccountAddress, parent: Arc<dyn Signer>, call_index: CallIndex) -> Self {
        Self {
            real,
            parent,
            call_index,
        }
    }

    pub fn real(&self) -> &AccountAddress {
        &self.real
    }

    pub fn parent(&self) -> &Arc<dyn Signer> {
        &self.parent
    }
}

#[async_trait]
impl Signer for ProxySigner {
    // the delegate is who actually signs the extrinsic
    fn public_key(&self) -> PublicKey {
        self.parent.public_key()
    }

    async fn sign_bytes(&self, data: &[u8]) -> Result<Vec<u8>> {
        self.parent.sign_bytes(data).await
    }

    async fn sign_tx(&self, payload: &TxPayload) -> Result<Vec<u8>> {
        let wrapped = proxy_call(self.call_index, self.real.public_key(), &payload.call_data);
        tracing::debug!("wrapping call in proxy for {}", self.real);
        self.parent.sign_tx(&payload.with_call_data(wrapped)).await
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::fake::FakeSigner;

    #[test]
    fn proxy_call_layout() {
        let call = proxy_call(CallIndex::POLKADOT_PROXY, &[7; 32], &[1, 2, 3]);
        assert_eq!(&call[..3], &[29, 0, 0]);
        assert_eq!(&call[3..35], &[7; 32]);
        assert_eq!(&call[35..], &[0, 1, 2, 3]);
    }

    #[tokio::test]
    async fn signs_with_delegate_key() {
        let real = AccountAddress::from_public_key([7; 32], 0).unwrap();
        let signer = ProxySigner::new(
            real,
            Arc::new(FakeSigner::new([3; 32])),
            CallIndex::new(42, 0),
        );

        assert_eq!(signer.public_key(), [3; 32]);

        let payload = TxPayload {
            call_data: vec![1, 2, 3],
            ..Default::default()
        };
        let tx = signer.sign_tx(&payload).await.unwrap();

        let mut expected_tail = vec![42, 0, 0];
        expected_tail.extend([7; 32]);
        expected_tail.extend([0, 1, 2, 3]);
        assert!(tx.ends_with(&expected_tail));
    }
}
