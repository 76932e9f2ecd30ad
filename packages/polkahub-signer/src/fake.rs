use crate::{
    error::Result,
    extrinsic::signed_extrinsic_v4,
    signer::{SignatureScheme, Signer, TxPayload},
};
use async_trait::async_trait;
use polkahub_address::PublicKey;

/// Recognisable placeholder: `deadbeef` followed by `0xcd` filler
pub const FAKE_SIGNATURE: [u8; 64] = {
    let mut sig = [0xcd; 64];
    sig[0] = 0xde;
    sig[1] = 0xad;
    sig[2] = 0xbe;
    sig[3] = 0xef;
    sig
};

/// Produces correctly-shaped but invalid signatures, for fee estimation and
/// read-only accounts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FakeSigner {
    public_key: PublicKey,
}

impl FakeSigner {
    pub fn new(public_key: PublicKey) -> Self {
        Self { public_key }
    }
}

#[async_trait]
impl Signer for FakeSigner {
    fn public_key(&self) -> PublicKey {
        self.public_key
    }

    async fn sign_bytes(&self, _data: &[u8]) -> Result<Vec<u8>> {
        Ok(FAKE_SIGNATURE.to_vec())
    }

    async fn sign_tx(&self, payload: &TxPayload) -> Result<Vec<u8>> {
        Ok(signed_extrinsic_v4(
            &self.public_key,
            SignatureScheme::Sr25519,
            &FAKE_SIGNATURE,
            &payload.extra(),
            &payload.call_data,
        ))
    }
}
