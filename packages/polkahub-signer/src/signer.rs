use crate::error::Result;
use async_trait::async_trait;
use polkahub_address::PublicKey;

/// Anything that can produce signatures for one public key
///
/// Implementations range from in-memory fakes to hardware devices and remote wallets,
/// so every signing call is async and may fail (or be cancelled by the user)
#[async_trait]
pub trait Signer: Send + Sync {
    fn public_key(&self) -> PublicKey;

    /// Signs arbitrary bytes, returning the raw signature
    async fn sign_bytes(&self, data: &[u8]) -> Result<Vec<u8>>;

    /// Signs a transaction, returning the signed extrinsic ready to broadcast
    async fn sign_tx(&self, payload: &TxPayload) -> Result<Vec<u8>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SignatureScheme {
    Ed25519 = 0x00,
    Sr25519 = 0x01,
    Ecdsa = 0x02,
}

impl SignatureScheme {
    // the variant index in `MultiSignature`
    pub fn tag(self) -> u8 {
        self as u8
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0x00 => Some(Self::Ed25519),
            0x01 => Some(Self::Sr25519),
            0x02 => Some(Self::Ecdsa),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignedExtension {
    pub identifier: String,
    pub value: Vec<u8>,
    pub additional_signed: Vec<u8>,
}

impl SignedExtension {
    pub fn new(identifier: impl ToString, value: Vec<u8>, additional_signed: Vec<u8>) -> Self {
        Self {
            identifier: identifier.to_string(),
            value,
            additional_signed,
        }
    }
}

/// Everything a signer gets to see of a transaction
/// `signed_extensions` must be in the order the runtime metadata declares them
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TxPayload {
    pub call_data: Vec<u8>,
    pub signed_extensions: Vec<SignedExtension>,
    pub metadata: Vec<u8>,
    pub at_block_number: u32,
}

impl TxPayload {
    pub fn extension(&self, identifier: &str) -> Option<&SignedExtension> {
        self.signed_extensions
            .iter()
            .find(|ext| ext.identifier == identifier)
    }

    /// All the extension values, concatenated
    pub fn extra(&self) -> Vec<u8> {
        self.signed_extensions
            .iter()
            .flat_map(|ext| ext.value.iter().copied())
            .collect()
    }

    pub fn additional_signed(&self) -> Vec<u8> {
        self.signed_extensions
            .iter()
            .flat_map(|ext| ext.additional_signed.iter().copied())
            .collect()
    }

    /// Same transaction context with a different call, used by wrapping signers
    pub fn with_call_data(&self, call_data: Vec<u8>) -> Self {
        Self {
            call_data,
            ..self.clone()
        }
    }
}
