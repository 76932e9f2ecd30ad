use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignerError {
    #[error("failed to sign: {0}")]
    SigningFailed(String),

    #[error("signing was cancelled")]
    Cancelled,

    #[error("device already in use")]
    DeviceBusy,

    #[error("device mismatch: the connected device does not hold this account")]
    DeviceMismatch,

    #[error("missing {0} signed extension")]
    MissingSignedExtension(String),

    #[error("rejected: {0}")]
    Rejected(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    #[error("address error: {0}")]
    Address(#[from] polkahub_address::AddressError),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, SignerError>;
