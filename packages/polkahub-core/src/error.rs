use crate::account::ProviderId;
use polkahub_address::AddressError;
use polkahub_signer::SignerError;
use thiserror::Error;

/// The main error type for polkahub-core operations
///
/// Most failures inside providers never surface as errors: an account that can't be
/// reconstructed is `None`, a parent that can't be resolved leaves the account without
/// a signer. What's left here is what callers can act on.
#[derive(Error, Debug)]
pub enum HubError {
    #[error("provider not found: {0}")]
    ProviderNotFound(ProviderId),

    #[error("timed out: {0}")]
    Timeout(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("address error: {0}")]
    Address(#[from] AddressError),

    #[error("signer error: {0}")]
    Signer(#[from] SignerError),

    #[error("config error: {0}")]
    Config(#[from] polkahub_config::ConfigError),

    /// The extension is waiting on the user to authorize the dapp
    #[error("extension {0} has a pending authorization request")]
    PendingAuthorization(String),

    #[error("extension error: {0}")]
    Extension(String),

    #[error("walletconnect error: {0}")]
    WalletConnect(String),

    #[error("invalid frame: {0}")]
    InvalidFrame(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl HubError {
    pub fn timeout(what: impl ToString) -> Self {
        Self::Timeout(what.to_string())
    }

    pub fn extension(msg: impl ToString) -> Self {
        Self::Extension(msg.to_string())
    }

    pub fn wallet_connect(msg: impl ToString) -> Self {
        Self::WalletConnect(msg.to_string())
    }

    pub fn invalid_frame(msg: impl ToString) -> Self {
        Self::InvalidFrame(msg.to_string())
    }
}

pub type Result<T> = std::result::Result<T, HubError>;
