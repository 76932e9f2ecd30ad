use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("invalid address format: {0}")]
    InvalidFormat(String),

    #[error("invalid address length: {0} bytes")]
    InvalidLength(usize),

    #[error("invalid ss58 prefix byte: {0:#04x}")]
    InvalidPrefix(u8),

    #[error("ss58 format out of range: {0}")]
    FormatOutOfRange(u16),

    #[error("ss58 checksum mismatch")]
    BadChecksum,

    #[error("multisig needs at least one signatory")]
    NoSignatories,

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, AddressError>;
