use crate::{
    error::{AddressError, Result},
    hash::ss58_checksum,
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub type PublicKey = [u8; 32];

/// Generic substrate format, used when nothing else is known
pub const SS58_GENERIC_FORMAT: u16 = 42;

/// The canonical type used everywhere for addresses
/// Display is the address exactly as it was given (SS58 or 0x-prefixed hex)
///
/// Equality is textual, i.e. the same key under two network prefixes is two different addresses.
/// Use `addr_eq` to compare the underlying public keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccountAddress {
    text: String,
    public_key: PublicKey,
    // None for hex addresses
    format: Option<u16>,
}

impl AccountAddress {
    pub fn new(value: &str) -> Result<Self> {
        let value = value.trim();

        if let Some(hex_str) = value.strip_prefix("0x") {
            let bytes =
                hex::decode(hex_str).map_err(|e| AddressError::InvalidFormat(e.to_string()))?;
            let public_key: PublicKey = bytes
                .as_slice()
                .try_into()
                .map_err(|_| AddressError::InvalidLength(bytes.len()))?;
            return Ok(Self {
                text: value.to_string(),
                public_key,
                format: None,
            });
        }

        let (format, public_key) = ss58_decode(value)?;
        Ok(Self {
            text: value.to_string(),
            public_key,
            format: Some(format),
        })
    }

    pub fn from_public_key(public_key: PublicKey, format: u16) -> Result<Self> {
        Ok(Self {
            text: ss58_encode(format, &public_key)?,
            public_key,
            format: Some(format),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    pub fn ss58_format(&self) -> Option<u16> {
        self.format
    }

    /// Same key, re-encoded for another network
    pub fn with_format(&self, format: u16) -> Result<Self> {
        Self::from_public_key(self.public_key, format)
    }
}

/// Compares the underlying public keys, ignoring the network prefix
pub fn addr_eq(a: &AccountAddress, b: &AccountAddress) -> bool {
    a.public_key == b.public_key
}

impl std::fmt::Display for AccountAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.text)
    }
}

impl FromStr for AccountAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for AccountAddress {
    type Error = AddressError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(&value)
    }
}

impl From<AccountAddress> for String {
    fn from(addr: AccountAddress) -> Self {
        addr.text
    }
}

// https://docs.substrate.io/reference/address-formats/
pub fn ss58_decode(value: &str) -> Result<(u16, PublicKey)> {
    let data = bs58::decode(value)
        .into_vec()
        .map_err(|e| AddressError::InvalidFormat(e.to_string()))?;

    if data.len() < 2 {
        return Err(AddressError::InvalidLength(data.len()));
    }

    let (prefix_len, format) = match data[0] {
        0..=63 => (1, data[0] as u16),
        64..=127 => {
            let lower = (data[0] << 2) | (data[1] >> 6);
            let upper = data[1] & 0b0011_1111;
            (2, (lower as u16) | ((upper as u16) << 8))
        }
        _ => return Err(AddressError::InvalidPrefix(data[0])),
    };

    if data.len() != prefix_len + 32 + 2 {
        return Err(AddressError::InvalidLength(data.len()));
    }

    let body_len = prefix_len + 32;
    if ss58_checksum(&data[..body_len]) != data[body_len..] {
        return Err(AddressError::BadChecksum);
    }

    let mut public_key = [0u8; 32];
    public_key.copy_from_slice(&data[prefix_len..body_len]);

    Ok((format, public_key))
}

pub fn ss58_encode(format: u16, public_key: &PublicKey) -> Result<String> {
    let mut data = match format {
        0..=63 => vec![format as u8],
        64..=16_383 => {
            let first = ((format & 0b0000_0000_1111_1100) as u8) >> 2;
            let second = ((format >> 8) as u8) | (((format & 0b0000_0000_0000_0011) as u8) << 6);
            vec![first | 0b0100_0000, second]
        }
        _ => return Err(AddressError::FormatOutOfRange(format)),
    };

    data.extend_from_slice(public_key);
    let checksum = ss58_checksum(&data);
    data.extend_from_slice(&checksum);

    Ok(bs58::encode(data).into_string())
}
