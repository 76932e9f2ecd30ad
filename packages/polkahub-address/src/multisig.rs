use crate::{
    address::{AccountAddress, PublicKey, SS58_GENERIC_FORMAT},
    error::{AddressError, Result},
    hash::blake2_256,
};
use parity_scale_codec::Encode;

const MULTISIG_ENTROPY_PREFIX: &[u8; 16] = b"modlpy/utilisuba";

/// Same derivation as `pallet_multisig::multi_account_id`
/// signatories are sorted (and deduplicated) first, so their order doesn't matter
pub fn multisig_account_id(signatories: &[PublicKey], threshold: u16) -> PublicKey {
    let mut who = signatories.to_vec();
    who.sort();
    who.dedup();

    let entropy = (MULTISIG_ENTROPY_PREFIX, who, threshold).encode();
    blake2_256(&entropy)
}

/// The multisig address is encoded in the network format of the first signatory
pub fn multisig_address(signatories: &[AccountAddress], threshold: u16) -> Result<AccountAddress> {
    let first = signatories.first().ok_or(AddressError::NoSignatories)?;
    let keys: Vec<PublicKey> = signatories.iter().map(|s| *s.public_key()).collect();

    AccountAddress::from_public_key(
        multisig_account_id(&keys, threshold),
        first.ss58_format().unwrap_or(SS58_GENERIC_FORMAT),
    )
}
