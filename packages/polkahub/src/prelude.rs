pub use polkahub_core::prelude::*;

pub use polkahub_address::{addr_eq, multisig_address, AccountAddress, AddressError, PublicKey};
pub use polkahub_config::{CallIndex, HubConfig, MultisigCallIndex};
pub use polkahub_signer::{
    FakeSigner, MultisigChainApi, ProxySigner, SignatureScheme, SignedExtension, Signer,
    SignerError, TxPayload,
};
