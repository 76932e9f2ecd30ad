mod error;
mod extrinsic;
mod fake;
mod multisig;
mod proxy;
mod signer;

pub use error::*;
pub use extrinsic::*;
pub use fake::*;
pub use multisig::*;
pub use proxy::*;
pub use signer::*;
