mod address;
mod error;
mod hash;
mod multisig;

pub use address::*;
pub use error::*;
pub use hash::*;
pub use multisig::*;
