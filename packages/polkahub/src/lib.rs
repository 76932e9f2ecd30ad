pub mod prelude;

pub use polkahub_core::{
    // listed manually so the core prelude is only reachable through ours
    account,
    context,
    error,
    hub,
    persist,
    provider,
    providers,
    qr,
    selected,
    task,
};

pub mod address {
    pub use polkahub_address::*;
}

pub mod config {
    pub use polkahub_config::*;
}

pub mod signer {
    pub use polkahub_signer::*;
}
