pub mod account;
pub mod context;
pub mod error;
pub mod hub;
pub mod persist;
pub mod prelude;
pub mod provider;
pub mod providers;
pub mod qr;
pub mod selected;
pub mod task;
