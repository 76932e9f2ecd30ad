mod config;
mod error;
pub mod util;

pub use config::*;
pub use error::*;
