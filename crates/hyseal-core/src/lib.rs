pub mod config;
pub mod error;

pub use config::{CryptoConfig, HysealConfig, KeysConfig, LogConfig};
pub use error::{HysealError, HysealResult};
