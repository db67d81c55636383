pub mod error;
pub mod types;
pub mod config;
pub mod encryption;

pub use error::{ErrorCategory, Result, TrackError, DECRYPTION_FAILED_MESSAGE};
pub use types::*;
pub use config::*;
