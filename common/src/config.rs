use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use crate::error::{Result, TrackError};

pub const DEFAULT_API_URL: &str = "http://localhost:4000";
pub const DEFAULT_CONTRACT_ADDRESS: &str = "0x0fDab3D07a2aC7A7dBeC2682699e7c3eDD042B07";
pub const DEFAULT_RSA_KEY_BITS: usize = 2048;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api_url: String,
    pub ledger_url: String,
    pub contract_address: String,
    pub redis_url: String,
    pub custody_dir: PathBuf,
    pub session_dir: PathBuf,
    pub rsa_key_bits: usize,
    pub key_store: KeyStoreConfig,
}

/// Timeout and retry settings for external key lookups.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyStoreConfig {
    pub timeout: Duration,
    pub retry_attempts: u32,
    pub retry_delay: Duration,
}

impl Default for KeyStoreConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(5000),
            retry_attempts: 3,
            retry_delay: Duration::from_millis(200),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let base = default_data_dir();
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            ledger_url: format!("{}/api/ledger", DEFAULT_API_URL),
            contract_address: DEFAULT_CONTRACT_ADDRESS.to_string(),
            redis_url: "redis://127.0.0.1:6379".to_string(),
            custody_dir: base.join("keys"),
            session_dir: base.join("session"),
            rsa_key_bits: DEFAULT_RSA_KEY_BITS,
            key_store: KeyStoreConfig::default(),
        }
    }
}

impl Config {
    /// Loads configuration from the environment, falling back to defaults.
    pub fn load() -> Result<Self> {
        let defaults = Self::default();
        let api_url = std::env::var("API_URL").unwrap_or(defaults.api_url);
        let ledger_url = std::env::var("LEDGER_URL")
            .unwrap_or_else(|_| format!("{}/api/ledger", api_url.trim_end_matches('/')));

        Ok(Self {
            ledger_url,
            api_url,
            contract_address: std::env::var("CONTRACT_ADDRESS")
                .unwrap_or(defaults.contract_address),
            redis_url: std::env::var("REDIS_URL").unwrap_or(defaults.redis_url),
            custody_dir: std::env::var("CUSTODY_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.custody_dir),
            session_dir: std::env::var("SESSION_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.session_dir),
            rsa_key_bits: env_number("RSA_KEY_BITS", defaults.rsa_key_bits)?,
            key_store: KeyStoreConfig {
                timeout: Duration::from_millis(env_number(
                    "KEY_STORE_TIMEOUT_MS",
                    defaults.key_store.timeout.as_millis() as u64,
                )?),
                retry_attempts: env_number(
                    "KEY_STORE_RETRY_ATTEMPTS",
                    defaults.key_store.retry_attempts,
                )?,
                retry_delay: Duration::from_millis(env_number(
                    "KEY_STORE_RETRY_DELAY_MS",
                    defaults.key_store.retry_delay.as_millis() as u64,
                )?),
            },
        })
    }
}

fn env_number<T: std::str::FromStr>(name: &str, default: T) -> Result<T> {
    match std::env::var(name) {
        Ok(value) => value.trim().parse().map_err(|_| {
            TrackError::ConfigError(format!("{} must be a number, got '{}'", name, value))
        }),
        Err(_) => Ok(default),
    }
}

fn default_data_dir() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(".securetrack")
}
