use thiserror::Error;

pub type Result<T> = std::result::Result<T, TrackError>;

/// Message shown for every failure that happens after the private key has
/// been parsed. Key recovery and payload decryption share it on purpose so
/// the caller cannot tell which stage rejected the input.
pub const DECRYPTION_FAILED_MESSAGE: &str =
    "unable to decrypt: this item may not be intended for you, or your key is incorrect";

#[derive(Error, Debug)]
pub enum TrackError {
    #[error("Key generation error: {0}")]
    KeyGenerationError(String),
    #[error("Invalid public key: {0}")]
    InvalidPublicKeyError(String),
    #[error("{}", DECRYPTION_FAILED_MESSAGE)]
    InvalidPrivateKeyError(String),
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("{}", DECRYPTION_FAILED_MESSAGE)]
    KeyRecoveryError(String),
    #[error("{}", DECRYPTION_FAILED_MESSAGE)]
    PayloadDecryptionError(String),
    #[error("No encrypted key found for shipment {0}")]
    KeyNotFoundError(String),
    #[error("Key store unavailable: {0}")]
    KeyStoreUnavailableError(String),
    #[error("Private key not found for {0}; re-authenticate or restore from backup")]
    PrivateKeyMissingError(String),
    #[error("A key pair is already registered for {0}")]
    KeyPairExistsError(String),
    #[error("Stored private key for {0} does not match the published public key")]
    KeyPairMismatchError(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Storage error: {0}")]
    StorageError(String),
}

/// Coarse grouping used to decide what the caller does next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Wrong key material or tampered ciphertext. Never retried.
    DecryptionFailed,
    /// Missing key material the user can restore or have re-issued.
    Recoverable,
    /// Transient transport failure.
    Retryable,
    /// Aborts the surrounding flow.
    Fatal,
    /// Caller supplied something unusable.
    InvalidInput,
}

impl TrackError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidPrivateKeyError(_)
            | Self::KeyRecoveryError(_)
            | Self::PayloadDecryptionError(_) => ErrorCategory::DecryptionFailed,
            Self::KeyNotFoundError(_)
            | Self::PrivateKeyMissingError(_)
            | Self::KeyPairMismatchError(_) => ErrorCategory::Recoverable,
            Self::KeyStoreUnavailableError(_) => ErrorCategory::Retryable,
            Self::KeyGenerationError(_)
            | Self::ConfigError(_)
            | Self::StorageError(_) => ErrorCategory::Fatal,
            Self::InvalidPublicKeyError(_)
            | Self::SerializationError(_)
            | Self::KeyPairExistsError(_) => ErrorCategory::InvalidInput,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.category() == ErrorCategory::Retryable
    }

    pub fn is_decryption_failure(&self) -> bool {
        self.category() == ErrorCategory::DecryptionFailed
    }

    /// Text suitable for an end user. Internal details stay in the
    /// variant payload and the logs.
    pub fn user_message(&self) -> String {
        match self {
            Self::KeyNotFoundError(_) => {
                "The encrypted key for this shipment could not be found. \
                 Ask the sender to re-issue it."
                    .to_string()
            }
            Self::KeyStoreUnavailableError(_) => {
                "The key store is not reachable right now. Try again later.".to_string()
            }
            Self::PrivateKeyMissingError(_) => {
                "Private key not found on this device. Re-authenticate or restore it from your backup."
                    .to_string()
            }
            Self::KeyPairMismatchError(_) => {
                "The private key on this device does not match your published key. \
                 Restore the correct backup."
                    .to_string()
            }
            Self::KeyGenerationError(_) => {
                "Could not generate encryption keys. Registration was aborted.".to_string()
            }
            _ if self.is_decryption_failure() => DECRYPTION_FAILED_MESSAGE.to_string(),
            other => other.to_string(),
        }
    }
}

impl From<std::io::Error> for TrackError {
    fn from(err: std::io::Error) -> Self {
        TrackError::StorageError(err.to_string())
    }
}

impl From<serde_json::Error> for TrackError {
    fn from(err: serde_json::Error) -> Self {
        TrackError::SerializationError(err.to_string())
    }
}
