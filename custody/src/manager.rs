use common::encryption::{is_matching_pair, rsa_oaep, KeyGeneration};
use common::{AsymmetricKeyPair, Result, TrackError};
use log::{info, warn};
use std::path::Path;
use crate::store::{write_private, CredentialStore};

/// Owns the private key of each principal on this device.
pub struct KeyCustodyManager<S: CredentialStore> {
    store: S,
}

impl<S: CredentialStore> KeyCustodyManager<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Persists `private_key_pem` for `principal_id`, replacing any
    /// previous key.
    pub fn store(&self, principal_id: &str, private_key_pem: &str) -> Result<()> {
        rsa_oaep::parse_private_key(private_key_pem)?;
        self.store.save(principal_id, private_key_pem)?;
        info!("Stored private key for {}", principal_id);
        Ok(())
    }

    pub fn retrieve(&self, principal_id: &str) -> Result<Option<String>> {
        self.store.load(principal_id)
    }

    /// The stored key, or `PrivateKeyMissingError` telling the user to
    /// re-authenticate or restore a backup.
    pub fn require(&self, principal_id: &str) -> Result<String> {
        self.retrieve(principal_id)?.ok_or_else(|| {
            warn!("No private key in custody for {}", principal_id);
            TrackError::PrivateKeyMissingError(principal_id.to_string())
        })
    }

    /// Signup path: generates a pair and keeps the private half. Refuses
    /// when the principal already holds a key, since replacing it would
    /// orphan everything encrypted to the old public key.
    pub fn register<G: KeyGeneration>(&self, principal_id: &str, generator: &G) -> Result<AsymmetricKeyPair> {
        if self.retrieve(principal_id)?.is_some() {
            return Err(TrackError::KeyPairExistsError(principal_id.to_string()));
        }

        let pair = generator.generate_key_pair()?;
        // a concurrent registration may have stored a key since the check
        if !self.store.save_new(principal_id, &pair.private_key)? {
            warn!("Concurrent registration for {} kept the existing key", principal_id);
            return Err(TrackError::KeyPairExistsError(principal_id.to_string()));
        }
        info!("Registered key pair for {}", principal_id);
        Ok(pair)
    }

    /// Checks the custody key against the public key published for the
    /// principal.
    pub fn verify_pairing(&self, principal_id: &str, public_key_pem: &str) -> Result<()> {
        let private_key = self.require(principal_id)?;
        if is_matching_pair(&private_key, public_key_pem)? {
            Ok(())
        } else {
            Err(TrackError::KeyPairMismatchError(principal_id.to_string()))
        }
    }

    /// Raw PEM bytes for an offline backup. The output is NOT encrypted.
    pub fn export_backup(&self, principal_id: &str) -> Result<Vec<u8>> {
        let private_key = self.require(principal_id)?;
        warn!(
            "Exporting unencrypted private key backup for {}; store it offline and treat it as a secret",
            principal_id
        );
        Ok(private_key.into_bytes())
    }

    pub fn export_backup_to(&self, principal_id: &str, path: &Path) -> Result<()> {
        let backup = self.export_backup(principal_id)?;
        write_private(path, &backup)?;
        info!("Wrote key backup for {} to {}", principal_id, path.display());
        Ok(())
    }

    pub fn restore_backup(&self, principal_id: &str, backup: &[u8]) -> Result<()> {
        let pem = std::str::from_utf8(backup)
            .map_err(|e| TrackError::InvalidPrivateKeyError(e.to_string()))?;
        self.store(principal_id, pem.trim())?;
        info!("Restored private key for {} from backup", principal_id);
        Ok(())
    }

    /// Deletes the key. Only an explicit user action should call this.
    pub fn forget(&self, principal_id: &str) -> Result<()> {
        self.store.remove(principal_id)?;
        warn!("Removed private key for {} from this device", principal_id);
        Ok(())
    }
}
