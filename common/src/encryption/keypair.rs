//! Key pair generation for receiving principals.

use log::{debug, info};
use rand::rngs::OsRng;
use rsa::{RsaPrivateKey, RsaPublicKey};
use crate::config::DEFAULT_RSA_KEY_BITS;
use crate::encryption::rsa_oaep::{self, MIN_MODULUS_BITS};
use crate::error::{Result, TrackError};
use crate::types::AsymmetricKeyPair;

pub trait KeyGeneration {
    fn generate_key_pair(&self) -> Result<AsymmetricKeyPair>;
}

#[derive(Debug, Clone, Copy)]
pub struct KeyPairProvider {
    bits: usize,
}

impl KeyPairProvider {
    pub fn new(bits: usize) -> Result<Self> {
        if bits < MIN_MODULUS_BITS {
            return Err(TrackError::KeyGenerationError(format!(
                "RSA keys must be at least {} bits, requested {}",
                MIN_MODULUS_BITS, bits
            )));
        }
        Ok(Self { bits })
    }

    pub fn bits(&self) -> usize {
        self.bits
    }

    pub fn generate(&self) -> Result<AsymmetricKeyPair> {
        debug!("Generating {}-bit RSA key pair", self.bits);
        let private_key = RsaPrivateKey::new(&mut OsRng, self.bits)
            .map_err(|e| TrackError::KeyGenerationError(e.to_string()))?;
        let public_key = RsaPublicKey::from(&private_key);

        let pair = AsymmetricKeyPair {
            public_key: rsa_oaep::public_key_to_pem(&public_key)?,
            private_key: rsa_oaep::private_key_to_pem(&private_key)?.as_str().to_owned(),
        };
        info!("Generated {}-bit RSA key pair", self.bits);
        Ok(pair)
    }
}

impl Default for KeyPairProvider {
    fn default() -> Self {
        Self { bits: DEFAULT_RSA_KEY_BITS }
    }
}

impl KeyGeneration for KeyPairProvider {
    fn generate_key_pair(&self) -> Result<AsymmetricKeyPair> {
        self.generate()
    }
}

/// Derives the SPKI public key from a private key PEM.
pub fn public_key_pem_from_private(private_key_pem: &str) -> Result<String> {
    let private_key = rsa_oaep::parse_private_key(private_key_pem)?;
    rsa_oaep::public_key_to_pem(&private_key.to_public_key())
}

/// True when `private_key_pem` is the other half of `public_key_pem`.
pub fn is_matching_pair(private_key_pem: &str, public_key_pem: &str) -> Result<bool> {
    let private_key = rsa_oaep::parse_private_key(private_key_pem)?;
    let public_key = rsa_oaep::parse_public_key(public_key_pem)?;
    Ok(private_key.to_public_key() == public_key)
}
