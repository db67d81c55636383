//! AES-256-CBC content cipher with PKCS#7 padding.
//!
//! Output layout is `IV || ciphertext`, the IV being freshly drawn from the
//! OS RNG on every call.

use aes::Aes256;
use cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::{rngs::OsRng, RngCore};
use zeroize::Zeroizing;
use crate::error::{Result, TrackError};

pub const KEY_LEN: usize = 32;
pub const IV_LEN: usize = 16;
pub const BLOCK_SIZE: usize = 16;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// Single-use symmetric key for one envelope. Wiped on drop.
pub struct ContentKey {
    key: Zeroizing<[u8; KEY_LEN]>,
}

impl ContentKey {
    pub fn generate() -> Self {
        let mut key = Zeroizing::new([0u8; KEY_LEN]);
        OsRng.fill_bytes(&mut *key);
        Self { key }
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != KEY_LEN {
            return Err(TrackError::KeyRecoveryError(format!(
                "content key must be {} bytes, got {}",
                KEY_LEN,
                bytes.len()
            )));
        }
        let mut key = Zeroizing::new([0u8; KEY_LEN]);
        key.copy_from_slice(bytes);
        Ok(Self { key })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.key[..]
    }

    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let mut iv = [0u8; IV_LEN];
        OsRng.fill_bytes(&mut iv);

        let cipher = Aes256CbcEnc::new_from_slices(&self.key[..], &iv)
            .map_err(|e| TrackError::KeyGenerationError(e.to_string()))?;
        let ciphertext = cipher.encrypt_padded_vec_mut::<Pkcs7>(plaintext);

        let mut output = Vec::with_capacity(IV_LEN + ciphertext.len());
        output.extend_from_slice(&iv);
        output.extend_from_slice(&ciphertext);
        Ok(output)
    }

    pub fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>> {
        check_layout(data)?;
        let (iv, ciphertext) = data.split_at(IV_LEN);

        let cipher = Aes256CbcDec::new_from_slices(&self.key[..], iv)
            .map_err(|e| TrackError::PayloadDecryptionError(e.to_string()))?;
        cipher
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(|_| TrackError::PayloadDecryptionError("invalid padding".to_string()))
    }
}

/// IV plus at least one whole block.
pub fn check_layout(data: &[u8]) -> Result<()> {
    if data.len() < IV_LEN + BLOCK_SIZE || (data.len() - IV_LEN) % BLOCK_SIZE != 0 {
        return Err(TrackError::PayloadDecryptionError(format!(
            "malformed ciphertext length {}",
            data.len()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encryption_roundtrip() {
        let key = ContentKey::generate();
        let data = b"temperature excursion at 08:14";

        let encrypted = key.encrypt(data).unwrap();
        assert_eq!((encrypted.len() - IV_LEN) % BLOCK_SIZE, 0);

        let decrypted = key.decrypt(&encrypted).unwrap();
        assert_eq!(data, &decrypted[..]);
    }

    #[test]
    fn test_padding() {
        let key = ContentKey::generate();
        let test_cases = vec![
            b"".to_vec(),
            b"1".to_vec(),
            b"1234567890123456".to_vec(),
            b"12345678901234567".to_vec(),
        ];

        for original in test_cases {
            let encrypted = key.encrypt(&original).unwrap();
            // full-block input gains a whole padding block
            assert_eq!(encrypted.len(), IV_LEN + (original.len() / BLOCK_SIZE + 1) * BLOCK_SIZE);
            assert_eq!(key.decrypt(&encrypted).unwrap(), original);
        }
    }

    #[test]
    fn test_fresh_iv_per_call() {
        let key = ContentKey::generate();
        let first = key.encrypt(b"same").unwrap();
        let second = key.encrypt(b"same").unwrap();
        assert_ne!(first[..IV_LEN], second[..IV_LEN]);
    }

    #[test]
    fn test_wrong_key_fails_or_differs() {
        let key = ContentKey::generate();
        let other = ContentKey::generate();
        let encrypted = key.encrypt(b"{\"vaccine\":\"Pfizer\"}").unwrap();

        match other.decrypt(&encrypted) {
            Err(e) => assert!(matches!(e, TrackError::PayloadDecryptionError(_))),
            Ok(plain) => assert_ne!(plain, b"{\"vaccine\":\"Pfizer\"}".to_vec()),
        }
    }

    #[test]
    fn test_rejects_truncated_input() {
        let key = ContentKey::generate();
        assert!(key.decrypt(&[0u8; IV_LEN]).is_err());
        assert!(key.decrypt(&[0u8; IV_LEN + 15]).is_err());
    }

    #[test]
    fn test_key_length_checked() {
        assert!(ContentKey::from_slice(&[7u8; 31]).is_err());
        assert!(ContentKey::from_slice(&[7u8; 32]).is_ok());
    }
}
