//! Hybrid encryption of shipment payloads.
//!
//! Payloads are encrypted with a per-envelope AES-256 key; the key is then
//! wrapped with RSA-OAEP under the recipient hospital's public key.

pub mod aes_cbc;
pub mod rsa_oaep;
pub mod keypair;
pub mod envelope;

pub use envelope::{hybrid_decrypt, hybrid_encrypt, EnvelopeCodec, KeyWrapping};
pub use keypair::{is_matching_pair, public_key_pem_from_private, KeyGeneration, KeyPairProvider};
pub use rsa_oaep::{open_small, seal_small};
