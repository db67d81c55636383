use async_trait::async_trait;
use common::Result;

/// External key-value store holding encapsulated keys by shipment id.
///
/// Writes are idempotent. Reads may lag writes; callers must not assume a
/// key is visible immediately after `put_key` returns. Transport failures
/// are reported as `KeyStoreUnavailableError`.
#[async_trait]
pub trait KeyStore: Send + Sync {
    async fn put_key(&self, shipment_id: &str, encrypted_key: &str) -> Result<()>;

    /// `Ok(None)` when the store answered and holds no entry.
    async fn get_key(&self, shipment_id: &str) -> Result<Option<String>>;
}
