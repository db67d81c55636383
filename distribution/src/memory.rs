use async_trait::async_trait;
use common::Result;
use parking_lot::RwLock;
use std::collections::HashMap;
use crate::store::KeyStore;

#[derive(Default)]
pub struct MemoryKeyStore {
    keys: RwLock<HashMap<String, String>>,
}

impl MemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.keys.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.read().is_empty()
    }
}

#[async_trait]
impl KeyStore for MemoryKeyStore {
    async fn put_key(&self, shipment_id: &str, encrypted_key: &str) -> Result<()> {
        self.keys
            .write()
            .insert(shipment_id.to_string(), encrypted_key.to_string());
        Ok(())
    }

    async fn get_key(&self, shipment_id: &str) -> Result<Option<String>> {
        Ok(self.keys.read().get(shipment_id).cloned())
    }
}
