use async_trait::async_trait;
use common::{Result, TrackError};
use log::debug;
use redis::aio::MultiplexedConnection;
use redis::Client as RedisClient;
use std::sync::Arc;
use crate::store::KeyStore;

/// Encapsulated keys kept in Redis under `shipment_key:{id}`.
pub struct RedisKeyStore {
    redis_client: Arc<RedisClient>,
}

impl RedisKeyStore {
    pub fn new(redis_client: RedisClient) -> Self {
        Self {
            redis_client: Arc::new(redis_client),
        }
    }

    pub fn open(redis_url: &str) -> Result<Self> {
        let client = RedisClient::open(redis_url)
            .map_err(|e| TrackError::ConfigError(e.to_string()))?;
        Ok(Self::new(client))
    }

    fn entry_key(shipment_id: &str) -> String {
        format!("shipment_key:{}", shipment_id)
    }

    async fn connection(&self) -> Result<MultiplexedConnection> {
        self.redis_client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| TrackError::KeyStoreUnavailableError(e.to_string()))
    }
}

#[async_trait]
impl KeyStore for RedisKeyStore {
    async fn put_key(&self, shipment_id: &str, encrypted_key: &str) -> Result<()> {
        let mut conn = self.connection().await?;

        redis::cmd("SET")
            .arg(Self::entry_key(shipment_id))
            .arg(encrypted_key)
            .query_async::<MultiplexedConnection, ()>(&mut conn)
            .await
            .map_err(|e| TrackError::KeyStoreUnavailableError(e.to_string()))?;

        debug!("Stored encrypted key for shipment {} in Redis", shipment_id);
        Ok(())
    }

    async fn get_key(&self, shipment_id: &str) -> Result<Option<String>> {
        let mut conn = self.connection().await?;

        redis::cmd("GET")
            .arg(Self::entry_key(shipment_id))
            .query_async::<MultiplexedConnection, Option<String>>(&mut conn)
            .await
            .map_err(|e| TrackError::KeyStoreUnavailableError(e.to_string()))
    }
}
