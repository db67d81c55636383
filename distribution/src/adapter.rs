use common::{EncryptedEnvelope, KeyLocation, KeyStoreConfig, Result, ShipmentRecord, TrackError};
use log::{debug, info, warn};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use crate::store::KeyStore;

/// Bounded exponential backoff for external store calls.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Upper bound for a single store call.
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&KeyStoreConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &KeyStoreConfig) -> Self {
        Self {
            attempts: config.retry_attempts.max(1),
            base_delay: config.retry_delay,
            max_delay: config.retry_delay * 16,
            attempt_timeout: config.timeout,
        }
    }

    /// Delay before retry number `retry` (0-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 1u32.checked_shl(retry).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

/// Places encapsulated keys inline or in an external store and finds them
/// again at decryption time.
#[derive(Clone)]
pub struct KeyDistributor {
    store: Arc<dyn KeyStore>,
    policy: RetryPolicy,
}

impl KeyDistributor {
    pub fn new(store: Arc<dyn KeyStore>, policy: RetryPolicy) -> Self {
        Self { store, policy }
    }

    /// Builds the shipment record for `envelope`. In `External` mode the key
    /// is written to the store first and left out of the record.
    pub async fn publish(
        &self,
        envelope: EncryptedEnvelope,
        shipment_id: &str,
        location: KeyLocation,
    ) -> Result<ShipmentRecord> {
        let EncryptedEnvelope {
            encrypted_data,
            encrypted_key,
        } = envelope;

        let encrypted_key = match location {
            KeyLocation::Inline => Some(encrypted_key),
            KeyLocation::External => {
                self.with_retry("publish", shipment_id, || {
                    self.store.put_key(shipment_id, &encrypted_key)
                })
                .await?;
                None
            }
        };

        info!(
            "Published key for shipment {} ({})",
            shipment_id,
            location.as_str()
        );
        Ok(ShipmentRecord {
            shipment_id: shipment_id.to_string(),
            encrypted_details: encrypted_data,
            encrypted_key,
            key_location: location,
        })
    }

    pub async fn resolve(&self, record: &ShipmentRecord) -> Result<String> {
        match record.key_location {
            KeyLocation::Inline => record
                .encrypted_key
                .clone()
                .ok_or_else(|| TrackError::KeyNotFoundError(record.shipment_id.clone())),
            KeyLocation::External => self.resolve_external(&record.shipment_id).await,
        }
    }

    pub async fn resolve_external(&self, shipment_id: &str) -> Result<String> {
        let found = self
            .with_retry("resolve", shipment_id, || self.store.get_key(shipment_id))
            .await?;
        found.ok_or_else(|| TrackError::KeyNotFoundError(shipment_id.to_string()))
    }

    /// Like [`resolve`](Self::resolve) but gives up once `deadline` has
    /// elapsed, whatever the retry policy would still allow.
    pub async fn resolve_with_deadline(&self, record: &ShipmentRecord, deadline: Duration) -> Result<String> {
        timeout(deadline, self.resolve(record)).await.map_err(|_| {
            warn!(
                "Key lookup for shipment {} exceeded {:?}",
                record.shipment_id, deadline
            );
            TrackError::KeyStoreUnavailableError(format!(
                "lookup for shipment {} exceeded {:?}",
                record.shipment_id, deadline
            ))
        })?
    }

    async fn with_retry<T, F, Fut>(&self, operation: &str, shipment_id: &str, mut call: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let attempts = self.policy.attempts.max(1);
        let mut last_error = None;

        for attempt in 0..attempts {
            if attempt > 0 {
                let delay = self.policy.delay_for(attempt - 1);
                debug!(
                    "Retrying {} for shipment {} in {:?} (attempt {}/{})",
                    operation,
                    shipment_id,
                    delay,
                    attempt + 1,
                    attempts
                );
                sleep(delay).await;
            }

            let error = match timeout(self.policy.attempt_timeout, call()).await {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(e)) if e.is_retryable() => e,
                Ok(Err(e)) => return Err(e),
                Err(_) => TrackError::KeyStoreUnavailableError(format!(
                    "{} timed out after {:?}",
                    operation, self.policy.attempt_timeout
                )),
            };
            warn!(
                "Key store {} failed for shipment {}: {}",
                operation, shipment_id, error
            );
            last_error = Some(error);
        }

        Err(last_error.unwrap_or_else(|| {
            TrackError::KeyStoreUnavailableError(format!("{} was not attempted", operation))
        }))
    }
}
