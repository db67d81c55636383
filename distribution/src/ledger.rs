//! HTTP client for the ledger gateway that fronts the shipment contract.
//!
//! ```text
//! PUT {base}/keys/{shipmentId}   {"shipmentId": ..., "encryptedKey": ...}
//! GET {base}/keys/{shipmentId}   -> 200 {"shipmentId": ..., "encryptedKey": ...} | 404
//! ```

use async_trait::async_trait;
use common::{Config, Result, TrackError};
use log::debug;
use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use crate::store::KeyStore;

pub const CONTRACT_HEADER: &str = "X-Contract-Address";

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LedgerKeyEntry {
    shipment_id: String,
    encrypted_key: String,
}

pub struct LedgerClient {
    http_client: Client,
    base_url: Url,
    contract_address: String,
}

impl LedgerClient {
    pub fn new(base_url: &str, contract_address: &str, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| TrackError::ConfigError(format!("invalid ledger url '{}': {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(TrackError::ConfigError(format!(
                "ledger url '{}' cannot be a base",
                base_url
            )));
        }

        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TrackError::ConfigError(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url,
            contract_address: contract_address.to_string(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(&config.ledger_url, &config.contract_address, config.key_store.timeout)
    }

    fn key_url(&self, shipment_id: &str) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push("keys").push(shipment_id);
        }
        url
    }
}

fn transport_error(err: reqwest::Error) -> TrackError {
    TrackError::KeyStoreUnavailableError(err.to_string())
}

fn status_error(status: StatusCode, shipment_id: &str) -> TrackError {
    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        TrackError::KeyStoreUnavailableError(format!(
            "ledger answered {} for shipment {}",
            status, shipment_id
        ))
    } else {
        TrackError::StorageError(format!(
            "ledger rejected request for shipment {}: {}",
            shipment_id, status
        ))
    }
}

#[async_trait]
impl KeyStore for LedgerClient {
    async fn put_key(&self, shipment_id: &str, encrypted_key: &str) -> Result<()> {
        let entry = LedgerKeyEntry {
            shipment_id: shipment_id.to_string(),
            encrypted_key: encrypted_key.to_string(),
        };

        let response = self
            .http_client
            .put(self.key_url(shipment_id))
            .header(CONTRACT_HEADER, &self.contract_address)
            .json(&entry)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(status_error(status, shipment_id));
        }
        debug!("Ledger accepted key for shipment {}", shipment_id);
        Ok(())
    }

    async fn get_key(&self, shipment_id: &str) -> Result<Option<String>> {
        let response = self
            .http_client
            .get(self.key_url(shipment_id))
            .header(CONTRACT_HEADER, &self.contract_address)
            .send()
            .await
            .map_err(transport_error)?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let body = response.text().await.map_err(transport_error)?;
                let entry: LedgerKeyEntry = serde_json::from_str(&body)?;
                Ok(Some(entry.encrypted_key))
            }
            status => Err(status_error(status, shipment_id)),
        }
    }
}
