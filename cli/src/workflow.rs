//! Shipment sealing and opening across codec, distribution and custody.

use common::encryption::EnvelopeCodec;
use common::{HospitalProfile, KeyLocation, Result, ShipmentRecord};
use custody::{CredentialStore, KeyCustodyManager};
use distribution::KeyDistributor;
use log::info;
use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

pub fn new_shipment_id() -> String {
    format!("SHP-{}", Uuid::new_v4().simple())
}

/// Encrypts `payload` for `hospital` and places the key per `location`.
pub async fn seal_shipment<T: Serialize + ?Sized>(
    payload: &T,
    hospital: &HospitalProfile,
    shipment_id: &str,
    location: KeyLocation,
    codec: &EnvelopeCodec,
    distributor: &KeyDistributor,
) -> Result<ShipmentRecord> {
    let envelope = codec.encrypt(payload, &hospital.public_key)?;
    let record = distributor.publish(envelope, shipment_id, location).await?;
    info!("Sealed shipment {} for {}", shipment_id, hospital.name);
    Ok(record)
}

/// Recovers the plaintext JSON of `record` as `principal_id`.
///
/// The custody key is checked first so a missing key is reported without
/// touching the external store.
pub async fn open_shipment<S: CredentialStore>(
    record: &ShipmentRecord,
    principal_id: &str,
    custody: &KeyCustodyManager<S>,
    codec: &EnvelopeCodec,
    distributor: &KeyDistributor,
) -> Result<String> {
    let private_key = custody.require(principal_id)?;
    let encrypted_key = distributor.resolve(record).await?;
    let plaintext = codec.decrypt(&record.encrypted_details, &encrypted_key, &private_key)?;
    info!("Opened shipment {} as {}", record.shipment_id, principal_id);
    Ok(plaintext)
}

pub async fn open_shipment_as<T: DeserializeOwned, S: CredentialStore>(
    record: &ShipmentRecord,
    principal_id: &str,
    custody: &KeyCustodyManager<S>,
    codec: &EnvelopeCodec,
    distributor: &KeyDistributor,
) -> Result<T> {
    let json = open_shipment(record, principal_id, custody, codec, distributor).await?;
    Ok(serde_json::from_str(&json)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shipment_ids_are_unique() {
        let a = new_shipment_id();
        let b = new_shipment_id();
        assert!(a.starts_with("SHP-"));
        assert_eq!(a.len(), 4 + 32);
        assert_ne!(a, b);
    }
}
