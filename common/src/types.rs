use serde::{Deserialize, Serialize};
use std::fmt;

/// RSA key pair of one principal, both halves PEM encoded.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AsymmetricKeyPair {
    pub public_key: String,
    pub private_key: String,
}

impl fmt::Debug for AsymmetricKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsymmetricKeyPair")
            .field("public_key", &self.public_key)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

/// Wire form of one encrypted payload. Both fields are base64 ASCII.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedEnvelope {
    pub encrypted_data: String,
    pub encrypted_key: String,
}

/// Where the encapsulated key of a shipment lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyLocation {
    /// Stored next to the ciphertext in the shipment record.
    Inline,
    /// Stored in an external authoritative store keyed by shipment id.
    External,
}

impl KeyLocation {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyLocation::Inline => "inline",
            KeyLocation::External => "external",
        }
    }
}

impl std::str::FromStr for KeyLocation {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "inline" => Ok(KeyLocation::Inline),
            "external" | "ledger" => Ok(KeyLocation::External),
            other => Err(format!("unknown key location '{}'", other)),
        }
    }
}

/// Primary record kept by the shipment API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipmentRecord {
    pub shipment_id: String,
    pub encrypted_details: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encrypted_key: Option<String>,
    pub key_location: KeyLocation,
}

/// Sensitive shipment fields entered by the manufacturer.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipmentDetails {
    pub vaccine: String,
    pub batch_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub internal_note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_arrival: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hospital_wallet: Option<String>,
}

/// Public profile of a receiving hospital.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HospitalProfile {
    pub name: String,
    pub public_key: String,
    #[serde(default)]
    pub wallet_address: Option<String>,
}
