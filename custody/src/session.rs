use chrono::{DateTime, Utc};
use common::Result;
use log::info;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use crate::store::write_private;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Manufacturer,
    Hospital,
    Admin,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub principal_id: String,
    pub token: String,
    pub role: Role,
    pub started_at: DateTime<Utc>,
}

impl Session {
    pub fn new(principal_id: &str, token: &str, role: Role) -> Self {
        Self {
            principal_id: principal_id.to_string(),
            token: token.to_string(),
            role,
            started_at: Utc::now(),
        }
    }
}

/// Short-lived login state. Kept apart from credential custody so that
/// logging out cannot touch key material.
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        fs::create_dir_all(dir.as_ref())?;
        Ok(Self {
            path: dir.as_ref().join("session.json"),
        })
    }

    pub fn begin(&self, session: &Session) -> Result<()> {
        let data = serde_json::to_vec(session)?;
        write_private(&self.path, &data)?;
        info!("Session started for {}", session.principal_id);
        Ok(())
    }

    pub fn current(&self) -> Result<Option<Session>> {
        match fs::read(&self.path) {
            Ok(data) => Ok(Some(serde_json::from_slice(&data)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Clears the session token. Custody-stored keys are left in place.
    pub fn logout(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                info!("Session cleared");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
