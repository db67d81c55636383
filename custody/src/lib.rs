//! Device-side custody of a principal's private key.
//!
//! Credential material and session state live in separate stores with
//! separate lifecycles: logging out clears the session, never the key.

pub mod store;
pub mod manager;
pub mod session;

pub use manager::KeyCustodyManager;
pub use session::{Role, Session, SessionStore};
pub use store::{CredentialStore, FileCredentialStore, MemoryCredentialStore};
