//! Placement and lookup of encapsulated shipment keys.
//!
//! A key either travels inline with the shipment record or lives in an
//! external store (the ledger gateway, Redis) keyed by shipment id.

pub mod store;
pub mod memory;
pub mod ledger;
pub mod redis_store;
pub mod adapter;

pub use adapter::{KeyDistributor, RetryPolicy};
pub use ledger::LedgerClient;
pub use memory::MemoryKeyStore;
pub use redis_store::RedisKeyStore;
pub use store::KeyStore;
