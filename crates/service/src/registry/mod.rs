//! User registry persisted as one JSON object in the backing store.
//!
//! File layout (2-space indent, keys sorted):
//! ```json
//! {
//!   "alice": { "token": "…", "display": "Alice", "createdAt": 1700000000000 }
//! }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::errors::ServiceError;

pub mod store;

pub use store::{RegistrySnapshot, RegistryStore};

/// Credentials and metadata for one registered user. Immutable once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub token: String,
    #[serde(default)]
    pub display: String,
    /// Milliseconds since the Unix epoch.
    #[serde(rename = "createdAt")]
    pub created_at: i64,
}

/// `userId -> UserRecord`, ordered so serialisation is deterministic.
pub type Registry = BTreeMap<String, UserRecord>;

pub fn encode_registry(users: &Registry) -> Result<Vec<u8>, ServiceError> {
    serde_json::to_vec_pretty(users).map_err(|e| ServiceError::RegistryCorrupt(e.to_string()))
}

pub fn decode_registry(bytes: &[u8]) -> Result<Registry, ServiceError> {
    serde_json::from_slice(bytes).map_err(|e| ServiceError::RegistryCorrupt(e.to_string()))
}
