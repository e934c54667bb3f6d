//! Backing file store abstraction.
//!
//! Every path is repository-relative (`notes/alice/1_a.txt`). Version tokens
//! are opaque strings issued by the store (git blob sha for GitHub).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::ServiceError;

pub mod github;
pub mod memory;

pub use github::GitHubContentStore;
pub use memory::InMemoryContentStore;

/// A file read from the store together with its current version token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub version: String,
    pub content: Vec<u8>,
}

/// One file in a directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentEntry {
    pub name: String,
    pub path: String,
    pub download_url: Option<String>,
}

/// Trait abstraction for the remote file store.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// `Ok(None)` when the path does not exist.
    async fn get(&self, path: &str) -> Result<Option<StoredFile>, ServiceError>;

    /// Create (`version = None`) or conditionally update a file; returns the new version.
    async fn put(
        &self,
        path: &str,
        content: &[u8],
        message: &str,
        version: Option<&str>,
    ) -> Result<String, ServiceError>;

    async fn delete(&self, path: &str, version: &str, message: &str) -> Result<(), ServiceError>;

    /// Files directly under `dir`; empty when the directory does not exist.
    async fn list(&self, dir: &str) -> Result<Vec<ContentEntry>, ServiceError>;
}
