use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("validation error: {0}")]
    Validation(String),
    /// Domain-level conflict, e.g. a userId that is already registered.
    #[error("conflict: {0}")]
    Conflict(String),
    /// The backing store rejected a conditional write: the version moved.
    #[error("version conflict on {path}")]
    VersionConflict { path: String },
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("payload too large: {0}")]
    PayloadTooLarge(String),
    #[error("backing store returned {status}: {body}")]
    Upstream { status: u16, body: String },
    #[error("backing store request failed: {0}")]
    Transport(String),
    #[error("registry file is corrupt: {0}")]
    RegistryCorrupt(String),
}

impl ServiceError {
    pub fn is_version_conflict(&self) -> bool {
        matches!(self, Self::VersionConflict { .. })
    }
}

impl From<reqwest::Error> for ServiceError {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport(e.to_string())
    }
}
