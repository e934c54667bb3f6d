use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use common::types::ErrorBody;
use service::errors::ServiceError;
use thiserror::Error;
use tracing::{error, warn};

/// JSON error returned by every handler: `{error, detail?}` with a status.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub error: String,
    pub detail: Option<String>,
}

impl ApiError {
    pub fn new(status: StatusCode, error: impl Into<String>, detail: Option<String>) -> Self {
        Self { status, error: error.into(), detail }
    }

    pub fn bad_request(error: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, error, None)
    }

    /// Relabel a server-side failure with what the endpoint was doing. The
    /// previous message moves to `detail` unless one is already set.
    /// Client errors pass through unchanged.
    pub fn context(mut self, what: &str) -> Self {
        if self.status.is_server_error() {
            let previous = std::mem::replace(&mut self.error, what.to_string());
            if self.detail.is_none() {
                self.detail = Some(previous);
            }
        }
        self
    }
}

impl From<ServiceError> for ApiError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::Validation(m) => Self::new(StatusCode::BAD_REQUEST, m, None),
            ServiceError::Conflict(m) => Self::new(StatusCode::CONFLICT, m, None),
            ServiceError::Unauthorized(m) => Self::new(StatusCode::FORBIDDEN, m, None),
            ServiceError::NotFound(m) => Self::new(StatusCode::NOT_FOUND, m, None),
            ServiceError::PayloadTooLarge(m) => Self::new(StatusCode::PAYLOAD_TOO_LARGE, m, None),
            e @ ServiceError::VersionConflict { .. } => {
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Concurrent update, try again", Some(e.to_string()))
            }
            ServiceError::Upstream { status, body } => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Backing store error",
                Some(format!("status {status}: {body}")),
            ),
            ServiceError::Transport(m) => {
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Backing store unreachable", Some(m))
            }
            ServiceError::RegistryCorrupt(m) => {
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "User registry is corrupt", Some(m))
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(status = %self.status, error = %self.error, detail = ?self.detail, "request failed");
        } else {
            warn!(status = %self.status, error = %self.error, "request rejected");
        }
        let body = ErrorBody { error: self.error, detail: self.detail };
        (self.status, Json(body)).into_response()
    }
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("backing store client: {0}")]
    Store(#[from] ServiceError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
