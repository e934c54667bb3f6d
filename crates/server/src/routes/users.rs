use axum::{
    body::Bytes,
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use service::users::domain::RegisterInput;

use crate::errors::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct CheckOutput {
    pub available: bool,
}

#[derive(Debug, Serialize)]
pub struct RegisterOutput {
    pub success: bool,
    #[serde(rename = "userId")]
    pub user_id: String,
    pub token: String,
}

/// JSON object body read field by field. A body that is not a JSON object
/// reads as `{}`; each field is taken on its own, so one badly typed field
/// does not hide the others.
pub(crate) struct LenientBody(Value);

impl LenientBody {
    pub(crate) fn parse(body: &[u8]) -> Self {
        match serde_json::from_slice::<Value>(body) {
            Ok(v @ Value::Object(_)) => Self(v),
            _ => Self(Value::Null),
        }
    }

    /// Strings as-is, numbers and booleans in their JSON spelling; `null`,
    /// arrays and objects count as absent.
    pub(crate) fn text(&self, key: &str) -> Option<String> {
        match self.0.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }
}

#[utoipa::path(
    get, path = "/check/{user_id}", tag = "users",
    params(("user_id" = String, Path, description = "Candidate userId")),
    responses(
        (status = 200, description = "Availability", body = crate::openapi::CheckResponseDoc),
        (status = 400, description = "userId required", body = crate::openapi::ErrorResponseDoc),
        (status = 500, description = "Registry unavailable", body = crate::openapi::ErrorResponseDoc)
    )
)]
pub async fn check(State(state): State<AppState>, Path(user_id): Path<String>) -> Result<Json<CheckOutput>, ApiError> {
    let available = state
        .users
        .check_available(&user_id)
        .await
        .map_err(|e| ApiError::from(e).context("Failed to read user registry"))?;
    Ok(Json(CheckOutput { available }))
}

#[utoipa::path(
    post, path = "/register", tag = "users",
    request_body = crate::openapi::RegisterRequestDoc,
    responses(
        (status = 200, description = "Registered", body = crate::openapi::RegisterResponseDoc),
        (status = 400, description = "Missing or too long userId", body = crate::openapi::ErrorResponseDoc),
        (status = 409, description = "userId already taken", body = crate::openapi::ErrorResponseDoc),
        (status = 500, description = "Registry write failed", body = crate::openapi::ErrorResponseDoc)
    )
)]
pub async fn register(State(state): State<AppState>, body: Bytes) -> Result<Json<RegisterOutput>, ApiError> {
    let body = LenientBody::parse(&body);
    let input = RegisterInput { user_id: body.text("userId"), display_name: body.text("displayName") };
    let out = state
        .users
        .register(input)
        .await
        .map_err(|e| ApiError::from(e).context("Failed to save user registry"))?;
    info!(user_id = %out.user_id, event = "register_ok", "user registered");
    Ok(Json(RegisterOutput { success: true, user_id: out.user_id, token: out.token }))
}
