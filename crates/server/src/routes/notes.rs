use axum::{
    body::Bytes,
    extract::{
        multipart::{Multipart, MultipartError, MultipartRejection},
        Path, State,
    },
    http::StatusCode,
    Json,
};
use serde::Serialize;

use service::content::ContentEntry;
use service::errors::ServiceError;
use service::notes::domain::{DeleteInput, UploadInput, UploadedFile};

use super::users::LenientBody;
use crate::errors::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct UploadOutput {
    pub success: bool,
    pub url: String,
    pub path: String,
}

#[derive(Debug, Serialize)]
pub struct ListOutput {
    pub success: bool,
    pub files: Vec<ContentEntry>,
}

#[derive(Debug, Serialize)]
pub struct DeleteOutput {
    pub success: bool,
}

fn multipart_error(e: MultipartError, max_file_size: u64) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return ServiceError::PayloadTooLarge(format!("File too large. Max allowed is {max_file_size} bytes")).into();
    }
    ApiError::new(StatusCode::BAD_REQUEST, "Invalid multipart body", Some(e.body_text()))
}

/// Collect the `file`, `userId` and `token` parts. A request that is not
/// multipart at all yields an empty input, which the service rejects with
/// "No file uploaded".
async fn read_upload(multipart: Result<Multipart, MultipartRejection>, max_file_size: u64) -> Result<UploadInput, ApiError> {
    let mut input = UploadInput::default();
    let Ok(mut multipart) = multipart else {
        return Ok(input);
    };
    while let Some(field) = multipart.next_field().await.map_err(|e| multipart_error(e, max_file_size))? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().map(str::to_string);
                let bytes = field.bytes().await.map_err(|e| multipart_error(e, max_file_size))?;
                // browsers send an empty unnamed part when no file was picked
                if bytes.is_empty() && file_name.as_deref().map_or(true, str::is_empty) {
                    continue;
                }
                input.file = Some(UploadedFile { file_name, bytes: bytes.to_vec() });
            }
            "userId" => input.user_id = Some(field.text().await.map_err(|e| multipart_error(e, max_file_size))?),
            "token" => input.token = Some(field.text().await.map_err(|e| multipart_error(e, max_file_size))?),
            _ => {}
        }
    }
    Ok(input)
}

#[utoipa::path(
    post, path = "/upload", tag = "notes",
    request_body(content = crate::openapi::UploadFormDoc, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Stored", body = crate::openapi::UploadResponseDoc),
        (status = 400, description = "No file or missing credentials", body = crate::openapi::ErrorResponseDoc),
        (status = 403, description = "Invalid userId or token", body = crate::openapi::ErrorResponseDoc),
        (status = 413, description = "File too large", body = crate::openapi::ErrorResponseDoc),
        (status = 500, description = "Upload failed", body = crate::openapi::ErrorResponseDoc)
    )
)]
pub async fn upload(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadOutput>, ApiError> {
    let max_file_size = state.notes.settings().max_file_size;
    let input = read_upload(multipart, max_file_size).await?;
    let stored = state
        .notes
        .upload(input)
        .await
        .map_err(|e| ApiError::from(e).context("Upload failed"))?;
    Ok(Json(UploadOutput { success: true, url: stored.url, path: stored.path }))
}

#[utoipa::path(
    get, path = "/list/{user_id}", tag = "notes",
    params(("user_id" = String, Path, description = "Owner of the files")),
    responses(
        (status = 200, description = "Files", body = crate::openapi::ListResponseDoc),
        (status = 404, description = "Unknown userId", body = crate::openapi::ErrorResponseDoc),
        (status = 500, description = "Failed to list files", body = crate::openapi::ErrorResponseDoc)
    )
)]
pub async fn list(State(state): State<AppState>, Path(user_id): Path<String>) -> Result<Json<ListOutput>, ApiError> {
    let files = state
        .notes
        .list(&user_id)
        .await
        .map_err(|e| ApiError::from(e).context("Failed to list files"))?;
    Ok(Json(ListOutput { success: true, files }))
}

#[utoipa::path(
    post, path = "/delete", tag = "notes",
    request_body = crate::openapi::DeleteRequestDoc,
    responses(
        (status = 200, description = "Deleted", body = crate::openapi::SuccessResponseDoc),
        (status = 400, description = "Missing fields", body = crate::openapi::ErrorResponseDoc),
        (status = 403, description = "Bad credentials or foreign path", body = crate::openapi::ErrorResponseDoc),
        (status = 404, description = "File not found", body = crate::openapi::ErrorResponseDoc),
        (status = 500, description = "Delete failed", body = crate::openapi::ErrorResponseDoc)
    )
)]
pub async fn delete(State(state): State<AppState>, body: Bytes) -> Result<Json<DeleteOutput>, ApiError> {
    let body = LenientBody::parse(&body);
    let input = DeleteInput {
        file_path: body.text("filePath"),
        user_id: body.text("userId"),
        token: body.text("token"),
    };
    state
        .notes
        .delete(input)
        .await
        .map_err(|e| ApiError::from(e).context("Delete failed"))?;
    Ok(Json(DeleteOutput { success: true }))
}
