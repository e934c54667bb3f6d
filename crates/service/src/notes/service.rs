use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument, warn};

use common::metrics::{DELETES_TOTAL, UPLOADS_TOTAL, UPLOAD_BYTES_TOTAL};

use super::domain::{is_within_namespace, stored_file_name, DeleteInput, StoredNote, UploadInput};
use crate::content::{ContentEntry, ContentStore};
use crate::errors::ServiceError;
use crate::users::domain::is_path_safe_user_id;
use crate::users::UserService;

/// Storage layout and limits for user files.
#[derive(Debug, Clone)]
pub struct NoteSettings {
    pub notes_folder: String,
    pub max_file_size: u64,
    /// Prefix of the public URL returned for each upload.
    pub public_base_url: String,
}

impl NoteSettings {
    pub fn from_config(cfg: &configs::AppConfig) -> Self {
        Self {
            notes_folder: cfg.storage.notes_folder.clone(),
            max_file_size: cfg.storage.max_file_size,
            public_base_url: cfg.public_url(""),
        }
    }

    fn public_url(&self, path: &str) -> String {
        format!("{}/{}", self.public_base_url.trim_end_matches('/'), path)
    }
}

pub struct NoteService {
    store: Arc<dyn ContentStore>,
    users: Arc<UserService>,
    settings: NoteSettings,
}

fn required(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl NoteService {
    pub fn new(store: Arc<dyn ContentStore>, users: Arc<UserService>, settings: NoteSettings) -> Self {
        Self { store, users, settings }
    }

    pub fn settings(&self) -> &NoteSettings {
        &self.settings
    }

    fn user_dir(&self, user_id: &str) -> String {
        format!("{}/{}", self.settings.notes_folder, user_id)
    }

    /// Store a file at `<folder>/<userId>/<ts>_<name>`.
    ///
    /// Checks run in order: file present, credentials present, credentials
    /// valid, size within limit.
    #[instrument(skip(self, input), fields(user_id = ?input.user_id))]
    pub async fn upload(&self, input: UploadInput) -> Result<StoredNote, ServiceError> {
        let file = input.file.ok_or_else(|| ServiceError::Validation("No file uploaded".into()))?;
        let (Some(user_id), Some(token)) = (required(input.user_id), required(input.token)) else {
            return Err(ServiceError::Validation("userId and token required".into()));
        };
        self.users.authenticate(&user_id, &token).await?;
        // registry entries written before ids were restricted
        if !is_path_safe_user_id(&user_id) {
            return Err(ServiceError::Validation("userId is not usable as a folder name".into()));
        }

        let size = file.bytes.len();
        if size as u64 > self.settings.max_file_size {
            return Err(ServiceError::PayloadTooLarge(format!(
                "File too large. Max allowed is {} bytes",
                self.settings.max_file_size
            )));
        }

        let name = stored_file_name(Utc::now().timestamp_millis(), file.file_name.as_deref());
        let path = format!("{}/{}", self.user_dir(&user_id), name);
        self.store.put(&path, &file.bytes, &format!("upload {name}"), None).await?;

        UPLOADS_TOTAL.inc();
        UPLOAD_BYTES_TOTAL.inc_by(size as u64);
        info!(%user_id, %path, size, event = "file_uploaded", "file stored");
        Ok(StoredNote { url: self.settings.public_url(&path), path, size })
    }

    /// Files in the user's namespace. Unknown users are a 404, not an empty list.
    #[instrument(skip(self))]
    pub async fn list(&self, user_id: &str) -> Result<Vec<ContentEntry>, ServiceError> {
        let user_id = user_id.trim();
        if user_id.is_empty() || !self.users.is_registered(user_id).await? {
            return Err(ServiceError::NotFound("Unknown userId".into()));
        }
        self.store.list(&self.user_dir(user_id)).await
    }

    /// Delete one of the caller's own files. The current version token is
    /// fetched right before the delete.
    #[instrument(skip(self, input), fields(user_id = ?input.user_id, path = ?input.file_path))]
    pub async fn delete(&self, input: DeleteInput) -> Result<(), ServiceError> {
        let path = input.file_path.filter(|p| !p.is_empty());
        let (Some(path), Some(user_id), Some(token)) = (path, required(input.user_id), required(input.token))
        else {
            return Err(ServiceError::Validation("filePath, userId and token required".into()));
        };
        self.users.authenticate(&user_id, &token).await?;

        if !is_within_namespace(&path, &self.settings.notes_folder, &user_id) {
            warn!(%user_id, %path, event = "namespace_escape", "delete outside own namespace refused");
            return Err(ServiceError::Unauthorized("You can only delete your own files".into()));
        }

        let current = self
            .store
            .get(&path)
            .await?
            .ok_or_else(|| ServiceError::NotFound("File not found".into()))?;
        self.store.delete(&path, &current.version, &format!("delete {path}")).await?;

        DELETES_TOTAL.inc();
        info!(%user_id, %path, event = "file_deleted", "file deleted");
        Ok(())
    }
}
