use std::sync::Arc;

use configs::AppConfig;
use service::content::ContentStore;
use service::notes::{NoteService, NoteSettings};
use service::registry::RegistryStore;
use service::retry::RetryPolicy;
use service::users::UserService;

/// Shared, read-only application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<UserService>,
    pub notes: Arc<NoteService>,
}

impl AppState {
    /// Wire the services on top of a content store. Tests pass an
    /// in-memory store, production passes the GitHub one.
    pub fn new(config: Arc<AppConfig>, store: Arc<dyn ContentStore>) -> Self {
        let registry = Arc::new(RegistryStore::new(
            Arc::clone(&store),
            config.storage.users_file_path.clone(),
            RetryPolicy::from_config(&config.registry),
        ));
        let users = Arc::new(UserService::new(registry));
        let notes = Arc::new(NoteService::new(store, Arc::clone(&users), NoteSettings::from_config(&config)));
        Self { config, users, notes }
    }

    /// Request body cap for `/upload`: the file limit plus room for the
    /// multipart framing and text fields.
    pub fn upload_body_limit(&self) -> usize {
        const MULTIPART_OVERHEAD: usize = 64 * 1024;
        usize::try_from(self.config.storage.max_file_size)
            .unwrap_or(usize::MAX)
            .saturating_add(MULTIPART_OVERHEAD)
    }
}
