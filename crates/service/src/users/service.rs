use std::sync::Arc;

use chrono::Utc;
use rand::{rngs::OsRng, RngCore};
use tracing::{debug, info, instrument};

use common::metrics::REGISTRATIONS_TOTAL;

use super::domain::{is_path_safe_user_id, normalize_user_id, RegisterInput, Registration, MAX_USER_ID_LEN};
use crate::errors::ServiceError;
use crate::registry::{RegistryStore, UserRecord};

/// 128 bits from the OS RNG, lowercase hex.
pub fn mint_token() -> String {
    let mut bytes = [0u8; 16];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

pub struct UserService {
    registry: Arc<RegistryStore>,
}

impl UserService {
    pub fn new(registry: Arc<RegistryStore>) -> Self { Self { registry } }

    /// Whether `user_id` is still free to register.
    #[instrument(skip(self))]
    pub async fn check_available(&self, user_id: &str) -> Result<bool, ServiceError> {
        let user_id = normalize_user_id(user_id);
        if user_id.is_empty() {
            return Err(ServiceError::Validation("userId required".into()));
        }
        let snapshot = self.registry.load().await?;
        Ok(!snapshot.users.contains_key(&user_id))
    }

    /// Register a new user and persist a freshly minted token.
    ///
    /// The token is minted once; if the registry write fails it is discarded.
    #[instrument(skip(self, input))]
    pub async fn register(&self, input: RegisterInput) -> Result<Registration, ServiceError> {
        let user_id = normalize_user_id(input.user_id.as_deref().unwrap_or_default());
        if user_id.is_empty() {
            return Err(ServiceError::Validation("userId required".into()));
        }
        if user_id.chars().count() > MAX_USER_ID_LEN {
            return Err(ServiceError::Validation("userId too long".into()));
        }
        if !is_path_safe_user_id(&user_id) {
            return Err(ServiceError::Validation("userId may not contain '/' or be '.' or '..'".into()));
        }
        let display = input.display_name.as_deref().unwrap_or_default().trim().to_string();

        let record = UserRecord {
            token: mint_token(),
            display,
            created_at: Utc::now().timestamp_millis(),
        };
        let token = record.token.clone();

        self.registry
            .update(|users| {
                if users.contains_key(&user_id) {
                    debug!(%user_id, "user exists");
                    return Err(ServiceError::Conflict("userId already taken".into()));
                }
                users.insert(user_id.clone(), record.clone());
                Ok(())
            })
            .await?;

        REGISTRATIONS_TOTAL.inc();
        info!(%user_id, event = "user_registered", "user registered");
        Ok(Registration { user_id, token })
    }

    /// Exact token match against the stored record.
    #[instrument(skip(self, token))]
    pub async fn authenticate(&self, user_id: &str, token: &str) -> Result<UserRecord, ServiceError> {
        let snapshot = self.registry.load().await?;
        match snapshot.users.get(user_id) {
            Some(rec) if rec.token == token => Ok(rec.clone()),
            _ => Err(ServiceError::Unauthorized("Invalid userId or token".into())),
        }
    }

    pub async fn is_registered(&self, user_id: &str) -> Result<bool, ServiceError> {
        Ok(self.registry.load().await?.users.contains_key(user_id))
    }
}
