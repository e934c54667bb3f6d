use std::sync::Arc;

use tracing::{info, instrument, warn};

use common::metrics::REGISTRY_CONFLICTS_TOTAL;

use super::{decode_registry, encode_registry, Registry};
use crate::content::ContentStore;
use crate::errors::ServiceError;
use crate::retry::RetryPolicy;

/// Registry contents plus the version token they were read at.
#[derive(Debug, Clone, Default)]
pub struct RegistrySnapshot {
    /// `None` when the registry file does not exist yet.
    pub version: Option<String>,
    pub users: Registry,
}

/// Read-modify-write access to the registry file with conditional saves.
pub struct RegistryStore {
    store: Arc<dyn ContentStore>,
    path: String,
    retry: RetryPolicy,
}

impl RegistryStore {
    pub fn new(store: Arc<dyn ContentStore>, path: impl Into<String>, retry: RetryPolicy) -> Self {
        Self { store, path: path.into(), retry }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Absent file is an empty registry. Unparsable content is an error and
    /// is never replaced.
    #[instrument(skip(self), fields(path = %self.path))]
    pub async fn load(&self) -> Result<RegistrySnapshot, ServiceError> {
        match self.store.get(&self.path).await? {
            None => Ok(RegistrySnapshot::default()),
            Some(file) => {
                let users = decode_registry(&file.content).map_err(|e| {
                    warn!(version = %file.version, error = %e, "registry content does not parse");
                    e
                })?;
                Ok(RegistrySnapshot { version: Some(file.version), users })
            }
        }
    }

    /// Conditional write: `version` must match the stored one (`None` creates).
    #[instrument(skip(self, users), fields(path = %self.path, users = users.len()))]
    pub async fn save(&self, users: &Registry, version: Option<&str>) -> Result<String, ServiceError> {
        let payload = encode_registry(users)?;
        let message = format!("update {}", self.path);
        self.store.put(&self.path, &payload, &message, version).await
    }

    /// Load, apply `mutate`, save. On a version conflict the whole cycle is
    /// repeated against fresh content, up to the retry policy's limit. Errors
    /// returned by `mutate` end the loop immediately.
    pub async fn update<F, T>(&self, mut mutate: F) -> Result<T, ServiceError>
    where
        F: FnMut(&mut Registry) -> Result<T, ServiceError>,
    {
        let mut attempt = 0;
        loop {
            if attempt > 0 {
                self.retry.wait_before_retry(attempt).await;
            }
            attempt += 1;

            let mut snapshot = self.load().await?;
            let out = mutate(&mut snapshot.users)?;
            match self.save(&snapshot.users, snapshot.version.as_deref()).await {
                Ok(version) => {
                    info!(path = %self.path, %version, attempt, "registry saved");
                    return Ok(out);
                }
                Err(e) => {
                    if e.is_version_conflict() {
                        REGISTRY_CONFLICTS_TOTAL.inc();
                    }
                    if !self.retry.should_retry(attempt, &e) {
                        return Err(e);
                    }
                    warn!(path = %self.path, attempt, "registry changed underneath, reloading");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{ContentEntry, InMemoryContentStore, StoredFile};
    use crate::registry::UserRecord;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    fn record(token: &str) -> UserRecord {
        UserRecord { token: token.into(), display: String::new(), created_at: 1 }
    }

    /// Lands a competing registry write right before each of the first
    /// `interference` puts, like a concurrent registration would.
    struct RacingStore {
        inner: InMemoryContentStore,
        interference: AtomicU32,
    }

    #[async_trait]
    impl ContentStore for RacingStore {
        async fn get(&self, path: &str) -> Result<Option<StoredFile>, ServiceError> {
            self.inner.get(path).await
        }

        async fn put(&self, path: &str, content: &[u8], message: &str, version: Option<&str>) -> Result<String, ServiceError> {
            if self.interference.load(Ordering::SeqCst) > 0 {
                self.interference.fetch_sub(1, Ordering::SeqCst);
                let mut users = match self.inner.get(path).await? {
                    Some(f) => decode_registry(&f.content)?,
                    None => Registry::new(),
                };
                let n = users.len();
                users.insert(format!("racer_{n}"), record("racer"));
                self.inner.seed(path, encode_registry(&users)?).await;
            }
            self.inner.put(path, content, message, version).await
        }

        async fn delete(&self, path: &str, version: &str, message: &str) -> Result<(), ServiceError> {
            self.inner.delete(path, version, message).await
        }

        async fn list(&self, dir: &str) -> Result<Vec<ContentEntry>, ServiceError> {
            self.inner.list(dir).await
        }
    }

    fn racing(interference: u32) -> Arc<RacingStore> {
        Arc::new(RacingStore { inner: InMemoryContentStore::new(), interference: AtomicU32::new(interference) })
    }

    fn policy(attempts: u32) -> RetryPolicy {
        RetryPolicy::new(attempts, Duration::from_millis(1), Duration::from_millis(2))
    }

    #[tokio::test]
    async fn load_of_missing_file_is_empty_without_version() -> Result<(), anyhow::Error> {
        let reg = RegistryStore::new(Arc::new(InMemoryContentStore::new()), "users.json", policy(1));
        let snap = reg.load().await?;
        assert!(snap.version.is_none());
        assert!(snap.users.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn save_then_load_round_trips() -> Result<(), anyhow::Error> {
        let reg = RegistryStore::new(Arc::new(InMemoryContentStore::new()), "users.json", policy(1));
        let mut users = Registry::new();
        for i in 0..5 {
            users.insert(format!("u{i}"), UserRecord { token: format!("t{i}"), display: format!("D{i}"), created_at: i });
        }
        let v = reg.save(&users, None).await?;
        let snap = reg.load().await?;
        assert_eq!(snap.version.as_deref(), Some(v.as_str()));
        assert_eq!(snap.users, users);
        Ok(())
    }

    #[tokio::test]
    async fn stale_save_is_a_version_conflict() -> Result<(), anyhow::Error> {
        let reg = RegistryStore::new(Arc::new(InMemoryContentStore::new()), "users.json", policy(1));
        let v1 = reg.save(&Registry::new(), None).await?;
        reg.save(&Registry::new(), Some(&v1)).await?;
        let err = reg.save(&Registry::new(), Some(&v1)).await.unwrap_err();
        assert!(err.is_version_conflict());
        Ok(())
    }

    #[tokio::test]
    async fn corrupt_registry_is_surfaced_not_wiped() -> Result<(), anyhow::Error> {
        let mem = Arc::new(InMemoryContentStore::new());
        mem.seed("users.json", "{ this is not json").await;
        let reg = RegistryStore::new(mem.clone(), "users.json", policy(3));

        assert!(matches!(reg.load().await, Err(ServiceError::RegistryCorrupt(_))));
        let res = reg.update(|u| { u.insert("x".into(), record("t")); Ok(()) }).await;
        assert!(matches!(res, Err(ServiceError::RegistryCorrupt(_))));

        let raw = mem.get("users.json").await?.unwrap();
        assert_eq!(raw.content, b"{ this is not json");
        Ok(())
    }

    #[tokio::test]
    async fn update_retries_after_concurrent_write() -> Result<(), anyhow::Error> {
        let store = racing(1);
        let reg = RegistryStore::new(store.clone(), "users.json", policy(3));

        reg.update(|u| { u.insert("alice".into(), record("a")); Ok(()) }).await?;

        let snap = reg.load().await?;
        assert!(snap.users.contains_key("alice"));
        // the competing writer's user survived the retry
        assert!(snap.users.contains_key("racer_0"));
        Ok(())
    }

    #[tokio::test]
    async fn update_without_retry_fails_on_conflict() -> Result<(), anyhow::Error> {
        let store = racing(1);
        let reg = RegistryStore::new(store.clone(), "users.json", RetryPolicy::no_retry());

        let err = reg.update(|u| { u.insert("alice".into(), record("a")); Ok(()) }).await.unwrap_err();
        assert!(err.is_version_conflict());
        assert!(!reg.load().await?.users.contains_key("alice"));
        Ok(())
    }

    #[tokio::test]
    async fn update_gives_up_when_conflicts_persist() -> Result<(), anyhow::Error> {
        let store = racing(10);
        let reg = RegistryStore::new(store.clone(), "users.json", policy(3));
        let calls = AtomicU32::new(0);

        let err = reg
            .update(|u| {
                calls.fetch_add(1, Ordering::SeqCst);
                u.insert("alice".into(), record("a"));
                Ok(())
            })
            .await
            .unwrap_err();
        assert!(err.is_version_conflict());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        Ok(())
    }

    #[tokio::test]
    async fn mutation_error_aborts_without_saving() -> Result<(), anyhow::Error> {
        let mem = Arc::new(InMemoryContentStore::new());
        let reg = RegistryStore::new(mem.clone(), "users.json", policy(3));
        let res: Result<(), _> = reg.update(|_| Err(ServiceError::Conflict("userId already taken".into()))).await;
        assert!(matches!(res, Err(ServiceError::Conflict(_))));
        assert!(mem.is_empty().await);
        Ok(())
    }
}
