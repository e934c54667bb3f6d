use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{ContentEntry, ContentStore, StoredFile};
use crate::errors::ServiceError;

/// In-process [`ContentStore`] with the same conditional-write rules as the
/// remote one. Used by tests and for running the server without a repository.
#[derive(Default)]
pub struct InMemoryContentStore {
    files: RwLock<BTreeMap<String, StoredFile>>,
}

fn new_version() -> String {
    Uuid::new_v4().simple().to_string()
}

fn normalize(path: &str) -> String {
    path.trim_matches('/').to_string()
}

impl InMemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write bytes unconditionally, bypassing version checks.
    pub async fn seed(&self, path: &str, content: impl Into<Vec<u8>>) -> String {
        let version = new_version();
        let file = StoredFile { version: version.clone(), content: content.into() };
        self.files.write().await.insert(normalize(path), file);
        version
    }

    pub async fn contains(&self, path: &str) -> bool {
        self.files.read().await.contains_key(&normalize(path))
    }

    pub async fn len(&self) -> usize {
        self.files.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.files.read().await.is_empty()
    }
}

#[async_trait]
impl ContentStore for InMemoryContentStore {
    async fn get(&self, path: &str) -> Result<Option<StoredFile>, ServiceError> {
        Ok(self.files.read().await.get(&normalize(path)).cloned())
    }

    async fn put(
        &self,
        path: &str,
        content: &[u8],
        _message: &str,
        version: Option<&str>,
    ) -> Result<String, ServiceError> {
        let key = normalize(path);
        let mut files = self.files.write().await;
        let current = files.get(&key).map(|f| f.version.as_str());
        if current != version {
            return Err(ServiceError::VersionConflict { path: key });
        }
        let version = new_version();
        files.insert(key, StoredFile { version: version.clone(), content: content.to_vec() });
        Ok(version)
    }

    async fn delete(&self, path: &str, version: &str, _message: &str) -> Result<(), ServiceError> {
        let key = normalize(path);
        let mut files = self.files.write().await;
        match files.get(&key) {
            None => Err(ServiceError::NotFound("File not found".into())),
            Some(f) if f.version != version => Err(ServiceError::Upstream {
                status: 409,
                body: format!("{key} does not match {version}"),
            }),
            Some(_) => {
                files.remove(&key);
                Ok(())
            }
        }
    }

    async fn list(&self, dir: &str) -> Result<Vec<ContentEntry>, ServiceError> {
        let prefix = format!("{}/", normalize(dir));
        let files = self.files.read().await;
        Ok(files
            .keys()
            .filter_map(|path| {
                let name = path.strip_prefix(&prefix)?;
                // direct children only; deeper paths belong to subdirectories
                if name.is_empty() || name.contains('/') {
                    return None;
                }
                Some(ContentEntry {
                    name: name.to_string(),
                    path: path.clone(),
                    download_url: Some(format!("memory://{path}")),
                })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_then_conditional_update() -> Result<(), anyhow::Error> {
        let store = InMemoryContentStore::new();
        let v1 = store.put("users.json", b"{}", "create", None).await?;

        // create over an existing file is a conflict
        let err = store.put("users.json", b"{}", "create again", None).await.unwrap_err();
        assert!(err.is_version_conflict());

        let v2 = store.put("users.json", b"{\"a\":1}", "update", Some(&v1)).await?;
        assert_ne!(v1, v2);

        // stale version is rejected
        let err = store.put("users.json", b"{}", "stale", Some(&v1)).await.unwrap_err();
        assert!(err.is_version_conflict());

        let got = store.get("users.json").await?.unwrap();
        assert_eq!(got.version, v2);
        assert_eq!(got.content, b"{\"a\":1}");
        Ok(())
    }

    #[tokio::test]
    async fn list_returns_direct_children_only() -> Result<(), anyhow::Error> {
        let store = InMemoryContentStore::new();
        store.seed("notes/alice/1_a.txt", "a").await;
        store.seed("notes/alice/2_b.txt", "b").await;
        store.seed("notes/alice/sub/3_c.txt", "c").await;
        store.seed("notes/alicex/4_d.txt", "d").await;

        let entries = store.list("notes/alice").await?;
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["1_a.txt", "2_b.txt"]);
        assert_eq!(entries[0].path, "notes/alice/1_a.txt");
        assert!(store.list("notes/nobody").await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn delete_requires_current_version() -> Result<(), anyhow::Error> {
        let store = InMemoryContentStore::new();
        let v = store.seed("notes/alice/1_a.txt", "a").await;
        assert!(matches!(
            store.delete("notes/alice/1_a.txt", "stale", "rm").await,
            Err(ServiceError::Upstream { status: 409, .. })
        ));
        store.delete("notes/alice/1_a.txt", &v, "rm").await?;
        assert!(!store.contains("notes/alice/1_a.txt").await);
        assert!(matches!(
            store.delete("notes/alice/1_a.txt", &v, "rm").await,
            Err(ServiceError::NotFound(_))
        ));
        Ok(())
    }
}
