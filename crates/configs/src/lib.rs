use anyhow::anyhow;
use anyhow::Result;
use serde::Deserialize;

/// Process-wide configuration, built once at startup and shared read-only.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub github: GithubConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub http_client: HttpClientConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub worker_threads: Option<usize>,
    /// Address for the `/healthz` + `/metrics` listener; disabled when unset.
    #[serde(default)]
    pub admin_addr: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "0.0.0.0".into(), port: 5000, worker_threads: Some(4), admin_addr: None }
    }
}

/// Coordinates and credential of the repository used as the backing store.
#[derive(Debug, Clone, Deserialize)]
pub struct GithubConfig {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub repo: String,
    #[serde(default = "default_branch")]
    pub branch: String,
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Base of the public URL returned by uploads; defaults to the GitHub Pages site.
    #[serde(default)]
    pub public_base_url: Option<String>,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            owner: String::new(),
            repo: String::new(),
            branch: default_branch(),
            api_url: default_api_url(),
            public_base_url: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_users_file_path")]
    pub users_file_path: String,
    #[serde(default = "default_notes_folder")]
    pub notes_folder: String,
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            users_file_path: default_users_file_path(),
            notes_folder: default_notes_folder(),
            max_file_size: default_max_file_size(),
        }
    }
}

/// Conflict handling for registry writes. `max_attempts = 1` disables retry.
#[derive(Debug, Clone, Deserialize)]
pub struct RegistryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_backoff_base")]
    pub backoff_base_ms: u64,
    #[serde(default = "default_backoff_max")]
    pub backoff_max_ms: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_base_ms: default_backoff_base(),
            backoff_max_ms: default_backoff_max(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpClientConfig {
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

fn default_branch() -> String { "main".into() }
fn default_api_url() -> String { "https://api.github.com".into() }
fn default_users_file_path() -> String { "users.json".into() }
fn default_notes_folder() -> String { "notes".into() }
// GitHub contents API rejects payloads much above this
fn default_max_file_size() -> u64 { 90 * 1024 * 1024 }
fn default_max_attempts() -> u32 { 3 }
fn default_backoff_base() -> u64 { 100 }
fn default_backoff_max() -> u64 { 2000 }
fn default_connect_timeout() -> u64 { 5 }
fn default_request_timeout() -> u64 { 30 }

/// Load `config.toml` (or `CONFIG_PATH`). A missing file yields the defaults;
/// a file that exists but does not parse is an error.
pub fn load_default() -> Result<AppConfig> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    if !std::path::Path::new(&path).exists() {
        return Ok(AppConfig::default());
    }
    load_from_file(&path)
}

pub fn load_from_file(path: &str) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let cfg: AppConfig = toml::from_str(&content)?;
    Ok(cfg)
}

impl AppConfig {
    /// File, then environment overlay, then validation.
    pub fn load_and_validate() -> Result<Self> {
        let mut cfg = load_default()?;
        cfg.apply_env(|key| std::env::var(key).ok())?;
        cfg.normalize_and_validate()?;
        Ok(cfg)
    }

    /// Overlay values from an environment-like lookup. Variable names follow
    /// the deployment convention (`GITHUB_TOKEN`, `NOTES_FOLDER`, `PORT`, ...).
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("GITHUB_TOKEN") { self.github.token = v; }
        if let Some(v) = get("GITHUB_OWNER") { self.github.owner = v; }
        if let Some(v) = get("GITHUB_REPO") { self.github.repo = v; }
        if let Some(v) = get("BRANCH") { self.github.branch = v; }
        if let Some(v) = get("GITHUB_API_URL") { self.github.api_url = v; }
        if let Some(v) = get("PUBLIC_BASE_URL") { self.github.public_base_url = Some(v); }
        if let Some(v) = get("USERS_FILE_PATH") { self.storage.users_file_path = v; }
        if let Some(v) = get("NOTES_FOLDER") { self.storage.notes_folder = v; }
        if let Some(v) = get("MAX_FILE_SIZE") {
            self.storage.max_file_size = v
                .trim()
                .parse()
                .map_err(|_| anyhow!("MAX_FILE_SIZE must be a byte count, got {v:?}"))?;
        }
        if let Some(v) = get("SERVER_HOST") { self.server.host = v; }
        if let Some(v) = get("PORT").or_else(|| get("SERVER_PORT")) {
            self.server.port = v.trim().parse().map_err(|_| anyhow!("PORT must be 1..=65535, got {v:?}"))?;
        }
        if let Some(v) = get("TOKIO_WORKER_THREADS") {
            self.server.worker_threads = v.trim().parse().ok();
        }
        if let Some(v) = get("ADMIN_ADDR") { self.server.admin_addr = Some(v); }
        if let Some(v) = get("REGISTRY_MAX_ATTEMPTS") {
            self.registry.max_attempts = v
                .trim()
                .parse()
                .map_err(|_| anyhow!("REGISTRY_MAX_ATTEMPTS must be a positive integer, got {v:?}"))?;
        }
        if let Some(v) = get("HTTP_TIMEOUT_SECS") {
            self.http_client.request_timeout_secs = v
                .trim()
                .parse()
                .map_err(|_| anyhow!("HTTP_TIMEOUT_SECS must be a positive integer, got {v:?}"))?;
        }
        Ok(())
    }

    pub fn normalize_and_validate(&mut self) -> Result<()> {
        self.server.normalize()?;
        self.github.validate()?;
        self.storage.normalize_and_validate()?;
        if self.registry.max_attempts == 0 {
            self.registry.max_attempts = 1;
        }
        if self.http_client.connect_timeout_secs == 0 || self.http_client.request_timeout_secs == 0 {
            return Err(anyhow!("http_client 超时配置必须为正整数秒"));
        }
        Ok(())
    }

    /// Public URL for a stored path, e.g. `https://owner.github.io/repo/notes/alice/1_a.txt`.
    pub fn public_url(&self, repo_path: &str) -> String {
        let base = match &self.github.public_base_url {
            Some(b) => b.trim_end_matches('/').to_string(),
            None => format!("https://{}.github.io/{}", self.github.owner, self.github.repo),
        };
        format!("{}/{}", base, repo_path.trim_start_matches('/'))
    }
}

impl ServerConfig {
    fn normalize(&mut self) -> Result<()> {
        if self.host.trim().is_empty() {
            self.host = "0.0.0.0".to_string();
        }
        if self.port == 0 {
            return Err(anyhow!("server.port 必须在 1..=65535 范围内"));
        }
        match self.worker_threads {
            Some(0) | None => self.worker_threads = Some(4),
            Some(_) => {}
        }
        Ok(())
    }
}

impl GithubConfig {
    /// Missing credential or coordinates are fatal: every endpoint depends on them.
    pub fn validate(&self) -> Result<()> {
        let mut missing = Vec::new();
        if self.token.trim().is_empty() { missing.push("GITHUB_TOKEN"); }
        if self.owner.trim().is_empty() { missing.push("GITHUB_OWNER"); }
        if self.repo.trim().is_empty() { missing.push("GITHUB_REPO"); }
        if !missing.is_empty() {
            return Err(anyhow!("backing store not configured; set {}", missing.join(", ")));
        }
        if self.branch.trim().is_empty() {
            return Err(anyhow!("github.branch 为空"));
        }
        let lower = self.api_url.to_lowercase();
        if !(lower.starts_with("http://") || lower.starts_with("https://")) {
            return Err(anyhow!("github.api_url must start with http:// or https://"));
        }
        Ok(())
    }
}

impl StorageConfig {
    fn normalize_and_validate(&mut self) -> Result<()> {
        self.notes_folder = self.notes_folder.trim().trim_matches('/').to_string();
        self.users_file_path = self.users_file_path.trim().trim_start_matches('/').to_string();
        if self.notes_folder.is_empty() {
            return Err(anyhow!("storage.notes_folder must not be empty"));
        }
        if self.users_file_path.is_empty() {
            return Err(anyhow!("storage.users_file_path must not be empty"));
        }
        if self.max_file_size == 0 {
            return Err(anyhow!("storage.max_file_size must be > 0"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn defaults_match_deployment_conventions() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.github.branch, "main");
        assert_eq!(cfg.storage.users_file_path, "users.json");
        assert_eq!(cfg.storage.notes_folder, "notes");
        assert_eq!(cfg.storage.max_file_size, 90 * 1024 * 1024);
        assert_eq!(cfg.server.port, 5000);
        assert_eq!(cfg.registry.max_attempts, 3);
    }

    #[test]
    fn env_overlay_then_validate() -> Result<()> {
        let vars = env(&[
            ("GITHUB_TOKEN", "t0k"),
            ("GITHUB_OWNER", "akm"),
            ("GITHUB_REPO", "NotesViewer"),
            ("NOTES_FOLDER", "/uploads/"),
            ("MAX_FILE_SIZE", "1024"),
            ("PORT", "8088"),
        ]);
        let mut cfg = AppConfig::default();
        cfg.apply_env(|k| vars.get(k).cloned())?;
        cfg.normalize_and_validate()?;
        assert_eq!(cfg.github.token, "t0k");
        assert_eq!(cfg.storage.notes_folder, "uploads");
        assert_eq!(cfg.storage.max_file_size, 1024);
        assert_eq!(cfg.server.port, 8088);
        Ok(())
    }

    #[test]
    fn missing_credentials_fail_validation() {
        let vars = env(&[("GITHUB_OWNER", "akm")]);
        let mut cfg = AppConfig::default();
        cfg.apply_env(|k| vars.get(k).cloned()).unwrap();
        let err = cfg.normalize_and_validate().unwrap_err().to_string();
        assert!(err.contains("GITHUB_TOKEN"));
        assert!(err.contains("GITHUB_REPO"));
        assert!(!err.contains("GITHUB_OWNER"));
    }

    #[test]
    fn malformed_numbers_are_rejected() {
        let vars = env(&[("MAX_FILE_SIZE", "ninety")]);
        let mut cfg = AppConfig::default();
        assert!(cfg.apply_env(|k| vars.get(k).cloned()).is_err());
    }

    #[test]
    fn public_url_defaults_to_pages_site() {
        let mut cfg = AppConfig::default();
        cfg.github.owner = "akm".into();
        cfg.github.repo = "NotesViewer".into();
        assert_eq!(
            cfg.public_url("notes/alice/1_a.txt"),
            "https://akm.github.io/NotesViewer/notes/alice/1_a.txt"
        );
        cfg.github.public_base_url = Some("https://cdn.example.com/".into());
        assert_eq!(cfg.public_url("/notes/x"), "https://cdn.example.com/notes/x");
    }

    #[test]
    fn toml_file_loads_sections() -> Result<()> {
        let path = std::env::temp_dir().join(format!("notes_cfg_{}.toml", uuid::Uuid::new_v4()));
        std::fs::write(
            &path,
            r#"
[server]
host = "127.0.0.1"
port = 9000

[github]
token = "abc"
owner = "o"
repo = "r"

[registry]
max_attempts = 1
"#,
        )?;
        let mut cfg = load_from_file(path.to_str().unwrap())?;
        cfg.normalize_and_validate()?;
        assert_eq!(cfg.server.port, 9000);
        assert_eq!(cfg.github.branch, "main");
        assert_eq!(cfg.registry.max_attempts, 1);
        assert_eq!(cfg.storage.notes_folder, "notes");
        let _ = std::fs::remove_file(&path);
        Ok(())
    }
}
