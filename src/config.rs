use anyhow::Result;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_BASE_URL: &str = "http://localhost:5000/api";
pub const DEFAULT_UPLOAD_URL: &str = "https://api.imgbb.com/1/upload";
pub const DEFAULT_MAX_IMAGE_BYTES: u64 = 5 * 1024 * 1024;

static HTTP_URL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^https?://[^\s/]+").unwrap());

/// A validation error in the configuration
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]: {}", self.field, self.message)
    }
}

/// Where the Campus Connect API lives
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// No timeout unless set; the transport default applies
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: None,
        }
    }
}

/// Third-party image hosting
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ImagesConfig {
    #[serde(default = "default_upload_url")]
    pub upload_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: Option<String>,
    #[serde(default = "default_max_bytes")]
    pub max_bytes: u64,
}

fn default_upload_url() -> String {
    DEFAULT_UPLOAD_URL.to_string()
}

fn default_api_key_env() -> Option<String> {
    Some("IMGBB_API_KEY".to_string())
}

fn default_max_bytes() -> u64 {
    DEFAULT_MAX_IMAGE_BYTES
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            upload_url: default_upload_url(),
            api_key: None,
            api_key_env: default_api_key_env(),
            max_bytes: default_max_bytes(),
        }
    }
}

impl ImagesConfig {
    /// Resolve the host key from config or environment
    pub fn resolve_api_key(&self) -> Option<String> {
        if let Some(key) = &self.api_key {
            return Some(key.clone());
        }
        self.api_key_env
            .as_ref()
            .and_then(|var| std::env::var(var).ok())
            .filter(|k| !k.is_empty())
    }
}

/// Local files the client owns
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct StorageConfig {
    #[serde(default)]
    pub session_file: Option<PathBuf>,
    #[serde(default)]
    pub logs_dir: Option<PathBuf>,
}

/// Main configuration structure
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub images: ImagesConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Partial config as read from a single file, so merging can tell "unset"
/// apart from "set to the default"
#[derive(Debug, Clone, Deserialize, Default)]
struct ConfigLayer {
    #[serde(default)]
    api: ApiLayer,
    #[serde(default)]
    images: ImagesLayer,
    #[serde(default)]
    storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize, Default)]
struct ApiLayer {
    base_url: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
struct ImagesLayer {
    upload_url: Option<String>,
    api_key: Option<String>,
    api_key_env: Option<String>,
    max_bytes: Option<u64>,
}

/// Per-user directory for config, session, and logs (~/.campus)
pub fn home_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".campus")
}

impl Config {
    /// Load configuration from default paths
    /// Priority: local (.campus/config.local.toml) > project (.campus/config.toml) > user (~/.campus/config.toml)
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        let user_config = home_dir().join("config.toml");
        if user_config.exists() {
            config.merge_file(&user_config)?;
        }

        let project_config = Path::new(".campus").join("config.toml");
        if project_config.exists() {
            config.merge_file(&project_config)?;
        }

        // Should be gitignored
        let local_config = Path::new(".campus").join("config.local.toml");
        if local_config.exists() {
            config.merge_file(&local_config)?;
        }

        Ok(config)
    }

    /// Load configuration from a specific path, on top of the defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = Self::default();
        config.merge_file(path)?;
        Ok(config)
    }

    fn merge_file(&mut self, path: &Path) -> Result<()> {
        let content = std::fs::read_to_string(path)?;
        let layer: ConfigLayer = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Invalid config {}: {}", path.display(), e))?;
        self.merge(layer);
        Ok(())
    }

    /// Merge a layer into this config; whatever the layer sets wins
    fn merge(&mut self, other: ConfigLayer) {
        if let Some(url) = other.api.base_url {
            self.api.base_url = url;
        }
        if other.api.timeout_secs.is_some() {
            self.api.timeout_secs = other.api.timeout_secs;
        }

        if let Some(url) = other.images.upload_url {
            self.images.upload_url = url;
        }
        if other.images.api_key.is_some() {
            self.images.api_key = other.images.api_key;
        }
        if other.images.api_key_env.is_some() {
            self.images.api_key_env = other.images.api_key_env;
        }
        if let Some(max) = other.images.max_bytes {
            self.images.max_bytes = max;
        }

        if other.storage.session_file.is_some() {
            self.storage.session_file = other.storage.session_file;
        }
        if other.storage.logs_dir.is_some() {
            self.storage.logs_dir = other.storage.logs_dir;
        }
    }

    pub fn session_file(&self) -> PathBuf {
        self.storage
            .session_file
            .clone()
            .unwrap_or_else(|| home_dir().join("session.json"))
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.storage
            .logs_dir
            .clone()
            .unwrap_or_else(|| home_dir().join("logs"))
    }

    /// Validate configuration and return any errors found
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if !HTTP_URL.is_match(&self.api.base_url) {
            errors.push(ValidationError {
                field: "api.base_url".to_string(),
                message: format!("Expected an http(s) URL, got '{}'", self.api.base_url),
            });
        }

        if self.api.timeout_secs == Some(0) {
            errors.push(ValidationError {
                field: "api.timeout_secs".to_string(),
                message: "Must be greater than 0 when set".to_string(),
            });
        }

        if !HTTP_URL.is_match(&self.images.upload_url) {
            errors.push(ValidationError {
                field: "images.upload_url".to_string(),
                message: format!("Expected an http(s) URL, got '{}'", self.images.upload_url),
            });
        }

        if self.images.max_bytes == 0 {
            errors.push(ValidationError {
                field: "images.max_bytes".to_string(),
                message: "Must be greater than 0".to_string(),
            });
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.api.base_url, "http://localhost:5000/api");
        assert_eq!(config.api.timeout_secs, None);
        assert_eq!(config.images.max_bytes, 5 * 1024 * 1024);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_partial_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[api]
base_url = "https://campus.example.edu/api"

[storage]
session_file = "/tmp/campus-session.json"
"#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.api.base_url, "https://campus.example.edu/api");
        assert_eq!(config.images.upload_url, DEFAULT_UPLOAD_URL);
        assert_eq!(
            config.session_file(),
            PathBuf::from("/tmp/campus-session.json")
        );
    }

    #[test]
    fn test_merge_later_layer_wins() {
        let mut config = Config::default();
        config.merge(
            toml::from_str(
                r#"
[api]
base_url = "https://one.example/api"
timeout_secs = 10
[images]
max_bytes = 1024
"#,
            )
            .unwrap(),
        );
        config.merge(
            toml::from_str(
                r#"
[api]
base_url = "https://two.example/api"
"#,
            )
            .unwrap(),
        );

        assert_eq!(config.api.base_url, "https://two.example/api");
        // Untouched by the second layer
        assert_eq!(config.api.timeout_secs, Some(10));
        assert_eq!(config.images.max_bytes, 1024);
    }

    #[test]
    fn test_invalid_toml_reports_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[api\nbase_url = ").unwrap();
        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("bad.toml"));
    }

    #[test]
    fn test_validate_bad_base_url() {
        let mut config = Config::default();
        config.api.base_url = "localhost:5000".to_string();
        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].field.contains("base_url"));
    }

    #[test]
    fn test_validate_zero_limits() {
        let mut config = Config::default();
        config.api.timeout_secs = Some(0);
        config.images.max_bytes = 0;
        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().any(|e| e.field == "api.timeout_secs"));
        assert!(errors.iter().any(|e| e.field == "images.max_bytes"));
    }

    #[test]
    fn test_resolve_api_key_prefers_direct_key() {
        let images = ImagesConfig {
            api_key: Some("direct".to_string()),
            api_key_env: Some("CAMPUS_TEST_UNSET_KEY_VAR".to_string()),
            ..ImagesConfig::default()
        };
        assert_eq!(images.resolve_api_key(), Some("direct".to_string()));

        let images = ImagesConfig {
            api_key: None,
            api_key_env: Some("CAMPUS_TEST_UNSET_KEY_VAR".to_string()),
            ..ImagesConfig::default()
        };
        assert_eq!(images.resolve_api_key(), None);
    }
}
