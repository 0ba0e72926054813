use config::{Config, ConfigError, Environment, File};
use openrouter_sdk::openrouter::{
    DEFAULT_APP_TITLE, DEFAULT_APP_URL, DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const API_KEY_ENV: &str = "OPENROUTER_API_KEY";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ApiConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub openrouter: OpenRouterConfig,
    pub cors: Option<CorsConfig>,
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Sqlite,
    Memory,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DatabaseConfig {
    #[serde(default = "default_backend")]
    pub backend: StorageBackend,
    pub path: PathBuf,
}

fn default_backend() -> StorageBackend {
    StorageBackend::Sqlite
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct OpenRouterConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    pub api_key: Option<String>,
    #[serde(default = "default_app_url")]
    pub app_url: String,
    #[serde(default = "default_app_title")]
    pub app_title: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_app_url() -> String {
    DEFAULT_APP_URL.to_string()
}

fn default_app_title() -> String {
    DEFAULT_APP_TITLE.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for OpenRouterConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            app_url: default_app_url(),
            app_title: default_app_title(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct LoggingConfig {
    /// Directory for daily rolling log files; console only when unset
    pub directory: Option<PathBuf>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 3001,
            },
            database: DatabaseConfig {
                backend: StorageBackend::Sqlite,
                path: get_default_db_path(),
            },
            openrouter: OpenRouterConfig::default(),
            cors: Some(CorsConfig {
                allowed_origins: vec![
                    "http://localhost:5173".to_string(),
                    "http://127.0.0.1:5173".to_string(),
                ],
            }),
            logging: None,
        }
    }
}

impl ApiConfig {
    /// Load from the default location, writing a starter file on first run
    pub fn load() -> Result<(Self, PathBuf), ConfigError> {
        let config_path = get_config_path();
        let config = Self::load_from(&config_path)?;
        Ok((config, config_path))
    }

    pub fn load_from(config_path: &Path) -> Result<Self, ConfigError> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ConfigError::Message(format!("Failed to create config directory: {e}"))
            })?;
        }

        if !config_path.exists() {
            std::fs::write(config_path, default_config_file()).map_err(|e| {
                ConfigError::Message(format!("Failed to write default config: {e}"))
            })?;
        }

        let builder = Config::builder()
            .add_source(File::from(config_path.to_path_buf()))
            .add_source(
                Environment::with_prefix("AGENT_CHAT")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let mut config: ApiConfig = builder.try_deserialize()?;

        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.trim().is_empty() {
                config.openrouter.api_key = Some(key);
            }
        }

        config.database.path = expand_tilde(&config.database.path);
        if let Some(logging) = config.logging.as_mut() {
            logging.directory = logging.directory.as_deref().map(expand_tilde);
        }

        Ok(config)
    }

    /// The OpenRouter key; start-up cannot proceed without one
    pub fn api_key(&self) -> Result<&str, ConfigError> {
        self.openrouter
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                ConfigError::Message(format!(
                    "No OpenRouter API key: set {} or [openrouter] api_key",
                    API_KEY_ENV
                ))
            })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn default_config_file() -> String {
    format!(
        r#"
[server]
host = "127.0.0.1"
port = 3001

[database]
backend = "sqlite"  # Options: sqlite, memory
path = "{}"

[openrouter]
base_url = "{}"
# api_key = "sk-or-..."  # or set {}
app_url = "{}"
app_title = "{}"
timeout_secs = {}

[cors]
allowed_origins = ["http://localhost:5173", "http://127.0.0.1:5173"]

[logging]
# directory = "~/.local/share/agent-chat/logs"
"#,
        get_default_db_path().display(),
        DEFAULT_BASE_URL,
        API_KEY_ENV,
        DEFAULT_APP_URL,
        DEFAULT_APP_TITLE,
        DEFAULT_TIMEOUT_SECS,
    )
}

fn expand_tilde(path: &Path) -> PathBuf {
    if path.starts_with("~") {
        if let Some(home) = home::home_dir() {
            let path_str = path.to_string_lossy();
            let expanded = path_str.replacen('~', &home.to_string_lossy(), 1);
            return PathBuf::from(expanded);
        }
    }
    path.to_path_buf()
}

fn get_config_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        config_dir.join("agent-chat/api.toml")
    } else {
        PathBuf::from("api.toml")
    }
}

fn get_default_db_path() -> PathBuf {
    if let Some(data_dir) = dirs::data_local_dir() {
        data_dir.join("agent-chat/chat.db")
    } else {
        PathBuf::from("chat.db")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_first_run_writes_loadable_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/api.toml");

        let config = ApiConfig::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.server.port, 3001);
        assert_eq!(config.database.backend, StorageBackend::Sqlite);
        assert_eq!(config.openrouter.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.openrouter.timeout_secs, 300);
    }

    #[test]
    fn test_file_values_and_defaults_merge() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("api.toml");
        std::fs::write(
            &path,
            r#"
[server]
host = "0.0.0.0"
port = 9000

[database]
backend = "memory"
path = "~/chat.db"

[openrouter]
api_key = "sk-or-file"
"#,
        )
        .unwrap();

        let config = ApiConfig::load_from(&path).unwrap();
        assert_eq!(config.bind_address(), "0.0.0.0:9000");
        assert_eq!(config.database.backend, StorageBackend::Memory);
        assert!(!config.database.path.starts_with("~"));
        assert_eq!(config.openrouter.app_title, DEFAULT_APP_TITLE);
        assert!(config.cors.is_none());
    }

    #[test]
    fn test_missing_api_key_is_an_error() {
        let mut config = ApiConfig::default();
        assert!(config.api_key().is_err());

        config.openrouter.api_key = Some("  ".to_string());
        assert!(config.api_key().is_err());

        config.openrouter.api_key = Some("sk-or-123".to_string());
        assert_eq!(config.api_key().unwrap(), "sk-or-123");
    }
}
