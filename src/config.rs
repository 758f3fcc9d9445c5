use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default quiet period before a debounced write is persisted.
pub const DEFAULT_DEBOUNCE_MS: u64 = 150;
/// Default interval between ephemeral cleanup sweeps (15 minutes).
pub const DEFAULT_CLEANUP_INTERVAL_SECS: u64 = 15 * 60;
/// Default age after which temp/cache entries are deleted (30 minutes).
pub const DEFAULT_RETENTION_SECS: u64 = 30 * 60;

/// Source of a configuration value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    Default,
    File,
    Environment,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Default => write!(f, "default"),
            ConfigSource::File => write!(f, "file"),
            ConfigSource::Environment => write!(f, "environment"),
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }
}

/// Remote backend configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RemoteConfig {
    /// Backend URL (e.g., "https://api.example.com")
    pub server_url: Option<String>,
    /// API key sent as a bearer token
    pub api_key: Option<String>,
}

impl RemoteConfig {
    /// Returns true if the remote backend is configured (has both server_url and api_key)
    pub fn is_configured(&self) -> bool {
        self.server_url.is_some() && self.api_key.is_some()
    }
}

/// Ephemeral data cleanup configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanupConfig {
    pub interval_secs: u64,
    pub retention_secs: u64,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            interval_secs: DEFAULT_CLEANUP_INTERVAL_SECS,
            retention_secs: DEFAULT_RETENTION_SECS,
        }
    }
}

impl CleanupConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_secs)
    }
}

/// Application configuration with source tracking
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// Path to the SQLite database backing the local store
    pub database_path: ConfigValue<PathBuf>,
    /// Quiet period for debounced writes, in milliseconds
    pub debounce_ms: ConfigValue<u64>,
    /// Re-read packing items after a remote save and compare group assignments
    pub verify_group_assignments: bool,
    /// Config file path used (if any)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_file: Option<PathBuf>,
    /// Remote backend configuration
    pub remote: RemoteConfig,
    /// Cleanup configuration
    pub cleanup: CleanupConfig,
}

/// Internal struct for deserializing config file
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ConfigFile {
    database_path: Option<PathBuf>,
    debounce_ms: Option<u64>,
    verify_group_assignments: Option<bool>,
    remote: Option<RemoteConfig>,
    cleanup: Option<CleanupConfig>,
}

impl Config {
    /// Load configuration with priority: env vars > config file > defaults
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let default_db_path = Self::default_data_dir().join("packwise.db");

        // Start with defaults
        let mut database_path = ConfigValue::new(default_db_path, ConfigSource::Default);
        let mut debounce_ms = ConfigValue::new(DEFAULT_DEBOUNCE_MS, ConfigSource::Default);
        let mut verify_group_assignments = true;
        let mut config_file = None;
        let mut remote = RemoteConfig::default();
        let mut cleanup = CleanupConfig::default();

        // Try to load from config file
        let path = config_path.unwrap_or_else(Self::default_config_path);
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadError(path.clone(), e))?;
            let file_config: ConfigFile = serde_yaml::from_str(&contents)
                .map_err(|e| ConfigError::ParseError(path.clone(), e))?;

            config_file = Some(path.clone());

            if let Some(db_path) = file_config.database_path {
                // Resolve relative paths against config file's directory
                let resolved_path = if db_path.is_relative() {
                    path.parent().map(|p| p.join(&db_path)).unwrap_or(db_path)
                } else {
                    db_path
                };
                database_path = ConfigValue::new(resolved_path, ConfigSource::File);
            }
            if let Some(ms) = file_config.debounce_ms {
                debounce_ms = ConfigValue::new(ms, ConfigSource::File);
            }
            if let Some(verify) = file_config.verify_group_assignments {
                verify_group_assignments = verify;
            }
            if let Some(remote_config) = file_config.remote {
                remote = remote_config;
            }
            if let Some(cleanup_config) = file_config.cleanup {
                if cleanup_config.interval_secs == 0 {
                    return Err(ConfigError::InvalidValue(
                        "cleanup.interval_secs".into(),
                        "0".into(),
                    ));
                }
                cleanup = cleanup_config;
            }
        }

        // Apply environment variable overrides
        if let Ok(db_path) = std::env::var("PACKWISE_DATABASE_PATH") {
            database_path = ConfigValue::new(PathBuf::from(db_path), ConfigSource::Environment);
        }
        if let Ok(raw) = std::env::var("PACKWISE_DEBOUNCE_MS") {
            let ms = raw
                .trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidValue("PACKWISE_DEBOUNCE_MS".into(), raw))?;
            debounce_ms = ConfigValue::new(ms, ConfigSource::Environment);
        }
        if let Ok(url) = std::env::var("PACKWISE_REMOTE_URL") {
            remote.server_url = Some(url);
        }
        if let Ok(key) = std::env::var("PACKWISE_REMOTE_API_KEY") {
            remote.api_key = Some(key);
        }

        Ok(Self {
            database_path,
            debounce_ms,
            verify_group_assignments,
            config_file,
            remote,
            cleanup,
        })
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms.value)
    }

    /// Default config directory (platform-specific):
    /// - Linux: ~/.config/packwise/
    /// - macOS: ~/Library/Application Support/packwise/
    /// - Windows: %APPDATA%/packwise/
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("packwise")
    }

    /// Default data directory (platform-specific):
    /// - Linux: ~/.local/share/packwise/
    /// - macOS: ~/Library/Application Support/packwise/
    /// - Windows: %APPDATA%/packwise/
    pub fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("packwise")
    }

    /// Default config file path (platform-specific config dir + config.yaml)
    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join("config.yaml")
    }
}

#[derive(Debug)]
pub enum ConfigError {
    ReadError(PathBuf, std::io::Error),
    ParseError(PathBuf, serde_yaml::Error),
    InvalidValue(String, String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), e)
            }
            ConfigError::InvalidValue(name, value) => {
                write!(f, "Invalid value for {}: '{}'", name, value)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
