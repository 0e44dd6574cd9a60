use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use common::fs::WritePolicy;

pub const APP_NAME: &str = "zkfs";
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Which store the mount talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    /// A ZooKeeper ensemble reached through the connect string
    #[default]
    Zookeeper,
    /// A throwaway in-process tree, for trying things out without an ensemble
    Memory,
}

/// How writes and truncates store their result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum WriteMode {
    /// Unconditional set; concurrent writers may lose edits
    #[default]
    LastWriterWins,
    /// Versioned set with retries
    CompareAndSet,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub backend: Backend,
    /// Store path exposed as the mount root
    #[serde(default = "default_root")]
    pub root: String,
    /// How long to wait for the initial session
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// How long the kernel may cache attributes and entries (0 = always ask)
    #[serde(default)]
    pub attr_ttl_ms: u64,
    #[serde(default)]
    pub write_policy: WriteMode,
    /// Only used with `compare_and_set`
    #[serde(default = "default_max_cas_retries")]
    pub max_cas_retries: u32,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Directory for log files (stdout only if not set)
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
    /// Let other users access the mount (needs user_allow_other in /etc/fuse.conf)
    #[serde(default)]
    pub allow_other: bool,
}

fn default_root() -> String {
    "/".to_string()
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

fn default_max_cas_retries() -> u32 {
    5
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            root: default_root(),
            connect_timeout_ms: default_connect_timeout_ms(),
            attr_ttl_ms: 0,
            write_policy: WriteMode::default(),
            max_cas_retries: default_max_cas_retries(),
            log_level: default_log_level(),
            log_dir: None,
            allow_other: false,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not determine home directory")]
    NoHomeDirectory,
    #[error("config file not found: {0}")]
    MissingFile(PathBuf),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid log level: {0}")]
    InvalidLogLevel(String),
}

impl AppConfig {
    /// Get the config directory path (custom or default ~/.zkfs)
    pub fn config_dir(custom_path: Option<PathBuf>) -> Result<PathBuf, ConfigError> {
        if let Some(path) = custom_path {
            return Ok(path);
        }

        let home = dirs::home_dir().ok_or(ConfigError::NoHomeDirectory)?;
        Ok(home.join(format!(".{}", APP_NAME)))
    }

    /// Load configuration.
    ///
    /// An explicitly given directory must contain a config file; the default
    /// directory is optional and falls back to built-in defaults.
    pub fn load(custom_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let explicit = custom_path.is_some();
        let config_path = Self::config_dir(custom_path)?.join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            if explicit {
                return Err(ConfigError::MissingFile(config_path));
            }
            return Ok(Self::default());
        }

        Self::from_file(&config_path)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let config_toml = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&config_toml)?)
    }

    pub fn write_policy(&self) -> WritePolicy {
        match self.write_policy {
            WriteMode::LastWriterWins => WritePolicy::LastWriterWins,
            WriteMode::CompareAndSet => WritePolicy::CompareAndSet {
                max_retries: self.max_cas_retries,
            },
        }
    }

    pub fn log_level(&self) -> Result<tracing::Level, ConfigError> {
        tracing::Level::from_str(&self.log_level)
            .map_err(|_| ConfigError::InvalidLogLevel(self.log_level.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.write_policy(), WritePolicy::LastWriterWins);
        assert_eq!(config.log_level().unwrap(), tracing::Level::INFO);
    }

    #[test]
    fn test_parse_full_config() {
        let config: AppConfig = toml::from_str(
            r#"
            backend = "memory"
            root = "/apps/zkfs"
            connect_timeout_ms = 2500
            attr_ttl_ms = 1000
            write_policy = "compare_and_set"
            max_cas_retries = 9
            log_level = "debug"
            log_dir = "/var/log/zkfs"
            allow_other = true
            "#,
        )
        .unwrap();

        assert_eq!(config.backend, Backend::Memory);
        assert_eq!(config.root, "/apps/zkfs");
        assert_eq!(config.connect_timeout_ms, 2500);
        assert_eq!(config.attr_ttl_ms, 1000);
        assert_eq!(
            config.write_policy(),
            WritePolicy::CompareAndSet { max_retries: 9 }
        );
        assert_eq!(config.log_level().unwrap(), tracing::Level::DEBUG);
        assert_eq!(config.log_dir, Some(PathBuf::from("/var/log/zkfs")));
        assert!(config.allow_other);
    }

    #[test]
    fn test_unknown_backend_rejected() {
        assert!(toml::from_str::<AppConfig>("backend = \"etcd\"").is_err());
    }

    #[test]
    fn test_invalid_log_level() {
        let config = AppConfig {
            log_level: "chatty".to_string(),
            ..AppConfig::default()
        };
        assert!(matches!(
            config.log_level(),
            Err(ConfigError::InvalidLogLevel(_))
        ));
    }

    #[test]
    fn test_load_from_custom_dir() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(
            temp_dir.path().join(CONFIG_FILE_NAME),
            "root = \"/mounted\"\n",
        )
        .unwrap();

        let config = AppConfig::load(Some(temp_dir.path().to_path_buf())).unwrap();
        assert_eq!(config.root, "/mounted");
        assert_eq!(config.backend, Backend::Zookeeper);
    }

    #[test]
    fn test_load_custom_dir_without_file_fails() {
        let temp_dir = TempDir::new().unwrap();
        let result = AppConfig::load(Some(temp_dir.path().to_path_buf()));
        assert!(matches!(result, Err(ConfigError::MissingFile(_))));
    }
}
