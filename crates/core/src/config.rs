use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::SecretString;
use serde::Deserialize;
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct StorageConfig {
    pub backend: StorageBackendKind,
    /// Optional JSON snapshot file for the local backend. Absent means the
    /// local store is purely in-memory.
    pub snapshot_path: Option<PathBuf>,
    pub crm: Option<CrmConfig>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackendKind {
    Local,
    Crm,
}

#[derive(Clone, Debug)]
pub struct CrmConfig {
    pub base_url: String,
    pub api_key: SecretString,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            storage: StorageConfig {
                backend: StorageBackendKind::Local,
                snapshot_path: None,
                crm: None,
            },
            logging: LoggingConfig { level: "info".to_string() },
        }
    }
}

impl std::str::FromStr for StorageBackendKind {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "crm" => Ok(Self::Crm),
            other => Err(ConfigError::Validation(format!(
                "unsupported storage backend `{other}` (expected local|crm)"
            ))),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    storage: Option<StoragePatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct StoragePatch {
    backend: Option<StorageBackendKind>,
    snapshot_path: Option<PathBuf>,
    crm: Option<CrmPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct CrmPatch {
    base_url: Option<String>,
    api_key: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
}

impl AppConfig {
    /// Loads configuration: defaults, then an optional TOML file, then
    /// `UNITQUOTE_*` environment overrides, then validation.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(path) = config_path {
            let patch = read_patch(path)?;
            config.apply_patch(patch);
        }

        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(storage) = patch.storage {
            if let Some(backend) = storage.backend {
                self.storage.backend = backend;
            }
            if let Some(snapshot_path) = storage.snapshot_path {
                self.storage.snapshot_path = Some(snapshot_path);
            }
            if let Some(crm) = storage.crm {
                let current = self.storage.crm.take();
                self.storage.crm = Some(CrmConfig {
                    base_url: crm
                        .base_url
                        .or_else(|| current.as_ref().map(|c| c.base_url.clone()))
                        .unwrap_or_default(),
                    api_key: crm
                        .api_key
                        .map(SecretString::from)
                        .or_else(|| current.as_ref().map(|c| c.api_key.clone()))
                        .unwrap_or_else(|| String::new().into()),
                    timeout_secs: crm
                        .timeout_secs
                        .or(current.map(|c| c.timeout_secs))
                        .unwrap_or(30),
                });
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("UNITQUOTE_STORAGE_BACKEND") {
            self.storage.backend = value.parse()?;
        }
        if let Some(value) = read_env("UNITQUOTE_SNAPSHOT_PATH") {
            self.storage.snapshot_path = Some(PathBuf::from(value));
        }
        if let Some(value) = read_env("UNITQUOTE_CRM_BASE_URL") {
            let crm = self.crm_or_default();
            crm.base_url = value;
        }
        if let Some(value) = read_env("UNITQUOTE_CRM_API_KEY") {
            let crm = self.crm_or_default();
            crm.api_key = value.into();
        }
        if let Some(value) = read_env("UNITQUOTE_CRM_TIMEOUT_SECS") {
            let parsed = value.parse().map_err(|_| ConfigError::InvalidEnvOverride {
                key: "UNITQUOTE_CRM_TIMEOUT_SECS".to_string(),
                value: value.clone(),
            })?;
            let crm = self.crm_or_default();
            crm.timeout_secs = parsed;
        }
        if let Some(value) = read_env("UNITQUOTE_LOG_LEVEL") {
            self.logging.level = value;
        }
        Ok(())
    }

    fn crm_or_default(&mut self) -> &mut CrmConfig {
        self.storage.crm.get_or_insert_with(|| CrmConfig {
            base_url: String::new(),
            api_key: String::new().into(),
            timeout_secs: 30,
        })
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.backend == StorageBackendKind::Crm {
            let Some(crm) = &self.storage.crm else {
                return Err(ConfigError::Validation(
                    "crm storage backend requires a [storage.crm] section".to_string(),
                ));
            };
            if crm.base_url.trim().is_empty() {
                return Err(ConfigError::Validation(
                    "crm storage backend requires a base_url".to_string(),
                ));
            }
        }
        Ok(())
    }
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;
    toml::from_str(&raw)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use secrecy::ExposeSecret;

    use super::{AppConfig, StorageBackendKind};

    #[test]
    fn defaults_to_local_backend() {
        let config = AppConfig::default();
        assert_eq!(config.storage.backend, StorageBackendKind::Local);
        assert!(config.storage.crm.is_none());
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn loads_crm_backend_from_toml() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(
            file,
            r#"
[storage]
backend = "crm"

[storage.crm]
base_url = "https://crm.example.com/api"
api_key = "sk-test"
timeout_secs = 10

[logging]
level = "debug"
"#
        )
        .expect("write config");

        let config = AppConfig::load(Some(file.path())).expect("load config");
        assert_eq!(config.storage.backend, StorageBackendKind::Crm);
        let crm = config.storage.crm.expect("crm section");
        assert_eq!(crm.base_url, "https://crm.example.com/api");
        assert_eq!(crm.api_key.expose_secret(), "sk-test");
        assert_eq!(crm.timeout_secs, 10);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn crm_backend_without_section_fails_validation() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(
            file,
            r#"
[storage]
backend = "crm"
"#
        )
        .expect("write config");

        assert!(AppConfig::load(Some(file.path())).is_err());
    }

    #[test]
    fn backend_kind_parses_case_insensitively() {
        assert_eq!("Local".parse::<StorageBackendKind>().unwrap(), StorageBackendKind::Local);
        assert_eq!("CRM".parse::<StorageBackendKind>().unwrap(), StorageBackendKind::Crm);
        assert!("sqlite".parse::<StorageBackendKind>().is_err());
    }
}
