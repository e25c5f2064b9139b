//! Collector configuration with secure token storage
//!
//! Handles:
//! - Collector identity (name) and generators directory
//! - Controller address and collector token (optionally in the OS keyring)
//! - Heartbeat timing
//! - Environment overrides and OS-specific storage location

use crate::error::{ConfigError, ValidationError};
use keyring::Entry;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

const KEYRING_SERVICE: &str = "refocus-collector";
const KEYRING_USER: &str = "collector-token";

pub const CONFIG_PATH_ENV: &str = "REFOCUS_COLLECTOR_CONFIG";
pub const NAME_ENV: &str = "REFOCUS_COLLECTOR_NAME";
pub const URL_ENV: &str = "REFOCUS_URL";
pub const TOKEN_ENV: &str = "REFOCUS_COLLECTOR_TOKEN";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectorConfig {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "default_generators_dir")]
    pub generators_dir: PathBuf,
    #[serde(default = "default_heartbeat_interval_secs")]
    pub heartbeat_interval_secs: u64,
    #[serde(default)]
    pub refocus: RefocusConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefocusConfig {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub collector_token: Option<String>,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Keep the collector token in the OS keyring instead of the config file
    #[serde(default)]
    pub store_token: bool,
}

/// Everything needed to address the controller, all fields present
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerTarget {
    pub name: String,
    pub url: String,
    pub token: String,
}

impl ControllerTarget {
    /// `<url>/v1/collectors/<name>/heartbeat`
    pub fn heartbeat_url(&self) -> String {
        format!(
            "{}/v1/collectors/{}/heartbeat",
            self.url.trim_end_matches('/'),
            self.name
        )
    }
}

fn default_generators_dir() -> PathBuf {
    PathBuf::from("generators")
}

fn default_heartbeat_interval_secs() -> u64 {
    15
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for RefocusConfig {
    fn default() -> Self {
        Self {
            url: None,
            collector_token: None,
            request_timeout_secs: default_request_timeout_secs(),
            store_token: false,
        }
    }
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            name: None,
            generators_dir: default_generators_dir(),
            heartbeat_interval_secs: default_heartbeat_interval_secs(),
            refocus: RefocusConfig::default(),
        }
    }
}

impl CollectorConfig {
    /// Load config from `REFOCUS_COLLECTOR_CONFIG` or the OS-specific location,
    /// then apply environment overrides and the keyring token.
    pub async fn load() -> Result<Self, ConfigError> {
        let path = Self::config_file_path()?;
        let mut config = Self::load_from(&path).await?;

        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.resolve_keyring_token();

        Ok(config)
    }

    /// Fill a missing token from the keyring when `store_token` is set
    pub fn resolve_keyring_token(&mut self) {
        if self.refocus.store_token && self.refocus.collector_token.is_none() {
            match Self::load_token() {
                Ok(token) => self.refocus.collector_token = Some(token),
                Err(e) => warn!("Collector token not found in keyring: {}", e),
            }
        }
    }

    /// Read a config file, falling back to defaults when it does not exist
    pub async fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            info!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        debug!("Loaded config from {}", path.display());
        Ok(toml::from_str(&content)?)
    }

    /// Save config to the location `load` reads from
    pub async fn save(&self) -> Result<PathBuf, ConfigError> {
        let path = Self::config_file_path()?;
        self.save_to(&path).await?;
        Ok(path)
    }

    /// Write the config file; with `store_token` the token goes to the keyring
    pub async fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }

        let mut on_disk = self.clone();
        if self.refocus.store_token {
            if let Some(token) = &self.refocus.collector_token {
                match Self::store_in_keyring(token) {
                    Ok(()) => on_disk.refocus.collector_token = None,
                    Err(e) => warn!(
                        "Keyring unavailable ({}), keeping the collector token in {}",
                        e,
                        path.display()
                    ),
                }
            }
        }

        let content = toml::to_string_pretty(&on_disk)?;
        tokio::fs::write(path, content).await.map_err(io_err)?;
        Ok(())
    }

    /// Override file values with `REFOCUS_COLLECTOR_NAME`, `REFOCUS_URL` and
    /// `REFOCUS_COLLECTOR_TOKEN` when set
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(name) = lookup(NAME_ENV) {
            self.name = Some(name);
        }
        if let Some(url) = lookup(URL_ENV) {
            self.refocus.url = Some(url);
        }
        if let Some(token) = lookup(TOKEN_ENV) {
            self.refocus.collector_token = Some(token);
        }
    }

    /// Resolve the fields required to address the controller.
    ///
    /// Fields are checked in order name, url, token; the first one missing or
    /// blank is reported.
    pub fn controller_target(&self) -> Result<ControllerTarget, ValidationError> {
        fn required(
            value: &Option<String>,
            field: &'static str,
        ) -> Result<String, ValidationError> {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(String::from)
                .ok_or(ValidationError::MissingField(field))
        }

        Ok(ControllerTarget {
            name: required(&self.name, "name")?,
            url: required(&self.refocus.url, "refocus.url")?,
            token: required(&self.refocus.collector_token, "refocus.collectorToken")?,
        })
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs.max(1))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.refocus.request_timeout_secs.max(1))
    }

    /// `REFOCUS_COLLECTOR_CONFIG` if set, else the OS config directory
    pub fn config_file_path() -> Result<PathBuf, ConfigError> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            return Ok(PathBuf::from(path));
        }

        let mut path = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        path.push("refocus-collector");
        path.push("config.toml");
        Ok(path)
    }

    /// Check if this is first-time setup
    pub fn is_first_time_setup() -> bool {
        Self::config_file_path()
            .map(|p| !p.exists())
            .unwrap_or(true)
    }

    fn load_token() -> Result<String, ConfigError> {
        let entry = Entry::new(KEYRING_SERVICE, KEYRING_USER)?;
        Ok(entry.get_password()?)
    }

    fn save_token(token: &str) -> Result<(), ConfigError> {
        let entry = Entry::new(KEYRING_SERVICE, KEYRING_USER)?;
        Ok(entry.set_password(token)?)
    }

    /// Save the token and read it back through a fresh entry, so a keyring
    /// that does not persist is reported as an error
    fn store_in_keyring(token: &str) -> Result<(), ConfigError> {
        Self::save_token(token)?;
        match Self::load_token()? {
            stored if stored == token => Ok(()),
            _ => Err(ConfigError::Keyring(keyring::Error::NoEntry)),
        }
    }

    /// Delete the collector token from the keyring
    pub fn delete_token() -> Result<(), ConfigError> {
        let entry = Entry::new(KEYRING_SERVICE, KEYRING_USER)?;
        Ok(entry.delete_credential()?)
    }
}
