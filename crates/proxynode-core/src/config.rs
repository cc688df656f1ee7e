//! Layered ProxyNode configuration
//!
//! Values come from a YAML or TOML file, then environment variables
//! (`PROXYNODE_*`) override whatever the file set. Every section has
//! defaults so a partial file loads.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::{Error, Result};

/// Largest accepted `session_store.max_update_attempts`
pub const MAX_UPDATE_ATTEMPTS: u32 = 10;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProxyNodeConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub session_store: SessionStoreSettings,

    #[serde(default)]
    pub verify_service_provider: VspSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable text
    #[serde(default = "default_false")]
    pub json: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStoreSettings {
    /// Upper bound for a single backend call
    #[serde(default = "default_store_timeout_ms")]
    pub operation_timeout_ms: u64,

    /// Attempts made by read-modify-write helpers before giving up on conflicts
    #[serde(default = "default_max_update_attempts")]
    pub max_update_attempts: u32,
}

/// Connection settings for the Verify Service Provider, the service that
/// generates signed authentication requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VspSettings {
    #[serde(default = "default_vsp_url")]
    pub base_url: String,

    #[serde(default = "default_vsp_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_vsp_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Default for SessionStoreSettings {
    fn default() -> Self {
        Self {
            operation_timeout_ms: default_store_timeout_ms(),
            max_update_attempts: default_max_update_attempts(),
        }
    }
}

impl Default for VspSettings {
    fn default() -> Self {
        Self {
            base_url: default_vsp_url(),
            timeout_secs: default_vsp_timeout_secs(),
            connect_timeout_secs: default_vsp_connect_timeout_secs(),
        }
    }
}

impl ProxyNodeConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;

        let config = if path.extension().and_then(|s| s.to_str()) == Some("toml") {
            toml::from_str(&contents)
                .map_err(|e| Error::Config(format!("TOML parse error: {}", e)))?
        } else {
            // Default to YAML
            serde_yaml::from_str(&contents)
                .map_err(|e| Error::Config(format!("YAML parse error: {}", e)))?
        };

        Ok(config)
    }

    /// Merge environment variables into config (env vars take precedence)
    pub fn merge_env(&mut self) {
        if let Ok(val) = std::env::var("PROXYNODE_LOG_LEVEL") {
            self.logging.level = val;
        }

        if let Ok(val) = std::env::var("PROXYNODE_LOG_JSON") {
            if let Ok(json) = val.parse::<bool>() {
                self.logging.json = json;
            }
        }

        if let Ok(val) = std::env::var("PROXYNODE_STORE_TIMEOUT_MS") {
            match val.parse::<u64>() {
                Ok(ms) => self.session_store.operation_timeout_ms = ms,
                Err(_) => tracing::warn!(
                    "Ignoring invalid PROXYNODE_STORE_TIMEOUT_MS '{}'",
                    val
                ),
            }
        }

        if let Ok(val) = std::env::var("PROXYNODE_VSP_URL") {
            self.verify_service_provider.base_url = val;
        }

        if let Ok(val) = std::env::var("PROXYNODE_VSP_TIMEOUT_SECS") {
            match val.parse::<u64>() {
                Ok(secs) => self.verify_service_provider.timeout_secs = secs,
                Err(_) => tracing::warn!(
                    "Ignoring invalid PROXYNODE_VSP_TIMEOUT_SECS '{}'",
                    val
                ),
            }
        }
    }

    /// Load from file, apply env overrides and validate
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let mut config = Self::from_file(path)?;
        config.merge_env();
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let base_url = self.verify_service_provider.base_url.trim();
        if base_url.is_empty() {
            return Err(Error::ConfigValidation(
                "verify_service_provider.base_url must not be empty".to_string(),
            ));
        }
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(Error::ConfigValidation(format!(
                "verify_service_provider.base_url must be an http(s) URL, got '{}'",
                base_url
            )));
        }
        if self.verify_service_provider.timeout_secs == 0 {
            return Err(Error::ConfigValidation(
                "verify_service_provider.timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.verify_service_provider.connect_timeout_secs == 0 {
            return Err(Error::ConfigValidation(
                "verify_service_provider.connect_timeout_secs must be greater than zero"
                    .to_string(),
            ));
        }
        if self.session_store.operation_timeout_ms == 0 {
            return Err(Error::ConfigValidation(
                "session_store.operation_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.session_store.max_update_attempts == 0 {
            return Err(Error::ConfigValidation(
                "session_store.max_update_attempts must be at least 1".to_string(),
            ));
        }
        if self.session_store.max_update_attempts > MAX_UPDATE_ATTEMPTS {
            return Err(Error::ConfigValidation(format!(
                "session_store.max_update_attempts must be at most {}, got {}",
                MAX_UPDATE_ATTEMPTS, self.session_store.max_update_attempts
            )));
        }
        Ok(())
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_store_timeout_ms() -> u64 {
    2000
}

fn default_max_update_attempts() -> u32 {
    3
}

fn default_vsp_url() -> String {
    "http://localhost:50400".to_string()
}

fn default_vsp_timeout_secs() -> u64 {
    10
}

fn default_vsp_connect_timeout_secs() -> u64 {
    5
}

fn default_false() -> bool {
    false
}
