//! Configuration defaults and loading.
//!
//! Sources, lowest priority first:
//! 1. Built-in defaults ([`defaults`])
//! 2. A TOML file (explicit path, or `marshaller.toml` in the working directory)
//! 3. Environment variables ([`env_vars`])

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

use crate::error::{MarshallerError, Result};

/// Default values.
pub mod defaults {
    pub const REGISTRY_URL: &str = "http://localhost:8080";
    pub const PAGE_SIZE: usize = 100;
    pub const REQUEST_TIMEOUT_SECS: u64 = 10;
    pub const REFRESH_INTERVAL_SECS: u64 = 60;
    pub const REFRESH_JITTER_SECS: u64 = 0;
    pub const CONFIG_FILE: &str = "marshaller.toml";
}

/// Environment variable names.
pub mod env_vars {
    pub const REGISTRY_URL: &str = "MARSHALLER_REGISTRY_URL";
    pub const REGISTRY_TOKEN: &str = "MARSHALLER_REGISTRY_TOKEN";
    pub const REFRESH_INTERVAL_SECS: &str = "MARSHALLER_REFRESH_INTERVAL_SECS";
    pub const REFRESH_JITTER_SECS: &str = "MARSHALLER_REFRESH_JITTER_SECS";
    pub const MISSING_PATH: &str = "MARSHALLER_MISSING_PATH";
    pub const LOG_JSON: &str = "MARSHALLER_LOG_JSON";
}

/// What unmarshalling returns when the requested path is absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingPathPolicy {
    /// Fail with a path `NotFound` error.
    #[default]
    Error,
    /// Return `null`.
    Null,
}

impl std::str::FromStr for MissingPathPolicy {
    type Err = MarshallerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "error" => Ok(Self::Error),
            "null" => Ok(Self::Null),
            other => Err(MarshallerError::Config(format!(
                "unknown missing path policy '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    pub url: String,
    /// Bearer token sent with every registry request.
    pub token: Option<String>,
    pub page_size: usize,
    pub timeout_secs: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            url: defaults::REGISTRY_URL.to_string(),
            token: None,
            page_size: defaults::PAGE_SIZE,
            timeout_secs: defaults::REQUEST_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    pub interval_secs: u64,
    /// Upper bound of a random delay added before every refresh.
    pub jitter_secs: u64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval_secs: defaults::REFRESH_INTERVAL_SECS,
            jitter_secs: defaults::REFRESH_JITTER_SECS,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnmarshalConfig {
    pub missing_path: MissingPathPolicy,
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarshallerConfig {
    pub registry: RegistryConfig,
    pub refresh: RefreshConfig,
    pub unmarshal: UnmarshalConfig,
    pub log_json: bool,
}

impl MarshallerConfig {
    /// Load configuration from `path`, or from `marshaller.toml` when present,
    /// then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(defaults::CONFIG_FILE).exists() => {
                Self::from_file(Path::new(defaults::CONFIG_FILE))?
            }
            None => {
                debug!(category = "config", "No config file, using defaults");
                Self::default()
            }
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            MarshallerError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        info!(category = "config", "Loading config from: {}", path.display());
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| MarshallerError::Config(e.to_string()))
    }

    /// Apply overrides from a variable lookup (the process environment in
    /// production).
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(url) = lookup(env_vars::REGISTRY_URL) {
            self.registry.url = url;
        }
        if let Some(token) = lookup(env_vars::REGISTRY_TOKEN) {
            self.registry.token = Some(token);
        }
        if let Some(secs) = lookup(env_vars::REFRESH_INTERVAL_SECS) {
            self.refresh.interval_secs = parse_env(env_vars::REFRESH_INTERVAL_SECS, &secs)?;
        }
        if let Some(secs) = lookup(env_vars::REFRESH_JITTER_SECS) {
            self.refresh.jitter_secs = parse_env(env_vars::REFRESH_JITTER_SECS, &secs)?;
        }
        if let Some(policy) = lookup(env_vars::MISSING_PATH) {
            self.unmarshal.missing_path = policy.parse()?;
        }
        if let Some(json) = lookup(env_vars::LOG_JSON) {
            self.log_json = parse_env(env_vars::LOG_JSON, &json)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.registry.page_size == 0 {
            return Err(MarshallerError::Config(
                "registry.page_size must be greater than zero".to_string(),
            ));
        }
        if self.refresh.interval_secs == 0 {
            return Err(MarshallerError::Config(
                "refresh.interval_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| MarshallerError::Config(format!("invalid value '{}' for {}", raw, key)))
}
