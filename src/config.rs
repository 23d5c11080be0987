//! Relay configuration: an optional TOML file merged with environment variables.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{RelayError, Result};

pub const DEFAULT_CONFIG_PATH: &str = "relay_config.toml";
pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:3000";
pub const DEFAULT_VERCEL_API_BASE: &str = "https://api.vercel.com";
pub const DEFAULT_GITHUB_API_BASE: &str = "https://api.github.com";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RelayConfig {
    pub server: ServerConfig,
    pub vercel: VercelConfig,
    pub github: GitHubConfig,
    /// Per-call timeout applied to every outbound API request.
    pub request_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    pub log_directory: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct VercelConfig {
    pub api_base: String,
    /// Integration client secret used to sign webhook deliveries.
    pub client_secret: Option<String>,
    pub api_token: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GitHubConfig {
    pub api_base: String,
    pub token: Option<String>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            vercel: VercelConfig::default(),
            github: GitHubConfig::default(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            log_directory: None,
        }
    }
}

impl Default for VercelConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_VERCEL_API_BASE.to_string(),
            client_secret: None,
            api_token: None,
        }
    }
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_GITHUB_API_BASE.to_string(),
            token: None,
        }
    }
}

/// Which of the required secrets are absent. Serialized with the
/// environment variable names so operators know what to set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MissingSecrets {
    #[serde(rename = "VERCEL_CLIENT_SECRET")]
    pub client_secret: bool,
    #[serde(rename = "VERCEL_API_TOKEN")]
    pub vercel_token: bool,
    #[serde(rename = "GITHUB_TOKEN")]
    pub github_token: bool,
}

impl MissingSecrets {
    pub fn any(&self) -> bool {
        self.client_secret || self.vercel_token || self.github_token
    }
}

impl fmt::Display for MissingSecrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = [
            (self.client_secret, "VERCEL_CLIENT_SECRET"),
            (self.vercel_token, "VERCEL_API_TOKEN"),
            (self.github_token, "GITHUB_TOKEN"),
        ]
        .into_iter()
        .filter_map(|(missing, name)| missing.then_some(name))
        .collect();
        write!(f, "{}", names.join(", "))
    }
}

fn is_unset(value: &Option<String>) -> bool {
    value.as_deref().map(str::is_empty).unwrap_or(true)
}

impl RelayConfig {
    /// Overrides file values with any non-empty variable returned by `lookup`.
    pub fn apply_env_with<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(v) = var("BIND_ADDRESS") {
            self.server.bind_address = v;
        }
        if let Some(v) = var("VERCEL_API_BASE") {
            self.vercel.api_base = v;
        }
        if let Some(v) = var("GITHUB_API_BASE") {
            self.github.api_base = v;
        }
        if let Some(v) = var("VERCEL_CLIENT_SECRET") {
            self.vercel.client_secret = Some(v);
        }
        if let Some(v) = var("VERCEL_API_TOKEN") {
            self.vercel.api_token = Some(v);
        }
        if let Some(v) = var("GITHUB_TOKEN") {
            self.github.token = Some(v);
        }
        self
    }

    pub fn apply_env(self) -> Self {
        self.apply_env_with(|key| std::env::var(key).ok())
    }

    pub fn missing_secrets(&self) -> MissingSecrets {
        MissingSecrets {
            client_secret: is_unset(&self.vercel.client_secret),
            vercel_token: is_unset(&self.vercel.api_token),
            github_token: is_unset(&self.github.token),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Load and parse the configuration file. A missing file yields the defaults.
pub fn load_config(path: &Path) -> Result<RelayConfig> {
    if !path.exists() {
        return Ok(RelayConfig::default());
    }

    let config_str = fs::read_to_string(path).map_err(|e| {
        RelayError::ConfigError(format!(
            "Failed to read config file '{}': {}",
            path.display(),
            e
        ))
    })?;

    let config: RelayConfig = toml::from_str(&config_str).map_err(|e| {
        RelayError::ConfigError(format!(
            "Failed to parse config file '{}': {}",
            path.display(),
            e
        ))
    })?;

    if config.request_timeout_secs == 0 {
        return Err(RelayError::ConfigError(
            "request_timeout_secs must be greater than zero".to_string(),
        ));
    }

    Ok(config)
}
