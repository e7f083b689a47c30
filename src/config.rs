//! TOML configuration for the `tigger` client.
//!
//! ```toml
//! [api]
//! base_url = "http://localhost:5000"
//! # timeout_secs = 60          # unset: no client-side timeout
//!
//! [credentials]
//! path = "./.activetigger/storage.json"
//!
//! [polling]
//! interval_ms = 2000
//!
//! [export]
//! dir = "./exports"
//!
//! [defaults]
//! project = "tweets-2024"
//! scheme = "default"
//! username = "ada"
//! ```
//!
//! The API base URL can be overridden at runtime with the
//! `ACTIVETIGGER_API_URL` environment variable.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable overriding `api.base_url`.
pub const API_URL_ENV: &str = "ACTIVETIGGER_API_URL";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub api: ApiConfig,
    #[serde(default)]
    pub credentials: CredentialsConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub defaults: DefaultsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CredentialsConfig {
    #[serde(default = "default_credentials_path")]
    pub path: PathBuf,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            path: default_credentials_path(),
        }
    }
}

fn default_credentials_path() -> PathBuf {
    PathBuf::from("./.activetigger/storage.json")
}

#[derive(Debug, Deserialize, Clone)]
pub struct PollingConfig {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
        }
    }
}

fn default_interval_ms() -> u64 {
    2000
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExportConfig {
    #[serde(default = "default_export_dir")]
    pub dir: PathBuf,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            dir: default_export_dir(),
        }
    }
}

fn default_export_dir() -> PathBuf {
    PathBuf::from(".")
}

/// Values used when a command does not name them explicitly.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct DefaultsConfig {
    #[serde(default)]
    pub project: Option<String>,
    #[serde(default)]
    pub scheme: Option<String>,
    /// User name offered by `tigger login`.
    #[serde(default)]
    pub username: Option<String>,
}

impl Config {
    /// Configuration used when no config file exists: local server,
    /// default paths.
    pub fn minimal() -> Self {
        Self {
            api: ApiConfig {
                base_url: "http://localhost:5000".to_string(),
                timeout_secs: None,
            },
            credentials: CredentialsConfig::default(),
            polling: PollingConfig::default(),
            export: ExportConfig::default(),
            defaults: DefaultsConfig::default(),
        }
    }

    /// Applies the `ACTIVETIGGER_API_URL` override, if set and non-empty.
    pub fn apply_env_overrides(&mut self) {
        if let Some(url) = std::env::var(API_URL_ENV)
            .ok()
            .and_then(|v| normalize_override(&v))
        {
            self.api.base_url = url;
        }
    }

    pub fn validate(&self) -> Result<()> {
        let base = self.api.base_url.trim();
        if base.is_empty() {
            bail!("api.base_url must not be empty");
        }
        let url = match reqwest::Url::parse(base) {
            Ok(url) => url,
            Err(e) => bail!("api.base_url is not a valid URL '{}': {}", base, e),
        };
        if !matches!(url.scheme(), "http" | "https") {
            bail!("api.base_url must start with http:// or https:// (got '{}')", base);
        }
        if url.host_str().map_or(true, str::is_empty) {
            bail!("api.base_url has no host (got '{}')", base);
        }
        if self.api.timeout_secs == Some(0) {
            bail!("api.timeout_secs must be > 0 when set");
        }
        if self.polling.interval_ms == 0 {
            bail!("polling.interval_ms must be > 0");
        }
        Ok(())
    }
}

fn normalize_override(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Reads, parses, and validates a config file, then applies environment
/// overrides.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let mut config: Config =
        toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    config.apply_env_overrides();
    config.validate()?;
    Ok(config)
}

/// Loads `path` when it exists, otherwise falls back to [`Config::minimal`]
/// (still honoring environment overrides).
pub fn load_or_minimal(path: &Path) -> Result<Config> {
    if path.exists() {
        return load_config(path);
    }
    let mut config = Config::minimal();
    config.apply_env_overrides();
    config.validate()?;
    Ok(config)
}
