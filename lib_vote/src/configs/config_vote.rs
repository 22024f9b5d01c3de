//! # Voting Client Configuration
//!
//! `VoteConfig` and its loader. Values are layered, later wins: built-in
//! defaults, an optional JSON file, `.env`, then `CATVOTE_*` variables.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fmt, fs};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::StoreOptions;
use crate::model::DEFAULT_BASE_URL;
use crate::storage::FileStorage;

/// Prefix of every environment override, e.g. `CATVOTE_API_KEY`.
const ENV_PREFIX: &str = "CATVOTE_";

/// Failure while layering configuration sources.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A numeric override could not be parsed.
    #[error("Environment variable {name} has an invalid value: {value}")]
    InvalidEnvVar {
        /// Full variable name, e.g. `CATVOTE_FETCH_LIMIT`.
        name: String,
        /// The rejected raw value.
        value: String,
    },
}

/// Settings for the voting client. Every field is optional on disk; missing
/// ones keep their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VoteConfig {
    /// Catalog service base URL.
    pub api_base_url: String,
    /// Credential sent as `x-api-key`.
    pub api_key: Option<String>,
    /// Items requested per fetch.
    pub fetch_limit: u32,
    /// Notification lifetime in milliseconds.
    pub notification_ttl_ms: u64,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Transient-failure retries; 0 disables the retry layer.
    pub max_retries: u32,
    /// Directory for `FileStorage`; platform data dir when unset.
    pub storage_dir: Option<PathBuf>,
    /// Directory for rolling log files; console only when unset.
    pub log_dir: Option<PathBuf>,
    /// Default level when `RUST_LOG` is not set.
    pub log_level: String,
}

impl Default for VoteConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            fetch_limit: 10,
            notification_ttl_ms: 5_000,
            request_timeout_secs: 15,
            max_retries: 0,
            storage_dir: None,
            log_dir: None,
            log_level: "info".to_string(),
        }
    }
}

impl VoteConfig {
    /// Store tunables derived from this config.
    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            fetch_limit: self.fetch_limit,
            notification_ttl: Duration::from_millis(self.notification_ttl_ms),
        }
    }

    /// File storage at `storage_dir`, or the platform default location.
    pub fn file_storage(&self) -> FileStorage {
        match &self.storage_dir {
            Some(dir) => FileStorage::new(dir),
            None => FileStorage::default_location(),
        }
    }

    // Apply overrides from a variable lookup; `lookup` is `env::var` in
    // production and a map in tests.
    fn apply_env<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |suffix: &str| {
            let name = format!("{}{}", ENV_PREFIX, suffix);
            lookup(&name).map(|value| (name, value))
        };

        if let Some((_, v)) = var("API_BASE_URL") {
            self.api_base_url = v;
        }
        if let Some((_, v)) = var("API_KEY") {
            self.api_key = Some(v);
        }
        if let Some((name, v)) = var("FETCH_LIMIT") {
            self.fetch_limit = parse_number(name, v)?;
        }
        if let Some((name, v)) = var("NOTIFICATION_TTL_MS") {
            self.notification_ttl_ms = parse_number(name, v)?;
        }
        if let Some((name, v)) = var("REQUEST_TIMEOUT_SECS") {
            self.request_timeout_secs = parse_number(name, v)?;
        }
        if let Some((name, v)) = var("MAX_RETRIES") {
            self.max_retries = parse_number(name, v)?;
        }
        if let Some((_, v)) = var("STORAGE_DIR") {
            self.storage_dir = Some(PathBuf::from(v));
        }
        if let Some((_, v)) = var("LOG_DIR") {
            self.log_dir = Some(PathBuf::from(v));
        }
        if let Some((_, v)) = var("LOG_LEVEL") {
            self.log_level = v;
        }
        Ok(self)
    }
}

impl fmt::Display for VoteConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "VoteConfig
    API base URL: {},
    API key: {},
    Fetch limit: {},
    Notification TTL: {} ms,
    Request timeout: {} s,
    Max retries: {},
    Storage dir: {:?},
    Log dir: {:?},
    Log level: {}
",
            self.api_base_url,
            // Never print the credential itself.
            if self.api_key.is_some() { "<set>" } else { "<none>" },
            self.fetch_limit,
            self.notification_ttl_ms,
            self.request_timeout_secs,
            self.max_retries,
            self.storage_dir,
            self.log_dir,
            self.log_level
        )
    }
}

fn parse_number<T: std::str::FromStr>(name: String, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidEnvVar { name, value })
}

fn read_file_layer(path: &Path) -> Option<VoteConfig> {
    if !path.exists() {
        tracing::info!(
            "Config file not found at {}. Using defaults and environment variables.",
            path.display()
        );
        return None;
    }
    match fs::read_to_string(path) {
        Ok(raw) => match serde_json::from_str::<VoteConfig>(&raw) {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to parse config file: {}. Falling back to other sources.", path.display());
                None
            }
        },
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read config file: {}. Falling back to other sources.", path.display());
            None
        }
    }
}

/// Loads the configuration.
///
/// Layers, later wins: built-in defaults, the JSON file at `path` (when given
/// and readable), then `.env` and `CATVOTE_*` environment variables.
pub fn load_config(path: Option<&Path>) -> Result<VoteConfig, ConfigError> {
    let config = path
        .and_then(read_file_layer)
        .unwrap_or_default();

    // A missing .env is normal.
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            tracing::warn!(error = %e, "Failed to load .env file");
        }
    }

    config.apply_env(|name| env::var(name).ok())
}

/// Same as `load_config` but reading overrides from `vars` instead of the
/// process environment.
pub fn load_config_from(
    path: Option<&Path>,
    vars: &HashMap<String, String>,
) -> Result<VoteConfig, ConfigError> {
    let config = path.and_then(read_file_layer).unwrap_or_default();
    config.apply_env(|name| vars.get(name).cloned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn defaults_match_the_service() {
        let config = load_config_from(None, &HashMap::new()).unwrap();
        assert_eq!(config, VoteConfig::default());
        assert_eq!(config.max_retries, 0);
        let options = config.store_options();
        assert_eq!(options.fetch_limit, 10);
        assert_eq!(options.notification_ttl, Duration::from_secs(5));
    }

    #[test]
    fn file_then_env_override_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catvote.json");
        fs::write(&path, r#"{"fetchLimit": 25, "apiKey": "from-file", "logLevel": "debug"}"#).unwrap();

        let config = load_config_from(
            Some(&path),
            &vars(&[("CATVOTE_API_KEY", "from-env"), ("CATVOTE_MAX_RETRIES", "2")]),
        )
        .unwrap();

        assert_eq!(config.fetch_limit, 25);
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.api_key.as_deref(), Some("from-env"));
        assert_eq!(config.max_retries, 2);
        assert_eq!(config.api_base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn unparsable_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{ nope").unwrap();
        let config = load_config_from(Some(&path), &HashMap::new()).unwrap();
        assert_eq!(config, VoteConfig::default());
    }

    #[test]
    fn bad_numeric_env_is_an_error() {
        let err = load_config_from(None, &vars(&[("CATVOTE_FETCH_LIMIT", "lots")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar { ref name, .. } if name == "CATVOTE_FETCH_LIMIT"));
    }

    #[test]
    fn display_hides_the_key() {
        let config = VoteConfig {
            api_key: Some("live_secret".into()),
            ..VoteConfig::default()
        };
        let shown = config.to_string();
        assert!(!shown.contains("live_secret"));
        assert!(shown.contains("<set>"));
    }
}
