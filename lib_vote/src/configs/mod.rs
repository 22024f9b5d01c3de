//! # Configuration Modules
//!
//! Runtime configuration for the voting client: service endpoint and
//! credential, store tunables, storage and log locations.

/// Layered configuration: defaults, JSON file, `.env`, environment.
pub mod config_vote;

pub use config_vote::{load_config, ConfigError, VoteConfig};
