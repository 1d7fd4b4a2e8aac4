//! Daemon configuration, read from the environment.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::engine::{DurationBasis, EngineConfig};

pub const STORE_PATH_VAR: &str = "GEDDER_STORE_PATH";
pub const API_BIND_VAR: &str = "GEDDER_API_BIND";
pub const DIRECTIONS_API_KEY_VAR: &str = "GEDDER_DIRECTIONS_API_KEY";
pub const DIRECTIONS_URL_VAR: &str = "GEDDER_DIRECTIONS_URL";
pub const PROVIDER_TIMEOUT_VAR: &str = "GEDDER_PROVIDER_TIMEOUT_SECS";
pub const DURATION_BASIS_VAR: &str = "GEDDER_DURATION_BASIS";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{var}={value:?} is invalid: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct Config {
    /// JSON document holding every alarm record.
    pub store_path: PathBuf,

    /// Address the HTTP API listens on.
    pub api_bind: SocketAddr,

    pub directions_api_key: String,

    /// Replaces the public directions endpoint, for testing against a
    /// local stand-in.
    pub directions_url: Option<String>,

    pub engine: EngineConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from("gedder-alarms.json"),
            api_bind: SocketAddr::from(([127, 0, 0, 1], 7786)),
            directions_api_key: String::new(),
            directions_url: None,
            engine: EngineConfig::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from any variable source; unset variables keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(path) = lookup(STORE_PATH_VAR) {
            config.store_path = PathBuf::from(path);
        }
        if let Some(bind) = lookup(API_BIND_VAR) {
            config.api_bind = parse(API_BIND_VAR, bind)?;
        }
        config.directions_api_key = lookup(DIRECTIONS_API_KEY_VAR)
            .filter(|key| !key.is_empty())
            .ok_or(ConfigError::Missing(DIRECTIONS_API_KEY_VAR))?;
        config.directions_url = lookup(DIRECTIONS_URL_VAR);
        if let Some(secs) = lookup(PROVIDER_TIMEOUT_VAR) {
            let secs: u64 = parse(PROVIDER_TIMEOUT_VAR, secs)?;
            config.engine.provider_timeout = Duration::from_secs(secs.max(1));
        }
        if let Some(basis) = lookup(DURATION_BASIS_VAR) {
            config.engine.duration_basis = parse::<DurationBasis>(DURATION_BASIS_VAR, basis)?;
        }

        Ok(config)
    }
}

fn parse<T>(var: &'static str, value: String) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e: T::Err| ConfigError::Invalid {
        var,
        reason: e.to_string(),
        value,
    })
}
