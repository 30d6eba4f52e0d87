//! Server configuration.
//!
//! Loaded from environment variables; command-line flags may override a
//! few of them afterwards.

use crate::engine::JoinPolicy;
use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:3000";

pub const DEFAULT_STORAGE_DIR: &str = "./data/rooms";

pub const DEFAULT_DISPATCH_TIMEOUT_MS: u64 = 5000;

pub const DEFAULT_SWEEP_INTERVAL_SECONDS: u64 = 60;

/// Empty rooms older than this are swept (default: one hour).
pub const DEFAULT_ROOM_IDLE_SECONDS: u64 = 3600;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageBackend {
    #[default]
    Memory,
    /// One JSON record per room under `storage_dir`.
    Durable,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "memory" => Ok(Self::Memory),
            "durable" => Ok(Self::Durable),
            other => Err(format!("expected memory or durable, got {other:?}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportKind {
    #[default]
    Socket,
    EventBus,
}

impl FromStr for TransportKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "socket" => Ok(Self::Socket),
            "event-bus" => Ok(Self::EventBus),
            other => Err(format!("expected socket or event-bus, got {other:?}")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_address: String,
    pub storage_backend: StorageBackend,
    pub storage_dir: PathBuf,
    pub transport: TransportKind,
    pub join_policy: JoinPolicy,
    /// Upper bound on handling one inbound frame.
    pub dispatch_timeout: Duration,
    pub sweep_interval: Duration,
    pub room_idle: Duration,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {reason}")]
    InvalidValue { name: &'static str, reason: String },
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let storage_dir = vars
            .get("STORAGE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STORAGE_DIR));

        let dispatch_timeout = Duration::from_millis(positive(
            vars,
            "DISPATCH_TIMEOUT_MS",
            DEFAULT_DISPATCH_TIMEOUT_MS,
        )?);
        let sweep_interval = Duration::from_secs(positive(
            vars,
            "SWEEP_INTERVAL_SECONDS",
            DEFAULT_SWEEP_INTERVAL_SECONDS,
        )?);
        let room_idle = Duration::from_secs(positive(
            vars,
            "ROOM_IDLE_SECONDS",
            DEFAULT_ROOM_IDLE_SECONDS,
        )?);

        Ok(Self {
            bind_address,
            storage_backend: parsed(vars, "STORAGE_BACKEND")?,
            storage_dir,
            transport: parsed(vars, "TRANSPORT")?,
            join_policy: parsed(vars, "JOIN_POLICY")?,
            dispatch_timeout,
            sweep_interval,
            room_idle,
        })
    }
}

fn parsed<T>(vars: &HashMap<String, String>, name: &'static str) -> Result<T, ConfigError>
where
    T: FromStr<Err = String> + Default,
{
    match vars.get(name) {
        Some(raw) => raw
            .parse()
            .map_err(|reason| ConfigError::InvalidValue { name, reason }),
        None => Ok(T::default()),
    }
}

fn positive(
    vars: &HashMap<String, String>,
    name: &'static str,
    default: u64,
) -> Result<u64, ConfigError> {
    let Some(raw) = vars.get(name) else {
        return Ok(default);
    };

    let value: u64 = raw.parse().map_err(|e| ConfigError::InvalidValue {
        name,
        reason: format!("must be a valid integer, got '{}': {}", raw, e),
    })?;
    if value == 0 {
        return Err(ConfigError::InvalidValue {
            name,
            reason: "must be positive".to_string(),
        });
    }
    Ok(value)
}
