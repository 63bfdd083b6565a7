//! Worker configuration schema, loaded from TOML with serde.

use std::path::PathBuf;

use serde::Deserialize;

use crate::assign::MappingTable;
use crate::error::{Result, SieveError};

/// `limits.*`.
#[derive(Clone, Debug, Deserialize)]
pub struct Limits {
    /// Worker time budget, seconds. `0` means unlimited.
    #[serde(default)]
    pub time_to_live: u64,
    /// Max requests a worker handles before stopping. `0` means unlimited.
    #[serde(default)]
    pub max_files: u64,
    /// Distribution deadline, seconds (bounds processing of one File).
    pub distribution: f64,
    /// Default per-scanner deadline, seconds.
    pub scanner: u64,
    pub max_depth: u32,
}

/// `tasting.*`.
#[derive(Clone, Debug, Deserialize)]
pub struct Tasting {
    /// Path to a custom libmagic database; `None` uses the system default.
    #[serde(default)]
    pub content_type_db: Option<PathBuf>,
    /// Path to the rule directory compiled into the worker's rule set.
    #[serde(default)]
    pub rules: Option<PathBuf>,
}

/// `redis.*`, required to construct the Redis-backed adapters.
#[derive(Clone, Debug, Deserialize)]
pub struct RedisConfig {
    pub url: String,
}

/// `worker.*`.
#[derive(Clone, Debug, Deserialize)]
pub struct WorkerConfig {
    #[serde(with = "humantime_serde", default = "default_poll_interval")]
    pub poll_interval: std::time::Duration,
}

fn default_poll_interval() -> std::time::Duration {
    std::time::Duration::from_millis(250)
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval: default_poll_interval(),
        }
    }
}

/// Top-level configuration document.
#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    pub limits: Limits,
    pub tasting: Tasting,
    #[serde(default)]
    pub scanners: MappingTable,
    pub redis: RedisConfig,
    #[serde(default)]
    pub worker: WorkerConfig,
}

impl Config {
    /// Loads and parses a TOML configuration file.
    pub fn load(path: &std::path::Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        toml::from_str(&text).map_err(|e| SieveError::Config(e.to_string()))
    }
}

/// Minimal `serde_with`-style shim so `worker.poll_interval` can be written
/// as a plain TOML string (`"250ms"`) and parsed with `humantime`, matching
/// the CLI's own duration overrides.
mod humantime_serde {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_document() {
        let toml = r#"
            [limits]
            distribution = 30.0
            scanner = 10
            max_depth = 4

            [tasting]
            rules = "rules/"

            [redis]
            url = "redis://localhost:6379"

            [scanners]
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.limits.max_depth, 4);
        assert_eq!(config.worker.poll_interval, default_poll_interval());
    }
}
