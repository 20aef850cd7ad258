// SPDX-License-Identifier: MIT
//! Configuration: `config.yaml` (daemon options), `users.yaml` (alert
//! receivers) and `chain.<name>.yaml` (one per monitored chain), all under
//! the home directory (default `~/.valwatchd`).
//!
//! Startup validation failures abort the process; hot-reload validation
//! failures are logged and the previous state stays in effect.

pub mod chains;
pub mod users;

pub use chains::{load_chains_config, validate_chains_config, ChainConfig, ChainValidatorConfig, ChainsConfig};
pub use users::{ChatConfig, UserRecord, UsersConfig};

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

pub const CONFIG_FILE_NAME: &str = "config.yaml";
pub const USERS_FILE_NAME: &str = "users.yaml";
pub const CHAIN_FILE_PREFIX: &str = "chain.";
pub const CHAIN_FILE_SUFFIX: &str = ".yaml";
pub const DEFAULT_HOME_DIR_NAME: &str = ".valwatchd";

const MIN_HOT_RELOAD: Duration = Duration::from_secs(60);
const MIN_HEALTH_CHECK: Duration = Duration::from_secs(30);
const MIN_HEALTH_CHECK_WORKERS: usize = 5;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("{0}")]
    Invalid(String),
    #[error("incorrect permission of {path}, must be 600 or 700")]
    Permission { path: PathBuf },
}

// ─── config.yaml ──────────────────────────────────────────────────────────────

/// Durations are written as humantime literals (`"30s"`, `"5m"`, `"2h"`).
mod duration_str {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(d)?;
        humantime::parse_duration(&raw).map_err(serde::de::Error::custom)
    }
}

fn default_hot_reload() -> Duration {
    Duration::from_secs(5 * 60)
}

fn default_health_check() -> Duration {
    Duration::from_secs(5 * 60)
}

fn default_worker_count() -> usize {
    MIN_HEALTH_CHECK_WORKERS
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeneralConfig {
    /// How often the hot-reload loop re-reads config. Clamped to ≥ 1 minute.
    #[serde(rename = "hot-reload", with = "duration_str", default = "default_hot_reload")]
    pub hot_reload: Duration,
    /// Minimum age before a chain becomes due again. Clamped to ≥ 30 seconds.
    #[serde(rename = "health-check", with = "duration_str", default = "default_health_check")]
    pub health_check: Duration,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            hot_reload: default_hot_reload(),
            health_check: default_health_check(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkerConfig {
    /// Number of health-check workers. Clamped to ≥ 5.
    #[serde(rename = "health-check-count", default = "default_worker_count")]
    pub health_check_count: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            health_check_count: default_worker_count(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// EnvFilter directive, e.g. "debug" or "info,valwatchd=trace".
    #[serde(default = "default_log_level")]
    pub level: String,
    /// "text" or "json".
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

/// `{home_dir}/config.yaml`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub worker: WorkerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load and validate `config.yaml` from the home directory.
    pub fn load(home_dir: &Path) -> Result<Self, ConfigError> {
        let path = home_dir.join(CONFIG_FILE_NAME);
        if !path.exists() {
            return Err(ConfigError::Invalid(format!(
                "config file {} could not be found, run `init` first",
                path.display()
            )));
        }
        check_file_permission(&path)?;

        let raw = std::fs::read_to_string(&path)?;
        let config: AppConfig = serde_yaml::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.logging.format.as_str() {
            "text" | "json" => Ok(()),
            other => Err(ConfigError::Invalid(format!(
                "logging format must be text or json, got: {other}"
            ))),
        }
    }

    /// Hot-reload interval with the safety clamp applied.
    pub fn hot_reload_interval(&self) -> Duration {
        self.general.hot_reload.max(MIN_HOT_RELOAD)
    }

    /// Health-check interval with the safety clamp applied.
    pub fn health_check_interval(&self) -> Duration {
        self.general.health_check.max(MIN_HEALTH_CHECK)
    }

    /// Worker count with the floor applied.
    pub fn health_check_workers(&self) -> usize {
        self.worker.health_check_count.max(MIN_HEALTH_CHECK_WORKERS)
    }
}

// ─── Home directory & permissions ─────────────────────────────────────────────

/// Default home directory: `~/.valwatchd`.
pub fn default_home_dir() -> PathBuf {
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(DEFAULT_HOME_DIR_NAME);
    }
    PathBuf::from(DEFAULT_HOME_DIR_NAME)
}

/// Config files hold bot tokens; refuse to read them unless they are
/// owner-only (0600 or 0700).
#[cfg(unix)]
pub fn check_file_permission(path: &Path) -> Result<(), ConfigError> {
    use std::os::unix::fs::PermissionsExt;

    let mode = std::fs::metadata(path)?.permissions().mode() & 0o777;
    if mode != 0o600 && mode != 0o700 {
        return Err(ConfigError::Permission {
            path: path.to_path_buf(),
        });
    }
    Ok(())
}

#[cfg(not(unix))]
pub fn check_file_permission(_path: &Path) -> Result<(), ConfigError> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_config() {
        let config: AppConfig = serde_yaml::from_str(
            r#"
general:
  hot-reload: 2m
  health-check: 45s
worker:
  health-check-count: 8
logging:
  level: debug
  format: json
"#,
        )
        .unwrap();
        config.validate().unwrap();
        assert_eq!(config.hot_reload_interval(), Duration::from_secs(120));
        assert_eq!(config.health_check_interval(), Duration::from_secs(45));
        assert_eq!(config.health_check_workers(), 8);
    }

    #[test]
    fn clamps_small_intervals_and_worker_count() {
        let config: AppConfig = serde_yaml::from_str(
            r#"
general:
  hot-reload: 5s
  health-check: 1s
worker:
  health-check-count: 1
"#,
        )
        .unwrap();
        assert_eq!(config.hot_reload_interval(), Duration::from_secs(60));
        assert_eq!(config.health_check_interval(), Duration::from_secs(30));
        assert_eq!(config.health_check_workers(), 5);
    }

    #[test]
    fn defaults_apply_for_empty_config() {
        let config: AppConfig = serde_yaml::from_str("{}").unwrap();
        config.validate().unwrap();
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, "text");
        assert_eq!(config.health_check_workers(), 5);
    }

    #[test]
    fn rejects_unknown_log_format() {
        let config: AppConfig = serde_yaml::from_str(
            r#"
logging:
  format: xml
"#,
        )
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[cfg(unix)]
    #[test]
    fn rejects_world_readable_file() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "{}").unwrap();

        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();
        assert!(check_file_permission(&path).is_err());

        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600)).unwrap();
        check_file_permission(&path).unwrap();
    }
}
