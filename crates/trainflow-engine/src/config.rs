//! Configuration management

use serde::{Deserialize, Serialize};

use crate::services::snapshot::SnapshotStrategy;
use crate::services::versioning::DEFAULT_MAX_WRITE_ATTEMPTS;

// ============================================================================
// Storage Configuration Constants
// ============================================================================

/// Default database URL for local development.
pub const DEFAULT_DATABASE_URL: &str = "postgresql://localhost/trainflow";

/// Default maximum database connections in the pool.
pub const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 10;

/// Default minimum database connections in the pool.
pub const DEFAULT_DATABASE_MIN_CONNECTIONS: u32 = 2;

/// Default database connection timeout in seconds.
pub const DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default database idle timeout in seconds (10 minutes).
pub const DEFAULT_DATABASE_IDLE_TIMEOUT_SECS: u64 = 600;

// ============================================================================
// Versioning Configuration Constants
// ============================================================================

/// Default days budgeted per flow step when estimating a due date.
pub const DEFAULT_DAYS_PER_STEP: u32 = 2;

/// Default lower bound on the time allowed to complete a flow.
pub const DEFAULT_MIN_COMPLETION_DAYS: u32 = 7;

/// Which repository implementation backs the engine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Memory,
    Postgres,
}

impl std::str::FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" | "in-memory" => Ok(StoreBackend::Memory),
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            _ => Err(anyhow::anyhow!("Invalid store backend: {}", s)),
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub store: StoreBackend,
    pub database: DatabaseConfig,
    pub versioning: VersioningConfig,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    pub idle_timeout_secs: u64,
}

/// Versioning, snapshot and scheduling behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersioningConfig {
    pub snapshot_strategy: SnapshotStrategy,
    /// Attempts for version-number allocation and draft writes
    pub max_write_attempts: u32,
    pub days_per_step: u32,
    pub min_completion_days: u32,
}

impl Default for VersioningConfig {
    fn default() -> Self {
        Self {
            snapshot_strategy: SnapshotStrategy::Reference,
            max_write_attempts: DEFAULT_MAX_WRITE_ATTEMPTS,
            days_per_step: DEFAULT_DAYS_PER_STEP,
            min_completion_days: DEFAULT_MIN_COMPLETION_DAYS,
        }
    }
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Config {
            store: match std::env::var("TRAINFLOW_STORE") {
                Ok(value) => value.parse()?,
                Err(_) => StoreBackend::default(),
            },
            database: DatabaseConfig {
                url: std::env::var("DATABASE_URL")
                    .unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string()),
                max_connections: std::env::var("DATABASE_MAX_CONNECTIONS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_DATABASE_MAX_CONNECTIONS),
                min_connections: std::env::var("DATABASE_MIN_CONNECTIONS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_DATABASE_MIN_CONNECTIONS),
                connect_timeout_secs: std::env::var("DATABASE_CONNECT_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS),
                idle_timeout_secs: std::env::var("DATABASE_IDLE_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_DATABASE_IDLE_TIMEOUT_SECS),
            },
            versioning: VersioningConfig {
                snapshot_strategy: match std::env::var("TRAINFLOW_SNAPSHOT_STRATEGY") {
                    Ok(value) => value.parse()?,
                    Err(_) => SnapshotStrategy::default(),
                },
                max_write_attempts: std::env::var("TRAINFLOW_CREATE_RETRIES")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_MAX_WRITE_ATTEMPTS),
                days_per_step: std::env::var("TRAINFLOW_DAYS_PER_STEP")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_DAYS_PER_STEP),
                min_completion_days: std::env::var("TRAINFLOW_MIN_COMPLETION_DAYS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_MIN_COMPLETION_DAYS),
            },
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.store == StoreBackend::Postgres && self.database.url.is_empty() {
            anyhow::bail!("Database URL cannot be empty when TRAINFLOW_STORE=postgres");
        }

        if self.database.max_connections == 0 {
            anyhow::bail!("Database max_connections must be greater than 0");
        }

        if self.database.min_connections > self.database.max_connections {
            anyhow::bail!(
                "Database min_connections ({}) cannot be greater than max_connections ({})",
                self.database.min_connections,
                self.database.max_connections
            );
        }

        if self.versioning.max_write_attempts == 0 {
            anyhow::bail!("TRAINFLOW_CREATE_RETRIES must be at least 1");
        }

        if self.versioning.days_per_step == 0 && self.versioning.min_completion_days == 0 {
            anyhow::bail!("Completion estimate would always be the assignment time itself");
        }

        if self.store == StoreBackend::Memory {
            tracing::warn!("Using in-memory store - data is lost when the process exits");
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store: StoreBackend::Memory,
            database: DatabaseConfig {
                url: DEFAULT_DATABASE_URL.to_string(),
                max_connections: DEFAULT_DATABASE_MAX_CONNECTIONS,
                min_connections: DEFAULT_DATABASE_MIN_CONNECTIONS,
                connect_timeout_secs: DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS,
                idle_timeout_secs: DEFAULT_DATABASE_IDLE_TIMEOUT_SECS,
            },
            versioning: VersioningConfig::default(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: &[&str] = &[
        "TRAINFLOW_STORE",
        "TRAINFLOW_SNAPSHOT_STRATEGY",
        "TRAINFLOW_CREATE_RETRIES",
        "TRAINFLOW_DAYS_PER_STEP",
        "TRAINFLOW_MIN_COMPLETION_DAYS",
        "DATABASE_MAX_CONNECTIONS",
        "DATABASE_MIN_CONNECTIONS",
    ];

    fn clear_env() {
        for var in VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.store, StoreBackend::Memory);
        assert_eq!(config.versioning.snapshot_strategy, SnapshotStrategy::Reference);
    }

    #[test]
    fn test_validate_rejects_inverted_pool_bounds() {
        let mut config = Config::default();
        config.database.min_connections = 20;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_attempts() {
        let mut config = Config::default();
        config.versioning.max_write_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    #[serial]
    fn test_load_reads_environment() {
        clear_env();
        std::env::set_var("TRAINFLOW_STORE", "postgres");
        std::env::set_var("TRAINFLOW_SNAPSHOT_STRATEGY", "materialized");
        std::env::set_var("TRAINFLOW_CREATE_RETRIES", "5");
        std::env::set_var("TRAINFLOW_DAYS_PER_STEP", "not-a-number");

        let config = Config::load().unwrap();
        assert_eq!(config.store, StoreBackend::Postgres);
        assert_eq!(config.versioning.snapshot_strategy, SnapshotStrategy::Materialized);
        assert_eq!(config.versioning.max_write_attempts, 5);
        assert_eq!(config.versioning.days_per_step, DEFAULT_DAYS_PER_STEP);
        clear_env();
    }

    #[test]
    #[serial]
    fn test_load_rejects_unknown_backend() {
        clear_env();
        std::env::set_var("TRAINFLOW_STORE", "sqlite");
        assert!(Config::load().is_err());
        clear_env();
    }
}
