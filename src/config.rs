//! Configuration handling for the connection lifecycle facade.
//!
//! Pool sizing and lifecycle policy are plain structs usable from library code;
//! `Config` adds the CLI/environment surface used by the binary.

use crate::models::{BindValue, ConnectInfo, OutFormat};
use clap::{Parser, ValueEnum};

pub const DEFAULT_STATEMENT_TIMEOUT_SECS: u64 = 30;

// Pool configuration defaults
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;
pub const DEFAULT_MAX_CONNECTIONS_SQLITE: u32 = 1;
pub const DEFAULT_MIN_CONNECTIONS: u32 = 1;
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 600;
pub const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 30;

/// Connection pool sizing options handed to the driver at pool creation.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PoolOptions {
    /// Maximum connections in pool (default: 10, or 1 for SQLite)
    pub max_connections: Option<u32>,
    /// Minimum connections in pool (default: 1)
    pub min_connections: Option<u32>,
    /// Idle timeout in seconds (default: 600)
    pub idle_timeout_secs: Option<u64>,
    /// Connection acquire timeout in seconds (default: 30)
    pub acquire_timeout_secs: Option<u64>,
    /// Whether to test connections before use (default: true)
    pub test_before_acquire: Option<bool>,
}

impl PoolOptions {
    /// Get max_connections with default value based on database type.
    pub fn max_connections_or_default(&self, is_sqlite: bool) -> u32 {
        self.max_connections.unwrap_or(if is_sqlite {
            DEFAULT_MAX_CONNECTIONS_SQLITE
        } else {
            DEFAULT_MAX_CONNECTIONS
        })
    }

    /// Get min_connections with default value.
    pub fn min_connections_or_default(&self) -> u32 {
        self.min_connections.unwrap_or(DEFAULT_MIN_CONNECTIONS)
    }

    /// Get idle_timeout with default value.
    pub fn idle_timeout_or_default(&self) -> u64 {
        self.idle_timeout_secs.unwrap_or(DEFAULT_IDLE_TIMEOUT_SECS)
    }

    /// Get acquire_timeout with default value.
    pub fn acquire_timeout_or_default(&self) -> u64 {
        self.acquire_timeout_secs
            .unwrap_or(DEFAULT_ACQUIRE_TIMEOUT_SECS)
    }

    /// Get test_before_acquire with default value.
    pub fn test_before_acquire_or_default(&self) -> bool {
        self.test_before_acquire.unwrap_or(true)
    }

    /// Validate pool options and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(max) = self.max_connections {
            if max == 0 {
                return Err("max_connections must be greater than 0".to_string());
            }
        }
        if let Some(min) = self.min_connections {
            if min == 0 {
                return Err("min_connections must be greater than 0".to_string());
            }
            if let Some(max) = self.max_connections {
                if min > max {
                    return Err(format!(
                        "min_connections ({}) cannot exceed max_connections ({})",
                        min, max
                    ));
                }
            }
        }
        Ok(())
    }
}

/// What acquisition does with a connection whose buildup scripts failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum BuildupFailurePolicy {
    /// Physically release the connection before surfacing the error.
    #[default]
    Release,
    /// Legacy behavior: surface the error and drop the handle without calling
    /// the driver's release. Whatever the driver does on drop is all that happens.
    Retain,
}

impl std::fmt::Display for BuildupFailurePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Release => write!(f, "release"),
            Self::Retain => write!(f, "retain"),
        }
    }
}

/// Behavioral switches for a `Database` instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LifecycleOptions {
    pub on_buildup_failure: BuildupFailurePolicy,
}

/// Command-line configuration for the `db-lifecycle` binary.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "db-lifecycle",
    about = "Run a SQL statement through a connection with buildup/teardown scripts",
    version,
    author
)]
pub struct Config {
    /// Connection string, e.g. postgres://host:5432/app or sqlite:data.db
    #[arg(short = 'c', long, value_name = "URL", env = "DBL_CONNECT_STRING")]
    pub connect_string: String,

    /// Database user (overrides any user in the connection string)
    #[arg(short, long, env = "DBL_USER")]
    pub user: Option<String>,

    /// Database password (sensitive - never logged)
    #[arg(long, env = "DBL_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Use external authentication; user and password are ignored
    #[arg(long, env = "DBL_EXTERNAL_AUTH")]
    pub external_auth: bool,

    /// Create a connection pool instead of opening an ad-hoc connection
    #[arg(long, env = "DBL_POOL")]
    pub pool: bool,

    /// Maximum pool size
    #[arg(long, env = "DBL_POOL_MAX")]
    pub pool_max: Option<u32>,

    /// Minimum pool size
    #[arg(long, env = "DBL_POOL_MIN")]
    pub pool_min: Option<u32>,

    /// Pool acquire timeout in seconds
    #[arg(long, env = "DBL_POOL_ACQUIRE_TIMEOUT")]
    pub pool_acquire_timeout: Option<u64>,

    /// Statement run after each connection is acquired. Repeatable; runs in order.
    #[arg(long = "buildup", value_name = "SQL")]
    pub buildup: Vec<String>,

    /// Statement run before each connection is released. Repeatable; runs in order.
    #[arg(long = "teardown", value_name = "SQL")]
    pub teardown: Vec<String>,

    /// Positional bind value as JSON (e.g. 42, "text", null). Repeatable.
    #[arg(short, long = "bind", value_name = "JSON", value_parser = parse_bind_value)]
    pub binds: Vec<BindValue>,

    /// Row shape of query results
    #[arg(long, value_enum, default_value = "array", env = "DBL_OUT_FORMAT")]
    pub out_format: OutFormat,

    /// Run the statement without committing (rolled back on release)
    #[arg(long)]
    pub no_auto_commit: bool,

    /// What to do with a connection whose buildup scripts failed
    #[arg(
        long,
        value_enum,
        default_value = "release",
        env = "DBL_ON_BUILDUP_FAILURE"
    )]
    pub on_buildup_failure: BuildupFailurePolicy,

    /// Statement timeout in seconds
    #[arg(
        long,
        default_value_t = DEFAULT_STATEMENT_TIMEOUT_SECS,
        env = "DBL_STATEMENT_TIMEOUT"
    )]
    pub statement_timeout: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn", env = "DBL_LOG_LEVEL")]
    pub log_level: String,

    /// Enable JSON logging format
    #[arg(long, env = "DBL_JSON_LOGS")]
    pub json_logs: bool,

    /// SQL statement to execute
    #[arg(value_name = "SQL")]
    pub sql: String,
}

impl Config {
    /// Connect info assembled from the credential flags.
    pub fn connect_info(&self) -> ConnectInfo {
        ConnectInfo {
            user: self.user.clone(),
            password: self.password.clone(),
            connect_string: self.connect_string.clone(),
            external_auth: self.external_auth,
        }
    }

    /// Pool sizing assembled from the pool flags.
    pub fn pool_options(&self) -> PoolOptions {
        PoolOptions {
            max_connections: self.pool_max,
            min_connections: self.pool_min,
            acquire_timeout_secs: self.pool_acquire_timeout,
            ..PoolOptions::default()
        }
    }

    pub fn lifecycle_options(&self) -> LifecycleOptions {
        LifecycleOptions {
            on_buildup_failure: self.on_buildup_failure,
        }
    }
}

fn parse_bind_value(s: &str) -> Result<BindValue, String> {
    serde_json::from_str(s).map_err(|e| format!("Invalid JSON bind value '{}': {}", s, e))
}
