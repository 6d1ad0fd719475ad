//! Dispatcher configuration loading.
//!
//! Settings come from a TOML file and may be overridden by
//! `TASK_DISPATCHER_*` environment variables. Every section is optional and
//! falls back to its defaults.

use crate::subtask::{
    adapters::postgres::{PostgresSubTaskStore, SubTaskPgPool},
    services::EngineSettings,
};
use diesel::pg::PgConnection;
use diesel::r2d2::{ConnectionManager, Pool, PoolError};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Environment variable naming the configuration file.
pub const CONFIG_PATH_VAR: &str = "TASK_DISPATCHER_CONFIG";

/// File name used when no configuration path is given.
pub const DEFAULT_CONFIG_FILE: &str = "task-dispatcher.toml";

const DATABASE_URL_VAR: &str = "TASK_DISPATCHER_DATABASE_URL";
const POOL_SIZE_VAR: &str = "TASK_DISPATCHER_POOL_SIZE";
const LOCK_TIMEOUT_VAR: &str = "TASK_DISPATCHER_LOCK_TIMEOUT_MS";
const SERIALIZABLE_PICK_VAR: &str = "TASK_DISPATCHER_SERIALIZABLE_PICK";
const LOG_FILTER_VAR: &str = "TASK_DISPATCHER_LOG";
const LOG_JSON_VAR: &str = "TASK_DISPATCHER_LOG_JSON";

/// Top-level dispatcher configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DispatcherConfig {
    /// Database connection settings.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// State engine behaviour.
    #[serde(default)]
    pub engine: EngineConfig,

    /// Log output settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Database connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DatabaseConfig {
    /// `PostgreSQL` connection URL.
    #[serde(default)]
    pub url: Option<String>,

    /// Maximum pooled connections.
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,

    /// Longest wait for a row lock, in milliseconds.
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            pool_size: default_pool_size(),
            lock_timeout_ms: default_lock_timeout_ms(),
        }
    }
}

/// State engine behaviour.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct EngineConfig {
    /// Run pick transitions under serializable isolation.
    #[serde(default)]
    pub serializable_pick: bool,
}

/// Log output settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// `tracing-subscriber` filter directive, e.g. `info,task_dispatcher=debug`.
    #[serde(default = "default_log_filter")]
    pub filter: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            json: false,
        }
    }
}

const fn default_pool_size() -> u32 {
    8
}

const fn default_lock_timeout_ms() -> u64 {
    5_000
}

fn default_log_filter() -> String {
    "info".to_owned()
}

/// Errors raised while loading configuration or building from it.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Read {
        /// File that failed to load.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML for this schema.
    #[error("failed to parse config: {0}")]
    Parse(#[source] Box<toml::de::Error>),

    /// An environment override could not be parsed.
    #[error("invalid value {value:?} for {key}")]
    InvalidOverride {
        /// Environment variable name.
        key: String,
        /// Rejected value.
        value: String,
    },

    /// No database URL was configured.
    #[error("database url is not configured; set {DATABASE_URL_VAR} or [database].url")]
    MissingDatabaseUrl,

    /// The connection pool could not be built.
    #[error("failed to build connection pool: {0}")]
    Pool(#[from] PoolError),
}

impl DispatcherConfig {
    /// Parses configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the text does not match the
    /// schema.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|err| ConfigError::Parse(Box::new(err)))
    }

    /// Loads the file at `path`, then applies process environment overrides.
    ///
    /// A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file cannot be read or parsed, or an
    /// override is malformed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_toml_str(&contents)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        config.apply_overrides(std::env::vars())?;
        Ok(config)
    }

    /// Applies `TASK_DISPATCHER_*` overrides from `vars`; other variables
    /// are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidOverride`] when a value does not parse.
    pub fn apply_overrides<I>(&mut self, vars: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            match key.as_str() {
                DATABASE_URL_VAR => self.database.url = Some(value),
                POOL_SIZE_VAR => self.database.pool_size = parse_override(&key, &value)?,
                LOCK_TIMEOUT_VAR => self.database.lock_timeout_ms = parse_override(&key, &value)?,
                SERIALIZABLE_PICK_VAR => {
                    self.engine.serializable_pick = parse_flag(&key, &value)?;
                }
                LOG_FILTER_VAR => self.logging.filter = value,
                LOG_JSON_VAR => self.logging.json = parse_flag(&key, &value)?,
                _ => {}
            }
        }
        Ok(())
    }

    /// Returns the state engine settings.
    #[must_use]
    pub const fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            serializable_pick: self.engine.serializable_pick,
        }
    }
}

impl DatabaseConfig {
    /// Returns the row lock timeout.
    #[must_use]
    pub const fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    /// Builds a connection pool for the configured URL.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingDatabaseUrl`] when no URL is set, or
    /// [`ConfigError::Pool`] when the pool cannot connect.
    pub fn build_pool(&self) -> Result<SubTaskPgPool, ConfigError> {
        let url = self.url.as_deref().ok_or(ConfigError::MissingDatabaseUrl)?;
        let manager = ConnectionManager::<PgConnection>::new(url);
        Ok(Pool::builder().max_size(self.pool_size).build(manager)?)
    }

    /// Builds the `PostgreSQL` store with the configured lock timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the pool cannot be built.
    pub fn postgres_store(&self) -> Result<PostgresSubTaskStore, ConfigError> {
        Ok(PostgresSubTaskStore::new(self.build_pool()?).with_lock_timeout(self.lock_timeout()))
    }
}

/// Resolves the configuration file path from `vars`, falling back to
/// [`DEFAULT_CONFIG_FILE`] in the working directory.
pub fn config_path<I>(vars: I) -> PathBuf
where
    I: IntoIterator<Item = (String, String)>,
{
    vars.into_iter()
        .find(|(key, _)| key == CONFIG_PATH_VAR)
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE), |(_, value)| PathBuf::from(value))
}

fn parse_override<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidOverride {
            key: key.to_owned(),
            value: value.to_owned(),
        })
}

fn parse_flag(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidOverride {
            key: key.to_owned(),
            value: value.to_owned(),
        }),
    }
}
