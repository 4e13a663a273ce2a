//! Error types shared by the model and configuration layers.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while validating requests or moving runs between states.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Configuration could not be loaded or is inconsistent
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A request or value failed a model constraint
    #[error("validation error: {0}")]
    Validation(String),

    /// The run cannot move from `from` to `to`
    #[error("invalid state transition: {from} -> {to}")]
    InvalidTransition {
        /// Current state
        from: String,
        /// Requested state
        to: String,
    },
}

/// Errors raised while locating, reading or checking `config.toml`.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// No home directory to derive a config location from
    #[error("no platform config directory for jobhound")]
    NoConfigDir,

    /// An explicitly named file does not exist
    #[error("config file not found at {}", path.display())]
    NotFound {
        /// Requested location
        path: PathBuf,
    },

    /// Filesystem failure on a known path
    #[error("cannot read or write {}: {source}", path.display())]
    Io {
        /// File being accessed
        path: PathBuf,
        /// Underlying failure
        source: std::io::Error,
    },

    /// File is not valid TOML for [`AppConfig`](crate::AppConfig)
    #[error("{}: {source}", path.display())]
    Parse {
        /// File being parsed
        path: PathBuf,
        /// TOML decode failure
        source: toml::de::Error,
    },

    /// Config could not be rendered back to TOML
    #[error("cannot encode config: {0}")]
    Encode(#[from] toml::ser::Error),

    /// A field holds a value the engine cannot run with
    #[error("invalid config value for {field}: {reason}")]
    InvalidValue {
        /// Dotted field path, e.g. `scraping.max_pages`
        field: String,
        /// What is wrong with it
        reason: String,
    },
}

impl ConfigError {
    pub(crate) fn io(path: &std::path::Path) -> impl FnOnce(std::io::Error) -> Self + '_ {
        move |source| Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Result alias for model operations.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Result alias for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
