use thiserror::Error;

use crate::domain::error::MarketError;

/// Configuration-related errors with structured variants.
///
/// These are raised while a simulation is being assembled. None of them is
/// recoverable: a run must not start from a misconfigured experiment.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("conflicting options: {first} and {second} cannot both be set")]
    Conflict {
        first: &'static str,
        second: &'static str,
    },

    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Market(#[from] MarketError),

    #[error("JSON encoding error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
