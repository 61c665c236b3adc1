//! Error types for boardsync-core.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading configuration. All of them are fatal at
/// startup: no sync phase may begin with an invalid configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required key was absent or blank.
    #[error("missing required setting {key}")]
    Missing { key: &'static str },

    /// A key was present but could not be parsed.
    #[error("invalid value for {key} ({value:?}): {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },

    /// Two board pairs share a name.
    #[error("board pair '{name}' is configured more than once")]
    DuplicatePair { name: String },

    /// The `.env` file exists but could not be read or parsed.
    #[error("failed to read env file at {path}: {source}")]
    EnvFile {
        path: PathBuf,
        #[source]
        source: dotenvy::Error,
    },

    /// Could not determine the working directory to look for `.env`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
