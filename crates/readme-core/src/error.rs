//! Error types for readme-core

use std::path::PathBuf;

/// Result type for readme-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in readme-core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration is unusable: missing target, no enabled source, bad values
    #[error("Invalid configuration: {message}")]
    ConfigInvalid { message: String },

    /// Copy, move or hash failure on a single file
    #[error("I/O failure on {path}: {source}")]
    IoFailure {
        path: PathBuf,
        #[source]
        source: readme_fs::Error,
    },

    /// Several sources resolve to the same canonical filename
    #[error("'{canonical_filename}' is claimed by {kept} and {} other source(s)", skipped.len())]
    IdentityAmbiguous {
        canonical_filename: String,
        kept: PathBuf,
        skipped: Vec<PathBuf>,
    },

    /// Both sides changed and the policy requires a human decision
    #[error("Unresolved conflict between {source_path} and {target_path}")]
    ConflictUnresolved {
        source_path: PathBuf,
        target_path: PathBuf,
    },

    /// The identity store could not be opened or queried
    #[error("Identity store error: {message}")]
    Store { message: String },

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Filesystem error from readme-fs
    #[error(transparent)]
    Fs(#[from] readme_fs::Error),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// YAML value conversion error
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigInvalid {
            message: message.into(),
        }
    }

    pub fn io_failure(path: impl Into<PathBuf>, source: readme_fs::Error) -> Self {
        Self::IoFailure {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn sqlite(err: rusqlite::Error) -> Self {
        Self::Store {
            message: err.to_string(),
        }
    }
}
