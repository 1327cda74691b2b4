//! Error types for the credential pool.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur when reading, writing, or mutating the pool.
#[derive(Debug, Error)]
pub enum PoolError {
    /// The pool file could not be read or written.
    #[error("pool file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The pool file exists but does not contain a valid pool document.
    #[error("malformed pool file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The pool could not be serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Another writer saved the pool since it was loaded.
    #[error("pool version conflict: expected {expected}, found {actual}")]
    Conflict { expected: u64, actual: u64 },

    /// Compare-and-swap kept losing to concurrent writers.
    #[error("gave up after {attempts} conflicting attempts to update the pool")]
    Contended { attempts: u32 },

    /// Every credential is checked out.
    #[error("no free credential in a pool of {size}")]
    Exhausted { size: usize },

    /// The owning file already holds a credential.
    #[error("{spec} already holds credential {username}")]
    AlreadyCheckedOut { spec: String, username: String },

    /// No record carries the given username.
    #[error("unknown pool user: {0}")]
    UnknownUser(String),

    /// A required credential variable is unset or empty.
    #[error("missing credential variable: {0}")]
    MissingVariable(String),

    /// Two generated records share a username.
    #[error("duplicate username in pool: {0}")]
    DuplicateUsername(String),

    /// Pools must hold at least one credential.
    #[error("invalid pool size: {0}")]
    InvalidCount(usize),
}

impl PoolError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether retrying against a fresh load could succeed.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}
