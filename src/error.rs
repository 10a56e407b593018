use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Phase of an invocation in which a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Configuration,
    Session,
    Staging,
    Migration,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Phase::Configuration => "configuration",
            Phase::Session => "session",
            Phase::Staging => "staging",
            Phase::Migration => "migration",
        };
        f.write_str(label)
    }
}

/// Errors returned from a single migration invocation.
#[derive(Error, Debug)]
pub enum MigrationError {
    #[error("Invalid invocation: {0}")]
    Configuration(String),

    #[error("Failed to create object store session: {0:#}")]
    Session(#[source] anyhow::Error),

    #[error("Failed to stage migrations: {0}")]
    Staging(#[from] StagingError),

    #[error("Failed to apply migrations: {0:#}")]
    Engine(#[source] anyhow::Error),
}

impl MigrationError {
    pub fn phase(&self) -> Phase {
        match self {
            MigrationError::Configuration(_) => Phase::Configuration,
            MigrationError::Session(_) => Phase::Session,
            MigrationError::Staging(_) => Phase::Staging,
            MigrationError::Engine(_) => Phase::Migration,
        }
    }
}

/// Failures of the staging pass. Any of these aborts the whole pass.
#[derive(Error, Debug)]
pub enum StagingError {
    /// Listing a page or fetching an object failed.
    #[error("{context}: {source:#}")]
    Transport {
        context: String,
        #[source]
        source: anyhow::Error,
    },

    /// Creating the staging directory or writing a file failed.
    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Objects '{first_key}' and '{second_key}' both stage as '{name}'")]
    DuplicateFileName {
        name: String,
        first_key: String,
        second_key: String,
    },

    #[error("Object key '{key}' does not map to a usable file name")]
    InvalidKey { key: String },
}

impl StagingError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StagingError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn transport(context: impl Into<String>, source: anyhow::Error) -> Self {
        StagingError::Transport {
            context: context.into(),
            source,
        }
    }
}
