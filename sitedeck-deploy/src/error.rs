//! Error types for sitedeck-deploy.

use std::path::PathBuf;

use thiserror::Error;

use sitedeck_core::CoreError;
use sitedeck_ledger::LedgerError;

/// Failures reported by a [`Deployer`](crate::Deployer) implementation.
#[derive(Debug, Error)]
pub enum DeployerError {
    /// The deployer executable could not be started.
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The deployer ran and exited non-zero.
    #[error("{operation} failed ({status}): {stderr}")]
    Failed {
        operation: &'static str,
        status: String,
        stderr: String,
    },

    /// The deployer returned normally but reported `success: false`.
    #[error("{operation} reported failure")]
    Unsuccessful { operation: &'static str },

    #[error("{0}")]
    Other(String),
}

/// All errors that can arise from orchestration.
#[derive(Debug, Error)]
pub enum DeployError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Collaborator failures are passed through untouched.
    #[error(transparent)]
    Deployer(#[from] DeployerError),

    /// The deployer claimed success without naming the site object.
    #[error("{operation} succeeded but returned no object id")]
    EmptyObjectId { operation: &'static str },

    #[error("publish directory {path} does not exist or is not a directory")]
    PublishDirMissing { path: PathBuf },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience constructor for [`DeployError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> DeployError {
    DeployError::Io {
        path: path.into(),
        source,
    }
}
