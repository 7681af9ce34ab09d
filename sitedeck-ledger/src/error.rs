//! Error types for sitedeck-ledger.

use std::path::PathBuf;

use thiserror::Error;

use sitedeck_core::CoreError;

/// All errors that can arise from ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Any SQLite failure outside of migrations.
    #[error("ledger database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A schema migration failed; the ledger is unusable until it succeeds.
    #[error("ledger migration {version} ({name}) failed: {source}")]
    Migration {
        version: i64,
        name: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    /// I/O failure, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Errors from core helpers (home resolution, enum parsing).
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("project {id} not found")]
    NotFound { id: i64 },

    #[error("invalid project name '{name}': {reason}")]
    InvalidName { name: String, reason: &'static str },

    #[error("invalid category '{category}': {reason}")]
    InvalidCategory {
        category: String,
        reason: &'static str,
    },

    /// A status change or field combination that would break the draft rules.
    #[error("project {id}: {reason}")]
    InvalidTransition { id: i64, reason: &'static str },

    #[error("site path {path} is already tracked by project {existing_id}")]
    DuplicateSitePath { path: PathBuf, existing_id: i64 },

    /// Refused to remove a site folder that looks like a system location.
    #[error("refusing to delete site folder {path}: {reason}")]
    UnsafeFolder { path: PathBuf, reason: &'static str },

    #[error("ledger connection lock poisoned")]
    LockPoisoned,
}

impl LedgerError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, LedgerError::NotFound { .. })
    }

    /// `true` for errors raised before any side effect because the input was bad.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            LedgerError::InvalidName { .. }
                | LedgerError::InvalidCategory { .. }
                | LedgerError::InvalidTransition { .. }
                | LedgerError::DuplicateSitePath { .. }
                | LedgerError::Core(CoreError::InvalidStatus(_))
                | LedgerError::Core(CoreError::InvalidNetwork(_))
        )
    }
}

/// Convenience constructor for [`LedgerError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> LedgerError {
    LedgerError::Io {
        path: path.into(),
        source,
    }
}
