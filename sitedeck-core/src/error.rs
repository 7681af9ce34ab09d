//! Error types for sitedeck-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from core file handling and validation.
#[derive(Debug, Error)]
pub enum CoreError {
    /// I/O failure, with the path that was being read or written.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML parse error on load of the site config.
    #[error("failed to parse config at {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// YAML serialization error (save path).
    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON parse error on load of the resource manifest.
    #[error("failed to parse manifest at {path}: {source}")]
    ManifestParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// JSON serialization error (save path).
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// A document that must be a mapping/object at its root was something else.
    #[error("expected a mapping at the root of {path}")]
    NotAMapping { path: PathBuf },

    /// The network name is not one of `testnet`, `mainnet`.
    #[error("invalid network '{0}': expected testnet or mainnet")]
    InvalidNetwork(String),

    /// The status is not one of `draft`, `active`, `archived`.
    #[error("invalid status '{0}': expected draft, active or archived")]
    InvalidStatus(String),

    /// `dirs::home_dir()` returned `None` and `SITEDECK_HOME` is unset.
    #[error("cannot determine home directory; set $HOME or $SITEDECK_HOME")]
    HomeNotFound,
}

/// Convenience constructor for [`CoreError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> CoreError {
    CoreError::Io {
        path: path.into(),
        source,
    }
}
