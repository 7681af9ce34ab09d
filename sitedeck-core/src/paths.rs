//! Per-user data directory layout.
//!
//! ```text
//! ~/.sitedeck/
//!   ledger.db        (projects + deployment history)
//!   ledger.db-wal    (write-ahead journal, managed by SQLite)
//! ```
//!
//! Every function takes an explicit `home`; [`home`] resolves the real one
//! (honouring `SITEDECK_HOME`) and is only called at the binary edge.

use std::path::{Path, PathBuf};

use crate::error::CoreError;

pub const DATA_DIR: &str = ".sitedeck";
pub const LEDGER_FILE: &str = "ledger.db";
pub const HOME_ENV: &str = "SITEDECK_HOME";

pub fn sitedeck_root(home: &Path) -> PathBuf {
    home.join(DATA_DIR)
}

pub fn ledger_path(home: &Path) -> PathBuf {
    sitedeck_root(home).join(LEDGER_FILE)
}

/// `$SITEDECK_HOME` if set and non-empty, otherwise `dirs::home_dir()`.
pub fn home() -> Result<PathBuf, CoreError> {
    if let Some(dir) = std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir().ok_or(CoreError::HomeNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ledger_lives_under_data_dir() {
        let path = ledger_path(Path::new("/home/alice"));
        assert_eq!(path, PathBuf::from("/home/alice/.sitedeck/ledger.db"));
    }

    #[test]
    fn home_not_found_error_message() {
        assert!(CoreError::HomeNotFound.to_string().contains("home directory"));
    }
}
