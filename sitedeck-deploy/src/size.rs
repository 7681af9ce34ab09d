//! Publish-directory size walk.
//!
//! Unreadable entries are collected rather than aborting the walk, so a
//! dry run still reports everything it could measure.

use std::path::{Path, PathBuf};

use serde::Serialize;

/// Total bytes and regular-file count under a directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SiteSize {
    pub bytes: u64,
    pub files: u64,
    /// Entries that could not be read, with the reason.
    pub errors: Vec<(PathBuf, String)>,
}

/// Walk `dir` recursively. Symlinks are not followed.
pub fn site_size(dir: &Path) -> SiteSize {
    let mut size = SiteSize::default();
    let mut pending = vec![dir.to_path_buf()];

    while let Some(current) = pending.pop() {
        let entries = match std::fs::read_dir(&current) {
            Ok(entries) => entries,
            Err(e) => {
                size.errors.push((current, e.to_string()));
                continue;
            }
        };
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    size.errors.push((current.clone(), e.to_string()));
                    continue;
                }
            };
            let path = entry.path();
            match std::fs::symlink_metadata(&path) {
                Ok(meta) if meta.is_dir() => pending.push(path),
                Ok(meta) if meta.is_file() => {
                    size.bytes += meta.len();
                    size.files += 1;
                }
                Ok(_) => tracing::debug!(path = %path.display(), "skipping non-regular entry"),
                Err(e) => size.errors.push((path, e.to_string())),
            }
        }
    }
    size
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn counts_nested_files() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("css/vendor")).unwrap();
        std::fs::write(dir.path().join("index.html"), vec![b'x'; 100]).unwrap();
        std::fs::write(dir.path().join("css/site.css"), vec![b'y'; 20]).unwrap();
        std::fs::write(dir.path().join("css/vendor/reset.css"), vec![b'z'; 3]).unwrap();

        let size = site_size(dir.path());
        assert_eq!(size.bytes, 123);
        assert_eq!(size.files, 3);
        assert!(size.errors.is_empty());
    }

    #[test]
    fn missing_dir_is_reported_not_fatal() {
        let dir = TempDir::new().unwrap();
        let size = site_size(&dir.path().join("nope"));
        assert_eq!(size.files, 0);
        assert_eq!(size.errors.len(), 1);
    }

    #[test]
    fn empty_dir_is_zero() {
        let dir = TempDir::new().unwrap();
        assert_eq!(site_size(dir.path()), SiteSize::default());
    }
}
