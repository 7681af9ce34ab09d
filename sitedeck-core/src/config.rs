//! Per-site `sitedeck.yaml`.
//!
//! The file is user-owned and hand-editable. This module reads a handful of
//! keys (`projectID`, `network`, `epochs`, `publishDir`, `siteName`) and only
//! ever writes `projectID`; every other key survives a load/save cycle.
//!
//! Write flow matches the other side-car files: serialize → `.tmp` sibling →
//! `rename`.

use std::path::{Path, PathBuf};

use serde_yaml::{Mapping, Value};

use crate::error::{io_err, CoreError};
use crate::types::Network;

pub const CONFIG_FILE_NAME: &str = "sitedeck.yaml";

/// Scaffold default for `projectID`. Never a real object identifier.
pub const PLACEHOLDER_PROJECT_ID: &str = "YOUR_SITE_OBJECT_ID";

pub const DEFAULT_PUBLISH_DIR: &str = "public";

const KEY_PROJECT_ID: &str = "projectID";
const KEY_NETWORK: &str = "network";
const KEY_EPOCHS: &str = "epochs";
const KEY_PUBLISH_DIR: &str = "publishDir";
const KEY_SITE_NAME: &str = "siteName";

/// A loaded site config: its location plus the raw YAML mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalConfig {
    path: PathBuf,
    doc: Mapping,
}

impl LocalConfig {
    /// `<site_dir>/sitedeck.yaml`. Pure, no I/O.
    pub fn path_in(site_dir: &Path) -> PathBuf {
        site_dir.join(CONFIG_FILE_NAME)
    }

    /// Load the config at `path`.
    ///
    /// A missing file loads as an empty config bound to `path`, so the first
    /// save creates it. An empty file is also an empty mapping.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, CoreError> {
        let path = path.into();
        if !path.exists() {
            return Ok(Self::empty(path));
        }
        let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
        if contents.trim().is_empty() {
            return Ok(Self::empty(path));
        }
        let value: Value = serde_yaml::from_str(&contents).map_err(|e| CoreError::ConfigParse {
            path: path.clone(),
            source: e,
        })?;
        match value {
            Value::Mapping(doc) => Ok(Self { path, doc }),
            Value::Null => Ok(Self::empty(path)),
            _ => Err(CoreError::NotAMapping { path }),
        }
    }

    /// `load(<site_dir>/sitedeck.yaml)`.
    pub fn load_in(site_dir: &Path) -> Result<Self, CoreError> {
        Self::load(Self::path_in(site_dir))
    }

    /// An unsaved config bound to `path`.
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            doc: Mapping::new(),
        }
    }

    /// A freshly scaffolded config carrying the placeholder identifier.
    pub fn scaffold(path: impl Into<PathBuf>, site_name: &str, network: Network) -> Self {
        let mut cfg = Self::empty(path);
        cfg.set_str(KEY_SITE_NAME, site_name);
        cfg.set_str(KEY_NETWORK, network.as_str());
        cfg.doc.insert(Value::from(KEY_EPOCHS), Value::from(1u64));
        cfg.set_str(KEY_PUBLISH_DIR, DEFAULT_PUBLISH_DIR);
        cfg.set_str(KEY_PROJECT_ID, PLACEHOLDER_PROJECT_ID);
        cfg
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Raw `projectID` value, trimmed. May be empty or the placeholder.
    pub fn project_id(&self) -> &str {
        self.get_str(KEY_PROJECT_ID).unwrap_or("")
    }

    pub fn set_project_id(&mut self, object_id: &str) {
        self.set_str(KEY_PROJECT_ID, object_id);
    }

    pub fn network(&self) -> Result<Option<Network>, CoreError> {
        self.get_str(KEY_NETWORK).map(str::parse).transpose()
    }

    /// `epochs` as a positive integer; strings like `"5"` are accepted.
    pub fn epochs(&self) -> Option<u32> {
        match self.doc.get(KEY_EPOCHS)? {
            Value::Number(n) => n.as_u64().and_then(|v| u32::try_from(v).ok()),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
        .filter(|e| *e > 0)
    }

    pub fn publish_dir(&self) -> Option<&str> {
        self.get_str(KEY_PUBLISH_DIR)
    }

    pub fn site_name(&self) -> Option<&str> {
        self.get_str(KEY_SITE_NAME)
    }

    /// Atomically write the config back to its path.
    pub fn save(&self) -> Result<(), CoreError> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
        }
        let yaml = serde_yaml::to_string(&self.doc)?;
        let tmp = self.path.with_extension("yaml.tmp");
        std::fs::write(&tmp, yaml).map_err(|e| io_err(&tmp, e))?;
        if let Err(e) = std::fs::rename(&tmp, &self.path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(io_err(&self.path, e));
        }
        tracing::debug!(path = %self.path.display(), "saved site config");
        Ok(())
    }

    fn get_str(&self, key: &str) -> Option<&str> {
        self.doc
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    fn set_str(&mut self, key: &str, value: &str) {
        self.doc.insert(Value::from(key), Value::from(value));
    }
}
