//! Resource manifest: `ws-resources.json` inside the publish directory.
//!
//! The manifest is regenerated by site builds and is also the last-known-good
//! cache of the on-network object identifier. Two rules shape this module:
//!
//! 1. Reading normalizes legacy spellings once, in [`ResourceManifest::decode`]:
//!    `object_id` / `objectId`, `site_name` / `siteName` and
//!    `metadata.image_url` / `metadata.imageURL`.
//!    When both spellings are present and non-empty, snake_case wins.
//! 2. Writing is a merge at the top level of the document: every entry not
//!    named by the [`ManifestUpdate`] keeps its original JSON text, including
//!    keys this crate does not model. Key order is preserved. Only the
//!    entries being written (and `metadata`, when merged) are re-rendered.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use serde_json::{Map, Value};

use crate::error::{io_err, CoreError};

pub const MANIFEST_FILE_NAME: &str = "ws-resources.json";

pub const METADATA_PROJECT_URL: &str = "https://github.com/sitedeck/sitedeck";
pub const METADATA_CREATOR: &str = "sitedeck";
pub const METADATA_LINK: &str = "https://sitedeck.dev";

/// Path header name → value.
pub type HeaderMap = BTreeMap<String, String>;

/// Top-level manifest entries, each holding its value's source text.
type RawDocument = IndexMap<String, Box<RawValue>>;

/// Display metadata attached to the on-network site object.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct SiteMetadata {
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub category: Option<String>,
    pub project_url: Option<String>,
    pub creator: Option<String>,
    pub link: Option<String>,
}

/// Typed view over a manifest document.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceManifest {
    pub object_id: Option<String>,
    pub site_name: Option<String>,
    pub headers: BTreeMap<String, HeaderMap>,
    pub routes: BTreeMap<String, String>,
    pub ignore: Vec<String>,
    pub metadata: Option<SiteMetadata>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ManifestCompat {
    object_id: Option<String>,
    #[serde(rename = "objectId")]
    object_id_legacy: Option<String>,
    site_name: Option<String>,
    #[serde(rename = "siteName")]
    site_name_legacy: Option<String>,
    headers: BTreeMap<String, HeaderMap>,
    routes: BTreeMap<String, String>,
    ignore: Vec<String>,
    metadata: Option<MetadataCompat>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MetadataCompat {
    description: Option<String>,
    image_url: Option<String>,
    #[serde(rename = "imageURL")]
    image_url_legacy: Option<String>,
    category: Option<String>,
    project_url: Option<String>,
    creator: Option<String>,
    link: Option<String>,
}

/// Fields to merge into the manifest. `None` means "leave untouched".
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ManifestUpdate {
    pub object_id: Option<String>,
    pub site_name: Option<String>,
    pub metadata: Option<MetadataUpdate>,
}

/// Metadata fields to merge. The constant project URL / creator / link are
/// stamped whenever a metadata update is applied.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MetadataUpdate {
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub category: Option<String>,
}

impl ManifestUpdate {
    pub fn is_empty(&self) -> bool {
        self.object_id.is_none() && self.site_name.is_none() && self.metadata.is_none()
    }
}

impl ResourceManifest {
    /// `<publish_dir>/ws-resources.json`. Pure, no I/O.
    pub fn path_in(publish_dir: &Path) -> PathBuf {
        publish_dir.join(MANIFEST_FILE_NAME)
    }

    /// Load and decode the manifest. Returns `Ok(None)` when the file is absent.
    pub fn load(path: &Path) -> Result<Option<Self>, CoreError> {
        match read_document(path)? {
            Some(doc) => Ok(Some(Self::decode(path, Value::Object(doc))?)),
            None => Ok(None),
        }
    }

    /// Normalize a raw document into the typed view.
    pub fn decode(path: &Path, doc: Value) -> Result<Self, CoreError> {
        let compat: ManifestCompat =
            serde_json::from_value(doc).map_err(|e| CoreError::ManifestParse {
                path: path.to_path_buf(),
                source: e,
            })?;
        Ok(Self {
            object_id: prefer_snake(compat.object_id, compat.object_id_legacy),
            site_name: prefer_snake(compat.site_name, compat.site_name_legacy),
            headers: compat.headers,
            routes: compat.routes,
            ignore: compat.ignore,
            metadata: compat.metadata.map(|m| SiteMetadata {
                description: m.description,
                image_url: prefer_snake(m.image_url, m.image_url_legacy),
                category: m.category,
                project_url: m.project_url,
                creator: m.creator,
                link: m.link,
            }),
        })
    }

    /// Normalized object identifier, or `""` when absent.
    pub fn object_id_or_empty(&self) -> &str {
        self.object_id.as_deref().unwrap_or("")
    }
}

/// Read the object identifier from `<publish_dir>/ws-resources.json`.
///
/// A missing manifest is an empty identifier, not an error.
pub fn read_object_id(publish_dir: &Path) -> Result<String, CoreError> {
    let path = ResourceManifest::path_in(publish_dir);
    Ok(ResourceManifest::load(&path)?
        .and_then(|m| m.object_id)
        .unwrap_or_default())
}

/// Merge `update` into the manifest at `path`, creating the file if needed.
///
/// Returns `false` without touching the file when the update is empty.
pub fn apply_update(path: &Path, update: &ManifestUpdate) -> Result<bool, CoreError> {
    if update.is_empty() {
        return Ok(false);
    }
    let mut doc = read_raw_document(path)?.unwrap_or_default();

    if let Some(object_id) = &update.object_id {
        let id = Value::from(object_id.as_str());
        set_entry(&mut doc, "object_id", &id)?;
        // Keep a legacy copy consistent rather than leaving two disagreeing ids.
        if doc.contains_key("objectId") {
            set_entry(&mut doc, "objectId", &id)?;
        }
    }
    if let Some(site_name) = &update.site_name {
        let key = if doc.contains_key("siteName") && !doc.contains_key("site_name") {
            "siteName"
        } else {
            "site_name"
        };
        set_entry(&mut doc, key, &Value::from(site_name.as_str()))?;
    }
    if let Some(meta) = &update.metadata {
        let mut current = match doc.get("metadata") {
            Some(raw) => serde_json::from_str(raw.get()).map_err(|e| CoreError::ManifestParse {
                path: path.to_path_buf(),
                source: e,
            })?,
            None => Value::Object(Map::new()),
        };
        merge_metadata(&mut current, meta);
        set_entry(&mut doc, "metadata", &current)?;
    }

    write_document(path, &doc)?;
    tracing::debug!(path = %path.display(), "merged resource manifest");
    Ok(true)
}

fn merge_metadata(slot: &mut Value, update: &MetadataUpdate) {
    if !slot.is_object() {
        *slot = Value::Object(Map::new());
    }
    let Some(meta) = slot.as_object_mut() else {
        return;
    };

    if let Some(description) = &update.description {
        meta.insert("description".into(), Value::from(description.as_str()));
    }
    if let Some(image_url) = &update.image_url {
        let key = if meta.contains_key("imageURL") && !meta.contains_key("image_url") {
            "imageURL"
        } else {
            "image_url"
        };
        meta.insert(key.into(), Value::from(image_url.as_str()));
    }
    if let Some(category) = &update.category {
        meta.insert("category".into(), Value::from(category.as_str()));
    }
    meta.insert("project_url".into(), Value::from(METADATA_PROJECT_URL));
    meta.insert("creator".into(), Value::from(METADATA_CREATOR));
    meta.insert("link".into(), Value::from(METADATA_LINK));
}

fn read_document(path: &Path) -> Result<Option<Map<String, Value>>, CoreError> {
    if !path.exists() {
        return Ok(None);
    }
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    if contents.trim().is_empty() {
        return Ok(Some(Map::new()));
    }
    let value: Value = serde_json::from_str(&contents).map_err(|e| CoreError::ManifestParse {
        path: path.to_path_buf(),
        source: e,
    })?;
    match value {
        Value::Object(map) => Ok(Some(map)),
        _ => Err(CoreError::NotAMapping {
            path: path.to_path_buf(),
        }),
    }
}

/// Same shape checks as [`read_document`], keeping each top-level value as
/// the text it was written with.
fn read_raw_document(path: &Path) -> Result<Option<RawDocument>, CoreError> {
    if !path.exists() {
        return Ok(None);
    }
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    if contents.trim().is_empty() {
        return Ok(Some(RawDocument::new()));
    }
    if !contents.trim_start().starts_with('{') {
        return Err(CoreError::NotAMapping {
            path: path.to_path_buf(),
        });
    }
    serde_json::from_str(&contents)
        .map(Some)
        .map_err(|e| CoreError::ManifestParse {
            path: path.to_path_buf(),
            source: e,
        })
}

/// Replace (or append) one top-level entry, rendered at the document's
/// two-space nesting level.
fn set_entry(doc: &mut RawDocument, key: &str, value: &Value) -> Result<(), CoreError> {
    let text = serde_json::to_string_pretty(value)?.replace('\n', "\n  ");
    doc.insert(key.to_string(), RawValue::from_string(text)?);
    Ok(())
}

fn render_document(doc: &RawDocument) -> Result<String, CoreError> {
    if doc.is_empty() {
        return Ok("{}\n".to_string());
    }
    let mut out = String::from("{\n");
    for (i, (key, value)) in doc.iter().enumerate() {
        if i > 0 {
            out.push_str(",\n");
        }
        out.push_str("  ");
        out.push_str(&serde_json::to_string(key)?);
        out.push_str(": ");
        out.push_str(value.get());
    }
    out.push_str("\n}\n");
    Ok(out)
}

/// Render → `.json.tmp` sibling → rename.
fn write_document(path: &Path, doc: &RawDocument) -> Result<(), CoreError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
    }
    let json = render_document(doc)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json).map_err(|e| io_err(&tmp, e))?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(path, e));
    }
    Ok(())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn prefer_snake(snake: Option<String>, legacy: Option<String>) -> Option<String> {
    non_empty(snake).or_else(|| non_empty(legacy))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn decode(doc: Value) -> ResourceManifest {
        ResourceManifest::decode(Path::new("ws-resources.json"), doc).unwrap()
    }

    #[test]
    fn snake_case_object_id_wins() {
        let m = decode(json!({"object_id": "0xsnake", "objectId": "0xcamel"}));
        assert_eq!(m.object_id.as_deref(), Some("0xsnake"));
    }

    #[test]
    fn legacy_object_id_used_when_snake_missing_or_blank() {
        let m = decode(json!({"objectId": "0xcamel"}));
        assert_eq!(m.object_id.as_deref(), Some("0xcamel"));
        let m = decode(json!({"object_id": "  ", "objectId": "0xcamel"}));
        assert_eq!(m.object_id.as_deref(), Some("0xcamel"));
    }

    #[test]
    fn legacy_image_url_is_normalized() {
        let m = decode(json!({"metadata": {"imageURL": "https://img/a.png"}}));
        assert_eq!(
            m.metadata.unwrap().image_url.as_deref(),
            Some("https://img/a.png")
        );
    }

    #[test]
    fn missing_manifest_reads_empty_id() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(read_object_id(tmp.path()).unwrap(), "");
    }

    #[test]
    fn malformed_headers_is_parse_error() {
        let err = ResourceManifest::decode(Path::new("x.json"), json!({"headers": ["nope"]}))
            .unwrap_err();
        assert!(matches!(err, CoreError::ManifestParse { .. }));
    }

    #[test]
    fn empty_update_does_not_create_file() {
        let tmp = TempDir::new().unwrap();
        let path = ResourceManifest::path_in(tmp.path());
        assert!(!apply_update(&path, &ManifestUpdate::default()).unwrap());
        assert!(!path.exists());
    }

    #[test]
    fn update_keeps_legacy_object_id_in_sync() {
        let tmp = TempDir::new().unwrap();
        let path = ResourceManifest::path_in(tmp.path());
        std::fs::write(&path, r#"{"objectId": "0xold"}"#).unwrap();

        let update = ManifestUpdate {
            object_id: Some("0xnew".into()),
            ..Default::default()
        };
        apply_update(&path, &update).unwrap();

        let raw: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["object_id"], "0xnew");
        assert_eq!(raw["objectId"], "0xnew");
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn metadata_update_stamps_constants() {
        let tmp = TempDir::new().unwrap();
        let path = ResourceManifest::path_in(tmp.path());
        let update = ManifestUpdate {
            metadata: Some(MetadataUpdate {
                description: Some("hello".into()),
                ..Default::default()
            }),
            ..Default::default()
        };
        apply_update(&path, &update).unwrap();
        let m = ResourceManifest::load(&path).unwrap().unwrap();
        let meta = m.metadata.unwrap();
        assert_eq!(meta.description.as_deref(), Some("hello"));
        assert_eq!(meta.creator.as_deref(), Some(METADATA_CREATOR));
        assert_eq!(meta.project_url.as_deref(), Some(METADATA_PROJECT_URL));
        assert!(meta.image_url.is_none());
    }
}
