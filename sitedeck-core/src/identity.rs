//! Create-vs-update resolution.
//!
//! Precedence, first match wins:
//! 1. `force_new` → fresh publish, every cached identifier ignored
//! 2. site config `projectID` (non-empty, not the placeholder) → update
//! 3. manifest `object_id` (non-empty) → update
//! 4. fresh publish
//!
//! The config is hand-edited intent and beats the build-regenerated manifest.

use std::fmt;

use serde::Serialize;

use crate::config::PLACEHOLDER_PROJECT_ID;

/// Which input decided the resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentitySource {
    Forced,
    Config,
    Manifest,
    Fresh,
}

impl fmt::Display for IdentitySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentitySource::Forced => write!(f, "force-new"),
            IdentitySource::Config => write!(f, "site config"),
            IdentitySource::Manifest => write!(f, "resource manifest"),
            IdentitySource::Fresh => write!(f, "none"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    /// Identifier to extend; empty for a fresh publish.
    pub object_id: String,
    pub is_update: bool,
    pub source: IdentitySource,
}

impl Resolution {
    fn fresh(source: IdentitySource) -> Self {
        Self {
            object_id: String::new(),
            is_update: false,
            source,
        }
    }

    fn update(object_id: &str, source: IdentitySource) -> Self {
        Self {
            object_id: object_id.to_string(),
            is_update: true,
            source,
        }
    }
}

/// `true` when `id` could name a real on-network object.
pub fn is_real_object_id(id: &str) -> bool {
    let id = id.trim();
    !id.is_empty() && id != PLACEHOLDER_PROJECT_ID
}

pub fn resolve_object_id(config_id: &str, manifest_id: &str, force_new: bool) -> Resolution {
    if force_new {
        return Resolution::fresh(IdentitySource::Forced);
    }
    if is_real_object_id(config_id) {
        return Resolution::update(config_id.trim(), IdentitySource::Config);
    }
    let manifest_id = manifest_id.trim();
    if !manifest_id.is_empty() {
        return Resolution::update(manifest_id, IdentitySource::Manifest);
    }
    Resolution::fresh(IdentitySource::Fresh)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("", "", false, "", false, IdentitySource::Fresh)]
    #[case("0xcfg", "", false, "0xcfg", true, IdentitySource::Config)]
    #[case("", "0xman", false, "0xman", true, IdentitySource::Manifest)]
    #[case("0xcfg", "0xman", false, "0xcfg", true, IdentitySource::Config)]
    #[case("", "", true, "", false, IdentitySource::Forced)]
    #[case("0xcfg", "", true, "", false, IdentitySource::Forced)]
    #[case("", "0xman", true, "", false, IdentitySource::Forced)]
    #[case("0xcfg", "0xman", true, "", false, IdentitySource::Forced)]
    fn precedence_table(
        #[case] config_id: &str,
        #[case] manifest_id: &str,
        #[case] force_new: bool,
        #[case] want_id: &str,
        #[case] want_update: bool,
        #[case] want_source: IdentitySource,
    ) {
        let r = resolve_object_id(config_id, manifest_id, force_new);
        assert_eq!(r.object_id, want_id);
        assert_eq!(r.is_update, want_update);
        assert_eq!(r.source, want_source);
    }

    #[rstest]
    #[case("", false, "")]
    #[case("0xman", true, "0xman")]
    fn placeholder_is_never_an_identifier(
        #[case] manifest_id: &str,
        #[case] want_update: bool,
        #[case] want_id: &str,
    ) {
        let r = resolve_object_id(PLACEHOLDER_PROJECT_ID, manifest_id, false);
        assert_eq!(r.is_update, want_update);
        assert_eq!(r.object_id, want_id);
        assert_ne!(r.source, IdentitySource::Config);
    }

    #[test]
    fn whitespace_only_ids_are_absent() {
        let r = resolve_object_id("   ", "\t", false);
        assert_eq!(r, Resolution::fresh(IdentitySource::Fresh));
    }
}
