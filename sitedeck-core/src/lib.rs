//! sitedeck core library: domain types, side-car files, identity and cost math.
//!
//! Public API surface:
//! - [`types`]: projects, deployment records, networks, statuses
//! - [`error`]: [`CoreError`]
//! - [`paths`]: per-user data directory layout
//! - [`config`]: the per-site `sitedeck.yaml` file
//! - [`manifest`]: the `ws-resources.json` side-car inside build output
//! - [`identity`]: create-vs-update resolution
//! - [`epochs`]: epoch durations, expiry rendering, timestamp parsing
//! - [`cost`]: fee estimation

pub mod config;
pub mod cost;
pub mod epochs;
pub mod error;
pub mod identity;
pub mod manifest;
pub mod paths;
pub mod types;

pub use config::{LocalConfig, CONFIG_FILE_NAME, PLACEHOLDER_PROJECT_ID};
pub use cost::{CostBreakdown, TokenRange};
pub use error::CoreError;
pub use identity::{resolve_object_id, IdentitySource, Resolution};
pub use manifest::{ManifestUpdate, MetadataUpdate, ResourceManifest, SiteMetadata, MANIFEST_FILE_NAME};
pub use types::{
    DeploymentRecord, EpochInfo, NewDeployment, NewProject, Network, Project, ProjectStats,
    ProjectStatus,
};
