//! Domain types for the sitedeck ledger.
//!
//! All path fields use `PathBuf`; timestamps are `DateTime<Utc>`.
//! All types are serializable via serde so the CLI can emit them as JSON.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::epochs;
use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// The storage network a site is published to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Testnet,
    Mainnet,
}

impl Network {
    pub const ALL: [Network; 2] = [Network::Testnet, Network::Mainnet];

    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Testnet => "testnet",
            Network::Mainnet => "mainnet",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "testnet" => Ok(Network::Testnet),
            "mainnet" => Ok(Network::Mainnet),
            other => Err(CoreError::InvalidNetwork(other.to_string())),
        }
    }
}

/// Lifecycle state of a tracked project. The set is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    /// Scaffolded locally, never deployed.
    #[default]
    Draft,
    Active,
    Archived,
}

impl ProjectStatus {
    pub const ALL: [ProjectStatus; 3] = [
        ProjectStatus::Draft,
        ProjectStatus::Active,
        ProjectStatus::Archived,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Draft => "draft",
            ProjectStatus::Active => "active",
            ProjectStatus::Archived => "archived",
        }
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProjectStatus {
    type Err = CoreError;

    /// Exact, case-sensitive match against the closed set.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(ProjectStatus::Draft),
            "active" => Ok(ProjectStatus::Active),
            "archived" => Ok(ProjectStatus::Archived),
            other => Err(CoreError::InvalidStatus(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Domain structs
// ---------------------------------------------------------------------------

/// One locally tracked site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    pub name: String,
    pub category: String,
    pub network: Network,
    /// Identifier on the storage network; empty until the first publish.
    pub object_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suins: Option<String>,
    pub wallet_address: String,
    /// Epochs requested on the last deployment.
    pub epochs: u32,
    pub gas_fee: String,
    /// Absolute path to the site root on disk.
    pub site_path: PathBuf,
    pub description: String,
    pub image_url: String,
    pub status: ProjectStatus,
    pub deploy_count: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_deploy_at: Option<DateTime<Utc>>,
}

impl Project {
    pub fn is_draft(&self) -> bool {
        self.status == ProjectStatus::Draft
    }
}

/// Input for creating a project row.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NewProject {
    pub name: String,
    pub category: String,
    pub network: Network,
    pub object_id: String,
    pub suins: Option<String>,
    pub wallet_address: String,
    pub epochs: u32,
    pub gas_fee: String,
    pub site_path: PathBuf,
    pub description: String,
    pub image_url: String,
    pub status: ProjectStatus,
}

/// Append-only history entry, owned by exactly one [`Project`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentRecord {
    pub id: i64,
    pub project_id: i64,
    pub object_id: String,
    pub network: Network,
    pub epochs: u32,
    pub gas_fee: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub notes: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Input for recording a deployment attempt.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NewDeployment {
    pub project_id: i64,
    pub object_id: String,
    pub network: Network,
    pub epochs: u32,
    pub gas_fee: String,
    pub version: Option<String>,
    pub notes: String,
    pub success: bool,
    pub error: Option<String>,
}

/// Aggregate counters across the whole ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ProjectStats {
    pub total_projects: u64,
    pub draft: u64,
    pub active: u64,
    pub archived: u64,
    pub testnet: u64,
    pub mainnet: u64,
    pub total_deployments: u64,
    pub successful_deployments: u64,
}

/// Storage time purchased for a project across its successful deployments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EpochInfo {
    pub project_id: i64,
    pub network: Network,
    pub total_epochs: u64,
    pub deployment_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_deploy_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_deploy_at: Option<DateTime<Utc>>,
}

impl EpochInfo {
    /// First successful deployment plus every purchased epoch.
    pub fn estimated_expiry(&self) -> Option<DateTime<Utc>> {
        let start = self.first_deploy_at?;
        Some(start + epochs::total_duration(self.network, self.total_epochs))
    }

    /// Human-readable storage time, e.g. `"2 weeks, 3 days"`.
    pub fn storage_duration(&self) -> String {
        epochs::format_epoch_duration(self.network, self.total_epochs)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
