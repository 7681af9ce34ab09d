//! # sitedeck-deploy
//!
//! Publishing orchestration on top of the core types and the ledger.
//!
//! [`deploy_site`] decides between a fresh publish and an update, drives a
//! [`Deployer`], reconciles the side-car files and records the attempt.
//! [`remove_project`] is the matching teardown.

pub mod deployer;
pub mod error;
pub mod orchestrator;
pub mod removal;
pub mod size;

pub use deployer::{DeployOptions, Deployer, DeployerResult, SiteBuilderDeployer};
pub use error::{DeployError, DeployerError};
pub use orchestrator::{deploy_site, DeployFlags, DeployOutcome, DeployRequest, DEFAULT_CATEGORY, DEFAULT_PROJECT_NAME};
pub use removal::{remove_project, RemoveOptions, RemoveOutcome};
pub use size::{site_size, SiteSize};
