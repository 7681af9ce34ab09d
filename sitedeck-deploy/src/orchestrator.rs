//! Deployment orchestration.
//!
//! ## `deploy_site` steps
//!
//! 1. Measure the publish directory (errors collected, never fatal).
//! 2. Resolve identity: local config first, then the resource manifest.
//!    When the site is to be tracked, the name and category the ledger would
//!    store are validated here, before anything is published.
//! 3. Dry run stops here with a size report and an estimate.
//! 4. Call the deployer (`deploy` for a fresh object, `update` otherwise).
//! 5. Write the object id and metadata back to the manifest and config.
//!    Failures here are warnings: the network already has the site.
//! 6. Create or refresh the ledger project and record the attempt.
//!
//! A failed attempt is recorded only against a project that has already been
//! deployed; a draft stays a draft until its first success.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, warn};

use sitedeck_core::{
    cost, identity, manifest, CostBreakdown, IdentitySource, LocalConfig, ManifestUpdate,
    MetadataUpdate, Network, NewDeployment, NewProject, Project, ProjectStatus,
};
use sitedeck_ledger::{validate_category, validate_name, Ledger};

use crate::deployer::{DeployOptions, Deployer, DeployerResult};
use crate::error::{io_err, DeployError, DeployerError};
use crate::size::site_size;

pub const DEFAULT_PROJECT_NAME: &str = "my-site";
pub const DEFAULT_CATEGORY: &str = "website";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeployFlags {
    pub quiet: bool,
    pub verbose: bool,
    /// Ignore any known object id and publish a new site object.
    pub force_new: bool,
    pub dry_run: bool,
    /// Track the site in the ledger.
    pub save_project: bool,
    pub project_name: Option<String>,
    pub category: Option<String>,
    /// Overrides the network from the site config.
    pub network: Option<Network>,
    pub wallet_addr: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
}

impl DeployFlags {
    /// Quiet wins over verbose.
    pub fn effective_verbose(&self) -> bool {
        self.verbose && !self.quiet
    }
}

#[derive(Debug, Clone)]
pub struct DeployRequest {
    /// Site root; the ledger keys projects by its canonical form.
    pub site_path: PathBuf,
    /// Build output to upload. Relative paths are taken from `site_path`.
    pub publish_dir: PathBuf,
    pub epochs: u32,
    pub flags: DeployFlags,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeployOutcome {
    /// `None` for a dry run.
    pub object_id: Option<String>,
    pub is_update: bool,
    pub is_new_project: bool,
    pub identity: IdentitySource,
    pub network: Network,
    pub site_size: u64,
    pub file_count: u64,
    pub estimate: CostBreakdown,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<i64>,
    pub warnings: Vec<String>,
    pub dry_run: bool,
}

/// Publish or update a site and reconcile every local record of it.
pub fn deploy_site(
    request: &DeployRequest,
    config: &mut LocalConfig,
    deployer: &dyn Deployer,
    ledger: Option<&Ledger>,
) -> Result<DeployOutcome, DeployError> {
    let flags = &request.flags;
    let site_path = std::fs::canonicalize(&request.site_path)
        .map_err(|e| io_err(&request.site_path, e))?;
    let publish_dir = if request.publish_dir.is_absolute() {
        request.publish_dir.clone()
    } else {
        site_path.join(&request.publish_dir)
    };
    if !publish_dir.is_dir() {
        return Err(DeployError::PublishDirMissing { path: publish_dir });
    }

    let network = match flags.network {
        Some(n) => n,
        None => config.network()?.unwrap_or_default(),
    };
    let epochs = request.epochs.max(1);

    // 1. size
    let size = site_size(&publish_dir);
    let mut warnings: Vec<String> = size
        .errors
        .iter()
        .map(|(path, reason)| {
            warn!(path = %path.display(), %reason, "could not measure entry");
            format!("could not read {}: {reason}", path.display())
        })
        .collect();

    // 2. identity
    let manifest_id = manifest::read_object_id(&publish_dir)?;
    let resolution = identity::resolve_object_id(config.project_id(), &manifest_id, flags.force_new);
    info!(
        site = %site_path.display(),
        source = %resolution.source,
        object_id = %resolution.object_id,
        is_update = resolution.is_update,
        "resolved site identity"
    );

    let estimate = if resolution.is_update {
        cost::estimate_update_cost(network, size.bytes, size.files, epochs)
    } else {
        cost::estimate_detailed(network, size.bytes, size.files, epochs)
    };

    let existing = match ledger {
        Some(ledger) => ledger.get_project_by_site_path(&site_path)?,
        None => None,
    };
    if flags.save_project {
        validate_project_fields(flags, &site_path, existing.as_ref())?;
    }

    let mut outcome = DeployOutcome {
        object_id: None,
        is_update: resolution.is_update,
        is_new_project: false,
        identity: resolution.source,
        network,
        site_size: size.bytes,
        file_count: size.files,
        estimate,
        project_id: existing.as_ref().map(|p| p.id),
        warnings: Vec::new(),
        dry_run: flags.dry_run,
    };

    // 3. dry run
    if flags.dry_run {
        debug!(bytes = size.bytes, files = size.files, "dry run: skipping deployer");
        outcome.warnings = warnings;
        return Ok(outcome);
    }

    // 4. network call
    let opts = DeployOptions {
        network,
        epochs,
        verbose: flags.effective_verbose(),
    };
    let operation = if resolution.is_update { "update" } else { "publish" };
    let called = if resolution.is_update {
        deployer.update(&publish_dir, &resolution.object_id, &opts)
    } else {
        deployer.deploy(&publish_dir, &opts)
    };
    let object_id = match checked(called, operation) {
        Ok(object_id) => object_id,
        Err(err) => {
            match (ledger, &existing) {
                (Some(ledger), Some(project)) if flags.save_project && !project.is_draft() => {
                    record_failure(ledger, project, &resolution.object_id, &opts, &err);
                }
                (_, Some(project)) if project.is_draft() => {
                    debug!(project_id = project.id, "draft not charged with a failed attempt");
                }
                _ => {}
            }
            return Err(err);
        }
    };
    info!(%object_id, operation, "deployer finished");

    // 5. side-car files
    let update = ManifestUpdate {
        object_id: Some(object_id.clone()),
        site_name: flags.project_name.clone(),
        metadata: metadata_update(flags),
    };
    let manifest_path = manifest::ResourceManifest::path_in(&publish_dir);
    if let Err(e) = manifest::apply_update(&manifest_path, &update) {
        warn!(error = %e, "resource manifest not updated");
        warnings.push(format!("resource manifest not updated: {e}"));
    }
    if config.project_id() != object_id {
        config.set_project_id(&object_id);
        if let Err(e) = config.save() {
            warn!(error = %e, "site config not updated");
            warnings.push(format!("site config not updated: {e}"));
        }
    }

    // 6. ledger
    if let (Some(ledger), true) = (ledger, flags.save_project) {
        let project = match existing {
            Some(project) => refresh_project(ledger, project, flags)?,
            None => {
                outcome.is_new_project = true;
                ledger.create_project(&NewProject {
                    name: project_name(flags, &site_path),
                    category: category(flags).to_string(),
                    network,
                    wallet_address: flags.wallet_addr.clone().unwrap_or_default(),
                    site_path: site_path.clone(),
                    description: flags.description.clone().unwrap_or_default(),
                    image_url: flags.image_url.clone().unwrap_or_default(),
                    status: ProjectStatus::Draft,
                    ..NewProject::default()
                })?
            }
        };
        ledger.record_deployment(&NewDeployment {
            project_id: project.id,
            object_id: object_id.clone(),
            network,
            epochs,
            gas_fee: outcome.estimate.summary(),
            notes: operation.to_string(),
            success: true,
            ..NewDeployment::default()
        })?;
        outcome.project_id = Some(project.id);
    }

    outcome.object_id = Some(object_id);
    outcome.warnings = warnings;
    Ok(outcome)
}

/// Last path segment of the site, or [`DEFAULT_PROJECT_NAME`].
pub fn default_project_name(site_path: &Path) -> String {
    site_path
        .file_name()
        .map(|n| n.to_string_lossy().trim().to_string())
        .filter(|n| !n.is_empty() && n != "." && n != "/")
        .unwrap_or_else(|| DEFAULT_PROJECT_NAME.to_string())
}

fn project_name(flags: &DeployFlags, site_path: &Path) -> String {
    flags
        .project_name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| default_project_name(site_path))
}

fn category(flags: &DeployFlags) -> &str {
    flags
        .category
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .unwrap_or(DEFAULT_CATEGORY)
}

/// The name and category the ledger will store, checked before any side effect.
/// A tracked project keeps its name unless one is passed explicitly.
fn validate_project_fields(
    flags: &DeployFlags,
    site_path: &Path,
    existing: Option<&Project>,
) -> Result<(), DeployError> {
    if existing.is_none() || flags.project_name.is_some() {
        validate_name(&project_name(flags, site_path))?;
    }
    validate_category(category(flags))?;
    Ok(())
}

fn metadata_update(flags: &DeployFlags) -> Option<MetadataUpdate> {
    let update = MetadataUpdate {
        description: flags.description.clone(),
        image_url: flags.image_url.clone(),
        category: flags.category.clone(),
    };
    let empty = update.description.is_none() && update.image_url.is_none() && update.category.is_none();
    (!empty).then_some(update)
}

/// A deployer answer is only a success if it says so and names the object.
fn checked(
    called: Result<DeployerResult, DeployerError>,
    operation: &'static str,
) -> Result<String, DeployError> {
    let result = called?;
    if !result.success {
        return Err(DeployerError::Unsuccessful { operation }.into());
    }
    let object_id = result.object_id.trim();
    if object_id.is_empty() {
        return Err(DeployError::EmptyObjectId { operation });
    }
    Ok(object_id.to_string())
}

/// Apply explicitly passed flags to a tracked project. The object id is left
/// to `record_deployment`.
fn refresh_project(
    ledger: &Ledger,
    mut project: Project,
    flags: &DeployFlags,
) -> Result<Project, DeployError> {
    let before = project.clone();
    if let Some(name) = flags.project_name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
        project.name = name.to_string();
    }
    if let Some(category) = flags.category.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
        project.category = category.to_string();
    }
    if let Some(wallet) = &flags.wallet_addr {
        project.wallet_address = wallet.clone();
    }
    if let Some(description) = &flags.description {
        project.description = description.clone();
    }
    if let Some(image_url) = &flags.image_url {
        project.image_url = image_url.clone();
    }
    if project == before {
        return Ok(project);
    }
    Ok(ledger.update_project(&project)?)
}

fn record_failure(
    ledger: &Ledger,
    project: &Project,
    object_id: &str,
    opts: &DeployOptions,
    err: &DeployError,
) {
    let record = NewDeployment {
        project_id: project.id,
        object_id: object_id.to_string(),
        network: opts.network,
        epochs: opts.epochs,
        success: false,
        error: Some(err.to_string()),
        ..NewDeployment::default()
    };
    if let Err(e) = ledger.record_deployment(&record) {
        warn!(project_id = project.id, error = %e, "failed attempt not recorded");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("/home/me/sites/blog", "blog")]
    #[case("/", "my-site")]
    #[case("", "my-site")]
    #[case(".", "my-site")]
    #[case("/srv/portfolio/.", "portfolio")]
    fn project_name_defaults_to_last_segment(#[case] path: &str, #[case] expected: &str) {
        assert_eq!(default_project_name(Path::new(path)), expected);
    }

    #[test]
    fn explicit_name_wins_over_path() {
        let flags = DeployFlags {
            project_name: Some("  Launch Page ".into()),
            ..DeployFlags::default()
        };
        assert_eq!(project_name(&flags, Path::new("/sites/x")), "Launch Page");
    }

    #[test]
    fn blank_category_falls_back() {
        let flags = DeployFlags {
            category: Some("  ".into()),
            ..DeployFlags::default()
        };
        assert_eq!(category(&flags), DEFAULT_CATEGORY);
    }

    #[rstest]
    #[case(false, false, false)]
    #[case(true, false, true)]
    #[case(true, true, false)]
    #[case(false, true, false)]
    fn quiet_dominates_verbose(#[case] verbose: bool, #[case] quiet: bool, #[case] expected: bool) {
        let flags = DeployFlags {
            verbose,
            quiet,
            ..DeployFlags::default()
        };
        assert_eq!(flags.effective_verbose(), expected);
    }

    #[test]
    fn success_without_object_id_is_an_error() {
        let called = Ok(DeployerResult {
            success: true,
            object_id: "  ".into(),
            ..DeployerResult::default()
        });
        let err = checked(called, "publish").unwrap_err();
        assert!(matches!(err, DeployError::EmptyObjectId { .. }));
    }

    #[test]
    fn unsuccessful_result_is_an_error() {
        let called = Ok(DeployerResult {
            success: false,
            object_id: "0x1".into(),
            ..DeployerResult::default()
        });
        assert!(matches!(
            checked(called, "update").unwrap_err(),
            DeployError::Deployer(DeployerError::Unsuccessful { .. })
        ));
    }

    #[rstest]
    #[case("team/site")]
    #[case("tab\there")]
    fn unstorable_names_rejected_up_front(#[case] name: &str) {
        let flags = DeployFlags {
            project_name: Some(name.into()),
            save_project: true,
            ..DeployFlags::default()
        };
        let err = validate_project_fields(&flags, Path::new("/sites/blog"), None).unwrap_err();
        assert!(matches!(
            err,
            DeployError::Ledger(sitedeck_ledger::LedgerError::InvalidName { .. })
        ));
    }

    #[test]
    fn no_metadata_flags_means_no_metadata_update() {
        assert!(metadata_update(&DeployFlags::default()).is_none());
    }
}
