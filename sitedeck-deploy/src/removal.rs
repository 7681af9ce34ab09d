//! Project teardown: optional on-network destroy, then local deletion.

use serde::Serialize;
use tracing::{info, warn};

use sitedeck_core::Project;
use sitedeck_ledger::Ledger;

use crate::deployer::Deployer;
use crate::error::DeployError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemoveOptions {
    /// Destroy the site object on the network before forgetting it.
    pub destroy_on_network: bool,
    pub delete_site_folder: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RemoveOutcome {
    pub project: Project,
    pub deployments_removed: u64,
    pub destroyed: bool,
    pub folder_removed: bool,
    pub warnings: Vec<String>,
}

/// Remove project `id`.
///
/// Destroy and folder failures are warnings; the ledger rows are deleted
/// regardless. Only a ledger failure is an error.
pub fn remove_project(
    ledger: &Ledger,
    deployer: Option<&dyn Deployer>,
    id: i64,
    options: RemoveOptions,
) -> Result<RemoveOutcome, DeployError> {
    let project = ledger.get_project(id)?;
    let mut warnings = Vec::new();
    let mut destroyed = false;

    if options.destroy_on_network {
        match (deployer, project.object_id.trim()) {
            (_, "") => warnings.push("project was never published; nothing to destroy".to_string()),
            (None, _) => warnings.push("no deployer available; site object left on network".to_string()),
            (Some(deployer), object_id) => match deployer.destroy(object_id) {
                Ok(()) => destroyed = true,
                Err(e) => {
                    warn!(id, object_id, error = %e, "destroy failed, deleting locally anyway");
                    warnings.push(format!("could not destroy {object_id}: {e}"));
                }
            },
        }
    }

    let deleted = ledger.delete_project_with_options(id, options.delete_site_folder)?;
    if let Some(e) = &deleted.folder_error {
        warnings.push(format!("site folder not removed: {e}"));
    }
    info!(id, destroyed, folder_removed = deleted.folder_removed, "removed project");

    Ok(RemoveOutcome {
        project: deleted.project,
        deployments_removed: deleted.deployments_removed,
        destroyed,
        folder_removed: deleted.folder_removed,
        warnings,
    })
}
