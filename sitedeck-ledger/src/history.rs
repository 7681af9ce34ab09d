//! Deployment history, aggregate stats and purchased storage time.

use rusqlite::{params, Row, TransactionBehavior};
use tracing::{debug, info};

use sitedeck_core::{DeploymentRecord, EpochInfo, NewDeployment, ProjectStats, ProjectStatus};

use crate::error::LedgerError;
use crate::ledger::{fetch_project, Ledger};
use crate::rows::{deployment_from_row, now_text, optional_timestamp, DEPLOYMENT_COLUMNS};

impl Ledger {
    /// Append a deployment attempt and refresh the owning project.
    ///
    /// In one transaction: insert the record, bump `deploy_count`, copy the
    /// attempt's object id, epochs, gas fee and network onto the project, set
    /// `last_deploy_at`, and promote a draft to `active`. An attempt without an
    /// object id keeps the project's current one.
    pub fn record_deployment(&self, new: &NewDeployment) -> Result<DeploymentRecord, LedgerError> {
        self.with_conn(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let project = fetch_project(&tx, new.project_id)?;

            let now = now_text();
            tx.execute(
                "INSERT INTO deployments (project_id, object_id, network, epochs, gas_fee, \
                 version, notes, success, error, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    new.project_id,
                    new.object_id,
                    new.network.as_str(),
                    new.epochs,
                    new.gas_fee,
                    new.version,
                    new.notes,
                    new.success,
                    new.error,
                    now,
                ],
            )?;
            let id = tx.last_insert_rowid();

            let status = if project.is_draft() {
                ProjectStatus::Active
            } else {
                project.status
            };
            tx.execute(
                "UPDATE projects SET deploy_count = deploy_count + 1, \
                 object_id = CASE WHEN ?1 = '' THEN object_id ELSE ?1 END, \
                 epochs = ?2, gas_fee = ?3, network = ?4, status = ?5, \
                 last_deploy_at = ?6, updated_at = ?6 WHERE id = ?7",
                params![
                    new.object_id,
                    new.epochs,
                    new.gas_fee,
                    new.network.as_str(),
                    status.as_str(),
                    now,
                    new.project_id,
                ],
            )?;

            let record = tx.query_row(
                &format!("SELECT {DEPLOYMENT_COLUMNS} FROM deployments WHERE id = ?1"),
                [id],
                deployment_from_row,
            )?;
            tx.commit()?;
            info!(
                project_id = new.project_id,
                deployment_id = id,
                success = new.success,
                object_id = %new.object_id,
                "recorded deployment"
            );
            Ok(record)
        })
    }

    /// Every attempt for `project_id`, oldest first. Unknown ids yield an
    /// empty list.
    pub fn get_project_deployments(
        &self,
        project_id: i64,
    ) -> Result<Vec<DeploymentRecord>, LedgerError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {DEPLOYMENT_COLUMNS} FROM deployments WHERE project_id = ?1 ORDER BY id"
            ))?;
            let rows = stmt.query_map([project_id], deployment_from_row)?;
            Ok(rows.collect::<Result<Vec<_>, _>>()?)
        })
    }

    pub fn get_project_stats(&self) -> Result<ProjectStats, LedgerError> {
        self.with_conn(|conn| {
            let mut stats = conn.query_row(
                "SELECT COUNT(*), \
                 COALESCE(SUM(status = 'draft'), 0), \
                 COALESCE(SUM(status = 'active'), 0), \
                 COALESCE(SUM(status = 'archived'), 0), \
                 COALESCE(SUM(network = 'testnet'), 0), \
                 COALESCE(SUM(network = 'mainnet'), 0) \
                 FROM projects",
                [],
                |row| {
                    Ok(ProjectStats {
                        total_projects: count(row, 0)?,
                        draft: count(row, 1)?,
                        active: count(row, 2)?,
                        archived: count(row, 3)?,
                        testnet: count(row, 4)?,
                        mainnet: count(row, 5)?,
                        ..ProjectStats::default()
                    })
                },
            )?;
            (stats.total_deployments, stats.successful_deployments) = conn.query_row(
                "SELECT COUNT(*), COALESCE(SUM(success), 0) FROM deployments",
                [],
                |row| Ok((count(row, 0)?, count(row, 1)?)),
            )?;
            debug!(?stats, "computed ledger stats");
            Ok(stats)
        })
    }

    /// Storage time bought across the project's successful deployments.
    ///
    /// Failed attempts never count. First and last timestamps skip rows whose
    /// stored time cannot be parsed.
    pub fn get_epoch_info(&self, project_id: i64) -> Result<EpochInfo, LedgerError> {
        self.with_conn(|conn| {
            let project = fetch_project(conn, project_id)?;
            let mut stmt = conn.prepare(
                "SELECT epochs, created_at FROM deployments \
                 WHERE project_id = ?1 AND success = 1 ORDER BY id",
            )?;
            let rows = stmt.query_map([project_id], |row| {
                Ok((row.get::<_, u32>(0)?, row.get::<_, Option<String>>(1)?))
            })?;

            let mut info = EpochInfo {
                project_id,
                network: project.network,
                total_epochs: 0,
                deployment_count: 0,
                first_deploy_at: None,
                last_deploy_at: None,
            };
            for row in rows {
                let (epochs, created_at) = row?;
                info.total_epochs += u64::from(epochs);
                info.deployment_count += 1;
                if let Some(ts) = optional_timestamp(created_at) {
                    info.first_deploy_at = Some(info.first_deploy_at.map_or(ts, |t| t.min(ts)));
                    info.last_deploy_at = Some(info.last_deploy_at.map_or(ts, |t| t.max(ts)));
                }
            }
            Ok(info)
        })
    }
}

/// Non-negative aggregate column as `u64`.
fn count(row: &Row<'_>, idx: usize) -> rusqlite::Result<u64> {
    Ok(row.get::<_, i64>(idx)?.max(0) as u64)
}
