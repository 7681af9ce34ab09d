//! The [`Ledger`] handle and project operations.
//!
//! # Connection model
//!
//! One `Ledger` owns one SQLite connection behind a `Mutex`, which serializes
//! every call made through it. The connection is configured before any schema
//! work:
//!
//! - `busy_timeout` of [`BUSY_TIMEOUT`] so a writer blocked by another process
//!   waits instead of failing with `SQLITE_BUSY`
//! - `journal_mode=WAL`, `synchronous=NORMAL`
//! - `foreign_keys=ON` so deleting a project cascades to its deployments
//!
//! Writes that read-then-write use `BEGIN IMMEDIATE` to take the write lock up
//! front.

use std::path::{Component, Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use tracing::{debug, info, warn};

use sitedeck_core::{paths, NewProject, Network, Project, ProjectStatus};

use crate::error::{io_err, LedgerError};
use crate::rows::{now_text, project_from_row, PROJECT_COLUMNS};
use crate::schema;

pub const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const MAX_NAME_LEN: usize = 128;

/// Persistent store of projects and deployment history.
#[derive(Debug)]
pub struct Ledger {
    path: Option<PathBuf>,
    conn: Mutex<Connection>,
}

/// Optional filters for [`Ledger::list_projects`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProjectFilter {
    pub network: Option<Network>,
    pub status: Option<ProjectStatus>,
}

/// Result of [`Ledger::delete_project_with_options`].
///
/// The database deletion has always committed when this is returned; the
/// folder outcome is reported separately and never undoes it.
#[derive(Debug)]
pub struct DeleteOutcome {
    pub project: Project,
    pub deployments_removed: u64,
    pub folder_removed: bool,
    pub folder_error: Option<LedgerError>,
}

impl Ledger {
    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Open (creating if needed) the ledger file at `path` and migrate it.
    pub fn open(path: &Path) -> Result<Self, LedgerError> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
        }
        info!(path = %path.display(), "opening ledger");
        let conn = Connection::open(path)?;
        Self::init(conn, Some(path.to_path_buf()))
    }

    /// `open(<home>/.sitedeck/ledger.db)`.
    pub fn open_at(home: &Path) -> Result<Self, LedgerError> {
        Self::open(&paths::ledger_path(home))
    }

    /// Open a private in-memory ledger (tests, dry runs).
    pub fn open_in_memory() -> Result<Self, LedgerError> {
        debug!("opening in-memory ledger");
        Self::init(Connection::open_in_memory()?, None)
    }

    fn init(mut conn: Connection, path: Option<PathBuf>) -> Result<Self, LedgerError> {
        configure(&conn)?;
        schema::migrate(&mut conn)?;
        Ok(Self {
            path,
            conn: Mutex::new(conn),
        })
    }

    /// Backing file, or `None` for an in-memory ledger.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Close the connection, surfacing any error SQLite reports on close.
    pub fn close(self) -> Result<(), LedgerError> {
        let conn = self.conn.into_inner().map_err(|_| LedgerError::LockPoisoned)?;
        conn.close().map_err(|(_, e)| LedgerError::Sqlite(e))
    }

    pub(crate) fn with_conn<F, T>(&self, f: F) -> Result<T, LedgerError>
    where
        F: FnOnce(&mut Connection) -> Result<T, LedgerError>,
    {
        let mut conn = self.conn.lock().map_err(|_| LedgerError::LockPoisoned)?;
        f(&mut conn)
    }

    // -----------------------------------------------------------------------
    // Create
    // -----------------------------------------------------------------------

    /// Insert a project. Rejects bad names/categories and already-tracked site paths.
    pub fn create_project(&self, new: &NewProject) -> Result<Project, LedgerError> {
        validate_name(&new.name)?;
        validate_category(&new.category)?;
        if new.status == ProjectStatus::Draft && !new.object_id.is_empty() {
            return Err(LedgerError::InvalidTransition {
                id: 0,
                reason: "a draft project cannot carry an object id",
            });
        }

        let site_path = site_path_text(&new.site_path);
        self.with_conn(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let existing: Option<i64> = tx
                .query_row(
                    "SELECT id FROM projects WHERE site_path = ?1",
                    [&site_path],
                    |row| row.get(0),
                )
                .optional()?;
            if let Some(existing_id) = existing {
                return Err(LedgerError::DuplicateSitePath {
                    path: new.site_path.clone(),
                    existing_id,
                });
            }

            let now = now_text();
            tx.execute(
                "INSERT INTO projects (name, category, network, object_id, suins, wallet_address, \
                 epochs, gas_fee, site_path, description, image_url, status, deploy_count, \
                 created_at, updated_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, 0, ?13, ?13)",
                params![
                    new.name.trim(),
                    new.category.trim(),
                    new.network.as_str(),
                    new.object_id,
                    new.suins,
                    new.wallet_address,
                    new.epochs,
                    new.gas_fee,
                    site_path,
                    new.description,
                    new.image_url,
                    new.status.as_str(),
                    now,
                ],
            )?;
            let id = tx.last_insert_rowid();
            let project = fetch_project(&tx, id)?;
            tx.commit()?;
            info!(id, name = %project.name, status = %project.status, "created project");
            Ok(project)
        })
    }

    /// Register a scaffolded site that has never been deployed.
    pub fn create_draft_project(
        &self,
        name: &str,
        category: &str,
        network: Network,
        site_path: &Path,
    ) -> Result<Project, LedgerError> {
        self.create_project(&NewProject {
            name: name.to_string(),
            category: category.to_string(),
            network,
            site_path: site_path.to_path_buf(),
            status: ProjectStatus::Draft,
            ..NewProject::default()
        })
    }

    // -----------------------------------------------------------------------
    // Read
    // -----------------------------------------------------------------------

    pub fn get_project(&self, id: i64) -> Result<Project, LedgerError> {
        self.with_conn(|conn| fetch_project(conn, id))
    }

    /// First project with this exact name, or `None`.
    pub fn get_project_by_name(&self, name: &str) -> Result<Option<Project>, LedgerError> {
        self.with_conn(|conn| {
            Ok(conn
                .query_row(
                    &format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE name = ?1 ORDER BY id LIMIT 1"),
                    [name.trim()],
                    project_from_row,
                )
                .optional()?)
        })
    }

    /// The project tracking `site_path`, or `None`.
    pub fn get_project_by_site_path(&self, site_path: &Path) -> Result<Option<Project>, LedgerError> {
        let site_path = site_path_text(site_path);
        self.with_conn(|conn| {
            Ok(conn
                .query_row(
                    &format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE site_path = ?1"),
                    [site_path],
                    project_from_row,
                )
                .optional()?)
        })
    }

    /// Projects matching `filter`, most recently deployed first. Never-deployed
    /// projects come last.
    pub fn list_projects(&self, filter: ProjectFilter) -> Result<Vec<Project>, LedgerError> {
        let mut projects = self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {PROJECT_COLUMNS} FROM projects \
                 WHERE (?1 IS NULL OR network = ?1) AND (?2 IS NULL OR status = ?2) \
                 ORDER BY id"
            ))?;
            let rows = stmt.query_map(
                params![
                    filter.network.map(|n| n.as_str()),
                    filter.status.map(|s| s.as_str())
                ],
                project_from_row,
            )?;
            Ok(rows.collect::<Result<Vec<_>, _>>()?)
        })?;
        // Sorted after parsing: stored timestamps may use mixed layouts.
        projects.sort_by(|a, b| b.last_deploy_at.cmp(&a.last_deploy_at));
        Ok(projects)
    }

    // -----------------------------------------------------------------------
    // Update
    // -----------------------------------------------------------------------

    /// Persist the editable fields of `project`.
    ///
    /// `status`, `deploy_count` and `last_deploy_at` are ignored here: they
    /// change only through status transitions and deployment recording.
    pub fn update_project(&self, project: &Project) -> Result<Project, LedgerError> {
        validate_name(&project.name)?;
        validate_category(&project.category)?;
        let site_path = site_path_text(&project.site_path);

        self.with_conn(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let current = fetch_project(&tx, project.id)?;
            if current.is_draft() && !project.object_id.is_empty() {
                return Err(LedgerError::InvalidTransition {
                    id: project.id,
                    reason: "a draft project cannot carry an object id",
                });
            }
            let clash: Option<i64> = tx
                .query_row(
                    "SELECT id FROM projects WHERE site_path = ?1 AND id != ?2",
                    params![site_path, project.id],
                    |row| row.get(0),
                )
                .optional()?;
            if let Some(existing_id) = clash {
                return Err(LedgerError::DuplicateSitePath {
                    path: project.site_path.clone(),
                    existing_id,
                });
            }

            tx.execute(
                "UPDATE projects SET name = ?1, category = ?2, network = ?3, object_id = ?4, \
                 suins = ?5, wallet_address = ?6, epochs = ?7, gas_fee = ?8, site_path = ?9, \
                 description = ?10, image_url = ?11, updated_at = ?12 WHERE id = ?13",
                params![
                    project.name.trim(),
                    project.category.trim(),
                    project.network.as_str(),
                    project.object_id,
                    project.suins,
                    project.wallet_address,
                    project.epochs,
                    project.gas_fee,
                    site_path,
                    project.description,
                    project.image_url,
                    now_text(),
                    project.id,
                ],
            )?;
            let updated = fetch_project(&tx, project.id)?;
            tx.commit()?;
            debug!(id = project.id, "updated project");
            Ok(updated)
        })
    }

    /// Validate `status` against the closed set and apply it.
    pub fn set_status(&self, id: i64, status: &str) -> Result<Project, LedgerError> {
        let status: ProjectStatus = status.parse()?;
        self.transition(id, status)
    }

    pub fn archive_project(&self, id: i64) -> Result<Project, LedgerError> {
        self.transition(id, ProjectStatus::Archived)
    }

    /// Un-archive: back to `active` if the project was ever deployed, else `draft`.
    pub fn restore_project(&self, id: i64) -> Result<Project, LedgerError> {
        let project = self.get_project(id)?;
        let target = if project.deploy_count > 0 || !project.object_id.is_empty() {
            ProjectStatus::Active
        } else {
            ProjectStatus::Draft
        };
        self.transition(id, target)
    }

    fn transition(&self, id: i64, status: ProjectStatus) -> Result<Project, LedgerError> {
        self.with_conn(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let current = fetch_project(&tx, id)?;
            if status == ProjectStatus::Draft
                && (current.deploy_count > 0 || !current.object_id.is_empty())
            {
                return Err(LedgerError::InvalidTransition {
                    id,
                    reason: "a deployed project cannot return to draft",
                });
            }
            tx.execute(
                "UPDATE projects SET status = ?1, updated_at = ?2 WHERE id = ?3",
                params![status.as_str(), now_text(), id],
            )?;
            let updated = fetch_project(&tx, id)?;
            tx.commit()?;
            info!(id, from = %current.status, to = %status, "project status changed");
            Ok(updated)
        })
    }

    // -----------------------------------------------------------------------
    // Delete
    // -----------------------------------------------------------------------

    /// Remove a project and all of its deployment records.
    pub fn delete_project(&self, id: i64) -> Result<Project, LedgerError> {
        self.delete_project_with_options(id, false)
            .map(|outcome| outcome.project)
    }

    /// Remove a project and its records in one transaction, then optionally
    /// its site folder. Folder failures land in [`DeleteOutcome::folder_error`].
    pub fn delete_project_with_options(
        &self,
        id: i64,
        delete_site_folder: bool,
    ) -> Result<DeleteOutcome, LedgerError> {
        let (project, deployments_removed) = self.with_conn(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let project = fetch_project(&tx, id)?;
            let removed = tx.execute("DELETE FROM deployments WHERE project_id = ?1", [id])?;
            tx.execute("DELETE FROM projects WHERE id = ?1", [id])?;
            tx.commit()?;
            Ok((project, removed as u64))
        })?;
        info!(id, deployments_removed, "deleted project");

        let mut outcome = DeleteOutcome {
            project,
            deployments_removed,
            folder_removed: false,
            folder_error: None,
        };
        if delete_site_folder {
            match remove_site_folder(&outcome.project.site_path) {
                Ok(removed) => outcome.folder_removed = removed,
                Err(err) => {
                    warn!(id, error = %err, "project deleted but site folder was not removed");
                    outcome.folder_error = Some(err);
                }
            }
        }
        Ok(outcome)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn configure(conn: &Connection) -> Result<(), LedgerError> {
    conn.busy_timeout(BUSY_TIMEOUT)?;
    let mode: String =
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    debug!(journal_mode = %mode, "configured ledger connection");
    Ok(())
}

pub(crate) fn fetch_project(conn: &Connection, id: i64) -> Result<Project, LedgerError> {
    conn.query_row(
        &format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = ?1"),
        [id],
        project_from_row,
    )
    .optional()?
    .ok_or(LedgerError::NotFound { id })
}

fn site_path_text(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Rules every stored project name must pass. Callers with side effects
/// ahead of the write check up front with this.
pub fn validate_name(name: &str) -> Result<(), LedgerError> {
    let invalid = |reason| LedgerError::InvalidName {
        name: name.to_string(),
        reason,
    };
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(invalid("must not be empty"));
    }
    if trimmed.chars().count() > MAX_NAME_LEN {
        return Err(invalid("must be at most 128 characters"));
    }
    if trimmed.chars().any(|c| c.is_control() || c == '/' || c == '\\') {
        return Err(invalid("must not contain control characters or path separators"));
    }
    Ok(())
}

pub fn validate_category(category: &str) -> Result<(), LedgerError> {
    if category.trim().is_empty() {
        return Err(LedgerError::InvalidCategory {
            category: category.to_string(),
            reason: "must not be empty",
        });
    }
    Ok(())
}

/// Remove `path` recursively. `Ok(false)` if it was already gone.
fn remove_site_folder(path: &Path) -> Result<bool, LedgerError> {
    let unsafe_folder = |reason| LedgerError::UnsafeFolder {
        path: path.to_path_buf(),
        reason,
    };
    if !path.is_absolute() {
        return Err(unsafe_folder("path is not absolute"));
    }
    let depth = path
        .components()
        .filter(|c| matches!(c, Component::Normal(_)))
        .count();
    if depth < 2 {
        return Err(unsafe_folder("path is too close to the filesystem root"));
    }
    if paths::home().ok().as_deref() == Some(path) {
        return Err(unsafe_folder("path is the home directory"));
    }
    if !path.exists() {
        return Ok(false);
    }
    std::fs::remove_dir_all(path).map_err(|e| io_err(path, e))?;
    Ok(true)
}
