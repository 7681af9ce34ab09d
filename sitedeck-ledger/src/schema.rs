//! Ledger schema and migrations.
//!
//! `schema_version` holds one row per applied migration. On open, every
//! migration newer than the highest recorded version runs in order, each in
//! its own `BEGIN IMMEDIATE` transaction that re-checks the version table
//! first and records itself with `INSERT OR IGNORE`. Two processes opening a
//! fresh ledger at the same time therefore serialize on the write lock and
//! the loser finds nothing left to do.
//!
//! Additive column migrations check `PRAGMA table_info` before altering, so a
//! store that already has the column (for example one upgraded by an older
//! build that did not record the version) is left alone.

use chrono::Utc;
use rusqlite::{params, Connection, Transaction, TransactionBehavior};
use tracing::{debug, info};

use crate::error::LedgerError;

/// Highest migration version this build knows about.
pub const SCHEMA_VERSION: i64 = 4;

/// Tables that may appear in introspection queries. Anything else is rejected
/// at compile time because callers can only name a variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    SchemaVersion,
    Projects,
    Deployments,
}

impl Table {
    pub const ALL: [Table; 3] = [Table::SchemaVersion, Table::Projects, Table::Deployments];

    pub fn as_str(&self) -> &'static str {
        match self {
            Table::SchemaVersion => "schema_version",
            Table::Projects => "projects",
            Table::Deployments => "deployments",
        }
    }
}

struct Migration {
    version: i64,
    name: &'static str,
    apply: fn(&Transaction<'_>) -> rusqlite::Result<()>,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "base tables",
        apply: create_base_tables,
    },
    Migration {
        version: 2,
        name: "project description",
        apply: add_description,
    },
    Migration {
        version: 3,
        name: "project image url",
        apply: add_image_url,
    },
    Migration {
        version: 4,
        name: "indexes",
        apply: create_indexes,
    },
];

const SCHEMA_VERSION_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY NOT NULL,
    applied_at TEXT NOT NULL
);
"#;

const BASE_TABLES: &str = r#"
CREATE TABLE IF NOT EXISTS projects (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    category TEXT NOT NULL DEFAULT 'website',
    network TEXT NOT NULL DEFAULT 'testnet',
    object_id TEXT NOT NULL DEFAULT '',
    suins TEXT,
    wallet_address TEXT NOT NULL DEFAULT '',
    epochs INTEGER NOT NULL DEFAULT 0,
    gas_fee TEXT NOT NULL DEFAULT '',
    site_path TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'draft',
    deploy_count INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    last_deploy_at TEXT
);

-- Append-only; rows leave only through the project cascade
CREATE TABLE IF NOT EXISTS deployments (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    project_id INTEGER NOT NULL,
    object_id TEXT NOT NULL DEFAULT '',
    network TEXT NOT NULL DEFAULT 'testnet',
    epochs INTEGER NOT NULL DEFAULT 0,
    gas_fee TEXT NOT NULL DEFAULT '',
    version TEXT,
    notes TEXT NOT NULL DEFAULT '',
    success INTEGER NOT NULL DEFAULT 0,
    error TEXT,
    created_at TEXT NOT NULL,
    FOREIGN KEY (project_id) REFERENCES projects(id) ON DELETE CASCADE
);
"#;

const INDEXES: &str = r#"
CREATE INDEX IF NOT EXISTS idx_deployments_project ON deployments(project_id, id);
CREATE UNIQUE INDEX IF NOT EXISTS idx_projects_site_path ON projects(site_path);
CREATE INDEX IF NOT EXISTS idx_projects_last_deploy ON projects(last_deploy_at);
"#;

fn create_base_tables(tx: &Transaction<'_>) -> rusqlite::Result<()> {
    tx.execute_batch(BASE_TABLES)
}

fn add_description(tx: &Transaction<'_>) -> rusqlite::Result<()> {
    add_column_if_missing(
        tx,
        Table::Projects,
        "description",
        "description TEXT NOT NULL DEFAULT ''",
    )
}

fn add_image_url(tx: &Transaction<'_>) -> rusqlite::Result<()> {
    add_column_if_missing(
        tx,
        Table::Projects,
        "image_url",
        "image_url TEXT NOT NULL DEFAULT ''",
    )
}

fn create_indexes(tx: &Transaction<'_>) -> rusqlite::Result<()> {
    tx.execute_batch(INDEXES)
}

fn add_column_if_missing(
    conn: &Connection,
    table: Table,
    column: &str,
    definition: &str,
) -> rusqlite::Result<()> {
    if column_exists(conn, table, column)? {
        debug!(table = table.as_str(), column, "column already present");
        return Ok(());
    }
    conn.execute_batch(&format!(
        "ALTER TABLE {} ADD COLUMN {definition};",
        table.as_str()
    ))
}

/// `true` if `table` has a column named `column`.
pub fn column_exists(conn: &Connection, table: Table, column: &str) -> rusqlite::Result<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", table.as_str()))?;
    let names = stmt.query_map([], |row| row.get::<_, String>(1))?;
    for name in names {
        if name? == column {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Highest recorded migration, or 0 for a fresh store.
pub fn current_version(conn: &Connection) -> rusqlite::Result<i64> {
    conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )
}

/// Apply every pending migration. Any failure is fatal for the caller.
pub fn migrate(conn: &mut Connection) -> Result<(), LedgerError> {
    conn.execute_batch(SCHEMA_VERSION_TABLE)?;

    let start = current_version(conn)?;
    if start >= SCHEMA_VERSION {
        debug!(version = start, "ledger schema is up to date");
        return Ok(());
    }

    for migration in MIGRATIONS.iter().filter(|m| m.version > start) {
        let fail = |source| LedgerError::Migration {
            version: migration.version,
            name: migration.name,
            source,
        };

        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(fail)?;
        let applied: bool = tx
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM schema_version WHERE version = ?1)",
                [migration.version],
                |row| row.get(0),
            )
            .map_err(fail)?;
        if applied {
            // Another process got here first; dropping `tx` rolls back nothing.
            continue;
        }

        (migration.apply)(&tx).map_err(fail)?;
        tx.execute(
            "INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (?1, ?2)",
            params![migration.version, Utc::now().to_rfc3339()],
        )
        .map_err(fail)?;
        tx.commit().map_err(fail)?;
        info!(
            version = migration.version,
            name = migration.name,
            "applied ledger migration"
        );
    }
    Ok(())
}
