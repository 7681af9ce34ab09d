//! Row ↔ domain mapping.
//!
//! Timestamps are written as RFC 3339 but read leniently: rows from older
//! tools may carry other layouts, and a bad timestamp must not make a whole
//! listing fail.

use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::Row;

use sitedeck_core::epochs::{is_zero_timestamp, parse_timestamp_or_zero};
use sitedeck_core::{DeploymentRecord, Project};

pub(crate) const PROJECT_COLUMNS: &str = "id, name, category, network, object_id, suins, \
     wallet_address, epochs, gas_fee, site_path, description, image_url, status, deploy_count, \
     created_at, updated_at, last_deploy_at";

pub(crate) const DEPLOYMENT_COLUMNS: &str =
    "id, project_id, object_id, network, epochs, gas_fee, version, notes, success, error, created_at";

pub(crate) fn now_text() -> String {
    Utc::now().to_rfc3339()
}

pub(crate) fn timestamp(raw: &str) -> DateTime<Utc> {
    parse_timestamp_or_zero(raw)
}

pub(crate) fn optional_timestamp(raw: Option<String>) -> Option<DateTime<Utc>> {
    raw.map(|s| timestamp(&s)).filter(|ts| !is_zero_timestamp(ts))
}

/// Parse a TEXT column through `FromStr`, surfacing failures as conversion errors.
fn parsed<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    raw.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn project_from_row(row: &Row<'_>) -> rusqlite::Result<Project> {
    let created_at: String = row.get(14)?;
    let updated_at: String = row.get(15)?;
    Ok(Project {
        id: row.get(0)?,
        name: row.get(1)?,
        category: row.get(2)?,
        network: parsed(row, 3)?,
        object_id: row.get(4)?,
        suins: row.get::<_, Option<String>>(5)?.filter(|s| !s.is_empty()),
        wallet_address: row.get(6)?,
        epochs: row.get(7)?,
        gas_fee: row.get(8)?,
        site_path: PathBuf::from(row.get::<_, String>(9)?),
        description: row.get(10)?,
        image_url: row.get(11)?,
        status: parsed(row, 12)?,
        deploy_count: row.get(13)?,
        created_at: timestamp(&created_at),
        updated_at: timestamp(&updated_at),
        last_deploy_at: optional_timestamp(row.get(16)?),
    })
}

pub(crate) fn deployment_from_row(row: &Row<'_>) -> rusqlite::Result<DeploymentRecord> {
    let created_at: String = row.get(10)?;
    Ok(DeploymentRecord {
        id: row.get(0)?,
        project_id: row.get(1)?,
        object_id: row.get(2)?,
        network: parsed(row, 3)?,
        epochs: row.get(4)?,
        gas_fee: row.get(5)?,
        version: row.get(6)?,
        notes: row.get(7)?,
        success: row.get(8)?,
        error: row.get(9)?,
        created_at: timestamp(&created_at),
    })
}
