//! # sitedeck-ledger
//!
//! File-backed SQLite ledger of projects and their deployment history.
//!
//! Open a [`Ledger`] once per process and share it (it is `Send + Sync`);
//! every call is funnelled through one connection. Cross-process contention
//! is absorbed by the WAL journal and a bounded busy timeout.

pub mod error;
pub mod history;
pub mod ledger;
mod rows;
pub mod schema;

pub use error::LedgerError;
pub use ledger::{
    validate_category, validate_name, DeleteOutcome, Ledger, ProjectFilter, BUSY_TIMEOUT,
};
pub use schema::{Table, SCHEMA_VERSION};
