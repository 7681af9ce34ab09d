pub mod deploy;
pub mod estimate;
pub mod init;
pub mod projects;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use colored::Colorize;

use sitedeck_core::paths;
use sitedeck_ledger::Ledger;

pub(crate) fn home() -> Result<PathBuf> {
    paths::home().context("could not determine home directory")
}

pub(crate) fn open_ledger() -> Result<Ledger> {
    let home = home()?;
    Ledger::open_at(&home).with_context(|| {
        format!(
            "failed to open ledger at {}",
            paths::ledger_path(&home).display()
        )
    })
}

pub(crate) fn resolve_dir(path: &Path) -> Result<PathBuf> {
    path.canonicalize()
        .with_context(|| format!("cannot resolve path '{}'", path.display()))
}

pub(crate) fn print_warnings(warnings: &[String]) {
    for w in warnings {
        eprintln!("{} {w}", "⚠".yellow().bold());
    }
}

pub(crate) fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("failed to serialize JSON output")?
    );
    Ok(())
}
