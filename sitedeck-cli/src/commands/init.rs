//! `sitedeck init <path> [--name <name>] [--network <n>] [--category <c>]`

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;

use sitedeck_core::{config::DEFAULT_PUBLISH_DIR, LocalConfig, Network, CONFIG_FILE_NAME};
use sitedeck_deploy::{orchestrator::default_project_name, DEFAULT_CATEGORY};

/// Scaffold a site directory and register it as a draft project.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Site root directory. Created if missing.
    pub path: PathBuf,

    /// Project name. Defaults to the directory name.
    #[arg(long, short = 'n')]
    pub name: Option<String>,

    /// Target network.
    #[arg(long, default_value_t = Network::Testnet)]
    pub network: Network,

    /// Project category.
    #[arg(long, default_value = DEFAULT_CATEGORY)]
    pub category: String,

    /// Only write local files; do not register the project.
    #[arg(long)]
    pub no_save: bool,
}

impl InitArgs {
    pub fn run(self) -> Result<()> {
        std::fs::create_dir_all(&self.path)
            .with_context(|| format!("cannot create '{}'", self.path.display()))?;
        let site = super::resolve_dir(&self.path)?;

        let config_path = LocalConfig::path_in(&site);
        if config_path.exists() {
            bail!(
                "'{}' already has a {CONFIG_FILE_NAME}; use `sitedeck deploy` to publish it",
                site.display()
            );
        }

        let name = self
            .name
            .clone()
            .unwrap_or_else(|| default_project_name(&site));
        let publish_dir = site.join(DEFAULT_PUBLISH_DIR);
        std::fs::create_dir_all(&publish_dir)
            .with_context(|| format!("cannot create '{}'", publish_dir.display()))?;
        LocalConfig::scaffold(&config_path, &name, self.network)
            .save()
            .with_context(|| format!("failed to write '{}'", config_path.display()))?;

        println!("✓ Scaffolded '{}' at {}", name, site.display());
        println!("  Config: {}", config_path.display());

        if self.no_save {
            return Ok(());
        }
        let ledger = super::open_ledger()?;
        let project = ledger
            .create_draft_project(&name, &self.category, self.network, &site)
            .with_context(|| format!("failed to register '{name}'"))?;
        println!("✓ Registered draft project #{} ({})", project.id, project.network);
        Ok(())
    }
}
