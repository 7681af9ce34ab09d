//! `sitedeck deploy`: publish or update a site.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use sitedeck_core::{config::DEFAULT_PUBLISH_DIR, cost::format_bytes, LocalConfig, Network};
use sitedeck_deploy::{
    deploy_site, DeployFlags, DeployOutcome, DeployRequest, SiteBuilderDeployer,
};

/// Arguments for `sitedeck deploy`.
#[derive(Args, Debug)]
pub struct DeployArgs {
    /// Site root directory (the one holding sitedeck.yaml).
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Build output directory, relative to the site root. Defaults to the
    /// config's `publishDir`, then `public`.
    #[arg(long)]
    pub publish_dir: Option<PathBuf>,

    /// Storage epochs to buy. Defaults to the config's `epochs`, then 1.
    #[arg(long, short = 'e')]
    pub epochs: Option<u32>,

    /// Override the network from the config.
    #[arg(long)]
    pub network: Option<Network>,

    /// Project name recorded in the ledger and manifest.
    #[arg(long)]
    pub name: Option<String>,

    #[arg(long)]
    pub category: Option<String>,

    #[arg(long)]
    pub description: Option<String>,

    #[arg(long)]
    pub image_url: Option<String>,

    /// Wallet address recorded with the project.
    #[arg(long)]
    pub wallet: Option<String>,

    /// Publish a new site object even if one is already known.
    #[arg(long)]
    pub force_new: bool,

    /// Measure and estimate only; nothing is published or written.
    #[arg(long)]
    pub dry_run: bool,

    /// Do not record the deployment in the ledger.
    #[arg(long)]
    pub no_save: bool,

    /// site-builder executable to run.
    #[arg(long, value_name = "PROGRAM", default_value = "site-builder")]
    pub site_builder: PathBuf,

    /// Config file passed to site-builder.
    #[arg(long, value_name = "FILE")]
    pub site_builder_config: Option<PathBuf>,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl DeployArgs {
    pub fn run(self, verbose: bool, quiet: bool) -> Result<()> {
        let site = super::resolve_dir(&self.path)?;
        let mut config = LocalConfig::load_in(&site)
            .with_context(|| format!("failed to read site config in '{}'", site.display()))?;

        let network = match self.network {
            Some(n) => n,
            None => config
                .network()
                .context("invalid network in site config")?
                .unwrap_or_default(),
        };
        let publish_dir = self
            .publish_dir
            .clone()
            .or_else(|| config.publish_dir().map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_PUBLISH_DIR));
        let epochs = self.epochs.or_else(|| config.epochs()).unwrap_or(1);

        let request = DeployRequest {
            site_path: site.clone(),
            publish_dir,
            epochs,
            flags: DeployFlags {
                quiet,
                verbose,
                force_new: self.force_new,
                dry_run: self.dry_run,
                save_project: !self.no_save,
                project_name: self.name.clone(),
                category: self.category.clone(),
                network: Some(network),
                wallet_addr: self.wallet.clone(),
                description: self.description.clone(),
                image_url: self.image_url.clone(),
            },
        };

        let mut deployer = SiteBuilderDeployer::new(network).with_program(&self.site_builder);
        if let Some(cfg) = &self.site_builder_config {
            deployer = deployer.with_config(cfg);
        }

        let ledger = if self.no_save || self.dry_run {
            None
        } else {
            Some(super::open_ledger()?)
        };

        let outcome = deploy_site(&request, &mut config, &deployer, ledger.as_ref())
            .with_context(|| format!("deploy failed for '{}'", site.display()))?;

        if self.json {
            return super::print_json(&outcome);
        }
        print_outcome(&outcome, quiet);
        Ok(())
    }
}

fn print_outcome(outcome: &DeployOutcome, quiet: bool) {
    super::print_warnings(&outcome.warnings);
    let verb = if outcome.is_update { "update" } else { "publish" };

    if outcome.dry_run {
        println!(
            "[dry-run] would {verb} {} files ({}) on {}",
            outcome.file_count,
            format_bytes(outcome.site_size),
            outcome.network
        );
        println!("{}", outcome.estimate);
        return;
    }

    let object_id = outcome.object_id.as_deref().unwrap_or_default();
    let done = if outcome.is_update { "Updated" } else { "Published" };
    println!("{} {done} site {}", "✓".green().bold(), object_id.bold());
    if quiet {
        return;
    }
    println!("  Network:  {}", outcome.network);
    println!(
        "  Size:     {} in {} files",
        format_bytes(outcome.site_size),
        outcome.file_count
    );
    println!("  Estimate: {}", outcome.estimate.summary());
    if let Some(id) = outcome.project_id {
        let note = if outcome.is_new_project { " (new)" } else { "" };
        println!("  Project:  #{id}{note}");
    }
}
