//! `sitedeck estimate`: cost estimate for a site's publish directory.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;

use sitedeck_core::{config::DEFAULT_PUBLISH_DIR, cost, LocalConfig, Network};
use sitedeck_deploy::site_size;

#[derive(Args, Debug)]
pub struct EstimateArgs {
    /// Site root directory.
    #[arg(default_value = ".")]
    pub path: PathBuf,

    #[arg(long)]
    pub publish_dir: Option<PathBuf>,

    #[arg(long, short = 'e')]
    pub epochs: Option<u32>,

    #[arg(long)]
    pub network: Option<Network>,

    /// Price an update of an existing site object rather than a fresh publish.
    #[arg(long)]
    pub update: bool,

    #[arg(long)]
    pub json: bool,
}

impl EstimateArgs {
    pub fn run(self) -> Result<()> {
        let site = super::resolve_dir(&self.path)?;
        let config = LocalConfig::load_in(&site)
            .with_context(|| format!("failed to read site config in '{}'", site.display()))?;

        let network = match self.network {
            Some(n) => n,
            None => config
                .network()
                .context("invalid network in site config")?
                .unwrap_or_default(),
        };
        let epochs = self.epochs.or_else(|| config.epochs()).unwrap_or(1);
        let publish_dir = site.join(
            self.publish_dir
                .clone()
                .or_else(|| config.publish_dir().map(PathBuf::from))
                .unwrap_or_else(|| PathBuf::from(DEFAULT_PUBLISH_DIR)),
        );
        if !publish_dir.is_dir() {
            bail!("publish directory '{}' does not exist", publish_dir.display());
        }

        let size = site_size(&publish_dir);
        let estimate = if self.update {
            cost::estimate_update_cost(network, size.bytes, size.files, epochs)
        } else {
            cost::estimate_detailed(network, size.bytes, size.files, epochs)
        };

        if self.json {
            return super::print_json(&estimate);
        }
        for (path, reason) in &size.errors {
            super::print_warnings(&[format!("could not read {}: {reason}", path.display())]);
        }
        println!("{estimate}");
        println!("total:     {}", estimate.summary());
        Ok(())
    }
}
