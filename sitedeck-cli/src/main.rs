//! sitedeck: publish static sites and keep track of what is already out there.
//!
//! # Usage
//!
//! ```text
//! sitedeck init <path> [--name <name>] [--network testnet|mainnet] [--category <c>]
//! sitedeck deploy [path] [--epochs N] [--force-new] [--dry-run] [--json]
//! sitedeck estimate [path] [--epochs N] [--update] [--json]
//! sitedeck projects list [--network <n>] [--status <s>] [--json]
//! sitedeck projects show <id> [--json]
//! sitedeck projects archive|restore <id>
//! sitedeck projects set-status <id> <status>
//! sitedeck projects delete <id> [--destroy] [--delete-folder]
//! sitedeck projects stats [--json]
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{
    deploy::DeployArgs, estimate::EstimateArgs, init::InitArgs, projects::ProjectsCommand,
};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "sitedeck",
    version,
    about = "Deploy static sites to decentralized storage and track them locally",
    long_about = None,
)]
struct Cli {
    /// Log progress (`info` level) to stderr.
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    /// Only log errors. Wins over --verbose.
    #[arg(long, short = 'q', global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Scaffold a site directory and register it as a draft project.
    Init(InitArgs),

    /// Publish a site, or update the site object it was published to.
    Deploy(DeployArgs),

    /// Estimate storage and gas costs without publishing.
    Estimate(EstimateArgs),

    /// Inspect and manage tracked projects.
    Projects {
        #[command(subcommand)]
        command: ProjectsCommand,
    },
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);
    match cli.command {
        Commands::Init(args) => args.run(),
        Commands::Deploy(args) => args.run(cli.verbose, cli.quiet),
        Commands::Estimate(args) => args.run(),
        Commands::Projects { command } => commands::projects::run(command),
    }
}

fn init_tracing(verbose: bool, quiet: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = if quiet {
        "error"
    } else if verbose {
        "info"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
