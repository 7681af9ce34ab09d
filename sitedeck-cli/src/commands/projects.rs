//! `sitedeck projects …`: inspect and manage tracked projects.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use sitedeck_core::{
    epochs::format_expiry_duration, DeploymentRecord, EpochInfo, Network, Project, ProjectStatus,
};
use sitedeck_deploy::{remove_project, RemoveOptions, SiteBuilderDeployer};
use sitedeck_ledger::ProjectFilter;

#[derive(Subcommand, Debug)]
pub enum ProjectsCommand {
    /// List tracked projects, most recently deployed first.
    List(ListArgs),

    /// Show one project with its deployment history and storage time.
    Show(ShowArgs),

    /// Hide a project from day-to-day listings.
    Archive { id: i64 },

    /// Bring an archived project back.
    Restore { id: i64 },

    /// Set the status directly (draft, active or archived).
    SetStatus { id: i64, status: String },

    /// Forget a project, optionally destroying it on the network first.
    Delete(DeleteArgs),

    /// Totals across every tracked project.
    Stats {
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug)]
pub struct ListArgs {
    #[arg(long)]
    pub network: Option<Network>,

    #[arg(long)]
    pub status: Option<ProjectStatus>,

    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct ShowArgs {
    pub id: i64,

    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct DeleteArgs {
    pub id: i64,

    /// Destroy the site object on the network before deleting locally.
    #[arg(long)]
    pub destroy: bool,

    /// Also remove the site directory from disk.
    #[arg(long)]
    pub delete_folder: bool,

    #[arg(long, value_name = "PROGRAM", default_value = "site-builder")]
    pub site_builder: PathBuf,
}

pub fn run(cmd: ProjectsCommand) -> Result<()> {
    match cmd {
        ProjectsCommand::List(args) => list(args),
        ProjectsCommand::Show(args) => show(args),
        ProjectsCommand::Archive { id } => {
            let project = super::open_ledger()?
                .archive_project(id)
                .with_context(|| format!("failed to archive project #{id}"))?;
            println!("✓ Archived '{}' (#{})", project.name, project.id);
            Ok(())
        }
        ProjectsCommand::Restore { id } => {
            let project = super::open_ledger()?
                .restore_project(id)
                .with_context(|| format!("failed to restore project #{id}"))?;
            println!("✓ Restored '{}' as {}", project.name, project.status);
            Ok(())
        }
        ProjectsCommand::SetStatus { id, status } => {
            let project = super::open_ledger()?
                .set_status(id, &status)
                .with_context(|| format!("failed to set status of project #{id}"))?;
            println!("✓ '{}' is now {}", project.name, project.status);
            Ok(())
        }
        ProjectsCommand::Delete(args) => delete(args),
        ProjectsCommand::Stats { json } => stats(json),
    }
}

// ---------------------------------------------------------------------------
// list
// ---------------------------------------------------------------------------

#[derive(Tabled)]
struct ProjectRow {
    #[tabled(rename = "id")]
    id: i64,
    #[tabled(rename = "name")]
    name: String,
    #[tabled(rename = "network")]
    network: String,
    #[tabled(rename = "status")]
    status: String,
    #[tabled(rename = "deploys")]
    deploys: u32,
    #[tabled(rename = "last deploy")]
    last_deploy: String,
    #[tabled(rename = "object id")]
    object_id: String,
}

fn list(args: ListArgs) -> Result<()> {
    let ledger = super::open_ledger()?;
    let projects = ledger
        .list_projects(ProjectFilter {
            network: args.network,
            status: args.status,
        })
        .context("failed to list projects")?;

    if args.json {
        return super::print_json(&projects);
    }
    if projects.is_empty() {
        println!("No projects tracked.");
        println!("Run: sitedeck init <path>");
        return Ok(());
    }

    let rows: Vec<ProjectRow> = projects
        .into_iter()
        .map(|p| ProjectRow {
            id: p.id,
            name: p.name,
            network: p.network.to_string(),
            status: status_label(p.status),
            deploys: p.deploy_count,
            last_deploy: format_time(p.last_deploy_at),
            object_id: short_id(&p.object_id),
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
    Ok(())
}

// ---------------------------------------------------------------------------
// show
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct ProjectDetailJson {
    project: Project,
    storage: EpochInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    estimated_expiry: Option<DateTime<Utc>>,
    deployments: Vec<DeploymentRecord>,
}

#[derive(Tabled)]
struct DeploymentRow {
    #[tabled(rename = "#")]
    id: i64,
    #[tabled(rename = "when")]
    when: String,
    #[tabled(rename = "result")]
    result: String,
    #[tabled(rename = "epochs")]
    epochs: u32,
    #[tabled(rename = "object id")]
    object_id: String,
    #[tabled(rename = "detail")]
    detail: String,
}

fn show(args: ShowArgs) -> Result<()> {
    let ledger = super::open_ledger()?;
    let project = ledger
        .get_project(args.id)
        .with_context(|| format!("failed to load project #{}", args.id))?;
    let storage = ledger
        .get_epoch_info(project.id)
        .context("failed to compute storage time")?;
    let deployments = ledger
        .get_project_deployments(project.id)
        .context("failed to load deployment history")?;
    let estimated_expiry = storage.estimated_expiry();

    if args.json {
        return super::print_json(&ProjectDetailJson {
            project,
            storage,
            estimated_expiry,
            deployments,
        });
    }

    println!("{} (#{})", project.name.bold(), project.id);
    println!("  Status:    {}", status_label(project.status));
    println!("  Network:   {}", project.network);
    println!("  Category:  {}", project.category);
    println!("  Path:      {}", project.site_path.display());
    if !project.object_id.is_empty() {
        println!("  Object id: {}", project.object_id);
    }
    if let Some(suins) = &project.suins {
        println!("  SuiNS:     {suins}");
    }
    if !project.description.is_empty() {
        println!("  About:     {}", project.description);
    }
    println!(
        "  Storage:   {} epochs ({}) over {} successful deploys",
        storage.total_epochs,
        storage.storage_duration(),
        storage.deployment_count
    );
    if let Some(expiry) = estimated_expiry {
        println!(
            "  Expires:   {} ({})",
            expiry.format("%Y-%m-%d"),
            format_expiry_duration(expiry)
        );
    }

    if deployments.is_empty() {
        println!("\nNo deployments yet.");
        return Ok(());
    }
    let rows: Vec<DeploymentRow> = deployments
        .into_iter()
        .map(|d| DeploymentRow {
            id: d.id,
            when: format_time(Some(d.created_at)),
            result: if d.success {
                "ok".green().to_string()
            } else {
                "failed".red().to_string()
            },
            epochs: d.epochs,
            object_id: short_id(&d.object_id),
            detail: d.error.unwrap_or(d.gas_fee),
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("\n{table}");
    Ok(())
}

// ---------------------------------------------------------------------------
// delete / stats
// ---------------------------------------------------------------------------

fn delete(args: DeleteArgs) -> Result<()> {
    let ledger = super::open_ledger()?;
    let project = ledger
        .get_project(args.id)
        .with_context(|| format!("failed to load project #{}", args.id))?;
    let deployer = SiteBuilderDeployer::new(project.network).with_program(&args.site_builder);

    let outcome = remove_project(
        &ledger,
        Some(&deployer),
        project.id,
        RemoveOptions {
            destroy_on_network: args.destroy,
            delete_site_folder: args.delete_folder,
        },
    )
    .with_context(|| format!("failed to delete project #{}", project.id))?;

    super::print_warnings(&outcome.warnings);
    println!(
        "✓ Deleted '{}' and {} deployment records",
        outcome.project.name, outcome.deployments_removed
    );
    if outcome.destroyed {
        println!("  Destroyed {} on {}", outcome.project.object_id, outcome.project.network);
    }
    if outcome.folder_removed {
        println!("  Removed {}", outcome.project.site_path.display());
    }
    Ok(())
}

fn stats(json: bool) -> Result<()> {
    let stats = super::open_ledger()?
        .get_project_stats()
        .context("failed to compute stats")?;
    if json {
        return super::print_json(&stats);
    }
    println!(
        "{} projects ({} draft, {} active, {} archived)",
        stats.total_projects, stats.draft, stats.active, stats.archived
    );
    println!("{} on testnet, {} on mainnet", stats.testnet, stats.mainnet);
    println!(
        "{} deployments, {} successful",
        stats.total_deployments, stats.successful_deployments
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// Formatting
// ---------------------------------------------------------------------------

fn status_label(status: ProjectStatus) -> String {
    match status {
        ProjectStatus::Draft => "draft".bright_black().to_string(),
        ProjectStatus::Active => "active".green().to_string(),
        ProjectStatus::Archived => "archived".yellow().to_string(),
    }
}

fn format_time(ts: Option<DateTime<Utc>>) -> String {
    ts.map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "never".to_string())
}

/// `0x1234…cdef` for long ids, `-` for none.
fn short_id(id: &str) -> String {
    if id.is_empty() {
        return "-".to_string();
    }
    if id.len() <= 14 || !id.is_ascii() {
        return id.to_string();
    }
    format!("{}…{}", &id[..6], &id[id.len() - 4..])
}
