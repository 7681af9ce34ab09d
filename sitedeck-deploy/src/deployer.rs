//! The storage-network collaborator.
//!
//! [`Deployer`] is the seam between orchestration and whatever actually talks
//! to the network. [`SiteBuilderDeployer`] drives the `site-builder`
//! executable; tests substitute an in-process fake.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use serde::Serialize;
use tracing::{debug, info};

use sitedeck_core::Network;

use crate::error::DeployerError;

/// Per-call settings passed to the deployer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployOptions {
    pub network: Network,
    pub epochs: u32,
    /// Pass the collaborator's own progress output through to the user.
    pub verbose: bool,
}

impl Default for DeployOptions {
    fn default() -> Self {
        Self {
            network: Network::default(),
            epochs: 1,
            verbose: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeployerResult {
    pub success: bool,
    pub object_id: String,
    /// Resource path → blob id, as reported by the deployer.
    pub file_to_blob_id: BTreeMap<String, String>,
}

pub trait Deployer {
    /// Publish `site_dir` as a new site object.
    fn deploy(&self, site_dir: &Path, opts: &DeployOptions) -> Result<DeployerResult, DeployerError>;

    /// Publish `site_dir` onto the existing `object_id`.
    fn update(
        &self,
        site_dir: &Path,
        object_id: &str,
        opts: &DeployOptions,
    ) -> Result<DeployerResult, DeployerError>;

    /// Describe the resources currently attached to `object_id`.
    fn status(&self, object_id: &str, opts: &DeployOptions) -> Result<DeployerResult, DeployerError>;

    /// Delete the site object and its resources from the network.
    fn destroy(&self, object_id: &str) -> Result<(), DeployerError>;
}

// ---------------------------------------------------------------------------
// site-builder process adapter
// ---------------------------------------------------------------------------

pub const SITE_BUILDER_PROGRAM: &str = "site-builder";

/// Runs the `site-builder` CLI as a child process.
#[derive(Debug, Clone)]
pub struct SiteBuilderDeployer {
    program: PathBuf,
    /// Optional `--config` file passed to every invocation.
    config: Option<PathBuf>,
    /// Context used for calls that carry no options (`destroy`).
    network: Network,
}

impl SiteBuilderDeployer {
    pub fn new(network: Network) -> Self {
        Self {
            program: PathBuf::from(SITE_BUILDER_PROGRAM),
            config: None,
            network,
        }
    }

    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    pub fn with_config(mut self, config: impl Into<PathBuf>) -> Self {
        self.config = Some(config.into());
        self
    }

    fn command(&self, network: Network) -> Command {
        let mut cmd = Command::new(&self.program);
        if let Some(config) = &self.config {
            cmd.arg("--config").arg(config);
        }
        cmd.arg("--context").arg(network.as_str());
        cmd
    }

    /// Run to completion and return stdout. When `verbose`, stderr goes
    /// straight to the terminal and stdout lines are logged once it exits.
    fn run(
        &self,
        operation: &'static str,
        mut cmd: Command,
        verbose: bool,
    ) -> Result<String, DeployerError> {
        if verbose {
            cmd.stderr(Stdio::inherit());
        }
        debug!(?cmd, verbose, "running site-builder");
        let output = cmd.output().map_err(|e| DeployerError::Spawn {
            program: self.program.display().to_string(),
            source: e,
        })?;
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if verbose {
            for line in stdout.lines().filter(|l| !l.trim().is_empty()) {
                info!(target: "site-builder", "{line}");
            }
        }
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(DeployerError::Failed {
                operation,
                status: output.status.to_string(),
                stderr: if stderr.is_empty() { stdout.trim().to_string() } else { stderr },
            });
        }
        Ok(stdout)
    }
}

impl Deployer for SiteBuilderDeployer {
    fn deploy(&self, site_dir: &Path, opts: &DeployOptions) -> Result<DeployerResult, DeployerError> {
        let mut cmd = self.command(opts.network);
        cmd.arg("publish")
            .arg("--epochs")
            .arg(opts.epochs.to_string())
            .arg(site_dir);
        let stdout = self.run("publish", cmd, opts.verbose)?;
        let result = parse_output(&stdout);
        info!(object_id = %result.object_id, files = result.file_to_blob_id.len(), "site-builder publish finished");
        Ok(result)
    }

    fn update(
        &self,
        site_dir: &Path,
        object_id: &str,
        opts: &DeployOptions,
    ) -> Result<DeployerResult, DeployerError> {
        let mut cmd = self.command(opts.network);
        cmd.arg("update")
            .arg("--epochs")
            .arg(opts.epochs.to_string())
            .arg(site_dir)
            .arg(object_id);
        let stdout = self.run("update", cmd, opts.verbose)?;
        let mut result = parse_output(&stdout);
        // `update` does not always echo the id back.
        if result.object_id.is_empty() {
            result.object_id = object_id.to_string();
        }
        info!(object_id = %result.object_id, "site-builder update finished");
        Ok(result)
    }

    fn status(&self, object_id: &str, opts: &DeployOptions) -> Result<DeployerResult, DeployerError> {
        let mut cmd = self.command(opts.network);
        cmd.arg("sitemap").arg(object_id);
        let stdout = self.run("sitemap", cmd, opts.verbose)?;
        let mut result = parse_output(&stdout);
        result.object_id = object_id.to_string();
        Ok(result)
    }

    fn destroy(&self, object_id: &str) -> Result<(), DeployerError> {
        let mut cmd = self.command(self.network);
        cmd.arg("destroy").arg(object_id);
        self.run("destroy", cmd, false)?;
        info!(object_id, "site-builder destroy finished");
        Ok(())
    }
}

/// Extract the site object id and resource blob ids from site-builder output.
///
/// Recognised lines:
/// - `New site object ID: 0x…` / `Site object ID: 0x…`
/// - `… /path/to/resource with blob ID <id>`
pub fn parse_output(stdout: &str) -> DeployerResult {
    let mut result = DeployerResult {
        success: true,
        ..DeployerResult::default()
    };
    for line in stdout.lines().map(str::trim) {
        if let Some((_, rest)) = line.split_once("object ID:") {
            if let Some(id) = rest.split_whitespace().next() {
                result.object_id = id.trim_end_matches(['.', ',']).to_string();
            }
        } else if let Some((head, blob)) = line.split_once(" with blob ID ") {
            let resource = head.split_whitespace().last();
            let blob = blob.split_whitespace().next();
            if let (Some(resource), Some(blob)) = (resource, blob) {
                result
                    .file_to_blob_id
                    .insert(resource.to_string(), blob.trim_end_matches(['.', ',']).to_string());
            }
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    const PUBLISH_OUTPUT: &str = "\
Parsing the directory public and locally computing blob IDs...
Storing resources on Walrus: batch 1 of 1
Created new site!
  - created resource /index.html with blob ID Kx9f2aQ
  - created resource /css/site.css with blob ID 7hPz1bB.
New site object ID: 0x5ac9e3a1
To browse the site, visit the portal.
";

    #[test]
    fn parses_object_id_and_blobs() {
        let r = parse_output(PUBLISH_OUTPUT);
        assert!(r.success);
        assert_eq!(r.object_id, "0x5ac9e3a1");
        assert_eq!(r.file_to_blob_id.len(), 2);
        assert_eq!(r.file_to_blob_id["/index.html"], "Kx9f2aQ");
        assert_eq!(r.file_to_blob_id["/css/site.css"], "7hPz1bB");
    }

    #[test]
    fn output_without_id_leaves_it_empty() {
        let r = parse_output("Nothing to do.\n");
        assert!(r.object_id.is_empty());
        assert!(r.file_to_blob_id.is_empty());
    }

    #[test]
    fn missing_program_is_a_spawn_error() {
        let deployer = SiteBuilderDeployer::new(Network::Testnet)
            .with_program("/definitely/not/a/site-builder");
        let err = deployer.destroy("0x1").unwrap_err();
        assert!(matches!(err, DeployerError::Spawn { .. }), "got: {err}");
    }

    #[cfg(unix)]
    fn failing_site_builder(dir: &Path) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let script = dir.join("site-builder");
        std::fs::write(
            &script,
            "#!/bin/sh\necho 'Parsing the directory public'\necho 'insufficient WAL balance' >&2\nexit 1\n",
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        script
    }

    #[cfg(unix)]
    #[test]
    fn quiet_run_captures_stderr_for_the_error() {
        let dir = tempfile::tempdir().unwrap();
        let deployer =
            SiteBuilderDeployer::new(Network::Testnet).with_program(failing_site_builder(dir.path()));
        let err = deployer.deploy(dir.path(), &DeployOptions::default()).unwrap_err();
        match err {
            DeployerError::Failed { stderr, .. } => assert_eq!(stderr, "insufficient WAL balance"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn verbose_run_passes_stderr_through() {
        let dir = tempfile::tempdir().unwrap();
        let deployer =
            SiteBuilderDeployer::new(Network::Testnet).with_program(failing_site_builder(dir.path()));
        let opts = DeployOptions {
            verbose: true,
            ..DeployOptions::default()
        };
        let err = deployer.deploy(dir.path(), &opts).unwrap_err();
        // stderr went to the terminal, so only stdout is left to report
        match err {
            DeployerError::Failed { stderr, .. } => assert_eq!(stderr, "Parsing the directory public"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
