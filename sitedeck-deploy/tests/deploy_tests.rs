//! End-to-end orchestration against an in-process deployer.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::path::Path;

use assert_fs::prelude::*;
use sitedeck_core::{manifest, IdentitySource, LocalConfig, Network, ProjectStatus};
use sitedeck_deploy::{
    deploy_site, remove_project, DeployError, DeployFlags, DeployOptions, DeployRequest, Deployer,
    DeployerError, DeployerResult, RemoveOptions,
};
use sitedeck_ledger::{Ledger, ProjectFilter};

// ---------------------------------------------------------------------------
// Fake deployer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
enum Call {
    Deploy,
    Update(String),
    Destroy(String),
}

/// Hands out scripted answers in order and remembers every call.
#[derive(Default)]
struct FakeDeployer {
    answers: RefCell<VecDeque<Result<DeployerResult, DeployerError>>>,
    calls: RefCell<Vec<Call>>,
    destroy_fails: bool,
}

impl FakeDeployer {
    fn answering(ids: &[&str]) -> Self {
        let fake = Self::default();
        for id in ids {
            fake.push(Ok(published(id)));
        }
        fake
    }

    fn push(&self, answer: Result<DeployerResult, DeployerError>) {
        self.answers.borrow_mut().push_back(answer);
    }

    fn next(&self) -> Result<DeployerResult, DeployerError> {
        self.answers
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(DeployerError::Other("no scripted answer".into())))
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }
}

impl Deployer for FakeDeployer {
    fn deploy(&self, _: &Path, _: &DeployOptions) -> Result<DeployerResult, DeployerError> {
        self.calls.borrow_mut().push(Call::Deploy);
        self.next()
    }

    fn update(
        &self,
        _: &Path,
        object_id: &str,
        _: &DeployOptions,
    ) -> Result<DeployerResult, DeployerError> {
        self.calls.borrow_mut().push(Call::Update(object_id.to_string()));
        self.next()
    }

    fn status(&self, object_id: &str, _: &DeployOptions) -> Result<DeployerResult, DeployerError> {
        Ok(published(object_id))
    }

    fn destroy(&self, object_id: &str) -> Result<(), DeployerError> {
        self.calls.borrow_mut().push(Call::Destroy(object_id.to_string()));
        if self.destroy_fails {
            return Err(DeployerError::Other("object is owned by another wallet".into()));
        }
        Ok(())
    }
}

fn published(id: &str) -> DeployerResult {
    DeployerResult {
        success: true,
        object_id: id.to_string(),
        ..DeployerResult::default()
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

fn scaffold_site(root: &assert_fs::TempDir) -> std::path::PathBuf {
    let site = root.child("blog");
    site.child("public/index.html").write_str("<h1>hello</h1>").unwrap();
    site.child("public/css/site.css").write_str("body{}").unwrap();
    LocalConfig::scaffold(LocalConfig::path_in(site.path()), "blog", Network::Testnet)
        .save()
        .unwrap();
    site.path().to_path_buf()
}

fn request(site: &Path, flags: DeployFlags) -> DeployRequest {
    DeployRequest {
        site_path: site.to_path_buf(),
        publish_dir: "public".into(),
        epochs: 3,
        flags,
    }
}

fn saving() -> DeployFlags {
    DeployFlags {
        save_project: true,
        ..DeployFlags::default()
    }
}

fn config_id(site: &Path) -> String {
    LocalConfig::load_in(site).unwrap().project_id().to_string()
}

// ---------------------------------------------------------------------------
// Publish / update / force-new
// ---------------------------------------------------------------------------

#[test]
fn fresh_then_update_then_force_new() {
    let root = assert_fs::TempDir::new().unwrap();
    let site = scaffold_site(&root);
    let ledger = Ledger::open_in_memory().unwrap();
    let fake = FakeDeployer::answering(&["0xabc", "0xabc", "0xdef"]);

    // fresh publish
    let mut config = LocalConfig::load_in(&site).unwrap();
    let first = deploy_site(&request(&site, saving()), &mut config, &fake, Some(&ledger)).unwrap();
    assert_eq!(first.object_id.as_deref(), Some("0xabc"));
    assert!(!first.is_update);
    assert!(first.is_new_project);
    assert_eq!(first.identity, IdentitySource::Fresh);
    assert_eq!(config_id(&site), "0xabc");
    assert_eq!(manifest::read_object_id(&site.join("public")).unwrap(), "0xabc");

    let project = ledger.get_project(first.project_id.unwrap()).unwrap();
    assert_eq!(project.name, "blog");
    assert_eq!(project.category, "website");
    assert_eq!(project.status, ProjectStatus::Active);
    assert_eq!(project.deploy_count, 1);
    assert_eq!(project.object_id, "0xabc");

    // update through the config id
    let mut config = LocalConfig::load_in(&site).unwrap();
    let second = deploy_site(&request(&site, saving()), &mut config, &fake, Some(&ledger)).unwrap();
    assert!(second.is_update);
    assert!(!second.is_new_project);
    assert_eq!(second.identity, IdentitySource::Config);
    assert_eq!(second.project_id, first.project_id);

    // force a new object
    let flags = DeployFlags {
        force_new: true,
        ..saving()
    };
    let mut config = LocalConfig::load_in(&site).unwrap();
    let third = deploy_site(&request(&site, flags), &mut config, &fake, Some(&ledger)).unwrap();
    assert!(!third.is_update);
    assert_eq!(third.object_id.as_deref(), Some("0xdef"));
    assert_eq!(config_id(&site), "0xdef");

    assert_eq!(
        fake.calls(),
        [Call::Deploy, Call::Update("0xabc".into()), Call::Deploy]
    );
    let project = ledger.get_project(project.id).unwrap();
    assert_eq!(project.deploy_count, 3);
    assert_eq!(project.object_id, "0xdef");
    assert_eq!(ledger.get_epoch_info(project.id).unwrap().total_epochs, 9);
    assert_eq!(ledger.list_projects(ProjectFilter::default()).unwrap().len(), 1);
}

#[test]
fn manifest_id_used_when_config_has_placeholder() {
    let root = assert_fs::TempDir::new().unwrap();
    let site = scaffold_site(&root);
    root.child("blog/public/ws-resources.json")
        .write_str(r#"{ "routes": { "/*": "/index.html" }, "objectId": "0xfrommanifest" }"#)
        .unwrap();
    let fake = FakeDeployer::answering(&["0xfrommanifest"]);

    let mut config = LocalConfig::load_in(&site).unwrap();
    let outcome = deploy_site(&request(&site, DeployFlags::default()), &mut config, &fake, None).unwrap();
    assert!(outcome.is_update);
    assert_eq!(outcome.identity, IdentitySource::Manifest);
    assert_eq!(fake.calls(), [Call::Update("0xfrommanifest".into())]);
    assert_eq!(config_id(&site), "0xfrommanifest");

    root.child("blog/public/ws-resources.json")
        .assert(predicates::str::contains("\"/*\": \"/index.html\""));
}

#[test]
fn metadata_flags_land_in_manifest_and_project() {
    let root = assert_fs::TempDir::new().unwrap();
    let site = scaffold_site(&root);
    let ledger = Ledger::open_in_memory().unwrap();
    let fake = FakeDeployer::answering(&["0x1"]);
    let flags = DeployFlags {
        project_name: Some("Launch".into()),
        category: Some("portfolio".into()),
        description: Some("my work".into()),
        image_url: Some("https://example.com/cover.png".into()),
        ..saving()
    };

    let mut config = LocalConfig::load_in(&site).unwrap();
    let outcome = deploy_site(&request(&site, flags), &mut config, &fake, Some(&ledger)).unwrap();

    let loaded = manifest::ResourceManifest::load(&site.join("public/ws-resources.json"))
        .unwrap()
        .unwrap();
    let meta = loaded.metadata.unwrap();
    assert_eq!(meta.description.as_deref(), Some("my work"));
    assert_eq!(meta.category.as_deref(), Some("portfolio"));
    assert_eq!(loaded.site_name.as_deref(), Some("Launch"));

    let project = ledger.get_project(outcome.project_id.unwrap()).unwrap();
    assert_eq!(project.name, "Launch");
    assert_eq!(project.image_url, "https://example.com/cover.png");
}

// ---------------------------------------------------------------------------
// Dry run
// ---------------------------------------------------------------------------

#[test]
fn dry_run_measures_but_never_calls_out() {
    let root = assert_fs::TempDir::new().unwrap();
    let site = scaffold_site(&root);
    let ledger = Ledger::open_in_memory().unwrap();
    let fake = FakeDeployer::default();
    let flags = DeployFlags {
        dry_run: true,
        ..saving()
    };

    let mut config = LocalConfig::load_in(&site).unwrap();
    let outcome = deploy_site(&request(&site, flags), &mut config, &fake, Some(&ledger)).unwrap();
    assert!(outcome.dry_run);
    assert!(outcome.object_id.is_none());
    assert_eq!(outcome.file_count, 2);
    assert_eq!(outcome.site_size, 20);
    assert!(!outcome.estimate.summary().is_empty());
    assert!(fake.calls().is_empty());
    assert!(ledger.list_projects(ProjectFilter::default()).unwrap().is_empty());
    assert_eq!(config_id(&site), sitedeck_core::PLACEHOLDER_PROJECT_ID);
    root.child("blog/public/ws-resources.json")
        .assert(predicates::path::missing());
}

// ---------------------------------------------------------------------------
// Failures
// ---------------------------------------------------------------------------

#[test]
fn deployer_error_is_returned_and_recorded_for_known_project() {
    let root = assert_fs::TempDir::new().unwrap();
    let site = scaffold_site(&root);
    let ledger = Ledger::open_in_memory().unwrap();
    let fake = FakeDeployer::answering(&["0xabc"]);
    fake.push(Err(DeployerError::Other("network unreachable".into())));

    let mut config = LocalConfig::load_in(&site).unwrap();
    let ok = deploy_site(&request(&site, saving()), &mut config, &fake, Some(&ledger)).unwrap();
    let err = deploy_site(&request(&site, saving()), &mut config, &fake, Some(&ledger)).unwrap_err();
    assert_eq!(err.to_string(), "network unreachable");

    let id = ok.project_id.unwrap();
    let history = ledger.get_project_deployments(id).unwrap();
    assert_eq!(history.len(), 2);
    assert!(!history[1].success);
    assert_eq!(history[1].error.as_deref(), Some("network unreachable"));
    assert_eq!(ledger.get_epoch_info(id).unwrap().deployment_count, 1);
    assert_eq!(config_id(&site), "0xabc");
}

#[test]
fn failed_first_deploy_leaves_draft_untouched() {
    let root = assert_fs::TempDir::new().unwrap();
    let site = scaffold_site(&root);
    let ledger = Ledger::open_in_memory().unwrap();
    let draft = ledger
        .create_draft_project("blog", "website", Network::Testnet, &site.canonicalize().unwrap())
        .unwrap();
    let fake = FakeDeployer::default();
    fake.push(Err(DeployerError::Other("network unreachable".into())));

    let mut config = LocalConfig::load_in(&site).unwrap();
    let err = deploy_site(&request(&site, saving()), &mut config, &fake, Some(&ledger)).unwrap_err();
    assert_eq!(err.to_string(), "network unreachable");

    let project = ledger.get_project(draft.id).unwrap();
    assert_eq!(project.status, ProjectStatus::Draft);
    assert_eq!(project.deploy_count, 0);
    assert!(project.object_id.is_empty());
    assert!(ledger.get_project_deployments(draft.id).unwrap().is_empty());
}

#[rstest::rstest]
#[case("team/site")]
#[case("bell\u{7}")]
fn invalid_name_rejected_before_publishing(#[case] name: &str) {
    let root = assert_fs::TempDir::new().unwrap();
    let site = scaffold_site(&root);
    let ledger = Ledger::open_in_memory().unwrap();
    let fake = FakeDeployer::answering(&["0xbill"]);
    let flags = DeployFlags {
        project_name: Some(name.into()),
        ..saving()
    };

    let mut config = LocalConfig::load_in(&site).unwrap();
    let err = deploy_site(&request(&site, flags), &mut config, &fake, Some(&ledger)).unwrap_err();
    assert!(err.to_string().contains("invalid project name"), "got: {err}");
    assert!(fake.calls().is_empty());
    assert_eq!(config_id(&site), sitedeck_core::PLACEHOLDER_PROJECT_ID);
    assert!(ledger.list_projects(ProjectFilter::default()).unwrap().is_empty());
}

#[test]
fn failure_for_untracked_site_creates_nothing() {
    let root = assert_fs::TempDir::new().unwrap();
    let site = scaffold_site(&root);
    let ledger = Ledger::open_in_memory().unwrap();
    let fake = FakeDeployer::default();

    let mut config = LocalConfig::load_in(&site).unwrap();
    let err = deploy_site(&request(&site, saving()), &mut config, &fake, Some(&ledger)).unwrap_err();
    assert!(matches!(err, DeployError::Deployer(_)));
    assert!(ledger.list_projects(ProjectFilter::default()).unwrap().is_empty());
}

#[test]
fn empty_object_id_is_escalated() {
    let root = assert_fs::TempDir::new().unwrap();
    let site = scaffold_site(&root);
    let fake = FakeDeployer::answering(&[""]);

    let mut config = LocalConfig::load_in(&site).unwrap();
    let err = deploy_site(&request(&site, DeployFlags::default()), &mut config, &fake, None).unwrap_err();
    assert!(matches!(err, DeployError::EmptyObjectId { .. }), "got: {err}");
    assert_eq!(config_id(&site), sitedeck_core::PLACEHOLDER_PROJECT_ID);
}

#[test]
fn missing_publish_dir_fails_before_any_call() {
    let root = assert_fs::TempDir::new().unwrap();
    let site = scaffold_site(&root);
    let fake = FakeDeployer::answering(&["0x1"]);
    let mut req = request(&site, DeployFlags::default());
    req.publish_dir = "dist".into();

    let mut config = LocalConfig::load_in(&site).unwrap();
    let err = deploy_site(&req, &mut config, &fake, None).unwrap_err();
    assert!(matches!(err, DeployError::PublishDirMissing { .. }));
    assert!(fake.calls().is_empty());
}

// ---------------------------------------------------------------------------
// Reconciliation
// ---------------------------------------------------------------------------

#[test]
fn side_car_write_failures_are_warnings_after_publish() {
    let root = assert_fs::TempDir::new().unwrap();
    let site = scaffold_site(&root);
    // a directory where the atomic writers put their temp files
    root.child("blog/public/ws-resources.json.tmp").create_dir_all().unwrap();
    root.child("blog/sitedeck.yaml.tmp").create_dir_all().unwrap();
    let ledger = Ledger::open_in_memory().unwrap();
    let fake = FakeDeployer::answering(&["0xabc"]);

    let mut config = LocalConfig::load_in(&site).unwrap();
    let outcome = deploy_site(&request(&site, saving()), &mut config, &fake, Some(&ledger)).unwrap();

    assert_eq!(outcome.object_id.as_deref(), Some("0xabc"));
    assert_eq!(outcome.warnings.len(), 2, "{:?}", outcome.warnings);
    assert!(outcome.warnings[0].starts_with("resource manifest not updated"));
    assert!(outcome.warnings[1].starts_with("site config not updated"));
    root.child("blog/public/ws-resources.json")
        .assert(predicates::path::missing());
    assert_eq!(config_id(&site), sitedeck_core::PLACEHOLDER_PROJECT_ID);

    let project = ledger.get_project(outcome.project_id.unwrap()).unwrap();
    assert_eq!(project.object_id, "0xabc");
    assert_eq!(project.status, ProjectStatus::Active);
}

// ---------------------------------------------------------------------------
// Removal
// ---------------------------------------------------------------------------

#[test]
fn destroy_failure_is_a_warning_and_delete_still_happens() {
    let root = assert_fs::TempDir::new().unwrap();
    let site = scaffold_site(&root);
    let ledger = Ledger::open_in_memory().unwrap();
    let fake = FakeDeployer {
        destroy_fails: true,
        ..FakeDeployer::answering(&["0xabc"])
    };

    let mut config = LocalConfig::load_in(&site).unwrap();
    let deployed = deploy_site(&request(&site, saving()), &mut config, &fake, Some(&ledger)).unwrap();
    let id = deployed.project_id.unwrap();

    let options = RemoveOptions {
        destroy_on_network: true,
        delete_site_folder: true,
    };
    let outcome = remove_project(&ledger, Some(&fake), id, options).unwrap();
    assert!(!outcome.destroyed);
    assert!(outcome.folder_removed);
    assert_eq!(outcome.deployments_removed, 1);
    assert_eq!(outcome.warnings.len(), 1);
    assert!(outcome.warnings[0].contains("0xabc"));
    assert!(fake.calls().contains(&Call::Destroy("0xabc".into())));
    assert!(ledger.get_project(id).unwrap_err().is_not_found());
    assert!(!site.exists());
}

#[test]
fn removing_draft_skips_destroy() {
    let root = assert_fs::TempDir::new().unwrap();
    let site = scaffold_site(&root);
    let ledger = Ledger::open_in_memory().unwrap();
    let draft = ledger
        .create_draft_project("blog", "website", Network::Testnet, &site)
        .unwrap();
    let fake = FakeDeployer::default();

    let options = RemoveOptions {
        destroy_on_network: true,
        delete_site_folder: false,
    };
    let outcome = remove_project(&ledger, Some(&fake), draft.id, options).unwrap();
    assert!(!outcome.destroyed);
    assert!(fake.calls().is_empty());
    assert!(site.exists());
}
