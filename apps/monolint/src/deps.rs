//! Dependency requests emitted by rules and their fulfillment.
//!
//! Rules call [`DependencySink::request`] while a package is linted. After the
//! flush stage, [`fulfill`] compares each package's requests with its manifest
//! on disk and either reports what is missing (check mode) or hands the
//! missing specs to an [`Installer`] (fix mode). Two distinct explicit
//! versions for one dependency are a conflict and are never installed.

use crate::error::InstallError;
use crate::logger::{LogMessage, Loggers};
use crate::models::{Manifest, Package, Repository, MANIFEST_FILENAME};
use crate::outcome::Outcome;
use rayon::prelude::*;
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Dependency name -> explicitly requested versions (empty = any version).
pub type PackageRequests = BTreeMap<String, BTreeSet<String>>;

#[derive(Debug, Default)]
/// Per-package request table handed to rules.
pub struct DependencySink {
    requests: RefCell<PackageRequests>,
}

impl DependencySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask for `name` to be present, optionally at `version`.
    pub fn request(&self, name: &str, version: Option<&str>) {
        let mut requests = self.requests.borrow_mut();
        let versions = requests.entry(name.to_string()).or_default();
        if let Some(v) = version.map(str::trim).filter(|v| !v.is_empty()) {
            versions.insert(v.to_string());
        }
    }

    pub fn is_empty(&self) -> bool {
        self.requests.borrow().is_empty()
    }

    pub fn into_requests(self) -> PackageRequests {
        self.requests.into_inner()
    }
}

#[derive(Debug, Clone)]
/// Requests collected for one package during a pass.
pub struct PendingDependencies<'a> {
    pub package: &'a Package,
    pub requested: PackageRequests,
}

/// Installs dependencies into one package.
pub trait Installer: Sync {
    fn install(&self, package_name: &str, specs: &[String]) -> Result<(), InstallError>;

    /// Whether installs into different packages may run at the same time.
    fn supports_parallel(&self) -> bool {
        false
    }
}

/// Runs `yarn workspace <name> add --prefer-dev <specs...>` at the root.
///
/// Workspaces share one `yarn.lock`, so installs run one at a time.
pub struct YarnInstaller {
    root: PathBuf,
}

impl YarnInstaller {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl Installer for YarnInstaller {
    fn install(&self, package_name: &str, specs: &[String]) -> Result<(), InstallError> {
        log::debug!(
            "installer: yarn workspace {package_name} add --prefer-dev {}",
            specs.join(" ")
        );
        let output = Command::new("yarn")
            .args(["workspace", package_name, "add", "--prefer-dev"])
            .args(specs)
            .current_dir(&self.root)
            .output()
            .map_err(|source| InstallError::Spawn {
                program: "yarn".to_string(),
                source,
            })?;
        if output.status.success() {
            return Ok(());
        }
        let mut text = String::from_utf8_lossy(&output.stdout).to_string();
        text.push_str(&String::from_utf8_lossy(&output.stderr));
        Err(InstallError::Failed {
            status: output.status.to_string(),
            output: text.trim().to_string(),
        })
    }
}

fn read_manifest(root: &Path, package: &Package) -> Result<Option<Manifest>, String> {
    let path = root.join(&package.relative_path).join(MANIFEST_FILENAME);
    match fs::read_to_string(&path) {
        Ok(text) => Manifest::parse(&text)
            .map(Some)
            .map_err(|e| format!("{}: {e}", path.display())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(format!("{}: {e}", path.display())),
    }
}

/// First version of every dependency declared anywhere in the repository.
fn installed_versions(repository: &Repository) -> BTreeMap<String, String> {
    let mut versions = BTreeMap::new();
    for package in &repository.packages {
        let Ok(Some(manifest)) = read_manifest(&repository.root, package) else {
            continue;
        };
        for (name, version) in manifest.all_dependencies() {
            versions.entry(name).or_insert(version);
        }
    }
    versions
}

struct InstallJob<'a> {
    package: &'a Package,
    name: String,
    specs: Vec<String>,
}

/// Reconcile every package's requests against its manifest.
pub fn fulfill(
    repository: &Repository,
    pending: &[PendingDependencies<'_>],
    fix: bool,
    installer: &dyn Installer,
    loggers: &Loggers,
) -> Outcome {
    let mut outcome = Outcome::success();
    if pending.is_empty() {
        return outcome;
    }
    let repo_versions = installed_versions(repository);
    let mut jobs: Vec<InstallJob<'_>> = Vec::new();

    for entry in pending {
        let logger = loggers.for_package(entry.package);
        let manifest = match read_manifest(&repository.root, entry.package) {
            Ok(m) => m.unwrap_or_default(),
            Err(reason) => {
                logger.error(LogMessage::new("Failed to read package.json").with_cause(reason));
                outcome.fail();
                continue;
            }
        };

        let mut specs = Vec::new();
        for (dependency, versions) in &entry.requested {
            if versions.len() > 1 {
                logger.error(
                    LogMessage::new(format!("Conflicting versions requested for {dependency}"))
                        .with_content(versions.iter().cloned()),
                );
                outcome.fail();
                continue;
            }
            let existing = manifest.dependency_version(dependency);
            match versions.iter().next() {
                Some(wanted) if existing.as_deref() == Some(wanted.as_str()) => {}
                Some(wanted) => specs.push(format!("{dependency}@{wanted}")),
                None if existing.is_some() => {}
                None => match repo_versions.get(dependency) {
                    Some(v) => specs.push(format!("{dependency}@{v}")),
                    None => specs.push(dependency.clone()),
                },
            }
        }
        if specs.is_empty() {
            continue;
        }

        if !fix {
            logger.error(LogMessage::new("Some dependencies are missing").with_content(specs));
            outcome.fail();
            continue;
        }
        let Some(name) = entry
            .package
            .name
            .clone()
            .or_else(|| manifest.name().map(str::to_string))
        else {
            logger.error(
                LogMessage::new("Cannot install dependencies into a package without a name")
                    .with_content(specs),
            );
            outcome.fail();
            continue;
        };
        logger.debug(LogMessage::new("Installing dependencies").with_content(specs.iter().cloned()));
        jobs.push(InstallJob {
            package: entry.package,
            name,
            specs,
        });
    }

    let install = |job: &InstallJob<'_>| installer.install(&job.name, &job.specs);
    // collect keeps the job order for logging
    let results: Vec<Result<(), InstallError>> = if installer.supports_parallel() {
        jobs.par_iter().map(install).collect()
    } else {
        jobs.iter().map(install).collect()
    };

    for (job, result) in jobs.iter().zip(results) {
        let logger = loggers.for_package(job.package);
        match result {
            Ok(()) => logger.info(
                LogMessage::new("Installed missing dependencies").with_content(job.specs.iter().cloned()),
            ),
            Err(e) => {
                let mut message =
                    LogMessage::new("Failed to install dependencies").with_content(job.specs.iter().cloned());
                message = match e.output() {
                    Some(output) => message.with_cause(output.to_string()),
                    None => message.with_error(&e),
                };
                logger.error(message);
                outcome.fail();
            }
        }
    }
    outcome
}
