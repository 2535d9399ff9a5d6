//! Shared data models: packages, repository metadata, configs and manifests.

pub mod config;
pub mod manifest;

pub use config::{PackageConfig, PackageKind};
pub use manifest::{DependencyKind, Manifest, ManifestBuilder, MANIFEST_FILENAME};

use serde::Serialize;
use serde_json::Value as Json;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize)]
/// One package of the repository.
///
/// Packages without a config are not lintable, but rules still see them
/// (for example as targets of workspace dependencies).
pub struct Package {
    pub name: Option<String>,
    /// Directory relative to the repository root, `/`-separated.
    #[serde(rename = "path")]
    pub relative_path: String,
    #[serde(skip)]
    pub config: Option<PackageConfig>,
}

impl Package {
    pub fn is_lintable(&self) -> bool {
        self.config.is_some()
    }

    pub fn kind(&self) -> Option<PackageKind> {
        self.config.as_ref().map(PackageConfig::kind)
    }

    /// Name when known, otherwise the relative path.
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.relative_path)
    }

    /// Raw options configured for `rule_id`, if any.
    pub fn rule_options(&self, rule_id: &str) -> Option<&Json> {
        self.config.as_ref()?.rule_options(rule_id)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
/// Root-level settings shared by every package.
pub struct RootSettings {
    /// Shared configuration directory, relative to the root.
    #[serde(rename = "sharedConfigs")]
    pub shared_configs: String,
    /// Version-control identifier, e.g. `github:owner/repo`.
    pub repository: String,
}

#[derive(Debug, Clone)]
/// Static description of a repository for the duration of a pass.
pub struct Repository {
    pub root: PathBuf,
    pub settings: RootSettings,
    pub packages: Vec<Package>,
}

impl Repository {
    pub fn lintable_packages(&self) -> impl Iterator<Item = (&Package, &PackageConfig)> {
        self.packages
            .iter()
            .filter_map(|p| p.config.as_ref().map(|c| (p, c)))
    }

    pub fn find_by_name(&self, name: &str) -> Option<&Package> {
        find_by_name(&self.packages, name)
    }
}

/// Look up a package by its manifest name.
pub fn find_by_name<'a>(packages: &'a [Package], name: &str) -> Option<&'a Package> {
    packages.iter().find(|p| p.name.as_deref() == Some(name))
}
