//! Rule protocol.
//!
//! A rule is a stateless value with an id and a run function. Package rules
//! run once per lintable package whose kind they target; repository rules
//! run once per pass. Both receive an immutable argument bundle holding the
//! only capabilities they may use: an overlay view, a scoped logger, the
//! package list and (for package rules) a dependency-request sink.
//!
//! Returning `Err(RuleError)` or panicking counts as the rule throwing; the
//! runner turns it into a logged failure for that rule alone.

use crate::deps::DependencySink;
use crate::error::RuleError;
use crate::logger::{Logger, Loggers};
use crate::models::{Package, PackageConfig, PackageKind};
use crate::outcome::Outcome;
use crate::vfs::{FsView, VirtualFs};
use serde::de::DeserializeOwned;
use serde_json::Value as Json;
use std::path::Path;

/// Everything a package rule may touch while it runs.
pub struct PackageRuleArgs<'a> {
    pub package: &'a Package,
    pub config: &'a PackageConfig,
    /// Every package in the repository, lintable or not.
    pub all_packages: &'a [Package],
    /// `../..`-style path from the package directory to the repository root.
    pub relative_path_to_root: &'a Path,
    /// Path from the package directory to the shared config directory.
    pub relative_path_to_shared_configs: &'a Path,
    /// Version-control identifier, e.g. `github:owner/repo`.
    pub repository: &'a str,
    /// Overlay view rooted at the package directory.
    pub fs: &'a FsView<'a>,
    pub logger: &'a Logger,
    pub dependencies: &'a DependencySink,
    /// Options configured for this rule in the package config.
    pub options: Option<&'a Json>,
}

impl PackageRuleArgs<'_> {
    /// Deserialize this rule's options, defaulting when none are configured.
    pub fn options_as<T>(&self, rule_id: &str) -> Result<T, RuleError>
    where
        T: DeserializeOwned + Default,
    {
        match self.options {
            Some(raw) => T::deserialize(raw).map_err(|source| RuleError::Options {
                rule: rule_id.to_string(),
                source,
            }),
            None => Ok(T::default()),
        }
    }
}

/// Everything a repository rule may touch while it runs.
pub struct RepositoryRuleArgs<'a> {
    pub packages: &'a [Package],
    pub fs: &'a VirtualFs,
    pub logger: &'a Logger,
    loggers: &'a Loggers,
    rule_id: &'a str,
}

impl<'a> RepositoryRuleArgs<'a> {
    pub fn new(
        packages: &'a [Package],
        fs: &'a VirtualFs,
        logger: &'a Logger,
        loggers: &'a Loggers,
        rule_id: &'a str,
    ) -> Self {
        Self {
            packages,
            fs,
            logger,
            loggers,
            rule_id,
        }
    }

    /// Logger attributing this rule's messages to `package`.
    pub fn package_logger(&self, package: &Package) -> Logger {
        self.loggers.for_rule(self.rule_id, Some(package))
    }
}

/// A rule run once for every package of a targeted kind.
pub trait PackageRule: Send + Sync {
    fn id(&self) -> &'static str;

    /// Package kinds this rule applies to.
    fn targets(&self) -> &'static [PackageKind];

    fn applies_to(&self, kind: PackageKind) -> bool {
        self.targets().contains(&kind)
    }

    fn run(&self, args: &PackageRuleArgs<'_>) -> Result<Outcome, RuleError>;
}

/// A rule run once per pass over the whole repository.
pub trait RepositoryRule: Send + Sync {
    fn id(&self) -> &'static str;

    fn run(&self, args: &RepositoryRuleArgs<'_>) -> Result<Outcome, RuleError>;
}

/// A registered rule of either scope.
pub enum Rule {
    Package(Box<dyn PackageRule>),
    Repository(Box<dyn RepositoryRule>),
}

impl Rule {
    pub fn package(rule: impl PackageRule + 'static) -> Self {
        Rule::Package(Box::new(rule))
    }

    pub fn repository(rule: impl RepositoryRule + 'static) -> Self {
        Rule::Repository(Box::new(rule))
    }

    pub fn id(&self) -> &'static str {
        match self {
            Rule::Package(r) => r.id(),
            Rule::Repository(r) => r.id(),
        }
    }

    pub fn as_package(&self) -> Option<&dyn PackageRule> {
        match self {
            Rule::Package(r) => Some(r.as_ref()),
            Rule::Repository(_) => None,
        }
    }

    pub fn as_repository(&self) -> Option<&dyn RepositoryRule> {
        match self {
            Rule::Repository(r) => Some(r.as_ref()),
            Rule::Package(_) => None,
        }
    }
}

/// Package rules in `rules` that apply to `kind`, in registration order.
pub fn applicable_rules(rules: &[Rule], kind: PackageKind) -> Vec<&dyn PackageRule> {
    rules
        .iter()
        .filter_map(Rule::as_package)
        .filter(|r| r.applies_to(kind))
        .collect()
}
