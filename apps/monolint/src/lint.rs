//! Pass orchestration.
//!
//! A pass walks a fixed sequence of stages and never re-enters one:
//! `init -> lint-packages -> lint-repository -> flush -> reconcile-dependencies -> done`.
//! Only `init` (reading repository metadata) can abort; every later stage
//! folds its failures into the returned [`Outcome`].

use crate::deps::{self, DependencySink, Installer, PendingDependencies};
use crate::error::RepositoryError;
use crate::format::Formatter;
use crate::logger::Loggers;
use crate::models::Repository;
use crate::outcome::Outcome;
use crate::repository::RepositoryReader;
use crate::rule::{applicable_rules, Rule};
use crate::runner::{run_package_rules, run_repository_rule, RunContext};
use crate::vfs::VirtualFs;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Whether discrepancies are written (fix) or only reported (check).
pub enum Mode {
    Check,
    Fix,
}

impl Mode {
    pub const fn from_fix(fix: bool) -> Self {
        if fix {
            Mode::Fix
        } else {
            Mode::Check
        }
    }

    pub const fn is_fix(self) -> bool {
        matches!(self, Mode::Fix)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
/// Stages of a pass, in execution order.
pub enum Stage {
    Init,
    LintPackages,
    LintRepository,
    Flush,
    ReconcileDependencies,
    Done,
}

impl Stage {
    pub const fn as_str(self) -> &'static str {
        match self {
            Stage::Init => "init",
            Stage::LintPackages => "lint-packages",
            Stage::LintRepository => "lint-repository",
            Stage::Flush => "flush",
            Stage::ReconcileDependencies => "reconcile-dependencies",
            Stage::Done => "done",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn enter(stage: Stage) {
    log::debug!("lint: entering stage {stage}");
}

/// Rules and collaborators for running passes.
pub struct Linter<'a> {
    rules: &'a [Rule],
    formatter: &'a dyn Formatter,
    installer: &'a dyn Installer,
    loggers: &'a Loggers,
}

impl<'a> Linter<'a> {
    pub fn new(
        rules: &'a [Rule],
        formatter: &'a dyn Formatter,
        installer: &'a dyn Installer,
        loggers: &'a Loggers,
    ) -> Self {
        Self {
            rules,
            formatter,
            installer,
            loggers,
        }
    }

    /// Run one pass over an already loaded repository.
    pub fn lint(&self, repository: &Repository, mode: Mode) -> Outcome {
        let fs = VirtualFs::new(&repository.root);
        let mut outcome = Outcome::success();
        let ctx = RunContext {
            repository,
            fs: &fs,
            loggers: self.loggers,
        };

        enter(Stage::LintPackages);
        let pending = self.lint_packages(repository, &ctx, &mut outcome);

        enter(Stage::LintRepository);
        for rule in self.rules.iter().filter_map(Rule::as_repository) {
            outcome &= run_repository_rule(&ctx, rule);
        }

        enter(Stage::Flush);
        outcome &= fs.flush(!mode.is_fix(), self.formatter, &self.loggers.root());

        enter(Stage::ReconcileDependencies);
        outcome &= deps::fulfill(
            repository,
            &pending,
            mode.is_fix(),
            self.installer,
            self.loggers,
        );

        enter(Stage::Done);
        outcome
    }

    fn lint_packages<'r>(
        &self,
        repository: &'r Repository,
        ctx: &RunContext<'_>,
        outcome: &mut Outcome,
    ) -> Vec<PendingDependencies<'r>> {
        let mut pending = Vec::new();
        for (package, config) in repository.lintable_packages() {
            let logger = self.loggers.for_package(package);
            logger.debug("Linting...");
            let rules = applicable_rules(self.rules, config.kind());
            let sink = DependencySink::new();
            *outcome &= run_package_rules(ctx, package, config, &rules, &sink);
            if !sink.is_empty() {
                pending.push(PendingDependencies {
                    package,
                    requested: sink.into_requests(),
                });
            }
            logger.debug("Done linting.");
        }
        pending
    }
}

/// Read the repository (fatal on failure), then run one pass.
pub fn lint_repository(
    reader: &dyn RepositoryReader,
    linter: &Linter<'_>,
    mode: Mode,
) -> Result<Outcome, RepositoryError> {
    enter(Stage::Init);
    let repository = reader.read()?;
    log::debug!(
        "lint: {} package(s) under {}",
        repository.packages.len(),
        repository.root.display()
    );
    Ok(linter.lint(&repository, mode))
}
