//! Rule runner: executes rules one at a time and isolates their failures.

use crate::deps::DependencySink;
use crate::error::RuleError;
use crate::logger::{LogMessage, Logger, Loggers};
use crate::models::{Package, PackageConfig, Repository};
use crate::outcome::Outcome;
use crate::rule::{PackageRule, PackageRuleArgs, RepositoryRule, RepositoryRuleArgs};
use crate::vfs::VirtualFs;
use std::any::Any;
use std::cell::Cell;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Once;

thread_local! {
    static IN_RULE: Cell<bool> = const { Cell::new(false) };
}

/// Wrap the process panic hook so panics raised inside a rule body are
/// reported through the rule logger only. Other panics keep the previous hook.
fn install_panic_hook() {
    static INSTALL: Once = Once::new();
    INSTALL.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if IN_RULE.with(Cell::get) {
                if let Some(location) = info.location() {
                    log::debug!("rule panicked at {location}");
                }
            } else {
                previous(info);
            }
        }));
    });
}

/// Shared, read-only state for every rule invocation in a pass.
pub struct RunContext<'a> {
    pub repository: &'a Repository,
    pub fs: &'a VirtualFs,
    pub loggers: &'a Loggers,
}

/// Path that leads from `from` (a repo-relative directory) to `to`.
fn relative_between(to: &Path, from: &Path) -> PathBuf {
    match pathdiff::diff_paths(to, from) {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => PathBuf::from("."),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "rule panicked".to_string()
    }
}

/// Invoke one rule body, converting errors and panics into a failure.
fn guarded<F>(logger: &Logger, body: F) -> Outcome
where
    F: FnOnce() -> Result<Outcome, RuleError>,
{
    logger.debug("Running rule...");
    install_panic_hook();
    let outer = IN_RULE.with(|flag| flag.replace(true));
    let result = panic::catch_unwind(AssertUnwindSafe(body));
    IN_RULE.with(|flag| flag.set(outer));
    let outcome = match result {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(e)) => {
            logger.error(LogMessage::new("Encountered error when running rule").with_error(&e));
            Outcome::failure()
        }
        Err(payload) => {
            logger.error(
                LogMessage::new("Encountered error when running rule")
                    .with_cause(panic_message(payload.as_ref())),
            );
            Outcome::failure()
        }
    };
    logger.debug("Done running rule.");
    outcome
}

/// Run `rules` against one package in order; every rule runs even when an
/// earlier one fails.
pub fn run_package_rules(
    ctx: &RunContext<'_>,
    package: &Package,
    config: &PackageConfig,
    rules: &[&dyn PackageRule],
    dependencies: &DependencySink,
) -> Outcome {
    let package_dir = Path::new(&package.relative_path);
    let to_root = relative_between(Path::new(""), package_dir);
    let to_shared = relative_between(
        Path::new(&ctx.repository.settings.shared_configs),
        package_dir,
    );
    let view = ctx.fs.scoped(package_dir);

    let mut outcome = Outcome::success();
    for rule in rules {
        let logger = ctx.loggers.for_rule(rule.id(), Some(package));
        let args = PackageRuleArgs {
            package,
            config,
            all_packages: &ctx.repository.packages,
            relative_path_to_root: &to_root,
            relative_path_to_shared_configs: &to_shared,
            repository: &ctx.repository.settings.repository,
            fs: &view,
            logger: &logger,
            dependencies,
            options: config.rule_options(rule.id()),
        };
        outcome &= guarded(&logger, || rule.run(&args));
    }
    outcome
}

/// Run one repository rule with the same isolation as package rules.
pub fn run_repository_rule(ctx: &RunContext<'_>, rule: &dyn RepositoryRule) -> Outcome {
    let logger = ctx.loggers.for_rule(rule.id(), None);
    let args = RepositoryRuleArgs::new(
        &ctx.repository.packages,
        ctx.fs,
        &logger,
        ctx.loggers,
        rule.id(),
    );
    guarded(&logger, || rule.run(&args))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::{LogLevel, MemorySink};
    use crate::models::{PackageKind, RootSettings};
    use std::sync::{Arc, Mutex};
    use tempfile::tempdir;

    struct Recorder {
        seen: Arc<Mutex<Vec<String>>>,
    }

    impl PackageRule for Recorder {
        fn id(&self) -> &'static str {
            "recorder"
        }

        fn targets(&self) -> &'static [PackageKind] {
            PackageKind::ALL
        }

        fn run(&self, args: &PackageRuleArgs<'_>) -> Result<Outcome, RuleError> {
            self.seen.lock().unwrap().push(format!(
                "{}|{}|{}",
                args.relative_path_to_root.display(),
                args.relative_path_to_shared_configs.display(),
                args.repository
            ));
            args.fs.write("out.txt", "written").map_err(|source| RuleError::Io {
                path: "out.txt".into(),
                source,
            })?;
            Ok(Outcome::success())
        }
    }

    struct Throws;

    impl PackageRule for Throws {
        fn id(&self) -> &'static str {
            "throws"
        }

        fn targets(&self) -> &'static [PackageKind] {
            PackageKind::ALL
        }

        fn run(&self, _args: &PackageRuleArgs<'_>) -> Result<Outcome, RuleError> {
            Err(RuleError::Message("bad input".into()))
        }
    }

    struct Panics;

    impl PackageRule for Panics {
        fn id(&self) -> &'static str {
            "panics"
        }

        fn targets(&self) -> &'static [PackageKind] {
            PackageKind::ALL
        }

        fn run(&self, _args: &PackageRuleArgs<'_>) -> Result<Outcome, RuleError> {
            panic!("index out of range");
        }
    }

    fn fixture(root: &Path) -> Repository {
        Repository {
            root: root.to_path_buf(),
            settings: RootSettings {
                shared_configs: "shared".into(),
                repository: "github:acme/mono".into(),
            },
            packages: vec![Package {
                name: Some("@acme/a".into()),
                relative_path: "packages/a".into(),
                config: Some(serde_json::from_str(r#"{"type":"library"}"#).unwrap()),
            }],
        }
    }

    #[test]
    fn test_paths_and_view_are_package_relative() {
        let dir = tempdir().unwrap();
        let repo = fixture(dir.path());
        let fs = VirtualFs::new(dir.path());
        let loggers = Loggers::new(Arc::new(MemorySink::new()));
        let ctx = RunContext {
            repository: &repo,
            fs: &fs,
            loggers: &loggers,
        };
        let seen = Arc::new(Mutex::new(Vec::new()));
        let rule = Recorder { seen: seen.clone() };
        let package = &repo.packages[0];
        let config = package.config.as_ref().unwrap();
        let rules: [&dyn PackageRule; 1] = [&rule];
        let out = run_package_rules(&ctx, package, config, &rules, &DependencySink::new());
        assert!(out.is_success());
        assert_eq!(seen.lock().unwrap()[0], "../..|../../shared|github:acme/mono");
        assert_eq!(fs.read("packages/a/out.txt").unwrap().as_deref(), Some("written"));
    }

    #[test]
    fn test_throwing_and_panicking_rules_do_not_stop_later_rules() {
        let dir = tempdir().unwrap();
        let repo = fixture(dir.path());
        let fs = VirtualFs::new(dir.path());
        let sink = Arc::new(MemorySink::new());
        let loggers = Loggers::new(sink.clone());
        let ctx = RunContext {
            repository: &repo,
            fs: &fs,
            loggers: &loggers,
        };
        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorder = Recorder { seen: seen.clone() };
        let package = &repo.packages[0];
        let config = package.config.as_ref().unwrap();
        let rules: [&dyn PackageRule; 3] = [&Throws, &Panics, &recorder];
        let out = run_package_rules(&ctx, package, config, &rules, &DependencySink::new());

        assert!(!out.is_success());
        assert_eq!(seen.lock().unwrap().len(), 1);
        let errors = sink.at(LogLevel::Error);
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].rule.as_deref(), Some("throws"));
        assert_eq!(errors[0].message.error.as_deref(), Some("bad input"));
        assert_eq!(errors[1].message.error.as_deref(), Some("index out of range"));
        let done = sink
            .at(LogLevel::Debug)
            .into_iter()
            .filter(|r| r.message.message == "Done running rule.")
            .count();
        assert_eq!(done, 3);
    }

    #[test]
    fn test_repository_rule_gets_package_loggers() {
        struct Repo;
        impl RepositoryRule for Repo {
            fn id(&self) -> &'static str {
                "repo"
            }
            fn run(&self, args: &RepositoryRuleArgs<'_>) -> Result<Outcome, RuleError> {
                for p in args.packages {
                    args.package_logger(p).warn("attributed");
                }
                Ok(Outcome::failure())
            }
        }

        let dir = tempdir().unwrap();
        let repo = fixture(dir.path());
        let fs = VirtualFs::new(dir.path());
        let sink = Arc::new(MemorySink::new());
        let loggers = Loggers::new(sink.clone());
        let ctx = RunContext {
            repository: &repo,
            fs: &fs,
            loggers: &loggers,
        };
        let out = run_repository_rule(&ctx, &Repo);
        assert!(!out.is_success());
        let warn = &sink.at(LogLevel::Warn)[0];
        assert_eq!(warn.package.as_deref(), Some("@acme/a"));
        assert_eq!(warn.rule.as_deref(), Some("repo"));
    }

    #[test]
    fn test_rule_panics_are_flagged_only_while_the_rule_runs() {
        let sink = Arc::new(MemorySink::new());
        let logger = Loggers::new(sink.clone()).root();
        let out = guarded(&logger, || {
            assert!(IN_RULE.with(Cell::get));
            panic!("boom")
        });
        assert!(!out.is_success());
        assert!(!IN_RULE.with(Cell::get));
        let errors = sink.at(LogLevel::Error);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message.error.as_deref(), Some("boom"));
        assert!(guarded(&logger, || Ok(Outcome::success())).is_success());
    }
}
