//! `dependency-versions`: align every dependency on the greatest version
//! used anywhere in the repository.
//!
//! Packages may opt single dependencies out with
//! `rules: { dependency-versions: { exclude: [name, ...] } }`. Excluded
//! references still count towards the repository maximum but are not
//! rewritten in that package. References that are not semver ranges
//! (`workspace:*`, tags, URLs) are left as they are.

use super::read_manifest;
use crate::error::RuleError;
use crate::logger::LogMessage;
use crate::models::{DependencyKind, Manifest, Package, MANIFEST_FILENAME};
use crate::outcome::Outcome;
use crate::rule::{RepositoryRule, RepositoryRuleArgs};
use crate::versions::{min_version, LatestVersions};
use serde::Deserialize;
use std::collections::BTreeSet;

const ID: &str = "dependency-versions";

#[derive(Debug, Default, Deserialize)]
struct Options {
    #[serde(default)]
    exclude: BTreeSet<String>,
}

fn options_for(package: &Package) -> Result<Options, RuleError> {
    match &package.config {
        Some(config) => config
            .rule_options_as(ID)
            .map_err(|source| RuleError::Options {
                rule: ID.to_string(),
                source,
            }),
        None => Ok(Options::default()),
    }
}

/// `manifest` with every non-excluded semver reference set to its maximum.
fn upgrade(manifest: &Manifest, latest: &LatestVersions, exclude: &BTreeSet<String>) -> Manifest {
    let mut builder = manifest.to_builder();
    for kind in DependencyKind::ALL {
        let Some(entries) = manifest.dependencies(kind) else {
            continue;
        };
        let upgraded = entries.into_iter().map(|(name, version)| {
            if exclude.contains(&name) || min_version(&version).is_none() {
                return (name, version);
            }
            let target = latest.get(&name).map(str::to_string).unwrap_or(version);
            (name, target)
        });
        builder = builder.dependencies(kind, upgraded);
    }
    builder.build()
}

pub struct DependencyVersionsRule;

impl RepositoryRule for DependencyVersionsRule {
    fn id(&self) -> &'static str {
        ID
    }

    fn run(&self, args: &RepositoryRuleArgs<'_>) -> Result<Outcome, RuleError> {
        let mut outcome = Outcome::success();
        let mut latest = LatestVersions::new();
        let mut manifests: Vec<(&Package, Manifest, BTreeSet<String>)> = Vec::new();

        for package in args.packages {
            let logger = args.package_logger(package);
            let fs = args.fs.scoped(&package.relative_path);
            let manifest = match read_manifest(&fs) {
                Ok(m) => m,
                Err(e) => {
                    logger.error(LogMessage::new("Could not read package.json").with_error(&e));
                    outcome.fail();
                    continue;
                }
            };
            let exclude = match options_for(package) {
                Ok(options) => options.exclude,
                Err(e) => {
                    logger.error(LogMessage::new("Invalid rule options").with_error(&e));
                    outcome.fail();
                    BTreeSet::new()
                }
            };
            for (name, version) in manifest.all_dependencies() {
                latest.record(&name, &version);
            }
            manifests.push((package, manifest, exclude));
        }
        log::debug!("{ID}: {} dependency name(s) with a semver range", latest.len());

        for (package, manifest, exclude) in manifests {
            let upgraded = upgrade(&manifest, &latest, &exclude);
            if upgraded == manifest {
                continue;
            }
            let logger = args.package_logger(package);
            logger.debug("Aligning dependency versions");
            if let Err(e) = args
                .fs
                .scoped(&package.relative_path)
                .write(MANIFEST_FILENAME, upgraded.to_json_string())
            {
                logger.error(LogMessage::new("Failed to write package.json").with_error(&e));
                outcome.fail();
            }
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::{LogLevel, Loggers, MemorySink};
    use crate::models::{Repository, RootSettings};
    use crate::runner::{run_repository_rule, RunContext};
    use crate::vfs::VirtualFs;
    use std::fs;
    use std::path::Path;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn package(root: &Path, path: &str, config: Option<&str>, manifest: Option<&str>) -> Package {
        let dir = root.join(path);
        fs::create_dir_all(&dir).unwrap();
        if let Some(m) = manifest {
            fs::write(dir.join(MANIFEST_FILENAME), m).unwrap();
        }
        Package {
            name: Some(path.to_string()),
            relative_path: path.to_string(),
            config: config.map(|c| serde_json::from_str(c).unwrap()),
        }
    }

    fn run(root: &Path, packages: Vec<Package>) -> (Outcome, VirtualFs, Arc<MemorySink>) {
        let repository = Repository {
            root: root.to_path_buf(),
            settings: RootSettings::default(),
            packages,
        };
        let vfs = VirtualFs::new(root);
        let sink = Arc::new(MemorySink::new());
        let loggers = Loggers::new(sink.clone());
        let outcome = {
            let ctx = RunContext {
                repository: &repository,
                fs: &vfs,
                loggers: &loggers,
            };
            run_repository_rule(&ctx, &DependencyVersionsRule)
        };
        (outcome, vfs, sink)
    }

    fn version_in(vfs: &VirtualFs, path: &str, dep: &str) -> Option<String> {
        let text = vfs.read(format!("{path}/package.json")).unwrap().unwrap();
        Manifest::parse(&text).unwrap().dependency_version(dep)
    }

    #[test]
    fn test_unifies_to_greatest_range() {
        let dir = tempdir().unwrap();
        let packages = vec![
            package(
                dir.path(),
                "a",
                None,
                Some(r#"{"name":"a","dependencies":{"semver":"^1.0.0"}}"#),
            ),
            package(
                dir.path(),
                "b",
                None,
                Some(r#"{"name":"b","devDependencies":{"semver":"^2.0.0"}}"#),
            ),
        ];
        let (outcome, vfs, _) = run(dir.path(), packages);
        assert!(outcome.is_success());
        assert_eq!(version_in(&vfs, "a", "semver").as_deref(), Some("^2.0.0"));
        assert_eq!(version_in(&vfs, "b", "semver").as_deref(), Some("^2.0.0"));
        let touched: Vec<_> = vfs.touched_files().map(|f| f.relative_path).collect();
        assert_eq!(touched, vec![Path::new("a/package.json").to_path_buf()]);
    }

    #[test]
    fn test_excluded_package_keeps_its_version() {
        let dir = tempdir().unwrap();
        let packages = vec![
            package(
                dir.path(),
                "a",
                Some(r#"{"type":"library","rules":{"dependency-versions":{"exclude":["semver"]}}}"#),
                Some(r#"{"name":"a","dependencies":{"semver":"^1.0.0","zod":"^3.0.0"}}"#),
            ),
            package(
                dir.path(),
                "b",
                None,
                Some(r#"{"name":"b","dependencies":{"semver":"^2.0.0","zod":"^3.2.0"}}"#),
            ),
        ];
        let (outcome, vfs, _) = run(dir.path(), packages);
        assert!(outcome.is_success());
        assert_eq!(version_in(&vfs, "a", "semver").as_deref(), Some("^1.0.0"));
        assert_eq!(version_in(&vfs, "a", "zod").as_deref(), Some("^3.2.0"));
    }

    #[test]
    fn test_excluded_range_still_raises_maximum() {
        let dir = tempdir().unwrap();
        let packages = vec![
            package(
                dir.path(),
                "a",
                Some(r#"{"type":"custom","rules":{"dependency-versions":{"exclude":["react"]}}}"#),
                Some(r#"{"name":"a","dependencies":{"react":"^19.0.0"}}"#),
            ),
            package(
                dir.path(),
                "b",
                None,
                Some(r#"{"name":"b","dependencies":{"react":"^18.0.0"}}"#),
            ),
        ];
        let (outcome, vfs, _) = run(dir.path(), packages);
        assert!(outcome.is_success());
        assert_eq!(version_in(&vfs, "a", "react").as_deref(), Some("^19.0.0"));
        assert_eq!(version_in(&vfs, "b", "react").as_deref(), Some("^19.0.0"));
        let touched: Vec<_> = vfs.touched_files().map(|f| f.relative_path).collect();
        assert_eq!(touched, vec![Path::new("b/package.json").to_path_buf()]);
    }

    #[test]
    fn test_unparsable_ranges_are_left_untouched() {
        let dir = tempdir().unwrap();
        let packages = vec![
            package(
                dir.path(),
                "a",
                None,
                Some(r#"{"name":"a","dependencies":{"core":"workspace:*","lodash":"latest"}}"#),
            ),
            package(
                dir.path(),
                "b",
                None,
                Some(r#"{"name":"b","dependencies":{"core":"^1.0.0","lodash":"^4.17.0"}}"#),
            ),
        ];
        let (outcome, vfs, _) = run(dir.path(), packages);
        assert!(outcome.is_success());
        assert_eq!(version_in(&vfs, "a", "core").as_deref(), Some("workspace:*"));
        assert_eq!(version_in(&vfs, "a", "lodash").as_deref(), Some("latest"));
        assert_eq!(version_in(&vfs, "b", "lodash").as_deref(), Some("^4.17.0"));
    }

    #[test]
    fn test_missing_manifest_fails_but_others_are_aligned() {
        let dir = tempdir().unwrap();
        let packages = vec![
            package(dir.path(), "ghost", None, None),
            package(
                dir.path(),
                "a",
                None,
                Some(r#"{"name":"a","dependencies":{"x":"~1.0.0"}}"#),
            ),
            package(
                dir.path(),
                "b",
                None,
                Some(r#"{"name":"b","dependencies":{"x":"1.1.0"}}"#),
            ),
        ];
        let (outcome, vfs, sink) = run(dir.path(), packages);
        assert!(!outcome.is_success());
        assert!(sink.contains(LogLevel::Error, "Could not read package.json"));
        assert_eq!(sink.at(LogLevel::Error)[0].package.as_deref(), Some("ghost"));
        assert_eq!(version_in(&vfs, "a", "x").as_deref(), Some("1.1.0"));
    }
}
