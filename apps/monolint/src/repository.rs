//! Repository discovery: root settings, package list and package configs.
//!
//! [`RepositoryReader`] is the seam the lint pass reads through; the
//! filesystem implementation globs package directories from the root config
//! and asks git for the repository identifier when it is not configured.

use crate::config::{load_package_config, Effective, RootConfig};
use crate::error::RepositoryError;
use crate::models::{Manifest, Package, Repository, RootSettings, MANIFEST_FILENAME};
use regex::Regex;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Produces the static description of a repository for one pass.
pub trait RepositoryReader {
    fn read(&self) -> Result<Repository, RepositoryError>;
}

pub struct FsRepositoryReader {
    root: PathBuf,
    config: RootConfig,
}

impl FsRepositoryReader {
    pub fn new(root: impl Into<PathBuf>, config: RootConfig) -> Self {
        Self {
            root: root.into(),
            config,
        }
    }

    /// Reader for resolved settings; fails when no root config was found.
    pub fn from_effective(effective: &Effective) -> Result<Self, RepositoryError> {
        if !effective.configured {
            return Err(RepositoryError::RootConfigNotFound {
                start: effective.repo_root.clone(),
            });
        }
        Ok(Self::new(&effective.repo_root, effective.root.clone()))
    }

    fn package_dirs(&self) -> Result<Vec<PathBuf>, RepositoryError> {
        let mut seen = HashSet::new();
        let mut dirs = Vec::new();
        for pattern in self.config.package_globs() {
            let full = self.root.join(&pattern);
            let entries = glob::glob(&full.to_string_lossy())
                .map_err(|source| RepositoryError::Pattern { pattern, source })?;
            for entry in entries {
                let dir = match entry {
                    Ok(p) => p,
                    Err(e) => {
                        log::warn!("skipping unreadable path: {e}");
                        continue;
                    }
                };
                if dir.join(MANIFEST_FILENAME).is_file() && seen.insert(dir.clone()) {
                    dirs.push(dir);
                }
            }
        }
        Ok(dirs)
    }

    fn read_package(&self, dir: &Path) -> Result<Package, RepositoryError> {
        let relative = dir.strip_prefix(&self.root).unwrap_or(dir);
        let relative_path = relative.to_string_lossy().replace('\\', "/");
        let manifest_path = dir.join(MANIFEST_FILENAME);
        let text = fs::read_to_string(&manifest_path).map_err(|source| RepositoryError::Read {
            path: manifest_path.clone(),
            source,
        })?;
        let name = match Manifest::parse(&text) {
            Ok(manifest) => manifest.name().map(str::to_string),
            Err(e) => {
                log::warn!("{}: invalid manifest: {e}", manifest_path.display());
                None
            }
        };
        let config = load_package_config(dir)?;
        log::trace!(
            "found package {relative_path} ({})",
            if config.is_some() { "lintable" } else { "no config" }
        );
        Ok(Package {
            name,
            relative_path,
            config,
        })
    }

    fn repository_id(&self) -> Result<String, RepositoryError> {
        match &self.config.repository {
            Some(id) => Ok(id.clone()),
            None => remote_to_repository(&git_remote_url(&self.root)?),
        }
    }
}

impl RepositoryReader for FsRepositoryReader {
    fn read(&self) -> Result<Repository, RepositoryError> {
        let packages = self
            .package_dirs()?
            .iter()
            .map(|dir| self.read_package(dir))
            .collect::<Result<Vec<_>, _>>()?;
        log::debug!("discovered {} package(s)", packages.len());
        Ok(Repository {
            root: self.root.clone(),
            settings: RootSettings {
                shared_configs: self.config.shared_configs().to_string(),
                repository: self.repository_id()?,
            },
            packages,
        })
    }
}

/// `remote.origin.url` of the git checkout at `root`.
pub fn git_remote_url(root: &Path) -> Result<String, RepositoryError> {
    let out = Command::new("git")
        .args(["config", "--get", "remote.origin.url"])
        .current_dir(root)
        .output()
        .map_err(|e| RepositoryError::Remote {
            reason: format!("failed to run git: {e}"),
        })?;
    if !out.status.success() {
        return Err(RepositoryError::Remote {
            reason: format!(
                "no remote.origin.url configured{}",
                match String::from_utf8_lossy(&out.stderr).trim() {
                    "" => String::new(),
                    stderr => format!(": {stderr}"),
                }
            ),
        });
    }
    Ok(String::from_utf8_lossy(&out.stdout).trim().to_string())
}

/// Convert a GitHub remote URL into `github:<owner>/<repo>`.
pub fn remote_to_repository(url: &str) -> Result<String, RepositoryError> {
    let patterns = [
        r"^git@github\.com:(.+?)(?:\.git)?/?$",
        r"^(?:https|ssh)://(?:[^@/]+@)?github\.com/(.+?)(?:\.git)?/?$",
    ];
    for pattern in patterns {
        let re = Regex::new(pattern).map_err(|e| RepositoryError::Remote {
            reason: e.to_string(),
        })?;
        if let Some(slug) = re.captures(url.trim()).and_then(|c| c.get(1)) {
            return Ok(format!("github:{}", slug.as_str()));
        }
    }
    Err(RepositoryError::Remote {
        reason: format!("could not parse remote: {url}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::resolve_effective;
    use crate::models::PackageKind;
    use std::io::Write;
    use tempfile::tempdir;

    fn write(root: &Path, path: &str, contents: &str) {
        let p = root.join(path);
        fs::create_dir_all(p.parent().unwrap()).unwrap();
        fs::write(p, contents).unwrap();
    }

    #[test]
    fn test_remote_to_repository() {
        assert_eq!(
            remote_to_repository("git@github.com:acme/mono.git").unwrap(),
            "github:acme/mono"
        );
        assert_eq!(
            remote_to_repository("https://github.com/acme/mono.git").unwrap(),
            "github:acme/mono"
        );
        assert_eq!(
            remote_to_repository("https://github.com/acme/mono").unwrap(),
            "github:acme/mono"
        );
        let err = remote_to_repository("https://gitlab.com/acme/mono.git").unwrap_err();
        assert!(matches!(err, RepositoryError::Remote { .. }));
    }

    #[test]
    fn test_reads_packages_from_globs() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        let mut f = fs::File::create(root.join("monolint.toml")).unwrap();
        writeln!(
            f,
            "{}",
            r#"
packages = ["packages/*", "apps/*", "packages/core"]
repository = "github:acme/mono"
            "#
        )
        .unwrap();
        write(root, "packages/core/package.json", r#"{"name":"@acme/core"}"#);
        write(root, "packages/core/.monolint.json", r#"{"type":"library"}"#);
        write(root, "packages/util/package.json", r#"{"name":"@acme/util"}"#);
        write(root, "packages/notes/README.md", "no manifest here");
        write(root, "apps/web/package.json", r#"{"name":"web"}"#);
        write(root, "apps/web/.monolint.yaml", "type: app\n");

        let eff = resolve_effective(root.to_str(), None, None, None).unwrap();
        let repo = FsRepositoryReader::from_effective(&eff).unwrap().read().unwrap();

        let paths: Vec<_> = repo.packages.iter().map(|p| p.relative_path.as_str()).collect();
        assert_eq!(paths, vec!["packages/core", "packages/util", "apps/web"]);
        assert_eq!(repo.settings.repository, "github:acme/mono");
        assert_eq!(repo.settings.shared_configs, "shared");
        assert_eq!(repo.packages[0].kind(), Some(PackageKind::Library));
        assert!(!repo.packages[1].is_lintable());
        assert_eq!(repo.packages[2].kind(), Some(PackageKind::App));
        assert_eq!(repo.lintable_packages().count(), 2);
    }

    #[test]
    fn test_invalid_manifest_keeps_package_without_name() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        write(root, "packages/broken/package.json", "{ not json");
        let config = RootConfig {
            repository: Some("github:acme/mono".into()),
            ..RootConfig::default()
        };
        let repo = FsRepositoryReader::new(root, config).read().unwrap();
        assert_eq!(repo.packages.len(), 1);
        assert_eq!(repo.packages[0].name, None);
        assert_eq!(repo.packages[0].label(), "packages/broken");
    }

    #[test]
    fn test_invalid_package_config_is_fatal() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        write(root, "packages/a/package.json", r#"{"name":"a"}"#);
        write(root, "packages/a/.monolint.json", r#"{"type":"spaceship"}"#);
        let config = RootConfig {
            repository: Some("github:acme/mono".into()),
            ..RootConfig::default()
        };
        let err = FsRepositoryReader::new(root, config).read().unwrap_err();
        assert!(matches!(err, RepositoryError::InvalidConfig { .. }));
    }

    #[test]
    fn test_bad_pattern_is_fatal() {
        let dir = tempdir().unwrap();
        let config = RootConfig {
            packages: Some(vec!["packages/[".into()]),
            repository: Some("github:acme/mono".into()),
            ..RootConfig::default()
        };
        let err = FsRepositoryReader::new(dir.path(), config).read().unwrap_err();
        assert!(matches!(err, RepositoryError::Pattern { .. }));
    }

    #[test]
    fn test_missing_root_config() {
        let dir = tempdir().unwrap();
        let eff = resolve_effective(dir.path().to_str(), None, None, None).unwrap();
        let err = FsRepositoryReader::from_effective(&eff).err().unwrap();
        assert!(matches!(err, RepositoryError::RootConfigNotFound { .. }));
    }
}
