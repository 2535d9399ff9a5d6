//! Configuration discovery and effective settings resolution.
//!
//! Monolint reads `monolint.toml|yaml|yml` from the repository root (or
//! closest ancestor) and merges it with CLI flags to produce an `Effective`
//! config. Defaults:
//! - `packages`: `["packages/*"]`
//! - `sharedConfigs`: `shared`
//! - `logLevel`: `info`
//! - `fix`: false
//! - `output`: `human`
//!
//! Overrides precedence: CLI > config file > defaults.
//!
//! Package configs live beside each manifest as `.monolint.json|yaml|yml`.

use crate::error::RepositoryError;
use crate::logger::LogLevel;
use crate::models::PackageConfig;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

const ROOT_CONFIG_FILES: [&str; 3] = ["monolint.toml", "monolint.yaml", "monolint.yml"];
const PACKAGE_CONFIG_FILES: [&str; 3] = [".monolint.json", ".monolint.yaml", ".monolint.yml"];

pub const DEFAULT_PACKAGE_GLOB: &str = "packages/*";
pub const DEFAULT_SHARED_CONFIGS: &str = "shared";

#[derive(Debug, Default, Deserialize, Clone)]
/// Root configuration loaded from `monolint.toml|yaml`.
pub struct RootConfig {
    /// Glob patterns locating package directories, relative to the root.
    pub packages: Option<Vec<String>>,
    #[serde(rename = "sharedConfigs")]
    pub shared_configs: Option<String>,
    /// Version-control identifier; read from the git remote when absent.
    pub repository: Option<String>,
    #[serde(rename = "logLevel")]
    pub log_level: Option<String>,
    pub fix: Option<bool>,
    pub output: Option<String>,
}

impl RootConfig {
    pub fn package_globs(&self) -> Vec<String> {
        self.packages
            .clone()
            .unwrap_or_else(|| vec![DEFAULT_PACKAGE_GLOB.to_string()])
    }

    pub fn shared_configs(&self) -> &str {
        self.shared_configs
            .as_deref()
            .unwrap_or(DEFAULT_SHARED_CONFIGS)
    }
}

#[derive(Debug, Clone)]
/// Fully-resolved configuration used by commands after applying precedence.
pub struct Effective {
    pub repo_root: PathBuf,
    /// Whether a root config file was found at `repo_root`.
    pub configured: bool,
    pub fix: bool,
    pub log_level: LogLevel,
    pub output: String,
    pub root: RootConfig,
}

fn has_root_config(dir: &Path) -> bool {
    ROOT_CONFIG_FILES.iter().any(|f| dir.join(f).exists())
}

/// Walk upward from `start` to detect the repository root.
///
/// Stops when a `monolint.toml|yaml|yml` or a `.git` directory is found.
pub fn detect_repo_root(start: &Path) -> PathBuf {
    let mut cur = start;
    loop {
        if has_root_config(cur) || cur.join(".git").exists() {
            return cur.to_path_buf();
        }
        match cur.parent() {
            Some(p) => cur = p,
            None => return start.to_path_buf(),
        }
    }
}

fn read(path: &Path) -> Result<String, RepositoryError> {
    fs::read_to_string(path).map_err(|source| RepositoryError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Parse `path` by extension: `.toml`, `.json`, otherwise YAML.
fn parse_file<T: DeserializeOwned>(path: &Path) -> Result<T, RepositoryError> {
    let text = read(path)?;
    let invalid = |reason: String| RepositoryError::InvalidConfig {
        path: path.to_path_buf(),
        reason,
    };
    match path.extension().and_then(|e| e.to_str()) {
        Some("toml") => toml::from_str(&text).map_err(|e| invalid(e.to_string())),
        Some("json") => serde_json::from_str(&text).map_err(|e| invalid(e.to_string())),
        _ => serde_yaml::from_str(&text).map_err(|e| invalid(e.to_string())),
    }
}

fn first_existing(dir: &Path, candidates: &[&str]) -> Option<PathBuf> {
    candidates
        .iter()
        .map(|f| dir.join(f))
        .find(|p| p.is_file())
}

/// Load `RootConfig` from `monolint.toml` or `monolint.yaml|yml` if present.
pub fn load_root_config(root: &Path) -> Result<Option<RootConfig>, RepositoryError> {
    first_existing(root, &ROOT_CONFIG_FILES)
        .map(|p| parse_file(&p))
        .transpose()
}

/// Load the package config of `dir`; `None` means the package is not lintable.
pub fn load_package_config(dir: &Path) -> Result<Option<PackageConfig>, RepositoryError> {
    first_existing(dir, &PACKAGE_CONFIG_FILES)
        .map(|p| parse_file(&p))
        .transpose()
}

/// Resolve `Effective` by merging CLI flags, discovered config, and defaults.
pub fn resolve_effective(
    cli_repo_root: Option<&str>,
    cli_fix: Option<bool>,
    cli_log_level: Option<&str>,
    cli_output: Option<&str>,
) -> Result<Effective, RepositoryError> {
    let start = PathBuf::from(cli_repo_root.unwrap_or("."));
    let repo_root = detect_repo_root(&start);
    let loaded = load_root_config(&repo_root)?;
    let configured = loaded.is_some();
    let root = loaded.unwrap_or_default();

    let fix = cli_fix.or(root.fix).unwrap_or(false);

    let level_src = cli_log_level
        .map(str::to_string)
        .or_else(|| root.log_level.clone());
    let log_level = match level_src {
        Some(s) => s.parse::<LogLevel>().map_err(|reason| RepositoryError::InvalidConfig {
            path: repo_root.clone(),
            reason,
        })?,
        None => LogLevel::Info,
    };

    let output = cli_output
        .map(|s| s.to_string())
        .or_else(|| root.output.clone())
        .unwrap_or_else(|| "human".to_string());

    Ok(Effective {
        repo_root,
        configured,
        fix,
        log_level,
        output,
        root,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PackageKind;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_detect_and_load_toml() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        let mut f = fs::File::create(root.join("monolint.toml")).unwrap();
        writeln!(
            f,
            "{}",
            r#"
packages = ["packages/*", "apps/*"]
sharedConfigs = "configs"
repository = "github:acme/mono"
logLevel = "debug"
fix = true
    "#
        )
        .unwrap();

        // Resolve using explicit repo_root to avoid global CWD races
        let eff = resolve_effective(root.to_str(), None, None, None).unwrap();
        assert!(eff.configured);
        assert!(eff.fix);
        assert_eq!(eff.log_level, LogLevel::Debug);
        assert_eq!(eff.output, "human");
        assert_eq!(eff.root.package_globs(), vec!["packages/*", "apps/*"]);
        assert_eq!(eff.root.shared_configs(), "configs");
        assert_eq!(eff.root.repository.as_deref(), Some("github:acme/mono"));
    }

    #[test]
    fn test_load_yaml_and_defaults() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        let mut f = fs::File::create(root.join("monolint.yaml")).unwrap();
        writeln!(
            f,
            "{}",
            r#"
output: json
            "#
        )
        .unwrap();

        let eff = resolve_effective(root.to_str(), None, None, None).unwrap();
        assert!(!eff.fix);
        assert_eq!(eff.log_level, LogLevel::Info);
        assert_eq!(eff.output, "json");
        assert_eq!(eff.root.package_globs(), vec![DEFAULT_PACKAGE_GLOB]);
        assert_eq!(eff.root.shared_configs(), DEFAULT_SHARED_CONFIGS);
    }

    #[test]
    fn test_cli_takes_precedence() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        let mut f = fs::File::create(root.join("monolint.toml")).unwrap();
        writeln!(f, "fix = true\nlogLevel = \"debug\"\noutput = \"json\"").unwrap();

        let eff = resolve_effective(root.to_str(), Some(false), Some("warn"), Some("human")).unwrap();
        assert!(!eff.fix);
        assert_eq!(eff.log_level, LogLevel::Warn);
        assert_eq!(eff.output, "human");
    }

    #[test]
    fn test_detect_walks_up_to_config() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("monolint.yml"), "packages: [\"libs/*\"]\n").unwrap();
        let nested = root.join("libs/a/src");
        fs::create_dir_all(&nested).unwrap();
        assert_eq!(detect_repo_root(&nested), root.to_path_buf());
    }

    #[test]
    fn test_invalid_root_config_is_an_error() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("monolint.toml"), "packages = [").unwrap();
        let err = resolve_effective(root.to_str(), None, None, None).unwrap_err();
        assert!(matches!(err, RepositoryError::InvalidConfig { .. }));
    }

    #[test]
    fn test_unknown_log_level_is_rejected() {
        let dir = tempdir().unwrap();
        let err = resolve_effective(dir.path().to_str(), None, Some("loud"), None).unwrap_err();
        assert!(matches!(err, RepositoryError::InvalidConfig { .. }));
    }

    #[test]
    fn test_package_config_json_and_yaml() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        let c = dir.path().join("c");
        for d in [&a, &b, &c] {
            fs::create_dir_all(d).unwrap();
        }
        fs::write(a.join(".monolint.json"), r#"{"type":"react-library"}"#).unwrap();
        let mut f = fs::File::create(b.join(".monolint.yml")).unwrap();
        writeln!(f, "type: library\nprivate: false\ncommonJs: true").unwrap();

        let a_cfg = load_package_config(&a).unwrap().unwrap();
        assert_eq!(a_cfg.kind(), PackageKind::ReactLibrary);
        let b_cfg = load_package_config(&b).unwrap().unwrap();
        assert_eq!(b_cfg.kind(), PackageKind::Library);
        assert!(!b_cfg.is_private());
        assert!(b_cfg.is_common_js());
        assert!(load_package_config(&c).unwrap().is_none());
    }
}
