//! Built-in rules.
//!
//! [`builtin`] returns the default registry. Order matters: `package-json`
//! runs first so later rules read the regenerated manifest from the overlay.

mod cli;
mod dependency_versions;
mod depcheck;
mod env_cmd;
mod jest;
mod package_json;
mod prettier;
mod stylelint;
mod ts_config;

pub use cli::CliRule;
pub use dependency_versions::DependencyVersionsRule;
pub use depcheck::DepcheckRule;
pub use env_cmd::EnvCmdRule;
pub use jest::JestRule;
pub use package_json::PackageJsonRule;
pub use prettier::PrettierRule;
pub use stylelint::StylelintRule;
pub use ts_config::TsConfigRule;

use crate::error::RuleError;
use crate::logger::{LogMessage, Logger};
use crate::models::{Manifest, PackageKind, MANIFEST_FILENAME};
use crate::outcome::Outcome;
use crate::rule::Rule;
use crate::vfs::FsView;
use std::path::Path;

/// Kinds that carry a TypeScript toolchain.
pub(crate) const TYPESCRIPT_KINDS: &[PackageKind] = &[
    PackageKind::Library,
    PackageKind::ReactLibrary,
    PackageKind::Cli,
    PackageKind::App,
];

/// Kinds whose sources may include stylesheets.
pub(crate) const STYLE_KINDS: &[PackageKind] = &[PackageKind::ReactLibrary, PackageKind::App];

/// Build output directory of every package.
pub(crate) const OUTPUT_DIR: &str = "lib";

pub fn builtin() -> Vec<Rule> {
    vec![
        Rule::package(PackageJsonRule),
        Rule::package(TsConfigRule),
        Rule::package(PrettierRule),
        Rule::package(DepcheckRule),
        Rule::package(JestRule),
        Rule::package(StylelintRule),
        Rule::package(CliRule),
        Rule::package(EnvCmdRule),
        Rule::repository(DependencyVersionsRule),
    ]
}

/// Ids of the built-in rules, in registration order.
pub fn builtin_ids() -> Vec<&'static str> {
    builtin().iter().map(Rule::id).collect()
}

/// Read and parse the manifest through `fs`.
pub(crate) fn read_manifest(fs: &FsView<'_>) -> Result<Manifest, RuleError> {
    let path = fs.resolve(MANIFEST_FILENAME);
    let text = fs
        .read(MANIFEST_FILENAME)
        .map_err(|source| RuleError::Io {
            path: path.clone(),
            source,
        })?
        .ok_or_else(|| RuleError::MissingFile { path: path.clone() })?;
    Manifest::parse(&text).map_err(|source| RuleError::Json { path, source })
}

/// Buffer `contents` as `filename` in the package; a failure is logged.
pub(crate) fn write_package_file(
    fs: &FsView<'_>,
    filename: &str,
    contents: impl Into<String>,
    logger: &Logger,
) -> Outcome {
    match fs.write(filename, contents) {
        Ok(()) => Outcome::success(),
        Err(e) => {
            logger.error(LogMessage::new(format!("Failed to write {filename}")).with_error(&e));
            Outcome::failure()
        }
    }
}

pub(crate) fn to_posix(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// `/`-joined path of `file` under a relative directory, as written into
/// generated files.
pub(crate) fn join_relative(dir: &Path, file: &str) -> String {
    let dir = to_posix(dir);
    let dir = dir.trim_end_matches('/');
    if dir.is_empty() || dir == "." {
        file.to_string()
    } else {
        format!("{dir}/{file}")
    }
}
