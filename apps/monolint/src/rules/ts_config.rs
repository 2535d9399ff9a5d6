//! `ts-config`: write `tsconfig.json` with project references for every
//! workspace dependency.

use super::{
    join_relative, read_manifest, to_posix, write_package_file, OUTPUT_DIR, TYPESCRIPT_KINDS,
};
use crate::error::RuleError;
use crate::models::{find_by_name, PackageKind};
use crate::outcome::Outcome;
use crate::rule::{PackageRule, PackageRuleArgs};
use serde::Deserialize;
use serde_json::{json, Map, Value as Json};
use std::collections::BTreeSet;
use std::path::Path;

const ID: &str = "ts-config";

#[derive(Debug, Default, Deserialize)]
struct Options {
    #[serde(default)]
    exclude: Vec<String>,
}

pub struct TsConfigRule;

impl PackageRule for TsConfigRule {
    fn id(&self) -> &'static str {
        ID
    }

    fn targets(&self) -> &'static [PackageKind] {
        TYPESCRIPT_KINDS
    }

    fn run(&self, args: &PackageRuleArgs<'_>) -> Result<Outcome, RuleError> {
        let options: Options = args.options_as(ID)?;
        let tsconfig = generate(args, &options)?;
        Ok(write_package_file(
            args.fs,
            "tsconfig.json",
            tsconfig.to_string(),
            args.logger,
        ))
    }
}

fn generate(args: &PackageRuleArgs<'_>, options: &Options) -> Result<Json, RuleError> {
    let manifest = read_manifest(args.fs)?;

    let mut compiler = Map::new();
    compiler.insert("composite".into(), json!(true));
    compiler.insert("outDir".into(), json!(OUTPUT_DIR));
    compiler.insert("rootDir".into(), json!("src"));
    if args.config.kind().can_contain_react() {
        compiler.insert("jsx".into(), json!("react-jsx"));
    }
    if args.config.is_common_js() {
        compiler.insert("module".into(), json!("CommonJS"));
    }

    let mut tsconfig = Map::new();
    tsconfig.insert(
        "extends".into(),
        json!(join_relative(
            args.relative_path_to_shared_configs,
            "tsconfig.shared.json"
        )),
    );
    tsconfig.insert("compilerOptions".into(), Json::Object(compiler));
    tsconfig.insert("include".into(), json!(["./src"]));
    if !options.exclude.is_empty() {
        tsconfig.insert("exclude".into(), json!(options.exclude));
    }

    let mut references = BTreeSet::new();
    for (name, version) in manifest.all_dependencies() {
        if !version.starts_with("workspace:") {
            continue;
        }
        let target = find_by_name(args.all_packages, &name).ok_or_else(|| {
            RuleError::Message(format!("Workspace dependency not found: {name}"))
        })?;
        let path = pathdiff::diff_paths(
            Path::new(&target.relative_path),
            Path::new(&args.package.relative_path),
        )
        .unwrap_or_else(|| Path::new(&target.relative_path).to_path_buf());
        references.insert(to_posix(&path));
    }
    if !references.is_empty() {
        let refs: Vec<Json> = references
            .into_iter()
            .map(|p| json!({ "path": p }))
            .collect();
        tsconfig.insert("references".into(), Json::Array(refs));
    }
    Ok(Json::Object(tsconfig))
}
