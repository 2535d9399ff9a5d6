//! `package-json`: regenerate each package manifest from its config.

use super::cli::{build_script, CLI_FILENAME, CLI_OUTPUT_DIR};
use super::env_cmd::ENV_RC_FILENAME;
use super::{
    join_relative, read_manifest, write_package_file, OUTPUT_DIR, STYLE_KINDS, TYPESCRIPT_KINDS,
};
use crate::error::RuleError;
use crate::models::{DependencyKind, Manifest, ManifestBuilder, PackageConfig, PackageKind};
use crate::outcome::Outcome;
use crate::rule::{PackageRule, PackageRuleArgs};
use serde::Deserialize;
use serde_json::{json, Map, Value as Json};
use std::collections::{BTreeMap, BTreeSet};

const ID: &str = "package-json";

const EXPECTED_DEV_DEPENDENCIES: &[&str] = &["@types/node"];

#[derive(Debug, Default, Deserialize)]
struct Options {
    /// Extra scripts, applied after the generated ones.
    #[serde(default)]
    scripts: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Executable {
    Tsc,
    Jest,
    Eslint,
    Stylelint,
    Prettier,
    Depcheck,
    EnvCmd,
}

impl Executable {
    fn command(self) -> &'static str {
        match self {
            Executable::Tsc => "tsc",
            Executable::Jest => "jest",
            Executable::Eslint => "eslint",
            Executable::Stylelint => "stylelint",
            Executable::Prettier => "prettier",
            Executable::Depcheck => "depcheck",
            Executable::EnvCmd => "env-cmd",
        }
    }

    /// npm package providing the executable.
    fn dependency(self) -> &'static str {
        match self {
            Executable::Tsc => "typescript",
            Executable::Jest => "jest",
            Executable::Eslint => "eslint",
            Executable::Stylelint => "stylelint",
            Executable::Prettier => "prettier",
            Executable::Depcheck => "depcheck",
            Executable::EnvCmd => "env-cmd",
        }
    }
}

/// Remembers which executables the generated scripts reference.
#[derive(Default)]
struct Executables {
    used: BTreeSet<Executable>,
}

impl Executables {
    fn get(&mut self, exe: Executable) -> &'static str {
        self.used.insert(exe);
        exe.command()
    }

    fn dependencies(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.used.iter().map(|e| e.dependency())
    }
}

pub struct PackageJsonRule;

impl PackageRule for PackageJsonRule {
    fn id(&self) -> &'static str {
        ID
    }

    fn targets(&self) -> &'static [PackageKind] {
        TYPESCRIPT_KINDS
    }

    fn run(&self, args: &PackageRuleArgs<'_>) -> Result<Outcome, RuleError> {
        let options: Options = args.options_as(ID)?;
        let old = read_manifest(args.fs)?;
        let mut executables = Executables::default();
        let manifest = generate(args, &old, &options, &mut executables);

        let outcome =
            write_package_file(args.fs, "package.json", manifest.to_json_string(), args.logger);
        for dependency in executables.dependencies() {
            args.dependencies.request(dependency, None);
        }
        for dependency in EXPECTED_DEV_DEPENDENCIES {
            args.dependencies.request(dependency, None);
        }
        Ok(outcome)
    }
}

fn generate(
    args: &PackageRuleArgs<'_>,
    old: &Manifest,
    options: &Options,
    executables: &mut Executables,
) -> Manifest {
    let config = args.config;
    let mut files = vec![OUTPUT_DIR];
    if config.kind() == PackageKind::Cli {
        files.push(CLI_OUTPUT_DIR);
    }

    let mut builder = ManifestBuilder::new()
        .copy_from(old, "name")
        .field("version", "0.0.0")
        .field(
            "repository",
            json!({
                "type": "git",
                "url": args.repository,
                "directory": args.package.relative_path,
            }),
        )
        .field_opt("private", config.is_private().then_some(true))
        .copy_from(old, "description")
        .copy_from(old, "license")
        .field("files", json!(files))
        .field("type", if config.is_common_js() { "commonjs" } else { "module" })
        .field("source", "src/index.ts")
        .field("module", "src/index.ts")
        .field("main", format!("{OUTPUT_DIR}/index.js"))
        .field("types", format!("{OUTPUT_DIR}/index.d.ts"))
        .field("sideEffects", false);

    if let PackageConfig::Cli { cli_name, .. } = config {
        let mut bin = Map::new();
        bin.insert(
            cli_name.clone(),
            Json::String(format!("{CLI_OUTPUT_DIR}/{CLI_FILENAME}")),
        );
        builder = builder.field("bin", Json::Object(bin));
    }

    let scripts = scripts(args, options, executables);
    builder = builder.field(
        "scripts",
        Json::Object(scripts.into_iter().map(|(k, v)| (k, Json::String(v))).collect()),
    );

    for kind in DependencyKind::ALL {
        if let Some(deps) = old.dependencies(kind) {
            builder = builder.dependencies(kind, normalize_dependencies(deps));
        }
    }
    builder.copy_from(old, "peerDependencies").build()
}

/// Sort by name and collapse `workspace:<anything>` to `workspace:*`.
fn normalize_dependencies(mut deps: Vec<(String, String)>) -> Vec<(String, String)> {
    deps.sort_by(|a, b| a.0.cmp(&b.0));
    for (_, version) in deps.iter_mut() {
        if version.starts_with("workspace") {
            *version = "workspace:*".to_string();
        }
    }
    deps
}

fn scripts(
    args: &PackageRuleArgs<'_>,
    options: &Options,
    exe: &mut Executables,
) -> Vec<(String, String)> {
    let config = args.config;
    let eslint_ignore = join_relative(args.relative_path_to_root, ".eslintignore");
    let prettier_ignore = join_relative(args.relative_path_to_shared_configs, ".prettierignore");

    let mut scripts: Vec<(String, String)> = Vec::new();
    let mut set = |name: &str, script: String| {
        match scripts.iter_mut().find(|(n, _)| n == name) {
            Some(existing) => existing.1 = script,
            None => scripts.push((name.to_string(), script)),
        }
    };

    let tsc = exe.get(Executable::Tsc);
    set("clean", format!("rm -rf ./{OUTPUT_DIR} && {tsc} --build --clean"));
    set("compile", format!("{tsc} --build"));
    set("test", format!("yarn compile && {} --passWithNoTests", exe.get(Executable::Jest)));
    let eslint = exe.get(Executable::Eslint);
    set(
        "lint:eslint",
        format!("{eslint} --max-warnings 0 . --ignore-path={eslint_ignore}"),
    );
    set(
        "lint:eslint:fix",
        format!("{eslint} --max-warnings 0 . --ignore-path={eslint_ignore} --fix"),
    );
    if STYLE_KINDS.contains(&config.kind()) {
        set(
            "lint:style",
            format!(
                "{} 'src/**/*.scss' --allow-empty-input --max-warnings 0",
                exe.get(Executable::Stylelint)
            ),
        );
        set("lint:style:fix", "yarn lint:style --fix".to_string());
    }
    let prettier = exe.get(Executable::Prettier);
    set(
        "format",
        format!("{prettier} --write --ignore-unknown --ignore-path {prettier_ignore} \"**\""),
    );
    set(
        "format:check",
        format!("{prettier} --check --ignore-unknown --ignore-path {prettier_ignore} \"**\""),
    );
    set("depcheck", exe.get(Executable::Depcheck).to_string());

    let environments = config.environments();
    for env in &environments {
        set(
            &format!("env:{env}"),
            format!("{} -r {ENV_RC_FILENAME} -e {env}", exe.get(Executable::EnvCmd)),
        );
    }
    if config.kind() == PackageKind::Cli {
        let build = |env: Option<&str>| format!("node {}", build_script(env, &environments));
        for (name, script) in per_environment("dist", build, Some("yarn compile &&"), &environments)
        {
            set(&name, script);
        }
    }

    for (name, script) in &options.scripts {
        set(name, script.clone());
    }
    scripts
}

/// One script per environment (`name:env`), or a single `name` script when
/// there are fewer than two environments.
fn per_environment(
    name: &str,
    script: impl Fn(Option<&str>) -> String,
    prefix: Option<&str>,
    environments: &[String],
) -> Vec<(String, String)> {
    let build = |env: Option<&str>| {
        let mut parts: Vec<String> = Vec::new();
        if let Some(p) = prefix {
            parts.push(p.to_string());
        }
        if let Some(e) = env {
            parts.push(format!("yarn env:{e}"));
        }
        parts.push(script(env));
        parts.join(" ")
    };
    match environments {
        [] => vec![(name.to_string(), build(None))],
        [only] => vec![(name.to_string(), build(Some(only)))],
        many => many
            .iter()
            .map(|env| (format!("{name}:{env}"), build(Some(env))))
            .collect(),
    }
}
