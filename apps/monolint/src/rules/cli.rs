//! `cli`: write the esbuild script that bundles a CLI package, one per
//! deployment environment.

use super::write_package_file;
use crate::error::RuleError;
use crate::logger::LogMessage;
use crate::models::config::CliPackageInfo;
use crate::models::{PackageConfig, PackageKind};
use crate::outcome::Outcome;
use crate::rule::{PackageRule, PackageRuleArgs};

/// Bundled CLI output directory.
pub(crate) const CLI_OUTPUT_DIR: &str = "dist";
pub(crate) const CLI_FILENAME: &str = "cli.cjs";
const BUNDLE_FILENAME: &str = "bundle.cjs";

const DEV_DEPENDENCIES: &[&str] = &["esbuild", "@yarnpkg/esbuild-plugin-pnp"];

/// Output directory of `environment`; shared when there is at most one.
pub(crate) fn output_dir(environment: Option<&str>, all: &[String]) -> String {
    match environment {
        Some(env) if all.len() > 1 => format!("{CLI_OUTPUT_DIR}/{env}"),
        _ => CLI_OUTPUT_DIR.to_string(),
    }
}

/// Build script filename of `environment`.
pub(crate) fn build_script(environment: Option<&str>, all: &[String]) -> String {
    match environment {
        Some(env) if all.len() > 1 => format!("build.{env}.cjs"),
        _ => "build.cjs".to_string(),
    }
}

pub struct CliRule;

impl PackageRule for CliRule {
    fn id(&self) -> &'static str {
        "cli"
    }

    fn targets(&self) -> &'static [PackageKind] {
        &[PackageKind::Cli]
    }

    fn run(&self, args: &PackageRuleArgs<'_>) -> Result<Outcome, RuleError> {
        for dependency in DEV_DEPENDENCIES {
            args.dependencies.request(dependency, None);
        }
        let PackageConfig::Cli { environment, .. } = args.config else {
            return Err(RuleError::Message(format!(
                "expected a cli package, found {}",
                args.config.kind()
            )));
        };

        let mut outcome = Outcome::success();
        let environments = args.config.environments();
        if environments.is_empty() {
            args.logger
                .error(LogMessage::new("CLI does not have any environments."));
            outcome.fail();
        }
        for (name, info) in &environment.environments {
            let contents = script_contents(name, info, &environments, &environment.variables);
            outcome &= write_package_file(
                args.fs,
                &build_script(Some(name), &environments),
                contents,
                args.logger,
            );
        }
        Ok(outcome)
    }
}

fn script_contents(
    environment: &str,
    info: &CliPackageInfo,
    environments: &[String],
    variables: &[String],
) -> String {
    let out_dir = output_dir(Some(environment), environments);
    let mut script = format!(
        r#"const {{ pnpPlugin }} = require("@yarnpkg/esbuild-plugin-pnp");
const {{ build }} = require("esbuild");
const path = require("path");
const {{ chmod, writeFile }} = require("fs/promises");

main();

async function main() {{
    const options = {{
        platform: "node",
        target: "node14",
        entryPoints: ["./src/cli.ts"],
        outfile: "./{out_dir}/{BUNDLE_FILENAME}",
        bundle: true,
        external: ["cpu-features"],
        plugins: [pnpPlugin()],
"#
    );
    if !variables.is_empty() {
        script.push_str("        define: {\n");
        for var in variables {
            script.push_str(&format!(
                "            \"process.env.{var}\": getEnvironmentVariable(\"{var}\"),\n"
            ));
        }
        script.push_str("        },\n");
    }
    script.push_str(&format!(
        r#"    }};

    await build(options).catch(() => process.exit(1));

    process.chdir(path.join(__dirname, "{out_dir}"));

    // write cli executable
    await writeFile("{CLI_FILENAME}", `#!/usr/bin/env node

require("./{BUNDLE_FILENAME}");`);
    await chmod("{CLI_FILENAME}", "755");
"#
    ));
    if let Some(package_name) = &info.cli_package_name {
        script.push_str(&format!(
            r#"
    // write cli's package.json
    const packageJson = require("./package.json");
    await writeFile(
        "package.json",
        JSON.stringify(
            {{
                name: "{package_name}",
                version: packageJson.version,
                repository: packageJson.repository,
                files: ["{BUNDLE_FILENAME}", "{CLI_FILENAME}"],
                bin: {{ "{cli_name}": "{CLI_FILENAME}" }},
            }},
            undefined,
            2
        )
    );

    // empty yarn.lock keeps yarn from treating this as a workspace
    await writeFile("yarn.lock", "");
"#,
            cli_name = info.cli_name,
        ));
    }
    script.push_str("}\n");
    if !variables.is_empty() {
        script.push_str(
            r#"
function getEnvironmentVariable(name) {
    const value = process.env[name];
    if (value != null) {
        return `"${value}"`;
    }
    throw new Error(`Environment variable ${name} is not defined.`);
}
"#,
        );
    }
    script
}
