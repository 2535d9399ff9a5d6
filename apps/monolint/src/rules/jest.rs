//! `jest`: jest and babel configs plus the jest toolchain.

use super::{join_relative, read_manifest, write_package_file, TYPESCRIPT_KINDS};
use crate::error::RuleError;
use crate::logger::LogMessage;
use crate::models::PackageKind;
use crate::outcome::Outcome;
use crate::rule::{PackageRule, PackageRuleArgs};

const EXPECTED_DEV_DEPENDENCIES: &[&str] = &[
    "jest",
    "@types/jest",
    "@babel/core",
    "@babel/preset-env",
    "@babel/preset-typescript",
    "ts-jest",
];

pub struct JestRule;

impl PackageRule for JestRule {
    fn id(&self) -> &'static str {
        "jest"
    }

    fn targets(&self) -> &'static [PackageKind] {
        TYPESCRIPT_KINDS
    }

    fn run(&self, args: &PackageRuleArgs<'_>) -> Result<Outcome, RuleError> {
        let shared = args.relative_path_to_shared_configs;
        let mut outcome = write_package_file(
            args.fs,
            "jest.config.ts",
            format!(
                "import packageConfig from \"{}\";\n\nexport default packageConfig;\n",
                join_relative(shared, "jest.config.shared")
            ),
            args.logger,
        );
        outcome &= write_package_file(
            args.fs,
            "babel.config.js",
            format!(
                "module.exports = require(\"{}\");\n",
                join_relative(shared, "babel.config.shared.json")
            ),
            args.logger,
        );

        match read_manifest(args.fs) {
            Ok(_) => {
                for dependency in EXPECTED_DEV_DEPENDENCIES {
                    args.dependencies.request(dependency, None);
                }
            }
            Err(e) => {
                args.logger
                    .error(LogMessage::new("Cannot request jest dependencies").with_error(&e));
                outcome.fail();
            }
        }
        Ok(outcome)
    }
}
