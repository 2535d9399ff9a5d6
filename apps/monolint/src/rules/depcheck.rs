//! `depcheck`: write `.depcheckrc.json`.

use super::{write_package_file, OUTPUT_DIR, TYPESCRIPT_KINDS};
use crate::error::RuleError;
use crate::models::PackageKind;
use crate::outcome::Outcome;
use crate::rule::{PackageRule, PackageRuleArgs};
use serde::Serialize;

#[derive(Debug, Serialize)]
struct DepcheckRc {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    ignores: Vec<&'static str>,
    #[serde(rename = "ignore-patterns")]
    ignore_patterns: Vec<&'static str>,
}

pub struct DepcheckRule;

impl PackageRule for DepcheckRule {
    fn id(&self) -> &'static str {
        "depcheck"
    }

    fn targets(&self) -> &'static [PackageKind] {
        TYPESCRIPT_KINDS
    }

    fn run(&self, args: &PackageRuleArgs<'_>) -> Result<Outcome, RuleError> {
        let mut rc = DepcheckRc {
            ignores: Vec::new(),
            ignore_patterns: vec![OUTPUT_DIR],
        };
        // apps compile sass through their bundler
        if args.config.kind() == PackageKind::App {
            rc.ignores.push("sass");
        }
        let contents = serde_json::to_string(&rc).map_err(|e| RuleError::Message(e.to_string()))?;
        Ok(write_package_file(
            args.fs,
            ".depcheckrc.json",
            contents,
            args.logger,
        ))
    }
}
