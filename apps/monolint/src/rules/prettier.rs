//! `prettier`: point each package's prettier config at the root one.

use super::{join_relative, write_package_file, TYPESCRIPT_KINDS};
use crate::error::RuleError;
use crate::models::PackageKind;
use crate::outcome::Outcome;
use crate::rule::{PackageRule, PackageRuleArgs};

pub const PRETTIER_RC_FILENAME: &str = ".prettierrc.cjs";

pub struct PrettierRule;

impl PackageRule for PrettierRule {
    fn id(&self) -> &'static str {
        "prettier"
    }

    fn targets(&self) -> &'static [PackageKind] {
        TYPESCRIPT_KINDS
    }

    fn run(&self, args: &PackageRuleArgs<'_>) -> Result<Outcome, RuleError> {
        let root_rc = join_relative(args.relative_path_to_root, ".prettierrc.json");
        let contents = format!("module.exports = require(\"{root_rc}\");\n");
        Ok(write_package_file(
            args.fs,
            PRETTIER_RC_FILENAME,
            contents,
            args.logger,
        ))
    }
}
