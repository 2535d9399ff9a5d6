//! `stylelint`: point the stylelint config of packages with stylesheets at
//! the shared one.

use super::{join_relative, write_package_file, STYLE_KINDS};
use crate::error::RuleError;
use crate::models::PackageKind;
use crate::outcome::Outcome;
use crate::rule::{PackageRule, PackageRuleArgs};
use serde_json::json;

pub struct StylelintRule;

impl PackageRule for StylelintRule {
    fn id(&self) -> &'static str {
        "stylelint"
    }

    fn targets(&self) -> &'static [PackageKind] {
        STYLE_KINDS
    }

    fn run(&self, args: &PackageRuleArgs<'_>) -> Result<Outcome, RuleError> {
        let shared = join_relative(args.relative_path_to_shared_configs, "stylelintrc.shared.json");
        let contents = json!({ "extends": [shared] });
        Ok(write_package_file(
            args.fs,
            ".stylelintrc.json",
            contents.to_string(),
            args.logger,
        ))
    }
}
