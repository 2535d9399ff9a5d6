//! `env-cmd`: provide `.env-cmdrc.cjs` for packages with deployment
//! environments.
//!
//! A missing file is generated with every variable set to `null`. An
//! existing file is owned by the package: it is never rewritten, only
//! checked for the configured environments and variables.

use super::write_package_file;
use crate::error::RuleError;
use crate::logger::LogMessage;
use crate::models::PackageKind;
use crate::outcome::Outcome;
use crate::rule::{PackageRule, PackageRuleArgs};
use regex::Regex;
use serde_json::{Map, Value as Json};

pub const ENV_RC_FILENAME: &str = ".env-cmdrc.cjs";

pub struct EnvCmdRule;

impl PackageRule for EnvCmdRule {
    fn id(&self) -> &'static str {
        "env-cmd"
    }

    fn targets(&self) -> &'static [PackageKind] {
        &[PackageKind::App, PackageKind::Cli]
    }

    fn run(&self, args: &PackageRuleArgs<'_>) -> Result<Outcome, RuleError> {
        let environments = args.config.environments();
        let variables = args.config.environment_variables();
        let existing = args
            .fs
            .read(ENV_RC_FILENAME)
            .map_err(|source| RuleError::Io {
                path: args.fs.resolve(ENV_RC_FILENAME),
                source,
            })?;
        if let Some(text) = existing {
            return validate(&text, &environments, variables, args);
        }

        let mut config = Map::new();
        for env in &environments {
            let vars: Map<String, Json> = variables
                .iter()
                .map(|v| (v.clone(), Json::Null))
                .collect();
            config.insert(env.clone(), Json::Object(vars));
        }
        let body = serde_json::to_string_pretty(&Json::Object(config))
            .map_err(|e| RuleError::Message(e.to_string()))?;
        Ok(write_package_file(
            args.fs,
            ENV_RC_FILENAME,
            format!("module.exports = {body}\n"),
            args.logger,
        ))
    }
}

/// Whether `key` appears as an object key in `text`.
fn declares_key(text: &str, key: &str) -> Result<bool, RuleError> {
    let pattern = format!(r#"(?m)(^|[\s{{,])["']?{}["']?\s*:"#, regex::escape(key));
    let re = Regex::new(&pattern).map_err(|e| RuleError::Message(e.to_string()))?;
    Ok(re.is_match(text))
}

fn validate(
    text: &str,
    environments: &[String],
    variables: &[String],
    args: &PackageRuleArgs<'_>,
) -> Result<Outcome, RuleError> {
    let mut outcome = Outcome::success();
    for env in environments {
        if !declares_key(text, env)? {
            args.logger.error(LogMessage::new(format!(
                "Environment {env} is not defined in {ENV_RC_FILENAME}."
            )));
            outcome.fail();
        }
    }
    for var in variables {
        if !declares_key(text, var)? {
            args.logger.error(LogMessage::new(format!(
                "Environment variable {var} is not defined in {ENV_RC_FILENAME}."
            )));
            outcome.fail();
        }
    }
    Ok(outcome)
}
