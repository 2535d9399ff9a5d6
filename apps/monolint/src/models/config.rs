//! Package config schema loaded from `.monolint.{json,yaml,yml}`.
//!
//! The `type` tag selects a [`PackageKind`]; each kind carries the shared
//! [`BaseConfig`] plus its own fields. Configs are read-only during a pass.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
/// Kinds of packages a rule can target.
pub enum PackageKind {
    Library,
    ReactLibrary,
    Cli,
    App,
    Custom,
}

impl PackageKind {
    pub const ALL: &'static [PackageKind] = &[
        PackageKind::Library,
        PackageKind::ReactLibrary,
        PackageKind::Cli,
        PackageKind::App,
        PackageKind::Custom,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            PackageKind::Library => "library",
            PackageKind::ReactLibrary => "react-library",
            PackageKind::Cli => "cli",
            PackageKind::App => "app",
            PackageKind::Custom => "custom",
        }
    }

    pub const fn can_contain_react(self) -> bool {
        match self {
            PackageKind::ReactLibrary | PackageKind::App => true,
            PackageKind::Library | PackageKind::Cli | PackageKind::Custom => false,
        }
    }
}

impl fmt::Display for PackageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_private() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
/// Fields common to every package kind.
pub struct BaseConfig {
    #[serde(default = "default_private")]
    pub private: bool,
    #[serde(default, rename = "commonJs")]
    pub common_js: bool,
    /// Rule id -> rule-specific options.
    #[serde(default)]
    pub rules: BTreeMap<String, Json>,
}

impl Default for BaseConfig {
    fn default() -> Self {
        Self {
            private: default_private(),
            common_js: false,
            rules: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CliPackageInfo {
    #[serde(rename = "cliName")]
    pub cli_name: String,
    #[serde(default, rename = "cliPackageName")]
    pub cli_package_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CliEnvironment {
    #[serde(default)]
    pub environments: BTreeMap<String, CliPackageInfo>,
    #[serde(default)]
    pub variables: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppEnvironment {
    #[serde(default)]
    pub environments: Vec<String>,
    #[serde(default)]
    pub variables: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
/// Typed package config, one variant per kind.
pub enum PackageConfig {
    Library {
        #[serde(flatten)]
        base: BaseConfig,
    },
    ReactLibrary {
        #[serde(flatten)]
        base: BaseConfig,
    },
    Cli {
        #[serde(flatten)]
        base: BaseConfig,
        #[serde(rename = "cliName")]
        cli_name: String,
        #[serde(default)]
        environment: CliEnvironment,
    },
    App {
        #[serde(flatten)]
        base: BaseConfig,
        #[serde(default)]
        environment: AppEnvironment,
    },
    Custom {
        #[serde(flatten)]
        base: BaseConfig,
    },
}

impl PackageConfig {
    pub fn kind(&self) -> PackageKind {
        match self {
            PackageConfig::Library { .. } => PackageKind::Library,
            PackageConfig::ReactLibrary { .. } => PackageKind::ReactLibrary,
            PackageConfig::Cli { .. } => PackageKind::Cli,
            PackageConfig::App { .. } => PackageKind::App,
            PackageConfig::Custom { .. } => PackageKind::Custom,
        }
    }

    pub fn base(&self) -> &BaseConfig {
        match self {
            PackageConfig::Library { base }
            | PackageConfig::ReactLibrary { base }
            | PackageConfig::Cli { base, .. }
            | PackageConfig::App { base, .. }
            | PackageConfig::Custom { base } => base,
        }
    }

    pub fn is_private(&self) -> bool {
        self.base().private
    }

    pub fn is_common_js(&self) -> bool {
        self.base().common_js
    }

    pub fn rule_options(&self, rule_id: &str) -> Option<&Json> {
        self.base().rules.get(rule_id)
    }

    /// Deserialize the options for `rule_id`, falling back to `T::default()`.
    pub fn rule_options_as<T>(&self, rule_id: &str) -> Result<T, serde_json::Error>
    where
        T: DeserializeOwned + Default,
    {
        match self.rule_options(rule_id) {
            Some(raw) => T::deserialize(raw),
            None => Ok(T::default()),
        }
    }

    /// Deployment environments; sorted for CLIs, declaration order for apps.
    pub fn environments(&self) -> Vec<String> {
        match self {
            PackageConfig::Cli { environment, .. } => {
                environment.environments.keys().cloned().collect()
            }
            PackageConfig::App { environment, .. } => environment.environments.clone(),
            PackageConfig::Library { .. }
            | PackageConfig::ReactLibrary { .. }
            | PackageConfig::Custom { .. } => Vec::new(),
        }
    }

    /// Variables every environment must define.
    pub fn environment_variables(&self) -> &[String] {
        match self {
            PackageConfig::Cli { environment, .. } => &environment.variables,
            PackageConfig::App { environment, .. } => &environment.variables,
            PackageConfig::Library { .. }
            | PackageConfig::ReactLibrary { .. }
            | PackageConfig::Custom { .. } => &[],
        }
    }
}
