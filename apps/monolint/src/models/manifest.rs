//! Package manifest (`package.json`) model.
//!
//! A `Manifest` is an immutable, order-preserving JSON object. New manifests
//! are produced from old ones with [`ManifestBuilder`], which copies fields
//! explicitly; the source manifest is never mutated.

use serde::de::Error as _;
use serde_json::{Map, Value as Json};

pub const MANIFEST_FILENAME: &str = "package.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// The dependency maps a manifest can declare.
pub enum DependencyKind {
    Dependencies,
    DevDependencies,
}

impl DependencyKind {
    pub const ALL: [DependencyKind; 2] =
        [DependencyKind::Dependencies, DependencyKind::DevDependencies];

    pub const fn key(self) -> &'static str {
        match self {
            DependencyKind::Dependencies => "dependencies",
            DependencyKind::DevDependencies => "devDependencies",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Manifest {
    fields: Map<String, Json>,
}

impl Manifest {
    /// Parse manifest text; the top level must be a JSON object.
    pub fn parse(s: &str) -> Result<Self, serde_json::Error> {
        match serde_json::from_str::<Json>(s)? {
            Json::Object(fields) => Ok(Self { fields }),
            _ => Err(serde_json::Error::custom("manifest must be a JSON object")),
        }
    }

    /// Compact serialization; the flush formatter prettifies it later.
    pub fn to_json_string(&self) -> String {
        Json::Object(self.fields.clone()).to_string()
    }

    pub fn get(&self, key: &str) -> Option<&Json> {
        self.fields.get(key)
    }

    pub fn name(&self) -> Option<&str> {
        self.get("name").and_then(Json::as_str)
    }

    /// Entries of one dependency map in declaration order. Non-string
    /// versions are skipped. `None` when the map is absent.
    pub fn dependencies(&self, kind: DependencyKind) -> Option<Vec<(String, String)>> {
        let map = self.get(kind.key())?.as_object()?;
        Some(
            map.iter()
                .filter_map(|(name, v)| v.as_str().map(|v| (name.clone(), v.to_string())))
                .collect(),
        )
    }

    /// `dependencies` followed by `devDependencies`.
    pub fn all_dependencies(&self) -> Vec<(String, String)> {
        DependencyKind::ALL
            .iter()
            .filter_map(|kind| self.dependencies(*kind))
            .flatten()
            .collect()
    }

    pub fn dependency_version(&self, name: &str) -> Option<String> {
        self.all_dependencies()
            .into_iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Start a builder seeded with a copy of every field.
    pub fn to_builder(&self) -> ManifestBuilder {
        ManifestBuilder {
            fields: self.fields.clone(),
        }
    }
}

#[derive(Debug, Clone, Default)]
/// Field-by-field constructor for manifests.
pub struct ManifestBuilder {
    fields: Map<String, Json>,
}

impl ManifestBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, key: &str, value: impl Into<Json>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    pub fn field_opt(self, key: &str, value: Option<impl Into<Json>>) -> Self {
        match value {
            Some(v) => self.field(key, v),
            None => self,
        }
    }

    /// Copy `key` from `source` when present there.
    pub fn copy_from(self, source: &Manifest, key: &str) -> Self {
        let value = source.get(key).cloned();
        self.field_opt(key, value)
    }

    /// Set a dependency map from `(name, version)` pairs, keeping their order.
    pub fn dependencies<I>(self, kind: DependencyKind, entries: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let map: Map<String, Json> = entries
            .into_iter()
            .map(|(name, version)| (name, Json::String(version)))
            .collect();
        self.field(kind.key(), Json::Object(map))
    }

    pub fn build(self) -> Manifest {
        Manifest {
            fields: self.fields,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_rejects_non_object() {
        assert!(Manifest::parse("[1,2]").is_err());
        assert!(Manifest::parse("{").is_err());
    }

    #[test]
    fn test_dependencies_keep_declaration_order() {
        let m = Manifest::parse(
            r#"{"name":"a","dependencies":{"zod":"^3.0.0","axios":"^1.0.0"},"devDependencies":{"jest":"^29.0.0"}}"#,
        )
        .unwrap();
        assert_eq!(m.name(), Some("a"));
        let deps = m.dependencies(DependencyKind::Dependencies).unwrap();
        assert_eq!(deps[0].0, "zod");
        assert_eq!(deps[1].0, "axios");
        assert_eq!(m.all_dependencies().len(), 3);
        assert_eq!(m.dependency_version("jest").as_deref(), Some("^29.0.0"));
        assert!(m.dependencies(DependencyKind::DevDependencies).is_some());
    }

    #[test]
    fn test_builder_leaves_source_untouched() {
        let old = Manifest::parse(r#"{"name":"a","dependencies":{"semver":"^1.0.0"}}"#).unwrap();
        let new = old
            .to_builder()
            .dependencies(
                DependencyKind::Dependencies,
                vec![("semver".to_string(), "^2.0.0".to_string())],
            )
            .build();
        assert_eq!(old.dependency_version("semver").as_deref(), Some("^1.0.0"));
        assert_eq!(new.dependency_version("semver").as_deref(), Some("^2.0.0"));
        assert_ne!(old, new);
    }

    #[test]
    fn test_builder_preserves_insertion_order() {
        let m = ManifestBuilder::new()
            .field("name", "x")
            .field("version", "0.0.0")
            .field_opt("private", None::<bool>)
            .field("files", json!(["lib"]))
            .build();
        assert_eq!(m.to_json_string(), r#"{"name":"x","version":"0.0.0","files":["lib"]}"#);
    }
}
