//! Formatting of touched files before they are diffed or written.
//!
//! The flush stage passes every touched file through a [`Formatter`]. The
//! built-in [`JsonFormatter`] pretty-prints `.json` files and, for files with
//! a registered key order (e.g. `package.json`), reorders top-level keys:
//! - Keys listed in the order groups come first, group by group.
//! - Remaining keys are appended in lexicographic order for determinism.
//!
//! Other files pass through untouched. A formatter error never fails a pass;
//! the caller keeps the unformatted content.

use crate::error::FormatError;
use crate::models::MANIFEST_FILENAME;
use serde_json::{Map, Value as Json};
use std::collections::HashMap;
use std::path::Path;

/// Formats file contents by path.
pub trait Formatter: Sync {
    fn format(&self, path: &Path, contents: &str) -> Result<String, FormatError>;
}

/// Returns contents unchanged.
pub struct PassthroughFormatter;

impl Formatter for PassthroughFormatter {
    fn format(&self, _path: &Path, contents: &str) -> Result<String, FormatError> {
        Ok(contents.to_string())
    }
}

/// Canonical top-level key groups for `package.json`.
fn manifest_order() -> Vec<Vec<String>> {
    let groups: &[&[&str]] = &[
        &["name", "version", "private", "description", "license", "repository"],
        &["files", "type", "source", "module", "main", "types", "sideEffects", "bin"],
        &["scripts"],
        &["dependencies", "devDependencies", "peerDependencies"],
    ];
    groups
        .iter()
        .map(|g| g.iter().map(|k| k.to_string()).collect())
        .collect()
}

/// Pretty-prints JSON with two-space indentation and a trailing newline.
pub struct JsonFormatter {
    /// File name -> top-level key groups.
    orders: HashMap<String, Vec<Vec<String>>>,
}

impl Default for JsonFormatter {
    fn default() -> Self {
        let mut orders = HashMap::new();
        orders.insert(MANIFEST_FILENAME.to_string(), manifest_order());
        Self { orders }
    }
}

impl JsonFormatter {
    /// A formatter with no key orders registered.
    pub fn unordered() -> Self {
        Self {
            orders: HashMap::new(),
        }
    }
}

impl Formatter for JsonFormatter {
    fn format(&self, path: &Path, contents: &str) -> Result<String, FormatError> {
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if !is_json {
            return Ok(contents.to_string());
        }
        let mut json: Json =
            serde_json::from_str(contents).map_err(|source| FormatError::InvalidJson {
                path: path.to_path_buf(),
                source,
            })?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        if let Some(groups) = self.orders.get(&file_name) {
            apply_order(&mut json, groups);
        }
        let mut out =
            serde_json::to_string_pretty(&json).map_err(|e| FormatError::Failed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        out.push('\n');
        Ok(out)
    }
}

/// Reorder an object's top-level keys by `groups`, then the rest sorted.
///
/// Returns true if the key order changed.
fn apply_order(json: &mut Json, groups: &[Vec<String>]) -> bool {
    let Json::Object(obj) = json else {
        return false;
    };
    let before: Vec<String> = obj.keys().cloned().collect();
    let mut ordered = Map::new();
    for key in groups.iter().flatten() {
        if let Some(v) = obj.remove(key) {
            ordered.insert(key.clone(), v);
        }
    }
    let mut rest: Vec<String> = obj.keys().cloned().collect();
    rest.sort();
    for key in rest {
        if let Some(v) = obj.remove(&key) {
            ordered.insert(key, v);
        }
    }
    *obj = ordered;
    obj.keys().ne(before.iter())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_apply_order_groups_then_sorted_rest() {
        let mut json = json!({
            "zeta": 1,
            "scripts": {},
            "alpha": 2,
            "version": "1.0.0",
            "name": "n"
        });
        let changed = apply_order(&mut json, &manifest_order());
        assert!(changed);
        let keys: Vec<_> = json.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["name", "version", "scripts", "alpha", "zeta"]);
    }

    #[test]
    fn test_apply_order_reports_no_change() {
        let mut json = json!({"name": "n", "version": "1"});
        assert!(!apply_order(&mut json, &manifest_order()));
    }

    #[test]
    fn test_json_is_pretty_printed_with_newline() {
        let out = JsonFormatter::default()
            .format(Path::new("pkg/tsconfig.json"), r#"{"strict":true}"#)
            .unwrap();
        assert_eq!(out, "{\n  \"strict\": true\n}\n");
    }

    #[test]
    fn test_manifest_keys_are_ordered() {
        let out = JsonFormatter::default()
            .format(
                Path::new("package.json"),
                r#"{"devDependencies":{},"name":"a","version":"0.0.0"}"#,
            )
            .unwrap();
        assert!(out.starts_with("{\n  \"name\": \"a\",\n  \"version\": \"0.0.0\""));
    }

    #[test]
    fn test_non_json_passes_through() {
        let src = "module.exports = {};";
        let out = JsonFormatter::default()
            .format(Path::new(".prettierrc.cjs"), src)
            .unwrap();
        assert_eq!(out, src);
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        let err = JsonFormatter::unordered()
            .format(Path::new("broken.json"), "{nope")
            .unwrap_err();
        assert!(matches!(err, FormatError::InvalidJson { .. }));
    }

    #[test]
    fn test_formatting_is_idempotent() {
        let f = JsonFormatter::default();
        let once = f
            .format(Path::new("package.json"), r#"{"version":"1","name":"x"}"#)
            .unwrap();
        let twice = f.format(Path::new("package.json"), &once).unwrap();
        assert_eq!(once, twice);
    }
}
