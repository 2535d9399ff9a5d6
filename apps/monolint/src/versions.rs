//! Semantic-version range helpers for dependency unification.
//!
//! Ranges use npm syntax (`^1.2.0`, `>=1.0.0 <2.0.0`, `1.x || 2.x`,
//! `1.2.3 - 2.0.0`). They are translated to [`semver::VersionReq`] and
//! compared by their minimum satisfying version. Anything that does not
//! parse (`workspace:*`, `latest`, git URLs) yields `None` and is never
//! compared.

use semver::{Comparator, Op, Prerelease, Version, VersionReq};
use std::collections::BTreeMap;

const OPERATORS: &[&str] = &[">=", "<=", ">", "<", "=", "~", "^"];

/// Drop a `v` prefix in front of a version number (`v1.2.3`, `>=v1`).
fn strip_v(token: &str) -> String {
    let op_len = token.len() - token.trim_start_matches(['>', '<', '=', '~', '^']).len();
    let (op, rest) = token.split_at(op_len);
    match rest.strip_prefix(['v', 'V']) {
        Some(num) if num.starts_with(|c: char| c.is_ascii_digit()) => format!("{op}{num}"),
        _ => token.to_string(),
    }
}

/// Rewrite one space-separated npm comparator set into cargo syntax.
fn to_cargo_req(set: &str) -> Option<VersionReq> {
    let set = set.trim();
    if set.is_empty() {
        return VersionReq::parse("*").ok();
    }
    if let Some((low, _high)) = set.split_once(" - ") {
        return VersionReq::parse(&format!(">={}", strip_v(low.trim()))).ok();
    }

    let mut parts: Vec<String> = Vec::new();
    let mut pending_op: Option<&str> = None;
    for token in set.split_whitespace() {
        if OPERATORS.contains(&token) {
            pending_op = Some(token);
            continue;
        }
        let token = strip_v(token);
        match pending_op.take() {
            Some(op) => parts.push(format!("{op}{token}")),
            None => parts.push(token),
        }
    }
    if pending_op.is_some() {
        return None;
    }
    VersionReq::parse(&parts.join(", ")).ok()
}

/// Smallest version satisfying one comparator, if it has a lower bound.
fn lower_bound(cmp: &Comparator) -> Option<Version> {
    let mut version = Version {
        major: cmp.major,
        minor: cmp.minor.unwrap_or(0),
        patch: cmp.patch.unwrap_or(0),
        pre: cmp.pre.clone(),
        build: Default::default(),
    };
    match cmp.op {
        Op::Exact | Op::GreaterEq | Op::Tilde | Op::Caret | Op::Wildcard => Some(version),
        Op::Greater => {
            if cmp.minor.is_none() {
                version.major += 1;
                version.minor = 0;
                version.patch = 0;
            } else if cmp.patch.is_none() {
                version.minor += 1;
                version.patch = 0;
            } else if version.pre.is_empty() {
                version.patch += 1;
            } else {
                version.pre = Prerelease::new(&format!("{}.0", version.pre)).ok()?;
            }
            Some(version)
        }
        Op::Less | Op::LessEq => None,
        _ => None,
    }
}

fn min_of_set(set: &str) -> Option<Version> {
    let req = to_cargo_req(set)?;
    let candidate = req
        .comparators
        .iter()
        .filter_map(lower_bound)
        .max()
        .unwrap_or_else(|| Version::new(0, 0, 0));
    req.matches(&candidate).then_some(candidate)
}

/// Minimum version satisfying an npm range, or `None` when the range is not
/// a semver range at all.
pub fn min_version(range: &str) -> Option<Version> {
    let mins: Vec<Option<Version>> = range.split("||").map(min_of_set).collect();
    if mins.iter().any(Option::is_none) {
        return None;
    }
    mins.into_iter().flatten().min()
}

/// Whether `candidate`'s minimum version is strictly greater than
/// `existing`'s. False when either side is unparsable.
pub fn is_greater(candidate: &str, existing: &str) -> bool {
    match (min_version(candidate), min_version(existing)) {
        (Some(c), Some(e)) => c > e,
        _ => false,
    }
}

#[derive(Debug, Clone, Default)]
/// Greatest range seen per dependency name.
pub struct LatestVersions {
    by_name: BTreeMap<String, String>,
}

impl LatestVersions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `range` for `name`; it replaces the stored range only when it
    /// is strictly greater. Unparsable ranges are ignored.
    pub fn record(&mut self, name: &str, range: &str) {
        if min_version(range).is_none() {
            log::trace!("versions: ignoring unparsable range {name}@{range}");
            return;
        }
        match self.by_name.get_mut(name) {
            Some(existing) => {
                if is_greater(range, existing) {
                    *existing = range.to_string();
                }
            }
            None => {
                self.by_name.insert(name.to_string(), range.to_string());
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.by_name.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}
