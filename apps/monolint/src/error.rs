//! Error types for monolint.
//!
//! Only [`RepositoryError`] is fatal to a lint pass. The remaining errors are
//! caught at stage boundaries, logged, and folded into an `Outcome`.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failures while reading repository metadata. These abort a pass.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// No root config file was found.
    #[error("no monolint.toml|yaml|yml found in {} or any parent directory", start.display())]
    RootConfigNotFound { start: PathBuf },

    #[error("failed to read {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config {}: {reason}", path.display())]
    InvalidConfig { path: PathBuf, reason: String },

    #[error("invalid package pattern '{pattern}'")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("could not determine repository: {reason}")]
    Remote { reason: String },
}

/// Errors raised inside a rule body.
///
/// Returning one of these is the rule's way of throwing: the runner logs it
/// with its cause and records a failure for that rule only.
#[derive(Debug, Error)]
pub enum RuleError {
    #[error("failed to access {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{} is not valid JSON", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{} does not exist", path.display())]
    MissingFile { path: PathBuf },

    #[error("invalid options for rule {rule}")]
    Options {
        rule: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{0}")]
    Message(String),
}

/// A formatter refused to format a file.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("{} is not valid JSON", path.display())]
    InvalidJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("formatter failed for {}: {reason}", path.display())]
    Failed { path: PathBuf, reason: String },
}

/// The dependency installer could not complete.
#[derive(Debug, Error)]
pub enum InstallError {
    #[error("failed to run {program}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("installer exited with {status}")]
    Failed { status: String, output: String },
}

impl InstallError {
    /// Captured installer output, when there is any.
    pub fn output(&self) -> Option<&str> {
        match self {
            InstallError::Failed { output, .. } if !output.trim().is_empty() => Some(output),
            _ => None,
        }
    }
}
