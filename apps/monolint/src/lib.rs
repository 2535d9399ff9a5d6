//! Monolint core library.
//!
//! This crate lints a JavaScript monorepo against shared conventions: rules
//! compute the files each package should contain, a virtual filesystem
//! buffers their writes, and a single flush either reports the differences
//! (check) or writes them (fix). Missing dependencies requested by rules are
//! installed afterwards.
//!
//! High-level modules:
//! - `cli`: CLI argument parsing (binary uses this).
//! - `config`: Discovery and effective configuration resolution.
//! - `repository`: Package discovery behind the `RepositoryReader` seam.
//! - `lint`: The pass orchestrator and its stages.
//! - `rule`, `runner`: Rule protocol and isolated rule execution.
//! - `rules`: Built-in rules.
//! - `vfs`, `diff`, `format`: Buffered writes, check-mode diffs, formatting.
//! - `deps`, `versions`: Dependency requests, installation, semver helpers.
//! - `logger`, `output`: Scoped loggers and console rendering.
//! - `models`, `outcome`, `error`: Shared types.
pub mod cli;
pub mod config;
pub mod deps;
pub mod diff;
pub mod error;
pub mod format;
pub mod lint;
pub mod logger;
pub mod models;
pub mod outcome;
pub mod output;
pub mod repository;
pub mod rule;
pub mod rules;
pub mod runner;
pub mod versions;
pub mod vfs;
