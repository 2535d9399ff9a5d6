//! CLI argument parsing via `clap`.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "monolint",
    version,
    about = "Monorepo convention linter",
    long_about = "Monolint checks every package of a JavaScript monorepo against shared conventions and, with --fix, rewrites generated files and installs missing dependencies.\n\nConfiguration precedence: CLI > monolint.toml > defaults.",
    after_help = "Examples:\n  monolint lint\n  monolint lint --fix --log-level debug\n  monolint list --output json",
    arg_required_else_help = true
)]
/// Top-level CLI options and subcommands.
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand)]
/// Supported subcommands.
pub enum Commands {
    /// Show version
    #[command(about = "Show version", long_about = "Print the current monolint version.")]
    Version,
    /// Lint every configured package
    #[command(
        about = "Run lint checks",
        long_about = "Run every rule against every configured package. Without --fix nothing is written and differences are reported as errors.",
        after_help = "Examples:\n  monolint lint\n  monolint lint --fix\n  monolint lint --check"
    )]
    Lint {
        #[arg(long, help = "Repository root (default: current dir)")]
        repo_root: Option<String>,
        #[arg(long, action = clap::ArgAction::SetTrue, help = "Write fixes and install missing dependencies")]
        fix: bool,
        #[arg(
            long,
            action = clap::ArgAction::SetTrue,
            conflicts_with = "fix",
            help = "Only report differences, even when monolint.toml sets fix = true"
        )]
        check: bool,
        #[arg(long, help = "Log level: debug|info|warn|error (default: info)")]
        log_level: Option<String>,
    },
    /// List discovered packages
    #[command(
        about = "List packages",
        long_about = "Print every package found by the root config globs with its kind.",
        after_help = "Examples:\n  monolint list\n  monolint list --output json"
    )]
    List {
        #[arg(long, help = "Repository root (default: current dir)")]
        repo_root: Option<String>,
        #[arg(long, help = "Output mode: human|json (default: human)")]
        output: Option<String>,
    },
}

/// Fix mode requested on the command line; `None` defers to the root config.
pub fn fix_override(fix: bool, check: bool) -> Option<bool> {
    match (fix, check) {
        (true, _) => Some(true),
        (false, true) => Some(false),
        (false, false) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_lint_flags() {
        let cli = Cli::try_parse_from(["monolint", "lint", "--fix", "--log-level", "debug"]).unwrap();
        match cli.cmd {
            Commands::Lint {
                repo_root,
                fix,
                check,
                log_level,
            } => {
                assert!(repo_root.is_none());
                assert!(fix);
                assert!(!check);
                assert_eq!(log_level.as_deref(), Some("debug"));
            }
            _ => panic!("expected lint"),
        }
    }

    #[test]
    fn test_parse_list_output() {
        let cli = Cli::try_parse_from(["monolint", "list", "--output", "json"]).unwrap();
        assert!(matches!(cli.cmd, Commands::List { output: Some(ref o), .. } if o == "json"));
    }

    #[test]
    fn test_check_turns_fix_off() {
        let cli = Cli::try_parse_from(["monolint", "lint", "--check"]).unwrap();
        let Commands::Lint { fix, check, .. } = cli.cmd else {
            panic!("expected lint");
        };
        assert_eq!(fix_override(fix, check), Some(false));
        assert_eq!(fix_override(true, false), Some(true));
        assert_eq!(fix_override(false, false), None);
    }

    #[test]
    fn test_fix_and_check_conflict() {
        assert!(Cli::try_parse_from(["monolint", "lint", "--fix", "--check"]).is_err());
    }
}
