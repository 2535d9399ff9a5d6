//! Monolint CLI binary entry point.
//! Resolves settings, reads the repository and runs a lint pass or a listing.

use clap::Parser;
use monolint::cli::{self, Cli, Commands};
use monolint::config::{self, Effective};
use monolint::deps::YarnInstaller;
use monolint::error::RepositoryError;
use monolint::format::JsonFormatter;
use monolint::lint::{lint_repository, Linter, Mode};
use monolint::logger::{LogLevel, LogMessage, Loggers};
use monolint::output::{self, ConsoleSink};
use monolint::repository::{FsRepositoryReader, RepositoryReader};
use monolint::rules;
use std::process::ExitCode;
use std::sync::Arc;

fn fatal(err: &RepositoryError) -> ExitCode {
    let loggers = Loggers::new(Arc::new(ConsoleSink::new(LogLevel::Error)));
    loggers.root().error(LogMessage::new("Failed to read repository").with_error(err));
    ExitCode::from(2)
}

/// Install `sink` as the `log` backend; a second install is ignored.
fn install_console(sink: ConsoleSink, level: LogLevel) {
    if log::set_boxed_logger(Box::new(sink)).is_ok() {
        log::set_max_level(level.to_filter());
    }
}

fn run_lint(eff: &Effective) -> ExitCode {
    let sink = ConsoleSink::new(eff.log_level);
    install_console(sink, eff.log_level);
    let loggers = Loggers::new(Arc::new(sink));

    let reader = match FsRepositoryReader::from_effective(eff) {
        Ok(r) => r,
        Err(e) => return fatal(&e),
    };
    let registry = rules::builtin();
    let formatter = JsonFormatter::default();
    let installer = YarnInstaller::new(&eff.repo_root);
    let linter = Linter::new(&registry, &formatter, &installer, &loggers);

    match lint_repository(&reader, &linter, Mode::from_fix(eff.fix)) {
        Ok(outcome) if outcome.is_success() => ExitCode::SUCCESS,
        Ok(_) => {
            if !eff.fix {
                loggers
                    .root()
                    .info("Run with --fix to write the expected files and install dependencies.");
            }
            ExitCode::from(1)
        }
        Err(e) => fatal(&e),
    }
}

fn run_list(eff: &Effective) -> ExitCode {
    install_console(ConsoleSink::new(eff.log_level), eff.log_level);
    let repository = match FsRepositoryReader::from_effective(eff).and_then(|r| r.read()) {
        Ok(r) => r,
        Err(e) => return fatal(&e),
    };
    output::print_packages(&repository, &eff.output);
    ExitCode::SUCCESS
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match cli.cmd {
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            ExitCode::SUCCESS
        }
        Commands::Lint {
            repo_root,
            fix,
            check,
            log_level,
        } => {
            let cli_fix = cli::fix_override(fix, check);
            match config::resolve_effective(repo_root.as_deref(), cli_fix, log_level.as_deref(), None) {
                Ok(eff) => run_lint(&eff),
                Err(e) => fatal(&e),
            }
        }
        Commands::List { repo_root, output } => {
            match config::resolve_effective(repo_root.as_deref(), None, None, output.as_deref()) {
                Ok(eff) => run_list(&eff),
                Err(e) => fatal(&e),
            }
        }
    }
}
