//! chartforge CLI - Main entry point.
//!
//! Exit codes:
//! - 0: Success
//! - 1: General error
//! - 2: Invalid arguments
//! - 3: Invalid identifier, environment name or path escape
//! - 4: Malformed placeholder expression
//! - 5: Filesystem error

use std::process::ExitCode;

use clap::Parser;
use forge_chart::ChartError;
use forge_manifest::ManifestError;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;
mod package;

use commands::{Cli, Commands};

/// CI-friendly exit codes
pub struct ExitCodes;

impl ExitCodes {
    pub const SUCCESS: u8 = 0;
    pub const GENERAL_ERROR: u8 = 1;
    pub const INVALID_ARGS: u8 = 2;
    pub const INVALID_PATH: u8 = 3;
    pub const MALFORMED_EXPRESSION: u8 = 4;
    pub const FILESYSTEM_ERROR: u8 = 5;
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let result = match cli.command {
        Commands::Write(args) => commands::write::execute(args, cli.quiet),
        Commands::Render(args) => commands::render::execute(args),
    };

    match result {
        Ok(()) => ExitCode::from(ExitCodes::SUCCESS),
        Err(e) => {
            let exit_code = categorize_error(&e);
            eprintln!("❌ Error: {:#}", e);
            ExitCode::from(exit_code)
        }
    }
}

fn init_logging(verbose: bool, quiet: bool) {
    let level = if verbose {
        "debug"
    } else if quiet {
        "error"
    } else {
        "info"
    };

    let mut filter = EnvFilter::from_default_env().add_directive("warn".parse().unwrap());
    for target in ["chartforge", "forge_chart", "forge_manifest"] {
        filter = filter.add_directive(format!("{}={}", target, level).parse().unwrap());
    }

    // Logs go to stderr so rendered YAML on stdout stays clean
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .try_init();
}

/// Categorize error to determine exit code
fn categorize_error(e: &anyhow::Error) -> u8 {
    for cause in e.chain() {
        if let Some(err) = cause.downcast_ref::<ChartError>() {
            return match err {
                ChartError::InvalidAssetIdentifier { .. }
                | ChartError::PathEscape { .. }
                | ChartError::InvalidEnvironmentName(_) => ExitCodes::INVALID_PATH,
                ChartError::Manifest(_) => ExitCodes::MALFORMED_EXPRESSION,
                ChartError::Filesystem { .. } => ExitCodes::FILESYSTEM_ERROR,
                ChartError::InvalidOutputRoot(_) => ExitCodes::INVALID_ARGS,
                ChartError::Json(_) | ChartError::Yaml(_) => ExitCodes::GENERAL_ERROR,
            };
        }
        if cause.downcast_ref::<ManifestError>().is_some() {
            return ExitCodes::MALFORMED_EXPRESSION;
        }
        if cause.downcast_ref::<package::PackageError>().is_some()
            || cause.downcast_ref::<serde_yaml::Error>().is_some()
        {
            return ExitCodes::INVALID_ARGS;
        }
        if cause.downcast_ref::<std::io::Error>().is_some() {
            return ExitCodes::FILESYSTEM_ERROR;
        }
    }
    ExitCodes::GENERAL_ERROR
}
