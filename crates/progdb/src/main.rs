//! Binary entry point for the progdb CLI.
//!
//! All responses, including errors, are JSON on stdout. Logs go to stderr.
//!
//! ## Usage
//!
//! ```bash
//! # Summarize a fact base
//! progdb --facts out/facts stats
//!
//! # Interfaces a class implements, restricted to project packages
//! progdb --facts out/facts --package com.acme range CLASS:com.acme.Shape IMPLEMENTS_INTERFACE --in-project
//!
//! # Methods a method overrides, with library declarations available
//! progdb --facts out/facts --library jdk.json overrides 'com.acme.Shape.toString()'
//! ```

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand, ValueEnum};

use progdb::cli::{
    open_facts, run_elements, run_modifiers, run_overrides, run_range, run_stats, FactsOptions,
};
use progdb_core::error::{FactResult, OutputErrorCode};
use progdb_core::output::{emit_response, ErrorResponse};

// ============================================================================
// CLI Structure
// ============================================================================

/// Query a program relation database.
///
/// Loads per-unit fact files, runs class hierarchy analysis and answers
/// relation queries over classes, methods and fields.
#[derive(Parser)]
#[command(name = "progdb", version, about)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct GlobalArgs {
    /// Directory of unit fact files (`*.json`, searched recursively).
    #[arg(long)]
    facts: PathBuf,

    /// Analysis configuration file (TOML).
    #[arg(long)]
    config: Option<PathBuf>,

    /// JSON library index for non-project classes.
    #[arg(long)]
    library: Option<PathBuf>,

    /// Project package, in addition to those the units declare. Repeatable.
    #[arg(long = "package")]
    packages: Vec<String>,

    /// Skip class hierarchy analysis.
    #[arg(long)]
    no_cha: bool,

    /// Log level for stderr output.
    #[arg(long, global = true, value_enum, default_value = "warn")]
    log_level: LogLevel,
}

/// Log level for tracing output.
#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn to_tracing_level(self) -> tracing::Level {
        match self {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Fact base summary: sizes, project packages and CHA outcome.
    Stats,
    /// List stored elements.
    Elements {
        /// Only elements of this category (CLASS, METHOD or FIELD).
        #[arg(long)]
        category: Option<String>,
        /// Only elements in project packages.
        #[arg(long)]
        in_project: bool,
    },
    /// Range of a relation for one element.
    Range {
        /// Element key, `CATEGORY:id`.
        element: String,
        /// Relation name, e.g. `DECLARES_METHOD` or `T_CALLS`.
        relation: String,
        /// Only range elements in project packages.
        #[arg(long)]
        in_project: bool,
    },
    /// Methods a method overrides.
    Overrides {
        /// Method id, e.g. `com.acme.Shape.area()`.
        method: String,
    },
    /// Modifiers of one element.
    Modifiers {
        /// Element key, `CATEGORY:id`.
        element: String,
    },
}

// ============================================================================
// Entry Point
// ============================================================================

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_tracing(cli.global.log_level);

    match execute(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let error_code = OutputErrorCode::from(&err);
            let response = ErrorResponse::from_error(&err);

            // Errors go to stdout as JSON, like every other response
            let _ = emit_response(&response, &mut io::stdout());
            let _ = io::stdout().flush();

            ExitCode::from(error_code.code())
        }
    }
}

/// Initialize tracing subscriber.
fn init_tracing(level: LogLevel) {
    use tracing_subscriber::fmt::format::FmtSpan;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_tracing_level().to_string()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

/// Execute the CLI command.
fn execute(cli: Cli) -> FactResult<()> {
    let global = cli.global;
    let options = FactsOptions {
        facts: global.facts,
        config: global.config,
        library: global.library,
        packages: global.packages,
        no_cha: global.no_cha,
    };
    let facts = open_facts(&options)?;
    let mut stdout = io::stdout();

    match cli.command {
        Command::Stats => emit_response(&run_stats(&facts), &mut stdout)?,
        Command::Elements {
            category,
            in_project,
        } => emit_response(
            &run_elements(&facts, category.as_deref(), in_project)?,
            &mut stdout,
        )?,
        Command::Range {
            element,
            relation,
            in_project,
        } => emit_response(
            &run_range(&facts, &element, &relation, in_project)?,
            &mut stdout,
        )?,
        Command::Overrides { method } => {
            emit_response(&run_overrides(&facts, &method)?, &mut stdout)?
        }
        Command::Modifiers { element } => {
            emit_response(&run_modifiers(&facts, &element)?, &mut stdout)?
        }
    }
    Ok(())
}
