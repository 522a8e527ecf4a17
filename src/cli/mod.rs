//! Command-line interface for commit-gate.
//!
//! This module provides the `cgate` CLI with subcommands for:
//! - `run`: Run the quality gate (also the default action)
//! - `init`: Initialize configuration
//! - `install`: Install git hook
//! - `uninstall`: Remove git hook
//! - `list`: List configured stages
//! - `validate`: Validate configuration

mod commands;

use crate::core::error::Result;
use clap::{Parser, Subcommand};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Pre-commit quality gate for PHP projects.
#[derive(Debug, Parser)]
#[command(
    name = "cgate",
    author,
    version,
    about = "Pre-commit quality gate for PHP projects",
    long_about = r#"
commit-gate (cgate) blocks commits that would lower project quality.

It collects the files staged for the commit, keeps the PHP sources under
the project source directory, and runs syntax lint, a style-fixer dry
run, coding-standard sniffing, mess detection and the test suite against
them. Any failing stage aborts the commit; everything wrong is reported
in one pass.

Quick start:
  cgate init      # Create configuration
  cgate install   # Install git hook
  # Done! Commits are now gated.
"#,
    propagate_version = true
)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-error output.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Use color output.
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,
}

/// Color output choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ColorChoice {
    /// Always use color.
    Always,
    /// Auto-detect color support.
    #[default]
    Auto,
    /// Never use color.
    Never,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the quality gate against the staged files.
    #[command(visible_alias = "r")]
    Run,

    /// Initialize commit-gate configuration.
    #[command(visible_alias = "i")]
    Init {
        /// Overwrite existing configuration.
        #[arg(short, long)]
        force: bool,
    },

    /// Install the git pre-commit hook.
    Install {
        /// Overwrite existing hook.
        #[arg(short, long)]
        force: bool,
    },

    /// Remove the git pre-commit hook.
    Uninstall,

    /// List the configured check stages.
    #[command(visible_alias = "l")]
    List,

    /// Validate the configuration file.
    #[command(visible_alias = "v")]
    Validate,

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Runs the CLI.
pub fn run() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Set up logging
    setup_logging(cli.verbose, cli.quiet);

    // Set up color
    setup_color(cli.color);

    // If no subcommand, run the default action (same as `cgate run`)
    match cli.command {
        Some(Commands::Init { force }) => commands::init(force),
        Some(Commands::Install { force }) => commands::install(force),
        Some(Commands::Uninstall) => commands::uninstall(),
        Some(Commands::List) => commands::list(),
        Some(Commands::Validate) => commands::validate(),
        Some(Commands::Completions { shell }) => {
            commands::completions(shell);
            Ok(ExitCode::SUCCESS)
        },
        Some(Commands::Run) | None => commands::run(cli.quiet),
    }
}

/// Sets up logging based on verbosity flags.
fn setup_logging(verbose: bool, quiet: bool) {
    let filter = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "info"
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Sets up color output.
fn setup_color(choice: ColorChoice) {
    match choice {
        ColorChoice::Always => {
            console::set_colors_enabled(true);
            console::set_colors_enabled_stderr(true);
        },
        ColorChoice::Never => {
            console::set_colors_enabled(false);
            console::set_colors_enabled_stderr(false);
        },
        ColorChoice::Auto => {
            // Let console crate auto-detect
        },
    }
}
