//! CLI command implementations.

use crate::config::{Config, StageScope, CONFIG_FILE_NAME};
use crate::core::error::{Error, Result};
use crate::core::filter::SourceFilter;
use crate::core::git::GitRepo;
use crate::core::manifest;
use crate::core::pipeline::Pipeline;
use crate::report::Reporter;
use console::style;
use std::path::PathBuf;
use std::process::ExitCode;

/// Hook script template.
const HOOK_SCRIPT: &str = r#"#!/bin/sh
# commit-gate hook - installed by `cgate install`
# https://github.com/commit-gate/commit-gate

exec cgate run
"#;

/// Hook marker comment.
const HOOK_MARKER: &str = "# commit-gate hook";

/// Runs the quality gate against the staged files.
pub fn run(quiet: bool) -> Result<ExitCode> {
    let config = Config::load_or_default()?;
    let repo = GitRepo::discover()?;
    let reporter = Reporter::new(quiet);

    reporter.banner("commit-gate");

    // A failing diff query is an infrastructure problem and aborts the
    // whole run here; an empty index is just an empty list.
    let staged = repo.staged_files()?;

    let filter = SourceFilter::new(&config.project.source_dir, &config.project.extension)
        .map_err(|e| Error::ConfigInvalid {
            field: "project.source_dir".to_string(),
            message: e.to_string(),
        })?;
    let sources = filter.filter(&staged);

    if let Some(message) = manifest::advisory(&staged, &config.manifest_pair()) {
        reporter.advisory(&message);
    }

    let pipeline = Pipeline::new(config, repo.root().to_path_buf(), reporter);

    let report = tokio::runtime::Runtime::new()
        .map_err(|e| Error::Internal {
            message: format!("Failed to create runtime: {e}"),
        })?
        .block_on(pipeline.execute(&sources))?;

    eprintln!();
    if report.success() {
        reporter.summary_success();
        Ok(ExitCode::SUCCESS)
    } else {
        reporter.summary_failure(report.failure_count());
        Ok(ExitCode::FAILURE)
    }
}

/// Initialize configuration.
pub fn init(force: bool) -> Result<ExitCode> {
    let config_path = PathBuf::from(CONFIG_FILE_NAME);

    // Check if config already exists
    if config_path.exists() && !force {
        eprintln!(
            "{} Configuration already exists: {}",
            style("!").yellow(),
            config_path.display()
        );
        eprintln!("  Use --force to overwrite.");
        return Ok(ExitCode::FAILURE);
    }

    std::fs::write(&config_path, Config::default_toml())
        .map_err(|e| Error::io("write config", e))?;

    eprintln!("{} Created {}", style("✓").green(), config_path.display());
    eprintln!("\nNext steps:");
    eprintln!("  1. Review and customize {CONFIG_FILE_NAME}");
    eprintln!("  2. Run: cgate install");

    Ok(ExitCode::SUCCESS)
}

/// Install git hook.
pub fn install(force: bool) -> Result<ExitCode> {
    let repo = GitRepo::discover()?;
    let hooks_dir = repo.hooks_dir();
    let hook_path = hooks_dir.join("pre-commit");

    // Create hooks directory if needed
    if !hooks_dir.exists() {
        std::fs::create_dir_all(&hooks_dir).map_err(|e| Error::io("create hooks dir", e))?;
    }

    // Check for existing hook
    if hook_path.exists() {
        let content =
            std::fs::read_to_string(&hook_path).map_err(|e| Error::io("read existing hook", e))?;

        // Check if it's our hook
        if content.contains(HOOK_MARKER) {
            eprintln!(
                "{} Hook already installed at {}",
                style("✓").green(),
                hook_path.display()
            );
            return Ok(ExitCode::SUCCESS);
        }

        if !force {
            return Err(Error::HookExists { path: hook_path });
        }

        // Backup existing hook
        let backup_path = hooks_dir.join("pre-commit.bak");
        std::fs::rename(&hook_path, &backup_path).map_err(|e| Error::io("backup hook", e))?;
        eprintln!(
            "{} Backed up existing hook to {}",
            style("•").cyan(),
            backup_path.display()
        );
    }

    // Write hook
    std::fs::write(&hook_path, HOOK_SCRIPT).map_err(|e| Error::io("write hook", e))?;

    // Make executable on Unix
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = std::fs::metadata(&hook_path)
            .map_err(|e| Error::io("get hook metadata", e))?
            .permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&hook_path, perms).map_err(|e| Error::io("set hook perms", e))?;
    }

    eprintln!(
        "{} Installed pre-commit hook at {}",
        style("✓").green(),
        hook_path.display()
    );

    Ok(ExitCode::SUCCESS)
}

/// Uninstall git hook.
pub fn uninstall() -> Result<ExitCode> {
    let repo = GitRepo::discover()?;
    let hook_path = repo.hook_path("pre-commit");

    if !hook_path.exists() {
        eprintln!(
            "{} No hook installed at {}",
            style("•").cyan(),
            hook_path.display()
        );
        return Ok(ExitCode::SUCCESS);
    }

    // Check if it's our hook
    let content = std::fs::read_to_string(&hook_path).map_err(|e| Error::io("read hook", e))?;

    if !content.contains(HOOK_MARKER) {
        eprintln!(
            "{} Hook at {} was not installed by commit-gate",
            style("!").yellow(),
            hook_path.display()
        );
        eprintln!("  Remove manually if desired.");
        return Ok(ExitCode::FAILURE);
    }

    std::fs::remove_file(&hook_path).map_err(|e| Error::io("remove hook", e))?;

    eprintln!(
        "{} Removed pre-commit hook from {}",
        style("✓").green(),
        hook_path.display()
    );

    // Check for backup
    let backup_path = repo.hooks_dir().join("pre-commit.bak");
    if backup_path.exists() {
        eprintln!(
            "  Backup exists at {} - restore if needed",
            backup_path.display()
        );
    }

    Ok(ExitCode::SUCCESS)
}

/// List the configured check stages.
pub fn list() -> Result<ExitCode> {
    let config = Config::load_or_default()?;

    eprintln!("{}", style("Configured stages:").bold());
    for stage in &config.stages {
        let scope = match stage.scope {
            StageScope::PerFile => "per file",
            StageScope::Project => "project",
        };
        eprintln!(
            "  {} ({scope}) - {}",
            style(&stage.name).cyan(),
            stage.command
        );
    }

    Ok(ExitCode::SUCCESS)
}

/// Validate configuration.
pub fn validate() -> Result<ExitCode> {
    match Config::load() {
        Ok(config) => match config.validate() {
            Ok(()) => {
                eprintln!("{} Configuration is valid", style("✓").green());
                Ok(ExitCode::SUCCESS)
            },
            Err(e) => {
                eprintln!("{} Configuration validation failed: {e}", style("✗").red());
                Ok(ExitCode::FAILURE)
            },
        },
        Err(Error::ConfigNotFound { path }) => {
            eprintln!(
                "{} Configuration not found: {}",
                style("!").yellow(),
                path.display()
            );
            eprintln!("  Run: cgate init");
            Ok(ExitCode::FAILURE)
        },
        Err(e) => {
            eprintln!("{} Failed to load configuration: {e}", style("✗").red());
            Ok(ExitCode::FAILURE)
        },
    }
}

/// Generate shell completions.
pub fn completions(shell: clap_complete::Shell) {
    use clap::CommandFactory;
    clap_complete::generate(
        shell,
        &mut super::Cli::command(),
        "cgate",
        &mut std::io::stdout(),
    );
}
