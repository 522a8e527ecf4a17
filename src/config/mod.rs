//! Configuration handling for commit-gate.
//!
//! This module provides configuration loading and validation, supporting
//! both `commit-gate.toml` files and sensible PHP-project defaults. The
//! check pipeline is data-driven: each stage is a table entry naming the
//! tool command template, its invocation scope, and its failure policy.

use crate::core::error::{Error, Result};
use crate::core::manifest::ManifestPair;
use crate::stages;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default configuration file name.
pub const CONFIG_FILE_NAME: &str = "commit-gate.toml";

/// Placeholder replaced with the checked file path in stage commands.
pub const FILE_PLACEHOLDER: &str = "{file}";

/// Placeholder replaced with the configured terminal width.
pub const COLUMNS_PLACEHOLDER: &str = "{columns}";

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Project layout settings.
    pub project: ProjectConfig,
    /// Subprocess timeout ceilings.
    pub timeouts: TimeoutConfig,
    /// Ordered stage table; execution order is table order.
    #[serde(rename = "stage")]
    pub stages: Vec<StageConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            project: ProjectConfig::default(),
            timeouts: TimeoutConfig::default(),
            stages: default_stages(),
        }
    }
}

impl Config {
    /// Loads configuration from the default location.
    pub fn load() -> Result<Self> {
        let path = Self::find_config_file()?;
        Self::load_from(&path)
    }

    /// Loads configuration or returns defaults if not found.
    pub fn load_or_default() -> Result<Self> {
        match Self::find_config_file() {
            Ok(path) => Self::load_from(&path),
            Err(Error::ConfigNotFound { .. }) => Ok(Self::default()),
            Err(e) => Err(e),
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::io("read config", e))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| Error::config_parse_with_source("Failed to parse TOML", e))?;

        config.validate()?;

        Ok(config)
    }

    /// Finds the configuration file by searching up the directory tree.
    pub fn find_config_file() -> Result<PathBuf> {
        let cwd = std::env::current_dir().map_err(|e| Error::io("get current dir", e))?;

        let mut current = cwd.as_path();
        loop {
            let config_path = current.join(CONFIG_FILE_NAME);
            if config_path.exists() {
                return Ok(config_path);
            }

            match current.parent() {
                Some(parent) => current = parent,
                None => break,
            }
        }

        Err(Error::ConfigNotFound {
            path: cwd.join(CONFIG_FILE_NAME),
        })
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<()> {
        if humantime::parse_duration(&self.timeouts.total).is_err() {
            return Err(Error::ConfigInvalid {
                field: "timeouts.total".to_string(),
                message: format!("Invalid duration: {}", self.timeouts.total),
            });
        }

        if humantime::parse_duration(&self.timeouts.idle).is_err() {
            return Err(Error::ConfigInvalid {
                field: "timeouts.idle".to_string(),
                message: format!("Invalid duration: {}", self.timeouts.idle),
            });
        }

        if self.stages.is_empty() {
            return Err(Error::ConfigInvalid {
                field: "stage".to_string(),
                message: "At least one stage must be configured".to_string(),
            });
        }

        for stage in &self.stages {
            if stage.name.trim().is_empty() {
                return Err(Error::ConfigInvalid {
                    field: "stage.name".to_string(),
                    message: "Stage name must not be empty".to_string(),
                });
            }

            if stage.scope == StageScope::PerFile && !stage.command.contains(FILE_PLACEHOLDER) {
                return Err(Error::ConfigInvalid {
                    field: format!("stage.{}.command", stage.name),
                    message: format!(
                        "Per-file stage command must contain the {FILE_PLACEHOLDER} placeholder"
                    ),
                });
            }
        }

        Ok(())
    }

    /// Returns the manifest/lock pair watched by the advisory check.
    #[must_use]
    pub fn manifest_pair(&self) -> ManifestPair {
        ManifestPair {
            manifest: self.project.manifest.clone(),
            lock: self.project.lock.clone(),
        }
    }

    /// Generates default configuration as a string.
    #[must_use]
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Project layout settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Directory holding checkable sources, relative to the repo root.
    pub source_dir: String,
    /// Source file extension, without the dot.
    pub extension: String,
    /// Dependency manifest file watched by the advisory check.
    pub manifest: String,
    /// Lock file corresponding to the manifest.
    pub lock: String,
    /// Terminal width exported to every check subprocess as `COLUMNS`.
    pub columns: u32,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            source_dir: "src".to_string(),
            extension: "php".to_string(),
            manifest: "composer.json".to_string(),
            lock: "composer.lock".to_string(),
            columns: 80,
        }
    }
}

/// Subprocess timeout ceilings, as humantime strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Total wall-clock ceiling per tool invocation.
    pub total: String,
    /// Idle-output ceiling: no output for this long aborts the call.
    pub idle: String,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            total: "1h".to_string(),
            idle: "1m".to_string(),
        }
    }
}

impl TimeoutConfig {
    /// Parses the total ceiling, falling back to one hour.
    #[must_use]
    pub fn total_duration(&self) -> Duration {
        parse_or_warn(&self.total, "timeouts.total", Duration::from_secs(3600))
    }

    /// Parses the idle ceiling, falling back to one minute.
    #[must_use]
    pub fn idle_duration(&self) -> Duration {
        parse_or_warn(&self.idle, "timeouts.idle", Duration::from_secs(60))
    }
}

fn parse_or_warn(value: &str, field: &str, default: Duration) -> Duration {
    humantime::parse_duration(value).unwrap_or_else(|_| {
        tracing::warn!(%value, field, "Invalid timeout format, using default");
        default
    })
}

/// Invocation scope of a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StageScope {
    /// Run the tool once per source file.
    #[default]
    PerFile,
    /// Run the tool once for the whole project.
    Project,
}

/// What a stage records when the tool reports failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Record the tool's captured output.
    #[default]
    Output,
    /// Record a synthesized message combining the file and failure detail.
    /// Useful for tools whose raw output is uninformative on failure.
    Synthesized,
}

/// Configuration for a single check stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StageConfig {
    /// Stage name, used for headers and logs.
    pub name: String,
    /// Command template; `{file}` and `{columns}` are substituted.
    pub command: String,
    /// Per-file or whole-project invocation.
    pub scope: StageScope,
    /// Failure recording policy.
    pub failure: FailurePolicy,
    /// Forward tool output live, line by line, instead of capturing quietly.
    pub stream: bool,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            command: String::new(),
            scope: StageScope::PerFile,
            failure: FailurePolicy::Output,
            stream: false,
        }
    }
}

impl StageConfig {
    /// Returns the program name (first token) of the command template.
    #[must_use]
    pub fn program(&self) -> &str {
        self.command.split_whitespace().next().unwrap_or("")
    }
}

/// The canonical PHP stage table: lint, style, sniff, mess, tests.
#[must_use]
pub fn default_stages() -> Vec<StageConfig> {
    vec![
        StageConfig {
            name: stages::names::LINT.to_string(),
            command: format!("php -l {FILE_PLACEHOLDER}"),
            ..StageConfig::default()
        },
        StageConfig {
            name: stages::names::STYLE.to_string(),
            command: format!(
                "php-cs-fixer fix {FILE_PLACEHOLDER} --dry-run --verbose --config .php-cs-fixer.php"
            ),
            ..StageConfig::default()
        },
        StageConfig {
            name: stages::names::SNIFF.to_string(),
            command: format!("phpcs {FILE_PLACEHOLDER} --standard=phpcs.xml --report=summary -q"),
            failure: FailurePolicy::Synthesized,
            ..StageConfig::default()
        },
        StageConfig {
            name: stages::names::MESS.to_string(),
            command: format!(
                "phpmd {FILE_PLACEHOLDER} text phpmd.xml --suffixes php --reportfile var/phpmd-report.txt"
            ),
            ..StageConfig::default()
        },
        StageConfig {
            name: stages::names::TESTS.to_string(),
            command: format!(
                "phpunit --configuration phpunit.xml --log-junit var/phpunit-report.xml --colors=always --columns={COLUMNS_PLACEHOLDER}"
            ),
            scope: StageScope::Project,
            stream: true,
            ..StageConfig::default()
        },
    ]
}
