//! The check pipeline.
//!
//! Runs the configured stage table in order over the filtered source set:
//! per-file stages invoke their tool once per file, the project-wide test
//! stage once overall. Failures are recorded per file and folded into a
//! [`PipelineReport`]; a failing check never stops sibling files or later
//! stages, so one run reports everything wrong at once. The report, not a
//! flag, decides whether the commit is blocked.

use crate::config::{
    Config, FailurePolicy, StageConfig, StageScope, COLUMNS_PLACEHOLDER, FILE_PLACEHOLDER,
};
use crate::core::error::Result;
use crate::core::executor::{CommandOutput, ExecuteOptions, Executor, LineSink};
use crate::report::Reporter;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// One recorded check failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    /// File path, or the tool name for project-wide and preflight failures.
    pub subject: String,
    /// Failure detail, ready for one-line display.
    pub detail: String,
}

/// Result of running a single stage.
#[derive(Debug, Clone)]
pub struct StageReport {
    /// Stage name.
    pub stage: String,
    /// Recorded failures, in encounter order. Empty = stage passed.
    pub failures: Vec<Failure>,
}

impl StageReport {
    /// Returns true if the stage recorded no failures.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Folded result of a whole pipeline run.
#[derive(Debug)]
pub struct PipelineReport {
    /// Per-stage reports, in execution order.
    pub stages: Vec<StageReport>,
    /// True when the source set was empty and no stage was invoked.
    pub skipped: bool,
    /// Total duration.
    pub duration: Duration,
}

impl PipelineReport {
    /// Returns true if every stage passed (or none ran).
    #[must_use]
    pub fn success(&self) -> bool {
        self.stages.iter().all(StageReport::passed)
    }

    /// Returns the total number of recorded failures.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.stages.iter().map(|s| s.failures.len()).sum()
    }

    /// Returns the stages that recorded failures.
    #[must_use]
    pub fn failed_stages(&self) -> impl Iterator<Item = &StageReport> {
        self.stages.iter().filter(|s| !s.passed())
    }
}

/// Sequential check pipeline over a source file set.
#[derive(Debug)]
pub struct Pipeline {
    config: Config,
    root: PathBuf,
    reporter: Reporter,
}

impl Pipeline {
    /// Creates a pipeline rooted at the repository root.
    #[must_use]
    pub fn new(config: Config, root: PathBuf, reporter: Reporter) -> Self {
        Self {
            config,
            root,
            reporter,
        }
    }

    /// Runs all configured stages over the source set.
    ///
    /// All stages are gated together: an empty source set runs nothing,
    /// prints an informational message, and counts as success.
    pub async fn execute(&self, sources: &[String]) -> Result<PipelineReport> {
        let start = std::time::Instant::now();

        if sources.is_empty() {
            self.reporter
                .info("Nothing to check - no staged source files");
            return Ok(PipelineReport {
                stages: Vec::new(),
                skipped: true,
                duration: start.elapsed(),
            });
        }

        let mut stages = Vec::with_capacity(self.config.stages.len());
        for stage in &self.config.stages {
            stages.push(self.run_stage(stage, sources).await?);
        }

        Ok(PipelineReport {
            stages,
            skipped: false,
            duration: start.elapsed(),
        })
    }

    /// Runs a single stage, recording one failure per failing invocation.
    async fn run_stage(&self, stage: &StageConfig, sources: &[String]) -> Result<StageReport> {
        self.reporter.stage(&stage.name);

        let mut report = StageReport {
            stage: stage.name.clone(),
            failures: Vec::new(),
        };

        // Preflight: a missing tool is one recorded failure, not a crash.
        if !Executor::command_exists(stage.program()) {
            let failure = Failure {
                subject: stage.program().to_string(),
                detail: format!("command not found: {}", stage.program()),
            };
            self.reporter.failure(&failure.subject, &failure.detail);
            report.failures.push(failure);
            return Ok(report);
        }

        match stage.scope {
            StageScope::PerFile => {
                for file in sources {
                    let command = self.render(&stage.command, Some(file));
                    let output = self.invoke(&command, stage, file).await?;
                    if !output.success() {
                        let failure = record_failure(stage, file, &output);
                        self.reporter.failure(&failure.subject, &failure.detail);
                        report.failures.push(failure);
                    }
                }
            },
            StageScope::Project => {
                let command = self.render(&stage.command, None);
                let output = self.invoke(&command, stage, &stage.name).await?;
                if !output.success() {
                    let failure = record_failure(stage, stage.program(), &output);
                    self.reporter.failure(&failure.subject, &failure.detail);
                    report.failures.push(failure);
                }
            },
        }

        self.reporter.done();
        Ok(report)
    }

    /// Substitutes template placeholders.
    fn render(&self, template: &str, file: Option<&str>) -> String {
        let command =
            template.replace(COLUMNS_PLACEHOLDER, &self.config.project.columns.to_string());
        match file {
            Some(file) => command.replace(FILE_PLACEHOLDER, file),
            None => command,
        }
    }

    /// Invokes one tool subprocess with the shared execution contract.
    async fn invoke(
        &self,
        command: &str,
        stage: &StageConfig,
        label: &str,
    ) -> Result<CommandOutput> {
        tracing::debug!(stage = %stage.name, %command, "invoking check tool");

        let mut options = ExecuteOptions::default()
            .cwd(&self.root)
            .total_timeout(self.config.timeouts.total_duration())
            .idle_timeout(self.config.timeouts.idle_duration())
            .env("COLUMNS", self.config.project.columns.to_string());

        let executor = Executor::new();

        if stage.stream {
            // Live output replaces the spinner for streamed stages.
            let reporter = self.reporter;
            let sink: LineSink = Arc::new(move |stream, line| reporter.stream_line(stream, line));
            options = options.sink(sink);
            return executor.execute(command, options).await;
        }

        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .ok()
                .unwrap_or_else(ProgressStyle::default_spinner),
        );
        pb.set_message(format!("{}: {label}", stage.name));
        pb.enable_steady_tick(Duration::from_millis(100));

        let output = executor.execute(command, options).await;

        pb.finish_and_clear();
        output
    }
}

/// Builds the recorded failure for a failed invocation, honoring the
/// stage's failure policy and tagging timeout kills.
fn record_failure(stage: &StageConfig, subject: &str, output: &CommandOutput) -> Failure {
    let mut detail = match stage.failure {
        FailurePolicy::Output => output.combined_output(),
        FailurePolicy::Synthesized => {
            format!(
                "{} check failed with exit code {}",
                stage.name, output.exit_code
            )
        },
    };

    if let Some(kind) = output.timed_out {
        if detail.trim().is_empty() {
            detail = format!("({})", kind.tag());
        } else {
            detail = format!("{detail} ({})", kind.tag());
        }
    }

    Failure {
        subject: subject.to_string(),
        detail,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StageConfig;

    fn test_config(stages: Vec<StageConfig>) -> Config {
        let mut config = Config::default();
        config.stages = stages;
        config
    }

    fn per_file_stage(name: &str, command: &str) -> StageConfig {
        StageConfig {
            name: name.to_string(),
            command: command.to_string(),
            ..StageConfig::default()
        }
    }

    fn pipeline(config: Config, root: &std::path::Path) -> Pipeline {
        Pipeline::new(config, root.to_path_buf(), Reporter::new(true))
    }

    fn sources(paths: &[&str]) -> Vec<String> {
        paths.iter().map(ToString::to_string).collect()
    }

    // =========================================================================
    // Report fold tests
    // =========================================================================

    fn passed_stage(name: &str) -> StageReport {
        StageReport {
            stage: name.to_string(),
            failures: Vec::new(),
        }
    }

    fn failed_stage(name: &str, count: usize) -> StageReport {
        StageReport {
            stage: name.to_string(),
            failures: (0..count)
                .map(|i| Failure {
                    subject: format!("src/File{i}.php"),
                    detail: "boom".to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_report_success_all_passed() {
        let report = PipelineReport {
            stages: vec![passed_stage("lint"), passed_stage("tests")],
            skipped: false,
            duration: Duration::ZERO,
        };
        assert!(report.success());
        assert_eq!(report.failure_count(), 0);
        assert_eq!(report.failed_stages().count(), 0);
    }

    #[test]
    fn test_report_single_failure_blocks() {
        let report = PipelineReport {
            stages: vec![
                passed_stage("lint"),
                failed_stage("sniff", 1),
                passed_stage("tests"),
            ],
            skipped: false,
            duration: Duration::ZERO,
        };
        assert!(!report.success());
        assert_eq!(report.failure_count(), 1);
        let failed: Vec<_> = report.failed_stages().map(|s| s.stage.as_str()).collect();
        assert_eq!(failed, vec!["sniff"]);
    }

    #[test]
    fn test_report_empty_is_success() {
        let report = PipelineReport {
            stages: Vec::new(),
            skipped: true,
            duration: Duration::ZERO,
        };
        assert!(report.success());
    }

    #[test]
    fn test_report_counts_across_stages() {
        let report = PipelineReport {
            stages: vec![failed_stage("lint", 2), failed_stage("mess", 3)],
            skipped: false,
            duration: Duration::ZERO,
        };
        assert_eq!(report.failure_count(), 5);
    }

    // =========================================================================
    // record_failure tests
    // =========================================================================

    fn failed_output(exit_code: i32, stdout: &str) -> CommandOutput {
        CommandOutput {
            exit_code,
            stdout: stdout.to_string(),
            stderr: String::new(),
            timed_out: None,
            duration: Duration::ZERO,
        }
    }

    #[test]
    fn test_record_failure_output_policy() {
        let stage = per_file_stage("lint", "php -l {file}");
        let failure = record_failure(&stage, "src/Foo.php", &failed_output(255, "Parse error"));
        assert_eq!(failure.subject, "src/Foo.php");
        assert_eq!(failure.detail, "Parse error");
    }

    #[test]
    fn test_record_failure_synthesized_policy() {
        let stage = StageConfig {
            failure: FailurePolicy::Synthesized,
            ..per_file_stage("sniff", "phpcs {file}")
        };
        let failure = record_failure(&stage, "src/Foo.php", &failed_output(2, "raw noise"));
        assert_eq!(failure.subject, "src/Foo.php");
        assert_eq!(failure.detail, "sniff check failed with exit code 2");
        assert!(!failure.detail.contains("raw noise"));
    }

    #[test]
    fn test_record_failure_tags_timeouts() {
        use crate::core::executor::TimeoutKind;

        let stage = per_file_stage("mess", "phpmd {file}");
        let output = CommandOutput {
            timed_out: Some(TimeoutKind::Idle),
            ..failed_output(124, "partial output")
        };
        let failure = record_failure(&stage, "src/Foo.php", &output);
        assert_eq!(failure.detail, "partial output (idle timeout)");

        let silent = CommandOutput {
            timed_out: Some(TimeoutKind::Total),
            ..failed_output(124, "")
        };
        let failure = record_failure(&stage, "src/Foo.php", &silent);
        assert_eq!(failure.detail, "(timed out)");
    }

    // =========================================================================
    // Execution tests (real subprocesses via sh)
    // =========================================================================

    #[tokio::test]
    async fn test_empty_sources_skips_everything() {
        let temp = tempfile::TempDir::new().expect("create temp dir");
        let pipeline = pipeline(Config::default(), temp.path());

        let report = pipeline.execute(&[]).await.expect("execute");
        assert!(report.skipped);
        assert!(report.stages.is_empty());
        assert!(report.success());
    }

    #[tokio::test]
    async fn test_passing_pipeline() {
        let temp = tempfile::TempDir::new().expect("create temp dir");
        let config = test_config(vec![per_file_stage("lint", "true {file}")]);
        let pipeline = pipeline(config, temp.path());

        let report = pipeline
            .execute(&sources(&["src/A.php", "src/B.php"]))
            .await
            .expect("execute");
        assert!(!report.skipped);
        assert!(report.success());
        assert_eq!(report.stages.len(), 1);
    }

    #[tokio::test]
    async fn test_failing_file_records_output() {
        let temp = tempfile::TempDir::new().expect("create temp dir");
        let config = test_config(vec![per_file_stage(
            "lint",
            "echo \"syntax error in {file}\"; exit 1",
        )]);
        let pipeline = pipeline(config, temp.path());

        let report = pipeline
            .execute(&sources(&["src/Bad.php"]))
            .await
            .expect("execute");
        assert!(!report.success());
        assert_eq!(report.failure_count(), 1);
        let failure = &report.stages[0].failures[0];
        assert_eq!(failure.subject, "src/Bad.php");
        assert!(failure.detail.contains("syntax error in src/Bad.php"));
    }

    #[tokio::test]
    async fn test_failure_does_not_stop_later_files_or_stages() {
        let temp = tempfile::TempDir::new().expect("create temp dir");
        let marker = temp.path().join("second-stage-ran");
        let config = test_config(vec![
            per_file_stage("lint", "test {file} != src/Bad.php"),
            per_file_stage("mess", &format!("touch {}; true {{file}}", marker.display())),
        ]);
        let pipeline = pipeline(config, temp.path());

        let report = pipeline
            .execute(&sources(&["src/Bad.php", "src/Good.php"]))
            .await
            .expect("execute");

        // First stage failed for one file, second stage still ran everywhere.
        assert!(!report.success());
        assert_eq!(report.stages[0].failures.len(), 1);
        assert!(report.stages[1].passed());
        assert!(marker.exists());
    }

    #[tokio::test]
    async fn test_per_file_stage_runs_in_source_order() {
        let temp = tempfile::TempDir::new().expect("create temp dir");
        let log = temp.path().join("order.log");
        let config = test_config(vec![per_file_stage(
            "lint",
            &format!("echo {{file}} >> {}", log.display()),
        )]);
        let pipeline = pipeline(config, temp.path());

        pipeline
            .execute(&sources(&["src/Z.php", "src/A.php", "src/M.php"]))
            .await
            .expect("execute");

        let logged = std::fs::read_to_string(&log).expect("read log");
        let order: Vec<&str> = logged.lines().collect();
        assert_eq!(order, vec!["src/Z.php", "src/A.php", "src/M.php"]);
    }

    #[tokio::test]
    async fn test_project_stage_runs_once() {
        let temp = tempfile::TempDir::new().expect("create temp dir");
        let log = temp.path().join("runs.log");
        let config = test_config(vec![StageConfig {
            name: "tests".to_string(),
            command: format!("echo run >> {}", log.display()),
            scope: StageScope::Project,
            ..StageConfig::default()
        }]);
        let pipeline = pipeline(config, temp.path());

        let report = pipeline
            .execute(&sources(&["src/A.php", "src/B.php", "src/C.php"]))
            .await
            .expect("execute");

        assert!(report.success());
        let logged = std::fs::read_to_string(&log).expect("read log");
        assert_eq!(logged.lines().count(), 1);
    }

    #[tokio::test]
    async fn test_project_stage_failure_keyed_by_tool() {
        let temp = tempfile::TempDir::new().expect("create temp dir");
        let config = test_config(vec![StageConfig {
            name: "tests".to_string(),
            command: "false".to_string(),
            scope: StageScope::Project,
            ..StageConfig::default()
        }]);
        let pipeline = pipeline(config, temp.path());

        let report = pipeline
            .execute(&sources(&["src/A.php"]))
            .await
            .expect("execute");
        assert!(!report.success());
        assert_eq!(report.stages[0].failures[0].subject, "false");
    }

    #[tokio::test]
    async fn test_missing_tool_is_one_recorded_failure() {
        let temp = tempfile::TempDir::new().expect("create temp dir");
        let config = test_config(vec![per_file_stage(
            "lint",
            "definitely_not_a_real_command_12345 {file}",
        )]);
        let pipeline = pipeline(config, temp.path());

        let report = pipeline
            .execute(&sources(&["src/A.php", "src/B.php"]))
            .await
            .expect("execute");
        assert!(!report.success());
        assert_eq!(report.failure_count(), 1);
        assert!(report.stages[0].failures[0]
            .detail
            .contains("command not found"));
    }

    #[tokio::test]
    async fn test_hung_tool_recorded_as_idle_timeout_failure() {
        let temp = tempfile::TempDir::new().expect("create temp dir");
        let mut config = test_config(vec![per_file_stage(
            "mess",
            "echo started {file}; sleep 30",
        )]);
        config.timeouts.idle = "200ms".to_string();
        config.timeouts.total = "30s".to_string();
        let pipeline = pipeline(config, temp.path());

        let report = pipeline
            .execute(&sources(&["src/Slow.php"]))
            .await
            .expect("execute");
        assert!(!report.success());
        let failure = &report.stages[0].failures[0];
        assert!(failure.detail.contains("idle timeout"));
        assert!(failure.detail.contains("started src/Slow.php"));
    }

    #[test]
    fn test_render_substitutes_placeholders() {
        let temp = tempfile::TempDir::new().expect("create temp dir");
        let pipeline = pipeline(Config::default(), temp.path());

        let rendered = pipeline.render("phpunit --columns={columns}", None);
        assert_eq!(rendered, "phpunit --columns=80");

        let rendered = pipeline.render("php -l {file}", Some("src/Foo.php"));
        assert_eq!(rendered, "php -l src/Foo.php");
    }
}
