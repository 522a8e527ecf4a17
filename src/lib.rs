//! # commit-gate
//!
//! Pre-commit quality gate for PHP projects.
//!
//! `commit-gate` inspects the files staged for a commit, narrows them to
//! PHP sources under the project source directory, and runs a fixed
//! sequential pipeline of external quality checks against them: syntax
//! lint, style-fixer dry run, coding-standard sniffing, mess detection,
//! and finally the project test suite. Any failing stage blocks the
//! commit; the tools themselves are opaque subprocess collaborators.
//!
//! ## Example
//!
//! ```rust,no_run
//! use commit_gate::{Config, GitRepo, Pipeline, Reporter, SourceFilter};
//!
//! #[tokio::main]
//! async fn main() -> commit_gate::Result<()> {
//!     let config = Config::load_or_default()?;
//!     let repo = GitRepo::discover()?;
//!
//!     // Collect staged files and narrow to checkable sources
//!     let staged = repo.staged_files()?;
//!     let filter = SourceFilter::new(&config.project.source_dir, &config.project.extension)
//!         .map_err(|e| commit_gate::Error::Internal {
//!             message: e.to_string(),
//!         })?;
//!     let sources = filter.filter(&staged);
//!
//!     // Run the gate; a failed report means the commit is blocked
//!     let reporter = Reporter::new(false);
//!     let pipeline = Pipeline::new(config, repo.root().to_path_buf(), reporter);
//!     let report = pipeline.execute(&sources).await?;
//!
//!     if report.success() {
//!         Ok(())
//!     } else {
//!         std::process::exit(1);
//!     }
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/commit-gate/0.1.0")]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod cli;
pub mod config;
pub mod core;
pub mod report;
pub mod stages;

// Re-export main types for convenience
pub use config::Config;
pub use core::error::{Error, Result};
pub use core::filter::SourceFilter;
pub use core::git::GitRepo;
pub use core::pipeline::{Pipeline, PipelineReport, StageReport};
pub use report::Reporter;
