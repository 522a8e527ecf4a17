//! Git repository operations.
//!
//! This module provides the staged-file collector: repository discovery,
//! base-revision resolution, and the status-filtered diff query that
//! produces the set of files to gate.

use crate::core::error::{Error, Result};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Hash of the empty tree, used as the diff base before the first commit.
pub const EMPTY_TREE: &str = "4b825dc642cb6eb9a060e54bf8d69288fbee4904";

/// Change status of a staged file, as reported by `git diff`.
///
/// Filtering to the allowed subset happens at the query level via
/// `--diff-filter`, never after the fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileStatus {
    /// File was added to the index.
    Added,
    /// Pairing of the file is broken.
    PairingBroken,
    /// File was copied.
    Copied,
    /// File was deleted.
    Deleted,
    /// File contents were modified.
    Modified,
    /// File was renamed.
    Renamed,
    /// File type changed (e.g. regular file to symlink).
    TypeChanged,
    /// File is unmerged.
    Unmerged,
    /// Status is unknown to git.
    Unknown,
}

impl FileStatus {
    /// Returns the one-letter status code git uses for this status.
    #[must_use]
    pub const fn code(self) -> char {
        match self {
            Self::Added => 'A',
            Self::PairingBroken => 'B',
            Self::Copied => 'C',
            Self::Deleted => 'D',
            Self::Modified => 'M',
            Self::Renamed => 'R',
            Self::TypeChanged => 'T',
            Self::Unmerged => 'U',
            Self::Unknown => 'X',
        }
    }
}

/// Statuses a staged file may have to be checked by the pipeline.
pub const ALLOWED_STATUSES: &[FileStatus] = &[FileStatus::Added, FileStatus::Modified];

/// Builds the `--diff-filter` argument from a set of statuses.
#[must_use]
pub fn diff_filter(statuses: &[FileStatus]) -> String {
    statuses.iter().map(|s| s.code()).collect()
}

/// Represents a Git repository.
#[derive(Debug, Clone)]
pub struct GitRepo {
    /// Root directory of the repository (where .git is).
    root: PathBuf,
    /// Path to the .git directory (or file for worktrees).
    git_dir: PathBuf,
}

impl GitRepo {
    /// Discovers the Git repository from the current directory.
    pub fn discover() -> Result<Self> {
        Self::discover_from(&std::env::current_dir().map_err(|e| Error::io("get current dir", e))?)
    }

    /// Discovers the Git repository from a specific path.
    pub fn discover_from(path: &Path) -> Result<Self> {
        let output = Command::new("git")
            .args(["rev-parse", "--show-toplevel", "--git-dir"])
            .current_dir(path)
            .output()
            .map_err(|e| Error::io("run git rev-parse", e))?;

        if !output.status.success() {
            return Err(Error::NotGitRepo);
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let mut lines = stdout.lines();

        let root = lines.next().map(PathBuf::from).ok_or(Error::NotGitRepo)?;

        let git_dir = lines
            .next()
            .map(|s| {
                let p = PathBuf::from(s);
                if p.is_absolute() {
                    p
                } else {
                    root.join(p)
                }
            })
            .ok_or(Error::NotGitRepo)?;

        Ok(Self { root, git_dir })
    }

    /// Returns the root directory of the repository.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the .git directory path.
    #[must_use]
    pub fn git_dir(&self) -> &Path {
        &self.git_dir
    }

    /// Returns the hooks directory path.
    #[must_use]
    pub fn hooks_dir(&self) -> PathBuf {
        // Check for custom hooks path first
        if let Ok(output) = Command::new("git")
            .args(["config", "--get", "core.hooksPath"])
            .current_dir(&self.root)
            .output()
        {
            if output.status.success() {
                let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if !path.is_empty() {
                    let hooks_path = PathBuf::from(&path);
                    if hooks_path.is_absolute() {
                        return hooks_path;
                    }
                    return self.root.join(hooks_path);
                }
            }
        }

        // Default to .git/hooks
        self.git_dir.join("hooks")
    }

    /// Returns the path to a specific hook.
    #[must_use]
    pub fn hook_path(&self, hook_name: &str) -> PathBuf {
        self.hooks_dir().join(hook_name)
    }

    /// Returns true if HEAD resolves to a commit.
    ///
    /// Any failure here (empty repository, broken ref, git missing from a
    /// subshell) is tolerated and only means we diff against the empty
    /// tree instead.
    #[must_use]
    pub fn head_exists(&self) -> bool {
        Command::new("git")
            .args(["rev-parse", "--verify", "--quiet", "HEAD"])
            .current_dir(&self.root)
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    /// Returns the repo-relative paths of staged files whose status is in
    /// [`ALLOWED_STATUSES`], in diff-query output order.
    ///
    /// An empty index is success with an empty list; the diff query itself
    /// exiting nonzero is an infrastructure error and aborts the run.
    pub fn staged_files(&self) -> Result<Vec<String>> {
        let base = if self.head_exists() {
            "HEAD".to_string()
        } else {
            tracing::debug!("HEAD not found, diffing against the empty tree");
            EMPTY_TREE.to_string()
        };

        let filter = format!("--diff-filter={}", diff_filter(ALLOWED_STATUSES));
        let output = Command::new("git")
            .args(["diff", "--cached", "--name-only", &filter, &base])
            .current_dir(&self.root)
            .output()
            .map_err(|e| Error::io("get staged files", e))?;

        if !output.status.success() {
            return Err(Error::git(
                "diff --cached",
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        // Collapse line terminators and whitespace runs, drop empty tokens.
        let files = String::from_utf8_lossy(&output.stdout)
            .split_whitespace()
            .map(ToString::to_string)
            .collect();

        Ok(files)
    }
}
