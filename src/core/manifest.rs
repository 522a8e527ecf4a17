//! Dependency manifest advisory.
//!
//! Committing `composer.json` without `composer.lock` is usually an
//! oversight. The check is purely informational: it never fails the
//! pipeline and never blocks the commit.

/// Manifest/lock file pair to watch for.
#[derive(Debug, Clone)]
pub struct ManifestPair {
    /// Dependency-declaration file name.
    pub manifest: String,
    /// Pinned-versions file name.
    pub lock: String,
}

impl Default for ManifestPair {
    fn default() -> Self {
        Self {
            manifest: "composer.json".to_string(),
            lock: "composer.lock".to_string(),
        }
    }
}

/// Returns an advisory message if the manifest is staged without its lock.
#[must_use]
pub fn advisory(staged: &[String], pair: &ManifestPair) -> Option<String> {
    let has_manifest = staged.iter().any(|p| p == &pair.manifest);
    let has_lock = staged.iter().any(|p| p == &pair.lock);

    if has_manifest && !has_lock {
        Some(format!(
            "{} was staged without {} - did you forget to commit the lock file?",
            pair.manifest, pair.lock
        ))
    } else {
        None
    }
}
