//! Styled result reporting.
//!
//! All human-facing output goes through the [`Reporter`]: the run banner,
//! underlined stage headers with their "Done!" markers, one-line failure
//! entries, the manifest advisory, and the live line stream from the test
//! stage. The formatting is cosmetic; nothing parses it.

use crate::core::executor::OutputStream;
use console::style;
use regex::Regex;
use std::sync::OnceLock;

/// Marker prefixed to every recorded failure line.
const FAILURE_MARKER: &str = "✗";

fn whitespace_runs() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("static pattern"))
}

/// Collapses line breaks and whitespace runs into single spaces.
#[must_use]
pub fn collapse_whitespace(text: &str) -> String {
    whitespace_runs().replace_all(text.trim(), " ").into_owned()
}

/// Formats one failure entry as a single marked line.
#[must_use]
pub fn format_failure(subject: &str, detail: &str) -> String {
    let detail = collapse_whitespace(detail);
    if detail.is_empty() {
        format!("{FAILURE_MARKER} {subject}")
    } else {
        format!("{FAILURE_MARKER} {subject}: {detail}")
    }
}

/// Console reporter for pipeline progress and results.
#[derive(Debug, Clone, Copy, Default)]
pub struct Reporter {
    quiet: bool,
}

impl Reporter {
    /// Creates a reporter; `quiet` suppresses progress but never failures.
    #[must_use]
    pub const fn new(quiet: bool) -> Self {
        Self { quiet }
    }

    /// Prints the run title banner.
    pub fn banner(&self, title: &str) {
        if self.quiet {
            return;
        }
        eprintln!("{}", style(title).cyan().bold());
    }

    /// Prints an underlined stage header.
    pub fn stage(&self, name: &str) {
        if self.quiet {
            return;
        }
        eprintln!();
        eprintln!("{}", style(format!("Running {name}")).underlined());
    }

    /// Prints the per-stage completion marker.
    pub fn done(&self) {
        if self.quiet {
            return;
        }
        eprintln!("{}", style("Done!").green());
    }

    /// Prints an informational line.
    pub fn info(&self, message: &str) {
        if self.quiet {
            return;
        }
        eprintln!("{} {message}", style("•").cyan());
    }

    /// Prints a non-blocking advisory.
    pub fn advisory(&self, message: &str) {
        eprintln!("{} {message}", style("!").yellow());
    }

    /// Prints one recorded failure as a single line.
    pub fn failure(&self, subject: &str, detail: &str) {
        eprintln!("{}", style(format_failure(subject, detail)).red());
    }

    /// Forwards one live output line from a streamed subprocess,
    /// tagged by origin stream.
    pub fn stream_line(&self, stream: OutputStream, line: &str) {
        match stream {
            OutputStream::Stdout => eprintln!("  {line}"),
            OutputStream::Stderr => eprintln!("  {} {line}", style("[err]").red()),
        }
    }

    /// Prints the final success message.
    pub fn summary_success(&self) {
        eprintln!(
            "{} All checks passed - commit allowed",
            style("✓").green().bold()
        );
    }

    /// Prints the final blocking message.
    pub fn summary_failure(&self, failures: usize) {
        eprintln!(
            "{} {failures} failure(s) reported - commit blocked",
            style("✗").red().bold()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // collapse_whitespace tests
    // =========================================================================

    #[test]
    fn test_collapse_linebreaks() {
        assert_eq!(
            collapse_whitespace("error on\nline two\r\nline three"),
            "error on line two line three"
        );
    }

    #[test]
    fn test_collapse_space_runs() {
        assert_eq!(collapse_whitespace("a   b\t\tc"), "a b c");
    }

    #[test]
    fn test_collapse_trims_edges() {
        assert_eq!(collapse_whitespace("  padded  \n"), "padded");
    }

    #[test]
    fn test_collapse_empty() {
        assert_eq!(collapse_whitespace(""), "");
        assert_eq!(collapse_whitespace("   \n\t  "), "");
    }

    #[test]
    fn test_collapse_already_flat() {
        assert_eq!(collapse_whitespace("single line"), "single line");
    }

    // =========================================================================
    // format_failure tests
    // =========================================================================

    #[test]
    fn test_format_failure_single_line() {
        assert_eq!(
            format_failure("src/Foo.php", "PHP Parse error:\n  unexpected '}'"),
            "✗ src/Foo.php: PHP Parse error: unexpected '}'"
        );
    }

    #[test]
    fn test_format_failure_empty_detail() {
        assert_eq!(format_failure("src/Foo.php", "   \n"), "✗ src/Foo.php");
    }

    #[test]
    fn test_reporter_constructors() {
        let loud = Reporter::new(false);
        let quiet = Reporter::new(true);
        assert!(format!("{:?}", loud).contains("Reporter"));
        assert!(format!("{:?}", quiet).contains("true"));
    }
}
