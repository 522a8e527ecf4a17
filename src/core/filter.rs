//! Source path filtering.
//!
//! Narrows the staged-file set to checkable sources: paths under the
//! configured source directory with the configured extension. Pure, no
//! I/O, and deliberately silent about what it drops.

use regex::Regex;

/// Filter selecting source files from a staged-file set.
#[derive(Debug, Clone)]
pub struct SourceFilter {
    pattern: Regex,
}

impl SourceFilter {
    /// Builds a filter for `^<source_dir>/(.*)\.<extension>$`.
    ///
    /// Directory and extension come from configuration, never from user
    /// input; both are escaped so path fragments cannot inject pattern
    /// syntax.
    pub fn new(source_dir: &str, extension: &str) -> Result<Self, regex::Error> {
        let pattern = Regex::new(&format!(
            "^{}/(.*)\\.{}$",
            regex::escape(source_dir.trim_end_matches('/')),
            regex::escape(extension)
        ))?;
        Ok(Self { pattern })
    }

    /// Returns true if the path is a checkable source file.
    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        self.pattern.is_match(path)
    }

    /// Keeps exactly the staged paths that are checkable sources,
    /// preserving order.
    #[must_use]
    pub fn filter(&self, staged: &[String]) -> Vec<String> {
        staged
            .iter()
            .filter(|path| self.matches(path))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn php_filter() -> SourceFilter {
        SourceFilter::new("src", "php").expect("build filter")
    }

    #[rstest]
    #[case("src/Foo.php", true)]
    #[case("src/Deep/Nested/Bar.php", true)]
    #[case("src/lowercase.php", true)]
    #[case("docs/readme.md", false)]
    #[case("src/App.txt", false)]
    #[case("README.md", false)]
    #[case("composer.json", false)]
    #[case("tests/FooTest.php", false)]
    #[case("srcx/Foo.php", false)]
    #[case("src.php", false)]
    fn test_matches(#[case] path: &str, #[case] expected: bool) {
        assert_eq!(php_filter().matches(path), expected, "path: {path}");
    }

    #[test]
    fn test_filter_is_subset_preserving_order() {
        let staged = vec![
            "src/Zeta.php".to_string(),
            "README.md".to_string(),
            "src/Alpha.php".to_string(),
            "composer.json".to_string(),
        ];

        let filtered = php_filter().filter(&staged);
        assert_eq!(filtered, vec!["src/Zeta.php", "src/Alpha.php"]);
        assert!(filtered.iter().all(|f| staged.contains(f)));
    }

    #[test]
    fn test_filter_empty_input() {
        assert!(php_filter().filter(&[]).is_empty());
    }

    #[test]
    fn test_filter_nothing_matches() {
        let staged = vec!["docs/a.md".to_string(), "b.json".to_string()];
        assert!(php_filter().filter(&staged).is_empty());
    }

    #[test]
    fn test_custom_dir_and_extension() {
        let filter = SourceFilter::new("lib", "phtml").expect("build filter");
        assert!(filter.matches("lib/View.phtml"));
        assert!(!filter.matches("src/View.phtml"));
        assert!(!filter.matches("lib/View.php"));
    }

    #[test]
    fn test_trailing_slash_in_source_dir() {
        let filter = SourceFilter::new("src/", "php").expect("build filter");
        assert!(filter.matches("src/Foo.php"));
    }

    #[test]
    fn test_dot_in_extension_is_literal() {
        // A "." in the configured extension must not act as a wildcard.
        let filter = SourceFilter::new("src", "blade.php").expect("build filter");
        assert!(filter.matches("src/view.blade.php"));
        assert!(!filter.matches("src/view.bladexphp"));
    }
}
