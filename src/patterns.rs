//! Cleaning pattern compilation and the built-in default pattern list.

use crate::error::CleanError;
use anyhow::{Context, Result};
use globset::{GlobBuilder, GlobMatcher};
use serde::Deserialize;
use std::path::Path;

/// A compiled cleaning pattern
#[derive(Debug, Clone)]
pub struct CleanPattern {
    /// The pattern as the user wrote it
    pub raw: String,
    /// Anchored patterns (leading `/`) only match relative to the root,
    /// everything else matches at any depth
    pub anchored: bool,
    /// A trailing `/` restricts the pattern to directories
    pub dir_only: bool,
    matcher: GlobMatcher,
}

impl CleanPattern {
    /// Compile a single glob pattern.
    ///
    /// `*` and `?` never cross a path separator. Unanchored patterns get an
    /// implicit `**/` prefix so `__pycache__` matches `a/b/__pycache__`.
    pub fn new(raw: &str) -> Result<Self, CleanError> {
        let untrimmed = raw.trim();
        let trimmed = untrimmed.trim_end_matches('/');
        let dir_only = trimmed.len() < untrimmed.len();
        let anchored = trimmed.starts_with('/');

        let glob = if anchored {
            trimmed.trim_start_matches('/').to_string()
        } else if trimmed.starts_with("**") {
            trimmed.to_string()
        } else {
            format!("**/{}", trimmed)
        };

        let matcher = GlobBuilder::new(&glob)
            .literal_separator(true)
            .build()
            .map_err(|source| CleanError::InvalidPattern {
                pattern: raw.to_string(),
                source,
            })?
            .compile_matcher();

        Ok(CleanPattern {
            raw: raw.to_string(),
            anchored,
            dir_only,
            matcher,
        })
    }

    /// Check a path relative to the root. The empty path (the root itself) never matches.
    pub fn is_match(&self, relative: &Path) -> bool {
        if relative.as_os_str().is_empty() {
            return false;
        }
        self.matcher.is_match(relative)
    }

    /// Check a walked entry, honoring the directory-only restriction.
    pub fn matches_entry(&self, relative: &Path, is_dir: bool) -> bool {
        (is_dir || !self.dir_only) && self.is_match(relative)
    }
}

/// Compile every pattern, failing on the first invalid one.
/// Blank patterns are skipped.
pub fn compile_patterns(patterns: &[String]) -> Result<Vec<CleanPattern>, CleanError> {
    patterns
        .iter()
        .filter(|p| {
            let keep = !p.trim().trim_matches('/').is_empty();
            if !keep {
                tracing::warn!("ignoring empty pattern '{}'", p);
            }
            keep
        })
        .map(|p| CleanPattern::new(p))
        .collect()
}

#[derive(Debug, Deserialize)]
struct DefaultsConfig {
    directories: PatternGroup,
    files: PatternGroup,
}

#[derive(Debug, Deserialize)]
struct PatternGroup {
    patterns: Vec<String>,
}

// Embed the TOML file directly in the binary at compile time
const DEFAULTS_TOML: &str = include_str!("../defaults.toml");

/// Built-in default patterns: directory patterns first, then file patterns
pub fn default_patterns() -> Result<Vec<String>> {
    let config: DefaultsConfig =
        toml::from_str(DEFAULTS_TOML).context("Failed to parse built-in defaults")?;

    Ok(config
        .directories
        .patterns
        .into_iter()
        .chain(config.files.patterns)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern(raw: &str) -> CleanPattern {
        CleanPattern::new(raw).unwrap()
    }

    #[test]
    fn test_matches_at_any_depth() {
        let p = pattern("__pycache__");
        assert!(p.is_match(Path::new("__pycache__")));
        assert!(p.is_match(Path::new("a/b/__pycache__")));
        assert!(!p.is_match(Path::new("a/__pycache__/x.pyc")));
        assert!(!p.is_match(Path::new("not__pycache__")));
    }

    #[test]
    fn test_star_stays_within_segment() {
        let p = pattern("*.log");
        assert!(p.is_match(Path::new("build.log")));
        assert!(p.is_match(Path::new("deep/dir/build.log")));
        assert!(!p.is_match(Path::new("build.log.txt")));

        let q = pattern("a?c");
        assert!(q.is_match(Path::new("x/abc")));
        assert!(!q.is_match(Path::new("x/a/c")));
    }

    #[test]
    fn test_multi_segment_pattern() {
        let p = pattern("docs/_build");
        assert!(p.is_match(Path::new("docs/_build")));
        assert!(p.is_match(Path::new("project/docs/_build")));
        assert!(!p.is_match(Path::new("_build")));
    }

    #[test]
    fn test_recursive_wildcard() {
        let p = pattern("cache/**/*.tmp");
        assert!(p.is_match(Path::new("cache/a.tmp")));
        assert!(p.is_match(Path::new("x/cache/a/b/c.tmp")));
        assert!(!p.is_match(Path::new("x/other/a.tmp")));
    }

    #[test]
    fn test_anchored_pattern() {
        let p = pattern("/build");
        assert!(p.anchored);
        assert!(p.is_match(Path::new("build")));
        assert!(!p.is_match(Path::new("sub/build")));
    }

    #[test]
    fn test_trailing_slash_is_directory_only() {
        let p = pattern("build/");
        assert!(p.dir_only);
        assert!(p.matches_entry(Path::new("a/build"), true));
        assert!(!p.matches_entry(Path::new("a/build"), false));

        let q = pattern("build");
        assert!(!q.dir_only);
        assert!(q.matches_entry(Path::new("a/build"), false));
    }

    #[test]
    fn test_root_never_matches() {
        assert!(!pattern("**").is_match(Path::new("")));
        assert!(!pattern("*").is_match(Path::new("")));
    }

    #[test]
    fn test_invalid_pattern_is_reported() {
        let err = CleanPattern::new("[unclosed").unwrap_err();
        assert!(matches!(err, CleanError::InvalidPattern { ref pattern, .. } if pattern == "[unclosed"));
    }

    #[test]
    fn test_compile_skips_blank() {
        let compiled = compile_patterns(&["".to_string(), "*.log".to_string(), "  ".to_string()])
            .unwrap();
        assert_eq!(compiled.len(), 1);
        assert_eq!(compiled[0].raw, "*.log");
    }

    #[test]
    fn test_default_patterns() {
        let defaults = default_patterns().expect("Failed to load built-in defaults");
        assert_eq!(defaults.first().map(String::as_str), Some("__pycache__"));
        assert!(defaults.contains(&"*.log".to_string()));
        assert!(compile_patterns(&defaults).is_ok());
    }
}
