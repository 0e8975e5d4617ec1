//! Run configuration: root location, pattern sources and exclusions.

use crate::error::CleanError;
use crate::patterns::default_patterns;

use anyhow::Result;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Name of the pattern file looked up in `~/.config` when none is given
pub const DEFAULT_CONFIG_NAME: &str = "clean.maintenance";

/// Where the base pattern list comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternSource {
    /// A pattern file; a missing file is an error
    File(PathBuf),
    /// The patterns embedded in the binary
    Builtin,
}

/// Everything the engine needs for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub root: PathBuf,
    pub patterns: Vec<String>,
    pub exclude: Vec<String>,
}

/// Patterns read from a pattern file
#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
pub struct PatternFile {
    pub patterns: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
}

/// `~/.config/clean.maintenance`, if a home directory is known
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".config").join(DEFAULT_CONFIG_NAME))
}

/// Parse the plain format: one pattern per line, blanks and `#` comments ignored
pub fn parse_pattern_lines(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(String::from)
        .collect()
}

/// Load a pattern file. Files ending in `.toml` use the TOML format,
/// anything else the one-pattern-per-line format.
pub fn load_pattern_file(path: &Path) -> Result<PatternFile> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            return Err(CleanError::MissingConfig {
                path: path.to_path_buf(),
            }
            .into());
        }
        Err(err) => {
            return Err(CleanError::ConfigParse {
                path: path.to_path_buf(),
                reason: err.to_string(),
            }
            .into());
        }
    };

    if path.extension().is_some_and(|ext| ext == "toml") {
        let file: PatternFile = toml::from_str(&content).map_err(|err| CleanError::ConfigParse {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })?;
        Ok(file)
    } else {
        Ok(PatternFile {
            patterns: parse_pattern_lines(&content),
            exclude: Vec::new(),
        })
    }
}

/// Append `extra` to `base`, dropping repeated patterns but keeping first-seen order
pub fn merge_patterns(base: Vec<String>, extra: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    base.into_iter()
        .chain(extra.iter().cloned())
        .filter(|pattern| seen.insert(pattern.clone()))
        .collect()
}

impl Config {
    /// Resolve the configuration for a run.
    ///
    /// `location` defaults to the current directory. The root is only
    /// checked later, by the matcher.
    pub fn resolve(
        location: Option<PathBuf>,
        source: &PatternSource,
        extra_patterns: &[String],
        exclude: &[String],
    ) -> Result<Self> {
        let root = match location {
            Some(root) => root,
            None => std::env::current_dir().map_err(|err| CleanError::InvalidRoot {
                path: PathBuf::from("."),
                reason: err.to_string(),
            })?,
        };

        let base = match source {
            PatternSource::File(path) => load_pattern_file(path)?,
            PatternSource::Builtin => PatternFile {
                patterns: default_patterns()?,
                exclude: Vec::new(),
            },
        };

        let patterns = merge_patterns(base.patterns, extra_patterns);
        let exclude = merge_patterns(base.exclude, exclude);

        tracing::debug!(
            "Resolved {} patterns and {} exclusions for {}",
            patterns.len(),
            exclude.len(),
            root.display()
        );

        Ok(Config {
            root,
            patterns,
            exclude,
        })
    }
}
