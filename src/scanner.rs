//! Pattern matching over a directory tree.
//!
//! Every pattern walks the tree under the root independently. Walks run in
//! parallel and stream what they find to the calling thread, which reports
//! progress and merges the results into one deduplicated [`MatchSet`].

use crate::error::CleanError;
use crate::patterns::CleanPattern;
use crate::progress::{CancelFlag, Progress};

use crossbeam_channel::{bounded, Sender};
use ignore::WalkBuilder;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

/// Options controlling matching behavior
#[derive(Debug, Clone, Default)]
pub struct MatchOptions {
    /// Directory names that are never descended into nor matched
    pub exclude: Vec<String>,
    /// Measure the size of every match (walks matched directories)
    pub calculate_sizes: bool,
}

/// Whether a match is removed as a whole subtree or unlinked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchKind {
    Directory,
    /// Regular files, and symlinks of any kind
    File,
}

/// A single path selected for deletion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    pub path: PathBuf,
    pub kind: MatchKind,
    /// Apparent size in bytes, 0 unless sizes were requested
    pub size: u64,
}

impl Match {
    pub fn new(path: impl Into<PathBuf>, kind: MatchKind) -> Self {
        Match {
            path: path.into(),
            kind,
            size: 0,
        }
    }
}

/// How many entries a single pattern matched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternHits {
    pub pattern: String,
    pub count: usize,
}

/// Deduplicated, sorted set of matches.
///
/// Never contains both a directory and one of its descendants.
#[derive(Debug, Clone, Default)]
pub struct MatchSet {
    matches: Vec<Match>,
    hits: Vec<PatternHits>,
    suppressed: usize,
}

impl MatchSet {
    /// Build a set from arbitrary matches, dropping duplicate paths and
    /// anything inside a matched directory.
    pub fn from_matches(matches: impl IntoIterator<Item = Match>) -> Self {
        let mut by_path: BTreeMap<PathBuf, MatchKind> = BTreeMap::new();
        for m in matches {
            by_path.entry(m.path).or_insert(m.kind);
        }
        let (matches, suppressed) = suppress_descendants(by_path);

        MatchSet {
            matches,
            hits: Vec::new(),
            suppressed,
        }
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Match> {
        self.matches.iter()
    }

    pub fn matches(&self) -> &[Match] {
        &self.matches
    }

    /// Per-pattern hit counts, in pattern order
    pub fn hits(&self) -> &[PatternHits] {
        &self.hits
    }

    /// Number of matches dropped because an ancestor directory also matched
    pub fn suppressed(&self) -> usize {
        self.suppressed
    }

    /// Drop matches before removal, e.g. after asking the user
    pub fn retain(&mut self, keep: impl FnMut(&Match) -> bool) {
        self.matches.retain(keep);
    }

    /// Total size of all matches
    pub fn total_size(&self) -> u64 {
        self.matches.iter().map(|m| m.size).sum()
    }
}

impl<'a> IntoIterator for &'a MatchSet {
    type Item = &'a Match;
    type IntoIter = std::slice::Iter<'a, Match>;

    fn into_iter(self) -> Self::IntoIter {
        self.matches.iter()
    }
}

/// Message sent from a pattern walk to the collecting thread
enum Found {
    Entry {
        pattern: usize,
        path: PathBuf,
        kind: MatchKind,
    },
    Failed(CleanError),
}

/// Check if a directory should be excluded based on directory name matching.
/// `path` is relative to the root, so the root's own name never counts.
pub fn should_exclude_path(path: &Path, excludes: &[String]) -> bool {
    if excludes.is_empty() {
        return false;
    }

    // Check each component of the path
    for component in path.components() {
        if let std::path::Component::Normal(name) = component {
            let dir_name = name.to_string_lossy();
            if excludes.iter().any(|exclude| exclude == dir_name.as_ref()) {
                return true;
            }
        }
    }

    false
}

/// Resolve the root to a canonical directory path
fn canonical_root(root: &Path) -> Result<PathBuf, CleanError> {
    let canonical = root.canonicalize().map_err(|err| CleanError::InvalidRoot {
        path: root.to_path_buf(),
        reason: err.to_string(),
    })?;

    if !canonical.is_dir() {
        return Err(CleanError::InvalidRoot {
            path: root.to_path_buf(),
            reason: "not a directory".to_string(),
        });
    }

    Ok(canonical)
}

/// Dig the offending path out of a walk error
fn error_path(err: &ignore::Error) -> Option<PathBuf> {
    match err {
        ignore::Error::WithPath { path, .. } => Some(path.clone()),
        ignore::Error::WithDepth { err, .. } | ignore::Error::WithLineNumber { err, .. } => {
            error_path(err)
        }
        _ => None,
    }
}

/// The OS error behind a walk error, without the path the walker wraps around it
fn io_message(err: &io::Error) -> String {
    err.get_ref()
        .and_then(|inner| inner.downcast_ref::<walkdir::Error>())
        .and_then(walkdir::Error::io_error)
        .unwrap_or(err)
        .to_string()
}

fn traversal_error(err: ignore::Error) -> CleanError {
    let message = err
        .io_error()
        .map(io_message)
        .unwrap_or_else(|| err.to_string());

    CleanError::Traversal {
        path: error_path(&err),
        message,
    }
}

/// Walk the whole tree for one pattern and send every match.
///
/// Symlinks are never followed. A matched directory is sent from the entry
/// filter and never listed, so its contents (readable or not) stay unvisited.
fn walk_pattern(
    root: &Path,
    index: usize,
    pattern: &CleanPattern,
    exclude: &[String],
    sender: &Sender<Found>,
    abort: &AtomicBool,
    cancel: &CancelFlag,
) {
    let root_clone = root.to_path_buf();
    let pattern_clone = pattern.clone();
    let exclude_clone = exclude.to_vec();
    let dir_sender = sender.clone();

    let walker = WalkBuilder::new(root)
        .hidden(false)
        .parents(false)
        .ignore(false)
        .git_ignore(false)
        .git_global(false)
        .git_exclude(false)
        .follow_links(false)
        .filter_entry(move |entry| {
            if entry.depth() == 0 || !entry.file_type().is_some_and(|ft| ft.is_dir()) {
                return true;
            }

            let relative = match entry.path().strip_prefix(&root_clone) {
                Ok(relative) => relative,
                Err(_) => return true,
            };

            // Skip user-excluded directories
            if should_exclude_path(relative, &exclude_clone) {
                tracing::debug!("Skipping excluded directory: {}", entry.path().display());
                return false;
            }

            // Contents of a matched directory go with it
            if pattern_clone.matches_entry(relative, true) {
                let found = Found::Entry {
                    pattern: index,
                    path: entry.path().to_path_buf(),
                    kind: MatchKind::Directory,
                };
                dir_sender.send(found).ok();
                return false;
            }

            true
        })
        .build();

    for result in walker {
        if abort.load(Ordering::Relaxed) || cancel.is_cancelled() {
            return;
        }

        let entry = match result {
            Ok(entry) => entry,
            Err(err) => {
                abort.store(true, Ordering::Relaxed);
                sender.send(Found::Failed(traversal_error(err))).ok();
                return;
            }
        };

        // Directories were handled by the filter
        if entry.depth() == 0 || entry.file_type().is_some_and(|ft| ft.is_dir()) {
            continue;
        }

        let path = entry.path();
        let Ok(relative) = path.strip_prefix(root) else {
            continue;
        };
        if !pattern.matches_entry(relative, false) {
            continue;
        }

        let found = Found::Entry {
            pattern: index,
            path: path.to_path_buf(),
            kind: MatchKind::File,
        };
        if sender.send(found).is_err() {
            // Receiver dropped, stop walking
            return;
        }
    }
}

/// Drop every path that lives inside a matched directory.
///
/// Relies on `BTreeMap` ordering: a directory sorts directly before its descendants.
fn suppress_descendants(by_path: BTreeMap<PathBuf, MatchKind>) -> (Vec<Match>, usize) {
    let mut matches: Vec<Match> = Vec::with_capacity(by_path.len());
    let mut suppressed = 0usize;
    let mut current_dir: Option<PathBuf> = None;

    for (path, kind) in by_path {
        if let Some(dir) = &current_dir {
            if path.starts_with(dir) {
                suppressed += 1;
                continue;
            }
        }

        if kind == MatchKind::Directory {
            current_dir = Some(path.clone());
        }
        matches.push(Match::new(path, kind));
    }

    (matches, suppressed)
}

/// Calculate the apparent size of a match without following symlinks
fn measure(m: &Match) -> u64 {
    match m.kind {
        MatchKind::File => fs::symlink_metadata(&m.path).map(|meta| meta.len()).unwrap_or(0),
        MatchKind::Directory => walkdir::WalkDir::new(&m.path)
            .follow_links(false)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter_map(|e| e.metadata().ok())
            .map(|meta| meta.len())
            .sum(),
    }
}

/// Find every entry under `root` matching any of `patterns`.
///
/// Fails fast: a directory that cannot be listed aborts the whole search and
/// discards what was found so far.
pub fn find(
    root: &Path,
    patterns: &[CleanPattern],
    options: &MatchOptions,
    progress: &dyn Progress,
    cancel: &CancelFlag,
) -> Result<MatchSet, CleanError> {
    let root = canonical_root(root)?;

    let mut hits: Vec<PatternHits> = patterns
        .iter()
        .map(|p| PatternHits {
            pattern: p.raw.clone(),
            count: 0,
        })
        .collect();

    if patterns.is_empty() {
        return Ok(MatchSet {
            hits,
            ..MatchSet::default()
        });
    }

    let abort = AtomicBool::new(false);
    let (sender, receiver) = bounded::<Found>(256);
    let mut by_path: BTreeMap<PathBuf, MatchKind> = BTreeMap::new();
    let mut failure: Option<CleanError> = None;

    let root_ref = &root;
    let abort_ref = &abort;
    let exclude = options.exclude.as_slice();

    thread::scope(|scope| {
        // Producer: one walk per pattern, in parallel
        scope.spawn(move || {
            patterns
                .par_iter()
                .enumerate()
                .for_each_with(sender, |sender, (index, pattern)| {
                    walk_pattern(root_ref, index, pattern, exclude, sender, abort_ref, cancel);
                });
        });

        // Consumer: keep draining until every walk is done so none blocks on a full channel
        for found in receiver.iter() {
            match found {
                Found::Entry {
                    pattern,
                    path,
                    kind,
                } => {
                    if failure.is_some() {
                        continue;
                    }
                    progress.advance();
                    hits[pattern].count += 1;
                    by_path.entry(path).or_insert(kind);
                }
                Found::Failed(err) => {
                    tracing::error!("{}", err);
                    if failure.is_none() {
                        failure = Some(err);
                    }
                }
            }
        }
    });

    if let Some(err) = failure {
        return Err(err);
    }
    if cancel.is_cancelled() {
        return Err(CleanError::Cancelled);
    }

    let (mut matches, suppressed) = suppress_descendants(by_path);

    if options.calculate_sizes {
        matches.par_iter_mut().for_each(|m| m.size = measure(m));
    }

    tracing::debug!(
        "Found {} matches under {} ({} inside matched directories)",
        matches.len(),
        root.display(),
        suppressed
    );

    Ok(MatchSet {
        matches,
        hits,
        suppressed,
    })
}
