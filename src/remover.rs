//! Deletion of a match set.
//!
//! Removal is fail-soft: every item gets an [`Outcome`] and no single failure
//! stops the run.

use crate::progress::{CancelFlag, Progress};
use crate::scanner::{Match, MatchKind, MatchSet};

use rayon::prelude::*;
use std::fs;
use std::io;
use std::path::Path;

/// Platform deletion primitives
pub trait Filesystem: Sync {
    /// Remove a directory and everything below it
    fn remove_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Remove a file or a symlink (never its target)
    fn remove_file(&self, path: &Path) -> io::Result<()>;
}

/// The real filesystem
pub struct OsFilesystem;

impl Filesystem for OsFilesystem {
    fn remove_dir_all(&self, path: &Path) -> io::Result<()> {
        fs::remove_dir_all(path)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }
}

/// What happened to a single match
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Deleted,
    SkippedPermission,
    /// Already gone, e.g. consumed by an earlier removal
    SkippedNotFound,
    FailedOther(String),
}

impl Outcome {
    fn from_io_error(err: &io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::PermissionDenied => Outcome::SkippedPermission,
            io::ErrorKind::NotFound => Outcome::SkippedNotFound,
            _ => Outcome::FailedOther(err.to_string()),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::FailedOther(_))
    }
}

/// Result of removing a match set
#[derive(Debug, Default)]
pub struct Removal {
    /// One entry per processed match, in match set order
    pub outcomes: Vec<(Match, Outcome)>,
    /// Set when the run was cancelled before every match was processed
    pub cancelled: bool,
}

impl Removal {
    pub fn has_failures(&self) -> bool {
        self.outcomes.iter().any(|(_, outcome)| outcome.is_failure())
    }
}

fn remove_one(fs: &dyn Filesystem, m: &Match) -> Outcome {
    let result = match m.kind {
        MatchKind::Directory => fs.remove_dir_all(&m.path),
        MatchKind::File => fs.remove_file(&m.path),
    };

    match result {
        Ok(()) => {
            tracing::info!("cleaned: {}", m.path.display());
            Outcome::Deleted
        }
        Err(err) => {
            tracing::warn!("{}: {}", m.path.display(), err);
            Outcome::from_io_error(&err)
        }
    }
}

/// Delete every match.
///
/// The progress total is set to the size of the set before the first
/// deletion, then advanced once per processed item.
pub fn remove(
    matches: &MatchSet,
    fs: &dyn Filesystem,
    progress: &dyn Progress,
    cancel: &CancelFlag,
) -> Removal {
    progress.set_total(matches.len() as u64);

    // A match set never holds a directory together with its descendants, so
    // items can be removed independently
    let outcomes: Vec<(Match, Outcome)> = matches
        .matches()
        .par_iter()
        .filter_map(|m| {
            if cancel.is_cancelled() {
                return None;
            }
            let outcome = remove_one(fs, m);
            progress.advance();
            Some((m.clone(), outcome))
        })
        .collect();

    let cancelled = outcomes.len() < matches.len();
    if cancelled {
        tracing::warn!(
            "Cancelled after {} of {} items",
            outcomes.len(),
            matches.len()
        );
    }

    Removal {
        outcomes,
        cancelled,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NoProgress;
    use indicatif::ProgressBar;
    use std::collections::HashMap;
    use tempfile::tempdir;

    /// Filesystem that fails selected paths with a fixed error kind
    struct FlakyFilesystem {
        failures: HashMap<&'static str, io::ErrorKind>,
    }

    impl FlakyFilesystem {
        fn check(&self, path: &Path) -> io::Result<()> {
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
            match self.failures.get(name) {
                Some(kind) => Err(io::Error::new(*kind, "injected")),
                None => Ok(()),
            }
        }
    }

    impl Filesystem for FlakyFilesystem {
        fn remove_dir_all(&self, path: &Path) -> io::Result<()> {
            self.check(path)
        }

        fn remove_file(&self, path: &Path) -> io::Result<()> {
            self.check(path)
        }
    }

    fn set(paths: &[(&str, MatchKind)]) -> MatchSet {
        MatchSet::from_matches(paths.iter().map(|(p, k)| Match::new(*p, *k)))
    }

    #[test]
    fn test_permission_failure_does_not_stop_the_run() {
        let fs = FlakyFilesystem {
            failures: HashMap::from([("b", io::ErrorKind::PermissionDenied)]),
        };
        let matches = set(&[
            ("/r/a", MatchKind::File),
            ("/r/b", MatchKind::Directory),
            ("/r/c", MatchKind::File),
        ]);

        let removal = remove(&matches, &fs, &NoProgress, &CancelFlag::new());

        let outcomes: Vec<&Outcome> = removal.outcomes.iter().map(|(_, o)| o).collect();
        assert_eq!(
            outcomes,
            vec![
                &Outcome::Deleted,
                &Outcome::SkippedPermission,
                &Outcome::Deleted
            ]
        );
        assert!(!removal.has_failures());
        assert!(!removal.cancelled);
    }

    #[test]
    fn test_other_errors_are_failures() {
        let fs = FlakyFilesystem {
            failures: HashMap::from([
                ("busy", io::ErrorKind::Other),
                ("gone", io::ErrorKind::NotFound),
            ]),
        };
        let matches = set(&[("/r/busy", MatchKind::File), ("/r/gone", MatchKind::File)]);

        let removal = remove(&matches, &fs, &NoProgress, &CancelFlag::new());

        assert!(matches!(removal.outcomes[0].1, Outcome::FailedOther(_)));
        assert_eq!(removal.outcomes[1].1, Outcome::SkippedNotFound);
        assert!(removal.has_failures());
    }

    #[test]
    fn test_removes_directories_and_files() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("cache/__pycache__")).unwrap();
        fs::write(dir.path().join("cache/__pycache__/a.pyc"), "compiled").unwrap();
        fs::write(dir.path().join("cache/keep.txt"), "keep").unwrap();
        fs::write(dir.path().join("build.log"), "log").unwrap();

        let matches = MatchSet::from_matches(vec![
            Match::new(dir.path().join("cache/__pycache__"), MatchKind::Directory),
            Match::new(dir.path().join("build.log"), MatchKind::File),
        ]);
        let removal = remove(&matches, &OsFilesystem, &NoProgress, &CancelFlag::new());

        assert!(removal
            .outcomes
            .iter()
            .all(|(_, outcome)| *outcome == Outcome::Deleted));
        assert!(!dir.path().join("cache/__pycache__").exists());
        assert!(!dir.path().join("build.log").exists());
        assert!(dir.path().join("cache/keep.txt").exists());
    }

    #[test]
    fn test_already_removed_descendant_is_not_found() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("build")).unwrap();
        fs::write(dir.path().join("build/out.log"), "").unwrap();

        let parent = MatchSet::from_matches(vec![Match::new(
            dir.path().join("build"),
            MatchKind::Directory,
        )]);
        let child = MatchSet::from_matches(vec![Match::new(
            dir.path().join("build/out.log"),
            MatchKind::File,
        )]);

        remove(&parent, &OsFilesystem, &NoProgress, &CancelFlag::new());
        let removal = remove(&child, &OsFilesystem, &NoProgress, &CancelFlag::new());

        assert_eq!(removal.outcomes[0].1, Outcome::SkippedNotFound);
        assert!(!removal.has_failures());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_removal_keeps_target() {
        let outside = tempdir().unwrap();
        fs::write(outside.path().join("precious.txt"), "keep").unwrap();

        let dir = tempdir().unwrap();
        let link = dir.path().join("cache.lnk");
        std::os::unix::fs::symlink(outside.path(), &link).unwrap();

        let matches = MatchSet::from_matches(vec![Match::new(&link, MatchKind::File)]);
        let removal = remove(&matches, &OsFilesystem, &NoProgress, &CancelFlag::new());

        assert_eq!(removal.outcomes[0].1, Outcome::Deleted);
        assert!(fs::symlink_metadata(&link).is_err());
        assert!(outside.path().join("precious.txt").exists());
    }

    #[test]
    fn test_progress_total_and_advance() {
        let fs = FlakyFilesystem {
            failures: HashMap::from([("b", io::ErrorKind::PermissionDenied)]),
        };
        let matches = set(&[("/r/a", MatchKind::File), ("/r/b", MatchKind::File)]);
        let bar = ProgressBar::hidden();

        remove(&matches, &fs, &bar, &CancelFlag::new());

        assert_eq!(bar.length(), Some(2));
        assert_eq!(bar.position(), 2);
    }

    #[test]
    fn test_cancelled_before_start() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.log"), "").unwrap();

        let matches =
            MatchSet::from_matches(vec![Match::new(dir.path().join("a.log"), MatchKind::File)]);
        let cancel = CancelFlag::new();
        cancel.cancel();

        let removal = remove(&matches, &OsFilesystem, &NoProgress, &cancel);

        assert!(removal.cancelled);
        assert!(removal.outcomes.is_empty());
        assert!(dir.path().join("a.log").exists());
    }

    #[test]
    fn test_empty_set() {
        let removal = remove(
            &MatchSet::default(),
            &OsFilesystem,
            &NoProgress,
            &CancelFlag::new(),
        );
        assert!(removal.outcomes.is_empty());
        assert!(!removal.cancelled);
    }
}
