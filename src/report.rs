//! Summary of a run and the exit code policy.

use crate::remover::{Outcome, Removal};
use crate::scanner::{Match, MatchKind, MatchSet};

use colored::Colorize;
use humansize::{format_size, BINARY};
use std::path::Path;

/// Outcome counts for one kind of match
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Counts {
    pub deleted: usize,
    pub skipped_permission: usize,
    pub skipped_not_found: usize,
    pub failed: usize,
}

impl Counts {
    fn record(&mut self, outcome: &Outcome) {
        match outcome {
            Outcome::Deleted => self.deleted += 1,
            Outcome::SkippedPermission => self.skipped_permission += 1,
            Outcome::SkippedNotFound => self.skipped_not_found += 1,
            Outcome::FailedOther(_) => self.failed += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.deleted + self.skipped_permission + self.skipped_not_found + self.failed
    }
}

/// Counts by kind, plus reclaimed bytes
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Summary {
    pub directories: Counts,
    pub files: Counts,
    /// Sum of the sizes of deleted matches
    pub reclaimed: u64,
    pub cancelled: bool,
}

impl Summary {
    pub fn from_removal(removal: &Removal) -> Self {
        let mut summary = Summary {
            cancelled: removal.cancelled,
            ..Summary::default()
        };

        for (m, outcome) in &removal.outcomes {
            match m.kind {
                MatchKind::Directory => summary.directories.record(outcome),
                MatchKind::File => summary.files.record(outcome),
            }
            if *outcome == Outcome::Deleted {
                summary.reclaimed += m.size;
            }
        }

        summary
    }

    /// 0 when nothing failed, 1 on any failure or cancellation.
    /// Skipped items do not count as failures.
    pub fn exit_code(&self) -> u8 {
        if self.cancelled || self.directories.failed > 0 || self.files.failed > 0 {
            1
        } else {
            0
        }
    }
}

/// Per-item lines: skipped and failed items always, deleted ones when verbose
pub fn print_outcomes(removal: &Removal, verbose: bool) {
    for (m, outcome) in &removal.outcomes {
        match describe(m, outcome) {
            Some(message) if outcome.is_failure() => eprintln!("{}", message.red()),
            Some(message) => eprintln!("{}", message.yellow()),
            None if verbose => println!("{} {}", "Cleaned:".green(), m.path.display()),
            None => {}
        }
    }
}

/// Human-readable line for an item that was not deleted
pub fn describe(m: &Match, outcome: &Outcome) -> Option<String> {
    let path = m.path.display();
    match outcome {
        Outcome::Deleted => None,
        Outcome::SkippedPermission => {
            Some(format!("No permission to delete {}, skipping...", path))
        }
        Outcome::SkippedNotFound => Some(format!("{} is already gone, skipping...", path)),
        Outcome::FailedOther(reason) => {
            Some(format!("Error removing {}: {}. Skipping.", path, reason))
        }
    }
}

fn kind_label(kind: MatchKind) -> &'static str {
    match kind {
        MatchKind::Directory => "dir ",
        MatchKind::File => "file",
    }
}

/// Path relative to the root for display, absolute if it lies elsewhere
fn display_path<'a>(path: &'a Path, root: &Path) -> &'a Path {
    path.strip_prefix(root).unwrap_or(path)
}

/// List every match, then how many entries each pattern hit
pub fn print_matches(set: &MatchSet, root: &Path, sizes: bool) {
    for m in set {
        if sizes {
            println!(
                "  {} {} ({})",
                kind_label(m.kind).dimmed(),
                display_path(&m.path, root).display(),
                format_size(m.size, BINARY)
            );
        } else {
            println!(
                "  {} {}",
                kind_label(m.kind).dimmed(),
                display_path(&m.path, root).display()
            );
        }
    }

    for hits in set.hits() {
        println!("  {}: {} matches", hits.pattern.cyan(), hits.count);
    }
    if set.suppressed() > 0 {
        println!("  {} entries inside matched directories", set.suppressed());
    }
}

fn print_section(title: &str, counts: &Counts) {
    println!("\n{}", title.bold());
    println!("{}", "-".repeat(title.len()));
    println!("  Deleted:              {}", counts.deleted.to_string().green());
    if counts.skipped_permission > 0 {
        println!(
            "  Skipped (permission): {}",
            counts.skipped_permission.to_string().yellow()
        );
    }
    if counts.skipped_not_found > 0 {
        println!("  Already gone:         {}", counts.skipped_not_found);
    }
    if counts.failed > 0 {
        println!("  Failed:               {}", counts.failed.to_string().red());
    }
}

/// Print the two-section summary
pub fn print_summary(summary: &Summary, sizes: bool) {
    print_section("CLEANED DIRECTORIES", &summary.directories);
    print_section("CLEANED FILES", &summary.files);

    println!("========================================");
    if sizes {
        println!(
            "Total Size Removed: {}",
            format_size(summary.reclaimed, BINARY).bold().red()
        );
    }
    if summary.cancelled {
        println!("{}", "Cancelled before every match was processed.".yellow());
    }
}
