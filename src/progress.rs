//! Progress sink used by the matcher and remover, and its terminal renderer.

use indicatif::{ProgressBar, ProgressStyle};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Receives progress events. Implementations must never block.
pub trait Progress: Sync {
    /// One item was discovered or processed
    fn advance(&self);

    /// Total number of items, announced once before removal starts
    fn set_total(&self, _total: u64) {}
}

/// Discards every event
pub struct NoProgress;

impl Progress for NoProgress {
    fn advance(&self) {}
}

impl Progress for ProgressBar {
    fn advance(&self) {
        self.inc(1);
    }

    fn set_total(&self, total: u64) {
        self.set_length(total);
    }
}

/// Spinner shown while matching, when the total is not yet known
pub fn search_spinner(hidden: bool) -> ProgressBar {
    if hidden {
        return ProgressBar::hidden();
    }

    let progress = ProgressBar::new_spinner();
    let template = "{spinner:.green} [{elapsed_precise}] Searching... {pos} matches";
    if let Ok(style) = ProgressStyle::default_spinner().template(template) {
        progress.set_style(style);
    }
    progress.enable_steady_tick(Duration::from_millis(100));
    progress
}

/// Bar shown while deleting; its length is set by the remover
pub fn delete_bar(hidden: bool) -> ProgressBar {
    if hidden {
        return ProgressBar::hidden();
    }

    let progress = ProgressBar::new(0);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} Deleting...")
    {
        progress.set_style(style.progress_chars("=>-"));
    }
    progress
}

/// Cooperative cancellation signal, checked between items
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Raise this flag on Ctrl-C instead of killing the process.
    ///
    /// Only one handler can be installed per process.
    pub fn cancel_on_interrupt(&self) -> Result<(), ctrlc::Error> {
        let flag = self.clone();
        ctrlc::set_handler(move || flag.cancel())
    }
}
