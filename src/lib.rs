//! globsweep - glob-driven tree cleaner
//!
//! Cleaning runs in two phases. The matcher ([`scanner::find`]) walks the
//! tree once per pattern and produces a deduplicated [`MatchSet`]; only when
//! it is complete does the remover ([`remover::remove`]) delete the set,
//! recording a per-item [`Outcome`] instead of stopping at the first failure.
//!
//! Symlinks are never followed. A matched link is removed itself, never its target.

pub mod config;
pub mod error;
pub mod patterns;
pub mod progress;
pub mod remover;
pub mod report;
pub mod scanner;

// Re-export commonly used items
pub use config::{Config, PatternSource};
pub use error::CleanError;
pub use patterns::{compile_patterns, default_patterns, CleanPattern};
pub use progress::{CancelFlag, NoProgress, Progress};
pub use remover::{remove, Filesystem, OsFilesystem, Outcome, Removal};
pub use report::Summary;
pub use scanner::{find, Match, MatchKind, MatchOptions, MatchSet};
