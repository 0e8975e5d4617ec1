//! Fatal errors that stop a run before anything is deleted.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort a run.
///
/// Per-item deletion failures are not errors: they are recorded as an
/// [`Outcome`](crate::remover::Outcome) and the run continues.
#[derive(Error, Debug)]
pub enum CleanError {
    #[error("Invalid root {}: {reason}", .path.display())]
    InvalidRoot { path: PathBuf, reason: String },

    #[error("No cleaning configuration file found at {}", .path.display())]
    MissingConfig { path: PathBuf },

    #[error("Failed to parse configuration {}: {reason}", .path.display())]
    ConfigParse { path: PathBuf, reason: String },

    #[error("Invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("Failed to list {}: {message}", display_optional(.path))]
    Traversal {
        path: Option<PathBuf>,
        message: String,
    },

    #[error("Cancelled")]
    Cancelled,
}

fn display_optional(path: &Option<PathBuf>) -> String {
    path.as_deref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "<unknown>".to_string())
}

impl CleanError {
    /// Process exit code for this error.
    ///
    /// 1 = cancelled, 2 = aborted by a traversal error, 3 = invalid root or configuration.
    pub fn exit_code(&self) -> u8 {
        match self {
            CleanError::Cancelled => 1,
            CleanError::Traversal { .. } => 2,
            CleanError::InvalidRoot { .. }
            | CleanError::MissingConfig { .. }
            | CleanError::ConfigParse { .. }
            | CleanError::InvalidPattern { .. } => 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        let traversal = CleanError::Traversal {
            path: Some(PathBuf::from("/locked")),
            message: "Permission denied".to_string(),
        };
        assert_eq!(traversal.exit_code(), 2);
        assert!(traversal.to_string().contains("/locked"));

        let missing = CleanError::MissingConfig {
            path: PathBuf::from("/nowhere/clean.maintenance"),
        };
        assert_eq!(missing.exit_code(), 3);
        assert_eq!(CleanError::Cancelled.exit_code(), 1);
    }

    #[test]
    fn test_traversal_without_path() {
        let err = CleanError::Traversal {
            path: None,
            message: "I/O error".to_string(),
        };
        assert!(err.to_string().contains("<unknown>"));
    }
}
