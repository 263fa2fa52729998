//! Core types shared by every relaunch component.
//!
//! - [`error`] - the [`RelaunchError`] taxonomy and user-facing [`ErrorContext`]
//! - [`Progress`] - the `(done, total)` pair reported by transfers and extraction
//! - [`ProgressCallback`] - shared callback type for progress reporting

pub mod error;

pub use error::{ErrorContext, RelaunchError, user_friendly_error};

use std::sync::Arc;

/// Result alias for operations failing with a [`RelaunchError`].
pub type Result<T, E = RelaunchError> = std::result::Result<T, E>;

/// Progress of a byte transfer or an archive extraction.
///
/// A `total` of `0` means the size is unknown (the server sent no length),
/// not that the transfer is empty. Consumers must render that case as
/// indeterminate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Progress {
    /// Bytes or entries processed so far.
    pub done: u64,
    /// Bytes or entries expected, `0` when unknown.
    pub total: u64,
}

impl Progress {
    /// Create a progress value.
    #[must_use]
    pub const fn new(done: u64, total: u64) -> Self {
        Self {
            done,
            total,
        }
    }

    /// Whether the total is unknown.
    #[must_use]
    pub const fn is_indeterminate(&self) -> bool {
        self.total == 0
    }

    /// Completed fraction in `0.0..=1.0`, or `None` when the total is unknown.
    #[must_use]
    pub fn fraction(&self) -> Option<f64> {
        if self.is_indeterminate() {
            None
        } else {
            Some((self.done as f64 / self.total as f64).min(1.0))
        }
    }
}

/// Callback invoked after every chunk or archive entry.
///
/// Shared (`Arc`) because extraction reports from a blocking worker thread.
pub type ProgressCallback = Arc<dyn Fn(Progress) + Send + Sync>;
