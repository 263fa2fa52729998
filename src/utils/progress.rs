//! Progress indicators for downloads and archive installs
//!
//! Thin wrappers over `indicatif` with relaunch styling. Bars render bytes for
//! transfers and entry counts for extraction, and fall back to a spinner when
//! the total is unknown.
//!
//! # Environment Variables
//!
//! - `RELAUNCH_NO_PROGRESS`: Set to any value to disable all progress indicators
//!
//! # Examples
//!
//! ```rust
//! use relaunch::core::Progress;
//! use relaunch::utils::progress::{MultiProgress, ProgressUnit};
//!
//! let multi = MultiProgress::new(false);
//! let download = multi.add_bar(ProgressUnit::Bytes);
//! download.set_prefix("Download");
//! download.update(Progress::new(40_960, 81_920));
//! download.finish_and_clear();
//! ```

use crate::constants::NO_PROGRESS_ENV;
use crate::core::Progress;
use indicatif::{ProgressBar as IndicatifBar, ProgressStyle as IndicatifStyle};
use std::time::Duration;

/// Checks if progress bars should be disabled.
///
/// Progress bars are disabled when the `RELAUNCH_NO_PROGRESS` environment
/// variable is set to any value.
pub fn is_progress_disabled() -> bool {
    std::env::var(NO_PROGRESS_ENV).is_ok()
}

/// What a bar counts. Selects the template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressUnit {
    /// Transferred bytes, rendered as `1.2 MiB/4.0 MiB`.
    Bytes,
    /// Processed archive entries, rendered as `12/40`.
    Entries,
}

/// A progress bar with consistent styling.
///
/// Cloning shares the underlying bar, so a clone can be moved into a progress
/// callback while the original stays with the caller.
#[derive(Clone)]
pub struct ProgressBar {
    inner: IndicatifBar,
    unit: ProgressUnit,
}

impl ProgressBar {
    /// Creates a bar for the given unit, hidden when progress is disabled.
    pub fn new(unit: ProgressUnit, hidden: bool) -> Self {
        let inner = if hidden || is_progress_disabled() {
            IndicatifBar::hidden()
        } else {
            let bar = IndicatifBar::new(0);
            bar.set_style(spinner_style());
            bar
        };
        Self {
            inner,
            unit,
        }
    }

    /// Creates a spinner for indeterminate work.
    pub fn new_spinner(hidden: bool) -> Self {
        let bar = Self::new(ProgressUnit::Entries, hidden);
        bar.inner.enable_steady_tick(Duration::from_millis(100));
        bar
    }

    /// Applies a `(done, total)` report.
    ///
    /// A zero total switches the bar to spinner style, a known total to the
    /// bar style of this unit.
    pub fn update(&self, progress: Progress) {
        if progress.is_indeterminate() {
            if self.inner.length() != Some(0) {
                self.inner.set_length(0);
                self.inner.set_style(spinner_style());
            }
            self.inner.tick();
        } else if self.inner.length() != Some(progress.total) {
            self.inner.set_length(progress.total);
            self.inner.set_style(match self.unit {
                ProgressUnit::Bytes => download_style(),
                ProgressUnit::Entries => default_style(),
            });
        }
        self.inner.set_position(progress.done);
    }

    /// Sets the message displayed alongside the progress bar.
    pub fn set_message(&self, msg: impl Into<String>) {
        self.inner.set_message(msg.into());
    }

    /// Sets the prefix displayed before the progress bar.
    pub fn set_prefix(&self, prefix: impl Into<String>) {
        self.inner.set_prefix(prefix.into());
    }

    /// Finishes the bar and leaves `msg` in its place.
    pub fn finish_with_message(&self, msg: impl Into<String>) {
        self.inner.finish_with_message(msg.into());
    }

    /// Finishes the bar and clears it from the terminal.
    pub fn finish_and_clear(&self) {
        self.inner.finish_and_clear();
    }

    /// Whether the bar draws anything.
    pub fn is_hidden(&self) -> bool {
        self.inner.is_hidden()
    }
}

/// A container stacking several progress bars vertically.
pub struct MultiProgress {
    inner: indicatif::MultiProgress,
    hidden: bool,
}

impl MultiProgress {
    /// Creates an empty container. `hidden` suppresses every bar added later.
    pub fn new(hidden: bool) -> Self {
        Self {
            inner: indicatif::MultiProgress::new(),
            hidden: hidden || is_progress_disabled(),
        }
    }

    /// Creates and adds a new bar.
    pub fn add_bar(&self, unit: ProgressUnit) -> ProgressBar {
        let bar = ProgressBar::new(unit, self.hidden);
        ProgressBar {
            inner: self.inner.add(bar.inner),
            unit,
        }
    }

    /// Prints a line above the bars without tearing them.
    pub fn println(&self, msg: impl AsRef<str>) {
        if self.hidden {
            return;
        }
        let _ = self.inner.println(msg);
    }
}

fn default_style() -> IndicatifStyle {
    IndicatifStyle::default_bar()
        .template("{prefix:.bold} [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")
        .unwrap_or_else(|_| IndicatifStyle::default_bar())
        .progress_chars("━╸━")
}

fn download_style() -> IndicatifStyle {
    IndicatifStyle::default_bar()
        .template("{prefix:.bold.cyan} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta}) {msg}")
        .unwrap_or_else(|_| IndicatifStyle::default_bar())
        .progress_chars("━╸━")
}

fn spinner_style() -> IndicatifStyle {
    IndicatifStyle::default_spinner()
        .template("{prefix:.bold} {spinner:.cyan} {msg}")
        .unwrap_or_else(|_| IndicatifStyle::default_spinner())
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
}
