//! Self-replacement of the running executable and its auxiliary files.
//!
//! A running executable cannot be overwritten or (on Windows) deleted, but it
//! can be renamed. An install therefore runs in three steps:
//!
//! 1. [`SelfReplacer::obsolete_self`] renames every live target aside to
//!    `<name><suffix>` (by default `app.exe` becomes `app.exe.old`).
//! 2. The archive is extracted, writing fresh files at the original paths.
//! 3. [`SelfReplacer::prune_self`] looks at each target: if a replacement
//!    arrived, the obsolete copy is disposed of; if not, the obsolete copy is
//!    renamed back (rollback).
//!
//! Between steps 1 and 3 an original path is either absent (waiting for the
//! install) or holds the replacement, and its obsolete copy is always there to
//! restore from.
//!
//! # Disposal
//!
//! How an obsolete copy is disposed of depends on the platform:
//!
//! - [`DisposalStrategy::DeferredDelete`] (Windows): the copy may still back
//!   the running process and cannot be deleted, so it is queued. The host hands
//!   the queue to an independent process at exit (see [`DeletionQueue`]).
//! - [`DisposalStrategy::UnlinkNow`] (Unix): unlinking an open file is
//!   allowed and the running image stays valid until the process exits, so
//!   the copy is removed immediately. A failed unlink falls back to the queue.
//!
//! # Examples
//!
//! ```rust,no_run
//! use relaunch::replace::{DisposalStrategy, SelfReplacer};
//! use std::time::Duration;
//!
//! # async fn example() -> relaunch::core::Result<()> {
//! let mut replacer = SelfReplacer::new(
//!     vec!["Launcher/Launcher.exe".into(), "Launcher/Launcher.dll".into()],
//!     ".old",
//!     DisposalStrategy::platform_default(),
//!     Duration::from_secs(1),
//! );
//! replacer.obsolete_self().await?;
//! // ... extract the new release ...
//! let report = replacer.prune_self().await?;
//! println!("{} restored, {} queued", report.restored.len(), report.queued.len());
//! # Ok(())
//! # }
//! ```

use crate::core::{RelaunchError, Result};
use crate::utils::fs::with_suffix;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::{debug, info, warn};

/// How obsolete copies are disposed of once their replacement is in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisposalStrategy {
    /// Queue for deletion by an external process after exit.
    DeferredDelete,
    /// Delete immediately.
    UnlinkNow,
}

impl DisposalStrategy {
    /// `DeferredDelete` on Windows, `UnlinkNow` elsewhere.
    #[must_use]
    pub const fn platform_default() -> Self {
        if cfg!(windows) { Self::DeferredDelete } else { Self::UnlinkNow }
    }
}

/// One replaceable file and the name it is renamed to while obsolete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObsoletePair {
    pub original: PathBuf,
    pub obsolete: PathBuf,
}

/// The running executable plus every auxiliary file replaced with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObsoleteFileSet {
    pairs: Vec<ObsoletePair>,
}

impl ObsoleteFileSet {
    /// Pairs each target with `target + suffix`. Duplicate targets are dropped.
    pub fn new(targets: impl IntoIterator<Item = PathBuf>, suffix: &str) -> Self {
        let mut pairs: Vec<ObsoletePair> = Vec::new();
        for original in targets {
            if pairs.iter().any(|p| p.original == original) {
                continue;
            }
            let obsolete = with_suffix(&original, suffix);
            pairs.push(ObsoletePair {
                original,
                obsolete,
            });
        }
        Self {
            pairs,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &ObsoletePair> {
        self.pairs.iter()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// Obsolete copies to delete after the process has exited.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeletionQueue {
    pub paths: Vec<PathBuf>,
    /// How long the deleting process waits before its first attempt.
    pub wait: Duration,
}

impl DeletionQueue {
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// Outcome of [`SelfReplacer::prune_self`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PruneReport {
    /// Originals that had no replacement and were rolled back.
    pub restored: Vec<PathBuf>,
    /// Obsolete copies added to the deletion queue.
    pub queued: Vec<PathBuf>,
    /// Obsolete copies deleted immediately.
    pub removed: Vec<PathBuf>,
}

impl PruneReport {
    /// Whether the call changed nothing.
    pub fn is_noop(&self) -> bool {
        self.restored.is_empty() && self.queued.is_empty() && self.removed.is_empty()
    }
}

/// Owns the obsolete-file set and the deferred-deletion queue for one process.
#[derive(Debug)]
pub struct SelfReplacer {
    files: ObsoleteFileSet,
    strategy: DisposalStrategy,
    deletion_queue: Vec<PathBuf>,
    wait: Duration,
}

fn replacement_error(operation: &str, path: &Path, error: impl std::fmt::Display) -> RelaunchError {
    RelaunchError::ReplacementFailed {
        operation: operation.to_string(),
        path: path.display().to_string(),
        reason: error.to_string(),
    }
}

impl SelfReplacer {
    pub fn new(
        targets: Vec<PathBuf>,
        suffix: &str,
        strategy: DisposalStrategy,
        wait: Duration,
    ) -> Self {
        Self {
            files: ObsoleteFileSet::new(targets, suffix),
            strategy,
            deletion_queue: Vec::new(),
            wait,
        }
    }

    pub fn files(&self) -> &ObsoleteFileSet {
        &self.files
    }

    pub fn strategy(&self) -> DisposalStrategy {
        self.strategy
    }

    /// Obsolete copies queued so far.
    pub fn pending_deletions(&self) -> &[PathBuf] {
        &self.deletion_queue
    }

    /// Renames every live target aside.
    ///
    /// A leftover obsolete copy from an earlier, unfinished attempt is deleted
    /// first. Targets that do not exist are skipped and keep any obsolete copy
    /// they have. If any rename fails, the
    /// targets already renamed by this call are moved back before the error is
    /// returned, so the set is either fully obsoleted or untouched.
    ///
    /// Returns the originals that were renamed.
    pub async fn obsolete_self(&mut self) -> Result<Vec<PathBuf>> {
        let mut renamed: Vec<&ObsoletePair> = Vec::new();

        for pair in self.files.iter() {
            if !path_exists(&pair.original).await {
                warn!(target: "replace", "{} does not exist, nothing to replace", pair.original.display());
                continue;
            }

            if path_exists(&pair.obsolete).await {
                debug!(target: "replace", "Removing stale {}", pair.obsolete.display());
                if let Err(e) = fs::remove_file(&pair.obsolete).await {
                    warn!(target: "replace", "Could not remove stale {}: {e}", pair.obsolete.display());
                }
            }
            if let Err(e) = fs::rename(&pair.original, &pair.obsolete).await {
                let error = replacement_error("obsolete", &pair.original, e);
                for done in renamed.iter().rev() {
                    if let Err(undo) = fs::rename(&done.obsolete, &done.original).await {
                        warn!(target: "replace", "Could not move {} back: {undo}", done.obsolete.display());
                    }
                }
                return Err(error);
            }
            // The queued path now holds the live file.
            self.deletion_queue.retain(|p| p != &pair.obsolete);
            debug!(target: "replace", "{} -> {}", pair.original.display(), pair.obsolete.display());
            renamed.push(pair);
        }

        Ok(renamed.into_iter().map(|p| p.original.clone()).collect())
    }

    /// Resolves every obsolete copy against its original path.
    ///
    /// With a replacement present the copy is disposed of per the
    /// [`DisposalStrategy`]; without one the copy is renamed back. Copies
    /// already queued are skipped, so a second call is a no-op. All pairs are
    /// attempted; the first failure is returned afterwards.
    pub async fn prune_self(&mut self) -> Result<PruneReport> {
        let mut report = PruneReport::default();
        let mut first_error = None;

        for pair in self.files.iter() {
            if self.deletion_queue.contains(&pair.obsolete) || !path_exists(&pair.obsolete).await {
                continue;
            }

            if path_exists(&pair.original).await {
                match self.strategy {
                    DisposalStrategy::UnlinkNow => match fs::remove_file(&pair.obsolete).await {
                        Ok(()) => report.removed.push(pair.obsolete.clone()),
                        Err(e) => {
                            debug!(target: "replace", "Unlink of {} failed ({e}), deferring", pair.obsolete.display());
                            self.deletion_queue.push(pair.obsolete.clone());
                            report.queued.push(pair.obsolete.clone());
                        }
                    },
                    DisposalStrategy::DeferredDelete => {
                        self.deletion_queue.push(pair.obsolete.clone());
                        report.queued.push(pair.obsolete.clone());
                    }
                }
            } else {
                match fs::rename(&pair.obsolete, &pair.original).await {
                    Ok(()) => {
                        info!(target: "replace", "No replacement for {}, restored previous copy", pair.original.display());
                        report.restored.push(pair.original.clone());
                    }
                    Err(e) => {
                        let error = replacement_error("restore", &pair.original, e);
                        warn!(target: "replace", "{error}");
                        first_error.get_or_insert(error);
                    }
                }
            }
        }

        match first_error {
            Some(error) => Err(error),
            None => Ok(report),
        }
    }

    /// Moves obsolete copies back to originals that are missing.
    ///
    /// Used when an install is abandoned before extraction wrote anything.
    /// An original that is present is left alone together with its obsolete
    /// copy. Returns the originals restored.
    pub async fn restore_self(&mut self) -> Result<Vec<PathBuf>> {
        let mut restored = Vec::new();
        let mut first_error = None;

        for pair in self.files.iter() {
            if self.deletion_queue.contains(&pair.obsolete) || !path_exists(&pair.obsolete).await {
                continue;
            }
            if path_exists(&pair.original).await {
                debug!(target: "replace", "{} is present, keeping it", pair.original.display());
                continue;
            }
            match fs::rename(&pair.obsolete, &pair.original).await {
                Ok(()) => restored.push(pair.original.clone()),
                Err(e) => {
                    first_error.get_or_insert(replacement_error("restore", &pair.original, e));
                }
            }
        }

        match first_error {
            Some(error) => Err(error),
            None => Ok(restored),
        }
    }

    /// Hands over the deletion queue, leaving it empty.
    pub fn take_deletion_queue(&mut self) -> DeletionQueue {
        DeletionQueue {
            paths: std::mem::take(&mut self.deletion_queue),
            wait: self.wait,
        }
    }
}

async fn path_exists(path: &Path) -> bool {
    fs::symlink_metadata(path).await.is_ok()
}
