//! The install procedure run by `start_update`.

use super::{MSG_CANCELED, MSG_CLEAN_NOT_FOUND, MSG_PATCH_NOT_FOUND, Orchestrator, Shared};
use crate::archive;
use crate::config::ConfigStore;
use crate::core::{Progress, ProgressCallback, RelaunchError, Result};
use crate::release::{ReleaseDescriptor, ReleaseSource, VersionTag};
use crate::replace::PruneReport;
use crate::transfer::{Destination, TransferChannel};
use crate::utils::fs::{ensure_dir, remove_dir_all};
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

impl<S: ReleaseSource, T: TransferChannel> Orchestrator<S, T> {
    /// Runs steps 1 to 8. `Ok` carries a version-record failure, which does
    /// not undo a successful install.
    pub(super) async fn run_install(
        &self,
        release: &ReleaseDescriptor,
        clean_install: bool,
        cancel: &CancellationToken,
    ) -> Result<Option<RelaunchError>> {
        let result = self.install_steps(release, clean_install, cancel).await;

        if let Err(e) = remove_dir_all(&self.scratch_dir) {
            warn!(target: "orchestrator", "Could not remove scratch directory: {e:#}");
        }

        match &result {
            Ok(prune) => debug!(
                target: "orchestrator",
                "Prune: {} disposed now, {} deferred, {} unchanged",
                prune.removed.len(),
                prune.queued.len(),
                prune.restored.len()
            ),
            Err(e) if e.is_canceled() => info!(target: "orchestrator", "{MSG_CANCELED}"),
            Err(e) => error!(target: "orchestrator", "Update failed: {e}"),
        }
        result?;

        Ok(self.record_version(&release.latest_version_tag).await.err())
    }

    async fn install_steps(
        &self,
        release: &ReleaseDescriptor,
        clean_install: bool,
        cancel: &CancellationToken,
    ) -> Result<PruneReport> {
        prepare_scratch(&self.scratch_dir)?;

        let uri = release.artifact_uri(clean_install);
        let artifact = self
            .transfer
            .fetch(
                uri,
                &Destination::Directory(self.scratch_dir.clone()),
                cancel,
                Some(download_callback(&self.shared)),
            )
            .await
            .map_err(|e| fold_transfer_error(e, uri, clean_install))?;

        // Past this point cancellation is ignored. `cancel()` fires the token
        // under the same lock, so a request that won the race is honored here.
        let canceled = self.shared.update(|s| {
            if cancel.is_cancelled() {
                return true;
            }
            s.phase = Some(super::InstallPhase::Installing);
            s.message = format!("Installing version {}...", release.latest_version_tag);
            false
        });
        if canceled {
            return Err(RelaunchError::Canceled);
        }

        let mut replacer = self.replacer.lock().await;
        if let Err(e) = replacer.obsolete_self().await {
            if let Err(restore) = replacer.restore_self().await {
                error!(target: "orchestrator", "Restore after failed rename also failed: {restore}");
            }
            return Err(install_failed(e));
        }

        let extracted =
            archive::install(&artifact, &self.install_dir, Some(install_callback(&self.shared)), true).await;
        let pruned = replacer.prune_self().await;
        drop(replacer);

        let report = match extracted {
            Ok(report) => report,
            Err(e) => {
                match &pruned {
                    Ok(prune) => info!(target: "orchestrator", "Rolled back {} file(s)", prune.restored.len()),
                    Err(prune_error) => error!(target: "orchestrator", "Rollback incomplete: {prune_error}"),
                }
                return Err(install_failed(e));
            }
        };
        if let Some(cleanup) = &report.archive_cleanup_error {
            warn!(target: "orchestrator", "Downloaded artifact was not deleted: {cleanup}");
        }

        let prune = pruned.map_err(install_failed)?;
        if !prune.restored.is_empty() {
            let kept: Vec<String> = prune.restored.iter().map(|p| p.display().to_string()).collect();
            info!(target: "orchestrator", "Not part of the artifact, kept as is: {}", kept.join(", "));
        }
        Ok(prune)
    }

    /// Reloads the configuration and writes the new tag if it differs.
    ///
    /// The file is read again because the archive may have replaced it.
    async fn record_version(&self, tag: &VersionTag) -> Result<()> {
        let Some(record) = &self.version_record else {
            return Ok(());
        };
        let persist_failed = |e: RelaunchError| RelaunchError::ConfigPersistFailed {
            reason: e.to_string(),
        };

        let mut store = ConfigStore::load(&record.path).await.map_err(persist_failed)?;
        let recorded = store.get(&record.section, "current_version").map(VersionTag::new);
        if recorded.as_ref() == Some(tag) {
            debug!(target: "orchestrator", "Configuration already records {tag}");
            return Ok(());
        }

        store.set(&record.section, "current_version", tag.as_str());
        store.save().map_err(|e| match e {
            RelaunchError::ConfigPersistFailed { .. } => e,
            other => persist_failed(other),
        })?;
        info!(target: "orchestrator", "Recorded version {tag} in {}", record.path.display());
        Ok(())
    }
}

fn prepare_scratch(dir: &Path) -> Result<()> {
    remove_dir_all(dir)
        .and_then(|()| ensure_dir(dir))
        .map_err(|e| RelaunchError::InstallFailed {
            reason: format!("cannot prepare scratch directory {}: {e:#}", dir.display()),
        })
}

fn download_callback(shared: &Arc<Shared>) -> ProgressCallback {
    let shared = Arc::clone(shared);
    Arc::new(move |progress: Progress| shared.set_download(progress))
}

fn install_callback(shared: &Arc<Shared>) -> ProgressCallback {
    let shared = Arc::clone(shared);
    Arc::new(move |progress: Progress| shared.set_install(progress))
}

/// A 404 from the artifact location means the artifact does not exist.
fn fold_transfer_error(error: RelaunchError, uri: &str, clean_install: bool) -> RelaunchError {
    if error.is_not_found() {
        RelaunchError::ArtifactNotFound {
            url: uri.to_string(),
            clean_install,
        }
    } else {
        error
    }
}

fn install_failed(error: RelaunchError) -> RelaunchError {
    match error {
        RelaunchError::InstallFailed { .. } => error,
        other => RelaunchError::InstallFailed {
            reason: other.to_string(),
        },
    }
}

/// Short caller-facing text for a failed install.
pub(super) fn failure_message(error: &RelaunchError) -> String {
    match error {
        RelaunchError::Canceled => MSG_CANCELED.to_string(),
        RelaunchError::ArtifactNotFound {
            clean_install: true,
            ..
        } => MSG_CLEAN_NOT_FOUND.to_string(),
        RelaunchError::ArtifactNotFound {
            clean_install: false,
            ..
        } => MSG_PATCH_NOT_FOUND.to_string(),
        other => format!("Failed to update: {other}"),
    }
}
