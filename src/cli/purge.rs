//! `purge` - the deferred-deletion process.
//!
//! Spawned by the exiting launcher with the obsolete copies it could not
//! delete itself. Waits for the parent to release its files, then deletes
//! each path with exponential backoff.

use crate::constants::{PURGE_BACKOFF_START_MS, PURGE_MAX_ATTEMPTS};
use anyhow::{Result, bail};
use clap::Args;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio_retry::Retry;
use tokio_retry::strategy::ExponentialBackoff;
use tracing::{debug, info, warn};

#[derive(Args, Debug)]
pub struct PurgeCommand {
    /// Milliseconds to wait before the first attempt.
    #[arg(long, default_value_t = 1000)]
    pub wait_ms: u64,

    /// Files to delete.
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,
}

impl PurgeCommand {
    pub async fn execute(self) -> Result<()> {
        tokio::time::sleep(Duration::from_millis(self.wait_ms)).await;

        let mut failed = Vec::new();
        for path in &self.paths {
            match delete_with_retry(path).await {
                Ok(()) => info!(target: "replace", "Deleted {}", path.display()),
                Err(e) => {
                    warn!(target: "replace", "Could not delete {}: {e}", path.display());
                    failed.push(path.display().to_string());
                }
            }
        }

        if !failed.is_empty() {
            bail!("Could not delete {}", failed.join(", "));
        }
        Ok(())
    }
}

/// Deletes a file, treating an already missing file as done.
async fn delete_with_retry(path: &Path) -> io::Result<()> {
    // 100ms, 200ms, 400ms, ...
    let retry_strategy = ExponentialBackoff::from_millis(2)
        .factor(PURGE_BACKOFF_START_MS / 2)
        .max_delay(Duration::from_secs(2))
        .take(PURGE_MAX_ATTEMPTS - 1);

    Retry::spawn(retry_strategy, || async move {
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => {
                debug!(target: "replace", "Delete of {} failed, retrying: {e}", path.display());
                Err(e)
            }
        }
    })
    .await
}
