//! Cancelable, progress-reporting downloads.
//!
//! [`TransferChannel`] is the seam the orchestrator downloads through;
//! [`HttpTransfer`] is the production implementation over `reqwest`.
//!
//! The response body is adapted into an `AsyncRead` and consumed in chunks of
//! at most [`TRANSFER_CHUNK_SIZE`] bytes. After every chunk the progress
//! callback receives `(bytes_done, bytes_total)`, where a total of `0` means
//! the server did not send a length. Cancellation is checked while waiting for
//! the response headers and between chunks, so a canceled transfer stops
//! within one chunk of I/O. The partially written file is left on disk for the
//! caller to clean up.
//!
//! # Examples
//!
//! ```rust,no_run
//! use relaunch::transfer::{Destination, HttpTransfer, TransferChannel};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> relaunch::core::Result<()> {
//! let http = HttpTransfer::new("relaunch/0.3")?;
//! let path = http
//!     .fetch(
//!         "https://example.com/app1.0.1patch.zip",
//!         &Destination::Directory("Temp".into()),
//!         &CancellationToken::new(),
//!         None,
//!     )
//!     .await?;
//! println!("saved to {}", path.display());
//! # Ok(())
//! # }
//! ```

mod file_name;

pub use file_name::{content_disposition_filename, resolve_file_name};

use crate::constants::TRANSFER_CHUNK_SIZE;
use crate::core::{Progress, ProgressCallback, RelaunchError, Result};
use futures::TryStreamExt;
use reqwest::header::CONTENT_DISPOSITION;
use std::future::Future;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_util::io::StreamReader;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Where a download is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// Save into this directory under a name derived from the response.
    Directory(PathBuf),
    /// Save to exactly this path.
    File(PathBuf),
}

impl Destination {
    fn directory(&self) -> Option<&Path> {
        match self {
            Self::Directory(dir) => Some(dir),
            Self::File(path) => path.parent(),
        }
    }
}

/// A byte transfer from a remote location to a local file.
pub trait TransferChannel: Send + Sync {
    /// Downloads `url` to `destination` and returns the written path.
    ///
    /// Fails with [`RelaunchError::Canceled`] when `cancel` fires before the
    /// last chunk is written, and with [`RelaunchError::TransferFailed`] on a
    /// non-success status (the status code is preserved).
    fn fetch(
        &self,
        url: &str,
        destination: &Destination,
        cancel: &CancellationToken,
        progress: Option<ProgressCallback>,
    ) -> impl Future<Output = Result<PathBuf>> + Send;
}

/// HTTP(S) transfers over a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpTransfer {
    client: reqwest::Client,
}

impl HttpTransfer {
    /// Builds a client sending `user_agent` with every request.
    pub fn new(user_agent: &str) -> Result<Self> {
        let client = reqwest::Client::builder().user_agent(user_agent).build().map_err(|e| {
            RelaunchError::Other {
                message: format!("Failed to build HTTP client: {e}"),
            }
        })?;
        Ok(Self::with_client(client))
    }

    /// Wraps an existing client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
        }
    }

    /// The underlying client, shared with the release sources.
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }
}

fn transfer_error(url: &str, status: Option<u16>, reason: impl std::fmt::Display) -> RelaunchError {
    RelaunchError::TransferFailed {
        url: url.to_string(),
        status,
        reason: reason.to_string(),
    }
}

impl TransferChannel for HttpTransfer {
    async fn fetch(
        &self,
        url: &str,
        destination: &Destination,
        cancel: &CancellationToken,
        progress: Option<ProgressCallback>,
    ) -> Result<PathBuf> {
        if cancel.is_cancelled() {
            return Err(RelaunchError::Canceled);
        }
        debug!(target: "transfer", "GET {url}");

        let response = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(RelaunchError::Canceled),
            response = self.client.get(url).send() => response,
        }
        .map_err(|e| transfer_error(url, e.status().map(|s| s.as_u16()), e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(transfer_error(
                url,
                Some(status.as_u16()),
                format!("server responded with {status}"),
            ));
        }

        let total = response.content_length().unwrap_or(0);
        let path = match destination {
            Destination::File(path) => path.clone(),
            Destination::Directory(dir) => {
                let disposition =
                    response.headers().get(CONTENT_DISPOSITION).and_then(|v| v.to_str().ok());
                dir.join(resolve_file_name(disposition, response.url()))
            }
        };

        if let Some(dir) = destination.directory()
            && !dir.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| transfer_error(url, None, format!("cannot create {}: {e}", dir.display())))?;
        }
        let mut file = tokio::fs::File::create(&path)
            .await
            .map_err(|e| transfer_error(url, None, format!("cannot create {}: {e}", path.display())))?;

        let body = response.bytes_stream().map_err(std::io::Error::other);
        let mut reader = std::pin::pin!(StreamReader::new(body));
        let mut buffer = vec![0u8; TRANSFER_CHUNK_SIZE];
        let mut done = 0u64;

        loop {
            let read = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    let _ = file.flush().await;
                    info!(target: "transfer", "Download of {url} canceled after {done} bytes");
                    return Err(RelaunchError::Canceled);
                }
                read = reader.read(&mut buffer) => read,
            }
            .map_err(|e| transfer_error(url, None, e))?;

            if read == 0 {
                break;
            }
            file.write_all(&buffer[..read])
                .await
                .map_err(|e| transfer_error(url, None, format!("cannot write {}: {e}", path.display())))?;
            done += read as u64;

            if let Some(callback) = &progress {
                callback(Progress::new(done, total));
            }
        }

        file.flush().await.map_err(|e| transfer_error(url, None, e))?;
        debug!(target: "transfer", "Saved {done} bytes to {}", path.display());
        Ok(path)
    }
}
