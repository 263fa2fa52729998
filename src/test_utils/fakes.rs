//! In-memory stand-ins for the release source and the transfer channel.

use crate::core::{Progress, ProgressCallback, RelaunchError, Result};
use crate::release::{ReleaseDescriptor, ReleaseSource};
use crate::transfer::{Destination, TransferChannel};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

/// A release source answering from memory. Clones share state.
#[derive(Clone)]
pub struct FakeSource {
    release: Arc<Mutex<std::result::Result<ReleaseDescriptor, String>>>,
    calls: Arc<AtomicUsize>,
}

impl FakeSource {
    pub fn new(release: ReleaseDescriptor) -> Self {
        Self {
            release: Arc::new(Mutex::new(Ok(release))),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// A source whose every query fails with `reason`.
    pub fn failing(reason: &str) -> Self {
        Self {
            release: Arc::new(Mutex::new(Err(reason.to_string()))),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn set_release(&self, release: ReleaseDescriptor) {
        *self.release.lock().unwrap() = Ok(release);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ReleaseSource for FakeSource {
    async fn latest(&self) -> Result<ReleaseDescriptor> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let release = self.release.lock().unwrap().clone();
        release.map_err(|reason| RelaunchError::VersionCheckFailed {
            source_uri: "fake".to_string(),
            reason,
        })
    }

    fn describe(&self) -> String {
        "fake".to_string()
    }
}

#[derive(Clone)]
enum Route {
    Body(Vec<u8>),
    Status(u16),
}

#[derive(Default)]
struct TransferState {
    routes: HashMap<String, Route>,
    requests: Vec<String>,
    stall_after_chunks: Option<usize>,
    cancel_when_done: bool,
}

/// A transfer channel serving bodies from memory in small chunks.
///
/// Unknown URLs answer 404. With [`FakeTransfer::stall_after`] the transfer
/// stops after `n` chunks and waits for cancellation, which makes cancel
/// tests deterministic. Clones share state.
#[derive(Clone, Default)]
pub struct FakeTransfer {
    state: Arc<Mutex<TransferState>>,
}

impl FakeTransfer {
    pub const CHUNK: usize = 4;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn serve(self, url: &str, body: Vec<u8>) -> Self {
        self.state.lock().unwrap().routes.insert(url.to_string(), Route::Body(body));
        self
    }

    pub fn status(self, url: &str, status: u16) -> Self {
        self.state.lock().unwrap().routes.insert(url.to_string(), Route::Status(status));
        self
    }

    pub fn stall_after(self, chunks: usize) -> Self {
        self.state.lock().unwrap().stall_after_chunks = Some(chunks);
        self
    }

    /// Fires the token once the body is complete and still reports success,
    /// as when a cancel request lands right after the last chunk.
    pub fn cancel_when_done(self) -> Self {
        self.state.lock().unwrap().cancel_when_done = true;
        self
    }

    /// URLs fetched so far, in order.
    pub fn requests(&self) -> Vec<String> {
        self.state.lock().unwrap().requests.clone()
    }
}

impl TransferChannel for FakeTransfer {
    async fn fetch(
        &self,
        url: &str,
        destination: &Destination,
        cancel: &CancellationToken,
        progress: Option<ProgressCallback>,
    ) -> Result<PathBuf> {
        let (route, stall_after, cancel_when_done) = {
            let mut state = self.state.lock().unwrap();
            state.requests.push(url.to_string());
            (state.routes.get(url).cloned(), state.stall_after_chunks, state.cancel_when_done)
        };
        if cancel.is_cancelled() {
            return Err(RelaunchError::Canceled);
        }

        let body = match route {
            Some(Route::Body(body)) => body,
            Some(Route::Status(status)) => {
                return Err(RelaunchError::TransferFailed {
                    url: url.to_string(),
                    status: Some(status),
                    reason: format!("server responded with {status}"),
                });
            }
            None => {
                return Err(RelaunchError::TransferFailed {
                    url: url.to_string(),
                    status: Some(404),
                    reason: "server responded with 404 Not Found".to_string(),
                });
            }
        };

        let path = match destination {
            Destination::File(path) => path.clone(),
            Destination::Directory(dir) => {
                dir.join(url.rsplit('/').next().filter(|s| !s.is_empty()).unwrap_or("download.bin"))
            }
        };
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut written = Vec::with_capacity(body.len());
        for (index, chunk) in body.chunks(Self::CHUNK).enumerate() {
            written.extend_from_slice(chunk);
            tokio::fs::write(&path, &written).await?;
            if let Some(callback) = &progress {
                callback(Progress::new(written.len() as u64, body.len() as u64));
            }
            if stall_after == Some(index + 1) {
                cancel.cancelled().await;
            }
            tokio::task::yield_now().await;
            if cancel.is_cancelled() {
                return Err(RelaunchError::Canceled);
            }
        }
        if body.is_empty() {
            tokio::fs::write(&path, &written).await?;
        }
        if cancel_when_done {
            cancel.cancel();
        }
        Ok(path)
    }
}
