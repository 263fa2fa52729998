//! Update orchestrator
//!
//! Drives the check → update → done state machine and the install procedure
//! that ties the other components together.
//!
//! # State machine
//!
//! ```text
//!            check ok, same tag
//!   Check ───────────────────────────────▶ Done
//!     │ ▲                                    ▲
//!     │ └─ check failed                      │ install ok
//!     │                                      │
//!     └──▶ Update ──start_update──▶ Cancel ──┘
//!   newer    ▲                        │
//!   tag      └────────────────────────┘
//!              canceled / failed (rollback ran)
//! ```
//!
//! `Cancel` is the label for `Update` while an install is in flight.
//!
//! # Install procedure
//!
//! 1. Recreate the scratch directory
//! 2. Pick the clean or patch artifact
//! 3. Download it into the scratch directory (cancelable)
//! 4. Rename the running executable and auxiliary files aside
//! 5. Extract the artifact over the install directory
//! 6. Prune: dispose of replaced copies, restore missing ones
//! 7. Remove the scratch directory (always)
//! 8. Reload the configuration and record the new version (success only)
//!
//! Cancellation is honored only during step 3. A failure at step 4 restores
//! the renamed files; a failure at step 5 still runs step 6 so missing files
//! are restored. Every failure lands in `Update` so the install can be
//! retried without another check.
//!
//! # Concurrency
//!
//! All operations take `&self`. The session sits behind a mutex that is never
//! held across an await, so [`Orchestrator::cancel`] and
//! [`Orchestrator::status`] can be called while `start_update` is running.
//! A second `start_update` or `start_check` while one is running is rejected
//! with [`RelaunchError::UpdateInProgress`].
//!
//! # Examples
//!
//! ```rust,no_run
//! use relaunch::orchestrator::{Orchestrator, OrchestratorOptions, Stage};
//! use relaunch::release::EndpointSource;
//! use relaunch::replace::{DisposalStrategy, SelfReplacer};
//! use relaunch::transfer::HttpTransfer;
//! use std::time::Duration;
//!
//! # async fn example() -> relaunch::core::Result<()> {
//! let http = HttpTransfer::new("relaunch/0.3")?;
//! let source = EndpointSource::new(http.client().clone(), "https://example.com/latest");
//! let replacer = SelfReplacer::new(
//!     vec![std::env::current_exe()?],
//!     ".old",
//!     DisposalStrategy::platform_default(),
//!     Duration::from_secs(1),
//! );
//! let orchestrator = Orchestrator::new(
//!     source,
//!     http,
//!     replacer,
//!     OrchestratorOptions::new("1.0.0", "..", "Temp"),
//! );
//!
//! if orchestrator.start_check().await?.stage == Stage::Update {
//!     let outcome = orchestrator.start_update(false).await?;
//!     println!("{}", outcome.message);
//! }
//! let queue = orchestrator.into_deletion_queue();
//! # Ok(())
//! # }
//! ```

mod install;
mod session;

pub use session::{Outcome, Stage, Status, StatusListener};

use crate::core::{Progress, RelaunchError, Result};
use crate::release::{ReleaseDescriptor, ReleaseSource, VersionTag};
use crate::replace::{DeletionQueue, PruneReport, SelfReplacer};
use crate::transfer::TransferChannel;
use session::{InstallPhase, UpdateSession};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{error, info, warn};

pub(crate) const MSG_CHECKING: &str = "Checking for updates...";
pub(crate) const MSG_UP_TO_DATE: &str = "Congratulations, you are on the latest version.";
pub(crate) const MSG_INSTALLED: &str = "All done, you are now on the latest version.";
pub(crate) const MSG_CANCELED: &str = "Update canceled.";
pub(crate) const MSG_CLEAN_NOT_FOUND: &str = "Update file not found, please contact the developer!";
pub(crate) const MSG_PATCH_NOT_FOUND: &str =
    "Patch file not found, you should try again with a clean install enabled.";

/// Where the installed version is recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRecord {
    /// Configuration file.
    pub path: PathBuf,
    /// Section holding `current_version`.
    pub section: String,
}

/// Fixed inputs of an orchestrator.
#[derive(Debug, Clone)]
pub struct OrchestratorOptions {
    pub current_version: VersionTag,
    /// Directory the artifact is extracted into.
    pub install_dir: PathBuf,
    /// Scratch directory for downloads; recreated and removed by every install.
    pub scratch_dir: PathBuf,
    /// Record updated after a successful install. `None` keeps it in memory only.
    pub version_record: Option<VersionRecord>,
}

impl OrchestratorOptions {
    pub fn new(
        current_version: impl Into<VersionTag>,
        install_dir: impl Into<PathBuf>,
        scratch_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            current_version: current_version.into(),
            install_dir: install_dir.into(),
            scratch_dir: scratch_dir.into(),
            version_record: None,
        }
    }

    #[must_use]
    pub fn with_version_record(mut self, path: impl Into<PathBuf>, section: impl Into<String>) -> Self {
        self.version_record = Some(VersionRecord {
            path: path.into(),
            section: section.into(),
        });
        self
    }
}

/// Session state and listeners, shared with progress callbacks.
pub(crate) struct Shared {
    session: Mutex<UpdateSession>,
    listeners: Mutex<Vec<StatusListener>>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, UpdateSession> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Mutates the session, then notifies listeners with the new snapshot.
    pub(crate) fn update<R>(&self, f: impl FnOnce(&mut UpdateSession) -> R) -> R {
        let (result, status) = {
            let mut session = self.lock();
            let result = f(&mut session);
            (result, session.snapshot())
        };
        self.notify(&status);
        result
    }

    pub(crate) fn read<R>(&self, f: impl FnOnce(&UpdateSession) -> R) -> R {
        f(&self.lock())
    }

    fn notify(&self, status: &Status) {
        let listeners: Vec<StatusListener> =
            self.listeners.lock().unwrap_or_else(PoisonError::into_inner).clone();
        for listener in listeners {
            listener(status);
        }
    }

    pub(crate) fn set_download(&self, progress: Progress) {
        self.update(|s| s.download = progress);
    }

    pub(crate) fn set_install(&self, progress: Progress) {
        self.update(|s| s.install = progress);
    }
}

/// The update state machine for one process.
pub struct Orchestrator<S, T> {
    source: S,
    transfer: T,
    replacer: tokio::sync::Mutex<SelfReplacer>,
    shared: Arc<Shared>,
    install_dir: PathBuf,
    scratch_dir: PathBuf,
    version_record: Option<VersionRecord>,
}

impl<S: ReleaseSource, T: TransferChannel> Orchestrator<S, T> {
    pub fn new(source: S, transfer: T, replacer: SelfReplacer, options: OrchestratorOptions) -> Self {
        Self {
            source,
            transfer,
            replacer: tokio::sync::Mutex::new(replacer),
            shared: Arc::new(Shared {
                session: Mutex::new(UpdateSession::new(options.current_version)),
                listeners: Mutex::new(Vec::new()),
            }),
            install_dir: options.install_dir,
            scratch_dir: options.scratch_dir,
            version_record: options.version_record,
        }
    }

    /// Registers a listener for status snapshots.
    pub fn subscribe(&self, listener: StatusListener) {
        self.shared.listeners.lock().unwrap_or_else(PoisonError::into_inner).push(listener);
    }

    pub fn stage(&self) -> Stage {
        self.shared.read(UpdateSession::visible_stage)
    }

    pub fn status(&self) -> Status {
        self.shared.read(UpdateSession::snapshot)
    }

    pub fn current_version(&self) -> VersionTag {
        self.shared.read(|s| s.current_version.clone())
    }

    /// The release found by the last successful check.
    pub fn latest_release(&self) -> Option<ReleaseDescriptor> {
        self.shared.read(|s| s.latest.clone())
    }

    /// Whether a check or install is running.
    pub fn is_busy(&self) -> bool {
        self.shared.read(UpdateSession::is_busy)
    }

    /// Heals the result of an interrupted earlier run.
    ///
    /// Call once at startup, before any check: obsolete copies whose original
    /// is missing are restored, replaced ones are disposed of.
    pub async fn recover(&self) -> Result<PruneReport> {
        let report = self.replacer.lock().await.prune_self().await?;
        if !report.restored.is_empty() {
            warn!(target: "orchestrator", "Restored {} file(s) left over from an interrupted update", report.restored.len());
        }
        Ok(report)
    }

    /// Asks the release source for the latest version.
    ///
    /// Lands in `Done` when the latest tag equals the installed one (ignoring
    /// case), in `Update` when it differs, and in `Check` when the source could
    /// not be queried.
    pub async fn start_check(&self) -> Result<Outcome> {
        self.shared.update(|s| {
            if s.is_busy() {
                return Err(RelaunchError::UpdateInProgress);
            }
            s.checking = true;
            s.stage = Stage::Check;
            s.message = MSG_CHECKING.to_string();
            Ok(())
        })?;

        let result = self.source.latest().await;

        let outcome = self.shared.update(|s| {
            s.checking = false;
            match result {
                Ok(release) if release.latest_version_tag == s.current_version => {
                    info!(target: "orchestrator", "Already on the latest version {}", s.current_version);
                    s.stage = Stage::Done;
                    s.message = MSG_UP_TO_DATE.to_string();
                    s.latest = Some(release);
                    Outcome {
                        stage: Stage::Done,
                        message: s.message.clone(),
                        error: None,
                    }
                }
                Ok(release) => {
                    info!(
                        target: "orchestrator",
                        "Version {} is available (installed {})",
                        release.latest_version_tag, s.current_version
                    );
                    s.stage = Stage::Update;
                    s.message = format!(
                        "Version {} is available (installed: {}).",
                        release.latest_version_tag, s.current_version
                    );
                    s.latest = Some(release);
                    Outcome {
                        stage: Stage::Update,
                        message: s.message.clone(),
                        error: None,
                    }
                }
                Err(e) => {
                    error!(target: "orchestrator", "Version check failed: {e}");
                    s.stage = Stage::Check;
                    s.message = format!("Failed to retrieve latest version: {e}");
                    Outcome {
                        stage: Stage::Check,
                        message: s.message.clone(),
                        error: Some(e),
                    }
                }
            }
        });
        Ok(outcome)
    }

    /// Downloads and installs the release found by the last check.
    ///
    /// Rejected with [`RelaunchError::NoUpdatePending`] unless the stage is
    /// `Update`, and with [`RelaunchError::UpdateInProgress`] while another
    /// install or check runs. Everything else is reported in the [`Outcome`].
    pub async fn start_update(&self, clean_install: bool) -> Result<Outcome> {
        let (release, token) = self.shared.update(|s| {
            if s.is_busy() {
                return Err(RelaunchError::UpdateInProgress);
            }
            let release = match (&s.latest, s.stage) {
                (Some(release), Stage::Update) => release.clone(),
                _ => return Err(RelaunchError::NoUpdatePending),
            };
            let token = tokio_util::sync::CancellationToken::new();
            s.cancel = Some(token.clone());
            s.phase = Some(InstallPhase::Downloading);
            s.clean_install = clean_install;
            s.download = Progress::default();
            s.install = Progress::default();
            s.message = format!("Downloading version {}...", release.latest_version_tag);
            Ok((release, token))
        })?;

        info!(
            target: "orchestrator",
            "Starting {} install of {}",
            if clean_install { "clean" } else { "patch" },
            release.latest_version_tag
        );
        let result = self.run_install(&release, clean_install, &token).await;

        let outcome = self.shared.update(|s| {
            s.cancel = None;
            s.phase = None;
            match result {
                Ok(persist_error) => {
                    s.stage = Stage::Done;
                    s.current_version = release.latest_version_tag.clone();
                    s.message = match &persist_error {
                        None => MSG_INSTALLED.to_string(),
                        Some(e) => format!("{MSG_INSTALLED} {e}"),
                    };
                    Outcome {
                        stage: Stage::Done,
                        message: s.message.clone(),
                        error: persist_error,
                    }
                }
                Err(e) => {
                    s.stage = Stage::Update;
                    s.message = install::failure_message(&e);
                    Outcome {
                        stage: Stage::Update,
                        message: s.message.clone(),
                        error: Some(e),
                    }
                }
            }
        });
        Ok(outcome)
    }

    /// Requests cancellation of the running download.
    ///
    /// Returns `false` when nothing can be canceled: no install is running,
    /// or it is past the download and must finish or roll back.
    pub fn cancel(&self) -> bool {
        self.shared.read(|s| match (&s.cancel, s.phase) {
            (Some(token), Some(InstallPhase::Downloading)) => {
                info!(target: "orchestrator", "Cancellation requested");
                token.cancel();
                true
            }
            (Some(_), _) => {
                info!(target: "orchestrator", "Cancellation ignored, install already past the download");
                false
            }
            (None, _) => false,
        })
    }

    /// Consumes the orchestrator and yields the obsolete copies the host must
    /// hand to the deferred-deletion process.
    pub fn into_deletion_queue(self) -> DeletionQueue {
        self.replacer.into_inner().take_deletion_queue()
    }
}
