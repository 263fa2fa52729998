//! Per-run orchestrator state and the snapshots handed to listeners.

use crate::core::{Progress, RelaunchError};
use crate::release::{ReleaseDescriptor, VersionTag};
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Caller-facing stage of the update state machine.
///
/// `Cancel` is not stored: it is how an `Update` with an open cancellation
/// scope (an install in flight) is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// A version check is needed, or the last one failed.
    Check,
    /// A newer version is available; an install can be started or retried.
    Update,
    /// An install is running and the download may be canceled.
    Cancel,
    /// The installed version is the latest.
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Check => "check",
            Self::Update => "update",
            Self::Cancel => "cancel",
            Self::Done => "done",
        };
        f.write_str(label)
    }
}

/// Snapshot pushed to listeners on every transition and progress step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub stage: Stage,
    pub download: Progress,
    pub install: Progress,
    pub message: String,
}

/// Receives [`Status`] snapshots. Called from the driving task and, during
/// extraction, from a blocking worker thread.
pub type StatusListener = Arc<dyn Fn(&Status) + Send + Sync>;

/// Result of `start_check` or `start_update`.
///
/// Failures inside the operation are folded into the outcome: the stage is
/// where the state machine landed and `error` holds the cause.
#[derive(Debug)]
pub struct Outcome {
    pub stage: Stage,
    pub message: String,
    pub error: Option<RelaunchError>,
}

impl Outcome {
    /// No error, or only a failed version record write after a good install.
    pub fn is_success(&self) -> bool {
        match &self.error {
            None => true,
            Some(RelaunchError::ConfigPersistFailed { .. }) => self.stage == Stage::Done,
            Some(_) => false,
        }
    }
}

/// Which part of an install is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum InstallPhase {
    /// Transfer in progress; cancellation is honored.
    Downloading,
    /// Self-replacement started; runs to completion or rollback.
    Installing,
}

/// State of one orchestrator run.
#[derive(Debug)]
pub(crate) struct UpdateSession {
    pub stage: Stage,
    pub current_version: VersionTag,
    pub latest: Option<ReleaseDescriptor>,
    pub clean_install: bool,
    pub cancel: Option<CancellationToken>,
    pub phase: Option<InstallPhase>,
    pub checking: bool,
    pub download: Progress,
    pub install: Progress,
    pub message: String,
}

impl UpdateSession {
    pub fn new(current_version: VersionTag) -> Self {
        Self {
            stage: Stage::Check,
            current_version,
            latest: None,
            clean_install: false,
            cancel: None,
            phase: None,
            checking: false,
            download: Progress::default(),
            install: Progress::default(),
            message: String::new(),
        }
    }

    /// Whether a check or an install is running.
    pub fn is_busy(&self) -> bool {
        self.checking || self.cancel.is_some()
    }

    pub fn visible_stage(&self) -> Stage {
        if self.stage == Stage::Update && self.cancel.is_some() { Stage::Cancel } else { self.stage }
    }

    pub fn snapshot(&self) -> Status {
        Status {
            stage: self.visible_stage(),
            download: self.download,
            install: self.install,
            message: self.message.clone(),
        }
    }
}
