//! Error handling for relaunch
//!
//! The error system follows two rules:
//! 1. **Strongly-typed errors** so the orchestrator can classify a failure
//!    (not found vs. canceled vs. install failure) without string matching
//! 2. **User-friendly messages** with actionable suggestions for the CLI host
//!
//! # Architecture
//!
//! - [`RelaunchError`] - every failure mode of the update pipeline
//! - [`ErrorContext`] - wrapper adding details and a suggestion for display
//!
//! Component errors are deliberately finer grained than the caller-facing
//! taxonomy. The orchestrator folds them: a [`RelaunchError::TransferFailed`]
//! with status 404 becomes [`RelaunchError::ArtifactNotFound`], archive and
//! replacement failures become [`RelaunchError::InstallFailed`], and a
//! [`RelaunchError::ReleaseDecodeFailed`] is reported as a failed version check.
//!
//! # Examples
//!
//! ```rust,no_run
//! use relaunch::core::{RelaunchError, user_friendly_error};
//!
//! let error = RelaunchError::ArtifactNotFound {
//!     url: "https://example.com/app1.0.1patch.zip".to_string(),
//!     clean_install: false,
//! };
//! user_friendly_error(anyhow::Error::from(error)).display();
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// The main error type for relaunch operations
///
/// # Error Categories
///
/// ## Version check
/// - [`VersionCheckFailed`] - release metadata could not be fetched
/// - [`ReleaseDecodeFailed`] - the metadata payload did not match the expected shape
///
/// ## Transfer
/// - [`ArtifactNotFound`] - the resolved artifact does not exist on the server
/// - [`TransferFailed`] - any other transport failure, with the HTTP status when known
/// - [`Canceled`] - the caller canceled the download
///
/// ## Install
/// - [`ArchiveFailed`] - the archive could not be read or unpacked
/// - [`UnsafeArchiveEntry`] - an entry would land outside the install directory
/// - [`ReplacementFailed`] - renaming or restoring a live file failed
/// - [`InstallFailed`] - the orchestrator-level install failure (rollback ran)
///
/// ## Configuration
/// - [`ConfigError`] - the configuration file is missing, malformed or incomplete
/// - [`ConfigPersistFailed`] - the new version could not be recorded after a successful install
///
/// ## Rejected requests
/// - [`UpdateInProgress`] - a second install was requested while one is in flight
/// - [`NoUpdatePending`] - an install was requested before a check found a newer version
///
/// [`VersionCheckFailed`]: RelaunchError::VersionCheckFailed
/// [`ReleaseDecodeFailed`]: RelaunchError::ReleaseDecodeFailed
/// [`ArtifactNotFound`]: RelaunchError::ArtifactNotFound
/// [`TransferFailed`]: RelaunchError::TransferFailed
/// [`Canceled`]: RelaunchError::Canceled
/// [`ArchiveFailed`]: RelaunchError::ArchiveFailed
/// [`UnsafeArchiveEntry`]: RelaunchError::UnsafeArchiveEntry
/// [`ReplacementFailed`]: RelaunchError::ReplacementFailed
/// [`InstallFailed`]: RelaunchError::InstallFailed
/// [`ConfigError`]: RelaunchError::ConfigError
/// [`ConfigPersistFailed`]: RelaunchError::ConfigPersistFailed
/// [`UpdateInProgress`]: RelaunchError::UpdateInProgress
/// [`NoUpdatePending`]: RelaunchError::NoUpdatePending
#[derive(Error, Debug)]
pub enum RelaunchError {
    /// Release metadata could not be retrieved
    #[error("Failed to retrieve latest version from {source_uri}: {reason}")]
    VersionCheckFailed {
        /// Endpoint that was queried
        source_uri: String,
        /// Transport or status detail
        reason: String,
    },

    /// Release metadata was retrieved but is not usable
    #[error("Invalid release metadata: {reason}")]
    ReleaseDecodeFailed {
        /// Decoder message naming the offending field
        reason: String,
    },

    /// The artifact selected for download does not exist
    #[error("{} file not found: {url}", artifact_label(.clean_install))]
    ArtifactNotFound {
        /// Artifact location that returned "not found"
        url: String,
        /// Whether the clean (full) artifact was requested
        clean_install: bool,
    },

    /// Download failed for a reason other than "not found"
    #[error("Download of {url} failed: {reason}")]
    TransferFailed {
        /// Location being downloaded
        url: String,
        /// HTTP status code, when the server answered
        status: Option<u16>,
        /// Human-readable failure detail
        reason: String,
    },

    /// The caller canceled the transfer
    #[error("Update canceled")]
    Canceled,

    /// The archive could not be read or extracted
    #[error("Failed to extract {archive}: {reason}")]
    ArchiveFailed {
        /// Archive path
        archive: String,
        /// Failure detail
        reason: String,
    },

    /// An archive entry resolves outside the target directory
    #[error("Archive entry '{entry}' escapes the install directory")]
    UnsafeArchiveEntry {
        /// Raw entry name as stored in the archive
        entry: String,
    },

    /// Moving a live file aside or back failed
    #[error("Failed to {operation} {path}: {reason}")]
    ReplacementFailed {
        /// What was attempted ("obsolete", "restore", "dispose")
        operation: String,
        /// File involved
        path: String,
        /// Failure detail
        reason: String,
    },

    /// Install failed after the download; rollback has run
    #[error("Install failed: {reason}")]
    InstallFailed {
        /// Underlying failure
        reason: String,
    },

    /// Configuration is missing, malformed or incomplete
    #[error("Configuration error: {message}")]
    ConfigError {
        /// What is wrong
        message: String,
    },

    /// Recording the new version failed after a successful install
    #[error("Failed to update config even though update was successful: {reason}")]
    ConfigPersistFailed {
        /// Underlying failure
        reason: String,
    },

    /// An install is already running for this session
    #[error("An update is already in progress")]
    UpdateInProgress,

    /// No newer version has been found yet
    #[error("No update is pending; run a version check first")]
    NoUpdatePending,

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Catch-all
    #[error("{message}")]
    Other {
        /// Generic error message
        message: String,
    },
}

fn artifact_label(clean_install: &bool) -> &'static str {
    if *clean_install { "Update" } else { "Patch" }
}

impl RelaunchError {
    /// Whether this failure is a caller-initiated cancellation.
    ///
    /// Cancellation is logged at info level, not as an error.
    #[must_use]
    pub const fn is_canceled(&self) -> bool {
        matches!(self, Self::Canceled)
    }

    /// Whether the remote answered "not found".
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::ArtifactNotFound { .. }
                | Self::TransferFailed {
                    status: Some(404),
                    ..
                }
        )
    }

    /// Whether this is a rejected request rather than a failed operation.
    #[must_use]
    pub const fn is_rejection(&self) -> bool {
        matches!(self, Self::UpdateInProgress | Self::NoUpdatePending)
    }
}

/// Error context wrapper providing user-friendly error information
///
/// Displays the error in red, details in yellow and the suggestion in green.
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: RelaunchError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context with no suggestion or details.
    #[must_use]
    pub const fn new(error: RelaunchError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add an actionable suggestion.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add details explaining the error.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print the error to stderr with colors.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error into an [`ErrorContext`] with suggestions where known.
///
/// Typed [`RelaunchError`]s get a tailored suggestion; IO errors are mapped by
/// kind; anything else keeps its full cause chain in the message.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    let error = match error.downcast::<RelaunchError>() {
        Ok(relaunch_error) => return create_error_context(relaunch_error),
        Err(error) => error,
    };

    if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
        match io_error.kind() {
            std::io::ErrorKind::PermissionDenied => {
                return ErrorContext::new(RelaunchError::Other {
                    message: error.to_string(),
                })
                .with_suggestion(
                    "Check that the install directory is writable, or run with elevated permissions",
                )
                .with_details("relaunch needs write access to its own directory and the install directory");
            }
            std::io::ErrorKind::NotFound => {
                return ErrorContext::new(RelaunchError::Other {
                    message: error.to_string(),
                })
                .with_suggestion("Check that the file or directory exists and the path is correct");
            }
            _ => {}
        }
    }

    let mut message = error.to_string();
    let chain: Vec<String> =
        error.chain().skip(1).map(std::string::ToString::to_string).collect();

    if !chain.is_empty() {
        message.push_str("\n\nCaused by:");
        for (i, cause) in chain.iter().enumerate() {
            message.push_str(&format!("\n  {}: {}", i + 1, cause));
        }
    }

    ErrorContext::new(RelaunchError::Other {
        message,
    })
}

fn create_error_context(error: RelaunchError) -> ErrorContext {
    match &error {
        RelaunchError::VersionCheckFailed { .. } => ErrorContext::new(error)
            .with_suggestion("Check your internet connection and the release endpoint in the config file, then run the check again"),

        RelaunchError::ReleaseDecodeFailed { .. } => ErrorContext::new(error)
            .with_suggestion("Verify that the release endpoint returns latest_version, latest_version_uri and latest_version_patch_uri")
            .with_details("The release metadata is decoded strictly; missing or mistyped fields are rejected"),

        RelaunchError::ArtifactNotFound { clean_install: false, .. } => ErrorContext::new(error)
            .with_suggestion("Try again with a clean install: relaunch update --clean")
            .with_details("The incremental artifact for this release is missing; the full artifact usually still exists"),

        RelaunchError::ArtifactNotFound { clean_install: true, .. } => ErrorContext::new(error)
            .with_suggestion("The release is missing its update archive, please contact the developer"),

        RelaunchError::TransferFailed { .. } => ErrorContext::new(error)
            .with_suggestion("Check your internet connection and try the update again"),

        RelaunchError::InstallFailed { .. }
        | RelaunchError::ArchiveFailed { .. }
        | RelaunchError::ReplacementFailed { .. } => ErrorContext::new(error)
            .with_suggestion("Retry the update; if it keeps failing, run a clean install")
            .with_details("The previous files were restored where possible"),

        RelaunchError::UnsafeArchiveEntry { .. } => ErrorContext::new(error)
            .with_details("The archive was rejected before any file was written"),

        RelaunchError::ConfigError { .. } => ErrorContext::new(error)
            .with_suggestion("Check the launcher config file (next to the executable, or pass --config)"),

        RelaunchError::ConfigPersistFailed { .. } => ErrorContext::new(error)
            .with_suggestion("Set current_version in the config file to the installed version")
            .with_details("The new version is installed; only the version record is stale"),

        RelaunchError::UpdateInProgress => ErrorContext::new(error)
            .with_suggestion("Wait for the running update to finish or cancel it"),

        RelaunchError::NoUpdatePending => ErrorContext::new(error)
            .with_suggestion("Run relaunch check first"),

        _ => ErrorContext::new(error),
    }
}
