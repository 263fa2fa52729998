//! Global constants used throughout the relaunch codebase.
//!
//! Defaults for the self-replacement protocol, the transfer pipeline and the
//! launcher layout. Anything a deployment may want to tune is also exposed as a
//! configuration key (see [`crate::config::LauncherSettings`]); the values here
//! are the fallbacks.

use std::time::Duration;

/// Suffix appended to a live file when it is renamed aside before an install.
pub const OBSOLETE_SUFFIX: &str = ".old";

/// Name of the scratch directory (relative to the launcher directory) used to
/// stage downloaded artifacts.
pub const SCRATCH_DIR_NAME: &str = "Temp";

/// Install root relative to the launcher directory.
///
/// The launcher ships in a subdirectory of the application it updates, so the
/// archive is unpacked one level up.
pub const DEFAULT_INSTALL_DIR: &str = "..";

/// Read size for streamed downloads (80 KiB).
pub const TRANSFER_CHUNK_SIZE: usize = 80 * 1024;

/// File name used when neither the response headers nor the URL yield one.
pub const FALLBACK_DOWNLOAD_NAME: &str = "download.bin";

/// Delay before the deferred-deletion process removes obsolete copies.
///
/// Gives the exiting launcher time to release its executable image.
pub const DEFAULT_CLEANUP_DELAY: Duration = Duration::from_millis(1000);

/// Suffix marking a patch (incremental) artifact in the artifact file name.
pub const PATCH_ARTIFACT_MARKER: &str = "patch";

/// Extension of release artifacts.
pub const ARTIFACT_EXTENSION: &str = ".zip";

/// Default GitHub REST API base.
pub const GITHUB_API_BASE: &str = "https://api.github.com";

/// Default GitHub web base used for release download and notes links.
pub const GITHUB_WEB_BASE: &str = "https://github.com";

/// Environment variable disabling progress bars.
pub const NO_PROGRESS_ENV: &str = "RELAUNCH_NO_PROGRESS";

/// Environment variable overriding the configuration file location.
pub const CONFIG_PATH_ENV: &str = "RELAUNCH_CONFIG";

/// Number of attempts the deferred-deletion process makes per file.
pub const PURGE_MAX_ATTEMPTS: usize = 5;

/// Starting delay for the purge retry backoff (100ms).
pub const PURGE_BACKOFF_START_MS: u64 = 100;

/// Default `User-Agent` sent with every request. GitHub rejects requests
/// without one.
pub fn default_user_agent() -> String {
    format!("relaunch/{}", env!("CARGO_PKG_VERSION"))
}
