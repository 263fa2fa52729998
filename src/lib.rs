//! relaunch - self-updating application launcher
//!
//! A launcher that ships beside an application, asks a release source whether
//! a newer version exists, downloads the release archive and replaces itself
//! and its files in place. Any failure after the running files were renamed
//! aside is rolled back, so the launcher always stays runnable.
//!
//! # Architecture Overview
//!
//! ```text
//!                 ┌──────────────┐
//!   cli  ───────▶ │ orchestrator │ ── state machine: check → update → done
//!                 └──────┬───────┘
//!        ┌───────────┬───┴────────┬─────────────┐
//!        ▼           ▼            ▼             ▼
//!    release     transfer      replace       archive
//!  (latest tag) (download)  (rename aside, (extract zip)
//!                            prune, restore)
//! ```
//!
//! ## Key Features
//!
//! - **Atomic self-replacement**: the running executable is renamed, never
//!   overwritten, and restored when the new release does not provide it
//! - **Clean and patch installs**: full or incremental archives per release
//! - **Cancelable downloads** with byte progress
//! - **Pluggable release sources**: a JSON endpoint or GitHub releases
//! - **Deferred deletion**: obsolete copies are removed by a short-lived
//!   process after the launcher exits, where the platform requires it
//!
//! # Core Modules
//!
//! - [`orchestrator`] - the update state machine and install procedure
//! - [`release`] - version check service and release descriptors
//! - [`transfer`] - cancelable, progress-reporting downloads
//! - [`archive`] - zip installation with path-traversal checks
//! - [`replace`] - obsolete-file renaming, pruning and restoring
//! - [`config`] - the TOML configuration store and launcher settings
//! - [`cli`] - command-line host
//! - [`core`] - errors and progress types
//! - [`utils`] - file system helpers and progress bars
//!
//! # Configuration
//!
//! The launcher reads the section named after its executable stem from
//! `<stem>.toml` beside the executable:
//!
//! ```toml
//! [Launcher]
//! current_version = "1.0.0"
//! latest_version_uri = "https://updates.example.com/game/latest.json"
//! auxiliary_files = ["Launcher.dll"]
//! ```
//!
//! or, for GitHub releases:
//!
//! ```toml
//! [Launcher]
//! current_version = "v1.0.0"
//! github = "acme/game"
//! artifact_base_name = "Game"
//! ```
//!
//! Artifacts are named `{artifact_base_name}{tag}.zip` (clean) and
//! `{artifact_base_name}{tag}patch.zip` (patch).

pub mod archive;
pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod orchestrator;
pub mod release;
pub mod replace;
pub mod transfer;
pub mod utils;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
