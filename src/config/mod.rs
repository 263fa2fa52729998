//! Configuration management for relaunch
//!
//! The launcher reads a single TOML file that sits next to the executable and
//! shares its stem (`Launcher.exe` reads `Launcher.toml`). The file may hold
//! other sections for the application being launched; relaunch only decodes
//! the section named after the executable stem and only ever writes back
//! `current_version`.
//!
//! # Modules
//!
//! - `store` - [`ConfigStore`], a comment-preserving section/key-value document
//! - `settings` - [`LauncherSettings`] and the derived [`Layout`]
//!
//! # Example file
//!
//! ```toml
//! [Launcher]
//! current_version = "1.0.0"
//! latest_version_uri = "https://example.com/api/launcher/latest"
//! notes_uri = "https://example.com/notes/1.0.0"
//! artifact_base_name = "app"
//! auxiliary_files = ["Launcher.dll"]
//! ```
//!
//! # Lifecycle
//!
//! The file is read once at startup and again after a successful install,
//! because the installed archive may have shipped a new copy. The version
//! record is written only after extraction and pruning both succeeded.

mod settings;
mod store;

pub use settings::{LauncherSettings, Layout};
pub use store::ConfigStore;
