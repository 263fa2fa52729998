//! Cross-platform utilities and helpers
//!
//! # Modules
//!
//! - [`fs`] - File system operations with atomic writes and path safety checks
//! - [`progress`] - Progress bars and spinners for downloads and installs
//!
//! # Example
//!
//! ```rust,no_run
//! use relaunch::utils::{atomic_write, ensure_dir};
//! use std::path::Path;
//!
//! # fn example() -> anyhow::Result<()> {
//! ensure_dir(Path::new("Temp"))?;
//! atomic_write(Path::new("relaunch.toml"), b"[relaunch]\ncurrent_version = \"1.0.0\"\n")?;
//! # Ok(())
//! # }
//! ```

pub mod fs;
pub mod progress;

pub use fs::{atomic_write, ensure_dir, is_safe_path, normalize_path, sanitize_file_name};
pub use progress::{MultiProgress, ProgressBar, ProgressUnit};
