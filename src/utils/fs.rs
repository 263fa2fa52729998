//! File system utilities for cross-platform file operations
//!
//! Small, synchronous helpers used by the config store, the archive installer
//! and the self-replacement manager.
//!
//! # Key Features
//!
//! - **Atomic writes**: config files are written to a temp file and renamed into place
//! - **Safety**: lexical path normalization and traversal checks for archive entries
//! - **File names from the network**: sanitizing names taken from response headers
//!
//! # Examples
//!
//! ```rust
//! use relaunch::utils::fs::{is_safe_path, sanitize_file_name};
//! use std::path::Path;
//!
//! assert!(is_safe_path(Path::new("/opt/app"), Path::new("bin/app.exe")));
//! assert!(!is_safe_path(Path::new("/opt/app"), Path::new("../etc/passwd")));
//! assert_eq!(sanitize_file_name("../../evil.zip"), "evil.zip");
//! ```

use anyhow::{Context, Result};
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Ensures a directory exists, creating it and all parents if necessary.
///
/// # Errors
///
/// Returns an error if the path exists but is not a directory, or if the
/// directory cannot be created.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)
            .with_context(|| format!("Failed to create directory: {}", path.display()))?;
    } else if !path.is_dir() {
        return Err(anyhow::anyhow!("Path exists but is not a directory: {}", path.display()));
    }
    Ok(())
}

/// Atomically writes bytes to a file using a write-then-rename strategy.
///
/// Content goes to `<path>.tmp`, is synced, then renamed over the target, so a
/// reader never observes a half-written file. Parent directories are created.
///
/// # Examples
///
/// ```rust,no_run
/// use relaunch::utils::fs::atomic_write;
/// use std::path::Path;
///
/// # fn example() -> anyhow::Result<()> {
/// atomic_write(Path::new("launcher.toml"), b"[launcher]\ncurrent_version = \"1.0.1\"\n")?;
/// # Ok(())
/// # }
/// ```
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    use std::io::Write;

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        ensure_dir(parent)?;
    }

    let mut temp_name = path.as_os_str().to_owned();
    temp_name.push(".tmp");
    let temp_path = PathBuf::from(temp_name);

    {
        let mut file = fs::File::create(&temp_path)
            .with_context(|| format!("Failed to create temp file: {}", temp_path.display()))?;

        file.write_all(content)
            .with_context(|| format!("Failed to write to temp file: {}", temp_path.display()))?;

        file.sync_all().with_context(|| "Failed to sync file to disk")?;
    }

    fs::rename(&temp_path, path)
        .with_context(|| format!("Failed to rename temp file to: {}", path.display()))?;

    Ok(())
}

/// Removes a directory tree if it exists. Missing directories are not an error.
pub fn remove_dir_all(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_dir_all(path)
            .with_context(|| format!("Failed to remove directory: {}", path.display()))?;
    }
    Ok(())
}

/// Lexically normalizes a path, resolving `.` and `..` without touching the
/// filesystem.
///
/// A `..` at the root stays at the root, so `/a/../../b` normalizes to `/b`.
#[must_use]
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut components = Vec::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match components.last() {
                Some(Component::Normal(_)) => {
                    components.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => components.push(component),
            },
            c => components.push(c),
        }
    }

    components.iter().collect()
}

/// Checks that `path` (relative to `base`, or absolute) stays inside `base`.
///
/// Both sides are normalized first, so `sub/../../etc` is caught.
#[must_use]
pub fn is_safe_path(base: &Path, path: &Path) -> bool {
    let normalized_base = normalize_path(base);
    let normalized_path = if path.is_absolute() {
        normalize_path(path)
    } else {
        normalize_path(&base.join(path))
    };

    normalized_path.starts_with(normalized_base)
}

/// Reduces a name received from the network to a single safe path component.
///
/// Directory parts are dropped (both separators), and characters outside
/// `[A-Za-z0-9._-]` and spaces are removed. Returns an empty string when nothing
/// usable remains; callers fall back to a default name.
#[must_use]
pub fn sanitize_file_name(name: &str) -> String {
    let last = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = last
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.' | ' '))
        .collect();
    let cleaned = cleaned.trim();

    if cleaned.chars().all(|c| c == '.') {
        String::new()
    } else {
        cleaned.to_string()
    }
}

/// Appends `suffix` to the full file name (`app.exe` + `.old` = `app.exe.old`).
#[must_use]
pub fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}
