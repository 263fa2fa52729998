//! Zip archive installer.
//!
//! Unpacks a release artifact over the install directory. Every entry is
//! checked before the first byte is written: an entry whose path would land
//! outside the target directory (absolute paths, `..` components) fails the
//! whole install with [`RelaunchError::UnsafeArchiveEntry`], leaving the target
//! untouched. Extraction itself runs on the blocking thread pool.
//!
//! Progress is reported as `(entries_done, entries_total)` after each entry.
//! Existing files are overwritten. When requested, the archive is deleted
//! after a successful extraction; a failed delete does not fail the install
//! but is returned in [`ExtractReport::archive_cleanup_error`].

use crate::core::{Progress, ProgressCallback, RelaunchError, Result};
use crate::utils::fs::is_safe_path;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use zip::ZipArchive;

/// What an extraction did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExtractReport {
    /// Entries processed, directories included.
    pub entries: u64,
    /// Files written, as absolute paths under the target directory.
    pub files: Vec<PathBuf>,
    /// Why the archive could not be deleted afterwards, if it could not.
    pub archive_cleanup_error: Option<String>,
}

impl ExtractReport {
    /// Whether `path` was written by this extraction.
    pub fn wrote(&self, path: &Path) -> bool {
        self.files.iter().any(|f| f == path)
    }
}

/// Extracts `archive` into `target` on a blocking worker.
pub async fn install(
    archive: &Path,
    target: &Path,
    progress: Option<ProgressCallback>,
    delete_archive: bool,
) -> Result<ExtractReport> {
    let archive = archive.to_path_buf();
    let target = target.to_path_buf();
    let archive_name = archive.display().to_string();

    tokio::task::spawn_blocking(move || extract(&archive, &target, progress.as_ref(), delete_archive))
        .await
        .map_err(|e| RelaunchError::ArchiveFailed {
            archive: archive_name,
            reason: format!("extraction task failed: {e}"),
        })?
}

struct PlannedEntry {
    index: usize,
    relative: PathBuf,
    is_dir: bool,
    unix_mode: Option<u32>,
}

/// Synchronous extraction; see [`install`].
pub fn extract(
    archive_path: &Path,
    target: &Path,
    progress: Option<&ProgressCallback>,
    delete_archive: bool,
) -> Result<ExtractReport> {
    let archive_error = |reason: String| RelaunchError::ArchiveFailed {
        archive: archive_path.display().to_string(),
        reason,
    };

    let file = fs::File::open(archive_path).map_err(|e| archive_error(format!("cannot open: {e}")))?;
    let mut archive = ZipArchive::new(file).map_err(|e| archive_error(e.to_string()))?;

    let plan = plan_entries(&mut archive, target).map_err(|e| match e {
        PlanError::Unsafe(entry) => RelaunchError::UnsafeArchiveEntry {
            entry,
        },
        PlanError::Zip(reason) => archive_error(reason),
    })?;

    let total = plan.len() as u64;
    let mut report = ExtractReport::default();
    debug!(target: "archive", "Extracting {total} entries from {} into {}", archive_path.display(), target.display());

    for entry in &plan {
        let out_path = target.join(&entry.relative);
        if entry.is_dir {
            fs::create_dir_all(&out_path)
                .map_err(|e| archive_error(format!("cannot create {}: {e}", out_path.display())))?;
        } else {
            write_entry(&mut archive, entry.index, &out_path)
                .map_err(|e| archive_error(format!("cannot write {}: {e}", out_path.display())))?;
            apply_mode(&out_path, entry.unix_mode);
            report.files.push(out_path);
        }

        report.entries += 1;
        if let Some(callback) = progress {
            callback(Progress::new(report.entries, total));
        }
    }
    drop(archive);

    if delete_archive && let Err(e) = fs::remove_file(archive_path) {
        warn!(target: "archive", "Could not delete {}: {e}", archive_path.display());
        report.archive_cleanup_error = Some(e.to_string());
    }

    Ok(report)
}

enum PlanError {
    Unsafe(String),
    Zip(String),
}

fn plan_entries<R: io::Read + io::Seek>(
    archive: &mut ZipArchive<R>,
    target: &Path,
) -> std::result::Result<Vec<PlannedEntry>, PlanError> {
    let mut plan = Vec::with_capacity(archive.len());
    for index in 0..archive.len() {
        let entry = archive.by_index_raw(index).map_err(|e| PlanError::Zip(e.to_string()))?;
        let name = entry.name().to_string();
        let relative = entry
            .enclosed_name()
            .filter(|rel| !rel.as_os_str().is_empty() && is_safe_path(target, rel))
            .ok_or_else(|| PlanError::Unsafe(name.clone()))?;

        plan.push(PlannedEntry {
            index,
            relative,
            is_dir: entry.is_dir(),
            unix_mode: entry.unix_mode(),
        });
    }
    Ok(plan)
}

fn write_entry<R: io::Read + io::Seek>(
    archive: &mut ZipArchive<R>,
    index: usize,
    out_path: &Path,
) -> io::Result<()> {
    if let Some(parent) = out_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut entry = archive.by_index(index).map_err(io::Error::other)?;
    let mut out = fs::File::create(out_path)?;
    io::copy(&mut entry, &mut out)?;
    Ok(())
}

#[cfg(unix)]
fn apply_mode(path: &Path, mode: Option<u32>) {
    use std::os::unix::fs::PermissionsExt;
    if let Some(mode) = mode
        && let Err(e) = fs::set_permissions(path, fs::Permissions::from_mode(mode & 0o7777))
    {
        warn!(target: "archive", "Could not set mode {mode:o} on {}: {e}", path.display());
    }
}

#[cfg(not(unix))]
fn apply_mode(_path: &Path, _mode: Option<u32>) {}
