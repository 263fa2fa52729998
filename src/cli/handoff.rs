//! Hands the deletion queue to a detached `purge` process on exit.

use crate::config::Layout;
use crate::replace::DeletionQueue;
use std::io;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use tracing::{debug, warn};

/// Spawns `<executable> purge --wait-ms <wait> <paths>...` detached from this
/// process. The executable is the freshly installed one at the same path.
pub fn spawn_purge(executable: &Path, queue: &DeletionQueue) -> io::Result<Child> {
    let mut command = Command::new(executable);
    command
        .arg("purge")
        .arg("--wait-ms")
        .arg(queue.wait.as_millis().to_string())
        .args(&queue.paths)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());

    #[cfg(windows)]
    {
        use std::os::windows::process::CommandExt;
        const DETACHED_PROCESS: u32 = 0x0000_0008;
        const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;
        command.creation_flags(DETACHED_PROCESS | CREATE_NEW_PROCESS_GROUP);
    }

    command.spawn()
}

/// Spawns the purge process when anything is queued. Failures are logged.
pub(super) fn hand_off(queue: DeletionQueue, layout: &Layout) {
    if queue.is_empty() {
        return;
    }
    match spawn_purge(&layout.executable, &queue) {
        Ok(child) => debug!(
            target: "replace",
            "Handed {} obsolete file(s) to purge process {}",
            queue.paths.len(),
            child.id()
        ),
        Err(e) => warn!(
            target: "replace",
            "Could not start the purge process, obsolete files stay behind: {e}"
        ),
    }
}
