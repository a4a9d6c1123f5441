//! Change controller: filesystem events drive the diff/patch cycle.

use anyhow::Context;
use crossbeam_channel::{RecvTimeoutError, unbounded};
use notify::event::{AccessKind, AccessMode, EventKind};
use notify::{RecursiveMode, Watcher};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::Result;
use crate::diff::diff_databases;
use crate::patch::apply_patch;
use crate::types::{DiffOptions, FsEvent};

/// Grace period before diffing on a modify event: the writer may still hold
/// the engine's file lock.
const MODIFY_GRACE: Duration = Duration::from_millis(250);

/// How often the event loop wakes to check the interrupt flag.
const POLL_TICK: Duration = Duration::from_millis(200);

/// Per-database paths under the watched directory.
struct ReplicaPaths {
    primary: PathBuf,
    backup: PathBuf,
    journal: PathBuf,
}

fn replica_paths(dir: &Path, name: &OsStr) -> ReplicaPaths {
    ReplicaPaths {
        primary: dir.join(name),
        backup: dir.join("backup").join(name),
        journal: dir.join("patches").join(name),
    }
}

/// Install a SIGINT handler that flips a shared flag; the event loop checks
/// it on every timeout tick and exits cleanly.
fn setup_ctrlc_handler() -> Result<Arc<AtomicBool>> {
    let interrupted = Arc::new(AtomicBool::new(false));
    let interrupted_handler = Arc::clone(&interrupted);
    ctrlc::set_handler(move || {
        interrupted_handler.store(true, Ordering::Relaxed);
    })
    .context("set Ctrl+C handler")?;
    Ok(interrupted)
}

/// True if the event is one the controller reacts to under `mask`.
fn event_matches(kind: &EventKind, mask: FsEvent) -> bool {
    match mask {
        FsEvent::CloseWrite => {
            matches!(kind, EventKind::Access(AccessKind::Close(AccessMode::Write)))
        }
        FsEvent::Modify => matches!(kind, EventKind::Modify(_)),
    }
}

/// Watch `dir` for database writes; on each one, diff the backup against the
/// fresh primary, append to the SCN-journal, and patch the backup.
///
/// Events are handled strictly in arrival order; events that arrive while a
/// diff runs queue up in the channel. Returns after SIGINT.
pub fn watch_directory(dir: &Path, mask: FsEvent, opts: &DiffOptions) -> Result<()> {
    let interrupted = setup_ctrlc_handler()?;

    let (tx, rx) = unbounded();
    let mut watcher = notify::recommended_watcher(move |res| {
        let _ = tx.send(res);
    })
    .context("create filesystem watcher")?;
    watcher
        .watch(dir, RecursiveMode::NonRecursive)
        .with_context(|| format!("watch {}", dir.display()))?;

    log::debug!("Listening for events in {}", dir.display());
    loop {
        if interrupted.load(Ordering::Relaxed) {
            break;
        }
        let event = match rx.recv_timeout(POLL_TICK) {
            Ok(Ok(event)) => event,
            Ok(Err(e)) => return Err(e).context("filesystem watcher failed"),
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        };
        if !event_matches(&event.kind, mask) {
            continue;
        }
        for path in &event.paths {
            handle_event(dir, path, mask, opts)?;
        }
    }
    log::debug!("Listening for events stopped");
    Ok(())
}

/// One diff/patch cycle for the database file named by `path`.
fn handle_event(dir: &Path, path: &Path, mask: FsEvent, opts: &DiffOptions) -> Result<()> {
    let Some(name) = path.file_name() else {
        return Ok(());
    };
    // The engine's own rollback journals churn in the same directory.
    if name.to_string_lossy().contains("-journal") {
        return Ok(());
    }

    log::debug!("* Catch {} event", path.display());
    if mask == FsEvent::Modify {
        std::thread::sleep(MODIFY_GRACE);
    }

    let paths = replica_paths(dir, name);
    match diff_databases(&paths.backup, &paths.primary, Some(&paths.journal), opts)? {
        None => log::debug!("  no differences in {}", paths.primary.display()),
        Some(offset) => {
            log::debug!("* Patch {} from offset {offset}", paths.backup.display());
            apply_patch(&paths.backup, &paths.journal, offset)?;
        }
    }
    Ok(())
}
