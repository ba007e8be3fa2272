//! Watch command - poll the store and sweep documents as they change.

use anyhow::Result;
use std::{
    sync::atomic::{AtomicBool, Ordering},
    time::Duration,
};

use crate::cli::common::{flush_dirty, load_session};
use crate::config::TinctConfig;
use crate::log;
use crate::logger::{status_success, status_unchanged, status_warning};
use crate::sync::Session;

/// Has shutdown been requested? (Ctrl+C received)
static SHUTDOWN: AtomicBool = AtomicBool::new(false);

fn setup_shutdown_handler() -> Result<()> {
    ctrlc::set_handler(|| {
        SHUTDOWN.store(true, Ordering::SeqCst);
    })
    .map_err(|e| anyhow::anyhow!("failed to set Ctrl+C handler: {}", e))
}

fn is_shutdown() -> bool {
    SHUTDOWN.load(Ordering::Relaxed)
}

/// Sleep in short slices so Ctrl+C interrupts the wait promptly.
fn sleep_interruptible(total: Duration) {
    let slice = Duration::from_millis(100);
    let mut remaining = total;
    while !is_shutdown() && remaining > Duration::ZERO {
        let step = remaining.min(slice);
        std::thread::sleep(step);
        remaining = remaining.saturating_sub(step);
    }
}

/// Run the watch command
pub fn run_watch(config: &TinctConfig) -> Result<()> {
    setup_shutdown_handler()?;

    let mut session = load_session(config, true)?;

    // Initial pass so pre-existing documents are consistent before the loop.
    let initial = session.sweep_all();
    if initial.shapes_changed > 0 {
        log!("sweep"; "classified {} shapes on startup", initial.shapes_changed);
        flush_dirty(&mut session);
    }

    let interval = Duration::from_secs(config.sync.interval_secs.max(1));
    log!(
        "watch";
        "polling {} store every {}s (Ctrl+C to stop)",
        session.store_label(),
        interval.as_secs()
    );

    while !is_shutdown() {
        reconcile(&mut session);
        sleep_interruptible(interval);
    }

    log!("watch"; "stopped");
    Ok(())
}

/// One reconcile pass: poll, sweep and save anything that reloaded,
/// then surface conflicts. A tick can both reload (a new remote file)
/// and conflict (a dirty one); both must be handled. Conflicted files
/// are never pushed here - only an explicit save resolves a conflict.
fn reconcile(session: &mut Session) {
    let outcome = match session.poll() {
        Ok(outcome) => outcome,
        Err(e) => {
            status_warning(&format!("poll failed: {e}"));
            return;
        }
    };

    if let Some(summary) = &outcome.reloaded {
        let swept = session.sweep_all();
        let mut saved = 0;
        for name in session.dirty_files() {
            if outcome.conflicts.contains(&name) {
                continue;
            }
            match session.save(&name) {
                Ok(_) => saved += 1,
                Err(e) => log!("error"; "{name} not saved: {e}"),
            }
        }
        status_success(&format!(
            "reloaded {} documents, classified {} shapes, saved {saved}",
            summary.loaded, swept.shapes_changed
        ));
    }

    if !outcome.conflicts.is_empty() {
        status_warning(&format!(
            "conflicts, local edits kept: {}",
            outcome.conflicts.join(", ")
        ));
    } else if outcome.reloaded.is_none() {
        status_unchanged("no changes");
    }
}

// ============================================================================
// Tests
// ============================================================================
