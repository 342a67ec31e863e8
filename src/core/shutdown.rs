//! Termination signal handling.
//!
//! SIGINT, SIGTERM and SIGHUP (via `ctrlc`'s `termination` feature) all
//! map to the same graceful shutdown. The handler only flips a flag and
//! notifies the orchestrator through a channel; the actual cleanup runs on
//! the orchestrator thread.
//!
//! A second signal while shutdown is already underway exits immediately,
//! which is the escape hatch when a startup step hangs.

use std::sync::atomic::{AtomicBool, Ordering};

use crossbeam::channel::{self, Receiver, Sender};

/// Exit status for a forced exit on a repeated signal.
const FORCED_EXIT_CODE: i32 = 130;

/// Shutdown has been requested (signal received)
static SHUTDOWN: AtomicBool = AtomicBool::new(false);

/// Setup the global termination handler. Call once at program start.
///
/// Returns the receiving end of the shutdown channel. It yields one
/// message per graceful shutdown request.
pub fn setup_shutdown_handler() -> anyhow::Result<Receiver<()>> {
    let (tx, rx) = channel::bounded(1);
    ctrlc::set_handler(move || on_signal(&tx))
        .map_err(|e| anyhow::anyhow!("failed to set termination handler: {}", e))?;
    Ok(rx)
}

fn on_signal(tx: &Sender<()>) {
    if request_shutdown() {
        crate::log!("devloop"; "shutting down...");
        // Bounded(1): a pending request is enough, never block the handler
        let _ = tx.try_send(());
    } else {
        crate::log!("devloop"; "forced exit");
        std::process::exit(FORCED_EXIT_CODE);
    }
}

/// Mark shutdown as requested.
///
/// Returns `true` for the first request, `false` if one was already made.
fn request_shutdown() -> bool {
    !SHUTDOWN.swap(true, Ordering::SeqCst)
}

// =============================================================================
// Tests
// =============================================================================
