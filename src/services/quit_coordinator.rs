//! Quit Coordinator for the Harbor updater.
//!
//! Records that an imminent process exit is update-driven (so window-close
//! handlers skip their "are you sure" veto) and guarantees forward progress
//! with a bounded-time forced exit when the OS installer stalls.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{info, warn};

type ExitHook = Box<dyn Fn(i32) + Send + Sync>;

/// Process-wide quit intent and idempotent exit. Constructed once by the app
/// core and shared by reference; tests inject an exit hook instead of
/// terminating the process.
pub struct QuitCoordinator {
    update_quit: AtomicBool,
    exited: AtomicBool,
    exit_hook: ExitHook,
}

impl QuitCoordinator {
    pub fn new() -> Self {
        Self::with_exit_hook(Box::new(|code| std::process::exit(code)))
    }

    pub fn with_exit_hook(exit_hook: ExitHook) -> Self {
        Self {
            update_quit: AtomicBool::new(false),
            exited: AtomicBool::new(false),
            exit_hook,
        }
    }

    /// Flags the next exit as update-driven.
    pub fn mark_update_quit(&self) {
        self.update_quit.store(true, Ordering::SeqCst);
    }

    /// Read by window lifecycle handlers to decide whether to veto a close.
    pub fn is_update_quit(&self) -> bool {
        self.update_quit.load(Ordering::SeqCst)
    }

    /// Requests a process exit. Idempotent: the OS installer and the
    /// safety-net timer may both ask, only the first call runs the hook.
    /// Returns true if this call performed the exit.
    pub fn request_exit(&self, code: i32) -> bool {
        if self
            .exited
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            info!(code, "exiting process");
            (self.exit_hook)(code);
            true
        } else {
            warn!(code, "exit already requested, ignoring");
            false
        }
    }

    /// Whether an exit has already been performed.
    pub fn has_exited(&self) -> bool {
        self.exited.load(Ordering::SeqCst)
    }

    /// Arms the safety-net timer: if the primary install path has not
    /// terminated the process within `delay`, force a graceful exit.
    pub fn arm_forced_exit(self: &Arc<Self>, delay: Duration) -> JoinHandle<()> {
        let quit = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if !quit.has_exited() {
                warn!(?delay, "primary install path did not exit in time, forcing exit");
                quit.request_exit(0);
            }
        })
    }
}

impl Default for QuitCoordinator {
    fn default() -> Self {
        Self::new()
    }
}
