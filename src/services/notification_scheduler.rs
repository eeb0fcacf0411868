//! Notification Scheduler for the Harbor updater.
//!
//! Decides what to surface to the user and when, decoupled from phase
//! transitions so re-notification works even when no new transition occurs.
//! Prompts are presented through the host's prompt primitive; the scheduler
//! overwrites a pending prompt rather than stacking competing ones.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::services::periodic::PeriodicTask;
use crate::types::update::UpdateCommand;

/// Host-provided prompt primitive. Blocks until the user picks a button and
/// returns its index. Rendering is the host's concern.
pub trait Prompter: Send + Sync {
    fn show_prompt(&self, title: &str, message: &str, detail: &str, buttons: &[&str]) -> usize;
}

/// Which prompt is currently pending a user response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    UpdateAvailable,
    RestartToInstall,
}

/// Queries the OS do-not-disturb state at presentation time.
pub type DndCheck = Arc<dyn Fn() -> bool + Send + Sync>;

const APP_TITLE: &str = "Harbor";

/// Schedules and presents update prompts. Each `present_*` operation is
/// idempotent: re-presenting the pending kind is a no-op, and presenting a
/// different kind supersedes the pending one (its late response is dropped).
pub struct NotificationScheduler {
    prompter: Arc<dyn Prompter>,
    commands: mpsc::Sender<UpdateCommand>,
    timer: PeriodicTask,
    /// Pending prompt kind plus a sequence number; responses are honored only
    /// if their sequence still matches.
    pending: Arc<Mutex<Option<(PromptKind, u64)>>>,
    seq: Arc<AtomicU64>,
    dnd: DndCheck,
}

impl NotificationScheduler {
    pub fn new(prompter: Arc<dyn Prompter>, commands: mpsc::Sender<UpdateCommand>) -> Self {
        Self {
            prompter,
            commands,
            timer: PeriodicTask::new("notify"),
            pending: Arc::new(Mutex::new(None)),
            seq: Arc::new(AtomicU64::new(0)),
            dnd: Arc::new(crate::platform::do_not_disturb_enabled),
        }
    }

    /// Overrides the do-not-disturb query (tests, embedders with their own
    /// notification policy).
    pub fn with_dnd_check(mut self, dnd: DndCheck) -> Self {
        self.dnd = dnd;
        self
    }

    /// (Re)arms the re-notify timer, clear-then-set. Each fire asks the
    /// service to recompute the prompt content from the current phase.
    pub fn arm(&mut self, period: Duration) {
        let tx = self.commands.clone();
        self.timer.start(period, move || {
            let _ = tx.try_send(UpdateCommand::NotifyTick);
        });
    }

    pub fn disarm(&mut self) {
        self.timer.stop();
    }

    pub fn is_armed(&self) -> bool {
        self.timer.is_armed()
    }

    /// Presents the "update available" prompt wired to the download action.
    /// Deferred while do-not-disturb is active; the armed notify timer
    /// retries once the user is interruptible again.
    pub fn present_available(&self, version: &str) {
        if (self.dnd)() {
            debug!("do not disturb active, deferring update prompt");
            return;
        }
        let Some(seq) = self.take_slot(PromptKind::UpdateAvailable) else {
            return;
        };
        let message = format!("A new version of {} is available ({})", APP_TITLE, version);
        let detail = "Download it now and you'll be asked to restart when it's ready.".to_string();
        self.spawn_prompt(
            seq,
            message,
            detail,
            vec!["Download".to_string(), "Remind Me Later".to_string()],
            |choice| (choice == 0).then_some(UpdateCommand::StartDownload),
        );
    }

    /// Presents the "restart to install" prompt wired to the restart action.
    /// Deferred while do-not-disturb is active, like [`present_available`].
    ///
    /// [`present_available`]: Self::present_available
    pub fn present_restart(&self, version: &str, release_notes: Option<&str>) {
        if (self.dnd)() {
            debug!("do not disturb active, deferring restart prompt");
            return;
        }
        let Some(seq) = self.take_slot(PromptKind::RestartToInstall) else {
            return;
        };
        let message = format!(
            "Update {} is ready. {} will restart to finish installing it.",
            version, APP_TITLE
        );
        let detail = match release_notes {
            Some(notes) if !notes.is_empty() => {
                format!("What's new in this version:\n\n{}", notes)
            }
            _ => String::new(),
        };
        self.spawn_prompt(
            seq,
            message,
            detail,
            vec!["Restart and Install".to_string(), "Later".to_string()],
            |choice| (choice == 0).then_some(UpdateCommand::ConfirmInstall),
        );
    }

    /// One-shot "you're up to date" dialog, used only for manual checks.
    pub fn present_no_update(&self, current_version: &str) {
        let prompter = self.prompter.clone();
        let message = "You're up to date".to_string();
        let detail = format!(
            "You are using the latest version of the {} Desktop App (version {}). \
             You'll be notified when a new version is available to install.",
            APP_TITLE, current_version
        );
        tokio::task::spawn_blocking(move || {
            prompter.show_prompt(APP_TITLE, &message, &detail, &["OK"]);
        });
    }

    /// Generic failure dialog; diagnostic detail goes to the log only.
    pub fn present_failure(&self, message: &str) {
        let prompter = self.prompter.clone();
        let message = message.to_string();
        tokio::task::spawn_blocking(move || {
            prompter.show_prompt(APP_TITLE, &message, "", &["OK"]);
        });
    }

    /// Claims the prompt slot for `kind`. Returns `None` when the same kind
    /// is already pending (idempotent re-present); a different pending kind
    /// is overwritten and its eventual response invalidated.
    fn take_slot(&self, kind: PromptKind) -> Option<u64> {
        let mut pending = self.pending.lock().unwrap_or_else(|p| p.into_inner());
        if let Some((current, _)) = *pending {
            if current == kind {
                debug!(?kind, "prompt already pending, not stacking");
                return None;
            }
            debug!(superseded = ?current, by = ?kind, "overwriting pending prompt");
        }
        let seq = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
        *pending = Some((kind, seq));
        Some(seq)
    }

    fn spawn_prompt<F>(&self, seq: u64, message: String, detail: String, buttons: Vec<String>, route: F)
    where
        F: FnOnce(usize) -> Option<UpdateCommand> + Send + 'static,
    {
        let prompter = self.prompter.clone();
        let commands = self.commands.clone();
        let pending = self.pending.clone();
        tokio::task::spawn_blocking(move || {
            let refs: Vec<&str> = buttons.iter().map(String::as_str).collect();
            let choice = prompter.show_prompt(APP_TITLE, &message, &detail, &refs);

            // Drop responses from prompts that were superseded meanwhile.
            {
                let mut slot = pending.lock().unwrap_or_else(|p| p.into_inner());
                match *slot {
                    Some((_, current_seq)) if current_seq == seq => *slot = None,
                    _ => {
                        debug!(seq, "dropping response from superseded prompt");
                        return;
                    }
                }
            }

            if let Some(command) = route(choice) {
                if commands.blocking_send(command).is_err() {
                    warn!("update service is gone, dropping prompt action");
                }
            }
        });
    }
}
