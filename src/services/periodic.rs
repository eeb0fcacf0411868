//! Cooperative periodic task with explicit start/stop semantics.
//!
//! The original update flow used timer callbacks that rescheduled themselves;
//! here each timer is a single owned task so cancellation and re-arming are
//! explicit, and re-arming never leaves a duplicate timer running.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;

/// A named repeating timer. `start` is clear-then-set: any previously running
/// task is aborted before the new one is spawned, so at most one instance of
/// the timer exists at a time.
#[derive(Debug)]
pub struct PeriodicTask {
    name: &'static str,
    handle: Option<JoinHandle<()>>,
}

impl PeriodicTask {
    pub fn new(name: &'static str) -> Self {
        Self { name, handle: None }
    }

    /// Arms the timer, replacing any running instance. `tick` fires once per
    /// `period`, starting one full period from now.
    pub fn start<F>(&mut self, period: Duration, tick: F)
    where
        F: Fn() + Send + 'static,
    {
        self.stop();
        debug!(timer = self.name, ?period, "arming periodic task");
        let start = tokio::time::Instant::now() + period;
        self.handle = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(start, period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                tick();
            }
        }));
    }

    /// Stops the timer if it is running.
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            debug!(timer = self.name, "stopping periodic task");
            handle.abort();
        }
    }

    /// Whether a timer instance is currently armed.
    pub fn is_armed(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for PeriodicTask {
    fn drop(&mut self) {
        self.stop();
    }
}
