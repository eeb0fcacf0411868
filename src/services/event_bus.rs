//! Typed event bus for the update subsystem.
//!
//! Replaces name-based event emission with a fixed enumerated set of event
//! kinds ([`UpdateEvent`]) so subscribers are statically known.

use tokio::sync::broadcast;
use tracing::trace;

use crate::types::update::UpdateEvent;

const EVENT_CAPACITY: usize = 64;

/// Broadcast channel carrying [`UpdateEvent`]s to host subscribers
/// (menu, badges, renderer bridges). Cheap to clone.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<UpdateEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self { tx }
    }

    /// Subscribes to all subsequent events.
    pub fn subscribe(&self) -> broadcast::Receiver<UpdateEvent> {
        self.tx.subscribe()
    }

    /// Publishes an event. Having no subscribers is not an error.
    pub fn emit(&self, event: UpdateEvent) {
        trace!(?event, "emitting update event");
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
