//! Event bus for broadcasting timeline invalidations

use super::{EventEmitter, TimelineEvent};
use tokio::sync::broadcast;
use tracing::debug;

/// Default broadcast channel capacity
pub(crate) const DEFAULT_CAPACITY: usize = 256;

/// Event bus that distributes TimelineEvents via `tokio::sync::broadcast`
///
/// Fire-and-forget: emitting never blocks, never panics.
/// If no subscribers are connected, events are silently dropped.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<TimelineEvent>,
}

impl EventBus {
    /// Create a new EventBus with the given channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Subscribe to receive events
    pub fn subscribe(&self) -> broadcast::Receiver<TimelineEvent> {
        self.sender.subscribe()
    }

    /// Number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl EventEmitter for EventBus {
    fn emit(&self, event: TimelineEvent) {
        let plan_id = event.plan_id();
        match self.sender.send(event) {
            Ok(n) => {
                debug!(plan_id, subscribers = n, "TimelineEvent emitted");
            }
            Err(_) => {
                // No subscribers
            }
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
