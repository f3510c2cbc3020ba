use tokio::sync::broadcast;

use crate::dto::sse::ServerEvent;

/// Capacity of a play session's event channel.
pub const SESSION_EVENT_CAPACITY: usize = 32;

/// Fan-out of one play session's events to its SSE listeners.
///
/// A listener that lags past the channel capacity loses the oldest events; the next
/// snapshot-bearing event resynchronises it.
pub struct SessionEvents {
    sender: broadcast::Sender<ServerEvent>,
}

impl SessionEvents {
    /// Channel holding at most `capacity` undelivered events per listener.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Receiver for events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.sender.subscribe()
    }

    /// Publish `event`, returning how many listeners will see it.
    pub fn publish(&self, event: ServerEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    /// Number of attached listeners.
    pub fn listener_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
