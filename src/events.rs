//! In-process event bus feeding the dashboard stream.
//!
//! Services publish after their transaction commits. Delivery is best effort:
//! with no subscribers the event is dropped, and a subscriber that falls more
//! than [`EVENT_BUS_CAPACITY`] events behind skips the ones it missed.

use examtrack_models::DomainEvent;
use tokio::sync::broadcast;

pub const EVENT_BUS_CAPACITY: usize = 256;

#[derive(Clone, Debug)]
pub struct EventBus {
    sender: broadcast::Sender<DomainEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(EVENT_BUS_CAPACITY)
    }
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Sends `event` to every current subscriber.
    pub fn publish(&self, event: DomainEvent) {
        match self.sender.send(event) {
            Ok(receivers) => {
                tracing::debug!(receivers, "Domain event published");
            }
            Err(broadcast::error::SendError(event)) => {
                tracing::trace!(kind = %event.kind, "Domain event dropped, no subscribers");
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.sender.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
