use crate::model::DiscoveryRequest;
use tokio::sync::mpsc;
use tracing::trace;

// region:        --- Events

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topic {
    Log,
    SetActive,
    NewName,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Priority {
    High,
    Critical,
}

#[derive(Debug, Clone)]
pub enum Payload {
    Message(String),
    Discovery(DiscoveryRequest),
}

#[derive(Debug, Clone)]
pub struct BusEvent {
    pub topic: Topic,
    pub priority: Priority,
    pub payload: Payload,
}

// endregion:     --- Events

/// Publish handle shared by every source. Events from one publisher reach the
/// consumer in publication order; publishers interleave arbitrarily.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: mpsc::UnboundedSender<BusEvent>,
}

impl EventBus {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<BusEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn publish(&self, topic: Topic, priority: Priority, payload: Payload) {
        let event = BusEvent {
            topic,
            priority,
            payload,
        };
        if self.tx.send(event).is_err() {
            trace!("Bus receiver dropped, event discarded");
        }
    }
}
