use dashmap::DashMap;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RideEventName {
    NewRide,
    RideAwaitingStoreOwner,
    RideConfirmed,
    RideConfirmedCaptain,
    RideDelivered,
}

#[derive(Debug, Clone, Serialize)]
pub struct RideEvent {
    pub name: RideEventName,
    pub ride_id: Uuid,
    pub payload: Value,
}

/// Outbound notification port. Subscribers (captains, customers, stores)
/// register a channel under their own id; state transitions push events into
/// those channels. Delivery is fire-and-forget: an absent or closed channel
/// is logged and skipped, never retried, and never rolls back the transition
/// that produced the event. Clients that miss a push reconcile through the
/// pending-ride poll endpoints.
pub struct NotificationDispatcher {
    channels: DashMap<Uuid, mpsc::UnboundedSender<RideEvent>>,
    firehose: broadcast::Sender<RideEvent>,
}

impl NotificationDispatcher {
    pub fn new(event_buffer_size: usize) -> Self {
        let (firehose, _unused_rx) = broadcast::channel(event_buffer_size);
        Self {
            channels: DashMap::new(),
            firehose,
        }
    }

    pub fn register(&self, subscriber_id: Uuid) -> mpsc::UnboundedReceiver<RideEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.channels.insert(subscriber_id, tx);
        rx
    }

    pub fn unregister(&self, subscriber_id: &Uuid) {
        self.channels.remove(subscriber_id);
    }

    /// Targeted delivery to a single subscriber.
    pub fn notify(&self, target: Uuid, event: RideEvent) {
        let _ = self.firehose.send(event.clone());

        match self.channels.get(&target) {
            Some(tx) => {
                if tx.send(event.clone()).is_err() {
                    warn!(subscriber = %target, event = ?event.name, "subscriber channel closed, dropping event");
                }
            }
            None => {
                debug!(subscriber = %target, event = ?event.name, "subscriber offline, dropping event");
            }
        }
    }

    /// Broadcast to a set of subscribers, in no guaranteed order.
    pub fn broadcast_to<I>(&self, targets: I, event: RideEvent)
    where
        I: IntoIterator<Item = Uuid>,
    {
        let _ = self.firehose.send(event.clone());

        for target in targets {
            match self.channels.get(&target) {
                Some(tx) => {
                    if tx.send(event.clone()).is_err() {
                        warn!(subscriber = %target, event = ?event.name, "subscriber channel closed, dropping event");
                    }
                }
                None => {
                    debug!(subscriber = %target, event = ?event.name, "subscriber offline, dropping event");
                }
            }
        }
    }

    /// Firehose of every event, used by the websocket surface.
    pub fn subscribe_all(&self) -> broadcast::Receiver<RideEvent> {
        self.firehose.subscribe()
    }
}
