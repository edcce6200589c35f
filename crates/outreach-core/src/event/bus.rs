//! Broadcast event bus for distributing `RunnerEvent` to multiple subscribers.
//!
//! Built on `tokio::sync::broadcast`. Publishing with no active subscribers
//! is a no-op.

use outreach_types::event::RunnerEvent;
use tokio::sync::broadcast;

/// Multi-consumer bus for runner lifecycle events.
///
/// Cloning the bus clones the sender, so every clone publishes to the same
/// set of subscribers.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<RunnerEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Receive every event published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<RunnerEvent> {
        self.sender.subscribe()
    }

    /// Publish to all current subscribers; dropped if there are none.
    pub fn publish(&self, event: RunnerEvent) {
        tracing::trace!(?event, "runner event");
        let _ = self.sender.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("receiver_count", &self.sender.receiver_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use outreach_types::campaign::CampaignId;

    fn paused() -> RunnerEvent {
        RunnerEvent::Paused {
            campaign_id: CampaignId::new(),
        }
    }

    #[tokio::test]
    async fn multiple_subscribers_each_receive_event() {
        let bus = EventBus::new(16);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.publish(paused());

        assert!(matches!(rx1.recv().await.unwrap(), RunnerEvent::Paused { .. }));
        assert!(matches!(rx2.recv().await.unwrap(), RunnerEvent::Paused { .. }));
    }

    #[test]
    fn publish_with_no_subscribers_does_not_panic() {
        let bus = EventBus::new(4);
        for _ in 0..10 {
            bus.publish(paused());
        }
    }

    #[test]
    fn lagged_receiver_reports_lag() {
        let bus = EventBus::new(2);
        let mut rx = bus.subscribe();
        for _ in 0..5 {
            bus.publish(paused());
        }
        assert!(matches!(
            rx.try_recv(),
            Err(broadcast::error::TryRecvError::Lagged(_))
        ));
    }

    #[test]
    fn clone_shares_channel() {
        let bus = EventBus::new(16);
        let other = bus.clone();
        let mut rx = bus.subscribe();

        other.publish(paused());
        assert!(rx.try_recv().is_ok());
        assert!(format!("{bus:?}").contains("receiver_count"));
    }
}
