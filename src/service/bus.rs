//! Event Bus
//!
//! Publish side of engine notifications. The engine only knows this trait;
//! the transport (WebSocket fan-out, message queue, test recorder) lives
//! behind it.

use tokio::sync::broadcast;
use tracing::trace;

use crate::game::events::EngineEvent;

/// Default broadcast buffer, in events.
///
/// At one state change per 16ms tick this is about 16 seconds of flight.
pub const DEFAULT_BUS_CAPACITY: usize = 1024;

/// Sink for engine events.
///
/// Called with the engine lock held, in event order. Implementations must
/// not block.
pub trait EventBus: Send + Sync {
    /// Publish one event.
    fn publish(&self, event: EngineEvent);
}

/// Fan-out over a tokio broadcast channel.
///
/// Subscribers that fall more than `capacity` events behind get
/// `RecvError::Lagged` and skip ahead; the `seq` field shows the gap.
#[derive(Debug, Clone)]
pub struct BroadcastBus {
    tx: broadcast::Sender<EngineEvent>,
}

impl BroadcastBus {
    /// Create a bus buffering up to `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Receive every event published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.tx.subscribe()
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for BroadcastBus {
    fn default() -> Self {
        Self::new(DEFAULT_BUS_CAPACITY)
    }
}

impl EventBus for BroadcastBus {
    fn publish(&self, event: EngineEvent) {
        // Err only means nobody is listening
        if let Err(broadcast::error::SendError(event)) = self.tx.send(event) {
            trace!(seq = event.seq, "event dropped, no subscribers");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::events::EngineEventData;
    use crate::game::state::{RoundPhase, RoundSnapshot};

    fn waiting_event(seq: u64) -> EngineEvent {
        EngineEvent::new(
            seq,
            1,
            EngineEventData::GameStateChanged(RoundSnapshot {
                state: RoundPhase::Waiting,
                game_id: 1,
                multiplier: None,
                elapsed: None,
                final_multiplier: None,
                next_round_in: Some(3.0),
                countdown: None,
            }),
        )
    }

    #[tokio::test]
    async fn test_fan_out_in_order() {
        let bus = BroadcastBus::new(16);
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        bus.publish(waiting_event(1));
        bus.publish(waiting_event(2));

        for rx in [&mut a, &mut b] {
            assert_eq!(rx.recv().await.unwrap().seq, 1);
            assert_eq!(rx.recv().await.unwrap().seq, 2);
        }
    }

    #[test]
    fn test_publish_without_subscribers() {
        let bus = BroadcastBus::default();
        bus.publish(waiting_event(1));
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_slow_subscriber_lags() {
        let bus = BroadcastBus::new(2);
        let mut rx = bus.subscribe();
        for seq in 1..=4 {
            bus.publish(waiting_event(seq));
        }

        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Lagged(2))
        ));
        assert_eq!(rx.recv().await.unwrap().seq, 3);
    }
}
