//! Game event bus for presentation layers.
//!
//! One broadcast channel carries every core notification. Emission is
//! synchronous with the state mutation that caused it, so a subscriber
//! always observes events in cause order; delivery to each receiver is the
//! channel's FIFO.

use crate::chest::ChestState;
use crate::rewards::Reward;
use crate::round::RoundState;
use tokio::sync::broadcast;

pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Notifications published by the core.
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    RoundStateChanged { state: RoundState },
    ChestStateChanged { index: usize, state: ChestState },
    AttemptsChanged { remaining: u32 },
    RoundWon { reward: Reward },
    RoundLost,
}

/// Cheaply cloneable handle to the shared event channel.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<GameEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<GameEvent> {
        self.tx.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub(crate) fn emit(&self, event: GameEvent) {
        tracing::trace!(?event, "game event");
        // a send with no subscribers is not an error
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}
