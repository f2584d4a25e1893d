//! A chest with a cancellable, time-delayed open.
//!
//! Opening suspends for the configured duration inside a `tokio::select!`
//! armed with two cancellation sources: an internal handle flipped by
//! [`Chest::cancel_opening`] and a caller-supplied shutdown signal. The
//! select is the single decision point, so every accepted open settles to
//! exactly one of [`OpenOutcome::Opened`] or [`OpenOutcome::Cancelled`].

use crate::errors::GameError;
use crate::events::{EventBus, GameEvent};
use crate::fsm::StateMachine;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::{broadcast, oneshot};

/// Open lifecycle of a chest. `Opened` is terminal until an explicit
/// [`Chest::reset`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ChestState {
    Closed,
    Opening,
    Opened,
}

impl fmt::Display for ChestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChestState::Closed => write!(f, "closed"),
            ChestState::Opening => write!(f, "opening"),
            ChestState::Opened => write!(f, "opened"),
        }
    }
}

/// How an accepted open settled. Cancellation is the expected path when the
/// player redirects their pick, not a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenOutcome {
    Opened,
    Cancelled,
}

/// Identity and winner flag, the owner the chest's state machine drives.
struct ChestCore {
    index: usize,
    is_winning: bool,
}

struct ChestInner {
    core: ChestCore,
    machine: StateMachine<ChestCore, ChestState>,
    /// Armed while an open is suspended; fired by `cancel_opening`.
    cancel: Option<oneshot::Sender<()>>,
}

/// One selectable chest. All state lives behind a single lock with short
/// critical sections; nothing holds the lock across an await.
pub struct Chest {
    index: usize,
    inner: Mutex<ChestInner>,
}

impl Chest {
    /// Build a closed chest. The initial transition to `Closed` already
    /// publishes a `ChestStateChanged` event on `events`.
    pub fn new(index: usize, is_winning: bool, events: &EventBus) -> Self {
        let mut machine = StateMachine::new();
        machine.register_state(ChestState::Closed, None);
        machine.register_state(ChestState::Opening, None);
        machine.register_state(ChestState::Opened, None);

        let bus = events.clone();
        machine.on_change(move |core: &ChestCore, state| {
            bus.emit(GameEvent::ChestStateChanged {
                index: core.index,
                state,
            });
        });

        let mut core = ChestCore { index, is_winning };
        machine.transition(&mut core, ChestState::Closed);

        Self {
            index,
            inner: Mutex::new(ChestInner {
                core,
                machine,
                cancel: None,
            }),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn is_winning(&self) -> bool {
        self.inner.lock().unwrap().core.is_winning
    }

    pub fn state(&self) -> ChestState {
        self.inner
            .lock()
            .unwrap()
            .machine
            .current()
            .unwrap_or(ChestState::Closed)
    }

    /// Open this chest after `duration`.
    ///
    /// Accepted only while `Closed`; otherwise returns
    /// [`GameError::ChestNotClosed`] without suspending. While suspended the
    /// open can be cancelled by [`Chest::cancel_opening`] or by a message on
    /// `shutdown`; a shutdown channel whose senders have all been dropped
    /// counts as "no external signal", not as a cancellation.
    pub async fn request_open(
        &self,
        duration: Duration,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<OpenOutcome, GameError> {
        let cancel_rx = {
            let mut inner = self.inner.lock().unwrap();
            let state = inner.machine.current().unwrap_or(ChestState::Closed);
            if state != ChestState::Closed {
                return Err(GameError::ChestNotClosed {
                    index: self.index,
                    state,
                });
            }

            let (cancel_tx, cancel_rx) = oneshot::channel();
            inner.cancel = Some(cancel_tx);
            let ChestInner { core, machine, .. } = &mut *inner;
            machine.transition(core, ChestState::Opening);
            cancel_rx
        };

        // If this future is dropped mid-suspension the guard releases the
        // handle and restores Closed, so the chest stays reusable.
        let guard = SettleGuard {
            chest: self,
            armed: true,
        };

        let outcome = tokio::select! {
            _ = tokio::time::sleep(duration) => OpenOutcome::Opened,
            _ = cancel_rx => OpenOutcome::Cancelled,
            _ = external_cancelled(shutdown) => OpenOutcome::Cancelled,
        };

        Ok(guard.settle(outcome))
    }

    /// Signal the in-flight open to cancel. No-op unless the chest is
    /// `Opening` with an armed handle; the state change itself happens when
    /// the suspended open observes the signal.
    pub fn cancel_opening(&self) {
        let mut inner = self.inner.lock().unwrap();
        if inner.machine.current() == Some(ChestState::Opening) {
            if let Some(cancel) = inner.cancel.take() {
                tracing::debug!(index = self.index, "cancelling chest open");
                let _ = cancel.send(());
            }
        }
    }

    /// Cancel any in-flight open, set the winner flag, and force the chest
    /// back to `Closed`. The transition fires even from `Closed`, so
    /// observers always see the reset.
    pub fn reset(&self, is_winning: bool) {
        self.cancel_opening();

        let mut inner = self.inner.lock().unwrap();
        inner.core.is_winning = is_winning;
        let ChestInner { core, machine, .. } = &mut *inner;
        machine.transition(core, ChestState::Closed);
    }
}

/// Resolves once the external shutdown signal fires. A closed channel means
/// no external signal exists, so the future stays pending in that case.
async fn external_cancelled(mut shutdown: broadcast::Receiver<()>) {
    loop {
        match shutdown.recv().await {
            Ok(()) | Err(broadcast::error::RecvError::Lagged(_)) => return,
            Err(broadcast::error::RecvError::Closed) => std::future::pending::<()>().await,
        }
    }
}

struct SettleGuard<'a> {
    chest: &'a Chest,
    armed: bool,
}

impl SettleGuard<'_> {
    /// Apply the select's decision: release the handle and transition.
    /// If a concurrent `reset` already forced the chest out of `Opening`,
    /// the open is reported as cancelled and no transition is applied.
    fn settle(mut self, outcome: OpenOutcome) -> OpenOutcome {
        self.armed = false;

        let mut inner = self.chest.inner.lock().unwrap();
        inner.cancel = None;
        let ChestInner { core, machine, .. } = &mut *inner;
        if machine.current() != Some(ChestState::Opening) {
            return OpenOutcome::Cancelled;
        }

        let next = match outcome {
            OpenOutcome::Opened => ChestState::Opened,
            OpenOutcome::Cancelled => ChestState::Closed,
        };
        machine.transition(core, next);
        outcome
    }
}

impl Drop for SettleGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Ok(mut inner) = self.chest.inner.lock() {
            inner.cancel = None;
            let ChestInner { core, machine, .. } = &mut *inner;
            if machine.current() == Some(ChestState::Opening) {
                machine.transition(core, ChestState::Closed);
            }
        }
    }
}
