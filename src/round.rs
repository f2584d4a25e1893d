//! Round controller: owns the chest collection, the attempt budget, the
//! winner designation, and the round state machine.
//!
//! Selections are serialized by the controller, not by locking across the
//! open's delay: a new selection cancels the previous in-flight open, and a
//! round serial lets a settle from a superseded round be discarded without
//! side effects.

use crate::chest::{Chest, ChestState, OpenOutcome};
use crate::config::GameConfig;
use crate::currency::CurrencyLedger;
use crate::errors::{ConfigError, GameError};
use crate::events::{EventBus, GameEvent};
use crate::fsm::StateMachine;
use crate::rewards::{Reward, RewardSource, UniformWinnerPicker, WinnerPicker};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Lifecycle of a round. `Won` and `Lost` are re-entrant terminal states: a
/// new round may be started from either, as well as from `Idle` or `Active`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RoundState {
    Idle,
    Active,
    Won,
    Lost,
}

impl fmt::Display for RoundState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoundState::Idle => write!(f, "idle"),
            RoundState::Active => write!(f, "active"),
            RoundState::Won => write!(f, "won"),
            RoundState::Lost => write!(f, "lost"),
        }
    }
}

/// Result of one [`RoundController::select_chest`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionOutcome {
    /// Ignored: no active round, or the chest was not selectable.
    Rejected,
    /// The open was pre-empted by a later selection, a round restart, or
    /// shutdown. A normal abandoned attempt, not a failure.
    Cancelled,
    /// The chest opened empty; the round is lost once this reaches zero.
    Missed { remaining_attempts: u32 },
    /// The winning chest opened; the reward has been credited.
    Won { reward: Reward },
}

/// Owner the round state machine drives.
struct RoundCore {
    round_id: Option<Uuid>,
}

struct RoundInner {
    core: RoundCore,
    machine: StateMachine<RoundCore, RoundState>,
    chests: Vec<Arc<Chest>>,
    remaining_attempts: u32,
    /// At most one in-flight open, tracked by chest index.
    currently_opening: Option<usize>,
    /// Drawn at round start, credited only on a win.
    reward: Option<Reward>,
    /// Bumped by every `start_round`; settles from older rounds are stale.
    round_serial: u64,
}

/// Sequences chest selections against attempt counting and win/loss
/// detection for one player.
pub struct RoundController {
    config: GameConfig,
    rewards: Arc<dyn RewardSource>,
    winners: Arc<dyn WinnerPicker>,
    ledger: Arc<CurrencyLedger>,
    events: EventBus,
    shutdown: broadcast::Sender<()>,
    inner: Mutex<RoundInner>,
}

impl RoundController {
    /// Controller with uniform winner selection and a fresh event bus.
    pub fn new(
        config: GameConfig,
        rewards: Arc<dyn RewardSource>,
        ledger: Arc<CurrencyLedger>,
    ) -> Result<Self, ConfigError> {
        Self::with_parts(
            config,
            rewards,
            Arc::new(UniformWinnerPicker),
            ledger,
            EventBus::default(),
        )
    }

    /// Controller with every collaborator supplied by the caller.
    pub fn with_parts(
        config: GameConfig,
        rewards: Arc<dyn RewardSource>,
        winners: Arc<dyn WinnerPicker>,
        ledger: Arc<CurrencyLedger>,
        events: EventBus,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut machine = StateMachine::new();
        for state in [
            RoundState::Idle,
            RoundState::Active,
            RoundState::Won,
            RoundState::Lost,
        ] {
            machine.register_state(state, None);
        }
        let bus = events.clone();
        machine.on_change(move |core: &RoundCore, state| {
            tracing::debug!(round = ?core.round_id, %state, "round state changed");
            bus.emit(GameEvent::RoundStateChanged { state });
        });

        let mut core = RoundCore { round_id: None };
        machine.transition(&mut core, RoundState::Idle);

        let (shutdown, _) = broadcast::channel(4);
        Ok(Self {
            config,
            rewards,
            winners,
            ledger,
            events,
            shutdown,
            inner: Mutex::new(RoundInner {
                core,
                machine,
                chests: Vec::new(),
                remaining_attempts: 0,
                currently_opening: None,
                reward: None,
                round_serial: 0,
            }),
        })
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn ledger(&self) -> &Arc<CurrencyLedger> {
        &self.ledger
    }

    pub fn state(&self) -> RoundState {
        self.inner
            .lock()
            .unwrap()
            .machine
            .current()
            .unwrap_or(RoundState::Idle)
    }

    pub fn remaining_attempts(&self) -> u32 {
        self.inner.lock().unwrap().remaining_attempts
    }

    /// Configured chest count; the live collection matches after the first
    /// `start_round`.
    pub fn chest_count(&self) -> usize {
        self.config.chest_count
    }

    pub fn chest(&self, index: usize) -> Option<Arc<Chest>> {
        self.inner.lock().unwrap().chests.get(index).cloned()
    }

    /// Snapshot of every chest's state, in index order.
    pub fn chest_states(&self) -> Vec<ChestState> {
        self.inner
            .lock()
            .unwrap()
            .chests
            .iter()
            .map(|chest| chest.state())
            .collect()
    }

    /// Deal a new round: draw the reward, rebuild the chests with one
    /// winner, reset the attempt budget, and go `Active`.
    ///
    /// Valid from any state. Starting over while a round is `Active`
    /// abandons it: the in-flight open (if any) is cancelled and its settle
    /// is discarded.
    pub fn start_round(&self) -> Uuid {
        let mut inner = self.inner.lock().unwrap();

        if let Some(index) = inner.currently_opening.take() {
            if let Some(chest) = inner.chests.get(index) {
                chest.cancel_opening();
            }
        }
        inner.round_serial += 1;

        let round_id = Uuid::new_v4();
        inner.core.round_id = Some(round_id);

        let reward = self
            .rewards
            .draw(self.config.min_reward_amount, self.config.max_reward_amount);
        inner.reward = Some(reward);

        let count = self.config.chest_count;
        let winner = self.winners.pick_winner(count);
        debug_assert!(winner < count, "winner picker returned {winner} for {count} chests");
        inner.chests = (0..count)
            .map(|index| Arc::new(Chest::new(index, index == winner, &self.events)))
            .collect();

        inner.remaining_attempts = self.config.max_attempts;
        self.events.emit(GameEvent::AttemptsChanged {
            remaining: inner.remaining_attempts,
        });

        let RoundInner { core, machine, .. } = &mut *inner;
        machine.transition(core, RoundState::Active);

        tracing::info!(
            round = %round_id,
            chests = count,
            attempts = self.config.max_attempts,
            "round started"
        );
        tracing::debug!(round = %round_id, winner, "winning chest designated");
        round_id
    }

    /// Player picked chest `index`.
    ///
    /// Returns `Ok(SelectionOutcome::Rejected)` when no round is active or
    /// the chest is not selectable, and `Err(GameError::ChestOutOfRange)`
    /// for an index outside the current collection. A different in-flight
    /// chest is cancelled fire-and-forget before this one starts opening;
    /// its own suspended open settles to `Cancelled` independently.
    pub async fn select_chest(&self, index: usize) -> Result<SelectionOutcome, GameError> {
        let (chest, serial, shutdown_rx) = {
            let mut inner = self.inner.lock().unwrap();
            if inner.machine.current() != Some(RoundState::Active) {
                tracing::trace!(index, "selection ignored: no active round");
                return Ok(SelectionOutcome::Rejected);
            }

            let count = inner.chests.len();
            let Some(chest) = inner.chests.get(index).cloned() else {
                return Err(GameError::ChestOutOfRange { index, count });
            };
            if chest.state() != ChestState::Closed {
                tracing::trace!(index, "selection ignored: chest not closed");
                return Ok(SelectionOutcome::Rejected);
            }

            if let Some(previous) = inner.currently_opening {
                if previous != index {
                    if let Some(open_chest) = inner.chests.get(previous) {
                        tracing::debug!(
                            cancelled = previous,
                            selected = index,
                            "redirecting selection"
                        );
                        open_chest.cancel_opening();
                    }
                }
            }
            inner.currently_opening = Some(index);

            (chest, inner.round_serial, self.shutdown.subscribe())
        };

        let outcome = match chest
            .request_open(self.config.open_duration(), shutdown_rx)
            .await
        {
            Ok(outcome) => outcome,
            // lost a race with a concurrent selection of the same chest
            Err(GameError::ChestNotClosed { .. }) => return Ok(SelectionOutcome::Rejected),
            Err(other) => return Err(other),
        };

        let mut inner = self.inner.lock().unwrap();
        if inner.round_serial != serial {
            // the round was restarted while this open was suspended
            return Ok(SelectionOutcome::Cancelled);
        }
        if inner.currently_opening == Some(index) {
            inner.currently_opening = None;
        }
        if inner.machine.current() != Some(RoundState::Active) {
            // the round was decided while this open was suspended; the
            // settle is void and consumes nothing
            return Ok(SelectionOutcome::Cancelled);
        }

        match outcome {
            OpenOutcome::Cancelled => Ok(SelectionOutcome::Cancelled),
            OpenOutcome::Opened if chest.is_winning() => Ok(self.handle_win(&mut inner)),
            OpenOutcome::Opened => Ok(self.handle_miss(&mut inner)),
        }
    }

    fn handle_win(&self, inner: &mut RoundInner) -> SelectionOutcome {
        let reward = inner
            .reward
            .take()
            .expect("an active round always has a drawn reward");
        let total = self.ledger.credit(reward);
        tracing::info!(round = ?inner.core.round_id, %reward, total, "round won");

        self.events.emit(GameEvent::RoundWon { reward });
        let RoundInner { core, machine, .. } = inner;
        machine.transition(core, RoundState::Won);

        SelectionOutcome::Won { reward }
    }

    fn handle_miss(&self, inner: &mut RoundInner) -> SelectionOutcome {
        inner.remaining_attempts = inner.remaining_attempts.saturating_sub(1);
        let remaining = inner.remaining_attempts;
        self.events.emit(GameEvent::AttemptsChanged { remaining });
        tracing::debug!(round = ?inner.core.round_id, remaining, "chest was empty");

        if remaining == 0 {
            tracing::info!(round = ?inner.core.round_id, "round lost: attempts exhausted");
            self.events.emit(GameEvent::RoundLost);
            let RoundInner { core, machine, .. } = inner;
            machine.transition(core, RoundState::Lost);
        }

        SelectionOutcome::Missed {
            remaining_attempts: remaining,
        }
    }
}

impl Drop for RoundController {
    fn drop(&mut self) {
        // settle any open still suspended somewhere before it dangles
        let _ = self.shutdown.send(());
        if let Ok(inner) = self.inner.lock() {
            for chest in &inner.chests {
                chest.cancel_opening();
            }
        }
    }
}
