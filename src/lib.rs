//! TreasureHunt — round-based chest-picking game core.
//!
//! A player gets a limited number of attempts to find the one winning chest
//! among several. Opening a chest takes a configurable delay and can be
//! cancelled mid-open by redirecting the pick; the round controller
//! serializes selections, tallies attempts, and credits the round's reward
//! on a win. Rendering, input wiring, and asset loading live in the
//! embedding application; this crate is the in-process game logic only.

pub mod chest;
pub mod config;
pub mod currency;
pub mod errors;
pub mod events;
pub mod fsm;
pub mod rewards;
pub mod round;

pub use chest::{Chest, ChestState, OpenOutcome};
pub use config::GameConfig;
pub use currency::{CurrencyChanged, CurrencyLedger};
pub use errors::{ConfigError, GameError};
pub use events::{EventBus, GameEvent};
pub use fsm::{StateHooks, StateMachine};
pub use rewards::{
    Currency, RandomRewardSource, Reward, RewardSource, UniformWinnerPicker, WinnerPicker,
};
pub use round::{RoundController, RoundState, SelectionOutcome};
