//! Reward values and the randomness seams the round controller draws from.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Currencies a reward can pay out in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Currency {
    Coins,
    Gems,
}

impl Currency {
    pub fn all() -> [Currency; 2] {
        [Currency::Coins, Currency::Gems]
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Currency::Coins => write!(f, "coins"),
            Currency::Gems => write!(f, "gems"),
        }
    }
}

/// Value drawn at round start and credited only on a win.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Reward {
    pub currency: Currency,
    pub amount: u32,
}

impl Reward {
    pub fn new(currency: Currency, amount: u32) -> Self {
        Self { currency, amount }
    }
}

impl fmt::Display for Reward {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount, self.currency)
    }
}

/// Produces the reward for a new round. Pure value draw, no side effects;
/// called once per round start.
pub trait RewardSource: Send + Sync {
    /// Draw a reward with an amount in `min_amount..=max_amount`.
    fn draw(&self, min_amount: u32, max_amount: u32) -> Reward;
}

/// Uniformly random currency and amount.
pub struct RandomRewardSource;

impl RewardSource for RandomRewardSource {
    fn draw(&self, min_amount: u32, max_amount: u32) -> Reward {
        let mut rng = rand::thread_rng();
        let currency = *Currency::all()
            .choose(&mut rng)
            .unwrap_or(&Currency::Coins);
        let amount = rng.gen_range(min_amount..=max_amount);
        Reward { currency, amount }
    }
}

/// Designates the winning chest for a new round.
pub trait WinnerPicker: Send + Sync {
    /// Pick the winning index for a round of `chest_count` chests.
    /// Implementations must return a value in `0..chest_count`.
    fn pick_winner(&self, chest_count: usize) -> usize;
}

/// Uniformly random winner selection.
pub struct UniformWinnerPicker;

impl WinnerPicker for UniformWinnerPicker {
    fn pick_winner(&self, chest_count: usize) -> usize {
        rand::thread_rng().gen_range(0..chest_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_draw_stays_in_bounds() {
        let source = RandomRewardSource;
        for _ in 0..100 {
            let reward = source.draw(10, 100);
            assert!((10..=100).contains(&reward.amount));
            assert!(Currency::all().contains(&reward.currency));
        }
    }

    #[test]
    fn test_draw_with_collapsed_bounds() {
        let source = RandomRewardSource;
        let reward = source.draw(7, 7);
        assert_eq!(reward.amount, 7);
    }

    #[test]
    fn test_uniform_picker_stays_in_range() {
        let picker = UniformWinnerPicker;
        for _ in 0..100 {
            assert!(picker.pick_winner(5) < 5);
        }
    }

    #[test]
    fn test_reward_display() {
        let reward = Reward::new(Currency::Gems, 25);
        assert_eq!(reward.to_string(), "25 gems");
    }

    #[test]
    fn test_reward_serializes_lowercase() {
        let reward = Reward::new(Currency::Coins, 5);
        let json = serde_json::to_string(&reward).expect("serialize");
        assert_eq!(json, r#"{"currency":"coins","amount":5}"#);

        let back: Reward = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, reward);
    }
}
