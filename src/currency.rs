//! Running totals of credited rewards, by currency.

use crate::rewards::{Currency, Reward};
use dashmap::DashMap;
use tokio::sync::broadcast;

/// Emitted after a credit, carrying the already-applied new total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrencyChanged {
    pub currency: Currency,
    pub total: u64,
}

/// Accumulating store of reward totals. Balances start at zero for every
/// currency; credits are the only mutation.
pub struct CurrencyLedger {
    balances: DashMap<Currency, u64>,
    changes: broadcast::Sender<CurrencyChanged>,
}

impl CurrencyLedger {
    pub fn new() -> Self {
        let balances = DashMap::new();
        for currency in Currency::all() {
            balances.insert(currency, 0);
        }
        let (changes, _) = broadcast::channel(64);
        Self { balances, changes }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CurrencyChanged> {
        self.changes.subscribe()
    }

    /// Add the reward to its currency's total and notify subscribers with
    /// the new total. Returns the new total.
    pub fn credit(&self, reward: Reward) -> u64 {
        let total = {
            let mut entry = self.balances.entry(reward.currency).or_insert(0);
            *entry += u64::from(reward.amount);
            *entry
        };
        tracing::debug!(%reward, total, "reward credited");
        let _ = self.changes.send(CurrencyChanged {
            currency: reward.currency,
            total,
        });
        total
    }

    pub fn balance(&self, currency: Currency) -> u64 {
        self.balances.get(&currency).map(|total| *total).unwrap_or(0)
    }
}

impl Default for CurrencyLedger {
    fn default() -> Self {
        Self::new()
    }
}
