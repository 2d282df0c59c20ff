//! Uniform random tip selection (URTS).
//!
//! Maintains the non-lazy and semi-lazy tip pools of the tangle and picks the
//! parents of newly issued blocks from them.

use std::sync::atomic::{AtomicU64, Ordering};

pub mod config;
pub mod context;
pub mod errors;
pub mod events;
pub mod model;
pub mod monitor;
pub(crate) mod pool;
pub mod score;
pub mod selector;
pub mod service;
pub mod tip;

#[cfg(test)]
pub mod testutils;

pub use selector::TipSelector;

#[derive(Default)]
pub struct TipSelCounters {
    pub non_lazy_tips: AtomicU64,
    pub semi_lazy_tips: AtomicU64,
    pub tips_added: AtomicU64,
    pub tips_removed: AtomicU64,
    pub selections: AtomicU64,
    pub dropped_events: AtomicU64,
}

impl TipSelCounters {
    pub fn snapshot(&self) -> TipSelCountersSnapshot {
        TipSelCountersSnapshot {
            non_lazy_tips: self.non_lazy_tips.load(Ordering::Relaxed),
            semi_lazy_tips: self.semi_lazy_tips.load(Ordering::Relaxed),
            tips_added: self.tips_added.load(Ordering::Relaxed),
            tips_removed: self.tips_removed.load(Ordering::Relaxed),
            selections: self.selections.load(Ordering::Relaxed),
            dropped_events: self.dropped_events.load(Ordering::Relaxed),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TipSelCountersSnapshot {
    pub non_lazy_tips: u64,
    pub semi_lazy_tips: u64,
    pub tips_added: u64,
    pub tips_removed: u64,
    pub selections: u64,
    pub dropped_events: u64,
}

impl TipSelCountersSnapshot {
    pub fn tips(&self) -> u64 {
        self.non_lazy_tips + self.semi_lazy_tips
    }
}

/// Gauges keep the value of the newer snapshot, monotonic counters are subtracted
impl core::ops::Sub for &TipSelCountersSnapshot {
    type Output = TipSelCountersSnapshot;

    fn sub(self, rhs: Self) -> Self::Output {
        Self::Output {
            non_lazy_tips: self.non_lazy_tips,
            semi_lazy_tips: self.semi_lazy_tips,
            tips_added: self.tips_added.checked_sub(rhs.tips_added).unwrap_or_default(),
            tips_removed: self.tips_removed.checked_sub(rhs.tips_removed).unwrap_or_default(),
            selections: self.selections.checked_sub(rhs.selections).unwrap_or_default(),
            dropped_events: self.dropped_events.checked_sub(rhs.dropped_events).unwrap_or_default(),
        }
    }
}
