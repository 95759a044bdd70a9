//! Liquidity level buckets: time spent at each distinct liquidity amount.

use std::collections::btree_map::Iter;
use std::collections::BTreeMap;

/// Time accumulated while the position held one specific liquidity amount.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LevelTime {
    /// Seconds the position's range was the active price range.
    pub seconds_inside: u64,
    /// Wall-clock seconds.
    pub total_seconds: u64,
}

/// Mapping from liquidity amount to accumulated in-range and wall-clock
/// time over every interval at that amount.
///
/// Built once per position-window pass and discarded after the vesting
/// factor is derived. Sorted keys make the tier decomposition a simple
/// forward walk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LiquidityLevels(BTreeMap<u128, LevelTime>);

impl LiquidityLevels {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ensure a bucket exists for `liquidity` without touching its time.
    pub fn touch(&mut self, liquidity: u128) {
        self.0.entry(liquidity).or_default();
    }

    /// Add time to the bucket for `liquidity`, creating it if absent.
    pub fn add(&mut self, liquidity: u128, seconds_inside: u64, total_seconds: u64) {
        let entry = self.0.entry(liquidity).or_default();
        entry.seconds_inside += seconds_inside;
        entry.total_seconds += total_seconds;
    }

    /// Merge another bucket map additively (multi-session positions).
    pub fn merge(&mut self, other: &LiquidityLevels) {
        for (liquidity, time) in other.iter() {
            self.add(*liquidity, time.seconds_inside, time.total_seconds);
        }
    }

    pub fn iter(&self) -> Iter<'_, u128, LevelTime> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, liquidity: u128) -> Option<&LevelTime> {
        self.0.get(&liquidity)
    }

    /// Sum of wall-clock seconds across all buckets.
    pub fn total_seconds(&self) -> u64 {
        self.0.values().map(|t| t.total_seconds).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_accumulates_per_level() {
        let mut levels = LiquidityLevels::new();
        levels.add(100, 10, 20);
        levels.add(100, 5, 5);
        levels.add(200, 1, 2);

        assert_eq!(
            levels.get(100),
            Some(&LevelTime {
                seconds_inside: 15,
                total_seconds: 25
            })
        );
        assert_eq!(levels.total_seconds(), 27);
    }

    #[test]
    fn merge_is_additive() {
        let mut a = LiquidityLevels::new();
        a.add(100, 10, 10);
        let mut b = LiquidityLevels::new();
        b.add(100, 1, 1);
        b.add(300, 2, 2);

        a.merge(&b);
        assert_eq!(
            a.get(100),
            Some(&LevelTime {
                seconds_inside: 11,
                total_seconds: 11
            })
        );
        assert_eq!(
            a.get(300),
            Some(&LevelTime {
                seconds_inside: 2,
                total_seconds: 2
            })
        );
    }

    #[test]
    fn touch_creates_empty_bucket() {
        let mut levels = LiquidityLevels::new();
        levels.touch(500);
        assert_eq!(levels.get(500), Some(&LevelTime::default()));
        assert_eq!(levels.total_seconds(), 0);
    }

    #[test]
    fn keys_iterate_in_ascending_order() {
        let mut levels = LiquidityLevels::new();
        levels.add(300, 0, 1);
        levels.add(100, 0, 1);
        levels.add(200, 0, 1);
        let keys: Vec<u128> = levels.iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, vec![100, 200, 300]);
    }
}
