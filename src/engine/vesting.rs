//! Vesting factor: tiered decomposition of liquidity level buckets into
//! a single multiplier in [0, 1].
//!
//! Each incremental liquidity unit vests independently based on the
//! in-range dwell time of the levels at or above it, so liquidity added
//! late never inherits dwell time accumulated by liquidity that was
//! already there.

use crate::domain::{Decimal, LiquidityLevels};
use alloy::primitives::U256;

/// Compute the liquidity-weighted vesting factor.
///
/// For each tier boundary `L_i` (ascending, with `L_0 = 0`), the subset
/// of buckets holding at least `L_i` contributes
/// `delta_i * totalSeconds * min(secondsInside, vestingPeriod) /
/// vestingPeriod` vested liquidity-time and `delta_i * totalSeconds`
/// total liquidity-time. The factor is the ratio of the two sums, or 0
/// when the position never held liquidity in-window.
///
/// `vesting_period` must be positive (enforced at configuration time).
pub fn vesting_factor(levels: &LiquidityLevels, vesting_period: u64) -> Decimal {
    let mut vested = U256::ZERO;
    let mut total = U256::ZERO;

    let mut previous: u128 = 0;
    for (&liquidity, _) in levels.iter() {
        let delta = liquidity - previous;
        previous = liquidity;
        if delta == 0 {
            continue;
        }

        // Sums over every bucket at or above this tier boundary.
        let (seconds_inside, total_seconds) = levels
            .iter()
            .filter(|(&other, _)| other >= liquidity)
            .fold((0u64, 0u64), |(inside, secs), (_, time)| {
                (inside + time.seconds_inside, secs + time.total_seconds)
            });

        let capped_inside = seconds_inside.min(vesting_period);
        let weight = U256::from(delta) * U256::from(total_seconds);
        vested += weight * U256::from(capped_inside) / U256::from(vesting_period);
        total += weight;
    }

    Decimal::ratio(vested, total)
}
