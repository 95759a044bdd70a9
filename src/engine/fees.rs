//! Fee attribution: net fee income generated by a position over a window,
//! in raw token units.
//!
//! Two interchangeable strategies behind the same `FeeAmounts` contract:
//! direct probing of collectible fees at the window edges, and a
//! fee-growth-rate estimate for chains where historical static calls are
//! unavailable. The strategy is chosen at configuration time.

use crate::domain::{CollectEvent, DecreaseEvent, FeeAmounts, LiquidityMutation};
use crate::error::EngineError;
use alloy::primitives::U256;

/// Direct accounting: difference of the collect-all probes at the window
/// edges, plus fees already paid out by mid-window collects, minus fees
/// returned to the owner by decrease-liquidity events (the removed
/// liquidity's accrued share is not value generated by this engine).
///
/// A negative net result signals a reconstruction bug upstream and fails
/// loudly; it is never clamped.
pub fn direct_fees(
    probe_at_start: (U256, U256),
    probe_at_end: (U256, U256),
    collects: &[CollectEvent],
    decreases: &[DecreaseEvent],
) -> Result<FeeAmounts, EngineError> {
    let mut gains0 = probe_at_end.0;
    let mut gains1 = probe_at_end.1;
    for collect in collects {
        gains0 += collect.amount0;
        gains1 += collect.amount1;
    }

    let mut losses0 = probe_at_start.0;
    let mut losses1 = probe_at_start.1;
    for decrease in decreases {
        losses0 += decrease.amount0;
        losses1 += decrease.amount1;
    }

    let amount0 = gains0.checked_sub(losses0).ok_or_else(|| {
        EngineError::DataIntegrity(format!(
            "negative fee accumulator for token0: {} - {}",
            gains0, losses0
        ))
    })?;
    let amount1 = gains1.checked_sub(losses1).ok_or_else(|| {
        EngineError::DataIntegrity(format!(
            "negative fee accumulator for token1: {} - {}",
            gains1, losses1
        ))
    })?;

    Ok(FeeAmounts { amount0, amount1 })
}

/// Average fee growth observed over a bracket of fee observations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateBracket {
    pub first_block: u64,
    pub last_block: u64,
    pub total0: U256,
    pub total1: U256,
}

impl RateBracket {
    /// Build a bracket from fee observations (collect events). A rate
    /// needs two points spanning at least one block; anything less is a
    /// data-integrity failure the caller escalates after widening the
    /// search as far as it can.
    pub fn from_collects(collects: &[CollectEvent]) -> Result<Self, EngineError> {
        if collects.len() < 2 {
            return Err(EngineError::DataIntegrity(format!(
                "fee-growth rate needs two observations, found {}",
                collects.len()
            )));
        }
        let first_block = collects[0].block;
        let last_block = collects[collects.len() - 1].block;
        if last_block <= first_block {
            return Err(EngineError::DataIntegrity(
                "fee-growth observations span zero blocks".to_string(),
            ));
        }
        let mut total0 = U256::ZERO;
        let mut total1 = U256::ZERO;
        for collect in collects {
            total0 += collect.amount0;
            total1 += collect.amount1;
        }
        Ok(RateBracket {
            first_block,
            last_block,
            total0,
            total1,
        })
    }

    pub fn span(&self) -> u64 {
        self.last_block - self.first_block
    }
}

/// A sub-interval of the window during which liquidity was constant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiquidityInterval {
    pub start_block: u64,
    pub end_block: u64,
    pub liquidity: u128,
}

/// Decompose the window into constant-liquidity sub-intervals.
pub fn liquidity_intervals(
    start_liquidity: u128,
    mutations: &[LiquidityMutation],
    from_block: u64,
    to_block: u64,
) -> Result<Vec<LiquidityInterval>, EngineError> {
    let mut intervals = Vec::new();
    let mut current = start_liquidity;
    let mut cursor = from_block;

    for mutation in mutations {
        if mutation.block > cursor {
            intervals.push(LiquidityInterval {
                start_block: cursor,
                end_block: mutation.block.min(to_block),
                liquidity: current,
            });
            cursor = mutation.block;
        }
        let next = current as i128 + mutation.signed_delta();
        if next < 0 {
            return Err(EngineError::DataIntegrity(format!(
                "liquidity underflow at block {}",
                mutation.block
            )));
        }
        current = next as u128;
    }

    if to_block > cursor {
        intervals.push(LiquidityInterval {
            start_block: cursor,
            end_block: to_block,
            liquidity: current,
        });
    }

    Ok(intervals)
}

/// Fee-growth-rate estimate: integrate `rate x blocks x liquidity` over
/// each constant-liquidity sub-interval, weighting liquidity against the
/// largest level seen in the window.
pub fn growth_rate_fees(
    bracket: &RateBracket,
    intervals: &[LiquidityInterval],
) -> Result<FeeAmounts, EngineError> {
    let span = U256::from(bracket.span());
    let reference = intervals
        .iter()
        .filter(|i| i.end_block > i.start_block)
        .map(|i| i.liquidity)
        .max()
        .unwrap_or(0);
    if reference == 0 {
        return Ok(FeeAmounts::zero());
    }

    let unit = U256::from(10u64).pow(U256::from(18u64));
    let reference = U256::from(reference);

    let mut amount0 = U256::ZERO;
    let mut amount1 = U256::ZERO;
    for interval in intervals {
        let blocks = U256::from(interval.end_block - interval.start_block);
        if blocks.is_zero() || interval.liquidity == 0 {
            continue;
        }
        let share = U256::from(interval.liquidity) * unit / reference;
        amount0 += bracket.total0 * blocks / span * share / unit;
        amount1 += bracket.total1 * blocks / span * share / unit;
    }

    Ok(FeeAmounts { amount0, amount1 })
}
