//! Liquidity mutation events, decoded once at ingestion into tagged
//! variants and merged into a single replay stream.

use super::primitives::BlockNumber;
use alloy::primitives::U256;

/// A liquidity increase for a position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncreaseEvent {
    pub block: BlockNumber,
    pub liquidity: u128,
    pub amount0: U256,
    pub amount1: U256,
}

/// A liquidity decrease for a position. `amount0`/`amount1` are the
/// principal plus accrued fees returned to the owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecreaseEvent {
    pub block: BlockNumber,
    pub liquidity: u128,
    pub amount0: U256,
    pub amount1: U256,
}

/// A fee collection for a position (fees paid out mid-window).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectEvent {
    pub block: BlockNumber,
    pub amount0: U256,
    pub amount1: U256,
}

/// Event logs for one position within a block range, each stream ordered
/// by block number as returned by the log query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PositionEventLog {
    pub increases: Vec<IncreaseEvent>,
    pub decreases: Vec<DecreaseEvent>,
    pub collects: Vec<CollectEvent>,
}

/// Direction of a merged liquidity mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    Increase,
    Decrease,
}

/// One entry of the merged replay stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiquidityMutation {
    pub block: BlockNumber,
    pub kind: MutationKind,
    /// Unsigned magnitude; sign is carried by `kind`.
    pub liquidity: u128,
    pub amount0: U256,
    pub amount1: U256,
}

impl LiquidityMutation {
    /// Signed liquidity delta this mutation applies.
    pub fn signed_delta(&self) -> i128 {
        match self.kind {
            MutationKind::Increase => self.liquidity as i128,
            MutationKind::Decrease => -(self.liquidity as i128),
        }
    }
}

/// Merge increase and decrease streams into one block-ordered stream.
///
/// Ties are broken in favor of increases: liquidity added at a block is
/// visible before a withdrawal at the same block.
pub fn merge_mutations(
    increases: &[IncreaseEvent],
    decreases: &[DecreaseEvent],
) -> Vec<LiquidityMutation> {
    let mut merged = Vec::with_capacity(increases.len() + decreases.len());
    let mut add_idx = 0;
    let mut withdraw_idx = 0;

    while add_idx < increases.len() || withdraw_idx < decreases.len() {
        let next_add = increases.get(add_idx);
        let next_withdraw = decreases.get(withdraw_idx);

        let take_add = match (next_add, next_withdraw) {
            (Some(a), Some(w)) => a.block <= w.block,
            (Some(_), None) => true,
            (None, _) => false,
        };

        if take_add {
            let a = &increases[add_idx];
            merged.push(LiquidityMutation {
                block: a.block,
                kind: MutationKind::Increase,
                liquidity: a.liquidity,
                amount0: a.amount0,
                amount1: a.amount1,
            });
            add_idx += 1;
        } else {
            let w = &decreases[withdraw_idx];
            merged.push(LiquidityMutation {
                block: w.block,
                kind: MutationKind::Decrease,
                liquidity: w.liquidity,
                amount0: w.amount0,
                amount1: w.amount1,
            });
            withdraw_idx += 1;
        }
    }

    merged
}
