//! Position state as read from the chain at a specific block.

use alloy::primitives::{aliases::I24, Address, U256};

/// A position's static parameters and liquidity as of one block.
///
/// Read-only and block-scoped: the core never mutates it, only applies
/// liquidity deltas locally while replaying events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionSnapshot {
    pub token0: Address,
    pub token1: Address,
    /// Pool fee tier in hundredths of a bip (e.g. 3000 = 0.3%).
    pub fee: u32,
    pub tick_lower: I24,
    pub tick_upper: I24,
    pub liquidity: u128,
}

/// Net fee income attributed to a position over a window, in raw token
/// units. Non-negative by construction; the fee calculator fails loudly
/// before ever producing a negative accumulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FeeAmounts {
    pub amount0: U256,
    pub amount1: U256,
}

impl FeeAmounts {
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn accumulate(&mut self, other: &FeeAmounts) {
        self.amount0 += other.amount0;
        self.amount1 += other.amount1;
    }

    pub fn is_zero(&self) -> bool {
        self.amount0.is_zero() && self.amount1.is_zero()
    }
}
