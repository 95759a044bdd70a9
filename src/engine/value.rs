//! Value normalization: raw token fee amounts into one common value unit.

use crate::domain::{Decimal, FeeAmounts};
use crate::error::EngineError;
use alloy::primitives::{Address, U256};
use tracing::warn;

/// Token-side inputs for normalization.
#[derive(Debug, Clone, Copy)]
pub struct TokenValuation {
    pub token: Address,
    /// Unit price in the reference denomination at the reference block.
    pub price: Decimal,
    pub decimals: u8,
}

/// `price0 * amount0 / 10^decimals0 + price1 * amount1 / 10^decimals1`.
///
/// A zero price is tolerated (some very-low-liquidity tokens are absent
/// from the price index): that side contributes zero and a warning is
/// logged instead of failing the run.
pub fn normalized_value(
    fees: &FeeAmounts,
    token0: TokenValuation,
    token1: TokenValuation,
) -> Result<Decimal, EngineError> {
    Ok(side_value(fees.amount0, token0)? + side_value(fees.amount1, token1)?)
}

fn side_value(amount: U256, valuation: TokenValuation) -> Result<Decimal, EngineError> {
    if valuation.price.is_zero() {
        if !amount.is_zero() {
            warn!(token = %valuation.token, "price is zero, counting token value as zero");
        }
        return Ok(Decimal::zero());
    }
    let units = Decimal::from_raw_units(amount, valuation.decimals as u32)?;
    Ok(valuation.price * units)
}
