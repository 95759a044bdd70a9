//! Pure computation engine: deterministic, network-free reward math.

pub mod fees;
pub mod history;
pub mod rewards;
pub mod value;
pub mod vesting;

pub use fees::{
    direct_fees, growth_rate_fees, liquidity_intervals, LiquidityInterval, RateBracket,
};
pub use history::{build_levels, checkpoint_blocks, seconds_inside_delta, ClockSample};
pub use rewards::{account_totals, allocate_rewards};
pub use value::{normalized_value, TokenValuation};
pub use vesting::vesting_factor;
