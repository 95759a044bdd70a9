//! Domain types shared across the engine, datasources, and orchestration.

pub mod decimal;
pub mod events;
pub mod levels;
pub mod position;
pub mod primitives;
pub mod record;
pub mod session;

pub use decimal::{Decimal, DecimalError, VALUE_SCALE};
pub use events::{
    merge_mutations, CollectEvent, DecreaseEvent, IncreaseEvent, LiquidityMutation, MutationKind,
    PositionEventLog,
};
pub use levels::{LevelTime, LiquidityLevels};
pub use position::{FeeAmounts, PositionSnapshot};
pub use primitives::{BlockNumber, PositionId, Window};
pub use record::{PositionRecord, RewardRecord, RunLedgerEntry};
pub use session::CompoundSession;
