//! Output-side records: per-position checkpoint entries and per-account
//! reward allocations.

use super::{Decimal, PositionId};
use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};

/// Per-position partial result, persisted to the checkpoint store after
/// every successful evaluation.
///
/// `amount` is the normalized vested value contributed by the position
/// across all of its processed sessions. It is accumulated, never
/// recomputed, when more sessions of the same position are evaluated in
/// the same run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionRecord {
    pub id: PositionId,
    pub account: Address,
    pub symbol0: String,
    pub symbol1: String,
    /// Pool fee tier in hundredths of a bip.
    pub fee: u32,
    pub amount: Decimal,
}

/// Final allocation for one account, in the smallest denomination of the
/// reward token. Output only; every emitted reward is positive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewardRecord {
    pub account: Address,
    pub reward: U256,
}

/// One row of the CSV position ledger.
#[derive(Debug, Clone, Serialize)]
pub struct RunLedgerEntry {
    pub id: PositionId,
    pub symbol0: String,
    pub symbol1: String,
    pub fee: u32,
    pub account: Address,
    pub amount: Decimal,
    /// Informational share of the reward pool, in whole reward tokens.
    pub reward_share: Decimal,
}
