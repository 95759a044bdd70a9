//! Compounding sessions: enrollment intervals of a position in the
//! auto-compounding service.

use super::primitives::{BlockNumber, Window};
use super::PositionId;
use alloy::primitives::Address;

/// One continuous period during which a position was enrolled.
///
/// Supplied externally and immutable once fetched. A position can have
/// several sessions (re-enrollment).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompoundSession {
    /// Session id as reported by the index (used for cross-page dedup).
    pub id: String,
    pub position_id: PositionId,
    pub account: Address,
    pub start_block: BlockNumber,
    /// None while the session is still open.
    pub end_block: Option<BlockNumber>,
}

impl CompoundSession {
    /// Clamp the session to the processing window.
    ///
    /// The upper bound stops one block before un-enrollment, because the
    /// position owner changes at the removal block. Returns None when the
    /// clamped range is empty.
    pub fn clamp(&self, window: &Window) -> Option<(BlockNumber, BlockNumber)> {
        let from = self.start_block.max(window.start_block);
        let raw_end = self.end_block.unwrap_or(window.end_block + 1);
        let to = if raw_end > window.end_block {
            window.end_block
        } else {
            raw_end - 1
        };
        if to < from {
            return None;
        }
        Some((from, to))
    }
}
