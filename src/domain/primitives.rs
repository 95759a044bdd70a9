//! Domain primitives: position identifiers, block windows.

use serde::{Deserialize, Serialize};

/// Block number on the underlying chain.
pub type BlockNumber = u64;

/// Identifier of a concentrated-liquidity position (the NFT token id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PositionId(pub u64);

impl PositionId {
    pub fn new(id: u64) -> Self {
        PositionId(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for PositionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Closed historical block range a run processes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start_block: BlockNumber,
    pub end_block: BlockNumber,
}

impl Window {
    pub fn new(start_block: BlockNumber, end_block: BlockNumber) -> Self {
        Window {
            start_block,
            end_block,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_id_display() {
        assert_eq!(PositionId::new(123456).to_string(), "123456");
    }

    #[test]
    fn position_id_as_json_map_key() {
        // Checkpoint files key records by position id; serde_json renders
        // integer keys as strings.
        let mut map = std::collections::HashMap::new();
        map.insert(PositionId::new(7), "x");
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"7":"x"}"#);
    }
}
