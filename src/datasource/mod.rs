//! Data source abstraction: session index, chain state, and price lookups.

use crate::domain::{
    CompoundSession, Decimal, PositionEventLog, PositionId, PositionSnapshot,
};
use alloy::primitives::{aliases::I24, Address, U256};
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;

pub mod cache;
pub mod chain;
pub mod contracts;
pub mod mock;
pub mod subgraph;

pub use cache::LookupCache;
pub use chain::ChainClient;
pub use mock::{MockChain, MockPrices, MockSessions};
pub use subgraph::SubgraphClient;

/// Supplies compounding sessions for a block range.
///
/// Implementations must paginate, dedupe sessions by id across pages, and
/// drop sessions that ended entirely before the window start.
#[async_trait]
pub trait SessionSource: Send + Sync {
    async fn fetch_sessions(
        &self,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<CompoundSession>, DataSourceError>;
}

/// Historical token prices denominated in the reference unit (ETH).
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Price of `token` at each of `blocks`. A token missing from the
    /// price index yields a zero price, not an error.
    async fn fetch_prices(
        &self,
        token: Address,
        blocks: &[u64],
    ) -> Result<HashMap<u64, Decimal>, DataSourceError>;
}

/// Block-addressable chain state: point-in-time reads and event logs.
#[async_trait]
pub trait ChainSource: Send + Sync {
    /// Position state as of `block`.
    async fn position_at(
        &self,
        id: PositionId,
        block: u64,
    ) -> Result<PositionSnapshot, DataSourceError>;

    /// Pool address for a token pair and fee tier, resolved at `block`.
    async fn pool_for(
        &self,
        token0: Address,
        token1: Address,
        fee: u32,
        block: u64,
    ) -> Result<Address, DataSourceError>;

    /// Cumulative seconds-inside-range oracle reading at `block`.
    ///
    /// Returns None when the probe reverts at that block (pool or
    /// observation not available yet); callers skip the interval.
    async fn seconds_inside(
        &self,
        pool: Address,
        tick_lower: I24,
        tick_upper: I24,
        block: u64,
    ) -> Result<Option<u32>, DataSourceError>;

    /// Timestamp of `block` in seconds.
    async fn block_timestamp(&self, block: u64) -> Result<u64, DataSourceError>;

    /// Non-mutating collect-all probe: total fees collectible by the
    /// position as of `block`.
    async fn collectable_fees(
        &self,
        id: PositionId,
        block: u64,
    ) -> Result<(U256, U256), DataSourceError>;

    /// Increase/decrease/collect logs for a position within `[from, to]`.
    async fn liquidity_events(
        &self,
        id: PositionId,
        from_block: u64,
        to_block: u64,
    ) -> Result<PositionEventLog, DataSourceError>;

    /// Token decimals (block-invariant).
    async fn token_decimals(&self, token: Address) -> Result<u8, DataSourceError>;

    /// Token symbol (block-invariant).
    async fn token_symbol(&self, token: Address) -> Result<String, DataSourceError>;
}

/// Error type for data source operations.
#[derive(Debug, Clone)]
pub enum DataSourceError {
    /// Network error (connection timeout, DNS failure, dropped RPC).
    NetworkError(String),
    /// HTTP error (429 rate limit, 5xx server error, 4xx client error).
    HttpError { status: u16, message: String },
    /// Parsing error (invalid JSON or malformed response).
    ParseError(String),
    /// Rate limit exceeded.
    RateLimited,
    /// Other error (e.g. GraphQL indexer errors).
    Other(String),
}

impl DataSourceError {
    /// Whether a retry has a chance of succeeding.
    ///
    /// Parse errors and HTTP client errors are deterministic and never
    /// retried; everything else is assumed to be a temporary fault of the
    /// external service.
    pub fn is_transient(&self) -> bool {
        match self {
            DataSourceError::NetworkError(_) => true,
            DataSourceError::RateLimited => true,
            DataSourceError::HttpError { status, .. } => *status >= 500,
            DataSourceError::ParseError(_) => false,
            DataSourceError::Other(_) => true,
        }
    }
}

impl fmt::Display for DataSourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSourceError::NetworkError(msg) => write!(f, "Network error: {}", msg),
            DataSourceError::HttpError { status, message } => {
                write!(f, "HTTP error {}: {}", status, message)
            }
            DataSourceError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            DataSourceError::RateLimited => write!(f, "Rate limited"),
            DataSourceError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for DataSourceError {}
