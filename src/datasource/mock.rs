//! Builder-style in-memory data sources for tests.

use super::{ChainSource, DataSourceError, PriceSource, SessionSource};
use crate::domain::{
    CompoundSession, Decimal, PositionEventLog, PositionId, PositionSnapshot,
};
use alloy::primitives::{aliases::I24, Address, U256};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// In-memory chain state keyed by block.
#[derive(Default)]
pub struct MockChain {
    positions: HashMap<(u64, u64), PositionSnapshot>,
    pools: HashMap<(Address, Address, u32), Address>,
    /// Oracle readings keyed by block; a missing block reads as a revert.
    seconds_inside: HashMap<u64, u32>,
    timestamps: HashMap<u64, u64>,
    collectable: HashMap<(u64, u64), (U256, U256)>,
    events: HashMap<u64, PositionEventLog>,
    decimals: HashMap<Address, u8>,
    symbols: HashMap<Address, String>,
    transient_failures: AtomicUsize,
    timestamp_call_count: AtomicUsize,
}

impl MockChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_position(mut self, id: PositionId, block: u64, snapshot: PositionSnapshot) -> Self {
        self.positions.insert((id.as_u64(), block), snapshot);
        self
    }

    pub fn with_pool(mut self, token0: Address, token1: Address, fee: u32, pool: Address) -> Self {
        self.pools.insert((token0, token1, fee), pool);
        self
    }

    pub fn with_seconds_inside(mut self, block: u64, seconds: u32) -> Self {
        self.seconds_inside.insert(block, seconds);
        self
    }

    pub fn with_timestamp(mut self, block: u64, timestamp: u64) -> Self {
        self.timestamps.insert(block, timestamp);
        self
    }

    pub fn with_collectable(
        mut self,
        id: PositionId,
        block: u64,
        amount0: U256,
        amount1: U256,
    ) -> Self {
        self.collectable
            .insert((id.as_u64(), block), (amount0, amount1));
        self
    }

    pub fn with_events(mut self, id: PositionId, log: PositionEventLog) -> Self {
        self.events.insert(id.as_u64(), log);
        self
    }

    pub fn with_token(mut self, token: Address, decimals: u8, symbol: &str) -> Self {
        self.decimals.insert(token, decimals);
        self.symbols.insert(token, symbol.to_string());
        self
    }

    /// The next `count` chain calls fail with a transient network error.
    pub fn with_transient_failures(self, count: usize) -> Self {
        self.transient_failures.store(count, Ordering::SeqCst);
        self
    }

    pub fn timestamp_calls(&self) -> usize {
        self.timestamp_call_count.load(Ordering::SeqCst)
    }

    fn check_failure(&self) -> Result<(), DataSourceError> {
        let remaining = self.transient_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.transient_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(DataSourceError::NetworkError(
                "injected failure".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl ChainSource for MockChain {
    async fn position_at(
        &self,
        id: PositionId,
        block: u64,
    ) -> Result<PositionSnapshot, DataSourceError> {
        self.check_failure()?;
        self.positions
            .get(&(id.as_u64(), block))
            .cloned()
            .ok_or_else(|| {
                DataSourceError::Other(format!("no position {} at block {}", id, block))
            })
    }

    async fn pool_for(
        &self,
        token0: Address,
        token1: Address,
        fee: u32,
        _block: u64,
    ) -> Result<Address, DataSourceError> {
        self.check_failure()?;
        self.pools
            .get(&(token0, token1, fee))
            .copied()
            .ok_or_else(|| DataSourceError::Other("no pool configured".to_string()))
    }

    async fn seconds_inside(
        &self,
        _pool: Address,
        _tick_lower: I24,
        _tick_upper: I24,
        block: u64,
    ) -> Result<Option<u32>, DataSourceError> {
        self.check_failure()?;
        Ok(self.seconds_inside.get(&block).copied())
    }

    async fn block_timestamp(&self, block: u64) -> Result<u64, DataSourceError> {
        self.check_failure()?;
        self.timestamp_call_count.fetch_add(1, Ordering::SeqCst);
        // Unconfigured blocks read as one second per block.
        Ok(self.timestamps.get(&block).copied().unwrap_or(block))
    }

    async fn collectable_fees(
        &self,
        id: PositionId,
        block: u64,
    ) -> Result<(U256, U256), DataSourceError> {
        self.check_failure()?;
        Ok(self
            .collectable
            .get(&(id.as_u64(), block))
            .copied()
            .unwrap_or((U256::ZERO, U256::ZERO)))
    }

    async fn liquidity_events(
        &self,
        id: PositionId,
        from_block: u64,
        to_block: u64,
    ) -> Result<PositionEventLog, DataSourceError> {
        self.check_failure()?;
        let mut log = self.events.get(&id.as_u64()).cloned().unwrap_or_default();
        log.increases
            .retain(|e| e.block >= from_block && e.block <= to_block);
        log.decreases
            .retain(|e| e.block >= from_block && e.block <= to_block);
        log.collects
            .retain(|e| e.block >= from_block && e.block <= to_block);
        Ok(log)
    }

    async fn token_decimals(&self, token: Address) -> Result<u8, DataSourceError> {
        self.check_failure()?;
        Ok(self.decimals.get(&token).copied().unwrap_or(18))
    }

    async fn token_symbol(&self, token: Address) -> Result<String, DataSourceError> {
        self.check_failure()?;
        Ok(self
            .symbols
            .get(&token)
            .cloned()
            .unwrap_or_else(|| "TKN".to_string()))
    }
}

/// Fixed session list, optionally failing the first calls.
#[derive(Default)]
pub struct MockSessions {
    sessions: Vec<CompoundSession>,
    transient_failures: AtomicUsize,
    fetch_call_count: AtomicUsize,
}

impl MockSessions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(mut self, session: CompoundSession) -> Self {
        self.sessions.push(session);
        self
    }

    pub fn with_transient_failures(self, count: usize) -> Self {
        self.transient_failures.store(count, Ordering::SeqCst);
        self
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_call_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionSource for MockSessions {
    async fn fetch_sessions(
        &self,
        from_block: u64,
        _to_block: u64,
    ) -> Result<Vec<CompoundSession>, DataSourceError> {
        self.fetch_call_count.fetch_add(1, Ordering::SeqCst);
        let remaining = self.transient_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.transient_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(DataSourceError::NetworkError(
                "injected failure".to_string(),
            ));
        }
        Ok(self
            .sessions
            .iter()
            .filter(|s| s.end_block.map_or(true, |end| end > from_block))
            .cloned()
            .collect())
    }
}

/// Fixed price table; unknown (token, block) pairs price at zero.
#[derive(Default)]
pub struct MockPrices {
    prices: HashMap<(Address, u64), Decimal>,
    fetch_call_count: AtomicUsize,
}

impl MockPrices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_price(mut self, token: Address, block: u64, price: Decimal) -> Self {
        self.prices.insert((token, block), price);
        self
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_call_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PriceSource for MockPrices {
    async fn fetch_prices(
        &self,
        token: Address,
        blocks: &[u64],
    ) -> Result<HashMap<u64, Decimal>, DataSourceError> {
        self.fetch_call_count.fetch_add(1, Ordering::SeqCst);
        Ok(blocks
            .iter()
            .map(|b| {
                (
                    *b,
                    self.prices
                        .get(&(token, *b))
                        .copied()
                        .unwrap_or_else(Decimal::zero),
                )
            })
            .collect())
    }
}
