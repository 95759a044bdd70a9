//! Per-position evaluation: replay every compounding session of one
//! position into a single vested value contribution.

use crate::config::FeeStrategy;
use crate::datasource::{ChainSource, LookupCache};
use crate::domain::{
    merge_mutations, CollectEvent, CompoundSession, Decimal, FeeAmounts, LiquidityLevels,
    PositionId, PositionRecord, PositionSnapshot, Window,
};
use crate::engine::fees::{
    direct_fees, growth_rate_fees, liquidity_intervals, RateBracket,
};
use crate::engine::history::{build_levels, checkpoint_blocks, ClockSample};
use crate::engine::value::{normalized_value, TokenValuation};
use crate::engine::vesting::vesting_factor;
use crate::error::EngineError;
use crate::retry::{with_retry, RetryPolicy};
use alloy::primitives::{aliases::I24, Address};
use std::sync::Arc;
use tracing::{debug, info};

/// Allow/deny lists applied before any chain replay work is done.
#[derive(Debug, Clone, Default)]
pub struct PositionFilters {
    pub include_tokens: Vec<Address>,
    pub include_token_pairs: Vec<(Address, Address)>,
    pub exclude_tokens: Vec<Address>,
    pub exclude_accounts: Vec<Address>,
}

impl PositionFilters {
    /// Why this position is excluded, if it is. Deny lists win over allow
    /// lists; empty allow lists admit everything.
    pub fn exclusion_reason(
        &self,
        snapshot: &PositionSnapshot,
        account: Address,
    ) -> Option<&'static str> {
        if self.exclude_tokens.contains(&snapshot.token0)
            || self.exclude_tokens.contains(&snapshot.token1)
        {
            return Some("token on the exclude list");
        }
        if !self.include_token_pairs.is_empty()
            && !self.include_token_pairs.iter().any(|&(a, b)| {
                (a == snapshot.token0 && b == snapshot.token1)
                    || (a == snapshot.token1 && b == snapshot.token0)
            })
        {
            return Some("pair not on the include list");
        }
        if !self.include_tokens.is_empty()
            && !self.include_tokens.contains(&snapshot.token0)
            && !self.include_tokens.contains(&snapshot.token1)
        {
            return Some("token not on the include list");
        }
        if self.exclude_accounts.contains(&account) {
            return Some("account on the exclude list");
        }
        None
    }
}

/// Evaluates one position across all of its sessions within a window.
pub struct PositionEvaluator {
    chain: Arc<dyn ChainSource>,
    cache: Arc<LookupCache>,
    window: Window,
    vesting_period: u64,
    fee_strategy: FeeStrategy,
    filters: PositionFilters,
    retry: RetryPolicy,
}

impl PositionEvaluator {
    pub fn new(
        chain: Arc<dyn ChainSource>,
        cache: Arc<LookupCache>,
        window: Window,
        vesting_period: u64,
        fee_strategy: FeeStrategy,
        filters: PositionFilters,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            chain,
            cache,
            window,
            vesting_period,
            fee_strategy,
            filters,
            retry,
        }
    }

    /// Evaluate a position given its sessions.
    ///
    /// A filtered-out position still yields a record, with a zero amount,
    /// so the checkpoint marks it as processed.
    pub async fn evaluate(
        &self,
        id: PositionId,
        mut sessions: Vec<CompoundSession>,
    ) -> Result<PositionRecord, EngineError> {
        sessions.sort_by_key(|s| s.start_block);
        // The compounder re-assigns ownership on re-enrollment, so the
        // account of record is the one that enrolled last.
        let account = sessions
            .last()
            .map(|s| s.account)
            .ok_or_else(|| EngineError::DataIntegrity(format!("position {} has no sessions", id)))?;

        let ranges: Vec<(u64, u64)> = sessions
            .iter()
            .filter_map(|s| s.clamp(&self.window))
            .collect();
        let first_from = ranges
            .first()
            .map(|&(from, _)| from)
            .unwrap_or(self.window.end_block);

        let snapshot = with_retry(&self.retry, "position state", || {
            let chain = Arc::clone(&self.chain);
            async move { Ok(chain.position_at(id, first_from).await?) }
        })
        .await?;

        let (token0, token1) = (snapshot.token0, snapshot.token1);
        let (symbol0, symbol1) = with_retry(&self.retry, "token symbols", || {
            let cache = Arc::clone(&self.cache);
            async move {
                Ok((
                    cache.token_symbol(token0).await?,
                    cache.token_symbol(token1).await?,
                ))
            }
        })
        .await?;

        let record = |amount: Decimal| PositionRecord {
            id,
            account,
            symbol0: symbol0.clone(),
            symbol1: symbol1.clone(),
            fee: snapshot.fee,
            amount,
        };

        if let Some(reason) = self.filters.exclusion_reason(&snapshot, account) {
            info!(position = %id, reason, "position filtered out");
            return Ok(record(Decimal::zero()));
        }
        if ranges.is_empty() {
            debug!(position = %id, "no session overlaps the window");
            return Ok(record(Decimal::zero()));
        }

        let fee = snapshot.fee;
        let pool = with_retry(&self.retry, "pool lookup", || {
            let chain = Arc::clone(&self.chain);
            async move { Ok(chain.pool_for(token0, token1, fee, first_from).await?) }
        })
        .await?;

        let (tick_lower, tick_upper) = (snapshot.tick_lower, snapshot.tick_upper);
        let mut levels = LiquidityLevels::new();
        let mut fees = FeeAmounts::zero();
        for &(from, to) in &ranges {
            let known_liquidity = (from == first_from).then_some(snapshot.liquidity);
            let (session_levels, session_fees) = with_retry(&self.retry, "session replay", || {
                self.replay_session(id, pool, tick_lower, tick_upper, from, to, known_liquidity)
            })
            .await?;
            levels.merge(&session_levels);
            fees.accumulate(&session_fees);
        }

        let factor = vesting_factor(&levels, self.vesting_period);
        let value = self.value_at_window_end(&snapshot, &fees).await?;
        let amount = value * factor;
        info!(
            position = %id,
            %account,
            value = %value,
            factor = %factor,
            amount = %amount,
            "position evaluated"
        );

        Ok(record(amount))
    }

    /// Replay one clamped session: reconstruct the liquidity history,
    /// sample the range-membership oracle at its checkpoints, and measure
    /// the fees generated.
    async fn replay_session(
        &self,
        id: PositionId,
        pool: Address,
        tick_lower: I24,
        tick_upper: I24,
        from: u64,
        to: u64,
        known_liquidity: Option<u128>,
    ) -> Result<(LiquidityLevels, FeeAmounts), EngineError> {
        let start_liquidity = match known_liquidity {
            Some(liquidity) => liquidity,
            None => self.chain.position_at(id, from).await?.liquidity,
        };

        // State at `from` already reflects mutations in that block.
        let events = self.chain.liquidity_events(id, from + 1, to).await?;
        let mutations = merge_mutations(&events.increases, &events.decreases);
        let blocks = checkpoint_blocks(start_liquidity, &mutations, from, to)?;

        let mut samples = Vec::with_capacity(blocks.len());
        for block in blocks {
            let seconds_inside = self
                .chain
                .seconds_inside(pool, tick_lower, tick_upper, block)
                .await?;
            let timestamp = self.cache.block_timestamp(block).await?;
            samples.push(ClockSample {
                seconds_inside,
                timestamp,
            });
        }
        let levels = build_levels(start_liquidity, &mutations, &samples)?;

        let fees = match self.fee_strategy {
            FeeStrategy::Direct => {
                let probe_start = self.chain.collectable_fees(id, from).await?;
                let probe_end = self.chain.collectable_fees(id, to).await?;
                direct_fees(probe_start, probe_end, &events.collects, &events.decreases)?
            }
            FeeStrategy::GrowthRate => {
                let bracket = self.find_rate_bracket(id, from, to, &events.collects).await?;
                let intervals = liquidity_intervals(start_liquidity, &mutations, from, to)?;
                growth_rate_fees(&bracket, &intervals)?
            }
        };

        Ok((levels, fees))
    }

    /// Find a usable fee-growth bracket, widening the log search backwards
    /// by doubling until one is found or history is exhausted.
    async fn find_rate_bracket(
        &self,
        id: PositionId,
        from: u64,
        to: u64,
        window_collects: &[CollectEvent],
    ) -> Result<RateBracket, EngineError> {
        if let Ok(bracket) = RateBracket::from_collects(window_collects) {
            return Ok(bracket);
        }

        let mut width = (to - from).max(1);
        let mut search_from = from;
        loop {
            search_from = search_from.saturating_sub(width);
            width = width.saturating_mul(2);
            debug!(position = %id, search_from, to, "widening fee-growth bracket search");
            let events = self.chain.liquidity_events(id, search_from, to).await?;
            match RateBracket::from_collects(&events.collects) {
                Ok(bracket) => return Ok(bracket),
                Err(err) if search_from == 0 => return Err(err),
                Err(_) => {}
            }
        }
    }

    /// Normalize accumulated fees with prices and decimals at the window
    /// end block.
    async fn value_at_window_end(
        &self,
        snapshot: &PositionSnapshot,
        fees: &FeeAmounts,
    ) -> Result<Decimal, EngineError> {
        let block = self.window.end_block;
        let (token0, token1) = (snapshot.token0, snapshot.token1);
        let (valuation0, valuation1) = with_retry(&self.retry, "token valuation", || {
            let cache = Arc::clone(&self.cache);
            async move {
                let valuation0 = TokenValuation {
                    token: token0,
                    price: cache.price_at(token0, block).await?,
                    decimals: cache.token_decimals(token0).await?,
                };
                let valuation1 = TokenValuation {
                    token: token1,
                    price: cache.price_at(token1, block).await?,
                    decimals: cache.token_decimals(token1).await?,
                };
                Ok((valuation0, valuation1))
            }
        })
        .await?;
        normalized_value(fees, valuation0, valuation1)
    }
}
