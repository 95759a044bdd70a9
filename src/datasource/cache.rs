//! Memoized lookup cache: single-flight-style cached accessors for block
//! timestamps, token metadata, and historical prices.
//!
//! Values are immutable for the duration of a run, so nothing is ever
//! invalidated. Concurrent duplicate fetches are acceptable; the first
//! writer wins. No retry happens here: errors propagate to the retry
//! controller wrapping the position evaluation.

use super::{ChainSource, DataSourceError, PriceSource};
use crate::domain::Decimal;
use alloy::primitives::Address;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Blocks per batched price request.
pub const PRICE_PAGE_SIZE: usize = 100;

pub struct LookupCache {
    chain: Arc<dyn ChainSource>,
    prices: Arc<dyn PriceSource>,
    /// Overrides for tokens missing from the price index.
    fixed_prices: HashMap<Address, Decimal>,
    timestamps: Mutex<HashMap<u64, u64>>,
    decimals: Mutex<HashMap<Address, u8>>,
    symbols: Mutex<HashMap<Address, String>>,
    price_cache: Mutex<HashMap<(Address, u64), Decimal>>,
    price_page_size: usize,
}

impl LookupCache {
    pub fn new(
        chain: Arc<dyn ChainSource>,
        prices: Arc<dyn PriceSource>,
        fixed_prices: HashMap<Address, Decimal>,
    ) -> Self {
        Self {
            chain,
            prices,
            fixed_prices,
            timestamps: Mutex::new(HashMap::new()),
            decimals: Mutex::new(HashMap::new()),
            symbols: Mutex::new(HashMap::new()),
            price_cache: Mutex::new(HashMap::new()),
            price_page_size: PRICE_PAGE_SIZE,
        }
    }

    pub async fn block_timestamp(&self, block: u64) -> Result<u64, DataSourceError> {
        if let Some(ts) = self.timestamps.lock().await.get(&block) {
            return Ok(*ts);
        }
        let fetched = self.chain.block_timestamp(block).await?;
        let mut cache = self.timestamps.lock().await;
        Ok(*cache.entry(block).or_insert(fetched))
    }

    pub async fn token_decimals(&self, token: Address) -> Result<u8, DataSourceError> {
        if let Some(d) = self.decimals.lock().await.get(&token) {
            return Ok(*d);
        }
        let fetched = self.chain.token_decimals(token).await?;
        let mut cache = self.decimals.lock().await;
        Ok(*cache.entry(token).or_insert(fetched))
    }

    pub async fn token_symbol(&self, token: Address) -> Result<String, DataSourceError> {
        if let Some(s) = self.symbols.lock().await.get(&token) {
            return Ok(s.clone());
        }
        let fetched = self.chain.token_symbol(token).await?;
        let mut cache = self.symbols.lock().await;
        Ok(cache.entry(token).or_insert(fetched).clone())
    }

    /// Price of `token` at each block, batching misses into fixed-size
    /// pages to bound external call volume.
    pub async fn prices_at(
        &self,
        token: Address,
        blocks: &[u64],
    ) -> Result<HashMap<u64, Decimal>, DataSourceError> {
        if let Some(fixed) = self.fixed_prices.get(&token) {
            return Ok(blocks.iter().map(|b| (*b, *fixed)).collect());
        }

        let missing: Vec<u64> = {
            let cache = self.price_cache.lock().await;
            blocks
                .iter()
                .copied()
                .filter(|b| !cache.contains_key(&(token, *b)))
                .collect()
        };

        for page in missing.chunks(self.price_page_size) {
            let fetched = self.prices.fetch_prices(token, page).await?;
            let mut cache = self.price_cache.lock().await;
            for (block, price) in fetched {
                cache.entry((token, block)).or_insert(price);
            }
        }

        let cache = self.price_cache.lock().await;
        Ok(blocks
            .iter()
            .map(|b| (*b, cache.get(&(token, *b)).copied().unwrap_or_default()))
            .collect())
    }

    pub async fn price_at(&self, token: Address, block: u64) -> Result<Decimal, DataSourceError> {
        let prices = self.prices_at(token, &[block]).await?;
        Ok(prices.get(&block).copied().unwrap_or_default())
    }
}
