//! Chain state client: point-in-time reads, static-call probes, and
//! typed event log queries over a JSON-RPC provider.

use super::contracts::{
    IErc20Metadata, INonfungiblePositionManager, IUniswapV3Factory, IUniswapV3Pool,
};
use super::{ChainSource, DataSourceError};
use crate::domain::{
    CollectEvent, DecreaseEvent, IncreaseEvent, PositionEventLog, PositionId, PositionSnapshot,
};
use alloy::eips::BlockId;
use alloy::primitives::{aliases::I24, aliases::U24, Address, U256};
use alloy::providers::{DynProvider, Provider};
use async_trait::async_trait;
use tracing::debug;

/// Reads position/pool state and logs via an archive-capable RPC node.
#[derive(Debug, Clone)]
pub struct ChainClient {
    provider: DynProvider,
    position_manager: Address,
    factory: Address,
    /// Caller of the non-mutating collect probe; the compounder holds the
    /// operator approval that makes the probe succeed.
    compounder: Address,
}

impl ChainClient {
    pub fn new(
        provider: DynProvider,
        position_manager: Address,
        factory: Address,
        compounder: Address,
    ) -> Self {
        Self {
            provider,
            position_manager,
            factory,
            compounder,
        }
    }
}

fn rpc_error(err: impl std::fmt::Display) -> DataSourceError {
    DataSourceError::NetworkError(err.to_string())
}

/// Execution reverts arrive as JSON-RPC error responses, distinct from
/// transport failures.
fn is_revert(err: &alloy::contract::Error) -> bool {
    matches!(err, alloy::contract::Error::TransportError(e) if e.as_error_resp().is_some())
}

#[async_trait]
impl ChainSource for ChainClient {
    async fn position_at(
        &self,
        id: PositionId,
        block: u64,
    ) -> Result<PositionSnapshot, DataSourceError> {
        debug!(position = %id, block, "reading position state");
        let manager = INonfungiblePositionManager::new(self.position_manager, self.provider.clone());
        let state = manager
            .positions(U256::from(id.as_u64()))
            .block(BlockId::number(block))
            .call()
            .await
            .map_err(rpc_error)?;

        Ok(PositionSnapshot {
            token0: state.token0,
            token1: state.token1,
            fee: state.fee.to::<u32>(),
            tick_lower: state.tickLower,
            tick_upper: state.tickUpper,
            liquidity: state.liquidity,
        })
    }

    async fn pool_for(
        &self,
        token0: Address,
        token1: Address,
        fee: u32,
        block: u64,
    ) -> Result<Address, DataSourceError> {
        let factory = IUniswapV3Factory::new(self.factory, self.provider.clone());
        factory
            .getPool(token0, token1, U24::from(fee))
            .block(BlockId::number(block))
            .call()
            .await
            .map_err(rpc_error)
    }

    async fn seconds_inside(
        &self,
        pool: Address,
        tick_lower: I24,
        tick_upper: I24,
        block: u64,
    ) -> Result<Option<u32>, DataSourceError> {
        let pool = IUniswapV3Pool::new(pool, self.provider.clone());
        match pool
            .snapshotCumulativesInside(tick_lower, tick_upper)
            .block(BlockId::number(block))
            .call()
            .await
        {
            Ok(snapshot) => Ok(Some(snapshot.secondsInside)),
            // The probe reverts before the pool has an observation for
            // this range; the caller skips the interval.
            Err(err) if is_revert(&err) => {
                debug!(block, "seconds-inside probe reverted");
                Ok(None)
            }
            Err(err) => Err(rpc_error(err)),
        }
    }

    async fn block_timestamp(&self, block: u64) -> Result<u64, DataSourceError> {
        let header = self
            .provider
            .get_block_by_number(block.into())
            .await
            .map_err(rpc_error)?
            .ok_or_else(|| {
                DataSourceError::Other(format!("block {} not found on this node", block))
            })?;
        Ok(header.header.timestamp)
    }

    async fn collectable_fees(
        &self,
        id: PositionId,
        block: u64,
    ) -> Result<(U256, U256), DataSourceError> {
        let manager = INonfungiblePositionManager::new(self.position_manager, self.provider.clone());
        let params = INonfungiblePositionManager::CollectParams {
            tokenId: U256::from(id.as_u64()),
            recipient: self.position_manager,
            amount0Max: u128::MAX,
            amount1Max: u128::MAX,
        };
        let probe = manager
            .collect(params)
            .from(self.compounder)
            .block(BlockId::number(block))
            .call()
            .await
            .map_err(rpc_error)?;
        Ok((probe.amount0, probe.amount1))
    }

    async fn liquidity_events(
        &self,
        id: PositionId,
        from_block: u64,
        to_block: u64,
    ) -> Result<PositionEventLog, DataSourceError> {
        debug!(position = %id, from_block, to_block, "querying liquidity event logs");
        let manager = INonfungiblePositionManager::new(self.position_manager, self.provider.clone());
        let token_topic = U256::from(id.as_u64());

        let increase_filter = manager
            .IncreaseLiquidity_filter()
            .topic1(token_topic)
            .from_block(from_block)
            .to_block(to_block);
        let decrease_filter = manager
            .DecreaseLiquidity_filter()
            .topic1(token_topic)
            .from_block(from_block)
            .to_block(to_block);
        let collect_filter = manager
            .Collect_filter()
            .topic1(token_topic)
            .from_block(from_block)
            .to_block(to_block);

        let (increases, decreases, collects) = futures::try_join!(
            increase_filter.query(),
            decrease_filter.query(),
            collect_filter.query()
        )
        .map_err(rpc_error)?;

        let mut log = PositionEventLog::default();
        for (event, raw) in increases {
            log.increases.push(IncreaseEvent {
                block: raw.block_number.ok_or_else(|| {
                    DataSourceError::ParseError("log without block number".to_string())
                })?,
                liquidity: event.liquidity,
                amount0: event.amount0,
                amount1: event.amount1,
            });
        }
        for (event, raw) in decreases {
            log.decreases.push(DecreaseEvent {
                block: raw.block_number.ok_or_else(|| {
                    DataSourceError::ParseError("log without block number".to_string())
                })?,
                liquidity: event.liquidity,
                amount0: event.amount0,
                amount1: event.amount1,
            });
        }
        for (event, raw) in collects {
            log.collects.push(CollectEvent {
                block: raw.block_number.ok_or_else(|| {
                    DataSourceError::ParseError("log without block number".to_string())
                })?,
                amount0: event.amount0,
                amount1: event.amount1,
            });
        }

        Ok(log)
    }

    async fn token_decimals(&self, token: Address) -> Result<u8, DataSourceError> {
        let erc20 = IErc20Metadata::new(token, self.provider.clone());
        erc20.decimals().call().await.map_err(rpc_error)
    }

    async fn token_symbol(&self, token: Address) -> Result<String, DataSourceError> {
        let erc20 = IErc20Metadata::new(token, self.provider.clone());
        erc20.symbol().call().await.map_err(rpc_error)
    }
}
