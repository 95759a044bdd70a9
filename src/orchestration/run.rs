//! Run pipeline: fetch sessions, evaluate positions with checkpointed
//! resume, and allocate the reward pool.

use super::evaluator::PositionEvaluator;
use crate::checkpoint::CheckpointStore;
use crate::datasource::SessionSource;
use crate::domain::{CompoundSession, Decimal, PositionId, PositionRecord, RewardRecord, Window};
use crate::engine::rewards::{account_totals, allocate_rewards};
use crate::error::EngineError;
use crate::retry::{with_retry, RetryPolicy};
use alloy::primitives::U256;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Everything a completed run produces.
pub struct RunOutput {
    /// Per-position records, sorted by amount descending.
    pub positions: Vec<PositionRecord>,
    /// Sum of all position amounts.
    pub total: Decimal,
    pub rewards: Vec<RewardRecord>,
}

pub struct Pipeline {
    sessions: Arc<dyn SessionSource>,
    evaluator: PositionEvaluator,
    checkpoint: Arc<dyn CheckpointStore>,
    window: Window,
    total_reward: U256,
    retry: RetryPolicy,
}

impl Pipeline {
    pub fn new(
        sessions: Arc<dyn SessionSource>,
        evaluator: PositionEvaluator,
        checkpoint: Arc<dyn CheckpointStore>,
        window: Window,
        total_reward: U256,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            sessions,
            evaluator,
            checkpoint,
            window,
            total_reward,
            retry,
        }
    }

    pub async fn run(&self) -> Result<RunOutput, EngineError> {
        let sessions = with_retry(&self.retry, "session index", || {
            let source = Arc::clone(&self.sessions);
            let window = self.window;
            async move {
                Ok(source
                    .fetch_sessions(window.start_block, window.end_block)
                    .await?)
            }
        })
        .await?;

        let mut grouped: BTreeMap<PositionId, Vec<CompoundSession>> = BTreeMap::new();
        for session in sessions {
            grouped.entry(session.position_id).or_default().push(session);
        }
        info!(
            positions = grouped.len(),
            from = self.window.start_block,
            to = self.window.end_block,
            "sessions fetched"
        );

        let mut records = self.checkpoint.load()?;
        if !records.is_empty() {
            info!(done = records.len(), "resuming from checkpoint");
        }

        for (id, position_sessions) in grouped {
            if records.contains_key(&id) {
                debug!(position = %id, "already evaluated, skipping");
                continue;
            }
            let record = self.evaluator.evaluate(id, position_sessions).await?;
            records.insert(id, record);
            // Checkpoint after every position so an abort loses one.
            self.checkpoint.save(&records)?;
        }

        let mut positions: Vec<PositionRecord> = records.into_values().collect();
        positions.sort_by(|a, b| b.amount.cmp(&a.amount).then(a.id.cmp(&b.id)));

        let total = positions
            .iter()
            .fold(Decimal::zero(), |acc, p| acc + p.amount);
        let rewards = allocate_rewards(&account_totals(&positions), self.total_reward)?;
        info!(
            positions = positions.len(),
            accounts = rewards.len(),
            total = %total,
            "run complete"
        );

        Ok(RunOutput {
            positions,
            total,
            rewards,
        })
    }
}
