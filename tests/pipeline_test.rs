//! End-to-end pipeline tests over the in-memory data sources.

use alloy::primitives::{aliases::I24, Address, U256};
use compound_rewards::checkpoint::{CheckpointStore, FileCheckpointStore, MemoryCheckpointStore};
use compound_rewards::config::FeeStrategy;
use compound_rewards::datasource::{LookupCache, MockChain, MockPrices, MockSessions};
use compound_rewards::domain::{CompoundSession, Decimal, PositionId, PositionSnapshot, Window};
use compound_rewards::orchestration::{Pipeline, PositionEvaluator, PositionFilters, RunOutput};
use compound_rewards::output::{write_ledger_file, write_rewards_file};
use compound_rewards::retry::RetryPolicy;
use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;
use std::sync::Arc;

const TOKEN0: Address = Address::with_last_byte(0xa0);
const TOKEN1: Address = Address::with_last_byte(0xb0);
const POOL: Address = Address::with_last_byte(0xcc);
const ACCOUNT_A: Address = Address::with_last_byte(0x01);
const ACCOUNT_B: Address = Address::with_last_byte(0x02);

fn snapshot() -> PositionSnapshot {
    PositionSnapshot {
        token0: TOKEN0,
        token1: TOKEN1,
        fee: 3000,
        tick_lower: I24::unchecked_from(-600),
        tick_upper: I24::unchecked_from(600),
        liquidity: 1000,
    }
}

fn session(position: u64, account: Address) -> CompoundSession {
    CompoundSession {
        id: format!("session-{}", position),
        position_id: PositionId::new(position),
        account,
        start_block: 100,
        end_block: None,
    }
}

/// Two fully vested positions: one earns 1.0 token0, the other 3.0.
fn two_position_chain() -> MockChain {
    let one = PositionId::new(1);
    let two = PositionId::new(2);
    MockChain::new()
        .with_position(one, 100, snapshot())
        .with_position(two, 100, snapshot())
        .with_pool(TOKEN0, TOKEN1, 3000, POOL)
        .with_seconds_inside(100, 0)
        .with_seconds_inside(200, 700)
        .with_timestamp(100, 1_000)
        .with_timestamp(200, 2_000)
        .with_collectable(one, 200, U256::from(1_000_000u64), U256::ZERO)
        .with_collectable(two, 200, U256::from(3_000_000u64), U256::ZERO)
        .with_token(TOKEN0, 6, "USDC")
        .with_token(TOKEN1, 18, "WETH")
}

fn sessions() -> MockSessions {
    MockSessions::new()
        .with_session(session(1, ACCOUNT_A))
        .with_session(session(2, ACCOUNT_B))
}

fn pipeline(
    chain: Arc<MockChain>,
    sessions: Arc<MockSessions>,
    checkpoint: Arc<dyn CheckpointStore>,
    retry: RetryPolicy,
) -> Pipeline {
    let prices = Arc::new(
        MockPrices::new()
            .with_price(TOKEN0, 200, Decimal::from_str("1").unwrap())
            .with_price(TOKEN1, 200, Decimal::from_str("2").unwrap()),
    );
    let cache = Arc::new(LookupCache::new(chain.clone(), prices, HashMap::new()));
    let window = Window::new(100, 200);
    let evaluator = PositionEvaluator::new(
        chain,
        cache,
        window,
        600,
        FeeStrategy::Direct,
        PositionFilters::default(),
        retry,
    );
    Pipeline::new(sessions, evaluator, checkpoint, window, U256::from(1000u64), retry)
}

fn assert_canonical_output(output: &RunOutput) {
    assert_eq!(output.positions.len(), 2);
    // Sorted by amount descending.
    assert_eq!(output.positions[0].id, PositionId::new(2));
    assert_eq!(output.positions[0].amount, Decimal::from_str("3").unwrap());
    assert_eq!(output.positions[1].amount, Decimal::from_str("1").unwrap());
    assert_eq!(output.total, Decimal::from_str("4").unwrap());

    let rewards: BTreeMap<Address, U256> = output
        .rewards
        .iter()
        .map(|r| (r.account, r.reward))
        .collect();
    assert_eq!(rewards[&ACCOUNT_A], U256::from(250u64));
    assert_eq!(rewards[&ACCOUNT_B], U256::from(750u64));
}

#[tokio::test]
async fn full_run_allocates_proportionally() {
    let pipeline = pipeline(
        Arc::new(two_position_chain()),
        Arc::new(sessions()),
        Arc::new(MemoryCheckpointStore::new()),
        RetryPolicy::immediate(2),
    );
    let output = pipeline.run().await.unwrap();
    assert_canonical_output(&output);
}

#[tokio::test]
async fn checkpoint_makes_reruns_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("checkpoint.json");

    let first = pipeline(
        Arc::new(two_position_chain()),
        Arc::new(sessions()),
        Arc::new(FileCheckpointStore::new(path.clone())),
        RetryPolicy::immediate(2),
    );
    let output = first.run().await.unwrap();
    assert_canonical_output(&output);

    // Every chain call on the rerun would fail, so the second run can
    // only succeed by serving records from the checkpoint.
    let broken_chain = Arc::new(two_position_chain().with_transient_failures(1000));
    let second = pipeline(
        broken_chain,
        Arc::new(sessions()),
        Arc::new(FileCheckpointStore::new(path)),
        RetryPolicy::immediate(0),
    );
    let output = second.run().await.unwrap();
    assert_canonical_output(&output);
}

#[tokio::test]
async fn transient_session_fetch_failures_are_retried() {
    let sessions = Arc::new(sessions().with_transient_failures(2));
    let pipeline = pipeline(
        Arc::new(two_position_chain()),
        sessions.clone(),
        Arc::new(MemoryCheckpointStore::new()),
        RetryPolicy::immediate(3),
    );
    let output = pipeline.run().await.unwrap();
    assert_canonical_output(&output);
    assert_eq!(sessions.fetch_calls(), 3);
}

#[tokio::test]
async fn exhausted_retries_fail_the_run() {
    let sessions = Arc::new(sessions().with_transient_failures(5));
    let pipeline = pipeline(
        Arc::new(two_position_chain()),
        sessions,
        Arc::new(MemoryCheckpointStore::new()),
        RetryPolicy::immediate(1),
    );
    assert!(pipeline.run().await.is_err());
}

#[tokio::test]
async fn output_files_reflect_the_run() {
    let pipeline = pipeline(
        Arc::new(two_position_chain()),
        Arc::new(sessions()),
        Arc::new(MemoryCheckpointStore::new()),
        RetryPolicy::immediate(2),
    );
    let output = pipeline.run().await.unwrap();

    let dir = tempfile::tempdir().unwrap();
    let ledger_path = dir.path().join("positions.csv");
    let rewards_path = dir.path().join("rewards.json");
    write_ledger_file(&ledger_path, &output, U256::from(1000u64)).unwrap();
    write_rewards_file(&rewards_path, &output.rewards).unwrap();

    let ledger = std::fs::read_to_string(&ledger_path).unwrap();
    let mut lines = ledger.lines();
    assert_eq!(
        lines.next().unwrap(),
        "id,symbol0,symbol1,fee,account,amount,reward_share"
    );
    assert_eq!(lines.count(), 2);

    let rewards: BTreeMap<String, String> =
        serde_json::from_str(&std::fs::read_to_string(&rewards_path).unwrap()).unwrap();
    let sum: u64 = rewards.values().map(|v| v.parse::<u64>().unwrap()).sum();
    assert_eq!(sum, 1000);
    assert!(rewards.keys().all(|k| k.starts_with("0x") && k == &k.to_lowercase()));
}
