//! Run outputs: the per-position CSV ledger and the per-account rewards
//! JSON consumed by the distribution contract tooling.

use crate::domain::{Decimal, RewardRecord, RunLedgerEntry};
use crate::error::EngineError;
use crate::orchestration::RunOutput;
use alloy::primitives::U256;
use std::collections::BTreeMap;
use std::io;
use std::path::Path;

/// Write the position ledger as CSV, one row per position, ordered by
/// amount descending.
pub fn write_ledger<W: io::Write>(
    writer: W,
    output: &RunOutput,
    total_reward: U256,
) -> Result<(), EngineError> {
    let reward_units = Decimal::from_raw_units(total_reward, 18)?;
    let mut csv_writer = csv::Writer::from_writer(writer);

    for position in &output.positions {
        // Informational share of the pool this position's value earned.
        let reward_share = if output.total.is_zero() {
            Decimal::zero()
        } else {
            (position.amount / output.total * reward_units).normalize()
        };
        csv_writer.serialize(RunLedgerEntry {
            id: position.id,
            symbol0: position.symbol0.clone(),
            symbol1: position.symbol1.clone(),
            fee: position.fee,
            account: position.account,
            amount: position.amount,
            reward_share,
        })?;
    }
    csv_writer.flush().map_err(EngineError::Io)?;
    Ok(())
}

/// Write the rewards map as JSON: lowercase account address to reward in
/// the token's smallest denomination, as a decimal string.
pub fn write_rewards<W: io::Write>(writer: W, rewards: &[RewardRecord]) -> Result<(), EngineError> {
    let map: BTreeMap<String, String> = rewards
        .iter()
        .map(|r| (r.account.to_string().to_lowercase(), r.reward.to_string()))
        .collect();
    serde_json::to_writer_pretty(writer, &map)?;
    Ok(())
}

pub fn write_ledger_file(
    path: impl AsRef<Path>,
    output: &RunOutput,
    total_reward: U256,
) -> Result<(), EngineError> {
    write_ledger(std::fs::File::create(path)?, output, total_reward)
}

pub fn write_rewards_file(
    path: impl AsRef<Path>,
    rewards: &[RewardRecord],
) -> Result<(), EngineError> {
    write_rewards(std::fs::File::create(path)?, rewards)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{PositionId, PositionRecord};
    use alloy::primitives::Address;
    use std::str::FromStr;

    fn record(id: u64, account: Address, amount: &str) -> PositionRecord {
        PositionRecord {
            id: PositionId::new(id),
            account,
            symbol0: "WETH".to_string(),
            symbol1: "USDC".to_string(),
            fee: 3000,
            amount: Decimal::from_str(amount).unwrap(),
        }
    }

    #[test]
    fn ledger_rows_carry_pool_share() {
        let output = RunOutput {
            positions: vec![
                record(1, Address::with_last_byte(1), "3"),
                record(2, Address::with_last_byte(2), "1"),
            ],
            total: Decimal::from_str("4").unwrap(),
            rewards: Vec::new(),
        };
        let mut buffer = Vec::new();
        // 1000 tokens at 18 decimals.
        let pool = U256::from_str("1000000000000000000000").unwrap();
        write_ledger(&mut buffer, &output, pool).unwrap();

        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "id,symbol0,symbol1,fee,account,amount,reward_share"
        );
        assert!(lines[1].starts_with("1,WETH,USDC,3000,"));
        assert!(lines[1].ends_with(",3,750"));
        assert!(lines[2].ends_with(",1,250"));
    }

    #[test]
    fn ledger_with_zero_total_has_zero_shares() {
        let output = RunOutput {
            positions: vec![record(1, Address::with_last_byte(1), "0")],
            total: Decimal::zero(),
            rewards: Vec::new(),
        };
        let mut buffer = Vec::new();
        write_ledger(&mut buffer, &output, U256::from(1000u64)).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert!(text.lines().nth(1).unwrap().ends_with(",0,0"));
    }

    #[test]
    fn rewards_json_is_a_lowercase_address_map() {
        let rewards = vec![
            RewardRecord {
                account: Address::from_str("0x00000000000000000000000000000000000000AA").unwrap(),
                reward: U256::from(250u64),
            },
            RewardRecord {
                account: Address::with_last_byte(0xbb),
                reward: U256::from(750u64),
            },
        ];
        let mut buffer = Vec::new();
        write_rewards(&mut buffer, &rewards).unwrap();

        let parsed: BTreeMap<String, String> = serde_json::from_slice(&buffer).unwrap();
        assert_eq!(
            parsed["0x00000000000000000000000000000000000000aa"],
            "250"
        );
        let sum: u64 = parsed.values().map(|v| v.parse::<u64>().unwrap()).sum();
        assert_eq!(sum, 1000);
    }
}
