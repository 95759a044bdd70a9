//! Proportional reward allocation with deterministic round-down.

use crate::domain::{Decimal, PositionRecord, RewardRecord, VALUE_SCALE};
use crate::error::EngineError;
use alloy::primitives::{Address, U256};
use std::collections::BTreeMap;

/// Sum position amounts per account. BTreeMap keyed by account keeps the
/// allocation order deterministic across runs.
pub fn account_totals(positions: &[PositionRecord]) -> BTreeMap<Address, Decimal> {
    let mut accounts: BTreeMap<Address, Decimal> = BTreeMap::new();
    for position in positions {
        *accounts.entry(position.account).or_insert_with(Decimal::zero) += position.amount;
    }
    accounts
}

/// Allocate `total_reward` proportionally to account values.
///
/// Each reward is `floor(R * amount / total)` computed in exact integer
/// arithmetic over 18-decimal-scaled amounts, so `sum(reward) <= R` and
/// residual dust from rounding down is an accepted loss, never
/// redistributed. Accounts whose reward rounds to zero are dropped.
pub fn allocate_rewards(
    accounts: &BTreeMap<Address, Decimal>,
    total_reward: U256,
) -> Result<Vec<RewardRecord>, EngineError> {
    let mut scaled: Vec<(Address, U256)> = Vec::with_capacity(accounts.len());
    let mut total = U256::ZERO;
    for (account, amount) in accounts {
        let units = amount.to_scaled_integer(VALUE_SCALE)?;
        total += units;
        scaled.push((*account, units));
    }

    if total.is_zero() {
        return Ok(Vec::new());
    }

    let mut rewards = Vec::new();
    for (account, units) in scaled {
        let reward = total_reward * units / total;
        if reward > U256::ZERO {
            rewards.push(RewardRecord { account, reward });
        }
    }
    Ok(rewards)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PositionId;
    use std::str::FromStr;

    fn addr(n: u8) -> Address {
        Address::with_last_byte(n)
    }

    fn record(id: u64, account: Address, amount: &str) -> PositionRecord {
        PositionRecord {
            id: PositionId::new(id),
            account,
            symbol0: "A".to_string(),
            symbol1: "B".to_string(),
            fee: 3000,
            amount: Decimal::from_str(amount).unwrap(),
        }
    }

    #[test]
    fn account_totals_sum_positions() {
        let positions = vec![
            record(1, addr(1), "1.5"),
            record(2, addr(1), "0.5"),
            record(3, addr(2), "3"),
        ];
        let accounts = account_totals(&positions);
        assert_eq!(accounts[&addr(1)], Decimal::from_str("2").unwrap());
        assert_eq!(accounts[&addr(2)], Decimal::from_str("3").unwrap());
    }

    #[test]
    fn one_to_three_split_is_exact() {
        let mut accounts = BTreeMap::new();
        accounts.insert(addr(1), Decimal::from_str("1").unwrap());
        accounts.insert(addr(2), Decimal::from_str("3").unwrap());

        let rewards = allocate_rewards(&accounts, U256::from(1000u64)).unwrap();
        assert_eq!(rewards.len(), 2);
        assert_eq!(rewards[0].reward, U256::from(250u64));
        assert_eq!(rewards[1].reward, U256::from(750u64));
    }

    #[test]
    fn sum_never_exceeds_pool_and_zero_rewards_dropped() {
        let mut accounts = BTreeMap::new();
        accounts.insert(addr(1), Decimal::from_str("1").unwrap());
        accounts.insert(addr(2), Decimal::from_str("1").unwrap());
        accounts.insert(addr(3), Decimal::from_str("1").unwrap());
        // Tiny value that rounds to a zero reward.
        accounts.insert(addr(4), Decimal::from_str("0.0000000000000000001").unwrap());

        let pool = U256::from(100u64);
        let rewards = allocate_rewards(&accounts, pool).unwrap();
        let sum: U256 = rewards.iter().map(|r| r.reward).fold(U256::ZERO, |a, b| a + b);
        assert!(sum <= pool);
        assert!(rewards.iter().all(|r| r.reward > U256::ZERO));
        assert_eq!(rewards.len(), 3);
    }

    #[test]
    fn zero_total_yields_no_rewards() {
        let mut accounts = BTreeMap::new();
        accounts.insert(addr(1), Decimal::zero());
        let rewards = allocate_rewards(&accounts, U256::from(1000u64)).unwrap();
        assert!(rewards.is_empty());
    }
}
