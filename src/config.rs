use crate::domain::Decimal;
use alloy::primitives::{Address, U256};
use std::collections::HashMap;
use thiserror::Error;

const DEFAULT_POSITION_MANAGER: &str = "0xC36442b4a4522E871399CD717aBDD847Ab11FE88";
const DEFAULT_FACTORY: &str = "0x1F98431c8aD98523631AE4a59f267346ea31F984";
const DEFAULT_COMPOUNDER: &str = "0x5411894842e610c4d0f6ed4c232da689400f94a1";

#[derive(Debug, Clone)]
pub struct Config {
    pub rpc_url: String,
    pub sessions_api_url: String,
    pub prices_api_url: String,
    pub start_block: u64,
    pub end_block: u64,
    /// Vesting horizon in seconds of in-range time.
    pub vesting_period: u64,
    /// Reward pool in the smallest denomination of the reward token.
    pub total_reward: U256,
    pub fee_strategy: FeeStrategy,
    pub include_list_tokens: Vec<Address>,
    pub include_list_token_pairs: Vec<(Address, Address)>,
    pub exclude_list_tokens: Vec<Address>,
    pub exclude_list_accounts: Vec<Address>,
    pub fixed_token_prices: HashMap<Address, Decimal>,
    pub checkpoint_path: String,
    pub ledger_path: String,
    pub rewards_path: String,
    pub retry_base_delay_secs: u64,
    pub position_manager: Address,
    pub factory: Address,
    pub compounder: Address,
}

/// How per-session swap fees are measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeeStrategy {
    /// Collect-all static probes at the interval bounds.
    Direct,
    /// Estimate from observed collect cadence when probes are unavailable.
    GrowthRate,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let rpc_url = require(&env_map, "RPC_URL")?;
        let sessions_api_url = require(&env_map, "SESSIONS_API_URL")?;
        let prices_api_url = require(&env_map, "PRICES_API_URL")?;

        let start_block = parse_u64(&require(&env_map, "START_BLOCK")?, "START_BLOCK")?;
        let end_block = parse_u64(&require(&env_map, "END_BLOCK")?, "END_BLOCK")?;
        if end_block <= start_block {
            return Err(ConfigError::InvalidValue(
                "END_BLOCK".to_string(),
                format!("must be greater than START_BLOCK, got {}", end_block),
            ));
        }

        let vesting_period = parse_u64(&require(&env_map, "VESTING_PERIOD")?, "VESTING_PERIOD")?;
        if vesting_period == 0 {
            return Err(ConfigError::InvalidValue(
                "VESTING_PERIOD".to_string(),
                "must be positive".to_string(),
            ));
        }

        let total_reward = require(&env_map, "TOTAL_REWARD")?
            .parse::<U256>()
            .map_err(|_| {
                ConfigError::InvalidValue(
                    "TOTAL_REWARD".to_string(),
                    "must be an unsigned integer".to_string(),
                )
            })?;

        let fee_strategy = match env_map
            .get("FEE_STRATEGY")
            .map(|s| s.as_str())
            .unwrap_or("direct")
        {
            "direct" => FeeStrategy::Direct,
            "growth-rate" => FeeStrategy::GrowthRate,
            other => {
                return Err(ConfigError::InvalidValue(
                    "FEE_STRATEGY".to_string(),
                    format!("must be direct or growth-rate, got {}", other),
                ))
            }
        };

        let include_list_tokens = parse_address_list(&env_map, "INCLUDE_LIST_TOKENS")?;
        let include_list_token_pairs = parse_pair_list(&env_map, "INCLUDE_LIST_TOKEN_PAIRS")?;
        let exclude_list_tokens = parse_address_list(&env_map, "EXCLUDE_LIST_TOKENS")?;
        let exclude_list_accounts = parse_address_list(&env_map, "EXCLUDE_LIST_ACCOUNTS")?;
        let fixed_token_prices = parse_fixed_prices(&env_map, "FIXED_TOKEN_PRICES")?;

        let checkpoint_path = env_map
            .get("CHECKPOINT_PATH")
            .cloned()
            .unwrap_or_else(|| "checkpoint.json".to_string());
        let ledger_path = env_map
            .get("LEDGER_PATH")
            .cloned()
            .unwrap_or_else(|| "positions.csv".to_string());
        let rewards_path = env_map
            .get("REWARDS_PATH")
            .cloned()
            .unwrap_or_else(|| "rewards.json".to_string());

        let retry_base_delay_secs = env_map
            .get("RETRY_BASE_DELAY_SECS")
            .map(|s| s.as_str())
            .unwrap_or("30")
            .parse::<u64>()
            .map_err(|_| {
                ConfigError::InvalidValue(
                    "RETRY_BASE_DELAY_SECS".to_string(),
                    "must be a valid u64".to_string(),
                )
            })?;

        let position_manager =
            parse_address_or(&env_map, "POSITION_MANAGER", DEFAULT_POSITION_MANAGER)?;
        let factory = parse_address_or(&env_map, "FACTORY", DEFAULT_FACTORY)?;
        let compounder = parse_address_or(&env_map, "COMPOUNDER", DEFAULT_COMPOUNDER)?;

        Ok(Config {
            rpc_url,
            sessions_api_url,
            prices_api_url,
            start_block,
            end_block,
            vesting_period,
            total_reward,
            fee_strategy,
            include_list_tokens,
            include_list_token_pairs,
            exclude_list_tokens,
            exclude_list_accounts,
            fixed_token_prices,
            checkpoint_path,
            ledger_path,
            rewards_path,
            retry_base_delay_secs,
            position_manager,
            factory,
            compounder,
        })
    }
}

fn require(env_map: &HashMap<String, String>, key: &str) -> Result<String, ConfigError> {
    env_map
        .get(key)
        .cloned()
        .ok_or_else(|| ConfigError::MissingEnv(key.to_string()))
}

fn parse_u64(value: &str, key: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| {
        ConfigError::InvalidValue(key.to_string(), "must be a valid u64".to_string())
    })
}

fn parse_address(value: &str, key: &str) -> Result<Address, ConfigError> {
    value.parse::<Address>().map_err(|_| {
        ConfigError::InvalidValue(key.to_string(), format!("invalid address {}", value))
    })
}

fn parse_address_or(
    env_map: &HashMap<String, String>,
    key: &str,
    default: &str,
) -> Result<Address, ConfigError> {
    parse_address(env_map.get(key).map(|s| s.as_str()).unwrap_or(default), key)
}

fn parse_address_list(
    env_map: &HashMap<String, String>,
    key: &str,
) -> Result<Vec<Address>, ConfigError> {
    match env_map.get(key) {
        None => Ok(Vec::new()),
        Some(raw) => raw
            .split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(|s| parse_address(s, key))
            .collect(),
    }
}

/// Pairs are written `tokenA/tokenB`, comma-separated.
fn parse_pair_list(
    env_map: &HashMap<String, String>,
    key: &str,
) -> Result<Vec<(Address, Address)>, ConfigError> {
    match env_map.get(key) {
        None => Ok(Vec::new()),
        Some(raw) => raw
            .split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(|pair| {
                let (a, b) = pair.split_once('/').ok_or_else(|| {
                    ConfigError::InvalidValue(
                        key.to_string(),
                        format!("pair {} must be tokenA/tokenB", pair),
                    )
                })?;
                Ok((parse_address(a.trim(), key)?, parse_address(b.trim(), key)?))
            })
            .collect(),
    }
}

/// Entries are written `token:price`, comma-separated.
fn parse_fixed_prices(
    env_map: &HashMap<String, String>,
    key: &str,
) -> Result<HashMap<Address, Decimal>, ConfigError> {
    let mut prices = HashMap::new();
    if let Some(raw) = env_map.get(key) {
        for entry in raw.split(',').map(|s| s.trim()).filter(|s| !s.is_empty()) {
            let (token, price) = entry.split_once(':').ok_or_else(|| {
                ConfigError::InvalidValue(
                    key.to_string(),
                    format!("entry {} must be token:price", entry),
                )
            })?;
            let price = Decimal::from_str_canonical(price.trim()).map_err(|_| {
                ConfigError::InvalidValue(key.to_string(), format!("invalid price {}", price))
            })?;
            prices.insert(parse_address(token.trim(), key)?, price);
        }
    }
    Ok(prices)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_required_env() -> HashMap<String, String> {
        let mut map = HashMap::new();
        map.insert("RPC_URL".to_string(), "http://localhost:8545".to_string());
        map.insert(
            "SESSIONS_API_URL".to_string(),
            "http://localhost/sessions".to_string(),
        );
        map.insert(
            "PRICES_API_URL".to_string(),
            "http://localhost/prices".to_string(),
        );
        map.insert("START_BLOCK".to_string(), "15000000".to_string());
        map.insert("END_BLOCK".to_string(), "15100000".to_string());
        map.insert("VESTING_PERIOD".to_string(), "15552000".to_string());
        map.insert(
            "TOTAL_REWARD".to_string(),
            "1000000000000000000000".to_string(),
        );
        map
    }

    #[test]
    fn test_minimal_config() {
        let config = Config::from_env_map(setup_required_env()).unwrap();
        assert_eq!(config.start_block, 15_000_000);
        assert_eq!(config.end_block, 15_100_000);
        assert_eq!(config.fee_strategy, FeeStrategy::Direct);
        assert_eq!(config.checkpoint_path, "checkpoint.json");
        assert_eq!(config.retry_base_delay_secs, 30);
        assert_eq!(
            config.position_manager,
            DEFAULT_POSITION_MANAGER.parse::<Address>().unwrap()
        );
    }

    #[test]
    fn test_missing_rpc_url() {
        let mut env_map = setup_required_env();
        env_map.remove("RPC_URL");
        match Config::from_env_map(env_map) {
            Err(ConfigError::MissingEnv(s)) => assert_eq!(s, "RPC_URL"),
            _ => panic!("Expected MissingEnv error"),
        }
    }

    #[test]
    fn test_end_block_before_start_block() {
        let mut env_map = setup_required_env();
        env_map.insert("END_BLOCK".to_string(), "14000000".to_string());
        match Config::from_env_map(env_map) {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "END_BLOCK"),
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_zero_vesting_period() {
        let mut env_map = setup_required_env();
        env_map.insert("VESTING_PERIOD".to_string(), "0".to_string());
        match Config::from_env_map(env_map) {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "VESTING_PERIOD"),
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_invalid_fee_strategy() {
        let mut env_map = setup_required_env();
        env_map.insert("FEE_STRATEGY".to_string(), "guess".to_string());
        match Config::from_env_map(env_map) {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "FEE_STRATEGY"),
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_growth_rate_strategy() {
        let mut env_map = setup_required_env();
        env_map.insert("FEE_STRATEGY".to_string(), "growth-rate".to_string());
        let config = Config::from_env_map(env_map).unwrap();
        assert_eq!(config.fee_strategy, FeeStrategy::GrowthRate);
    }

    #[test]
    fn test_token_pair_list() {
        let mut env_map = setup_required_env();
        env_map.insert(
            "INCLUDE_LIST_TOKEN_PAIRS".to_string(),
            "0x00000000000000000000000000000000000000aa/0x00000000000000000000000000000000000000bb"
                .to_string(),
        );
        let config = Config::from_env_map(env_map).unwrap();
        assert_eq!(config.include_list_token_pairs.len(), 1);
        assert_eq!(
            config.include_list_token_pairs[0].0,
            Address::with_last_byte(0xaa)
        );
    }

    #[test]
    fn test_malformed_token_pair() {
        let mut env_map = setup_required_env();
        env_map.insert(
            "INCLUDE_LIST_TOKEN_PAIRS".to_string(),
            "0x00000000000000000000000000000000000000aa".to_string(),
        );
        match Config::from_env_map(env_map) {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "INCLUDE_LIST_TOKEN_PAIRS"),
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_fixed_token_prices() {
        let mut env_map = setup_required_env();
        env_map.insert(
            "FIXED_TOKEN_PRICES".to_string(),
            "0x00000000000000000000000000000000000000aa:0.5".to_string(),
        );
        let config = Config::from_env_map(env_map).unwrap();
        assert_eq!(
            config.fixed_token_prices[&Address::with_last_byte(0xaa)],
            Decimal::from_str_canonical("0.5").unwrap()
        );
    }
}
