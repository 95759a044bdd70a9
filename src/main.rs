use alloy::providers::{Provider, ProviderBuilder};
use compound_rewards::checkpoint::FileCheckpointStore;
use compound_rewards::config::Config;
use compound_rewards::datasource::{ChainClient, LookupCache, SubgraphClient};
use compound_rewards::domain::Window;
use compound_rewards::orchestration::{Pipeline, PositionEvaluator, PositionFilters};
use compound_rewards::output::{write_ledger_file, write_rewards_file};
use compound_rewards::retry::RetryPolicy;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    // Load configuration
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let url = match config.rpc_url.parse() {
        Ok(url) => url,
        Err(e) => {
            eprintln!("Invalid RPC_URL: {}", e);
            std::process::exit(1);
        }
    };
    let provider = ProviderBuilder::new().connect_http(url).erased();

    let chain = Arc::new(ChainClient::new(
        provider,
        config.position_manager,
        config.factory,
        config.compounder,
    ));
    let subgraph = Arc::new(SubgraphClient::new(
        config.sessions_api_url.clone(),
        config.prices_api_url.clone(),
    ));
    let cache = Arc::new(LookupCache::new(
        chain.clone(),
        subgraph.clone(),
        config.fixed_token_prices.clone(),
    ));

    let window = Window::new(config.start_block, config.end_block);
    let retry = RetryPolicy {
        max_retries: 3,
        base_delay: Duration::from_secs(config.retry_base_delay_secs),
    };
    let filters = PositionFilters {
        include_tokens: config.include_list_tokens.clone(),
        include_token_pairs: config.include_list_token_pairs.clone(),
        exclude_tokens: config.exclude_list_tokens.clone(),
        exclude_accounts: config.exclude_list_accounts.clone(),
    };

    let evaluator = PositionEvaluator::new(
        chain,
        cache,
        window,
        config.vesting_period,
        config.fee_strategy,
        filters,
        retry,
    );
    let checkpoint = Arc::new(FileCheckpointStore::new(config.checkpoint_path.clone()));
    let pipeline = Pipeline::new(
        subgraph,
        evaluator,
        checkpoint,
        window,
        config.total_reward,
        retry,
    );

    let output = match pipeline.run().await {
        Ok(output) => output,
        Err(e) => {
            eprintln!("Run failed: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = write_ledger_file(&config.ledger_path, &output, config.total_reward) {
        eprintln!("Failed to write {}: {}", config.ledger_path, e);
        std::process::exit(1);
    }
    if let Err(e) = write_rewards_file(&config.rewards_path, &output.rewards) {
        eprintln!("Failed to write {}: {}", config.rewards_path, e);
        std::process::exit(1);
    }

    tracing::info!(
        ledger = %config.ledger_path,
        rewards = %config.rewards_path,
        "outputs written"
    );
}
