pub mod checkpoint;
pub mod config;
pub mod datasource;
pub mod domain;
pub mod engine;
pub mod error;
pub mod orchestration;
pub mod output;
pub mod retry;

pub use checkpoint::{CheckpointStore, FileCheckpointStore, MemoryCheckpointStore};
pub use config::{Config, ConfigError, FeeStrategy};
pub use datasource::{
    ChainClient, ChainSource, DataSourceError, LookupCache, PriceSource, SessionSource,
    SubgraphClient,
};
pub use domain::{
    CompoundSession, Decimal, PositionId, PositionRecord, RewardRecord, Window,
};
pub use error::EngineError;
pub use orchestration::{Pipeline, PositionEvaluator, PositionFilters, RunOutput};
pub use retry::RetryPolicy;
