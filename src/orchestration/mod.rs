//! Orchestration: per-position evaluation and the end-to-end run pipeline.

pub mod evaluator;
pub mod run;

pub use evaluator::{PositionEvaluator, PositionFilters};
pub use run::{Pipeline, RunOutput};
