//! Top-level error taxonomy for the reward computation.

use crate::datasource::DataSourceError;
use crate::domain::DecimalError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// External service failure; transient variants are retried by the
    /// retry controller, the rest are fatal for the position.
    #[error(transparent)]
    DataSource(#[from] DataSourceError),

    /// Reconstruction produced an impossible result (negative fee
    /// accumulator, unbracketable rate estimate). Always fatal for the
    /// whole run; never silently zeroed.
    #[error("data integrity violation: {0}")]
    DataIntegrity(String),

    /// Value does not fit the decimal domain; treated as a data problem.
    #[error("decimal conversion failed: {0}")]
    Decimal(#[from] DecimalError),

    /// Checkpoint or output file I/O failure.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Output serialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// CSV ledger write failure.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

impl EngineError {
    /// Only external-service faults are ever worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            EngineError::DataSource(e) => e.is_transient(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transience_follows_datasource_classification() {
        let transient = EngineError::DataSource(DataSourceError::RateLimited);
        assert!(transient.is_transient());

        let permanent = EngineError::DataSource(DataSourceError::ParseError("x".into()));
        assert!(!permanent.is_transient());

        let integrity = EngineError::DataIntegrity("negative fees".into());
        assert!(!integrity.is_transient());
    }
}
