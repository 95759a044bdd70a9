//! Checkpoint persistence: per-position partial results survive process
//! restarts so a rerun resumes instead of recomputing.

use crate::domain::{PositionId, PositionRecord};
use crate::error::EngineError;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Durable map of position id to evaluated record.
pub trait CheckpointStore: Send + Sync {
    fn load(&self) -> Result<HashMap<PositionId, PositionRecord>, EngineError>;
    fn save(&self, records: &HashMap<PositionId, PositionRecord>) -> Result<(), EngineError>;
}

/// JSON file checkpoint. A missing or corrupt file starts a fresh run;
/// saves go through a temporary file so a crash mid-write never leaves a
/// truncated checkpoint behind.
pub struct FileCheckpointStore {
    path: PathBuf,
}

impl FileCheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CheckpointStore for FileCheckpointStore {
    fn load(&self) -> Result<HashMap<PositionId, PositionRecord>, EngineError> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HashMap::new()),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_str(&contents) {
            Ok(records) => Ok(records),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "checkpoint unreadable, starting fresh");
                Ok(HashMap::new())
            }
        }
    }

    fn save(&self, records: &HashMap<PositionId, PositionRecord>) -> Result<(), EngineError> {
        let serialized = serde_json::to_string_pretty(records)?;
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, serialized)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// Volatile store for tests and one-shot runs.
#[derive(Default)]
pub struct MemoryCheckpointStore {
    records: std::sync::Mutex<HashMap<PositionId, PositionRecord>>,
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CheckpointStore for MemoryCheckpointStore {
    fn load(&self) -> Result<HashMap<PositionId, PositionRecord>, EngineError> {
        Ok(self
            .records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone())
    }

    fn save(&self, records: &HashMap<PositionId, PositionRecord>) -> Result<(), EngineError> {
        *self
            .records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = records.clone();
        Ok(())
    }
}
