//! JSON engine-state persistence for the paper loop.

use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::engine::EngineState;
use crate::domain::error::VolbreakError;
use crate::ports::state_port::StateStore;

pub struct JsonStateStore {
    path: PathBuf,
}

impl JsonStateStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl StateStore for JsonStateStore {
    /// Writes to a sibling temp file then renames, so a crash mid-write
    /// never leaves a truncated state file behind.
    fn save(&self, state: &EngineState) -> Result<(), VolbreakError> {
        let json = serde_json::to_string_pretty(state).map_err(|e| VolbreakError::State {
            reason: format!("failed to serialize state: {e}"),
        })?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn load(&self) -> Result<Option<EngineState>, VolbreakError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let json = fs::read_to_string(&self.path)?;
        let state = serde_json::from_str(&json).map_err(|e| VolbreakError::State {
            reason: format!("corrupt state file {}: {e}", self.path.display()),
        })?;
        Ok(Some(state))
    }
}
