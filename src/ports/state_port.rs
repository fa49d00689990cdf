//! Engine-state persistence port trait.
//!
//! Paper/live mode saves the full [`EngineState`] after every applied
//! candle and restores it on restart; nothing else needs durable storage.

use crate::domain::engine::EngineState;
use crate::domain::error::VolbreakError;

pub trait StateStore {
    fn save(&self, state: &EngineState) -> Result<(), VolbreakError>;

    /// `Ok(None)` when no state has been saved yet.
    fn load(&self) -> Result<Option<EngineState>, VolbreakError>;
}
