//! Error taxonomy.
//!
//! Config and parameter problems fail fast before any candle is processed.
//! Data-quality problems inside a run are not errors at all: the offending
//! candle is skipped and surfaced as a diagnostic on the result (see
//! [`crate::domain::candle::RejectedCandle`]).

/// Top-level error type for volbreak.
#[derive(Debug, thiserror::Error)]
pub enum VolbreakError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("invalid strategy parameter {field}: {reason}")]
    InvalidParam { field: &'static str, reason: String },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("no candles found in {path}")]
    NoData { path: String },

    #[error("insufficient data: have {bars} candles, need at least {minimum}")]
    InsufficientData { bars: usize, minimum: usize },

    #[error("state store error: {reason}")]
    State { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&VolbreakError> for std::process::ExitCode {
    fn from(err: &VolbreakError) -> Self {
        let code: u8 = match err {
            VolbreakError::Io(_) => 1,
            VolbreakError::ConfigParse { .. }
            | VolbreakError::ConfigMissing { .. }
            | VolbreakError::ConfigInvalid { .. }
            | VolbreakError::InvalidParam { .. } => 2,
            VolbreakError::Data { .. }
            | VolbreakError::NoData { .. }
            | VolbreakError::InsufficientData { .. } => 3,
            VolbreakError::State { .. } => 4,
        };
        std::process::ExitCode::from(code)
    }
}
