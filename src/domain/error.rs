//! Domain error types.

use chrono::NaiveDate;

/// Top-level error type for rotrader.
#[derive(Debug, thiserror::Error)]
pub enum RotraderError {
    #[error("data gap for {symbol} at {date}")]
    DataGap { symbol: String, date: NaiveDate },

    #[error("data source error: {reason}")]
    DataSource { reason: String },

    #[error("insufficient history: {have} scorable instruments, {need} requested")]
    InsufficientHistory { have: usize, need: usize },

    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("cash constraint violated on {date}: cash {cash:.2}")]
    CashConstraintViolation { date: NaiveDate, cash: f64 },

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

    #[error("no data for {symbol}")]
    NoData { symbol: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&RotraderError> for std::process::ExitCode {
    fn from(err: &RotraderError) -> Self {
        let code: u8 = match err {
            RotraderError::Io(_) => 1,
            RotraderError::ConfigParse { .. }
            | RotraderError::ConfigMissing { .. }
            | RotraderError::ConfigInvalid { .. }
            | RotraderError::InvalidParameter { .. } => 2,
            RotraderError::DataGap { .. }
            | RotraderError::DataSource { .. }
            | RotraderError::NoData { .. } => 3,
            RotraderError::InsufficientHistory { .. } => 5,
            RotraderError::CashConstraintViolation { .. } => 6,
        };
        std::process::ExitCode::from(code)
    }
}
