//! Domain error types.

use chrono::NaiveDate;

/// Precondition violations on an input price series.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SeriesError {
    #[error("date {date} at index {index} is earlier than the previous point")]
    OutOfOrder { index: usize, date: NaiveDate },

    #[error("duplicate date {date} at index {index}")]
    DuplicateDate { index: usize, date: NaiveDate },
}

/// Failure talking to the upstream market-data API.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FetchError {
    #[error("rate limited by upstream on {endpoint}")]
    RateLimited { endpoint: String },

    #[error("upstream {endpoint} returned HTTP {status}: {body}")]
    Http {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("request to {endpoint} failed: {reason}")]
    Transport { endpoint: String, reason: String },

    #[error("could not decode {endpoint} response: {reason}")]
    Decode { endpoint: String, reason: String },

    #[error("no API key configured")]
    MissingApiKey,
}

impl FetchError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, FetchError::RateLimited { .. })
    }
}

/// Top-level error type for stockstudy.
#[derive(Debug, thiserror::Error)]
pub enum StockStudyError {
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

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Series(#[from] SeriesError),

    #[error("cache error at {path}: {reason}")]
    Cache { path: String, reason: String },

    #[error("object store error for {key}: {reason}")]
    Store { key: String, reason: String },

    #[error("invalid input {source_name}: {reason}")]
    InvalidInput { source_name: String, reason: String },

    #[error("unsupported data type: {0}")]
    UnsupportedDataType(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl StockStudyError {
    /// Process exit status for this error kind.
    pub fn exit_status(&self) -> u8 {
        match self {
            StockStudyError::Io(_) => 1,
            StockStudyError::ConfigParse { .. }
            | StockStudyError::ConfigMissing { .. }
            | StockStudyError::ConfigInvalid { .. } => 2,
            StockStudyError::Fetch(_) => 3,
            StockStudyError::Cache { .. }
            | StockStudyError::Store { .. }
            | StockStudyError::Json(_)
            | StockStudyError::Csv(_) => 4,
            StockStudyError::Series(_)
            | StockStudyError::InvalidInput { .. }
            | StockStudyError::UnsupportedDataType(_) => 5,
        }
    }
}

impl From<&StockStudyError> for std::process::ExitCode {
    fn from(err: &StockStudyError) -> Self {
        std::process::ExitCode::from(err.exit_status())
    }
}
