use thiserror::Error;

/// Failures raised while refreshing, caching or converting indicators.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IndicatorError {
    /// A remote call failed or answered with a non-success status.
    #[error("Network error: {0}")]
    Network(String),

    /// A remote response body could not be decoded.
    #[error("Parse error: {0}")]
    Parse(String),

    /// The backing store rejected a write.
    #[error("Cache write error: {0}")]
    CacheWrite(String),

    /// Today's remote fetch budget is spent or the clock is outside the
    /// fetch window. Routes the refresh cycle into the cache fallback.
    #[error("Daily query quota exhausted")]
    QuotaExhausted,

    /// Neither the remote sources nor the cache had data for today.
    #[error("No indicator data available")]
    NoDataAvailable,

    /// A conversion needs a rate that is not present in the snapshot.
    #[error("Missing rate for {0}")]
    MissingRate(String),

    /// Conversion was requested from a field that is not convertible.
    #[error("Unknown conversion field: {0}")]
    UnknownField(String),
}

impl From<reqwest::Error> for IndicatorError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            IndicatorError::Parse(error.to_string())
        } else {
            IndicatorError::Network(error.to_string())
        }
    }
}

impl From<serde_json::Error> for IndicatorError {
    fn from(error: serde_json::Error) -> Self {
        IndicatorError::Parse(error.to_string())
    }
}

pub type Result<T> = std::result::Result<T, IndicatorError>;
