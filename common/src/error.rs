use thiserror::Error;

#[derive(Error, Debug)]
pub enum JournalError {
    #[error("Invalid metrics input for trade {trade_id}: {field} {reason}")]
    InvalidMetricsInput {
        trade_id: String,
        field: String,
        reason: String,
    },

    #[error("Unresolvable exit date for trade {trade_id}")]
    UnresolvableDate { trade_id: String },

    #[error("Invalid trade {trade_id}: {reason}")]
    InvalidTrade { trade_id: String, reason: String },

    #[error("Trade not found: {0}")]
    TradeNotFound(String),

    #[error("Trade already exists: {0}")]
    DuplicateTradeId(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Data loading error: {0}")]
    DataLoadError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV parse error: {0}")]
    CsvError(String),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl JournalError {
    pub fn invalid_trade(trade_id: &str, reason: impl Into<String>) -> Self {
        JournalError::InvalidTrade {
            trade_id: trade_id.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, JournalError>;
