//! Error types for the analyzer's outer layers.
//!
//! The cashflow engine itself never fails; these errors come from input
//! validation, the assumption store, and the export sinks.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CashflowError {
    /// A listing or assumption value is outside its allowed range
    #[error("Validation error: {0}")]
    Validation(String),

    /// The data source produced a listing without a purchase price
    #[error("No price found for listing")]
    MissingPrice,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl CashflowError {
    /// True for errors caused by the caller's input rather than the environment.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::MissingPrice)
    }
}

pub type CashflowResult<T> = Result<T, CashflowError>;
