//! Error types for the factura-core library.

use thiserror::Error;

/// Main error type for the factura library.
#[derive(Error, Debug)]
pub enum FacturaError {
    /// Invoice extraction error.
    #[error("extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    /// Pricing error that escaped the engine's own fallback.
    #[error("pricing error: {0}")]
    Pricing(#[from] PricingError),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors that abort extraction of a whole document.
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// The block graph holds no blocks at all.
    #[error("document has no blocks")]
    EmptyDocument,

    /// The block graph is structurally unusable.
    #[error("malformed block graph: {0}")]
    MalformedGraph(String),

    /// Failed to parse a value.
    #[error("failed to parse {field}: {value}")]
    Parse { field: String, value: String },

    /// No invoice data could be extracted.
    #[error("no invoice data found")]
    NoData,
}

/// Failure of a single enhancement stage on a single line item.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EnhancementError {
    /// Decimal arithmetic overflowed or divided by zero.
    #[error("arithmetic failure on {field}: {reason}")]
    Arithmetic { field: String, reason: String },
}

/// Errors raised inside the pricing engine.
///
/// These never reach callers of [`crate::pricing::PricingEngine::recommend`]; they
/// trigger the fixed-margin fallback instead.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PricingError {
    /// Cost price is zero or negative.
    #[error("invalid cost price: {0}")]
    InvalidCost(String),

    /// The category classifier could not produce a guess.
    #[error("classification failed: {0}")]
    Classification(String),

    /// Historical or supplier records could not be used.
    #[error("invalid pricing history: {0}")]
    InvalidHistory(String),

    /// A candidate price does not fit in a decimal.
    #[error("price arithmetic overflow: {0}")]
    Overflow(String),
}

/// Result type for the factura library.
pub type Result<T> = std::result::Result<T, FacturaError>;
