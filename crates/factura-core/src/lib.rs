//! Core library for Colombian retail invoice processing.
//!
//! This crate provides:
//! - OCR block graph reading (lines, key/value pairs, tables)
//! - Colombian invoice field extraction (invoice number, dates, NIT, parties, totals)
//! - Line item interpretation and enhancement (unit conversion, subtotal reconciliation)
//! - Sale price recommendations with Colombian retail rounding

pub mod blocks;
pub mod enhance;
pub mod error;
pub mod invoice;
pub mod models;
pub mod pricing;

pub use blocks::{Block, BlockGraph, BlockType, ReadDocument, Table};
pub use enhance::DataEnhancer;
pub use error::{EnhancementError, ExtractionError, FacturaError, PricingError, Result};
pub use invoice::{ExtractionResult, InvoiceExtractor, InvoiceParser};
pub use models::config::FacturaConfig;
pub use models::invoice::{
    ExtractionWarning, InvoiceExtraction, LineItem, LineItemSource, WarningCode,
};
pub use models::pricing::{
    Category, HistoricalRecord, PricingCandidate, PricingMethod, PricingRecommendation,
    PricingRequest,
};
pub use pricing::{CategoryClassifier, KeywordClassifier, PricingEngine};
