//! Invoice field extraction module.

pub mod line_items;
mod parser;
pub mod rules;

pub use line_items::{interpret_line_items, LineItemInterpretation};
pub use parser::{ExtractionResult, InvoiceParser};

use crate::blocks::BlockGraph;
use crate::error::ExtractionError;

/// Result type for extraction operations.
pub type Result<T> = std::result::Result<T, ExtractionError>;

/// Trait for invoice extractors over OCR block graphs.
pub trait InvoiceExtractor {
    /// Extract and enhance an invoice from a block graph.
    fn extract(&self, graph: &BlockGraph) -> Result<ExtractionResult>;

    /// Extract from the engine's JSON output (response object or bare block array).
    fn extract_from_json(&self, json: &str) -> Result<ExtractionResult> {
        let graph = BlockGraph::from_json(json)
            .map_err(|e| ExtractionError::MalformedGraph(e.to_string()))?;
        self.extract(&graph)
    }
}
