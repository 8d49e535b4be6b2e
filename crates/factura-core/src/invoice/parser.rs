//! Block-graph invoice parser: field extraction, line items and enhancement.

use std::time::Instant;

use tracing::{debug, info};

use crate::blocks::{BlockGraph, ReadDocument};
use crate::enhance::DataEnhancer;
use crate::models::config::{EnhancementConfig, ExtractionConfig, FacturaConfig};
use crate::models::invoice::*;

use super::line_items::interpret_line_items;
use super::rules::{
    is_ambiguous_day_month, DateExtractor, DateKind, ExtractionMatch, FieldExtractor,
    InvoiceNumberExtractor, PartyExtractor, PaymentExtractor, TotalsExtractor,
};
use super::{InvoiceExtractor, Result};

/// Result of invoice extraction.
#[derive(Debug, Clone)]
pub struct ExtractionResult {
    /// Extracted and enhanced invoice, warnings included.
    pub invoice: InvoiceExtraction,
    /// Flattened document the invoice was read from.
    pub document: ReadDocument,
    /// Processing time in milliseconds.
    pub processing_time_ms: u64,
}

impl ExtractionResult {
    pub fn warnings(&self) -> &[ExtractionWarning] {
        &self.invoice.warnings
    }
}

/// Rule-based invoice parser.
#[derive(Debug, Clone, Default)]
pub struct InvoiceParser {
    extraction: ExtractionConfig,
    enhancer: DataEnhancer,
}

impl InvoiceParser {
    /// Create a parser with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a parser from a full configuration.
    pub fn from_config(config: &FacturaConfig) -> Self {
        Self {
            extraction: config.extraction.clone(),
            enhancer: DataEnhancer::new(config.enhancement.clone()),
        }
    }

    /// Set NIT check-digit validation.
    pub fn with_nit_validation(mut self, validate: bool) -> Self {
        self.extraction.validate_nit = validate;
        self
    }

    /// Set the minimum LINE block confidence (0 - 100).
    pub fn with_min_block_confidence(mut self, confidence: f32) -> Self {
        self.extraction.min_block_confidence = confidence;
        self
    }

    /// Set the enhancement settings.
    pub fn with_enhancement(mut self, config: EnhancementConfig) -> Self {
        self.enhancer = DataEnhancer::new(config);
        self
    }

    /// Extract an invoice from an already flattened document.
    ///
    /// Never fails: anything that cannot be read is left empty and listed in
    /// `metadata.missing_fields` or the warnings.
    pub fn parse_document(&self, doc: &ReadDocument) -> InvoiceExtraction {
        let mut invoice = InvoiceExtraction::default();

        let number = InvoiceNumberExtractor.extract(doc);
        if let Some(m) = &number {
            debug!("Invoice number {:?} via rule {}", m.value, m.rule);
        }
        invoice.invoice_number = number.map(|m| m.value);

        invoice.issue_date = self.date(doc, DateKind::Issue, &mut invoice.warnings);
        invoice.due_date = self.date(doc, DateKind::Due, &mut invoice.warnings);

        let (supplier, customer) = PartyExtractor::new(self.extraction.validate_nit).extract(doc);
        invoice.supplier = supplier;
        invoice.customer = customer;
        invoice.totals = TotalsExtractor.extract(doc);
        invoice.payment = PaymentExtractor.extract(doc);

        let interpretation = interpret_line_items(doc);
        invoice.metadata.line_item_source = interpretation.source;
        invoice.line_items = interpretation.items;
        if invoice.metadata.line_item_source == LineItemSource::NotFound {
            invoice.warnings.push(ExtractionWarning::new(
                WarningCode::NoLineItems,
                "no line items found in tables or text lines",
            ));
        }

        self.enhancer.enhance(&mut invoice);

        invoice.metadata.currency = self.extraction.default_currency.clone();
        invoice.metadata.missing_fields = missing_fields(&invoice);
        invoice
    }

    fn date(
        &self,
        doc: &ReadDocument,
        kind: DateKind,
        warnings: &mut Vec<ExtractionWarning>,
    ) -> Option<chrono::NaiveDate> {
        let found: ExtractionMatch<_> = DateExtractor::new(kind).extract(doc)?;
        if is_ambiguous_day_month(&found.source) {
            warnings.push(ExtractionWarning::new(
                WarningCode::AmbiguousDate,
                format!(
                    "{:?} date {:?} is ambiguous between day/month and month/day, read as {}",
                    kind, found.source, found.value
                ),
            ));
        }
        Some(found.value)
    }
}

fn missing_fields(invoice: &InvoiceExtraction) -> Vec<String> {
    let checks = [
        ("invoice_number", invoice.invoice_number.is_none()),
        ("issue_date", invoice.issue_date.is_none()),
        ("supplier_name", invoice.supplier.company_name.is_none()),
        ("supplier_nit", invoice.supplier.nit.is_none()),
        ("customer_name", invoice.customer.customer_name.is_none()),
        ("total", invoice.totals.total.is_none()),
    ];
    checks
        .iter()
        .filter(|(_, missing)| *missing)
        .map(|(name, _)| name.to_string())
        .collect()
}

impl InvoiceExtractor for InvoiceParser {
    fn extract(&self, graph: &BlockGraph) -> Result<ExtractionResult> {
        let start = Instant::now();
        graph.validate()?;

        info!("Extracting invoice from {} blocks", graph.len());

        let document = graph.read(self.extraction.min_block_confidence);
        let mut invoice = self.parse_document(&document);
        invoice.metadata.confidence = graph.average_confidence();
        invoice.metadata.block_count = graph.len();

        let processing_time_ms = start.elapsed().as_millis() as u64;
        invoice.metadata.processing_time_ms = Some(processing_time_ms);

        info!(
            "Extracted invoice {} with {} line items and {} warnings",
            invoice.invoice_number.as_deref().unwrap_or("<unknown>"),
            invoice.line_items.len(),
            invoice.warnings.len()
        );

        Ok(ExtractionResult {
            invoice,
            document,
            processing_time_ms,
        })
    }
}
