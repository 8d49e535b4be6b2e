//! Invoice data models for Colombian retail invoices.

use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Canonical unit code for individual pieces after conversion.
pub const UNIT_PIECES: &str = "PCS";

/// Default unit code when none is detected.
pub const UNIT_EACH: &str = "UND";

/// A complete invoice extraction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InvoiceExtraction {
    /// Invoice number/identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice_number: Option<String>,

    /// Date the invoice was issued.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue_date: Option<NaiveDate>,

    /// Payment due date.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,

    /// Issuing supplier.
    pub supplier: SupplierInfo,

    /// Buying customer.
    pub customer: CustomerInfo,

    /// Line items on the invoice.
    pub line_items: Vec<LineItem>,

    /// Invoice totals and taxes.
    pub totals: InvoiceTotals,

    /// Payment terms.
    pub payment: PaymentInfo,

    /// Warnings from extraction and enhancement. Informational, never blocking.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<ExtractionWarning>,

    /// Extraction metadata.
    pub metadata: ExtractionMetadata,
}

/// Supplier (issuer) information.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplierInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,

    /// Colombian tax id, `digits-checkdigit` when the check digit is known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nit: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// Customer (buyer) information.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,

    /// NIT or citizen id (CC).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// Invoice totals and taxes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceTotals {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtotal: Option<Decimal>,

    /// IVA rate in percent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iva_rate: Option<Decimal>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub iva_amount: Option<Decimal>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<Decimal>,

    /// Item count printed on the invoice.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_items: Option<u32>,
}

/// Payment terms.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentInfo {
    /// Payment method as printed (CREDITO, CONTADO, ...).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub credit_days: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_percentage: Option<Decimal>,
}

/// A single product line on the invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// Ordinal position on the invoice (1-based).
    pub item_number: u32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_code: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Supplier reference as printed in the first column.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<Decimal>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_price: Option<Decimal>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtotal: Option<Decimal>,

    /// Unit of measure code (UND, DOC, PAR, GRS, PCS, KG, ...).
    pub unit_measure: String,

    /// Quantity before unit conversion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_quantity: Option<Decimal>,

    /// Unit before conversion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_unit: Option<String>,

    /// Unit price before conversion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_unit_price: Option<Decimal>,

    /// Pieces per original unit; 1 when no conversion happened.
    pub unit_multiplier: u32,

    /// Last enhancement transform that fired.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enhancement_applied: Option<EnhancementApplied>,

    /// Subtotal was overwritten by `quantity × unit_price`.
    #[serde(default)]
    pub recalculated: bool,
}

impl LineItem {
    /// Create an empty item at the given position.
    pub fn new(item_number: u32) -> Self {
        Self {
            item_number,
            product_code: None,
            description: None,
            reference: None,
            quantity: None,
            unit_price: None,
            subtotal: None,
            unit_measure: UNIT_EACH.to_string(),
            original_quantity: None,
            original_unit: None,
            original_unit_price: None,
            unit_multiplier: 1,
            enhancement_applied: None,
            recalculated: false,
        }
    }

    /// Check that description, quantity and unit price are all usable.
    pub fn is_complete(&self) -> bool {
        self.description.as_deref().is_some_and(|d| !d.trim().is_empty())
            && self.quantity.is_some_and(|q| q > Decimal::ZERO)
            && self.unit_price.is_some_and(|p| p > Decimal::ZERO)
    }
}

/// Enhancement transform applied to a line item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EnhancementApplied {
    /// Leading ordinal split off the product code.
    ItemRefSeparated,
    /// Quantity and price rescaled from a grouped unit into pieces.
    UnitConverted { from: String },
    /// Unit needed no conversion.
    UnitAlreadyIndividual { unit: String },
}

impl fmt::Display for EnhancementApplied {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnhancementApplied::ItemRefSeparated => write!(f, "item_ref_separated"),
            EnhancementApplied::UnitConverted { from } => {
                write!(f, "unit_converted_{}_to_{}", from, UNIT_PIECES)
            }
            EnhancementApplied::UnitAlreadyIndividual { unit } => {
                write!(f, "unit_already_individual_{}", unit)
            }
        }
    }
}

/// Machine-readable warning category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningCode {
    MissingDescription,
    InvalidQuantity,
    InvalidUnitPrice,
    SuspiciousConversion,
    SubtotalRecalculated,
    EnhancementFailed,
    InvalidTotal,
    NoLineItems,
    AmbiguousDate,
}

impl WarningCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            WarningCode::MissingDescription => "missing_description",
            WarningCode::InvalidQuantity => "invalid_quantity",
            WarningCode::InvalidUnitPrice => "invalid_unit_price",
            WarningCode::SuspiciousConversion => "suspicious_conversion",
            WarningCode::SubtotalRecalculated => "subtotal_recalculated",
            WarningCode::EnhancementFailed => "enhancement_failed",
            WarningCode::InvalidTotal => "invalid_total",
            WarningCode::NoLineItems => "no_line_items",
            WarningCode::AmbiguousDate => "ambiguous_date",
        }
    }
}

impl fmt::Display for WarningCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A warning attached to an extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionWarning {
    pub code: WarningCode,

    /// 1-based line item position, for item-level warnings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,

    pub message: String,
}

impl ExtractionWarning {
    /// Invoice-level warning.
    pub fn new(code: WarningCode, message: impl Into<String>) -> Self {
        Self {
            code,
            line: None,
            message: message.into(),
        }
    }

    /// Warning about one line item.
    pub fn for_line(code: WarningCode, line: usize, message: impl Into<String>) -> Self {
        Self {
            code,
            line: Some(line),
            message: message.into(),
        }
    }
}

impl fmt::Display for ExtractionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "line {}: {}", line, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

/// Where the line items were read from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineItemSource {
    /// Largest detected table.
    Table,
    /// Raw text lines (no usable table).
    TextLines,
    /// Nothing usable; the caller should fall back to manual entry.
    #[default]
    NotFound,
}

impl fmt::Display for LineItemSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineItemSource::Table => write!(f, "table"),
            LineItemSource::TextLines => write!(f, "text_lines"),
            LineItemSource::NotFound => write!(f, "not_found"),
        }
    }
}

/// Metadata about the extraction process.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionMetadata {
    /// Mean OCR confidence of the source blocks (0.0 - 1.0).
    pub confidence: f32,

    /// Where the line items came from.
    pub line_item_source: LineItemSource,

    /// Number of blocks in the source graph.
    pub block_count: usize,

    /// ISO currency code of all amounts.
    #[serde(default)]
    pub currency: String,

    /// Processing time in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_time_ms: Option<u64>,

    /// Invoice-level fields that could not be extracted.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing_fields: Vec<String>,
}

impl InvoiceExtraction {
    /// Sum of line item subtotals, saturating at the `Decimal` bounds.
    pub fn line_items_total(&self) -> Decimal {
        self.line_items
            .iter()
            .filter_map(|i| i.subtotal)
            .fold(Decimal::ZERO, Decimal::saturating_add)
    }

    /// Check whether any warning carries the given code.
    pub fn has_warning(&self, code: WarningCode) -> bool {
        self.warnings.iter().any(|w| w.code == code)
    }
}
