//! Invoice number extraction.

use std::collections::BTreeMap;

use lazy_static::lazy_static;

use super::patterns::{
    INVOICE_NUMBER_LABELED, INVOICE_NUMBER_PREFIXED, INVOICE_NUMBER_REFERENCE, INVOICE_NUMBER_SHORT,
};
use super::{clean_field_text, ExtractionMatch, FieldExtractor, KeyLookup, Rule, RuleChain};
use crate::blocks::ReadDocument;

const INVOICE_NUMBER_KEYS: KeyLookup = KeyLookup {
    exact: &["factura", "invoice", "numero", "número", "no.", "#"],
    contains: &["factura", "invoice", "numero", "número"],
    excludes: &["fecha", "venc", "date", "valor", "total"],
};

lazy_static! {
    /// Free-text invoice number rules, highest priority first.
    pub static ref INVOICE_NUMBER_RULES: RuleChain<String> = RuleChain::new()
        .rule(Rule::capture("labeled", &INVOICE_NUMBER_LABELED, 1))
        .rule(Rule::capture("short_label", &INVOICE_NUMBER_SHORT, 1))
        .rule(Rule::capture("prefixed", &INVOICE_NUMBER_PREFIXED, 1))
        .rule(Rule::capture("reference", &INVOICE_NUMBER_REFERENCE, 1));
}

/// Extract the invoice number: key/value lookup first, then the rule chain over lines.
pub fn extract_invoice_number(
    lines: &[String],
    key_values: &BTreeMap<String, String>,
) -> Option<ExtractionMatch<String>> {
    if let Some((key, value)) = INVOICE_NUMBER_KEYS.find(key_values) {
        if let Some(number) = clean_invoice_number(value) {
            return Some(ExtractionMatch::new(number, 0.95, "key_value", key));
        }
    }

    let (rule, value, line) = INVOICE_NUMBER_RULES.apply_lines(lines)?;
    let number = clean_invoice_number(&value)?;
    Some(ExtractionMatch::new(number, 0.85, rule, line))
}

fn clean_invoice_number(raw: &str) -> Option<String> {
    let cleaned = clean_field_text(raw)?;
    let token = cleaned
        .trim_start_matches(|c: char| c == ':' || c == '#' || c.is_whitespace())
        .trim_end_matches(['.', ',', ':']);
    (!token.is_empty()).then(|| token.to_string())
}

/// Invoice number extractor.
#[derive(Debug, Default)]
pub struct InvoiceNumberExtractor;

impl FieldExtractor for InvoiceNumberExtractor {
    type Output = Option<ExtractionMatch<String>>;

    fn extract(&self, doc: &ReadDocument) -> Self::Output {
        extract_invoice_number(&doc.lines, &doc.key_values)
    }
}
