//! Post-extraction enhancement of line items.
//!
//! Items run through [`stages::STAGES`] in order. A stage failure leaves that
//! item exactly as it was before enhancement and records a warning; the other
//! items are unaffected.

pub mod stages;

use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::models::config::EnhancementConfig;
use crate::models::invoice::{ExtractionWarning, InvoiceExtraction, LineItem, WarningCode};
use stages::{StageContext, STAGES};

/// Line item enhancer.
#[derive(Debug, Clone, Default)]
pub struct DataEnhancer {
    config: EnhancementConfig,
}

impl DataEnhancer {
    pub fn new(config: EnhancementConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EnhancementConfig {
        &self.config
    }

    /// Run every stage on one item at a 1-based position.
    ///
    /// On failure the untouched item is returned with an `EnhancementFailed` warning.
    pub fn enhance_item(&self, item: LineItem, position: u32) -> (LineItem, Option<ExtractionWarning>) {
        let ctx = StageContext {
            position,
            config: &self.config,
        };

        let original = item.clone();
        let result = STAGES.iter().try_fold(item, |item, (name, stage)| {
            stage(item, &ctx).map_err(|e| (*name, e))
        });

        match result {
            Ok(enhanced) => (enhanced, None),
            Err((stage, e)) => {
                warn!("Enhancement of item {} failed in {}: {}", position, stage, e);
                let warning = ExtractionWarning::for_line(
                    WarningCode::EnhancementFailed,
                    position as usize,
                    format!("enhancement failed in {}: {}", stage, e),
                );
                (original, Some(warning))
            }
        }
    }

    /// Enhance all items in order; positions follow list order.
    pub fn enhance_items(&self, items: Vec<LineItem>) -> (Vec<LineItem>, Vec<ExtractionWarning>) {
        let mut warnings = Vec::new();
        let items = items
            .into_iter()
            .enumerate()
            .map(|(i, item)| {
                let (item, warning) = self.enhance_item(item, i as u32 + 1);
                warnings.extend(warning);
                item
            })
            .collect();
        (items, warnings)
    }

    /// Validation warnings for enhanced items.
    pub fn validate_items(&self, items: &[LineItem]) -> Vec<ExtractionWarning> {
        let mut warnings = Vec::new();

        for (i, item) in items.iter().enumerate() {
            let line = i + 1;

            if item.description.as_deref().is_none_or(|d| d.trim().is_empty()) {
                warnings.push(ExtractionWarning::for_line(
                    WarningCode::MissingDescription,
                    line,
                    "missing description",
                ));
            }

            match item.quantity {
                Some(q) if q > Decimal::ZERO => {}
                Some(q) => warnings.push(ExtractionWarning::for_line(
                    WarningCode::InvalidQuantity,
                    line,
                    format!("invalid quantity {}", q),
                )),
                None => warnings.push(ExtractionWarning::for_line(
                    WarningCode::InvalidQuantity,
                    line,
                    "missing quantity",
                )),
            }

            match item.unit_price {
                Some(p) if p > Decimal::ZERO => {}
                Some(p) => warnings.push(ExtractionWarning::for_line(
                    WarningCode::InvalidUnitPrice,
                    line,
                    format!("invalid unit price {}", p),
                )),
                None => warnings.push(ExtractionWarning::for_line(
                    WarningCode::InvalidUnitPrice,
                    line,
                    "missing unit price",
                )),
            }

            if item.unit_multiplier > self.config.suspicious_multiplier {
                warnings.push(ExtractionWarning::for_line(
                    WarningCode::SuspiciousConversion,
                    line,
                    format!(
                        "suspicious unit conversion x{} from {}",
                        item.unit_multiplier,
                        item.original_unit.as_deref().unwrap_or("?")
                    ),
                ));
            }

            if item.recalculated {
                warnings.push(ExtractionWarning::for_line(
                    WarningCode::SubtotalRecalculated,
                    line,
                    format!(
                        "subtotal recalculated to {}",
                        item.subtotal.unwrap_or_default()
                    ),
                ));
            }
        }

        warnings
    }

    /// Enhance an extraction in place and append all warnings.
    pub fn enhance(&self, invoice: &mut InvoiceExtraction) {
        let items = std::mem::take(&mut invoice.line_items);
        let (items, mut warnings) = self.enhance_items(items);
        warnings.extend(self.validate_items(&items));

        if let Some(total) = invoice.totals.total {
            if total <= Decimal::ZERO {
                warnings.push(ExtractionWarning::new(
                    WarningCode::InvalidTotal,
                    format!("invalid invoice total {}", total),
                ));
            }
        }

        debug!(
            "Enhanced {} line items with {} warnings",
            items.len(),
            warnings.len()
        );
        invoice.line_items = items;
        invoice.warnings.extend(warnings);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::invoice::{EnhancementApplied, UNIT_PIECES};
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn item(code: &str, unit: &str, quantity: &str, price: &str) -> LineItem {
        let mut item = LineItem::new(0);
        item.product_code = Some(code.to_string());
        item.description = Some(format!("PRODUCTO {}", code));
        item.unit_measure = unit.to_string();
        item.quantity = Some(dec(quantity));
        item.unit_price = Some(dec(price));
        item
    }

    #[test]
    fn test_enhance_item_full_pipeline() {
        let enhancer = DataEnhancer::default();
        let mut input = item("1 049 (DAMA)", "DOC", "2", "120000");
        input.subtotal = Some(dec("240000"));

        let (out, warning) = enhancer.enhance_item(input, 1);
        assert!(warning.is_none());
        assert_eq!(out.item_number, 1);
        assert_eq!(out.product_code.as_deref(), Some("049 (DAMA)"));
        assert_eq!(out.unit_measure, UNIT_PIECES);
        assert_eq!(out.quantity, Some(dec("24")));
        assert_eq!(out.unit_price, Some(dec("10000")));
        assert_eq!(out.subtotal, Some(dec("240000")));
        assert!(!out.recalculated);
        assert_eq!(
            out.enhancement_applied,
            Some(EnhancementApplied::UnitConverted { from: "DOC".to_string() })
        );
    }

    #[test]
    fn test_enhance_twice_does_not_double_convert() {
        let enhancer = DataEnhancer::default();
        let (once, _) = enhancer.enhance_item(item("A-1", "DOC", "1", "60000"), 1);
        let (twice, _) = enhancer.enhance_item(once.clone(), 1);

        assert_eq!(once, twice);
        assert_eq!(twice.quantity, Some(dec("12")));
        assert_eq!(twice.unit_multiplier, 12);
    }

    #[test]
    fn test_failed_item_kept_unchanged() {
        let enhancer = DataEnhancer::default();
        let mut bad = item("2 X-9", "UND", "1", "1");
        bad.quantity = Some(Decimal::MAX);
        bad.unit_price = Some(Decimal::MAX);
        let good = item("B-2", "PAR", "3", "20000");

        let (items, warnings) = enhancer.enhance_items(vec![good, bad.clone()]);

        assert_eq!(items[1], bad);
        assert_eq!(items[0].quantity, Some(dec("6")));
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].code, WarningCode::EnhancementFailed);
        assert_eq!(warnings[0].line, Some(2));
    }

    #[test]
    fn test_oversized_price_isolated_to_its_item() {
        let enhancer = DataEnhancer::default();
        let mut bad = item("H-1", "UND", "1", "1");
        bad.unit_price = Some(Decimal::from_scientific("1e27").unwrap());
        bad.subtotal = Some(Decimal::ONE);
        let good = item("B-2", "UND", "2", "15000");

        let (items, warnings) = enhancer.enhance_items(vec![bad.clone(), good]);

        assert_eq!(items[0], bad);
        assert_eq!(items[1].subtotal, Some(dec("30000")));
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].code, WarningCode::EnhancementFailed);
        assert_eq!(warnings[0].line, Some(1));
    }

    #[test]
    fn test_subtotal_reconciliation_warns() {
        let enhancer = DataEnhancer::default();
        let mut input = item("C-3", "UND", "12", "5000");
        input.subtotal = Some(dec("50000"));

        let mut invoice = InvoiceExtraction {
            line_items: vec![input],
            ..Default::default()
        };
        enhancer.enhance(&mut invoice);

        let enhanced = &invoice.line_items[0];
        assert_eq!(enhanced.subtotal, Some(dec("60000")));
        assert!(enhanced.recalculated);
        assert_eq!(invoice.warnings.len(), 1);
        assert_eq!(invoice.warnings[0].code, WarningCode::SubtotalRecalculated);
        assert_eq!(invoice.warnings[0].line, Some(1));
    }

    #[test]
    fn test_validation_warnings() {
        let enhancer = DataEnhancer::new(EnhancementConfig {
            suspicious_multiplier: 10,
            ..Default::default()
        });
        let mut missing = LineItem::new(1);
        missing.unit_price = Some(dec("-5"));
        let gross = item("D-4", "GRS", "1", "144000");

        let mut invoice = InvoiceExtraction {
            line_items: vec![missing, gross],
            ..Default::default()
        };
        invoice.totals.total = Some(Decimal::ZERO);
        enhancer.enhance(&mut invoice);

        let codes: Vec<WarningCode> = invoice.warnings.iter().map(|w| w.code).collect();
        assert_eq!(
            codes,
            vec![
                WarningCode::MissingDescription,
                WarningCode::InvalidQuantity,
                WarningCode::InvalidUnitPrice,
                WarningCode::SuspiciousConversion,
                WarningCode::InvalidTotal,
            ]
        );
        assert_eq!(invoice.warnings[3].line, Some(2));
    }
}
