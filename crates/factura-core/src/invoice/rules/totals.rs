//! Totals, IVA and payment terms extraction.

use std::collections::BTreeMap;

use rust_decimal::Decimal;

use super::amounts::parse_decimal;
use super::patterns::{CREDIT_DAYS, MONEY_TOKEN, PERCENTAGE, TOTAL_ITEMS};
use super::{clean_field_text, FieldExtractor, KeyLookup};
use crate::blocks::ReadDocument;
use crate::models::invoice::{InvoiceTotals, PaymentInfo};

const SUBTOTAL_KEYS: KeyLookup = KeyLookup {
    exact: &["subtotal", "sub total", "sub-total"],
    contains: &["subtotal"],
    excludes: &[],
};

const IVA_KEYS: KeyLookup = KeyLookup {
    exact: &["iva", "valor iva", "total iva"],
    contains: &["iva"],
    excludes: &["base"],
};

const TOTAL_KEYS: KeyLookup = KeyLookup {
    exact: &["total", "total a pagar", "neto a pagar", "valor total"],
    contains: &["total a pagar", "neto a pagar"],
    excludes: &["subtotal", "iva", "items", "unidades"],
};

const PAYMENT_METHOD_KEYS: KeyLookup = KeyLookup {
    exact: &["forma de pago", "medio de pago", "condicion de pago", "condición de pago"],
    contains: &["forma de pago", "medio de pago", "condici"],
    excludes: &[],
};

/// Last amount on a line, ignoring percentages.
fn last_amount(line: &str) -> Option<Decimal> {
    let without_pct = PERCENTAGE.replace_all(line, " ");
    MONEY_TOKEN
        .find_iter(&without_pct)
        .filter_map(|m| parse_decimal(m.as_str()))
        .last()
}

/// Amount on a labeled line, or on the next line when the label stands alone.
fn labeled_amount(lines: &[String], idx: usize) -> Option<Decimal> {
    last_amount(&lines[idx]).or_else(|| {
        lines
            .get(idx + 1)
            .filter(|next| next.chars().any(|c| c.is_ascii_digit()))
            .filter(|next| !next.chars().any(char::is_alphabetic))
            .and_then(|next| last_amount(next))
    })
}

fn percentage(text: &str) -> Option<Decimal> {
    PERCENTAGE
        .captures(text)
        .and_then(|caps| parse_decimal(&caps[1].replace(',', ".")))
}

/// Extract subtotal, IVA and total.
///
/// Key/value pairs win over text lines. On text lines the last matching line
/// wins, since totals blocks print the final figures at the bottom.
pub fn extract_totals(lines: &[String], key_values: &BTreeMap<String, String>) -> InvoiceTotals {
    let mut totals = InvoiceTotals {
        subtotal: SUBTOTAL_KEYS.find(key_values).and_then(|(_, v)| last_amount(v)),
        iva_amount: IVA_KEYS.find(key_values).and_then(|(_, v)| last_amount(v)),
        total: TOTAL_KEYS.find(key_values).and_then(|(_, v)| last_amount(v)),
        iva_rate: IVA_KEYS.find(key_values).and_then(|(k, v)| percentage(k).or_else(|| percentage(v))),
        total_items: None,
    };

    let mut line_subtotal = None;
    let mut line_iva = None;
    let mut line_iva_rate = None;
    let mut line_total = None;

    for (idx, line) in lines.iter().enumerate() {
        let upper = line.to_uppercase();

        if let Some(caps) = TOTAL_ITEMS.captures(line) {
            totals.total_items = caps[1].parse().ok();
            continue;
        }

        if upper.contains("SUBTOTAL") || upper.contains("SUB TOTAL") {
            if let Some(amount) = labeled_amount(lines, idx) {
                line_subtotal = Some(amount);
            }
        } else if upper.split(|c: char| !c.is_alphanumeric()).any(|w| w == "IVA") {
            if let Some(rate) = percentage(line) {
                line_iva_rate = Some(rate);
            }
            if let Some(amount) = labeled_amount(lines, idx) {
                line_iva = Some(amount);
            }
        } else if upper.contains("TOTAL") {
            if let Some(amount) = labeled_amount(lines, idx) {
                line_total = Some(amount);
            }
        }
    }

    totals.subtotal = totals.subtotal.or(line_subtotal);
    totals.iva_amount = totals.iva_amount.or(line_iva);
    totals.iva_rate = totals.iva_rate.or(line_iva_rate);
    totals.total = totals.total.or(line_total);
    totals
}

/// Extract payment method, credit days and discount percentage.
pub fn extract_payment(lines: &[String], key_values: &BTreeMap<String, String>) -> PaymentInfo {
    let mut payment = PaymentInfo::default();

    if let Some((_, value)) = PAYMENT_METHOD_KEYS.find(key_values) {
        payment.payment_method = clean_field_text(value).map(|v| v.to_uppercase());
        payment.credit_days = CREDIT_DAYS
            .captures(value)
            .and_then(|caps| caps[1].parse().ok());
    }

    for line in lines {
        let upper = line.to_uppercase();

        if payment.payment_method.is_none() {
            if upper.contains("CREDITO") || upper.contains("CRÉDITO") {
                payment.payment_method = Some("CREDITO".to_string());
            } else if upper.contains("CONTADO") {
                payment.payment_method = Some("CONTADO".to_string());
            }
        }

        if payment.credit_days.is_none()
            && (upper.contains("CREDITO") || upper.contains("CRÉDITO") || upper.contains("PLAZO"))
        {
            payment.credit_days = CREDIT_DAYS
                .captures(line)
                .and_then(|caps| caps[1].parse().ok());
        }

        if payment.discount_percentage.is_none()
            && (upper.contains("DESCUENTO") || upper.contains("DCTO"))
        {
            payment.discount_percentage = percentage(line);
        }
    }

    payment
}

/// Totals extractor.
#[derive(Debug, Default)]
pub struct TotalsExtractor;

impl FieldExtractor for TotalsExtractor {
    type Output = InvoiceTotals;

    fn extract(&self, doc: &ReadDocument) -> Self::Output {
        extract_totals(&doc.lines, &doc.key_values)
    }
}

/// Payment terms extractor.
#[derive(Debug, Default)]
pub struct PaymentExtractor;

impl FieldExtractor for PaymentExtractor {
    type Output = PaymentInfo;

    fn extract(&self, doc: &ReadDocument) -> Self::Output {
        extract_payment(&doc.lines, &doc.key_values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn lines(texts: &[&str]) -> Vec<String> {
        texts.iter().map(|s| s.to_string()).collect()
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_extract_totals_from_lines() {
        let text = lines(&[
            "SUBTOTAL $ 1.260.000",
            "IVA 19% $ 239.400",
            "TOTAL ITEMS: 3",
            "TOTAL A PAGAR $ 1.499.400",
        ]);
        let totals = extract_totals(&text, &BTreeMap::new());

        assert_eq!(totals.subtotal, Some(dec("1260000")));
        assert_eq!(totals.iva_rate, Some(dec("19")));
        assert_eq!(totals.iva_amount, Some(dec("239400")));
        assert_eq!(totals.total, Some(dec("1499400")));
        assert_eq!(totals.total_items, Some(3));
    }

    #[test]
    fn test_extract_totals_value_on_next_line() {
        let text = lines(&["TOTAL", "$ 45.000", "GRACIAS"]);
        let totals = extract_totals(&text, &BTreeMap::new());
        assert_eq!(totals.total, Some(dec("45000")));
    }

    #[test]
    fn test_extract_totals_key_values_win() {
        let mut kv = BTreeMap::new();
        kv.insert("total a pagar:".to_string(), "$ 99.000".to_string());
        kv.insert("iva 19%".to_string(), "15.807".to_string());

        let text = lines(&["TOTAL 98.000"]);
        let totals = extract_totals(&text, &kv);

        assert_eq!(totals.total, Some(dec("99000")));
        assert_eq!(totals.iva_amount, Some(dec("15807")));
        assert_eq!(totals.iva_rate, Some(dec("19")));
    }

    #[test]
    fn test_extract_payment() {
        let text = lines(&["FORMA PAGO: CREDITO 30 DIAS", "DESCUENTO COMERCIAL 5%"]);
        let payment = extract_payment(&text, &BTreeMap::new());

        assert_eq!(payment.payment_method.as_deref(), Some("CREDITO"));
        assert_eq!(payment.credit_days, Some(30));
        assert_eq!(payment.discount_percentage, Some(dec("5")));
    }

    #[test]
    fn test_extract_payment_from_key_value() {
        let mut kv = BTreeMap::new();
        kv.insert("forma de pago:".to_string(), "Contado".to_string());

        let payment = extract_payment(&[], &kv);
        assert_eq!(payment.payment_method.as_deref(), Some("CONTADO"));
        assert_eq!(payment.credit_days, None);
    }
}
