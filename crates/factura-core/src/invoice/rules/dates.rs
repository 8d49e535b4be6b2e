//! Date extraction for Colombian invoices.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use lazy_static::lazy_static;

use super::patterns::{DATE_NUMERIC_DAY_FIRST, DATE_NUMERIC_YEAR_FIRST, DATE_PARTS, DATE_SPANISH_LONG};
use super::{ExtractionMatch, FieldExtractor, KeyLookup, Rule, RuleChain};
use crate::blocks::ReadDocument;

/// Accepted numeric formats, in priority order. Day-first wins over month-first.
pub const DATE_FORMATS: [&str; 6] = [
    "%d/%m/%Y", "%d-%m-%Y", "%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%m-%d-%Y",
];

lazy_static! {
    static ref DATE_FORMAT_CHAIN: RuleChain<NaiveDate> = DATE_FORMATS
        .iter()
        .fold(RuleChain::new(), |chain, &format| {
            chain.rule(Rule::new(format, move |text| {
                NaiveDate::parse_from_str(text, format).ok()
            }))
        })
        .rule(Rule::new("spanish_long", parse_spanish_long));

    static ref DATE_TEXT_CHAIN: RuleChain<String> = RuleChain::new()
        .rule(Rule::capture("numeric_day_first", &DATE_NUMERIC_DAY_FIRST, 1))
        .rule(Rule::capture("numeric_year_first", &DATE_NUMERIC_YEAR_FIRST, 1))
        .rule(Rule::new("spanish_long", |text| {
            DATE_SPANISH_LONG.find(text).map(|m| m.as_str().to_string())
        }));
}

/// Which invoice date to look for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateKind {
    /// Issue date (fecha de emisión / fecha factura).
    Issue,
    /// Due date (fecha de vencimiento).
    Due,
}

impl DateKind {
    /// Key lookup for this date in the key/value pairs.
    fn lookup(&self) -> KeyLookup {
        match self {
            DateKind::Issue => KeyLookup {
                exact: &["fecha", "date", "fecha factura", "fecha de emision", "fecha de emisión", "fecha emision"],
                contains: &["fecha", "date"],
                excludes: &["venc", "due", "pago", "limite", "límite"],
            },
            DateKind::Due => KeyLookup {
                exact: &["vencimiento", "fecha_vencimiento", "fecha de vencimiento", "fecha vencimiento", "due date"],
                contains: &["venc", "due", "limite de pago", "límite de pago"],
                excludes: &[],
            },
        }
    }

    /// Check whether a free-text line is labeled with this date.
    fn labels(&self, line: &str) -> bool {
        let lower = line.to_lowercase();
        match self {
            DateKind::Issue => {
                (lower.contains("fecha") || lower.contains("date"))
                    && !lower.contains("venc")
                    && !lower.contains("due")
            }
            DateKind::Due => lower.contains("venc") || lower.contains("due"),
        }
    }
}

/// Parse a date string against the known formats; first that parses wins.
pub fn parse_date_string(text: &str) -> Option<NaiveDate> {
    DATE_FORMAT_CHAIN.apply(text.trim())
}

/// Check whether a `a/b/yyyy` string reads differently day-first and month-first.
pub fn is_ambiguous_day_month(text: &str) -> bool {
    let Some(caps) = DATE_PARTS.captures(text) else {
        return false;
    };
    let first: u32 = caps[1].parse().unwrap_or(0);
    let second: u32 = caps[2].parse().unwrap_or(0);
    (1..=12).contains(&first) && (1..=12).contains(&second) && first != second
}

fn parse_spanish_long(text: &str) -> Option<NaiveDate> {
    let caps = DATE_SPANISH_LONG.captures(text)?;
    let day: u32 = caps[1].parse().ok()?;
    let month = spanish_month_to_number(&caps[2])?;
    let year: i32 = caps[3].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

fn spanish_month_to_number(month: &str) -> Option<u32> {
    let number = match month.to_lowercase().as_str() {
        "enero" => 1,
        "febrero" => 2,
        "marzo" => 3,
        "abril" => 4,
        "mayo" => 5,
        "junio" => 6,
        "julio" => 7,
        "agosto" => 8,
        "septiembre" | "setiembre" => 9,
        "octubre" => 10,
        "noviembre" => 11,
        "diciembre" => 12,
        _ => return None,
    };
    Some(number)
}

/// Extract one invoice date: key/value lookup first, then labeled text lines.
///
/// The match source keeps the raw date text so callers can check for
/// day/month ambiguity.
pub fn extract_date(
    lines: &[String],
    key_values: &BTreeMap<String, String>,
    kind: DateKind,
) -> Option<ExtractionMatch<NaiveDate>> {
    if let Some((_, value)) = kind.lookup().find(key_values) {
        let raw = DATE_TEXT_CHAIN.apply(value).unwrap_or_else(|| value.trim().to_string());
        if let Some(date) = parse_date_string(&raw) {
            return Some(ExtractionMatch::new(date, 0.95, "key_value", raw));
        }
    }

    lines
        .iter()
        .filter(|line| kind.labels(line))
        .find_map(|line| {
            let (rule, raw) = DATE_TEXT_CHAIN.apply_named(line)?;
            let date = parse_date_string(&raw)?;
            Some(ExtractionMatch::new(date, 0.85, rule, raw))
        })
}

/// Date field extractor.
pub struct DateExtractor {
    kind: DateKind,
}

impl DateExtractor {
    pub fn new(kind: DateKind) -> Self {
        Self { kind }
    }
}

impl FieldExtractor for DateExtractor {
    type Output = Option<ExtractionMatch<NaiveDate>>;

    fn extract(&self, doc: &ReadDocument) -> Self::Output {
        extract_date(&doc.lines, &doc.key_values, self.kind)
    }
}
