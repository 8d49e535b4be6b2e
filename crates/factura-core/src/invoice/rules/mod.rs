//! Rule-based field extractors for Colombian invoices.
//!
//! Every heuristic with fallbacks is an ordered [`RuleChain`]: rules are tried in
//! order and the first one that produces a value wins. Chains are plain data, so
//! rules can be added or reordered without touching the control flow that runs them.

pub mod amounts;
pub mod dates;
pub mod header;
pub mod nit;
pub mod parties;
pub mod patterns;
pub mod products;
pub mod totals;
pub mod units;

use std::collections::BTreeMap;
use std::fmt;

use crate::blocks::ReadDocument;
use patterns::{FIELD_DISALLOWED, WHITESPACE};

pub use amounts::{format_colombian_amount, is_numeric_cell, parse_decimal};
pub use dates::{extract_date, is_ambiguous_day_month, parse_date_string, DateExtractor, DateKind};
pub use header::{extract_invoice_number, InvoiceNumberExtractor};
pub use nit::{format_nit, nit_check_digit, normalize_nit, validate_nit, NitExtractor};
pub use parties::{extract_customer, extract_supplier, PartyExtractor};
pub use products::{extract_product_code, split_item_reference};
pub use totals::{extract_payment, extract_totals, PaymentExtractor, TotalsExtractor};
pub use units::{detect_unit, unit_multiplier};

/// Trait for field extractors.
pub trait FieldExtractor {
    /// The type of value this extractor produces.
    type Output;

    /// Extract the field from the flattened document.
    fn extract(&self, doc: &ReadDocument) -> Self::Output;
}

/// Extraction context with confidence scores.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionMatch<T> {
    /// Extracted value.
    pub value: T,
    /// Confidence score (0.0 - 1.0).
    pub confidence: f32,
    /// Name of the rule that fired.
    pub rule: &'static str,
    /// Source text that was matched.
    pub source: String,
}

impl<T> ExtractionMatch<T> {
    pub fn new(value: T, confidence: f32, rule: &'static str, source: impl Into<String>) -> Self {
        Self {
            value,
            confidence,
            rule,
            source: source.into(),
        }
    }

    /// Transform the value, keeping the provenance.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ExtractionMatch<U> {
        ExtractionMatch {
            value: f(self.value),
            confidence: self.confidence,
            rule: self.rule,
            source: self.source,
        }
    }
}

type RuleFn<T> = Box<dyn Fn(&str) -> Option<T> + Send + Sync>;

/// A single named heuristic.
pub struct Rule<T> {
    name: &'static str,
    apply: RuleFn<T>,
}

impl<T> Rule<T> {
    pub fn new(name: &'static str, apply: impl Fn(&str) -> Option<T> + Send + Sync + 'static) -> Self {
        Self {
            name,
            apply: Box::new(apply),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn apply(&self, text: &str) -> Option<T> {
        (self.apply)(text)
    }
}

impl Rule<String> {
    /// Rule returning a trimmed, non-empty capture group of a regex.
    pub fn capture(name: &'static str, regex: &'static regex::Regex, group: usize) -> Self {
        Self::new(name, move |text| {
            regex
                .captures(text)
                .and_then(|caps| caps.get(group))
                .map(|m| m.as_str().trim().to_string())
                .filter(|s| !s.is_empty())
        })
    }
}

impl<T> fmt::Debug for Rule<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule").field("name", &self.name).finish()
    }
}

/// Ordered first-match-wins list of rules.
#[derive(Debug)]
pub struct RuleChain<T> {
    rules: Vec<Rule<T>>,
}

impl<T> Default for RuleChain<T> {
    fn default() -> Self {
        Self { rules: Vec::new() }
    }
}

impl<T> RuleChain<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a rule (builder style).
    pub fn rule(mut self, rule: Rule<T>) -> Self {
        self.rules.push(rule);
        self
    }

    /// Append a rule.
    pub fn push(&mut self, rule: Rule<T>) {
        self.rules.push(rule);
    }

    /// Insert a rule at a priority position (clamped to the end).
    pub fn insert(&mut self, index: usize, rule: Rule<T>) {
        let index = index.min(self.rules.len());
        self.rules.insert(index, rule);
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rule names in priority order.
    pub fn names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name).collect()
    }

    /// First value produced by any rule.
    pub fn apply(&self, text: &str) -> Option<T> {
        self.rules.iter().find_map(|r| r.apply(text))
    }

    /// First value plus the name of the rule that produced it.
    pub fn apply_named(&self, text: &str) -> Option<(&'static str, T)> {
        self.rules
            .iter()
            .find_map(|r| r.apply(text).map(|v| (r.name, v)))
    }

    /// Try each rule against every line before moving to the next rule.
    ///
    /// Rule priority therefore beats line order.
    pub fn apply_lines<'a, S: AsRef<str>>(
        &self,
        lines: &'a [S],
    ) -> Option<(&'static str, T, &'a str)> {
        self.rules.iter().find_map(|rule| {
            lines.iter().find_map(|line| {
                let line = line.as_ref();
                rule.apply(line).map(|v| (rule.name, v, line))
            })
        })
    }
}

/// Key/value lookup by exact key first, then by keyword containment.
#[derive(Debug, Clone, Copy)]
pub struct KeyLookup {
    /// Keys matched exactly (after trimming `:` and whitespace).
    pub exact: &'static [&'static str],
    /// Keywords any of which the key must contain.
    pub contains: &'static [&'static str],
    /// Keywords that disqualify a key.
    pub excludes: &'static [&'static str],
}

impl KeyLookup {
    /// Find the value for the first matching key.
    pub fn find<'a>(&self, key_values: &'a BTreeMap<String, String>) -> Option<(&'a str, &'a str)> {
        let normalized = || {
            key_values
                .iter()
                .map(|(k, v)| (normalize_key(k), k.as_str(), v.as_str()))
        };

        for wanted in self.exact {
            if let Some((_, key, value)) = normalized().find(|(k, _, _)| k == wanted) {
                return Some((key, value));
            }
        }

        normalized()
            .filter(|(k, _, _)| !self.excludes.iter().any(|x| k.contains(x)))
            .find(|(k, _, _)| self.contains.iter().any(|c| k.contains(c)))
            .map(|(_, key, value)| (key, value))
    }
}

fn normalize_key(key: &str) -> String {
    key.trim().trim_end_matches(':').trim().to_string()
}

/// Clean an invoice-level text field.
///
/// Collapses whitespace and removes characters outside word characters,
/// whitespace and `- . ( ) , :`. Returns `None` when nothing is left.
pub fn clean_field_text(text: &str) -> Option<String> {
    let stripped = FIELD_DISALLOWED.replace_all(text, "");
    let collapsed = WHITESPACE.replace_all(stripped.trim(), " ");
    let cleaned = collapsed.trim();
    (!cleaned.is_empty()).then(|| cleaned.to_string())
}

/// Collapse runs of whitespace into single spaces.
pub fn collapse_whitespace(text: &str) -> String {
    WHITESPACE.replace_all(text.trim(), " ").into_owned()
}
