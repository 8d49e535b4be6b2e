//! NIT (Colombian tax identification number) extraction and validation.

use super::patterns::NIT_LABELED;
use super::{ExtractionMatch, FieldExtractor};
use crate::blocks::ReadDocument;

/// DIAN weights, applied from the rightmost digit of the base number.
const NIT_WEIGHTS: [u32; 15] = [3, 7, 13, 17, 19, 23, 29, 37, 41, 43, 47, 53, 59, 67, 71];

/// NIT field extractor.
pub struct NitExtractor {
    validate: bool,
}

impl NitExtractor {
    /// Create a new NIT extractor.
    pub fn new() -> Self {
        Self { validate: true }
    }

    /// Set whether to discard NITs with a wrong check digit.
    pub fn with_validation(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }

    /// All labeled NITs in one line of text.
    pub fn extract_all(&self, text: &str) -> Vec<ExtractionMatch<String>> {
        let mut results = Vec::new();

        for caps in NIT_LABELED.captures_iter(text) {
            let base: String = caps[1].chars().filter(char::is_ascii_digit).collect();
            let check = caps.get(2).map(|m| m.as_str());

            let confidence = match check {
                Some(dv) if nit_check_digit(&base).map(|d| d.to_string()).as_deref() == Some(dv) => 0.95,
                Some(_) if self.validate => continue,
                Some(_) => 0.5,
                None => 0.8,
            };

            results.push(ExtractionMatch::new(
                normalize_nit(&base, check),
                confidence,
                "nit_labeled",
                &caps[0],
            ));
        }

        results
    }

    /// First NIT found scanning the lines in order.
    pub fn first_in<S: AsRef<str>>(&self, lines: &[S]) -> Option<ExtractionMatch<String>> {
        lines
            .iter()
            .find_map(|line| self.extract_all(line.as_ref()).into_iter().next())
    }
}

impl Default for NitExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for NitExtractor {
    type Output = Option<ExtractionMatch<String>>;

    fn extract(&self, doc: &ReadDocument) -> Self::Output {
        self.first_in(&doc.lines)
    }
}

/// Compute the DIAN check digit for a NIT base number.
///
/// Non-digits are ignored. Returns `None` for an empty or over-long base.
pub fn nit_check_digit(base: &str) -> Option<u32> {
    let digits: Vec<u32> = base.chars().filter_map(|c| c.to_digit(10)).collect();
    if digits.is_empty() || digits.len() > NIT_WEIGHTS.len() {
        return None;
    }

    let sum: u32 = digits
        .iter()
        .rev()
        .zip(NIT_WEIGHTS.iter())
        .map(|(d, w)| d * w)
        .sum();

    let remainder = sum % 11;
    Some(if remainder > 1 { 11 - remainder } else { remainder })
}

/// Validate a NIT written with its check digit (`900.123.456-8`).
pub fn validate_nit(nit: &str) -> bool {
    let Some((base, check)) = nit.rsplit_once('-') else {
        return false;
    };
    let check = check.trim();
    if check.len() != 1 {
        return false;
    }
    match (nit_check_digit(base), check.chars().next().and_then(|c| c.to_digit(10))) {
        (Some(expected), Some(actual)) => expected == actual,
        _ => false,
    }
}

/// Canonical `digits-checkdigit` form, or bare digits when no check digit was printed.
pub fn normalize_nit(base: &str, check: Option<&str>) -> String {
    let digits: String = base.chars().filter(char::is_ascii_digit).collect();
    match check {
        Some(dv) => format!("{}-{}", digits, dv.trim()),
        None => digits,
    }
}

/// Format a NIT with dot grouping (`900.123.456-8`).
pub fn format_nit(nit: &str) -> String {
    let (base, check) = match nit.rsplit_once('-') {
        Some((b, c)) => (b, Some(c)),
        None => (nit, None),
    };
    let digits: String = base.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return nit.to_string();
    }

    let grouped = super::amounts::group_thousands(&digits);
    match check {
        Some(dv) => format!("{}-{}", grouped, dv.trim()),
        None => grouped,
    }
}
