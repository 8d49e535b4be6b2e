//! Amount parsing for Colombian invoices.
//!
//! Colombian documents write `1.234.567,89` (dot thousands, comma decimals) but
//! OCR output and foreign suppliers mix in `1,234,567.89`; both are accepted.

use rust_decimal::Decimal;
use std::str::FromStr;

/// Parse a money or quantity string into an exact decimal.
///
/// Currency symbols (`$`, `COP`) and whitespace are stripped. When both `.` and
/// `,` occur the rightmost is the decimal separator. A separator repeated several
/// times is a decimal point only if the last group has exactly two digits. A single
/// separator followed by exactly three digits is a thousands separator
/// (`"50.000"` is fifty thousand). Anything else unparseable yields `None`.
pub fn parse_decimal(text: &str) -> Option<Decimal> {
    let mut s: String = text
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '$')
        .collect();

    for code in ["COP", "cop"] {
        if let Some(rest) = s.strip_prefix(code) {
            s = rest.to_string();
        }
        if let Some(rest) = s.strip_suffix(code) {
            s = rest.to_string();
        }
    }

    let (negative, digits) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.as_str()),
    };

    let starts_with_digit = digits.chars().next().is_some_and(|c| c.is_ascii_digit());
    let ends_with_digit = digits.chars().last().is_some_and(|c| c.is_ascii_digit());
    if !starts_with_digit || !ends_with_digit {
        return None;
    }
    if !digits.chars().all(|c| c.is_ascii_digit() || c == '.' || c == ',') {
        return None;
    }

    let normalized = normalize_separators(digits)?;
    let value = Decimal::from_str(&normalized).ok()?;
    Some(if negative { -value } else { value })
}

fn normalize_separators(s: &str) -> Option<String> {
    let dots = s.matches('.').count();
    let commas = s.matches(',').count();

    match (dots, commas) {
        (0, 0) => Some(s.to_string()),
        (d, c) if d > 0 && c > 0 => {
            let last_dot = s.rfind('.')?;
            let last_comma = s.rfind(',')?;
            let (decimal, thousands, decimal_count) = if last_dot > last_comma {
                ('.', ',', d)
            } else {
                (',', '.', c)
            };
            if decimal_count > 1 {
                return None;
            }
            Some(
                s.chars()
                    .filter(|ch| *ch != thousands)
                    .map(|ch| if ch == decimal { '.' } else { ch })
                    .collect(),
            )
        }
        (d, c) => {
            let (sep, count) = if d > 0 { ('.', d) } else { (',', c) };
            let last = s.rfind(sep)?;
            let integer_part = &s[..last];
            let last_group = &s[last + 1..];

            let last_is_decimal = if count > 1 {
                last_group.len() == 2
            } else {
                !(last_group.len() == 3 && integer_part != "0")
            };

            if last_is_decimal {
                let integer: String = integer_part.chars().filter(|ch| *ch != sep).collect();
                Some(format!("{}.{}", integer, last_group))
            } else {
                Some(s.chars().filter(|ch| *ch != sep).collect())
            }
        }
    }
}

/// Check whether a table cell holds a number.
///
/// `$`, whitespace, `,` and `.` are removed before the check, so formatted
/// amounts such as `$ 105.000` count as numeric.
pub fn is_numeric_cell(text: &str) -> bool {
    let cleaned: String = text
        .chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '$' | ',' | '.'))
        .collect();
    let body = cleaned.trim_start_matches(['-', '+']);

    body.chars().next().is_some_and(|c| c.is_ascii_digit())
        && cleaned.parse::<f64>().is_ok_and(f64::is_finite)
}

/// Group an integer digit string with `.` every three digits.
pub fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push('.');
        }
        out.push(ch);
    }
    out
}

/// Format an amount the Colombian way: `1.234.567,89`.
///
/// Integral amounts are printed without decimals.
pub fn format_colombian_amount(amount: Decimal) -> String {
    let rounded = amount.round_dp(2).normalize();
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let abs = rounded.abs();

    let text = abs.to_string();
    let (integer, fraction) = match text.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (text.as_str(), None),
    };

    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.push_str(&group_thousands(integer));
    if let Some(fraction) = fraction {
        out.push(',');
        out.push_str(fraction);
        if fraction.len() == 1 {
            out.push('0');
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_parse_decimal_mixed_separators() {
        assert_eq!(parse_decimal("1.234.567,89"), Some(dec("1234567.89")));
        assert_eq!(parse_decimal("1,234,567.89"), Some(dec("1234567.89")));
        assert_eq!(parse_decimal("$ 1.234,5"), Some(dec("1234.5")));
    }

    #[test]
    fn test_parse_decimal_thousands_only() {
        assert_eq!(parse_decimal("50.000"), Some(dec("50000")));
        assert_eq!(parse_decimal("105.000"), Some(dec("105000")));
        assert_eq!(parse_decimal("1.234.567"), Some(dec("1234567")));
        assert_eq!(parse_decimal("1,234"), Some(dec("1234")));
        assert_eq!(parse_decimal("COP 2.500.000"), Some(dec("2500000")));
    }

    #[test]
    fn test_parse_decimal_single_decimal_separator() {
        assert_eq!(parse_decimal("1234,56"), Some(dec("1234.56")));
        assert_eq!(parse_decimal("12.50"), Some(dec("12.50")));
        assert_eq!(parse_decimal("0.500"), Some(dec("0.5")));
        assert_eq!(parse_decimal("1.5"), Some(dec("1.5")));
        assert_eq!(parse_decimal("1.234.56"), Some(dec("1234.56")));
    }

    #[test]
    fn test_parse_decimal_plain_and_negative() {
        assert_eq!(parse_decimal("  42 "), Some(dec("42")));
        assert_eq!(parse_decimal("-6.200"), Some(dec("-6200")));
        assert_eq!(parse_decimal("0"), Some(Decimal::ZERO));
    }

    #[test]
    fn test_parse_decimal_rejects_garbage() {
        assert_eq!(parse_decimal(""), None);
        assert_eq!(parse_decimal("$"), None);
        assert_eq!(parse_decimal("abc"), None);
        assert_eq!(parse_decimal("12 UND"), None);
        assert_eq!(parse_decimal("1.2.3,4,5"), None);
        assert_eq!(parse_decimal(".5"), None);
    }

    #[test]
    fn test_is_numeric_cell() {
        assert!(is_numeric_cell("12"));
        assert!(is_numeric_cell("$ 105.000"));
        assert!(is_numeric_cell("1,234.50"));
        assert!(!is_numeric_cell("DOC"));
        assert!(!is_numeric_cell("36-40"));
        assert!(!is_numeric_cell(""));
        assert!(!is_numeric_cell("nan"));
    }

    #[test]
    fn test_format_colombian_amount() {
        assert_eq!(format_colombian_amount(dec("1234567.89")), "1.234.567,89");
        assert_eq!(format_colombian_amount(dec("105000")), "105.000");
        assert_eq!(format_colombian_amount(dec("999")), "999");
        assert_eq!(format_colombian_amount(dec("8750.5")), "8.750,50");
        assert_eq!(format_colombian_amount(dec("-45000")), "-45.000");
    }
}
