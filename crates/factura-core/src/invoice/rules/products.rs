//! Product code and item ordinal rules.

use lazy_static::lazy_static;

use super::patterns::{
    CODE_HYPHENATED, CODE_LEADING, CODE_PARENTHESIZED, CODE_REF_PREFIX, ITEM_REF_PUNCT,
    ITEM_REF_SPACE, LEADING_ORDINAL,
};
use super::{Rule, RuleChain};

/// Fallback product code length, in characters.
const FALLBACK_CODE_CHARS: usize = 20;

lazy_static! {
    /// Product code rules over a description, first match wins.
    pub static ref PRODUCT_CODE_RULES: RuleChain<String> = RuleChain::new()
        .rule(Rule::capture("parenthesized", &CODE_PARENTHESIZED, 1))
        .rule(Rule::capture("ref_prefix", &CODE_REF_PREFIX, 1))
        .rule(Rule::capture("hyphenated", &CODE_HYPHENATED, 1))
        .rule(Rule::capture("leading_token", &CODE_LEADING, 1));

    /// Leading ordinal separators (`"1 049"`, `"1. 049"`, `"1) 049"`).
    pub static ref ITEM_REF_RULES: RuleChain<(u32, String)> = RuleChain::new()
        .rule(item_ref_rule("space", &ITEM_REF_SPACE))
        .rule(item_ref_rule("punctuation", &ITEM_REF_PUNCT));
}

fn item_ref_rule(name: &'static str, regex: &'static regex::Regex) -> Rule<(u32, String)> {
    Rule::new(name, move |text| {
        let caps = regex.captures(text.trim())?;
        let number: u32 = caps[1].parse().ok()?;
        let rest = caps[2].trim();
        (!rest.is_empty()).then(|| (number, rest.to_string()))
    })
}

/// Extract a product code from a description.
///
/// Falls back to the first 20 characters when no rule matches; `None` only for
/// an empty description.
pub fn extract_product_code(description: &str) -> Option<String> {
    let description = description.trim();
    if description.is_empty() {
        return None;
    }

    PRODUCT_CODE_RULES
        .apply(description)
        .or_else(|| Some(description.chars().take(FALLBACK_CODE_CHARS).collect::<String>().trim().to_string()))
}

/// Split a leading ordinal off a code (`"1 049 (DAMA)"` gives `(1, "049 (DAMA)")`).
pub fn split_item_reference(code: &str) -> Option<(u32, String)> {
    ITEM_REF_RULES.apply(code)
}

/// Remove a leading ordinal from a reference cell; `None` when nothing is left.
pub fn clean_reference(raw: &str) -> Option<String> {
    let cleaned = LEADING_ORDINAL.replace(raw.trim(), "");
    let cleaned = cleaned.trim();
    (!cleaned.is_empty()).then(|| cleaned.to_string())
}
