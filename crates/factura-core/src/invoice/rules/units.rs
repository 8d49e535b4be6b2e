//! Unit of measure detection and conversion factors.

use lazy_static::lazy_static;
use regex::Regex;

use super::patterns::GROUPED_PACK;
use super::{Rule, RuleChain};
use crate::models::invoice::{UNIT_EACH, UNIT_PIECES};

/// Unit codes a line item may carry.
pub const CANONICAL_UNITS: [&str; 9] = [UNIT_EACH, UNIT_PIECES, "DOC", "PAR", "GRS", "KG", "G", "L", "ML"];

lazy_static! {
    static ref PAIR_WORD: Regex = Regex::new(r"\(X2\)|\b(?:PARES|PAR|PAIR)\b").unwrap();
    static ref DOZEN_WORD: Regex = Regex::new(r"\b(?:DOCENAS?|DOC|DOZEN|X12)\b").unwrap();
    static ref GROSS_WORD: Regex = Regex::new(r"\(X144\)|\b(?:GRUESAS?|GRS|GROSS)\b").unwrap();
    static ref KILO_WORD: Regex = Regex::new(r"\b(?:KILOGRAMOS?|KILOS?|KGS?)\b").unwrap();
    static ref GRAM_WORD: Regex = Regex::new(r"\b(?:GRAMOS?|GR)\b").unwrap();
    static ref LITER_WORD: Regex = Regex::new(r"\b(?:LITROS?|LTS?)\b").unwrap();
    static ref MILLILITER_WORD: Regex = Regex::new(r"\b(?:MILILITROS?|ML)\b").unwrap();

    /// Unit detection rules over upper-cased description text, first match wins.
    pub static ref UNIT_RULES: RuleChain<&'static str> = RuleChain::new()
        .rule(unit_rule("grouped_pack", &GROUPED_PACK, "DOC"))
        .rule(unit_rule("pair", &PAIR_WORD, "PAR"))
        .rule(unit_rule("dozen", &DOZEN_WORD, "DOC"))
        .rule(unit_rule("gross", &GROSS_WORD, "GRS"))
        .rule(unit_rule("kilogram", &KILO_WORD, "KG"))
        .rule(unit_rule("gram", &GRAM_WORD, "G"))
        .rule(unit_rule("liter", &LITER_WORD, "L"))
        .rule(unit_rule("milliliter", &MILLILITER_WORD, "ML"));
}

fn unit_rule(name: &'static str, regex: &'static Regex, unit: &'static str) -> Rule<&'static str> {
    Rule::new(name, move |text| regex.is_match(text).then_some(unit))
}

/// Detect the unit of measure from a description; `UND` when nothing matches.
pub fn detect_unit(text: &str) -> &'static str {
    UNIT_RULES.apply(&text.to_uppercase()).unwrap_or(UNIT_EACH)
}

/// Map a cell that holds only a unit name to its code.
pub fn canonical_unit(text: &str) -> Option<&'static str> {
    let unit = match text.trim().trim_end_matches('.').to_uppercase().as_str() {
        "DOC" | "DOCENA" | "DOCENAS" | "DZ" => "DOC",
        "PAR" | "PARES" => "PAR",
        "GRS" | "GRUESA" | "GRUESAS" => "GRS",
        "UND" | "UN" | "UNID" | "UNIDAD" | "UNIDADES" => UNIT_EACH,
        "PCS" | "PZ" | "PIEZA" | "PIEZAS" => UNIT_PIECES,
        "KG" | "KILO" | "KILOS" | "KILOGRAMO" | "KILOGRAMOS" => "KG",
        "G" | "GR" | "GRAMO" | "GRAMOS" => "G",
        "L" | "LT" | "LITRO" | "LITROS" => "L",
        "ML" | "MILILITRO" | "MILILITROS" => "ML",
        _ => return None,
    };
    Some(unit)
}

/// Pieces per unit: DOC/DOCENA=12, PAR/PARES=2, GRS/GRUESA=144, anything else 1.
pub fn unit_multiplier(unit: &str) -> u32 {
    match unit.trim().to_uppercase().as_str() {
        "DOC" | "DOCENA" | "DOCENAS" => 12,
        "PAR" | "PARES" => 2,
        "GRS" | "GRUESA" | "GRUESAS" => 144,
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_unit_grouped_pack_means_dozen() {
        assert_eq!(detect_unit("CHANCLA RAJADO DAMA 36-40 (X7)(8 BUENO)"), "DOC");
        assert_eq!(detect_unit("MEDIA TOBILLERA (X12)"), "DOC");
        assert_eq!(detect_unit("MEDIA TOBILLERA (X6)"), "UND");
    }

    #[test]
    fn test_detect_unit_keywords() {
        assert_eq!(detect_unit("tenis running par"), "PAR");
        assert_eq!(detect_unit("BALACA (X2)"), "PAR");
        assert_eq!(detect_unit("PINZAS DOCENA"), "DOC");
        assert_eq!(detect_unit("BOTONES GRUESA"), "GRS");
        assert_eq!(detect_unit("ARROZ 5 KG"), "KG");
        assert_eq!(detect_unit("SHAMPOO 400 ML"), "ML");
    }

    #[test]
    fn test_detect_unit_is_word_bounded() {
        assert_eq!(detect_unit("GORRA PARA SOL"), "UND");
        assert_eq!(detect_unit("DOCUMENTO LEGAL"), "UND");
        assert_eq!(detect_unit("GRANDE"), "UND");
        assert_eq!(detect_unit("LAMPARA"), "UND");
    }

    #[test]
    fn test_canonical_unit() {
        assert_eq!(canonical_unit(" Docena "), Some("DOC"));
        assert_eq!(canonical_unit("UND."), Some("UND"));
        assert_eq!(canonical_unit("CHANCLA"), None);
    }

    #[test]
    fn test_unit_multiplier_table() {
        assert_eq!(unit_multiplier("DOC"), 12);
        assert_eq!(unit_multiplier("docena"), 12);
        assert_eq!(unit_multiplier("PARES"), 2);
        assert_eq!(unit_multiplier("GRS"), 144);
        for unit in ["PCS", "UND", "UNIDAD", "PIEZA", "KG", "G", "L", "ML"] {
            assert_eq!(unit_multiplier(unit), 1);
        }
    }
}
