//! Supplier and customer extraction.
//!
//! Lines before the first customer marker (CLIENTE, SEÑORES, ...) belong to the
//! supplier header; the marker line and everything after it to the customer block.

use std::collections::BTreeMap;

use lazy_static::lazy_static;

use super::nit::NitExtractor;
use super::patterns::{
    ADDRESS_LABELED, ADDRESS_STREET, CITIZEN_ID_LABELED, CITY_LABELED, CUSTOMER_NAME,
    CUSTOMER_SECTION, DEPARTMENT_LABELED, NIT_LABELED, PHONE_LABELED, PHONE_MOBILE,
};
use super::{clean_field_text, FieldExtractor, KeyLookup, Rule, RuleChain};
use crate::blocks::ReadDocument;
use crate::models::invoice::{CustomerInfo, SupplierInfo};

/// Markers of a registered company name.
const COMPANY_MARKERS: [&str; 7] = ["LTDA", "S.A.S", "SAS", "S.A.", "E.U.", "EMPRESA", "COMERCIAL"];

/// Company names shorter than this are ignored.
const MIN_COMPANY_NAME_LEN: usize = 10;

const SUPPLIER_NAME_KEYS: KeyLookup = KeyLookup {
    exact: &["razon social", "razón social", "proveedor", "empresa"],
    contains: &["proveedor", "vendedor", "emisor"],
    excludes: &["nit"],
};

const CUSTOMER_NAME_KEYS: KeyLookup = KeyLookup {
    exact: &["cliente", "nombre", "señor(es)", "señores", "adquiriente"],
    contains: &["cliente", "señor", "adquiriente", "comprador"],
    excludes: &["nit", "c.c", "cedula", "cédula", "tel", "direcc", "ciudad"],
};

const CUSTOMER_ID_KEYS: KeyLookup = KeyLookup {
    exact: &["nit cliente", "c.c", "cc", "c.c. / nit", "nit/c.c", "cedula", "cédula"],
    contains: &["identificaci", "cedula", "cédula", "c.c"],
    excludes: &[],
};

lazy_static! {
    static ref ADDRESS_RULES: RuleChain<String> = RuleChain::new()
        .rule(Rule::capture("labeled", &ADDRESS_LABELED, 1))
        .rule(Rule::capture("street", &ADDRESS_STREET, 1));

    static ref CITY_RULES: RuleChain<String> = RuleChain::new()
        .rule(Rule::capture("labeled", &CITY_LABELED, 1));

    static ref DEPARTMENT_RULES: RuleChain<String> = RuleChain::new()
        .rule(Rule::capture("labeled", &DEPARTMENT_LABELED, 1));

    static ref PHONE_RULES: RuleChain<String> = RuleChain::new()
        .rule(Rule::capture("labeled", &PHONE_LABELED, 1))
        .rule(Rule::capture("mobile", &PHONE_MOBILE, 1));

    static ref COMPANY_NAME_RULES: RuleChain<String> = RuleChain::new()
        .rule(Rule::new("company_marker", company_name_from_line));
}

fn company_name_from_line(line: &str) -> Option<String> {
    let upper = line.to_uppercase();
    if line.trim().chars().count() <= MIN_COMPANY_NAME_LEN {
        return None;
    }
    if !COMPANY_MARKERS.iter().any(|m| upper.contains(m)) {
        return None;
    }
    let before_nit = match NIT_LABELED.find(line) {
        Some(m) => &line[..m.start()],
        None => line,
    };
    clean_field_text(before_nit).filter(|n| n.chars().count() > MIN_COMPANY_NAME_LEN)
}

/// Split lines into the supplier header and the customer block.
pub fn split_sections(lines: &[String]) -> (&[String], &[String]) {
    match lines.iter().position(|l| CUSTOMER_SECTION.is_match(l)) {
        Some(idx) => lines.split_at(idx),
        None => (lines, &[]),
    }
}

fn first_clean<S: AsRef<str>>(chain: &RuleChain<String>, lines: &[S]) -> Option<String> {
    chain
        .apply_lines(lines)
        .and_then(|(_, value, _)| clean_field_text(&value))
}

fn normalize_phone(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit() || *c == '+').collect();
    (digits.chars().filter(char::is_ascii_digit).count() >= 7).then_some(digits)
}

/// Extract the supplier block.
pub fn extract_supplier(
    lines: &[String],
    key_values: &BTreeMap<String, String>,
    validate_nit: bool,
) -> SupplierInfo {
    let (header, _) = split_sections(lines);
    let nits = NitExtractor::new().with_validation(validate_nit);

    let company_name = SUPPLIER_NAME_KEYS
        .find(key_values)
        .and_then(|(_, v)| clean_field_text(v))
        .or_else(|| first_clean(&COMPANY_NAME_RULES, header));

    let nit = nits
        .first_in(header)
        .or_else(|| nits.first_in(lines))
        .map(|m| m.value);

    SupplierInfo {
        company_name,
        nit,
        address: first_clean(&ADDRESS_RULES, header),
        city: first_clean(&CITY_RULES, header),
        department: first_clean(&DEPARTMENT_RULES, header),
        phone: PHONE_RULES
            .apply_lines(header)
            .and_then(|(_, v, _)| normalize_phone(&v)),
    }
}

/// Extract the customer block.
pub fn extract_customer(
    lines: &[String],
    key_values: &BTreeMap<String, String>,
    validate_nit: bool,
) -> CustomerInfo {
    let (_, block) = split_sections(lines);
    // Without a customer marker only explicitly labeled names are trusted.
    let name_lines = if block.is_empty() { lines } else { block };

    let customer_name = CUSTOMER_NAME_KEYS
        .find(key_values)
        .and_then(|(_, v)| clean_field_text(v))
        .or_else(|| {
            name_lines.iter().find_map(|l| {
                CUSTOMER_NAME
                    .captures(l)
                    .and_then(|caps| clean_field_text(&caps[1]))
            })
        });

    let nits = NitExtractor::new().with_validation(validate_nit);
    let customer_id = CUSTOMER_ID_KEYS
        .find(key_values)
        .and_then(|(_, v)| clean_field_text(v))
        .or_else(|| nits.first_in(block).map(|m| m.value))
        .or_else(|| {
            block.iter().find_map(|l| {
                CITIZEN_ID_LABELED
                    .captures(l)
                    .map(|caps| caps[1].chars().filter(char::is_ascii_digit).collect())
            })
        });

    CustomerInfo {
        customer_name,
        customer_id,
        address: first_clean(&ADDRESS_RULES, block),
        city: first_clean(&CITY_RULES, block),
        department: first_clean(&DEPARTMENT_RULES, block),
        phone: PHONE_RULES
            .apply_lines(block)
            .and_then(|(_, v, _)| normalize_phone(&v)),
    }
}

/// Supplier and customer extractor.
pub struct PartyExtractor {
    validate_nit: bool,
}

impl PartyExtractor {
    pub fn new(validate_nit: bool) -> Self {
        Self { validate_nit }
    }
}

impl FieldExtractor for PartyExtractor {
    type Output = (SupplierInfo, CustomerInfo);

    fn extract(&self, doc: &ReadDocument) -> Self::Output {
        (
            extract_supplier(&doc.lines, &doc.key_values, self.validate_nit),
            extract_customer(&doc.lines, &doc.key_values, self.validate_nit),
        )
    }
}
