//! Common regex patterns for Colombian invoice extraction.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Invoice number patterns, highest priority first
    pub static ref INVOICE_NUMBER_LABELED: Regex = Regex::new(
        r"(?i)\b(?:FACTURA|INVOICE)\b(?:\s+(?:DE\s+VENTA|ELECTR[OÓ]NICA(?:\s+DE\s+VENTA)?))?\s*(?:No\.?|N[°º]\.?|N[UÚ]MERO|#)?\s*:?\s*([A-Z0-9\-]*\d[A-Z0-9\-]*)(?:[\s,;]|$)"
    ).unwrap();

    pub static ref INVOICE_NUMBER_SHORT: Regex = Regex::new(
        r"(?i)(?:^|\s)(?:No\.|N[°º]\.?|#)\s*:?\s*([A-Z0-9\-]*\d[A-Z0-9\-]*)(?:[\s,;]|$)"
    ).unwrap();

    pub static ref INVOICE_NUMBER_PREFIXED: Regex = Regex::new(
        r"\b((?:PMB|FE|FV|SETT)-?\d{3,})\b"
    ).unwrap();

    pub static ref INVOICE_NUMBER_REFERENCE: Regex = Regex::new(
        r"(?i)\b(?:REF|REFERENCIA)\b\.?\s*:?\s*([A-Z0-9\-]*\d[A-Z0-9\-]*)"
    ).unwrap();

    // Date patterns
    pub static ref DATE_NUMERIC_DAY_FIRST: Regex = Regex::new(
        r"\b(\d{1,2}[/-]\d{1,2}[/-]\d{4})\b"
    ).unwrap();

    pub static ref DATE_NUMERIC_YEAR_FIRST: Regex = Regex::new(
        r"\b(\d{4}[/-]\d{1,2}[/-]\d{1,2})\b"
    ).unwrap();

    pub static ref DATE_SPANISH_LONG: Regex = Regex::new(
        r"(?i)\b(\d{1,2})\s+de\s+(enero|febrero|marzo|abril|mayo|junio|julio|agosto|septiembre|setiembre|octubre|noviembre|diciembre)\s+(?:de\s+|del\s+)?(\d{4})\b"
    ).unwrap();

    pub static ref DATE_PARTS: Regex = Regex::new(
        r"^\s*(\d{1,2})[/-](\d{1,2})[/-](\d{4})\s*$"
    ).unwrap();

    // Tax identifiers
    pub static ref NIT_LABELED: Regex = Regex::new(
        r"(?i)\bN\.?I\.?T\.?\s*[:.]?\s*(\d[\d.]{4,14}\d)(?:\s*-\s*(\d))?"
    ).unwrap();

    pub static ref CITIZEN_ID_LABELED: Regex = Regex::new(
        r"(?i)\b(?:C\.?C|C[EÉ]DULA)\.?\s*(?:No\.?)?\s*[:.]?\s*(\d[\d.]{4,12}\d)"
    ).unwrap();

    // Party sections and labels
    pub static ref CUSTOMER_SECTION: Regex = Regex::new(
        r"(?i)\b(?:CLIENTE|SE[ÑN]OR(?:ES)?|ADQUIRIENTE|COMPRADOR)\b"
    ).unwrap();

    pub static ref CUSTOMER_NAME: Regex = Regex::new(
        r"(?i)\b(?:CLIENTE|NOMBRE|SE[ÑN]OR(?:ES)?|ADQUIRIENTE|COMPRADOR)\b[^:]*:\s*(.+)$"
    ).unwrap();

    pub static ref ADDRESS_LABELED: Regex = Regex::new(
        r"(?i)\bDIRECCI[OÓ]N\b\s*:?\s*(.+)$"
    ).unwrap();

    pub static ref ADDRESS_STREET: Regex = Regex::new(
        r"(?i)\b((?:CALLE|CLL?|CARRERA|CRA|KRA?|AVENIDA|AV|AK|AC|DIAGONAL|DG|TRANSVERSAL|TV)\.?\s*\d+\s?[A-Z]?(?:\s+BIS)?\s*(?:#|No\.?|N[°º])\s*\d+\s?[A-Z]?\s*-\s*\d+[A-Z]?)"
    ).unwrap();

    pub static ref CITY_LABELED: Regex = Regex::new(
        r"(?i)\bCIUDAD\b\s*:?\s*([^,;:]+)"
    ).unwrap();

    pub static ref DEPARTMENT_LABELED: Regex = Regex::new(
        r"(?i)\b(?:DEPARTAMENTO|DPTO)\b\.?\s*:?\s*([^,;:]+)"
    ).unwrap();

    pub static ref PHONE_LABELED: Regex = Regex::new(
        r"(?i)\b(?:TEL[EÉ]FONOS?|TELS?|CEL(?:ULAR)?|M[OÓ]VIL)\b\.?\s*:?\s*(\+?\d[\d\s\-()]{5,}\d)"
    ).unwrap();

    pub static ref PHONE_MOBILE: Regex = Regex::new(
        r"\b(3\d{2}\s?\d{3}\s?\d{4})\b"
    ).unwrap();

    // Amounts
    pub static ref MONEY_TOKEN: Regex = Regex::new(
        r"\d[\d.,]*\d|\d"
    ).unwrap();

    pub static ref PERCENTAGE: Regex = Regex::new(
        r"(\d+(?:[.,]\d+)?)\s*%"
    ).unwrap();

    pub static ref TOTAL_ITEMS: Regex = Regex::new(
        r"(?i)\bTOTAL\s+(?:ITEMS|[IÍ]TEMS|UNIDADES|ART[IÍ]CULOS|REFERENCIAS)\b\s*:?\s*(\d+)"
    ).unwrap();

    // Payment
    pub static ref CREDIT_DAYS: Regex = Regex::new(
        r"(?i)(\d+)\s*D[IÍ]AS?\b"
    ).unwrap();

    // Line items
    pub static ref ITEM_REF_SPACE: Regex = Regex::new(
        r"^(\d+)\s+(.+)$"
    ).unwrap();

    pub static ref ITEM_REF_PUNCT: Regex = Regex::new(
        r"^(\d+)[.)]\s*(.+)$"
    ).unwrap();

    pub static ref LEADING_ORDINAL: Regex = Regex::new(
        r"^\d+\s+"
    ).unwrap();

    pub static ref CODE_PARENTHESIZED: Regex = Regex::new(
        r"(?i)\(([A-Z0-9-]+)\)"
    ).unwrap();

    pub static ref CODE_REF_PREFIX: Regex = Regex::new(
        r"(?i)REF[:\s]*([A-Z0-9-]+)"
    ).unwrap();

    pub static ref CODE_HYPHENATED: Regex = Regex::new(
        r"(?i)([A-Z0-9]{3,}-[A-Z0-9]+)"
    ).unwrap();

    pub static ref CODE_LEADING: Regex = Regex::new(
        r"(?i)^([A-Z0-9]{3,})\s"
    ).unwrap();

    pub static ref CODE_LABEL_PREFIX: Regex = Regex::new(
        r"(?i)^(?:(?:REF|C[OÓ]DIGO|COD|ITEM)\b\.?|#)\s*:?\s*"
    ).unwrap();

    pub static ref GROUPED_PACK: Regex = Regex::new(
        r"(?i)\(X(?:[7-9]|1[0-2])\)"
    ).unwrap();

    // Text cleanup
    pub static ref DESCRIPTION_DISALLOWED: Regex = Regex::new(
        r"[^\w\s()\-.]"
    ).unwrap();

    pub static ref FIELD_DISALLOWED: Regex = Regex::new(
        r"[^\w\s\-.(),:#]"
    ).unwrap();

    pub static ref WHITESPACE: Regex = Regex::new(
        r"\s+"
    ).unwrap();
}
