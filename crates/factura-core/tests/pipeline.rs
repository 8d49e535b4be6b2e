//! End-to-end extraction over OCR block graphs.

use factura_core::models::invoice::EnhancementApplied;
use factura_core::{
    BlockGraph, ExtractionError, InvoiceExtractor, InvoiceParser, LineItemSource, WarningCode,
};
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use serde_json::{json, Value};

/// Builds a block graph the way the OCR service lays it out: a PAGE holding
/// LINE blocks, one TABLE of CELLs and KEY/VALUE sets, with text carried by
/// WORD children.
#[derive(Default)]
struct GraphBuilder {
    blocks: Vec<Value>,
    page_children: Vec<String>,
    next_id: usize,
}

impl GraphBuilder {
    fn id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}-{}", prefix, self.next_id)
    }

    fn words(&mut self, text: &str) -> Vec<String> {
        text.split_whitespace()
            .map(|word| {
                let id = self.id("word");
                self.blocks.push(json!({
                    "Id": id,
                    "BlockType": "WORD",
                    "Text": word,
                    "Confidence": 99.1
                }));
                id
            })
            .collect()
    }

    fn line(self, text: &str) -> Self {
        self.line_with_confidence(text, 98.5)
    }

    fn line_with_confidence(mut self, text: &str, confidence: f32) -> Self {
        let words = self.words(text);
        let id = self.id("line");
        self.blocks.push(json!({
            "Id": id,
            "BlockType": "LINE",
            "Text": text,
            "Confidence": confidence,
            "Relationships": [{ "Type": "CHILD", "Ids": words }]
        }));
        self.page_children.push(id);
        self
    }

    fn table(mut self, rows: &[&[&str]]) -> Self {
        let mut cells = Vec::new();
        for (r, row) in rows.iter().enumerate() {
            for (c, text) in row.iter().enumerate() {
                let words = self.words(text);
                let id = self.id("cell");
                self.blocks.push(json!({
                    "Id": id,
                    "BlockType": "CELL",
                    "RowIndex": r + 1,
                    "ColumnIndex": c + 1,
                    "Confidence": 95.0,
                    "Relationships": [{ "Type": "CHILD", "Ids": words }]
                }));
                cells.push(id);
            }
        }
        let id = self.id("table");
        self.blocks.push(json!({
            "Id": id,
            "BlockType": "TABLE",
            "Relationships": [{ "Type": "CHILD", "Ids": cells }]
        }));
        self.page_children.push(id);
        self
    }

    fn key_value(mut self, key: &str, value: &str) -> Self {
        let value_words = self.words(value);
        let value_id = self.id("value");
        self.blocks.push(json!({
            "Id": value_id,
            "BlockType": "KEY_VALUE_SET",
            "EntityTypes": ["VALUE"],
            "Relationships": [{ "Type": "CHILD", "Ids": value_words }]
        }));

        let key_words = self.words(key);
        let key_id = self.id("key");
        self.blocks.push(json!({
            "Id": key_id,
            "BlockType": "KEY_VALUE_SET",
            "EntityTypes": ["KEY"],
            "Relationships": [
                { "Type": "CHILD", "Ids": key_words },
                { "Type": "VALUE", "Ids": [value_id] }
            ]
        }));
        self.page_children.push(key_id);
        self
    }

    fn json(self) -> String {
        let mut blocks = vec![json!({
            "Id": "page-1",
            "BlockType": "PAGE",
            "Relationships": [{ "Type": "CHILD", "Ids": self.page_children }]
        })];
        blocks.extend(self.blocks);
        json!({ "Blocks": blocks }).to_string()
    }

    fn build(self) -> BlockGraph {
        BlockGraph::from_json(&self.json()).unwrap()
    }
}

fn header() -> GraphBuilder {
    GraphBuilder::default()
        .line("DISTRIBUIDORA CASOLI S.A.S.")
        .line("NIT: 900.123.456-8")
        .line("FACTURA DE VENTA No. PMB4471")
        .line("FECHA: 15/03/2024")
        .line("FECHA VENCIMIENTO: 14/04/2024")
        .line("CLIENTE: ALMACEN LA 14")
}

fn dec(v: i64) -> Decimal {
    Decimal::from(v)
}

#[test]
fn test_full_invoice_with_unit_conversions() {
    let graph = header()
        .table(&[
            &["ITEM", "DESCRIPCION", "CANT", "UND", "VR UNIT", "VR TOTAL"],
            &["1", "CHANCLA DAMA 36-40", "2", "DOC", "120.000", "240.000"],
            &["2", "TENIS RUNNING", "3", "PAR", "80.000", "240.000"],
            &["3", "GORRA PLANA", "5", "UND", "15.000", "75.000"],
        ])
        .line("SUBTOTAL $ 555.000")
        .line("IVA 19% $ 105.450")
        .line("TOTAL A PAGAR $ 660.450")
        .build();

    let result = InvoiceParser::new().extract(&graph).unwrap();
    let invoice = &result.invoice;

    assert_eq!(invoice.invoice_number.as_deref(), Some("PMB4471"));
    assert_eq!(invoice.issue_date, chrono::NaiveDate::from_ymd_opt(2024, 3, 15));
    assert_eq!(invoice.due_date, chrono::NaiveDate::from_ymd_opt(2024, 4, 14));
    assert_eq!(invoice.supplier.nit.as_deref(), Some("900123456-8"));
    assert_eq!(invoice.totals.subtotal, Some(dec(555_000)));
    assert_eq!(invoice.totals.iva_rate, Some(dec(19)));
    assert_eq!(invoice.totals.iva_amount, Some(dec(105_450)));
    assert_eq!(invoice.totals.total, Some(dec(660_450)));

    assert_eq!(invoice.metadata.line_item_source, LineItemSource::Table);
    assert_eq!(invoice.metadata.block_count, graph.len());
    assert!(invoice.metadata.missing_fields.is_empty());
    assert!(result.warnings().is_empty(), "warnings: {:?}", result.warnings());

    let items = &invoice.line_items;
    assert_eq!(items.len(), 3);

    assert_eq!(items[0].item_number, 1);
    assert_eq!(items[0].description.as_deref(), Some("CHANCLA DAMA 36-40"));
    assert_eq!(items[0].quantity, Some(dec(24)));
    assert_eq!(items[0].unit_price, Some(dec(10_000)));
    assert_eq!(items[0].unit_multiplier, 12);
    assert_eq!(items[0].original_unit.as_deref(), Some("DOC"));
    assert_eq!(items[0].original_quantity, Some(dec(2)));

    assert_eq!(items[1].quantity, Some(dec(6)));
    assert_eq!(items[1].unit_price, Some(dec(40_000)));
    assert_eq!(items[1].unit_multiplier, 2);

    assert_eq!(items[2].quantity, Some(dec(5)));
    assert_eq!(items[2].unit_multiplier, 1);
    assert!(matches!(
        items[2].enhancement_applied,
        Some(EnhancementApplied::UnitAlreadyIndividual { .. })
    ));

    assert_eq!(invoice.line_items_total(), dec(555_000));
}

#[test]
fn test_subtotal_reconciled_against_quantity_and_price() {
    let graph = header()
        .table(&[
            &["DESCRIPCION", "CANT", "VR UNIT", "VR TOTAL"],
            &["GORRA PLANA", "12", "5.000", "50.000"],
        ])
        .line("TOTAL A PAGAR $ 60.000")
        .build();

    let invoice = InvoiceParser::new().extract(&graph).unwrap().invoice;

    let item = &invoice.line_items[0];
    assert_eq!(item.subtotal, Some(dec(60_000)));
    assert!(item.recalculated);
    assert!(invoice.has_warning(WarningCode::SubtotalRecalculated));
}

#[test]
fn test_text_lines_used_without_table() {
    let graph = header()
        .line("TEL: 604 444 1234")
        .line("CORREA CUERO NEGRA 2 35.000 70.000")
        .line("BILLETERA DAMA 1 48.000 48.000")
        .line("TOTAL A PAGAR $ 118.000")
        .build();

    let invoice = InvoiceParser::new().extract(&graph).unwrap().invoice;

    assert_eq!(invoice.metadata.line_item_source, LineItemSource::TextLines);
    assert_eq!(invoice.line_items.len(), 2);
    assert_eq!(invoice.line_items[0].description.as_deref(), Some("CORREA CUERO NEGRA"));
    assert_eq!(invoice.line_items[1].item_number, 2);
    assert!(!invoice.has_warning(WarningCode::NoLineItems));
}

#[test]
fn test_no_line_items_is_a_warning_not_an_error() {
    let graph = header().line("TOTAL A PAGAR $ 60.000").build();

    let invoice = InvoiceParser::new().extract(&graph).unwrap().invoice;

    assert!(invoice.line_items.is_empty());
    assert_eq!(invoice.metadata.line_item_source, LineItemSource::NotFound);
    assert!(invoice.has_warning(WarningCode::NoLineItems));
    assert_eq!(invoice.invoice_number.as_deref(), Some("PMB4471"));
}

#[test]
fn test_key_values_take_priority_over_lines() {
    let graph = GraphBuilder::default()
        .line("FACTURA DE VENTA No. PMB4471")
        .line("FECHA: 20/03/2024")
        .key_value("No. Factura:", "FE-9981")
        .key_value("Fecha de emisión:", "18/03/2024")
        .build();

    let result = InvoiceParser::new().extract(&graph).unwrap();

    assert_eq!(
        result.document.key_values.get("no. factura:").map(String::as_str),
        Some("FE-9981")
    );
    assert_eq!(result.invoice.invoice_number.as_deref(), Some("FE-9981"));
    assert_eq!(result.invoice.issue_date, chrono::NaiveDate::from_ymd_opt(2024, 3, 18));
}

#[test]
fn test_low_confidence_lines_are_dropped() {
    let graph = GraphBuilder::default()
        .line_with_confidence("FACTURA DE VENTA No. PMB4471", 40.0)
        .line("FECHA: 15/03/2024")
        .build();

    let strict = InvoiceParser::new()
        .with_min_block_confidence(80.0)
        .extract(&graph)
        .unwrap();
    assert_eq!(strict.invoice.invoice_number, None);
    assert!(strict.invoice.metadata.missing_fields.contains(&"invoice_number".to_string()));

    let lenient = InvoiceParser::new().extract(&graph).unwrap();
    assert_eq!(lenient.invoice.invoice_number.as_deref(), Some("PMB4471"));
}

#[test]
fn test_dangling_relationships_are_tolerated() {
    let json = json!({
        "Blocks": [
            { "Id": "p", "BlockType": "PAGE", "Relationships": [{ "Type": "CHILD", "Ids": ["l1", "ghost"] }] },
            { "Id": "l1", "BlockType": "LINE", "Text": "FACTURA No. PMB4471", "Relationships": [{ "Type": "CHILD", "Ids": ["missing-word"] }] },
            { "Id": "k1", "BlockType": "KEY_VALUE_SET", "EntityTypes": ["KEY"], "Relationships": [{ "Type": "VALUE", "Ids": ["nowhere"] }] },
            { "Id": "x", "BlockType": "SELECTION_ELEMENT" }
        ]
    })
    .to_string();

    let result = InvoiceParser::new().extract_from_json(&json).unwrap();
    assert_eq!(result.invoice.invoice_number.as_deref(), Some("PMB4471"));
    assert!(result.document.key_values.is_empty());
}

#[test]
fn test_graph_without_page_is_malformed() {
    let json = json!([
        { "Id": "l1", "BlockType": "LINE", "Text": "FACTURA No. PMB4471" }
    ])
    .to_string();

    let err = InvoiceParser::new().extract_from_json(&json).unwrap_err();
    assert!(matches!(err, ExtractionError::MalformedGraph(_)));
}

#[test]
fn test_extraction_serializes_to_json() {
    let graph = header()
        .table(&[
            &["DESCRIPCION", "CANT", "VR UNIT", "VR TOTAL"],
            &["GORRA PLANA", "5", "15.000", "75.000"],
        ])
        .line("TOTAL A PAGAR $ 75.000")
        .build();

    let invoice = InvoiceParser::new().extract(&graph).unwrap().invoice;
    let value = serde_json::to_value(&invoice).unwrap();

    assert_eq!(value["invoice_number"], "PMB4471");
    assert_eq!(value["metadata"]["currency"], "COP");
    assert!(value["line_items"].is_array());
}
