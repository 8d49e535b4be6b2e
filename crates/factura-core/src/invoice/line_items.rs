//! Line item interpretation from tables and text lines.

use rust_decimal::Decimal;
use tracing::debug;

use super::rules::amounts::{is_numeric_cell, parse_decimal};
use super::rules::products::{clean_reference, extract_product_code};
use super::rules::units::{canonical_unit, detect_unit};
use crate::blocks::{ReadDocument, Table};
use crate::models::invoice::{LineItem, LineItemSource, UNIT_EACH};

/// Maximum relative gap (percent) between `quantity × price` and the subtotal
/// for a free-text line to be accepted as an item.
const TEXT_LINE_TOLERANCE_PERCENT: i64 = 5;

/// Words marking summary lines that are never items.
const SUMMARY_WORDS: [&str; 3] = ["SUBTOTAL", "TOTAL", "IVA"];

/// Line items and where they came from.
#[derive(Debug, Clone, Default)]
pub struct LineItemInterpretation {
    pub items: Vec<LineItem>,
    pub source: LineItemSource,
}

/// Interpret the line items of a document.
///
/// The largest table is read first; when it yields nothing, text lines are
/// tried. No placeholder item is ever produced.
pub fn interpret_line_items(doc: &ReadDocument) -> LineItemInterpretation {
    if let Some(table) = doc.largest_table() {
        let items = items_from_table(table);
        if !items.is_empty() {
            debug!("Interpreted {} line items from a {}x{} table", items.len(), table.row_count, table.col_count);
            return LineItemInterpretation {
                items,
                source: LineItemSource::Table,
            };
        }
    }

    let items = items_from_lines(&doc.lines);
    if !items.is_empty() {
        debug!("Interpreted {} line items from text lines", items.len());
        return LineItemInterpretation {
            items,
            source: LineItemSource::TextLines,
        };
    }

    LineItemInterpretation::default()
}

/// Items from the data rows of a table (header row skipped).
pub fn items_from_table(table: &Table) -> Vec<LineItem> {
    table
        .data_rows()
        .filter_map(|(position, row)| {
            let item = parse_row(row, position);
            if item.is_none() {
                debug!("Discarding table row {}: {:?}", position, row);
            }
            item
        })
        .collect()
}

/// Items from free-text lines holding at least three trailing numbers.
pub fn items_from_lines(lines: &[String]) -> Vec<LineItem> {
    lines
        .iter()
        .filter(|line| !is_summary_line(line))
        .filter_map(|line| {
            let tokens: Vec<&str> = line.split_whitespace().collect();
            if !tokens.last().is_some_and(|t| is_numeric_cell(t)) {
                return None;
            }
            parse_numeric_row(&tokens, 0)
        })
        .filter(amounts_agree)
        .enumerate()
        .map(|(i, mut item)| {
            item.item_number = i as u32 + 1;
            item
        })
        .collect()
}

fn is_summary_line(line: &str) -> bool {
    let upper = line.to_uppercase();
    upper
        .split(|c: char| !c.is_alphanumeric())
        .any(|word| SUMMARY_WORDS.contains(&word))
}

fn amounts_agree(item: &LineItem) -> bool {
    let (Some(qty), Some(price), Some(subtotal)) = (item.quantity, item.unit_price, item.subtotal)
    else {
        return false;
    };
    let Some(computed) = qty.checked_mul(price) else {
        return false;
    };
    if computed.is_zero() {
        return false;
    }
    let gap = computed
        .checked_sub(subtotal)
        .and_then(|diff| diff.abs().checked_mul(Decimal::ONE_HUNDRED))
        .and_then(|scaled| scaled.checked_div(computed));
    gap.is_some_and(|gap| gap <= Decimal::from(TEXT_LINE_TOLERANCE_PERCENT))
}

/// Parse one table row at a 1-based data position.
///
/// Returns `None` unless the row yields a description, a positive quantity and
/// a positive unit price.
pub fn parse_row<S: AsRef<str>>(row: &[S], position: usize) -> Option<LineItem> {
    let grid: Vec<&str> = row.iter().map(|c| c.as_ref().trim()).collect();

    let numeric_count = grid.iter().filter(|c| is_numeric_cell(c)).count();
    if numeric_count >= 3 {
        let cells: Vec<&str> = grid.into_iter().filter(|c| !c.is_empty()).collect();
        parse_numeric_row(&cells, position)
    } else {
        parse_fixed_columns(&grid, position)
    }
}

/// Last three numeric cells are quantity, unit price and subtotal; everything
/// before the quantity is description text.
fn parse_numeric_row(cells: &[&str], position: usize) -> Option<LineItem> {
    let numeric: Vec<usize> = cells
        .iter()
        .enumerate()
        .filter(|(_, c)| is_numeric_cell(c))
        .map(|(i, _)| i)
        .collect();
    let [qty_idx, price_idx, subtotal_idx] = numeric[numeric.len().checked_sub(3)?..] else {
        return None;
    };

    let mut unit_cell = None;
    let mut parts: Vec<&str> = Vec::new();
    for cell in &cells[..qty_idx] {
        match canonical_unit(cell) {
            Some(unit) => unit_cell = Some(unit),
            None => parts.push(*cell),
        }
    }
    if unit_cell.is_none() {
        unit_cell = cells[qty_idx + 1..subtotal_idx]
            .iter()
            .find_map(|c| canonical_unit(c));
    }

    let mut item = LineItem::new(position as u32);
    let mut text = parts.join(" ");

    if let Some((first, rest)) = split_first_token(&text) {
        if first.chars().all(|c| c.is_ascii_digit()) {
            if let Ok(ordinal) = first.parse::<u32>() {
                item.item_number = ordinal;
            }
            text = rest.to_string();
        }
    }

    item.reference = parts.first().and_then(|first| {
        if first.chars().all(|c| c.is_ascii_digit()) {
            parts.get(1).and_then(|next| clean_reference(next))
        } else {
            clean_reference(first)
        }
    });

    let description = text.trim();
    if !description.is_empty() {
        item.description = Some(description.to_string());
        item.product_code = extract_product_code(description);
    }
    item.unit_measure = resolve_unit(description, unit_cell);
    item.quantity = parse_decimal(cells[qty_idx]);
    item.unit_price = parse_decimal(cells[price_idx]);
    item.subtotal = parse_decimal(cells[subtotal_idx]);

    item.is_complete().then_some(item)
}

/// Fallback mapping over grid positions: 0=code, 1=description, 2=quantity, 3=price.
///
/// Empty cells keep their position; an empty code cell leaves `product_code` unset.
fn parse_fixed_columns(cells: &[&str], position: usize) -> Option<LineItem> {
    if cells.len() < 4 {
        return None;
    }

    let mut item = LineItem::new(position as u32);
    if !cells[0].is_empty() {
        item.product_code = Some(cells[0].to_string());
        item.reference = clean_reference(cells[0]);
    }
    item.description = (!cells[1].is_empty()).then(|| cells[1].to_string());
    item.quantity = parse_decimal(cells[2]);
    item.unit_price = parse_decimal(cells[3]);
    item.subtotal = match (item.quantity, item.unit_price) {
        (Some(q), Some(p)) => q.checked_mul(p),
        _ => None,
    };
    let unit_cell = cells.iter().find_map(|c| canonical_unit(c));
    item.unit_measure = resolve_unit(cells[1], unit_cell);

    item.is_complete().then_some(item)
}

fn resolve_unit(description: &str, unit_cell: Option<&'static str>) -> String {
    match detect_unit(description) {
        UNIT_EACH => unit_cell.unwrap_or(UNIT_EACH).to_string(),
        unit => unit.to_string(),
    }
}

fn split_first_token(text: &str) -> Option<(&str, &str)> {
    let text = text.trim_start();
    if text.is_empty() {
        return None;
    }
    Some(match text.split_once(char::is_whitespace) {
        Some((first, rest)) => (first, rest.trim_start()),
        None => (text, ""),
    })
}
