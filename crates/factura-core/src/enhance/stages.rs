//! Line item enhancement stages.
//!
//! Each stage takes an item by value and returns the transformed item, so every
//! stage can be run and tested on its own.

use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::error::EnhancementError;
use crate::invoice::rules::collapse_whitespace;
use crate::invoice::rules::patterns::{CODE_LABEL_PREFIX, DESCRIPTION_DISALLOWED};
use crate::invoice::rules::{split_item_reference, unit_multiplier};
use crate::models::config::EnhancementConfig;
use crate::models::invoice::{EnhancementApplied, LineItem, UNIT_PIECES};

/// Per-item input shared by all stages.
#[derive(Debug, Clone, Copy)]
pub struct StageContext<'a> {
    /// 1-based row position of the item.
    pub position: u32,
    pub config: &'a EnhancementConfig,
}

/// A single enhancement step.
pub type Stage = fn(LineItem, &StageContext<'_>) -> Result<LineItem, EnhancementError>;

/// Stages in the order they run.
pub const STAGES: [(&str, Stage); 4] = [
    ("separate_item_reference", separate_item_reference),
    ("convert_units", convert_units),
    ("clean_text", clean_text),
    ("reconcile_subtotal", reconcile_subtotal),
];

/// Split a leading ordinal off the product code when it equals the row position.
///
/// `item_number` is always set to the row position.
pub fn separate_item_reference(
    mut item: LineItem,
    ctx: &StageContext<'_>,
) -> Result<LineItem, EnhancementError> {
    let split = item
        .product_code
        .as_deref()
        .and_then(split_item_reference)
        .filter(|(number, _)| *number == ctx.position);

    if let Some((number, code)) = split {
        debug!("Item {}: separated ordinal from code {:?}", number, code);
        item.product_code = Some(code);
        item.enhancement_applied = Some(EnhancementApplied::ItemRefSeparated);
    }
    item.item_number = ctx.position;
    Ok(item)
}

/// Rescale grouped units (dozens, pairs, gross) into pieces.
///
/// Already-converted items carry a canonical unit with multiplier 1 and are left
/// untouched. An arithmetic failure keeps the item unconverted.
pub fn convert_units(
    mut item: LineItem,
    ctx: &StageContext<'_>,
) -> Result<LineItem, EnhancementError> {
    let multiplier = unit_multiplier(&item.unit_measure);
    if multiplier <= 1 {
        if item.enhancement_applied.is_none() {
            item.enhancement_applied = Some(EnhancementApplied::UnitAlreadyIndividual {
                unit: item.unit_measure.clone(),
            });
        }
        return Ok(item);
    }

    let factor = Decimal::from(multiplier);
    let quantity = match item.quantity.map(|q| q.checked_mul(factor)) {
        Some(None) => {
            warn!("Item {}: quantity overflow converting {}, keeping original unit", ctx.position, item.unit_measure);
            return Ok(item);
        }
        converted => converted.flatten(),
    };
    let unit_price = match item.unit_price.map(|p| p.checked_div(factor)) {
        Some(None) => {
            warn!("Item {}: price rescale failed converting {}, keeping original unit", ctx.position, item.unit_measure);
            return Ok(item);
        }
        converted => converted.flatten(),
    };

    debug!(
        "Item {}: converted {} x{} to {}",
        ctx.position, item.unit_measure, multiplier, UNIT_PIECES
    );

    let from = std::mem::replace(&mut item.unit_measure, UNIT_PIECES.to_string());
    item.original_quantity = item.quantity;
    item.original_unit_price = item.unit_price;
    item.original_unit = Some(from.clone());
    item.quantity = quantity;
    item.unit_price = unit_price;
    item.unit_multiplier = multiplier;
    item.enhancement_applied = Some(EnhancementApplied::UnitConverted { from });
    Ok(item)
}

/// Collapse whitespace, strip code labels and drop stray description characters.
pub fn clean_text(
    mut item: LineItem,
    _ctx: &StageContext<'_>,
) -> Result<LineItem, EnhancementError> {
    item.product_code = item.product_code.and_then(|code| {
        let code = collapse_whitespace(&code);
        let code = CODE_LABEL_PREFIX.replace(&code, "");
        let code = code.trim();
        (!code.is_empty()).then(|| code.to_string())
    });

    item.description = item.description.and_then(|desc| {
        let desc = collapse_whitespace(&DESCRIPTION_DISALLOWED.replace_all(&desc, ""));
        (!desc.is_empty()).then_some(desc)
    });

    Ok(item)
}

/// Fill in or correct the subtotal from `quantity × unit_price`.
pub fn reconcile_subtotal(
    mut item: LineItem,
    ctx: &StageContext<'_>,
) -> Result<LineItem, EnhancementError> {
    let (Some(quantity), Some(unit_price)) = (item.quantity, item.unit_price) else {
        return Ok(item);
    };

    let computed = quantity
        .checked_mul(unit_price)
        .ok_or_else(|| EnhancementError::Arithmetic {
            field: "subtotal".to_string(),
            reason: format!("{} x {} overflows", quantity, unit_price),
        })?
        .round_dp(ctx.config.money_scale);

    match item.subtotal {
        None => item.subtotal = Some(computed),
        Some(stated) if exceeds_tolerance(stated, computed, ctx.config.subtotal_tolerance_percent)? => {
            debug!(
                "Item {}: subtotal {} replaced by computed {}",
                ctx.position, stated, computed
            );
            item.subtotal = Some(computed);
            item.recalculated = true;
        }
        Some(_) => {}
    }
    Ok(item)
}

/// Relative gap is measured against the computed subtotal.
fn exceeds_tolerance(
    stated: Decimal,
    computed: Decimal,
    tolerance_percent: Decimal,
) -> Result<bool, EnhancementError> {
    if computed.is_zero() {
        return Ok(!stated.is_zero());
    }
    let overflow = || EnhancementError::Arithmetic {
        field: "subtotal".to_string(),
        reason: format!("gap between {} and {} overflows", stated, computed),
    };

    let gap = stated
        .checked_sub(computed)
        .and_then(|gap| gap.abs().checked_mul(Decimal::ONE_HUNDRED))
        .ok_or_else(overflow)?;
    let allowed = computed
        .abs()
        .checked_mul(tolerance_percent)
        .ok_or_else(overflow)?;
    Ok(gap > allowed)
}
