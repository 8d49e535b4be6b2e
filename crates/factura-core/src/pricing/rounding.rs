//! Colombian retail price rounding and price utilities.
//!
//! Tiers:
//! - price >= 10.000: up to the next 1.000
//! - 1.000 <= price < 10.000: nearest 500
//! - 100 <= price < 1.000: nearest 100
//! - price < 100: nearest 50
//!
//! Ties round away from zero. Prices too close to `Decimal::MAX` to round up
//! are rounded down to their tier instead.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::invoice::rules::amounts::group_thousands;

/// Margin below which a price is flagged as too thin.
const MIN_HEALTHY_MARGIN: i64 = 15;

/// Margin above which a price is flagged as too high.
const MAX_HEALTHY_MARGIN: i64 = 200;

/// Rounding step for the tier a price falls in.
pub fn tier_step(price: Decimal) -> Decimal {
    if price >= Decimal::from(10_000) {
        Decimal::from(1_000)
    } else if price >= Decimal::from(1_000) {
        Decimal::from(500)
    } else if price >= Decimal::ONE_HUNDRED {
        Decimal::ONE_HUNDRED
    } else {
        Decimal::from(50)
    }
}

/// Round a price to the Colombian retail tiers. Non-positive prices give zero.
pub fn round_colombian(price: Decimal) -> Decimal {
    if price <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    let step = tier_step(price);
    let units = price / step;
    let units = if price >= Decimal::from(10_000) {
        units.ceil()
    } else {
        units.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
    };
    snap(price, step, units)
}

/// Smallest multiple of the tier step that is `>= price`.
pub fn round_up_to_tier(price: Decimal) -> Decimal {
    let step = tier_step(price);
    snap(price, step, (price / step).ceil())
}

/// Largest multiple of the tier step that is `<= price`.
pub fn round_down_to_tier(price: Decimal) -> Decimal {
    let step = tier_step(price);
    snap(price, step, (price / step).floor())
}

/// `units × step`, or the tier floor of `price` when that overflows.
fn snap(price: Decimal, step: Decimal, units: Decimal) -> Decimal {
    units
        .checked_mul(step)
        .or_else(|| (price / step).floor().checked_mul(step))
        .unwrap_or(price)
        .normalize()
}

/// Format a price for display: `$ 45.000`.
pub fn format_colombian_price(price: Decimal) -> String {
    let whole = price
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .normalize();
    let digits = whole.abs().to_string();
    let sign = if whole.is_sign_negative() && !whole.is_zero() { "-" } else { "" };
    format!("{}$ {}", sign, group_thousands(&digits))
}

/// Margin of a sale price over cost, in percent (2 decimals). `None` when cost is not positive.
pub fn calculate_margin(cost: Decimal, sale: Decimal) -> Option<Decimal> {
    if cost <= Decimal::ZERO {
        return None;
    }
    let margin = sale
        .checked_sub(cost)?
        .checked_div(cost)?
        .checked_mul(Decimal::ONE_HUNDRED)?;
    Some(margin.round_dp(2))
}

/// Rounded price with one tier step either side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceAlternatives {
    pub conservative: Decimal,
    pub standard: Decimal,
    pub aggressive: Decimal,
}

/// Suggest a conservative, standard and aggressive price around `base_price`.
pub fn suggest_price_alternatives(base_price: Decimal) -> PriceAlternatives {
    let standard = round_colombian(base_price);
    let step = tier_step(standard);
    let conservative = if standard > step { standard - step } else { standard };

    PriceAlternatives {
        conservative: round_colombian(conservative),
        standard,
        aggressive: round_colombian(standard.saturating_add(step)),
    }
}

/// Business-rule warnings for a proposed sale price.
pub fn validate_price_business_rules(cost: Decimal, sale: Decimal) -> Vec<String> {
    let mut warnings = Vec::new();

    if sale <= cost {
        warnings.push(format!(
            "sale price {} is not above cost {}",
            format_colombian_price(sale),
            format_colombian_price(cost)
        ));
    }

    if let Some(margin) = calculate_margin(cost, sale) {
        if margin < Decimal::from(MIN_HEALTHY_MARGIN) && sale > cost {
            warnings.push(format!("margin {}% is below {}%", margin, MIN_HEALTHY_MARGIN));
        }
        if margin > Decimal::from(MAX_HEALTHY_MARGIN) {
            warnings.push(format!("margin {}% is above {}%", margin, MAX_HEALTHY_MARGIN));
        }
    }

    if round_colombian(sale) != sale {
        warnings.push(format!(
            "price {} is not rounded, suggested {}",
            sale,
            format_colombian_price(round_colombian(sale))
        ));
    }

    warnings
}
