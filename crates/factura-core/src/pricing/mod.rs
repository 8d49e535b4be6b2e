//! Sale price recommendations for enhanced line items.
//!
//! The engine is synchronous and side-effect free: history is passed in as
//! already-fetched records and the category guess comes from a
//! [`CategoryClassifier`] supplied by the caller.

pub mod classifier;
pub mod engine;
pub mod rounding;

pub use classifier::{CategoryClassifier, KeywordClassifier};
pub use engine::{quantity_factor, PricingEngine};
pub use rounding::{
    calculate_margin, format_colombian_price, round_colombian, suggest_price_alternatives,
    validate_price_business_rules, PriceAlternatives,
};

use rust_decimal::Decimal;

use crate::models::invoice::LineItem;
use crate::models::pricing::PricingRequest;

impl PricingRequest {
    /// Build a request from an enhanced line item; `None` without description, price or quantity.
    pub fn from_line_item(item: &LineItem) -> Option<Self> {
        let description = item.description.clone()?;
        let cost_price = item.unit_price.filter(|p| *p > Decimal::ZERO)?;
        let quantity = item.quantity.filter(|q| *q > Decimal::ZERO)?;

        let mut request = PricingRequest::new(description, cost_price, quantity);
        request.product_code = item.product_code.clone();
        Some(request)
    }
}
