//! Pricing recommendation models.

use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::pricing::rounding::format_colombian_price;

/// Retail product category with a default markup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Shoes,
    Clothing,
    Electronics,
    Accessories,
    Sports,
    Home,
    Beauty,
    Toys,
    Tools,
    Office,
    General,
}

impl Category {
    /// All categories in table order.
    pub const ALL: [Category; 11] = [
        Category::Shoes,
        Category::Clothing,
        Category::Electronics,
        Category::Accessories,
        Category::Sports,
        Category::Home,
        Category::Beauty,
        Category::Toys,
        Category::Tools,
        Category::Office,
        Category::General,
    ];

    /// Default margin in percent.
    pub fn default_margin(&self) -> Decimal {
        let pct = match self {
            Category::Shoes => 55,
            Category::Clothing => 60,
            Category::Electronics => 35,
            Category::Accessories => 70,
            Category::Sports => 50,
            Category::Home => 45,
            Category::Beauty => 65,
            Category::Toys => 60,
            Category::Tools => 40,
            Category::Office => 45,
            Category::General => 50,
        };
        Decimal::from(pct)
    }

    /// Spanish display name.
    pub fn spanish_name(&self) -> &'static str {
        match self {
            Category::Shoes => "calzado y zapatos",
            Category::Clothing => "ropa y vestimenta",
            Category::Electronics => "electrónicos y tecnología",
            Category::Accessories => "accesorios y joyería",
            Category::Sports => "deportes y ejercicio",
            Category::Home => "hogar y decoración",
            Category::Beauty => "belleza y cuidado personal",
            Category::Toys => "juguetes y entretenimiento",
            Category::Tools => "herramientas y ferretería",
            Category::Office => "productos de oficina",
            Category::General => "productos generales",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Category::Shoes => "shoes",
            Category::Clothing => "clothing",
            Category::Electronics => "electronics",
            Category::Accessories => "accessories",
            Category::Sports => "sports",
            Category::Home => "home",
            Category::Beauty => "beauty",
            Category::Toys => "toys",
            Category::Tools => "tools",
            Category::Office => "office",
            Category::General => "general",
        };
        f.write_str(name)
    }
}

/// A category guess from a classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryClassification {
    pub category: Category,

    /// Classifier confidence (0.0 - 1.0).
    pub confidence: f32,

    /// Margin in percent used for this category.
    pub margin_percentage: Decimal,

    /// How the guess was produced (keyword, model name, default, ...).
    pub method: String,
}

/// How a candidate price was derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PricingMethod {
    Category,
    Historical,
    SupplierPattern,
    Conservative,
    Aggressive,
    Fallback,
}

impl fmt::Display for PricingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PricingMethod::Category => "category",
            PricingMethod::Historical => "historical",
            PricingMethod::SupplierPattern => "supplier_pattern",
            PricingMethod::Conservative => "conservative",
            PricingMethod::Aggressive => "aggressive",
            PricingMethod::Fallback => "fallback",
        };
        f.write_str(name)
    }
}

/// One candidate sale price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingCandidate {
    /// Sale price, already Colombian-rounded.
    pub price: Decimal,

    /// Confidence (0.0 - 1.0).
    pub confidence: f32,

    pub method: PricingMethod,

    /// Markup over cost in percent, computed on `price`.
    pub margin_percentage: Decimal,

    pub reasoning: String,
}

impl PricingCandidate {
    /// Price formatted for display (`$ 45.000`).
    pub fn formatted_price(&self) -> String {
        format_colombian_price(self.price)
    }
}

/// The selected candidate plus the ranked alternatives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingRecommendation {
    /// Highest-scoring candidate.
    pub best: PricingCandidate,

    /// All candidates, best first.
    pub candidates: Vec<PricingCandidate>,

    pub profit_per_unit: Decimal,

    /// Profit per unit times quantity.
    pub total_profit: Decimal,

    pub roi_percentage: Decimal,

    pub quantity_factor: Decimal,

    pub classification: CategoryClassification,
}

/// A past sale used for historical and supplier-pattern pricing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoricalRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_code: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supplier: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_price: Option<Decimal>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sale_price: Option<Decimal>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
}

/// Inputs for one pricing recommendation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_code: Option<String>,

    pub description: String,

    /// Cost per unit.
    pub cost_price: Decimal,

    pub quantity: Decimal,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supplier: Option<String>,

    /// Reference date for the recent-history window; today when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub as_of: Option<NaiveDate>,
}

impl PricingRequest {
    /// Create a request from cost, quantity and description.
    pub fn new(description: impl Into<String>, cost_price: Decimal, quantity: Decimal) -> Self {
        Self {
            product_code: None,
            description: description.into(),
            cost_price,
            quantity,
            supplier: None,
            as_of: None,
        }
    }

    /// Set the product code used for historical matching.
    pub fn with_product_code(mut self, code: impl Into<String>) -> Self {
        self.product_code = Some(code.into());
        self
    }

    /// Set the supplier used for supplier-pattern matching.
    pub fn with_supplier(mut self, supplier: impl Into<String>) -> Self {
        self.supplier = Some(supplier.into());
        self
    }

    /// Pin the reference date.
    pub fn as_of(mut self, date: NaiveDate) -> Self {
        self.as_of = Some(date);
        self
    }
}
