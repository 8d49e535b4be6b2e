//! Configuration structures for the extraction and pricing pipeline.

use std::collections::BTreeMap;
use std::path::Path;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{FacturaError, Result};
use crate::models::pricing::Category;

/// Main configuration for the factura pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FacturaConfig {
    /// Invoice field extraction configuration.
    pub extraction: ExtractionConfig,

    /// Line item enhancement configuration.
    pub enhancement: EnhancementConfig,

    /// Pricing engine configuration.
    pub pricing: PricingConfig,
}

/// Invoice extraction configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Discard NITs whose printed check digit is wrong.
    pub validate_nit: bool,

    /// LINE blocks below this confidence (0 - 100) are ignored.
    pub min_block_confidence: f32,

    /// Currency reported in the extraction metadata.
    pub default_currency: String,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            validate_nit: true,
            min_block_confidence: 0.0,
            default_currency: "COP".to_string(),
        }
    }
}

/// Line item enhancement configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnhancementConfig {
    /// Relative difference (percent) above which a stated subtotal is overwritten.
    pub subtotal_tolerance_percent: Decimal,

    /// Unit multipliers above this value are flagged as suspicious.
    pub suspicious_multiplier: u32,

    /// Decimal places kept on computed subtotals.
    pub money_scale: u32,
}

impl Default for EnhancementConfig {
    fn default() -> Self {
        Self {
            subtotal_tolerance_percent: Decimal::from(5),
            suspicious_multiplier: 100,
            money_scale: 2,
        }
    }
}

/// Pricing engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    /// Lowest acceptable markup in percent.
    pub min_markup: Decimal,

    /// Highest acceptable markup in percent.
    pub max_markup: Decimal,

    /// Sales newer than this many days count as recent history.
    pub recent_window_days: i64,

    /// Minimum matching sales before historical pricing is offered.
    pub min_history_points: usize,

    /// Minimum supplier transactions before supplier-pattern pricing is offered.
    pub min_supplier_transactions: usize,

    /// Per-category margin overrides in percent.
    pub margin_overrides: BTreeMap<Category, Decimal>,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            min_markup: Decimal::from(20),
            max_markup: Decimal::from(200),
            recent_window_days: 90,
            min_history_points: 2,
            min_supplier_transactions: 3,
            margin_overrides: BTreeMap::new(),
        }
    }
}

impl PricingConfig {
    /// Margin for a category, honoring overrides.
    pub fn margin_for(&self, category: Category) -> Decimal {
        self.margin_overrides
            .get(&category)
            .copied()
            .unwrap_or_else(|| category.default_margin())
    }
}

impl FacturaConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        let pricing = &self.pricing;
        if pricing.min_markup < Decimal::ZERO || pricing.min_markup > pricing.max_markup {
            return Err(FacturaError::Config(format!(
                "markup bounds out of order: min {} max {}",
                pricing.min_markup, pricing.max_markup
            )));
        }
        if pricing.recent_window_days < 0 {
            return Err(FacturaError::Config(
                "recent_window_days must not be negative".to_string(),
            ));
        }
        if self.enhancement.subtotal_tolerance_percent < Decimal::ZERO {
            return Err(FacturaError::Config(
                "subtotal_tolerance_percent must not be negative".to_string(),
            ));
        }
        if self.enhancement.suspicious_multiplier == 0 {
            return Err(FacturaError::Config(
                "suspicious_multiplier must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = FacturaConfig::default();
        assert!(config.extraction.validate_nit);
        assert_eq!(config.extraction.default_currency, "COP");
        assert_eq!(config.enhancement.subtotal_tolerance_percent, Decimal::from(5));
        assert_eq!(config.pricing.min_markup, Decimal::from(20));
        assert_eq!(config.pricing.max_markup, Decimal::from(200));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: FacturaConfig =
            serde_json::from_str(r#"{"pricing": {"margin_overrides": {"shoes": "40"}}}"#).unwrap();

        assert_eq!(config.pricing.recent_window_days, 90);
        assert_eq!(config.pricing.margin_for(Category::Shoes), Decimal::from(40));
        assert_eq!(config.pricing.margin_for(Category::Clothing), Decimal::from(60));
        assert_eq!(config.enhancement.money_scale, 2);
    }

    #[test]
    fn test_validate_rejects_inverted_markups() {
        let mut config = FacturaConfig::default();
        config.pricing.min_markup = Decimal::from(300);
        assert!(matches!(config.validate(), Err(FacturaError::Config(_))));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = FacturaConfig::default();
        config.extraction.min_block_confidence = 60.0;
        config.save(&path).unwrap();

        let loaded = FacturaConfig::from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }
}
