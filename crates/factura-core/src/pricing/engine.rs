//! Sale price recommendation engine.

use std::cmp::Ordering;

use chrono::{Duration, Local, NaiveDate};
use rust_decimal::Decimal;
use tracing::{debug, warn};

use super::classifier::CategoryClassifier;
use super::rounding::{calculate_margin, round_colombian, round_down_to_tier, round_up_to_tier};
use crate::error::PricingError;
use crate::models::config::PricingConfig;
use crate::models::pricing::{
    Category, CategoryClassification, HistoricalRecord, PricingCandidate, PricingMethod,
    PricingRecommendation, PricingRequest,
};

const HISTORICAL_CONFIDENCE: f32 = 0.95;
const SUPPLIER_CONFIDENCE: f32 = 0.85;
const CONSERVATIVE_CONFIDENCE: f32 = 0.70;
const AGGRESSIVE_CONFIDENCE: f32 = 0.60;
const FALLBACK_CONFIDENCE: f32 = 0.50;

/// Fixed margin used when recommendation fails.
const FALLBACK_MARGIN: i64 = 50;

/// Quantity adjustment: bulk discount or small-order premium.
pub fn quantity_factor(quantity: Decimal) -> Decimal {
    if quantity >= Decimal::from(50) {
        Decimal::new(95, 2)
    } else if quantity >= Decimal::from(20) {
        Decimal::new(98, 2)
    } else if quantity <= Decimal::from(3) {
        Decimal::new(105, 2)
    } else {
        Decimal::ONE
    }
}

/// Selection bonus for a candidate margin.
fn margin_bonus(margin: Decimal) -> f32 {
    if margin >= Decimal::from(30) && margin <= Decimal::from(80) {
        1.2
    } else if margin < Decimal::from(30) {
        0.8
    } else if margin > Decimal::ONE_HUNDRED {
        0.7
    } else {
        1.0
    }
}

fn score(candidate: &PricingCandidate) -> f32 {
    candidate.confidence * margin_bonus(candidate.margin_percentage)
}

fn median(mut values: Vec<Decimal>) -> Option<Decimal> {
    if values.is_empty() {
        return None;
    }
    values.sort();
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        let (low, high) = (values[mid - 1], values[mid]);
        Some(match low.checked_add(high) {
            Some(sum) => sum / Decimal::TWO,
            None => low / Decimal::TWO + high / Decimal::TWO,
        })
    } else {
        Some(values[mid])
    }
}

fn markup(cost: Decimal, margin: Decimal, factor: Decimal) -> Result<Decimal, PricingError> {
    (Decimal::ONE + margin / Decimal::ONE_HUNDRED)
        .checked_mul(cost)
        .and_then(|price| price.checked_mul(factor))
        .ok_or_else(|| PricingError::Overflow(format!("{} at {}% margin", cost, margin)))
}

fn scaled(value: Decimal, by: Decimal) -> Result<Decimal, PricingError> {
    value
        .checked_mul(by)
        .ok_or_else(|| PricingError::Overflow(format!("{} x {}", value, by)))
}

/// Pricing engine over a category classification capability.
pub struct PricingEngine<C> {
    classifier: C,
    config: PricingConfig,
}

impl<C: CategoryClassifier> PricingEngine<C> {
    /// Create an engine with default pricing configuration.
    pub fn new(classifier: C) -> Self {
        Self::with_config(classifier, PricingConfig::default())
    }

    pub fn with_config(classifier: C, config: PricingConfig) -> Self {
        Self { classifier, config }
    }

    pub fn config(&self) -> &PricingConfig {
        &self.config
    }

    /// Recommend a sale price. Never fails; errors yield the fixed-margin fallback.
    pub fn recommend(
        &self,
        request: &PricingRequest,
        history: &[HistoricalRecord],
    ) -> PricingRecommendation {
        match self.try_recommend(request, history) {
            Ok(recommendation) => recommendation,
            Err(e) => {
                warn!("Pricing failed for {:?}, using fallback: {}", request.description, e);
                self.fallback(request)
            }
        }
    }

    /// Recommend a sale price, reporting why no recommendation could be made.
    pub fn try_recommend(
        &self,
        request: &PricingRequest,
        history: &[HistoricalRecord],
    ) -> Result<PricingRecommendation, PricingError> {
        let cost = request.cost_price;
        if cost <= Decimal::ZERO {
            return Err(PricingError::InvalidCost(cost.to_string()));
        }

        let mut classification = self.classifier.classify(&request.description)?;
        let category_margin = self.config.margin_for(classification.category);
        classification.margin_percentage = category_margin;

        let factor = quantity_factor(request.quantity);
        debug!(
            "Pricing {:?}: category {} ({:.2}), margin {}%, quantity factor {}",
            request.description, classification.category, classification.confidence, category_margin, factor
        );

        let mut candidates = vec![self.candidate(
            cost,
            markup(cost, category_margin, factor)?,
            classification.confidence,
            PricingMethod::Category,
            format!(
                "{} margin {}% for {}",
                classification.category,
                category_margin,
                classification.category.spanish_name()
            ),
        )?];

        if let Some(price) = self.historical_price(request, history)? {
            candidates.push(self.candidate(
                cost,
                scaled(price, factor)?,
                HISTORICAL_CONFIDENCE,
                PricingMethod::Historical,
                format!("median historical sale price {}", price.round_dp(2)),
            )?);
        }

        if let Some(margin) = self.supplier_margin(request, history)? {
            candidates.push(self.candidate(
                cost,
                markup(cost, margin, factor)?,
                SUPPLIER_CONFIDENCE,
                PricingMethod::SupplierPattern,
                format!("median supplier margin {}%", margin.round_dp(2)),
            )?);
        }

        let conservative = scaled(category_margin, Decimal::new(8, 1))?.max(self.config.min_markup);
        candidates.push(self.candidate(
            cost,
            markup(cost, conservative, factor)?,
            CONSERVATIVE_CONFIDENCE,
            PricingMethod::Conservative,
            format!("conservative margin {}%", conservative.round_dp(2)),
        )?);

        let aggressive = scaled(category_margin, Decimal::new(13, 1))?.min(self.config.max_markup);
        candidates.push(self.candidate(
            cost,
            markup(cost, aggressive, factor)?,
            AGGRESSIVE_CONFIDENCE,
            PricingMethod::Aggressive,
            format!("aggressive margin {}%", aggressive.round_dp(2)),
        )?);

        if factor != Decimal::ONE {
            for candidate in &mut candidates {
                candidate.reasoning.push_str(&format!(", quantity factor {}", factor));
            }
        }

        candidates.sort_by(|a, b| score(b).partial_cmp(&score(a)).unwrap_or(Ordering::Equal));
        let best = candidates[0].clone();

        Ok(self.recommendation(request, best, candidates, factor, classification))
    }

    /// Single fixed-margin candidate at low confidence.
    ///
    /// A markup that overflows saturates at `Decimal::MAX` before rounding.
    pub fn fallback(&self, request: &PricingRequest) -> PricingRecommendation {
        let factor = quantity_factor(request.quantity);
        let raw = markup(request.cost_price, Decimal::from(FALLBACK_MARGIN), factor)
            .unwrap_or(Decimal::MAX);
        let price = round_colombian(raw);
        let candidate = PricingCandidate {
            price,
            confidence: FALLBACK_CONFIDENCE,
            method: PricingMethod::Fallback,
            margin_percentage: calculate_margin(request.cost_price, price).unwrap_or_default(),
            reasoning: format!("fallback calculation ({}% standard margin)", FALLBACK_MARGIN),
        };
        let classification = CategoryClassification {
            category: Category::General,
            confidence: FALLBACK_CONFIDENCE,
            margin_percentage: Decimal::from(FALLBACK_MARGIN),
            method: "fallback".to_string(),
        };

        self.recommendation(request, candidate.clone(), vec![candidate], factor, classification)
    }

    fn recommendation(
        &self,
        request: &PricingRequest,
        best: PricingCandidate,
        candidates: Vec<PricingCandidate>,
        quantity_factor: Decimal,
        classification: CategoryClassification,
    ) -> PricingRecommendation {
        let profit_per_unit = best.price.saturating_sub(request.cost_price);
        PricingRecommendation {
            profit_per_unit,
            total_profit: profit_per_unit.saturating_mul(request.quantity),
            roi_percentage: calculate_margin(request.cost_price, best.price).unwrap_or_default(),
            quantity_factor,
            best,
            candidates,
            classification,
        }
    }

    /// Round a raw price, compute its margin and clamp it into the markup bounds.
    fn candidate(
        &self,
        cost: Decimal,
        raw_price: Decimal,
        confidence: f32,
        method: PricingMethod,
        reasoning: String,
    ) -> Result<PricingCandidate, PricingError> {
        let mut price = round_colombian(raw_price);
        let mut reasoning = reasoning;
        let margin = calculate_margin(cost, price).unwrap_or_default();

        if margin < self.config.min_markup {
            price = round_up_to_tier(markup(cost, self.config.min_markup, Decimal::ONE)?);
            reasoning.push_str(&format!(" (raised to minimum margin {}%)", self.config.min_markup));
        } else if margin > self.config.max_markup {
            let ceiling = markup(cost, self.config.max_markup, Decimal::ONE)?;
            price = round_down_to_tier(ceiling);
            if price <= cost {
                price = round_up_to_tier(ceiling);
            }
            reasoning.push_str(&format!(" (lowered to maximum margin {}%)", self.config.max_markup));
        }

        Ok(PricingCandidate {
            price,
            confidence,
            method,
            margin_percentage: calculate_margin(cost, price).unwrap_or_default(),
            reasoning,
        })
    }

    /// Median sale price of the same product, recent sales preferred.
    fn historical_price(
        &self,
        request: &PricingRequest,
        history: &[HistoricalRecord],
    ) -> Result<Option<Decimal>, PricingError> {
        let Some(code) = request.product_code.as_deref() else {
            return Ok(None);
        };

        let mut points: Vec<(Decimal, Option<NaiveDate>)> = Vec::new();
        for record in history.iter().filter(|r| r.product_code.as_deref() == Some(code)) {
            match record.sale_price {
                Some(price) if price < Decimal::ZERO => {
                    return Err(PricingError::InvalidHistory(format!(
                        "negative sale price {} for {}",
                        price, code
                    )));
                }
                Some(price) if price > Decimal::ZERO => points.push((price, record.date)),
                _ => {}
            }
        }

        if points.len() < self.config.min_history_points {
            return Ok(None);
        }

        let today = request.as_of.unwrap_or_else(|| Local::now().date_naive());
        let cutoff = Duration::try_days(self.config.recent_window_days)
            .and_then(|window| today.checked_sub_signed(window))
            .unwrap_or(NaiveDate::MIN);
        let (recent, older): (Vec<_>, Vec<_>) = points
            .into_iter()
            .partition(|(_, date)| date.is_some_and(|d| d > cutoff));

        let prices = |v: Vec<(Decimal, Option<NaiveDate>)>| v.into_iter().map(|(p, _)| p).collect();
        Ok(median(prices(recent)).or_else(|| median(prices(older))))
    }

    /// Median margin over past transactions with the same supplier.
    fn supplier_margin(
        &self,
        request: &PricingRequest,
        history: &[HistoricalRecord],
    ) -> Result<Option<Decimal>, PricingError> {
        let Some(supplier) = request.supplier.as_deref() else {
            return Ok(None);
        };
        let supplier = supplier.to_lowercase();

        let mut transactions = Vec::new();
        for record in history
            .iter()
            .filter(|r| r.supplier.as_deref().is_some_and(|s| s.to_lowercase() == supplier))
        {
            match (record.cost_price, record.sale_price) {
                (Some(cost), _) | (_, Some(cost)) if cost < Decimal::ZERO => {
                    return Err(PricingError::InvalidHistory(format!(
                        "negative price in supplier history for {}",
                        supplier
                    )));
                }
                (Some(cost), Some(sale)) if cost > Decimal::ZERO && sale > Decimal::ZERO => {
                    transactions.push((cost, sale));
                }
                _ => {}
            }
        }

        if transactions.len() < self.config.min_supplier_transactions {
            return Ok(None);
        }

        let margins: Vec<Decimal> = transactions
            .into_iter()
            .filter_map(|(cost, sale)| calculate_margin(cost, sale))
            .filter(|m| *m >= self.config.min_markup && *m <= self.config.max_markup)
            .collect();

        if margins.len() < 2 {
            return Ok(None);
        }
        Ok(median(margins))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::classifier::KeywordClassifier;
    use pretty_assertions::assert_eq;

    fn d(v: i64) -> Decimal {
        Decimal::from(v)
    }

    struct FixedClassifier(Category, f32);

    impl CategoryClassifier for FixedClassifier {
        fn classify(&self, _description: &str) -> Result<CategoryClassification, PricingError> {
            Ok(CategoryClassification {
                category: self.0,
                confidence: self.1,
                margin_percentage: self.0.default_margin(),
                method: "fixed".to_string(),
            })
        }
    }

    struct FailingClassifier;

    impl CategoryClassifier for FailingClassifier {
        fn classify(&self, _description: &str) -> Result<CategoryClassification, PricingError> {
            Err(PricingError::Classification("model unavailable".to_string()))
        }
    }

    fn date(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    #[test]
    fn test_quantity_factor() {
        assert_eq!(quantity_factor(d(60)), Decimal::new(95, 2));
        assert_eq!(quantity_factor(d(24)), Decimal::new(98, 2));
        assert_eq!(quantity_factor(d(10)), Decimal::ONE);
        assert_eq!(quantity_factor(d(3)), Decimal::new(105, 2));
    }

    #[test]
    fn test_category_candidate_for_shoes() {
        let engine = PricingEngine::new(KeywordClassifier::new());
        let request = PricingRequest::new("ZAPATO CUERO CABALLERO", d(6_200), d(24));

        let rec = engine.recommend(&request, &[]);

        // 6200 x 1.55 x 0.98 = 9417.8, nearest 500
        assert_eq!(rec.best.method, PricingMethod::Category);
        assert_eq!(rec.best.price, d(9_500));
        assert_eq!(rec.best.formatted_price(), "$ 9.500");
        assert_eq!(rec.best.margin_percentage, Decimal::new(5323, 2));
        assert_eq!(rec.classification.category, Category::Shoes);
        assert_eq!(rec.quantity_factor, Decimal::new(98, 2));
        assert_eq!(rec.profit_per_unit, d(3_300));
        assert_eq!(rec.total_profit, d(79_200));
        assert_eq!(rec.candidates.len(), 3);

        let conservative = rec
            .candidates
            .iter()
            .find(|c| c.method == PricingMethod::Conservative)
            .unwrap();
        assert_eq!(conservative.price, d(8_500));
        let aggressive = rec
            .candidates
            .iter()
            .find(|c| c.method == PricingMethod::Aggressive)
            .unwrap();
        assert_eq!(aggressive.price, d(11_000));
    }

    #[test]
    fn test_historical_candidate_wins() {
        let engine = PricingEngine::new(FixedClassifier(Category::Shoes, 0.90));
        let request = PricingRequest::new("TENIS", d(6_200), d(10))
            .with_product_code("T-100")
            .as_of(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
        let history = vec![
            HistoricalRecord {
                product_code: Some("T-100".to_string()),
                sale_price: Some(d(9_900)),
                date: date(2024, 5, 20),
                ..Default::default()
            },
            HistoricalRecord {
                product_code: Some("T-100".to_string()),
                sale_price: Some(d(10_100)),
                date: date(2024, 5, 1),
                ..Default::default()
            },
            HistoricalRecord {
                product_code: Some("T-100".to_string()),
                sale_price: Some(d(20_000)),
                date: date(2023, 1, 1),
                ..Default::default()
            },
        ];

        let rec = engine.recommend(&request, &history);
        // median of the two recent sales = 10000
        assert_eq!(rec.best.method, PricingMethod::Historical);
        assert_eq!(rec.best.price, d(10_000));
        assert_eq!(rec.best.confidence, HISTORICAL_CONFIDENCE);
    }

    #[test]
    fn test_supplier_pattern_needs_three_transactions() {
        let engine = PricingEngine::new(FixedClassifier(Category::General, 0.60));
        let record = |cost: i64, sale: i64| HistoricalRecord {
            supplier: Some("Casoli".to_string()),
            cost_price: Some(d(cost)),
            sale_price: Some(d(sale)),
            ..Default::default()
        };
        let request = PricingRequest::new("ARTICULO", d(10_000), d(10)).with_supplier("CASOLI");

        let two = engine.recommend(&request, &[record(100, 140), record(100, 160)]);
        assert!(two.candidates.iter().all(|c| c.method != PricingMethod::SupplierPattern));

        // 500% margin is discarded before the median
        let history = [record(100, 140), record(100, 160), record(100, 600)];
        let rec = engine.recommend(&request, &history);
        let supplier = rec
            .candidates
            .iter()
            .find(|c| c.method == PricingMethod::SupplierPattern)
            .unwrap();
        assert_eq!(supplier.price, d(15_000));
        assert_eq!(rec.best.method, PricingMethod::SupplierPattern);
    }

    #[test]
    fn test_candidates_clamped_to_markup_bounds() {
        let mut config = PricingConfig::default();
        config.margin_overrides.insert(Category::Electronics, d(5));
        let engine = PricingEngine::with_config(FixedClassifier(Category::Electronics, 0.95), config);

        let rec = engine.recommend(&PricingRequest::new("CABLE", d(10_000), d(10)), &[]);
        let category = rec
            .candidates
            .iter()
            .find(|c| c.method == PricingMethod::Category)
            .unwrap();

        assert_eq!(category.price, d(12_000));
        assert!(category.reasoning.contains("minimum margin 20%"));
        assert!(rec.candidates.iter().all(|c| c.margin_percentage >= d(20)));
    }

    #[test]
    fn test_fallback_on_classifier_failure() {
        let engine = PricingEngine::new(FailingClassifier);
        let request = PricingRequest::new("X", d(10_000), d(10));

        assert!(engine.try_recommend(&request, &[]).is_err());

        let rec = engine.recommend(&request, &[]);
        assert_eq!(rec.candidates.len(), 1);
        assert_eq!(rec.best.method, PricingMethod::Fallback);
        assert_eq!(rec.best.price, d(15_000));
        assert_eq!(rec.best.confidence, 0.5);
        assert_eq!(rec.classification.category, Category::General);
    }

    #[test]
    fn test_overflowing_cost_falls_back() {
        let engine = PricingEngine::new(KeywordClassifier::new());
        let cost = Decimal::from_scientific("6e28").unwrap();
        let request = PricingRequest::new("GORRA", cost, d(1));

        assert!(matches!(
            engine.try_recommend(&request, &[]),
            Err(PricingError::Overflow(_))
        ));

        let rec = engine.recommend(&request, &[]);
        assert_eq!(rec.best.method, PricingMethod::Fallback);
        assert_eq!(rec.candidates.len(), 1);
        assert!(rec.best.price > cost);

        let at_max = engine.recommend(&PricingRequest::new("GORRA", Decimal::MAX, d(100)), &[]);
        assert_eq!(at_max.best.method, PricingMethod::Fallback);
    }

    #[test]
    fn test_unbounded_recent_window_treats_all_dated_sales_as_recent() {
        let mut config = PricingConfig::default();
        config.recent_window_days = i64::MAX;
        let engine = PricingEngine::with_config(FixedClassifier(Category::Shoes, 0.90), config);
        let request = PricingRequest::new("TENIS", d(6_200), d(10))
            .with_product_code("T-100")
            .as_of(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
        let sale = |price: i64, on: Option<NaiveDate>| HistoricalRecord {
            product_code: Some("T-100".to_string()),
            sale_price: Some(d(price)),
            date: on,
            ..Default::default()
        };
        let history = [
            sale(9_900, date(2024, 5, 20)),
            sale(10_100, date(2024, 5, 1)),
            sale(20_000, date(1990, 1, 1)),
        ];

        let rec = engine.recommend(&request, &history);
        // median of all three sales = 10100, rounded up to the next 1.000
        assert_eq!(rec.best.method, PricingMethod::Historical);
        assert_eq!(rec.best.price, d(11_000));
    }

    #[test]
    fn test_fallback_on_invalid_cost_and_history() {
        let engine = PricingEngine::new(KeywordClassifier::new());

        let zero = engine.try_recommend(&PricingRequest::new("GORRA", Decimal::ZERO, d(1)), &[]);
        assert!(matches!(zero, Err(PricingError::InvalidCost(_))));

        let request = PricingRequest::new("GORRA", d(1_000), d(10)).with_product_code("G-1");
        let history = [HistoricalRecord {
            product_code: Some("G-1".to_string()),
            sale_price: Some(d(-5)),
            ..Default::default()
        }];
        let rec = engine.recommend(&request, &history);
        assert_eq!(rec.best.method, PricingMethod::Fallback);
        assert_eq!(rec.best.price, d(1_500));
    }
}
