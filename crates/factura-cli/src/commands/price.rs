//! Price command - recommend sale prices for the line items of an extraction.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use clap::Args;
use console::style;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, warn};

use factura_core::pricing::{format_colombian_price, validate_price_business_rules};
use factura_core::{
    HistoricalRecord, InvoiceExtraction, KeywordClassifier, PricingEngine, PricingRecommendation,
    PricingRequest,
};

use super::load_config;

/// Arguments for the price command.
#[derive(Args)]
pub struct PriceArgs {
    /// Extraction JSON written by `factura extract`
    #[arg(required = true)]
    input: PathBuf,

    /// Sales history (JSON array or CSV with product_code,supplier,cost_price,sale_price,date)
    #[arg(long)]
    history: Option<PathBuf>,

    /// Supplier for supplier-pattern pricing (default: the invoice supplier)
    #[arg(long)]
    supplier: Option<String>,

    /// Reference date for the recent-history window (YYYY-MM-DD, default: today)
    #[arg(long)]
    as_of: Option<NaiveDate>,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    format: PriceFormat,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum PriceFormat {
    /// JSON output
    Json,
    /// CSV output, one row per line item
    Csv,
    /// Plain text report
    Text,
}

/// Recommendation for one line item.
#[derive(Debug, Serialize)]
struct ItemPricing {
    item_number: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    product_code: Option<String>,
    description: String,
    cost_price: Decimal,
    quantity: Decimal,
    recommendation: PricingRecommendation,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<String>,
}

pub async fn run(args: PriceArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    let invoice: InvoiceExtraction = serde_json::from_str(&fs::read_to_string(&args.input)?)
        .map_err(|e| anyhow::anyhow!("Not an extraction file: {}", e))?;

    let history = match &args.history {
        Some(path) => load_history(path)?,
        None => Vec::new(),
    };
    info!(
        "Pricing {} line items with {} history records",
        invoice.line_items.len(),
        history.len()
    );

    let supplier = args
        .supplier
        .clone()
        .or_else(|| invoice.supplier.company_name.clone());
    let engine = PricingEngine::with_config(KeywordClassifier::new(), config.pricing.clone());

    let mut priced = Vec::with_capacity(invoice.line_items.len());
    for item in &invoice.line_items {
        let Some(mut request) = PricingRequest::from_line_item(item) else {
            warn!("Skipping line item {}: no description, cost or quantity", item.item_number);
            continue;
        };
        request.supplier = supplier.clone();
        request.as_of = args.as_of;

        let recommendation = engine.recommend(&request, &history);
        let warnings = validate_price_business_rules(request.cost_price, recommendation.best.price);

        priced.push(ItemPricing {
            item_number: item.item_number,
            product_code: request.product_code,
            description: request.description,
            cost_price: request.cost_price,
            quantity: request.quantity,
            recommendation,
            warnings,
        });
    }

    if priced.is_empty() {
        anyhow::bail!("No priceable line items in {}", args.input.display());
    }

    let output = match args.format {
        PriceFormat::Json => serde_json::to_string_pretty(&priced)?,
        PriceFormat::Csv => format_csv(&priced)?,
        PriceFormat::Text => format_text(&priced),
    };

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    Ok(())
}

fn load_history(path: &Path) -> anyhow::Result<Vec<HistoricalRecord>> {
    let is_csv = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"));

    if is_csv {
        let mut rdr = csv::Reader::from_path(path)?;
        let records = rdr.deserialize().collect::<Result<Vec<HistoricalRecord>, _>>()?;
        Ok(records)
    } else {
        Ok(serde_json::from_str(&fs::read_to_string(path)?)?)
    }
}

fn format_csv(priced: &[ItemPricing]) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "item_number",
        "product_code",
        "description",
        "cost_price",
        "quantity",
        "category",
        "sale_price",
        "method",
        "confidence",
        "margin_percentage",
        "profit_per_unit",
        "total_profit",
    ])?;

    for item in priced {
        let rec = &item.recommendation;
        wtr.write_record([
            &item.item_number.to_string(),
            item.product_code.as_deref().unwrap_or(""),
            &item.description,
            &item.cost_price.normalize().to_string(),
            &item.quantity.normalize().to_string(),
            rec.classification.category.spanish_name(),
            &rec.best.price.to_string(),
            &rec.best.method.to_string(),
            &format!("{:.2}", rec.best.confidence),
            &rec.best.margin_percentage.to_string(),
            &rec.profit_per_unit.to_string(),
            &rec.total_profit.to_string(),
        ])?;
    }

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

fn format_text(priced: &[ItemPricing]) -> String {
    let mut output = String::new();

    for item in priced {
        let rec = &item.recommendation;
        let _ = writeln!(output, "#{} {}", item.item_number, item.description);
        let _ = writeln!(
            output,
            "  Cost: {} x {}  ({}, {:.0}%)",
            format_colombian_price(item.cost_price),
            item.quantity.normalize(),
            rec.classification.category.spanish_name(),
            rec.classification.confidence * 100.0
        );
        let _ = writeln!(
            output,
            "  Price: {}  margin {}%  profit {} per unit, {} total",
            rec.best.formatted_price(),
            rec.best.margin_percentage,
            format_colombian_price(rec.profit_per_unit),
            format_colombian_price(rec.total_profit)
        );
        let _ = writeln!(output, "  {}", rec.best.reasoning);

        for candidate in rec.candidates.iter().skip(1) {
            let _ = writeln!(
                output,
                "    alt {:<16} {:>12}  ({:.0}%)",
                candidate.method.to_string(),
                candidate.formatted_price(),
                candidate.confidence * 100.0
            );
        }
        for warning in &item.warnings {
            let _ = writeln!(output, "  ! {}", warning);
        }
        output.push('\n');
    }

    output
}
