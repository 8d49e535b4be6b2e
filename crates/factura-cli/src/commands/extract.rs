//! Extract command - read a single OCR block graph into an invoice.

use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use console::style;
use rust_decimal::Decimal;
use tracing::{debug, info};

use factura_core::pricing::format_colombian_price;
use factura_core::{InvoiceExtraction, InvoiceExtractor, InvoiceParser};

use super::load_config;

/// Arguments for the extract command.
#[derive(Args)]
pub struct ExtractArgs {
    /// Block graph JSON file (OCR analysis response)
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Pretty-print JSON output
    #[arg(long)]
    pretty: bool,

    /// Show extraction confidence scores
    #[arg(long)]
    show_confidence: bool,

    /// Print extraction warnings and missing fields
    #[arg(long)]
    validate: bool,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// CSV output, one row per line item
    Csv,
    /// Plain text summary
    Text,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
            OutputFormat::Text => "txt",
        }
    }
}

pub async fn run(args: ExtractArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    info!("Extracting invoice from {}", args.input.display());

    let json = fs::read_to_string(&args.input)?;
    let parser = InvoiceParser::from_config(&config);
    let result = parser.extract_from_json(&json)?;
    let invoice = result.invoice;

    if args.validate {
        print_validation(&invoice);
    }

    let output = format_invoice(&invoice, args.format, args.pretty)?;

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

    if args.show_confidence {
        println!();
        println!(
            "{} Extraction confidence: {:.1}%",
            style("ℹ").blue(),
            invoice.metadata.confidence * 100.0
        );
        if let Some(time_ms) = invoice.metadata.processing_time_ms {
            println!("{} Processing time: {}ms", style("ℹ").blue(), time_ms);
        }
    }

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}

fn print_validation(invoice: &InvoiceExtraction) {
    if invoice.warnings.is_empty() && invoice.metadata.missing_fields.is_empty() {
        eprintln!("{} No extraction warnings", style("✓").green());
        return;
    }

    if !invoice.warnings.is_empty() {
        eprintln!("{}", style("Extraction warnings:").yellow());
        for warning in &invoice.warnings {
            eprintln!("  - [{}] {}", warning.code, warning);
        }
    }

    if !invoice.metadata.missing_fields.is_empty() {
        eprintln!(
            "{} {}",
            style("Missing fields:").yellow(),
            invoice.metadata.missing_fields.join(", ")
        );
    }
}

pub fn format_invoice(
    invoice: &InvoiceExtraction,
    format: OutputFormat,
    pretty: bool,
) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json if pretty => Ok(serde_json::to_string_pretty(invoice)?),
        OutputFormat::Json => Ok(serde_json::to_string(invoice)?),
        OutputFormat::Csv => format_csv(invoice),
        OutputFormat::Text => Ok(format_text(invoice)),
    }
}

fn opt_decimal(value: Option<Decimal>) -> String {
    value.map(|v| v.normalize().to_string()).unwrap_or_default()
}

fn format_csv(invoice: &InvoiceExtraction) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "invoice_number",
        "item_number",
        "product_code",
        "description",
        "quantity",
        "unit_measure",
        "unit_price",
        "subtotal",
        "original_quantity",
        "original_unit",
        "unit_multiplier",
        "recalculated",
    ])?;

    let invoice_number = invoice.invoice_number.as_deref().unwrap_or("");
    for item in &invoice.line_items {
        wtr.write_record([
            invoice_number,
            &item.item_number.to_string(),
            item.product_code.as_deref().unwrap_or(""),
            item.description.as_deref().unwrap_or(""),
            &opt_decimal(item.quantity),
            &item.unit_measure,
            &opt_decimal(item.unit_price),
            &opt_decimal(item.subtotal),
            &opt_decimal(item.original_quantity),
            item.original_unit.as_deref().unwrap_or(""),
            &item.unit_multiplier.to_string(),
            &item.recalculated.to_string(),
        ])?;
    }

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

fn money(value: Option<Decimal>) -> String {
    value
        .map(format_colombian_price)
        .unwrap_or_else(|| "-".to_string())
}

pub fn format_text(invoice: &InvoiceExtraction) -> String {
    let mut output = String::new();
    let or_dash = |v: Option<&str>| v.unwrap_or("-").to_string();

    let _ = writeln!(output, "Invoice: {}", or_dash(invoice.invoice_number.as_deref()));
    let _ = writeln!(
        output,
        "Date: {}",
        invoice.issue_date.map(|d| d.to_string()).unwrap_or_else(|| "-".to_string())
    );
    if let Some(due_date) = invoice.due_date {
        let _ = writeln!(output, "Due: {}", due_date);
    }
    output.push('\n');

    output.push_str("Supplier:\n");
    let _ = writeln!(output, "  {}", or_dash(invoice.supplier.company_name.as_deref()));
    if let Some(nit) = &invoice.supplier.nit {
        let _ = writeln!(output, "  NIT: {}", nit);
    }
    if let Some(address) = &invoice.supplier.address {
        let _ = writeln!(output, "  {}", address);
    }
    output.push('\n');

    output.push_str("Customer:\n");
    let _ = writeln!(output, "  {}", or_dash(invoice.customer.customer_name.as_deref()));
    if let Some(id) = &invoice.customer.customer_id {
        let _ = writeln!(output, "  ID: {}", id);
    }
    output.push('\n');

    let _ = writeln!(output, "Items ({}):", invoice.metadata.line_item_source);
    for item in &invoice.line_items {
        let _ = writeln!(
            output,
            "  {:>3}  {:<40} {:>6} {:<4} x {:>12} = {:>14}",
            item.item_number,
            item.description.as_deref().unwrap_or("-"),
            opt_decimal(item.quantity),
            item.unit_measure,
            money(item.unit_price),
            money(item.subtotal),
        );
    }
    output.push('\n');

    output.push_str("Totals:\n");
    let _ = writeln!(output, "  Subtotal: {}", money(invoice.totals.subtotal));
    match invoice.totals.iva_rate {
        Some(rate) => {
            let _ = writeln!(
                output,
                "  IVA ({}%): {}",
                rate.normalize(),
                money(invoice.totals.iva_amount)
            );
        }
        None => {
            let _ = writeln!(output, "  IVA: {}", money(invoice.totals.iva_amount));
        }
    }
    let _ = writeln!(
        output,
        "  Total: {} {}",
        money(invoice.totals.total),
        invoice.metadata.currency
    );

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use factura_core::LineItem;

    fn invoice() -> InvoiceExtraction {
        let mut invoice = InvoiceExtraction::default();
        invoice.invoice_number = Some("PMB4471".to_string());
        invoice.metadata.currency = "COP".to_string();
        invoice.totals.total = Some(Decimal::from(240_000));

        let mut item = LineItem::new(1);
        item.description = Some("CHANCLA DAMA".to_string());
        item.quantity = Some(Decimal::from(24));
        item.unit_price = Some(Decimal::from(10_000));
        item.subtotal = Some(Decimal::from(240_000));
        item.unit_measure = "PCS".to_string();
        item.original_unit = Some("DOC".to_string());
        item.unit_multiplier = 12;
        invoice.line_items.push(item);
        invoice
    }

    #[test]
    fn test_format_csv_rows_per_item() {
        let csv = format_csv(&invoice()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("invoice_number,item_number"));
        assert_eq!(lines[1], "PMB4471,1,,CHANCLA DAMA,24,PCS,10000,240000,,DOC,12,false");
    }

    #[test]
    fn test_format_text_uses_colombian_amounts() {
        let text = format_text(&invoice());

        assert!(text.contains("Invoice: PMB4471"));
        assert!(text.contains("$ 240.000"));
        assert!(text.contains("Total: $ 240.000 COP"));
        assert!(text.contains("Items (not_found):"));
    }
}
