//! Batch command - extract every block graph matching a glob pattern.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Args;
use console::style;
use futures_util::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, error, info, warn};

use factura_core::{InvoiceExtraction, InvoiceExtractor, InvoiceParser};

use super::extract::{format_invoice, OutputFormat};
use super::load_config;

const SUMMARY_FILE: &str = "summary.csv";

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Glob pattern selecting block graph JSON files (e.g. "scans/*.json")
    #[arg(required = true)]
    input: String,

    /// Directory for per-file outputs and the summary
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Format of each written extraction
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Write summary.csv with one row per input file
    #[arg(long)]
    summary: bool,

    /// Files extracted concurrently
    #[arg(short = 'j', long, default_value_t = 4)]
    jobs: usize,

    /// Keep going after a file fails
    #[arg(long)]
    continue_on_error: bool,
}

/// Outcome of extracting one input file.
struct FileOutcome {
    path: PathBuf,
    extraction: Result<InvoiceExtraction, String>,
    elapsed: Duration,
}

impl FileOutcome {
    fn file_name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
    }
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let started = Instant::now();
    let config = load_config(config_path)?;

    let files = collect_inputs(&args.input)?;
    println!(
        "{} Found {} files to process",
        style("ℹ").blue(),
        files.len()
    );

    if let Some(dir) = &args.output_dir {
        fs::create_dir_all(dir)?;
    }

    let progress = ProgressBar::new(files.len() as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} {bar:40.cyan/blue} {pos}/{len} {wide_msg}")?
            .progress_chars("##-"),
    );

    let parser = Arc::new(InvoiceParser::from_config(&config));
    let joined: Vec<_> = stream::iter(files)
        .map(|path| {
            let parser = Arc::clone(&parser);
            tokio::task::spawn_blocking(move || extract_file(&parser, path))
        })
        .buffered(args.jobs.max(1))
        .inspect(|_| progress.inc(1))
        .collect()
        .await;
    progress.finish_and_clear();

    let mut outcomes = Vec::with_capacity(joined.len());
    for handle in joined {
        let outcome = handle?;
        if let Err(message) = &outcome.extraction {
            if !args.continue_on_error {
                error!("{}: {}", outcome.path.display(), message);
                anyhow::bail!("Processing failed: {}: {}", outcome.file_name(), message);
            }
            warn!("Skipping {}: {}", outcome.path.display(), message);
        }
        outcomes.push(outcome);
    }

    if let Some(dir) = &args.output_dir {
        write_outputs(dir, args.format, &outcomes)?;
    }

    if args.summary {
        let summary_path = match &args.output_dir {
            Some(dir) => dir.join(SUMMARY_FILE),
            None => PathBuf::from(SUMMARY_FILE),
        };
        write_summary(&summary_path, &outcomes)?;
        info!("Summary written to {}", summary_path.display());
    }

    report(&outcomes, started.elapsed());
    Ok(())
}

/// Expand the glob, keeping `.json` files in path order.
fn collect_inputs(pattern: &str) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in glob::glob(pattern)? {
        let path = entry?;
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        if is_json {
            files.push(path);
        }
    }
    files.sort();

    if files.is_empty() {
        anyhow::bail!("No block graph files match {}", pattern);
    }
    Ok(files)
}

fn extract_file(parser: &InvoiceParser, path: PathBuf) -> FileOutcome {
    let timer = Instant::now();
    let extraction = fs::read_to_string(&path)
        .map_err(|e| e.to_string())
        .and_then(|json| {
            parser
                .extract_from_json(&json)
                .map(|result| result.invoice)
                .map_err(|e| e.to_string())
        });

    FileOutcome {
        path,
        extraction,
        elapsed: timer.elapsed(),
    }
}

fn write_outputs(dir: &Path, format: OutputFormat, outcomes: &[FileOutcome]) -> anyhow::Result<()> {
    for outcome in outcomes {
        let Ok(invoice) = &outcome.extraction else {
            continue;
        };
        let stem = outcome
            .path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("invoice");
        let target = dir.join(format!("{}.{}", stem, format.extension()));

        fs::write(&target, format_invoice(invoice, format, false)?)?;
        debug!("{} -> {}", outcome.path.display(), target.display());
    }
    Ok(())
}

fn write_summary(path: &Path, outcomes: &[FileOutcome]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record([
        "filename",
        "status",
        "invoice_number",
        "issue_date",
        "supplier_name",
        "supplier_nit",
        "line_items",
        "total",
        "currency",
        "warnings",
        "confidence",
        "processing_time_ms",
        "error",
    ])?;

    for outcome in outcomes {
        let elapsed_ms = outcome.elapsed.as_millis().to_string();
        let row: [String; 13] = match &outcome.extraction {
            Ok(invoice) => [
                outcome.file_name().to_string(),
                "success".to_string(),
                invoice.invoice_number.clone().unwrap_or_default(),
                invoice.issue_date.map(|d| d.to_string()).unwrap_or_default(),
                invoice.supplier.company_name.clone().unwrap_or_default(),
                invoice.supplier.nit.clone().unwrap_or_default(),
                invoice.line_items.len().to_string(),
                invoice.totals.total.map(|t| t.to_string()).unwrap_or_default(),
                invoice.metadata.currency.clone(),
                invoice.warnings.len().to_string(),
                format!("{:.2}", invoice.metadata.confidence),
                elapsed_ms,
                String::new(),
            ],
            Err(message) => {
                let mut row: [String; 13] = Default::default();
                row[0] = outcome.file_name().to_string();
                row[1] = "error".to_string();
                row[11] = elapsed_ms;
                row[12] = message.clone();
                row
            }
        };
        wtr.write_record(&row)?;
    }

    wtr.flush()?;
    Ok(())
}

fn report(outcomes: &[FileOutcome], elapsed: Duration) {
    let failures: Vec<(&FileOutcome, &String)> = outcomes
        .iter()
        .filter_map(|o| o.extraction.as_ref().err().map(|e| (o, e)))
        .collect();
    let extracted = outcomes.len() - failures.len();

    println!();
    println!(
        "{} {} of {} files extracted ({:.1?})",
        style("✓").green(),
        style(extracted).green(),
        outcomes.len(),
        elapsed
    );

    if failures.is_empty() {
        return;
    }

    println!("{}", style("Failed files:").red());
    for (outcome, message) in failures {
        println!("  {} {}", style(outcome.path.display()).dim(), message);
    }
}
