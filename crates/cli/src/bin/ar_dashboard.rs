use anyhow::{Context, Result, anyhow};
use chrono::{Local, NaiveDate};
use clap::Parser;
use csv::ReaderBuilder;
use serde_json::Value;
use std::{fs, path::PathBuf};

use engine::Dashboard;
use models::AgingBucket;
use normalizer::RawRow;

#[derive(Parser, Debug)]
#[command(name = "ar-dashboard", about = "Aggregate an AR ledger export into the aging dashboard payload.")]
struct Args {
    /// Path to the AR transaction export (CSV with a header row)
    #[arg(short, long)]
    input: PathBuf,

    /// Output path for the view payload JSON
    #[arg(short, long)]
    output: PathBuf,

    /// Scope the payload to one customer (per-invoice view)
    #[arg(long, conflicts_with = "bucket")]
    customer: Option<String>,

    /// Scope the payload to one aging bucket (e.g. "31-60", "120+")
    #[arg(long)]
    bucket: Option<String>,

    /// Reporting date, YYYY-MM-DD; defaults to today
    #[arg(long)]
    as_of: Option<String>,

    /// Pretty-print the output JSON
    #[arg(long, default_value_t = false)]
    pretty: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ar_dashboard=info".into()),
        )
        .init();

    let args = Args::parse();

    let as_of = match &args.as_of {
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .with_context(|| format!("Invalid --as-of date: {}", s))?,
        None => Local::now().date_naive(),
    };

    let rows = read_rows(&args.input)?;
    tracing::info!(rows = rows.len(), "parsed export");

    let mut dashboard = Dashboard::from_rows(&rows, as_of)
        .with_context(|| format!("No usable rows in {}", args.input.display()))?;

    if let Some(name) = &args.customer {
        dashboard.apply_customer_filter(Some(name));
    } else if let Some(label) = &args.bucket {
        let bucket = AgingBucket::from_label(label).ok_or_else(|| {
            anyhow!(
                "Unknown bucket '{}'; expected one of: {}",
                label,
                AgingBucket::labels().join(", ")
            )
        })?;
        dashboard.apply_bucket_filter(Some(bucket));
    }

    write_payload(&args.output, dashboard.payload(), args.pretty)?;
    println!("Wrote dashboard payload: {}", args.output.display());
    Ok(())
}

/// Read the CSV into header-keyed rows, preserving header order. Unreadable
/// records are skipped, not fatal; the normalizer decides row usability.
fn read_rows(path: &PathBuf) -> Result<Vec<RawRow>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Opening {}", path.display()))?;
    let headers = rdr
        .headers()
        .with_context(|| format!("Reading headers of {}", path.display()))?
        .clone();

    let mut rows = Vec::new();
    for (idx, record) in rdr.records().enumerate() {
        let record = match record {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(row = idx, error = %e, "skipping unreadable record");
                continue;
            }
        };
        let mut row = RawRow::new();
        for (header, field) in headers.iter().zip(record.iter()) {
            row.insert(header.to_string(), Value::String(field.to_string()));
        }
        rows.push(row);
    }
    Ok(rows)
}

fn write_payload(path: &PathBuf, payload: &models::ViewPayload, pretty: bool) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Creating output dir: {}", parent.display()))?;
    }
    let json = if pretty {
        serde_json::to_string_pretty(payload)?
    } else {
        serde_json::to_string(payload)?
    };
    fs::write(path, json).with_context(|| format!("Writing output file: {}", path.display()))?;
    Ok(())
}
