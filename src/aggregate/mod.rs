//! Silver → gold: streaming aggregation over canonical tables.
//!
//! Two independent reducers share the same plumbing: parse the trigger,
//! pull each silver table, resolve the logical columns against its header,
//! fold every row into an invocation-local accumulator, then flush one JSON
//! report tagged with the merged partition year.

use std::fs::File;
use std::io::{BufReader, Write};
use std::path::Path;
use std::time::Instant;

use chrono::Utc;
use csv::ReaderBuilder;
use flate2::read::GzDecoder;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{error, info, instrument, warn};

pub mod columns;
pub mod count_by_type;
pub mod price_m2;

use crate::context::PipelineContext;
use crate::error::Result;
use crate::event::{decode_key, merge_partition_years, parse_trigger};
use crate::metrics::Unit;
use crate::process::utils::parse_locale_float;
use columns::{require_column, AREA_COLUMNS, CATEGORY_COLUMNS, POSTAL_COLUMNS, VALUE_COLUMNS};
use count_by_type::{CategoryCount, CategoryCounter};
use price_m2::PriceMeanAccumulator;

/// Final count-by-type report, immutable once written.
#[derive(Debug, Serialize)]
pub struct CountByTypeReport {
    pub year: String,
    pub source_files: Vec<String>,
    pub total_rows: u64,
    pub counts: Vec<CategoryCount>,
    pub generated_at_utc: String,
    pub duration_sec: f64,
}

/// Final price-per-area report, immutable once written.
#[derive(Debug, Serialize)]
pub struct AvgPriceReport {
    pub year: String,
    pub source_files: Vec<String>,
    pub rows_total: u64,
    pub rows_used: u64,
    pub avg_price_m2: Option<f64>,
    pub generated_at_utc: String,
    pub duration_sec: f64,
}

#[derive(Debug, Serialize)]
pub struct GoldSummary {
    pub status: &'static str,
    pub gold_key: Option<String>,
    pub rows_total: u64,
    pub rows_used: u64,
    pub errors: u64,
}

/// True for keys the gold stages consume.
fn is_silver_table(key: &str) -> bool {
    key.starts_with("silver/") && (key.ends_with(".csv.gz") || key.ends_with(".gz"))
}

fn round3(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0
}

/// Open a silver table and hand back its header plus a positioned csv
/// reader.
fn open_silver(path: &Path) -> Result<(Vec<String>, csv::Reader<GzDecoder<BufReader<File>>>)> {
    let decoder = GzDecoder::new(BufReader::new(File::open(path)?));
    let mut reader = ReaderBuilder::new()
        .delimiter(b';')
        .flexible(true)
        .from_reader(decoder);
    let headers = reader.headers()?.iter().map(str::to_string).collect();
    Ok((headers, reader))
}

/// Fold one silver table into the category counter. Returns rows read.
fn scan_category_file(path: &Path, by_postal: bool, counter: &mut CategoryCounter) -> Result<u64> {
    let (headers, mut reader) = open_silver(path)?;
    let category_idx = require_column(&headers, CATEGORY_COLUMNS)?;
    let postal_idx = if by_postal {
        Some(require_column(&headers, POSTAL_COLUMNS)?)
    } else {
        None
    };

    let mut file_rows = 0u64;
    for record in reader.records() {
        let record = record?;
        let category = record.get(category_idx).unwrap_or("");
        let postal = postal_idx.map(|i| record.get(i).unwrap_or(""));
        counter.observe(category, postal);
        file_rows += 1;
    }
    Ok(file_rows)
}

/// Fold one silver table into the price accumulator. Returns rows read.
fn scan_price_file(path: &Path, acc: &mut PriceMeanAccumulator) -> Result<u64> {
    let (headers, mut reader) = open_silver(path)?;
    let value_idx = require_column(&headers, VALUE_COLUMNS)?;
    let area_idx = require_column(&headers, AREA_COLUMNS)?;

    let mut file_rows = 0u64;
    for record in reader.records() {
        let record = record?;
        let value = record.get(value_idx).and_then(|c| parse_locale_float(c));
        let area = record.get(area_idx).and_then(|c| parse_locale_float(c));
        acc.observe(value, area);
        file_rows += 1;
    }
    Ok(file_rows)
}

/// Pull every silver table named by the trigger through `scan`, collecting
/// the keys that were actually folded in plus the per-object error count.
async fn fold_silver_tables<F>(
    ctx: &PipelineContext,
    event: &Value,
    mut scan: F,
) -> Result<(Vec<String>, u64)>
where
    F: FnMut(&Path) -> Result<u64>,
{
    let refs = parse_trigger(event)?;
    let mut processed = Vec::new();
    let mut errors = 0u64;

    for obj in refs {
        let key = decode_key(&obj.key);
        if !is_silver_table(&key) {
            info!(key = %key, "skipping non-silver object");
            continue;
        }

        let workdir = match tempfile::tempdir() {
            Ok(d) => d,
            Err(e) => {
                errors += 1;
                error!(key = %key, "failed to create workdir: {}", e);
                continue;
            }
        };
        let table_path = workdir.path().join("in.csv.gz");
        if let Err(e) = ctx.store.download(&obj.bucket, &key, &table_path).await {
            errors += 1;
            error!(key = %key, "download failed: {}", e);
            continue;
        }

        match scan(&table_path) {
            Ok(file_rows) => {
                info!(key = %key, file_rows, "silver table folded in");
                processed.push(key);
            }
            Err(e) => {
                errors += 1;
                warn!(key = %key, "skipping silver table: {}", e);
            }
        }
    }

    Ok((processed, errors))
}

async fn upload_report<T: Serialize>(
    ctx: &PipelineContext,
    gold_key: &str,
    report: &T,
) -> Result<()> {
    let mut tmp = tempfile::NamedTempFile::new()?;
    tmp.write_all(&serde_json::to_vec_pretty(report)?)?;
    ctx.store
        .upload(&ctx.config.gold_bucket, gold_key, tmp.path())
        .await
}

/// Count transactions per category over the triggered silver tables.
#[instrument(level = "info", skip(ctx, event))]
pub async fn gold_count_by_type(
    ctx: &PipelineContext,
    event: &Value,
    by_postal: bool,
) -> Result<GoldSummary> {
    let t0 = Instant::now();
    let mut counter = CategoryCounter::new();

    let (processed, errors) =
        fold_silver_tables(ctx, event, |path| scan_category_file(path, by_postal, &mut counter))
            .await?;

    let total_rows = counter.rows_total();
    let duration = t0.elapsed().as_secs_f64();
    ctx.emit_metric("GoldCountRuns", 1.0, Unit::Count).await;
    ctx.emit_metric("GoldCountRows", total_rows as f64, Unit::Count)
        .await;
    ctx.emit_metric("GoldCountErrors", errors as f64, Unit::Count)
        .await;
    ctx.emit_metric("GoldCountDurationSec", duration, Unit::Seconds)
        .await;

    if processed.is_empty() {
        info!("no silver tables processed");
        return Ok(GoldSummary {
            status: "no silver files processed",
            gold_key: None,
            rows_total: 0,
            rows_used: 0,
            errors,
        });
    }

    let year = merge_partition_years(processed.iter().map(String::as_str));
    let gold_key = format!("gold/year={year}/count_by_type_{year}.json");
    let report = CountByTypeReport {
        year: year.clone(),
        source_files: processed,
        total_rows,
        counts: counter.finalize(),
        generated_at_utc: Utc::now().to_rfc3339(),
        duration_sec: round3(duration),
    };
    upload_report(ctx, &gold_key, &report).await?;
    info!(gold_key = %gold_key, total_rows, "count-by-type report written");

    ctx.notify(&json!({
        "stage": "gold_count_by_type",
        "year": year,
        "gold_key": gold_key,
        "total_rows": total_rows,
        "duration_sec": report.duration_sec,
    }))
    .await;

    Ok(GoldSummary {
        status: "ok",
        gold_key: Some(gold_key),
        rows_total: total_rows,
        rows_used: total_rows,
        errors,
    })
}

/// Average price-per-area over the triggered silver tables.
#[instrument(level = "info", skip(ctx, event))]
pub async fn gold_price_m2(ctx: &PipelineContext, event: &Value) -> Result<GoldSummary> {
    let t0 = Instant::now();
    let mut acc = PriceMeanAccumulator::new();

    let (processed, errors) =
        fold_silver_tables(ctx, event, |path| scan_price_file(path, &mut acc)).await?;

    let duration = t0.elapsed().as_secs_f64();
    ctx.emit_metric("GoldPriceM2Runs", 1.0, Unit::Count).await;
    ctx.emit_metric("GoldPriceM2RowsUsed", acc.rows_used() as f64, Unit::Count)
        .await;
    ctx.emit_metric("GoldPriceM2Errors", errors as f64, Unit::Count)
        .await;
    ctx.emit_metric("GoldPriceM2DurationSec", duration, Unit::Seconds)
        .await;

    if processed.is_empty() {
        info!("no silver tables processed");
        return Ok(GoldSummary {
            status: "no silver files processed",
            gold_key: None,
            rows_total: 0,
            rows_used: 0,
            errors,
        });
    }

    let year = merge_partition_years(processed.iter().map(String::as_str));
    let gold_key = format!("gold/year={year}/avg_price_m2_{year}.json");
    let report = AvgPriceReport {
        year: year.clone(),
        source_files: processed,
        rows_total: acc.rows_total(),
        rows_used: acc.rows_used(),
        avg_price_m2: acc.mean(),
        generated_at_utc: Utc::now().to_rfc3339(),
        duration_sec: round3(duration),
    };
    upload_report(ctx, &gold_key, &report).await?;
    info!(
        gold_key = %gold_key,
        rows_used = report.rows_used,
        "price-per-area report written"
    );

    ctx.notify(&json!({
        "stage": "gold_price_m2",
        "year": year,
        "gold_key": gold_key,
        "rows_used": report.rows_used,
        "avg_price_m2": report.avg_price_m2,
        "duration_sec": report.duration_sec,
    }))
    .await;

    Ok(GoldSummary {
        status: "ok",
        gold_key: Some(gold_key),
        rows_total: report.rows_total,
        rows_used: report.rows_used,
        errors,
    })
}
