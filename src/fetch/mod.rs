//! Ingest → bronze: pull the published DVF archives into bronze storage.

use std::io::Write;
use std::time::Instant;

use chrono::Utc;
use reqwest::Client;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{error, info, instrument};
use url::Url;

use crate::context::PipelineContext;
use crate::error::Result;
use crate::metrics::Unit;

/// One published DVF vintage.
pub struct DvfSource {
    pub year: &'static str,
    pub url: &'static str,
}

/// The vintages currently published on data.gouv.fr. Each resource URL pins
/// a specific upload, so re-running ingest is reproducible.
pub static DVF_SOURCES: &[DvfSource] = &[
    DvfSource {
        year: "2025",
        url: "https://static.data.gouv.fr/resources/demandes-de-valeurs-foncieres/20251018-234902/valeursfoncieres-2025-s1.txt.zip",
    },
    DvfSource {
        year: "2024",
        url: "https://static.data.gouv.fr/resources/demandes-de-valeurs-foncieres/20251018-234857/valeursfoncieres-2024.txt.zip",
    },
    DvfSource {
        year: "2023",
        url: "https://static.data.gouv.fr/resources/demandes-de-valeurs-foncieres/20251018-234851/valeursfoncieres-2023.txt.zip",
    },
];

#[derive(Debug, Serialize)]
pub struct IngestSummary {
    pub status: &'static str,
    pub ok: u64,
    pub fail: u64,
    pub year: Option<String>,
}

/// Bronze key for one vintage.
pub fn bronze_key_for(year: &str) -> String {
    format!("bronze/year={year}/valeursfoncieres-{year}.zip")
}

/// Download each selected vintage and put it in the bronze bucket.
///
/// An optional target year narrows the source list; per-source failures are
/// counted and the loop continues.
#[instrument(level = "info", skip(ctx, client))]
pub async fn ingest_to_bronze(
    ctx: &PipelineContext,
    client: &Client,
    target_year: Option<&str>,
) -> Result<IngestSummary> {
    let t0 = Instant::now();
    let mut ok = 0u64;
    let mut fail = 0u64;

    let sources: Vec<&DvfSource> = DVF_SOURCES
        .iter()
        .filter(|s| target_year.map_or(true, |y| s.year == y))
        .collect();

    for source in sources {
        info!(year = source.year, url = source.url, "downloading archive");
        match download_to_bronze(ctx, client, source).await {
            Ok(key) => {
                info!(year = source.year, key = %key, "archive ingested");
                ok += 1;
            }
            Err(e) => {
                fail += 1;
                error!(year = source.year, "ingest failed: {}", e);
            }
        }
    }

    let duration = t0.elapsed().as_secs_f64();
    ctx.emit_metric("IngestRuns", 1.0, Unit::Count).await;
    ctx.emit_metric("IngestFilesOK", ok as f64, Unit::Count).await;
    ctx.emit_metric("IngestFilesFail", fail as f64, Unit::Count).await;
    ctx.emit_metric("IngestDurationSec", duration, Unit::Seconds).await;

    ctx.notify(&json!({
        "stage": "ingest_to_bronze",
        "ok": ok,
        "fail": fail,
        "duration_sec": duration,
        "ts": Utc::now().to_rfc3339(),
    }))
    .await;

    Ok(IngestSummary {
        status: "ok",
        ok,
        fail,
        year: target_year.map(str::to_string),
    })
}

async fn download_to_bronze(
    ctx: &PipelineContext,
    client: &Client,
    source: &DvfSource,
) -> Result<String> {
    let url = Url::parse(source.url)?;
    let resp = client.get(url).send().await?.error_for_status()?;
    let bytes = resp.bytes().await?;

    let mut tmp = tempfile::NamedTempFile::new()?;
    tmp.write_all(&bytes)?;

    let key = bronze_key_for(source.year);
    ctx.store
        .upload(&ctx.config.bronze_bucket, &key, tmp.path())
        .await?;
    Ok(key)
}

/// Target-year filter from the ingest trigger payload, if any.
pub fn target_year_from_event(event: &Value) -> Option<String> {
    match event.get("year") {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}
