//! Bronze → silver: normalize one raw DVF archive into a canonical table.
//!
//! One archive in, one gzip'd semicolon-delimited table out. The transform
//! is a single streaming pass: zip entry → sniffed schema → per-line
//! normalization → canonical writer. Nothing larger than one line is held in
//! memory.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter};
use std::path::Path;
use std::time::Instant;

use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{error, info, instrument};
use zip::ZipArchive;

pub mod extract;
pub mod normalize;
pub mod schema;
pub mod utils;
pub mod write;

use crate::context::PipelineContext;
use crate::error::Result;
use crate::event::{decode_key, parse_trigger, partition_year};
use crate::metrics::Unit;
use extract::find_table_entry;
use normalize::{Normalized, RecordNormalizer};
use schema::TableSchema;
use write::CanonicalWriter;

/// Row accounting for one archive transform.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransformCounts {
    pub rows_out: u64,
    pub rows_dropped: u64,
}

/// Invocation summary, returned even when every source object failed.
#[derive(Debug, Serialize)]
pub struct BronzeToSilverSummary {
    pub status: &'static str,
    pub records_out: u64,
    pub errors: u64,
}

/// Stream the table inside `zip_path` into a canonical silver file at
/// `out_path`. Blocking; run on the blocking pool from async callers.
pub fn transform_archive(zip_path: &Path, out_path: &Path) -> Result<TransformCounts> {
    let file = File::open(zip_path)?;
    let mut archive = ZipArchive::new(file)?;
    let entry_idx = find_table_entry(&mut archive)?;
    let entry = archive.by_index(entry_idx)?;
    let mut reader = BufReader::new(entry);

    // First line decides delimiter and header; invalid bytes are replaced,
    // never fatal.
    let mut buf = Vec::new();
    reader.read_until(b'\n', &mut buf)?;
    let first_line = String::from_utf8_lossy(&buf);
    let table_schema = TableSchema::sniff(&first_line);

    let sink = BufWriter::new(File::create(out_path)?);
    let mut writer = CanonicalWriter::new(sink, &table_schema)?;
    let mut normalizer = RecordNormalizer::new(table_schema);

    loop {
        buf.clear();
        let n = reader.read_until(b'\n', &mut buf)?;
        if n == 0 {
            break;
        }
        let line = String::from_utf8_lossy(&buf);
        match normalizer.normalize_line(&line) {
            Normalized::Row(row) => writer.write_row(&row)?,
            Normalized::Blank | Normalized::Malformed => {}
        }
    }

    writer.finish()?;
    Ok(TransformCounts {
        rows_out: normalizer.rows_emitted(),
        rows_dropped: normalizer.rows_dropped(),
    })
}

/// Silver key for an archive ingested under the given bronze key.
pub fn silver_key_for(bronze_key: &str) -> String {
    let year = partition_year(bronze_key);
    format!("silver/year={year}/dvf_{year}.csv.gz")
}

/// Run the bronze→silver stage over every object named by the trigger.
///
/// Per-object failures (download, malformed archive, upload) are counted and
/// skipped; only an unrecognizable trigger payload aborts the invocation.
/// Malformed rows dropped by the normalizer count into the same error
/// counter, matching how the stage has always reported them.
#[instrument(level = "info", skip(ctx, event))]
pub async fn bronze_to_silver(
    ctx: &PipelineContext,
    event: &Value,
) -> Result<BronzeToSilverSummary> {
    let t0 = Instant::now();
    let refs = parse_trigger(event)?;

    let mut records_out: u64 = 0;
    let mut errors: u64 = 0;

    for obj in refs {
        let key = decode_key(&obj.key);
        if !key.starts_with("bronze/") || !key.ends_with(".zip") {
            info!(key = %key, "skipping non-bronze object");
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
        let zip_path = workdir.path().join("in.zip");
        let out_path = workdir.path().join("out.csv.gz");

        if let Err(e) = ctx.store.download(&obj.bucket, &key, &zip_path).await {
            errors += 1;
            error!(key = %key, "download failed: {}", e);
            continue;
        }

        let counts = {
            let (zip_path, out_path) = (zip_path.clone(), out_path.clone());
            match tokio::task::spawn_blocking(move || transform_archive(&zip_path, &out_path))
                .await
            {
                Ok(Ok(counts)) => counts,
                Ok(Err(e)) => {
                    errors += 1;
                    error!(key = %key, "transform failed: {}", e);
                    continue;
                }
                Err(e) => {
                    errors += 1;
                    error!(key = %key, "transform task failed: {}", e);
                    continue;
                }
            }
        };

        records_out += counts.rows_out;
        errors += counts.rows_dropped;

        let out_key = silver_key_for(&key);
        if let Err(e) = ctx
            .store
            .upload(&ctx.config.silver_bucket, &out_key, &out_path)
            .await
        {
            errors += 1;
            error!(key = %key, out_key = %out_key, "upload failed: {}", e);
            continue;
        }

        info!(
            key = %key,
            out_key = %out_key,
            rows_out = counts.rows_out,
            rows_dropped = counts.rows_dropped,
            "archive normalized"
        );
    }

    let duration = t0.elapsed().as_secs_f64();
    ctx.emit_metric("B2SRuns", 1.0, Unit::Count).await;
    ctx.emit_metric("B2SRecordsOut", records_out as f64, Unit::Count)
        .await;
    ctx.emit_metric("B2SErrors", errors as f64, Unit::Count).await;
    ctx.emit_metric("B2SDurationSec", duration, Unit::Seconds).await;

    ctx.notify(&json!({
        "stage": "bronze_to_silver",
        "records_out": records_out,
        "errors": errors,
        "bucket": ctx.config.silver_bucket,
        "duration_sec": duration,
        "ts": Utc::now().to_rfc3339(),
    }))
    .await;

    Ok(BronzeToSilverSummary {
        status: "ok",
        records_out,
        errors,
    })
}


#[cfg(test)]
mod tests {
    use super::testutil::{gunzip, harness, zip_bytes};
    use super::*;
    use serde_json::json;

    fn init_test_logging() {
        use tracing_subscriber::{EnvFilter, FmtSubscriber};
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new("info,dvf_pipeline=debug")),
            )
            .with_test_writer()
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }

    #[tokio::test]
    async fn normalizes_an_archive_end_to_end() {
        init_test_logging();
        let h = harness();

        // two pipes in the header is below the sniff threshold, so this also
        // exercises the '|' fallback
        let content = "Code Postal|Valeur Fonciere|Date Mutation\n\
                       75001|150000,50|01/01/2024\n\
                       badline\n";
        h.store.insert(
            "dvf-bronze",
            "bronze/year=2024/valeursfoncieres-2024.zip",
            zip_bytes(&[("data.txt", content)]),
        );

        let event = json!({
            "records": [
                {"bucket": "dvf-bronze", "key": "bronze/year%3D2024/valeursfoncieres-2024.zip"}
            ]
        });
        let summary = bronze_to_silver(&h.ctx, &event).await.unwrap();
        assert_eq!(summary.records_out, 1);
        assert_eq!(summary.errors, 1);

        let silver = h
            .store
            .get("dvf-silver", "silver/year=2024/dvf_2024.csv.gz")
            .expect("silver object written");
        assert_eq!(
            gunzip(&silver),
            "code_postal;valeur_fonciere;date_mutation\n\
             75001;150000.5;01/01/2024\n"
        );

        assert_eq!(h.metrics.value_of("B2SRecordsOut"), Some(1.0));
        assert_eq!(h.metrics.value_of("B2SErrors"), Some(1.0));
        let published = h.notifier.published();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0]["stage"], "bronze_to_silver");
    }

    #[tokio::test]
    async fn archive_without_table_counts_one_error() {
        let h = harness();
        h.store.insert(
            "dvf-bronze",
            "bronze/year=2023/broken.zip",
            zip_bytes(&[("readme.csv", "not a table")]),
        );
        let event = json!({
            "records": [{"bucket": "dvf-bronze", "key": "bronze/year=2023/broken.zip"}]
        });
        let summary = bronze_to_silver(&h.ctx, &event).await.unwrap();
        assert_eq!(summary.records_out, 0);
        assert_eq!(summary.errors, 1);
        assert!(h
            .store
            .get("dvf-silver", "silver/year=2023/dvf_2023.csv.gz")
            .is_none());
    }

    #[tokio::test]
    async fn missing_object_is_skipped_not_fatal() {
        let h = harness();
        let event = json!({
            "records": [
                {"bucket": "dvf-bronze", "key": "bronze/year=2022/missing.zip"},
                {"bucket": "dvf-bronze", "key": "not-a-bronze-key.txt"}
            ]
        });
        let summary = bronze_to_silver(&h.ctx, &event).await.unwrap();
        // the missing zip errors, the non-bronze key is skipped silently
        assert_eq!(summary.errors, 1);
        assert_eq!(summary.records_out, 0);
    }

    #[tokio::test]
    async fn bad_trigger_shape_is_fatal() {
        let h = harness();
        let err = bronze_to_silver(&h.ctx, &json!({"nope": true}))
            .await
            .unwrap_err();
        assert!(matches!(err, crate::error::PipelineError::InputShape(_)));
    }

    #[test]
    fn transform_is_idempotent_byte_for_byte() -> crate::error::Result<()> {
        use std::io::Write;

        let content = "Code Postal|Valeur Fonciere|Date Mutation|A|B|C|D\n\
                       1400|150000|02/03/2024|w|x|y|z\n\
                       \n\
                       75001|1234,56|01/01/2024|a|b|c|d\n";
        let dir = tempfile::tempdir()?;
        let zip_path = dir.path().join("in.zip");
        std::fs::File::create(&zip_path)?.write_all(&zip_bytes(&[("data.txt", content)]))?;

        let out_a = dir.path().join("a.csv.gz");
        let out_b = dir.path().join("b.csv.gz");
        let counts_a = transform_archive(&zip_path, &out_a)?;
        let counts_b = transform_archive(&zip_path, &out_b)?;

        assert_eq!(counts_a.rows_out, 2);
        assert_eq!(counts_a.rows_dropped, 0);
        assert_eq!(counts_b.rows_out, 2);
        assert_eq!(std::fs::read(&out_a)?, std::fs::read(&out_b)?);
        assert_eq!(
            gunzip(&std::fs::read(&out_a)?),
            "code_postal;valeur_fonciere;date_mutation;a;b;c;d\n\
             01400;150000.0;02/03/2024;w;x;y;z\n\
             75001;1234.56;01/01/2024;a;b;c;d\n"
        );
        Ok(())
    }
}
