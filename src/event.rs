//! Trigger payload parsing and storage-key conventions.
//!
//! Invocations arrive with a JSON payload naming the objects to process.
//! Two shapes are accepted and told apart by inspecting the first record's
//! fields, not by a type flag: a direct storage event (`records` of
//! `{bucket, key}`) and a queue-wrapped event (`records` of `{body}` where
//! each body is a JSON-encoded storage event). Anything else is a
//! misconfigured harness and aborts the invocation.

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use percent_encoding::percent_decode_str;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::{PipelineError, Result};

/// One object named by a trigger payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRef {
    pub bucket: String,
    pub key: String,
}

static YEAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"year[=/](\d{4})").expect("year pattern is valid"));

/// Decode a storage key the way queue transports mangle it:
/// `+` becomes a space, then percent escapes are resolved
/// (`year%3D2025` -> `year=2025`). Must run before any path parsing.
pub fn decode_key(raw: &str) -> String {
    let plus_decoded = raw.replace('+', " ");
    percent_decode_str(&plus_decoded)
        .decode_utf8_lossy()
        .into_owned()
}

/// Extract the 4-digit vintage year from a partitioned key
/// (`bronze/year=2023/...`), if present.
pub fn year_from_key(key: &str) -> Option<String> {
    YEAR_RE
        .captures(key)
        .map(|caps| caps[1].to_string())
}

/// Partition tag for a bronze→silver output derived from one source key.
pub fn partition_year(key: &str) -> String {
    year_from_key(key).unwrap_or_else(|| "unknown".to_string())
}

/// Partition tag for a gold report derived from every contributing key:
/// exactly one distinct year wins, anything else degrades to `"multi"`.
pub fn merge_partition_years<'a>(keys: impl IntoIterator<Item = &'a str>) -> String {
    let years: BTreeSet<String> = keys.into_iter().filter_map(year_from_key).collect();
    if years.len() == 1 {
        years.into_iter().next().expect("len checked")
    } else {
        "multi".to_string()
    }
}

/// Parse a trigger payload into the list of referenced objects.
///
/// Returns `InputShape` when the payload cannot be read as either accepted
/// shape; an empty `records` array is valid and yields an empty list.
pub fn parse_trigger(event: &Value) -> Result<Vec<ObjectRef>> {
    let records = event
        .get("records")
        .and_then(Value::as_array)
        .ok_or_else(|| PipelineError::InputShape("missing `records` array".into()))?;

    let first = match records.first() {
        Some(f) => f,
        None => return Ok(Vec::new()),
    };

    if first.get("body").is_some() {
        return Ok(unwrap_queue_records(records));
    }

    if first.get("bucket").is_some() && first.get("key").is_some() {
        return collect_object_refs(records);
    }

    Err(PipelineError::InputShape(
        "first record has neither `body` nor `bucket`/`key`".into(),
    ))
}

fn collect_object_refs(records: &[Value]) -> Result<Vec<ObjectRef>> {
    records
        .iter()
        .map(|r| {
            serde_json::from_value::<ObjectRef>(r.clone())
                .map_err(|e| PipelineError::InputShape(format!("bad record: {e}")))
        })
        .collect()
}

fn unwrap_queue_records(records: &[Value]) -> Vec<ObjectRef> {
    let mut out = Vec::new();
    for msg in records {
        let body = msg.get("body").and_then(Value::as_str).unwrap_or_default();
        let payload: Value = match serde_json::from_str(body) {
            Ok(v) => v,
            Err(e) => {
                warn!("skipping undecodable queue message body: {}", e);
                continue;
            }
        };
        if let Some(inner) = payload.get("records").and_then(Value::as_array) {
            for r in inner {
                match serde_json::from_value::<ObjectRef>(r.clone()) {
                    Ok(obj) => out.push(obj),
                    Err(e) => warn!("skipping malformed wrapped record: {}", e),
                }
            }
        }
    }
    out
}
