//! Numeric metrics boundary.
//!
//! Counters and gauges are emitted per invocation under one fixed namespace.
//! The sink is a collaborator like storage and notification; emission
//! failures are logged by the context helper and never escalate.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::info;

use crate::error::Result;

/// Namespace every metric is emitted under.
pub const NAMESPACE: &str = "DVF_Pipeline";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    Count,
    Seconds,
}

impl Unit {
    pub fn as_str(&self) -> &'static str {
        match self {
            Unit::Count => "Count",
            Unit::Seconds => "Seconds",
        }
    }
}

#[async_trait]
pub trait MetricsSink: Send + Sync {
    async fn put_metric(&self, name: &str, value: f64, unit: Unit) -> Result<()>;
}

/// Default sink: writes each datapoint to the log stream.
pub struct LogMetrics;

#[async_trait]
impl MetricsSink for LogMetrics {
    async fn put_metric(&self, name: &str, value: f64, unit: Unit) -> Result<()> {
        info!(
            namespace = NAMESPACE,
            metric = name,
            value,
            unit = unit.as_str(),
            "metric"
        );
        Ok(())
    }
}

/// Test sink that records every datapoint.
#[derive(Default)]
pub struct MemoryMetrics {
    datapoints: Arc<Mutex<Vec<(String, f64, Unit)>>>,
}

impl MemoryMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn datapoints(&self) -> Vec<(String, f64, Unit)> {
        self.datapoints.lock().unwrap().clone()
    }

    pub fn value_of(&self, name: &str) -> Option<f64> {
        self.datapoints
            .lock()
            .unwrap()
            .iter()
            .find(|(n, _, _)| n == name)
            .map(|(_, v, _)| *v)
    }
}

#[async_trait]
impl MetricsSink for MemoryMetrics {
    async fn put_metric(&self, name: &str, value: f64, unit: Unit) -> Result<()> {
        self.datapoints
            .lock()
            .unwrap()
            .push((name.to_string(), value, unit));
        Ok(())
    }
}
