use std::sync::Arc;

use serde_json::Value;
use tracing::warn;

use crate::config::Config;
use crate::metrics::{MetricsSink, Unit};
use crate::notify::Notifier;
use crate::storage::ObjectStore;

/// Explicit handles for the external collaborators, built once per process
/// and passed into every stage. Replaces any notion of ambient global
/// clients.
pub struct PipelineContext {
    pub config: Config,
    pub store: Arc<dyn ObjectStore>,
    pub notifier: Arc<dyn Notifier>,
    pub metrics: Arc<dyn MetricsSink>,
}

impl PipelineContext {
    pub fn new(
        config: Config,
        store: Arc<dyn ObjectStore>,
        notifier: Arc<dyn Notifier>,
        metrics: Arc<dyn MetricsSink>,
    ) -> Self {
        Self {
            config,
            store,
            notifier,
            metrics,
        }
    }

    /// Emit one datapoint. Failures are logged, never escalated.
    pub async fn emit_metric(&self, name: &str, value: f64, unit: Unit) {
        if let Err(e) = self.metrics.put_metric(name, value, unit).await {
            warn!(metric = name, "metric emission failed: {}", e);
        }
    }

    /// Publish a completion notification. Failures are logged, never
    /// escalated.
    pub async fn notify(&self, message: &Value) {
        if let Err(e) = self.notifier.publish(message).await {
            warn!("notification publish failed: {}", e);
        }
    }
}
