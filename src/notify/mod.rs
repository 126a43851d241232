//! Completion-notification boundary.
//!
//! Every stage publishes one JSON status payload when it finishes. Delivery
//! is fire-and-forget: the context helper logs publish failures and never
//! lets them fail an invocation.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

use crate::error::Result;

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn publish(&self, message: &Value) -> Result<()>;
}

/// Default notifier: writes the payload to the log stream.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn publish(&self, message: &Value) -> Result<()> {
        info!(payload = %message, "notification published");
        Ok(())
    }
}

/// Test notifier that records every published payload.
#[derive(Default)]
pub struct MemoryNotifier {
    published: Arc<Mutex<Vec<Value>>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn published(&self) -> Vec<Value> {
        self.published.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for MemoryNotifier {
    async fn publish(&self, message: &Value) -> Result<()> {
        self.published.lock().unwrap().push(message.clone());
        Ok(())
    }
}
