use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::fs;

use super::ObjectStore;
use crate::error::{PipelineError, Result};

/// In-memory store for tests: objects live in a map keyed by
/// `(bucket, key)`.
#[derive(Default)]
pub struct MemoryStore {
    objects: Arc<Mutex<HashMap<(String, String), Vec<u8>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, bucket: &str, key: &str, bytes: Vec<u8>) {
        self.objects
            .lock()
            .unwrap()
            .insert((bucket.to_string(), key.to_string()), bytes);
    }

    pub fn get(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.objects
            .lock()
            .unwrap()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn download(&self, bucket: &str, key: &str, dest: &Path) -> Result<()> {
        let bytes = self
            .get(bucket, key)
            .ok_or_else(|| PipelineError::ObjectNotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            })?;
        fs::write(dest, bytes).await?;
        Ok(())
    }

    async fn upload(&self, bucket: &str, key: &str, src: &Path) -> Result<()> {
        let bytes = fs::read(src).await?;
        self.insert(bucket, key, bytes);
        Ok(())
    }

    async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<String>> {
        Ok(self
            .objects
            .lock()
            .unwrap()
            .keys()
            .filter(|(b, k)| b == bucket && k.starts_with(prefix))
            .map(|(_, k)| k.clone())
            .collect())
    }
}
