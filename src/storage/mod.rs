//! Durable object storage boundary.
//!
//! The pipeline only ever needs three operations against a named byte-blob
//! store; everything else (replication, lifecycle, auth) belongs to the
//! backing service. Stages receive an `Arc<dyn ObjectStore>` and never touch
//! a concrete backend directly.

use std::path::Path;

use async_trait::async_trait;

use crate::error::Result;

pub mod local;
pub mod memory;

pub use local::LocalDirStore;
pub use memory::MemoryStore;

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch `bucket/key` into the local file at `dest`.
    async fn download(&self, bucket: &str, key: &str, dest: &Path) -> Result<()>;

    /// Store the local file at `src` as `bucket/key`, creating any
    /// intermediate structure the backend needs.
    async fn upload(&self, bucket: &str, key: &str, src: &Path) -> Result<()>;

    /// List keys under `prefix` in `bucket`, in unspecified order.
    async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<String>>;
}
