use std::path::{Path, PathBuf};

use async_trait::async_trait;
use glob::glob;
use tokio::fs;
use tracing::debug;

use super::ObjectStore;
use crate::error::{PipelineError, Result};

/// Filesystem-backed store: one directory per bucket under `root`, keys are
/// relative paths inside it. Stands in for the real blob service in local
/// runs and tests.
pub struct LocalDirStore {
    root: PathBuf,
}

impl LocalDirStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn object_path(&self, bucket: &str, key: &str) -> PathBuf {
        self.root.join(bucket).join(key)
    }
}

#[async_trait]
impl ObjectStore for LocalDirStore {
    async fn download(&self, bucket: &str, key: &str, dest: &Path) -> Result<()> {
        let src = self.object_path(bucket, key);
        if !src.is_file() {
            return Err(PipelineError::ObjectNotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            });
        }
        fs::copy(&src, dest).await?;
        debug!(bucket, key, dest = %dest.display(), "downloaded object");
        Ok(())
    }

    async fn upload(&self, bucket: &str, key: &str, src: &Path) -> Result<()> {
        let dest = self.object_path(bucket, key);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::copy(src, &dest).await?;
        debug!(bucket, key, "uploaded object");
        Ok(())
    }

    async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<String>> {
        let bucket_dir = self.root.join(bucket);
        if !bucket_dir.is_dir() {
            return Ok(Vec::new());
        }
        let pattern = format!("{}/**/*", bucket_dir.display());
        let mut keys = Vec::new();
        for entry in glob(&pattern).map_err(|e| PipelineError::Storage(e.to_string()))? {
            let path = match entry {
                Ok(p) => p,
                Err(_) => continue,
            };
            if !path.is_file() {
                continue;
            }
            if let Ok(rel) = path.strip_prefix(&bucket_dir) {
                let key = rel.to_string_lossy().replace('\\', "/");
                if key.starts_with(prefix) {
                    keys.push(key);
                }
            }
        }
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[tokio::test]
    async fn round_trips_an_object() -> Result<()> {
        let root = tempdir()?;
        let store = LocalDirStore::new(root.path());

        let mut src = tempfile::NamedTempFile::new()?;
        src.write_all(b"payload")?;

        store
            .upload("bronze", "year=2024/data.zip", src.path())
            .await?;

        let dest = root.path().join("fetched.zip");
        store
            .download("bronze", "year=2024/data.zip", &dest)
            .await?;
        assert_eq!(std::fs::read(&dest)?, b"payload");

        let keys = store.list("bronze", "year=2024/").await?;
        assert_eq!(keys, vec!["year=2024/data.zip".to_string()]);
        Ok(())
    }

    #[tokio::test]
    async fn missing_object_is_not_found() {
        let root = tempdir().unwrap();
        let store = LocalDirStore::new(root.path());
        let err = store
            .download("bronze", "nope.zip", Path::new("/tmp/never"))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::ObjectNotFound { .. }));
    }
}
