use std::env;
use std::path::PathBuf;

/// Bucket names and the local data root, read from the environment with the
/// same defaults the deployment templates use. Constructed once in `main`
/// and passed down explicitly; no module-level globals.
#[derive(Debug, Clone)]
pub struct Config {
    pub bronze_bucket: String,
    pub silver_bucket: String,
    pub gold_bucket: String,
    /// Root directory backing `LocalDirStore` (one subdirectory per bucket).
    pub data_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            bronze_bucket: env::var("BRONZE_BUCKET").unwrap_or_else(|_| "dvf-bronze".into()),
            silver_bucket: env::var("SILVER_BUCKET").unwrap_or_else(|_| "dvf-silver".into()),
            gold_bucket: env::var("GOLD_BUCKET").unwrap_or_else(|_| "dvf-gold".into()),
            data_dir: env::var("DVF_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("data")),
        }
    }
}
