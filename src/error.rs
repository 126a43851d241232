use thiserror::Error;

/// Error taxonomy for the pipeline.
///
/// Source-structural and transport variants are swallowed at the per-object
/// loop boundary and surfaced as counters; `InputShape` is the one variant
/// that aborts a whole invocation.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("no delimited text entry found inside archive")]
    MalformedArchive,

    #[error("none of the candidate columns {0:?} present in header")]
    ColumnNotFound(Vec<String>),

    #[error("trigger payload does not match any recognized shape: {0}")]
    InputShape(String),

    #[error("object not found: {bucket}/{key}")]
    ObjectNotFound { bucket: String, key: String },

    #[error("storage error: {0}")]
    Storage(String),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
