use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum NotasError {
    #[error("PDF not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    #[error("{backend} extraction failed: {source}")]
    Engine {
        backend: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("pdftotext not found. Install poppler: brew install poppler (macOS) or apt install poppler-utils (Linux)")]
    PdftotextNotFound,

    #[error("pdftotext failed with exit code {code}: {stderr}")]
    PdftotextFailed { code: i32, stderr: String },

    #[error("no invoice tables found in PDF")]
    NoTablesFound,

    #[error("extraction cancelled")]
    Cancelled,

    #[error("failed to load config from {path}: {reason}")]
    ConfigLoad { path: PathBuf, reason: String },

    #[error("invalid config: {0}")]
    ConfigInvalid(String),

    #[error("unknown extraction method '{0}' (expected auto, layout or text)")]
    UnknownMethod(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl NotasError {
    /// Wrap an engine-level failure, keeping the original cause.
    pub fn engine<E>(backend: &str, source: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        NotasError::Engine {
            backend: backend.to_string(),
            source: source.into(),
        }
    }
}
