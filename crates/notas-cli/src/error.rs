use notas_core::error::NotasError;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Notas(#[from] NotasError),

    #[error("failed to write spreadsheet: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("failed to write CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unknown output format '{0}' (expected xlsx, csv or json)")]
    UnknownFormat(String),
}
