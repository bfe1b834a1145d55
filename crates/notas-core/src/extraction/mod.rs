pub mod grid;
pub mod pdftotext;
pub mod text;

use crate::error::NotasError;
use crate::model::RawTable;

/// Text lines extracted from a single page of a PDF.
#[derive(Debug, Clone)]
pub struct PageContent {
    pub page_number: usize,
    pub lines: Vec<String>,
}

impl PageContent {
    /// Split text on line breaks into a page.
    pub fn from_text(page_number: usize, text: &str) -> Self {
        PageContent {
            page_number,
            lines: text.lines().map(|l| l.to_string()).collect(),
        }
    }
}

/// A PDF table-extraction backend.
///
/// Implementations return every table-like region they find; deciding
/// which ones hold invoices is the selector's job.
pub trait TableSource: Send + Sync {
    /// Extract raw tables from PDF bytes, in page order.
    fn extract_tables(&self, pdf_bytes: &[u8]) -> Result<Vec<RawTable>, NotasError>;

    /// Name of this extraction backend (for diagnostics).
    fn backend_name(&self) -> &str;
}
