//! Text strategy: pure-Rust extraction with `pdf_extract`.
//!
//! `pdf_extract` flows text rather than laying it out, so column alignment
//! is lost and each line is split on wide gaps instead. Rows whose cells
//! ran together survive as a single cell and are recovered later from the
//! line text.
//!
//! `pdf_extract` can panic on malformed input, so calls are wrapped in
//! [`std::panic::catch_unwind`] and reported as engine failures.

use crate::error::NotasError;
use crate::extraction::grid::gap_tables;
use crate::extraction::{PageContent, TableSource};
use crate::model::RawTable;
use std::panic::{self, AssertUnwindSafe};

pub struct TextSource;

impl TextSource {
    pub fn new() -> Self {
        TextSource
    }

    pub fn extract_pages(&self, pdf_bytes: &[u8]) -> Result<Vec<PageContent>, NotasError> {
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            pdf_extract::extract_text_from_mem_by_pages(pdf_bytes)
        }));
        let pages = match result {
            Ok(Ok(pages)) => pages,
            Ok(Err(e)) => return Err(NotasError::engine("pdf-extract", e.to_string())),
            Err(_) => {
                return Err(NotasError::engine(
                    "pdf-extract",
                    "extraction panicked (malformed document)",
                ))
            }
        };

        Ok(pages
            .iter()
            .enumerate()
            .map(|(i, text)| PageContent::from_text(i + 1, text))
            .collect())
    }
}

impl Default for TextSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TableSource for TextSource {
    fn extract_tables(&self, pdf_bytes: &[u8]) -> Result<Vec<RawTable>, NotasError> {
        let pages = self.extract_pages(pdf_bytes)?;
        log::debug!("pdf-extract produced {} page(s)", pages.len());
        Ok(gap_tables(&pages))
    }

    fn backend_name(&self) -> &str {
        "text"
    }
}
