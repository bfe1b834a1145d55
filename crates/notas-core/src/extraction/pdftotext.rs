use crate::error::NotasError;
use crate::extraction::grid::layout_tables;
use crate::extraction::{PageContent, TableSource};
use crate::model::RawTable;
use std::io::Write;
use std::process::Command;

/// Layout strategy: pdftotext (from poppler-utils) with column alignment.
///
/// Uses `pdftotext -layout` so table columns stay aligned on whitespace
/// gutters, then cuts each text block into a uniform-width grid.
pub struct LayoutSource;

impl LayoutSource {
    pub fn new() -> Self {
        LayoutSource
    }

    /// Check if pdftotext is available on the system.
    pub fn is_available() -> bool {
        Command::new("pdftotext")
            .arg("-v")
            .output()
            .map(|o| o.status.success() || !o.stderr.is_empty())
            .unwrap_or(false)
    }

    /// Run pdftotext and split its output into pages.
    pub fn extract_pages(&self, pdf_bytes: &[u8]) -> Result<Vec<PageContent>, NotasError> {
        let mut tmpfile =
            tempfile::NamedTempFile::new().map_err(|e| NotasError::engine("pdftotext", e))?;
        tmpfile
            .write_all(pdf_bytes)
            .map_err(|e| NotasError::engine("pdftotext", e))?;

        let output = Command::new("pdftotext")
            .arg("-layout")
            .arg("-enc")
            .arg("UTF-8")
            .arg(tmpfile.path())
            .arg("-") // output to stdout
            .output()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    NotasError::PdftotextNotFound
                } else {
                    NotasError::engine("pdftotext", e)
                }
            })?;

        if !output.status.success() {
            let code = output.status.code().unwrap_or(-1);
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            return Err(NotasError::PdftotextFailed { code, stderr });
        }

        let text = String::from_utf8_lossy(&output.stdout);
        Ok(split_pages(&text))
    }
}

impl Default for LayoutSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TableSource for LayoutSource {
    fn extract_tables(&self, pdf_bytes: &[u8]) -> Result<Vec<RawTable>, NotasError> {
        let pages = self.extract_pages(pdf_bytes)?;
        log::debug!("pdftotext produced {} page(s)", pages.len());
        Ok(layout_tables(&pages))
    }

    fn backend_name(&self) -> &str {
        "layout"
    }
}

/// pdftotext separates pages with a form feed; the text after the last one
/// is empty.
fn split_pages(text: &str) -> Vec<PageContent> {
    text.split('\x0c')
        .enumerate()
        .map(|(i, page_text)| PageContent::from_text(i + 1, page_text))
        .filter(|p| !p.lines.is_empty() || p.page_number == 1)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_pages_on_form_feed() {
        let pages = split_pages("page one\nline two\x0cpage two\x0c");
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].lines, vec!["page one", "line two"]);
        assert_eq!(pages[1].page_number, 2);
    }

    #[test]
    fn test_empty_document_keeps_first_page() {
        let pages = split_pages("");
        assert_eq!(pages.len(), 1);
        assert!(pages[0].lines.is_empty());
    }
}
