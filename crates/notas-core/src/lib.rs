pub mod aggregate;
pub mod config;
pub mod error;
pub mod extraction;
pub mod fields;
pub mod model;
pub mod normalize;
pub mod outcome;
pub mod pipeline;
pub mod reconstruct;
pub mod selector;

use std::path::Path;

use config::Config;
use error::NotasError;
use extraction::pdftotext::LayoutSource;
use extraction::text::TextSource;
use outcome::Outcome;
use pipeline::{CancelToken, Extraction, Sources};

pub use pipeline::{extract_invoices, run_pipeline};

/// Main API entry point: extract the invoice table and period summary
/// from a PDF report with the built-in extraction strategies.
pub fn extract_pdf(path: &Path, config: &Config) -> Result<Outcome<Extraction>, NotasError> {
    extract_pdf_with_cancel(path, config, &CancelToken::new())
}

/// Like [`extract_pdf`], abandoning the run once `cancel` is set.
pub fn extract_pdf_with_cancel(
    path: &Path,
    config: &Config,
    cancel: &CancelToken,
) -> Result<Outcome<Extraction>, NotasError> {
    let layout = LayoutSource::new();
    let text = TextSource::new();
    let sources = Sources {
        layout: &layout,
        text: &text,
    };
    extract_invoices(path, config, sources, cancel)
}
