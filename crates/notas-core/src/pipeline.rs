//! Stage sequencing: PDF → raw tables → selected tables → canonical tables
//! → normalized union → period summary.
//!
//! Non-fatal problems travel as diagnostics in the returned [`Outcome`];
//! fatal ones (missing file, engine failure, cancellation) are errors.

use serde::Serialize;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::aggregate::{summarize, union_tables};
use crate::config::{Config, ExtractionMethod, NormalizeOptions};
use crate::error::NotasError;
use crate::extraction::TableSource;
use crate::model::{CanonicalTable, NormalizedRecord, PeriodSummaryRow, SelectedTable};
use crate::normalize::normalize;
use crate::outcome::{Diagnostic, Outcome, Stage};
use crate::reconstruct::reconstruct;
use crate::selector::{InvoiceMarker, TableSelector};

/// Lets another thread abandon a run. Checked between stages only.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), NotasError> {
        if self.is_cancelled() {
            Err(NotasError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// The two raw table strategies, in auto-mode order.
#[derive(Clone, Copy)]
pub struct Sources<'a> {
    pub layout: &'a dyn TableSource,
    pub text: &'a dyn TableSource,
}

impl<'a> Sources<'a> {
    fn get(&self, method: ExtractionMethod) -> &'a dyn TableSource {
        match method {
            ExtractionMethod::Text => self.text,
            ExtractionMethod::Layout | ExtractionMethod::Auto => self.layout,
        }
    }
}

/// Everything one run produced.
#[derive(Debug, Clone, Serialize)]
pub struct Extraction {
    /// Backend whose tables were used.
    pub backend: String,
    pub tables_found: usize,
    pub tables_selected: usize,
    pub table: CanonicalTable,
    pub records: Vec<NormalizedRecord>,
    pub summary: Vec<PeriodSummaryRow>,
}

impl Extraction {
    /// No invoice rows at all. Callers decide whether that is an error.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

/// Run the whole pipeline on a PDF file.
pub fn extract_invoices(
    path: &Path,
    config: &Config,
    sources: Sources<'_>,
    cancel: &CancelToken,
) -> Result<Outcome<Extraction>, NotasError> {
    if !path.is_file() {
        return Err(NotasError::SourceNotFound(path.to_path_buf()));
    }
    let bytes = std::fs::read(path)?;
    log::info!("read {} ({} bytes)", path.display(), bytes.len());
    run_pipeline(&bytes, config, sources, cancel)
}

/// Run the whole pipeline on PDF bytes already in memory.
///
/// In auto mode the text strategy runs when the layout strategy fails or
/// yields no invoice rows once its tables are reconstructed.
pub fn run_pipeline(
    pdf_bytes: &[u8],
    config: &Config,
    sources: Sources<'_>,
    cancel: &CancelToken,
) -> Result<Outcome<Extraction>, NotasError> {
    cancel.check()?;
    let selector = TableSelector::from_config(config);
    let mut diagnostics = Vec::new();

    let run = |source: &dyn TableSource| {
        run_strategy(source, pdf_bytes, &selector, &config.normalize, cancel)
    };
    let attempt = match config.method {
        ExtractionMethod::Auto => match run(sources.get(ExtractionMethod::Layout)) {
            Ok(attempt) if !attempt.table.is_empty() => attempt,
            Ok(attempt) => {
                log::info!(
                    "layout strategy gave no invoice rows ({} of {} table(s) selected), trying text strategy",
                    attempt.selected,
                    attempt.found
                );
                cancel.check()?;
                run(sources.get(ExtractionMethod::Text))?
            }
            Err(NotasError::Cancelled) => return Err(NotasError::Cancelled),
            Err(e) => {
                log::warn!("layout strategy failed ({e}), trying text strategy");
                diagnostics.push(Diagnostic::new(
                    Stage::Extraction,
                    format!("layout strategy failed: {e}"),
                ));
                cancel.check()?;
                run(sources.get(ExtractionMethod::Text))?
            }
        },
        method => run(sources.get(method))?,
    };
    diagnostics.extend(attempt.diagnostics);
    cancel.check()?;

    let table = attempt.table;
    let records = table.records();
    let summary = summarize(&records);
    log::debug!(
        "{} record(s) across {} period(s)",
        records.len(),
        summary.len()
    );

    Ok(Outcome::from_parts(
        Extraction {
            backend: attempt.backend,
            tables_found: attempt.found,
            tables_selected: attempt.selected,
            table,
            records,
            summary,
        },
        diagnostics,
    ))
}

/// What one strategy produced, before the summary.
struct Attempt {
    backend: String,
    found: usize,
    selected: usize,
    table: CanonicalTable,
    diagnostics: Vec<Diagnostic>,
}

fn run_strategy(
    source: &dyn TableSource,
    pdf_bytes: &[u8],
    selector: &TableSelector,
    options: &NormalizeOptions,
    cancel: &CancelToken,
) -> Result<Attempt, NotasError> {
    let backend = source.backend_name().to_string();
    let raw = source.extract_tables(pdf_bytes)?;
    let found = raw.len();
    let selected = selector.select(raw);
    log::info!(
        "{backend}: {} of {found} table(s) carry invoices",
        selected.len()
    );
    cancel.check()?;

    let (table, diagnostics) =
        process_tables(&selected, selector.marker(), options, cancel)?.into_parts();
    Ok(Attempt {
        backend,
        found,
        selected: selected.len(),
        table,
        diagnostics,
    })
}

/// Reconstruct, normalize and stack the selected tables, in order.
///
/// Tables that turn out to hold no invoice rows are skipped. An empty
/// selection gives an empty table.
pub fn process_tables(
    selected: &[SelectedTable],
    marker: &InvoiceMarker,
    options: &NormalizeOptions,
    cancel: &CancelToken,
) -> Result<Outcome<CanonicalTable>, NotasError> {
    let mut diagnostics = Vec::new();

    let mut canonical = Vec::with_capacity(selected.len());
    for table in selected {
        match reconstruct(table, marker) {
            Some(outcome) => {
                let (t, d) = outcome.into_parts();
                diagnostics.extend(d);
                canonical.push(t);
            }
            None => log::debug!("page {}: table carried no invoice rows", table.page_number()),
        }
    }
    cancel.check()?;

    let normalized: Vec<CanonicalTable> = canonical
        .into_iter()
        .map(|t| {
            let (t, d) = normalize(t, options).into_parts();
            diagnostics.extend(d);
            t
        })
        .collect();

    Ok(Outcome::from_parts(union_tables(normalized), diagnostics))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_token_is_shared_between_clones() {
        let token = CancelToken::new();
        let other = token.clone();
        assert!(token.check().is_ok());
        other.cancel();
        assert!(token.is_cancelled());
        assert!(matches!(token.check(), Err(NotasError::Cancelled)));
    }

    #[test]
    fn empty_selection_gives_empty_table() {
        let out = process_tables(
            &[],
            &InvoiceMarker::new("2022000000"),
            &NormalizeOptions::default(),
            &CancelToken::new(),
        )
        .unwrap();
        assert!(!out.is_degraded());
        assert!(out.value().is_empty());
    }
}
