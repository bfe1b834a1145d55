use crate::config::{Config, DEFAULT_MIN_ROWS};
use crate::model::{RawTable, SelectedTable};

/// Recognizes invoice-number cells by their fixed numeric prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceMarker {
    prefix: String,
}

impl InvoiceMarker {
    pub fn new(prefix: impl Into<String>) -> Self {
        InvoiceMarker {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn matches(&self, cell: &str) -> bool {
        !self.prefix.is_empty() && cell.contains(&self.prefix)
    }

    pub fn matches_cell(&self, cell: Option<&str>) -> bool {
        cell.is_some_and(|c| self.matches(c))
    }
}

/// Keeps only the raw tables that carry invoice line items.
#[derive(Debug, Clone)]
pub struct TableSelector {
    marker: InvoiceMarker,
    min_rows: usize,
}

impl TableSelector {
    pub fn new(marker: InvoiceMarker) -> Self {
        TableSelector {
            marker,
            min_rows: DEFAULT_MIN_ROWS,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        TableSelector::new(InvoiceMarker::new(config.marker.clone())).with_min_rows(config.min_rows)
    }

    pub fn with_min_rows(mut self, min_rows: usize) -> Self {
        self.min_rows = min_rows;
        self
    }

    pub fn marker(&self) -> &InvoiceMarker {
        &self.marker
    }

    /// Whether a table qualifies: enough rows and at least one marker cell.
    pub fn accepts(&self, table: &RawTable) -> bool {
        table.rows.len() >= self.min_rows && table.cells().any(|c| self.marker.matches(c))
    }

    /// Filter tables in order. An empty result means the document had no
    /// invoice data, which is not an error.
    pub fn select(&self, tables: Vec<RawTable>) -> Vec<SelectedTable> {
        let total = tables.len();
        let selected: Vec<SelectedTable> = tables
            .into_iter()
            .filter(|t| self.accepts(t))
            .map(SelectedTable::new)
            .collect();
        log::debug!(
            "selected {} of {} table(s) with marker {}",
            selected.len(),
            total,
            self.marker.prefix()
        );
        selected
    }
}
