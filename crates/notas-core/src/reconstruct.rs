//! Schema reconstruction: from a selected raw grid to a canonical table.
//!
//! The two extraction strategies disagree on whether the report's header
//! line survives, so a header row is used when one is found and the
//! canonical field list is used otherwise. Either way, only rows whose
//! first cell carries the invoice marker are kept.

use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

use crate::fields::{lookup_synonym, normalize_label, resolve_header, Field};
use crate::model::{CanonicalTable, Cell, Column, SelectedTable};
use crate::outcome::{Diagnostic, Outcome, Stage};
use crate::selector::InvoiceMarker;

/// Rebuild a selected table with named columns.
///
/// Returns `None` when no row carries an invoice number in its first cell;
/// the table held no usable data and the caller moves on.
pub fn reconstruct(table: &SelectedTable, marker: &InvoiceMarker) -> Option<Outcome<CanonicalTable>> {
    let rows = table.rows();
    let mut diagnostics = Vec::new();

    let (columns, data_rows) = match find_header_row(rows, marker) {
        Some(idx) => {
            let labels: Vec<String> = rows[idx]
                .iter()
                .map(|c| c.as_deref().unwrap_or("").trim().to_string())
                .collect();
            log::debug!(
                "page {}: header row {} with {} column(s)",
                table.page_number(),
                idx,
                labels.len()
            );
            let columns = assign_roles(&labels);
            let data = filter_marked_rows(&rows[idx + 1..], idx + 1, marker, &mut diagnostics);
            (columns, data)
        }
        None => {
            log::debug!(
                "page {}: no header row, using canonical columns",
                table.page_number()
            );
            let columns: Vec<Column> = Field::CANONICAL.iter().map(|f| Column::for_field(*f)).collect();
            let data = filter_marked_rows(rows, 0, marker, &mut diagnostics)
                .into_iter()
                .map(|row| recover_collapsed_row(row, marker))
                .collect();
            (columns, data)
        }
    };

    if data_rows.is_empty() {
        log::debug!("page {}: no invoice rows, table skipped", table.page_number());
        return None;
    }

    Some(Outcome::from_parts(
        CanonicalTable::new(columns, data_rows),
        diagnostics,
    ))
}

/// The first row that names the note-number column, or has one cell
/// mentioning "nota" and another mentioning "emissão". Rows carrying an
/// invoice number are data, never headers.
pub fn find_header_row(rows: &[Vec<Option<String>>], marker: &InvoiceMarker) -> Option<usize> {
    rows.iter().position(|row| {
        let cells: Vec<&str> = row.iter().filter_map(|c| c.as_deref()).collect();
        if cells.iter().any(|c| marker.matches(c)) {
            return false;
        }
        if cells.iter().any(|c| lookup_synonym(c) == Some(Field::NoteNumber)) {
            return true;
        }
        let labels: Vec<String> = cells.iter().map(|c| normalize_label(c)).collect();
        let mentions = |token: &[&str]| -> Vec<usize> {
            labels
                .iter()
                .enumerate()
                .filter(|(_, l)| token.iter().any(|t| l.contains(t)))
                .map(|(i, _)| i)
                .collect()
        };
        let nota = mentions(&["nota"]);
        let emissao = mentions(&["emissão", "emissao"]);
        nota.iter().any(|n| emissao.iter().any(|e| e != n))
    })
}

/// Resolve column roles. A role goes to the first column that claims it;
/// later duplicates keep their label but get no role. Blank labels are
/// named after their position (`coluna_3`).
pub fn assign_roles(labels: &[String]) -> Vec<Column> {
    let mut taken = HashSet::new();
    labels
        .iter()
        .enumerate()
        .map(|(i, label)| {
            if label.trim().is_empty() {
                return Column::new(format!("coluna_{}", i + 1), None);
            }
            let role = resolve_header(label).filter(|f| taken.insert(*f));
            Column::new(label.clone(), role)
        })
        .collect()
}

fn filter_marked_rows(
    rows: &[Vec<Option<String>>],
    offset: usize,
    marker: &InvoiceMarker,
    diagnostics: &mut Vec<Diagnostic>,
) -> Vec<Vec<Cell>> {
    let mut kept = Vec::new();
    for (i, row) in rows.iter().enumerate() {
        let first = row.first().and_then(|c| c.as_deref());
        if marker.matches_cell(first) {
            kept.push(row.iter().cloned().map(Cell::from).collect());
        } else if row.iter().skip(1).any(|c| marker.matches_cell(c.as_deref())) {
            let row_idx = offset + i;
            log::warn!("row {row_idx}: invoice number outside the first column, skipped");
            diagnostics.push(
                Diagnostic::new(Stage::Reconstruction, "invoice number outside the first column")
                    .at_row(row_idx),
            );
        }
    }
    kept
}

static DIGITS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").expect("valid regex"));
static DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{2}/\d{2}/\d{4}").expect("valid regex"));
static TAX_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d{2}\.\d{3}\.\d{3}/\d{4}-\d{2}|\d{3}\.\d{3}\.\d{3}-\d{2}").expect("valid regex")
});
static AMOUNT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{1,3}(?:\.\d{3})*,\d{2}").expect("valid regex"));

/// Rows that ran together into one cell are re-read from their text.
fn recover_collapsed_row(row: Vec<Cell>, marker: &InvoiceMarker) -> Vec<Cell> {
    let mut filled = row.iter().filter(|c| !c.is_blank());
    let (Some(only), None) = (filled.next(), filled.next()) else {
        return row;
    };
    let recovered = recover_line(&only.as_text(), marker);
    recovered.unwrap_or(row)
}

/// Read the recognizable fields out of a collapsed report line.
///
/// Amounts appear in report order: service value, tax base, rate, own tax,
/// withheld tax. Free-text fields cannot be told apart and stay empty.
pub fn recover_line(text: &str, marker: &InvoiceMarker) -> Option<Vec<Cell>> {
    let note = DIGITS_RE
        .find_iter(text)
        .map(|m| m.as_str())
        .find(|d| marker.matches(d))?;

    // A bare invoice number has nothing to recover.
    if text.trim() == note {
        return None;
    }

    let mut row = vec![Cell::Empty; Field::CANONICAL.len()];
    let mut set = |field: Field, value: &str| {
        if let Some(i) = Field::CANONICAL.iter().position(|f| *f == field) {
            row[i] = Cell::text(value);
        }
    };

    set(Field::NoteNumber, note);
    if let Some(m) = DATE_RE.find(text) {
        set(Field::IssueDate, m.as_str());
    }
    if let Some(m) = TAX_ID_RE.find(text) {
        set(Field::PayerTaxId, m.as_str());
    }
    let amounts: Vec<&str> = AMOUNT_RE.find_iter(text).map(|m| m.as_str()).collect();
    let amount_fields = [
        Field::ServiceValue,
        Field::TaxBase,
        Field::TaxRate,
        Field::OwnTax,
        Field::ThirdPartyTax,
    ];
    for (field, amount) in amount_fields.iter().zip(&amounts) {
        set(*field, amount);
    }

    Some(row)
}
