//! Field normalization for reconstructed invoice tables.
//!
//! Steps, each switchable through [`NormalizeOptions`]:
//! 1. drop all-empty rows and columns
//! 2. lower-case and trim column names
//! 3. drop page footers and banners ("total", "página", ...), judged on
//!    the text as extracted
//! 4. canonicalize dates to `DD/MM/YYYY`
//! 5. parse monetary columns (Brazilian `1.234,56` notation) to decimals
//! 6. derive the accounting period next to the issuance date
//! 7. drop rows and columns left empty by the coercions
//!
//! Running the normalizer on its own output changes nothing.

use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::LazyLock;

use crate::config::NormalizeOptions;
use crate::fields::{normalize_label, Field, FieldKind};
use crate::model::{CanonicalTable, Cell, Column, Period};
use crate::outcome::{Diagnostic, Outcome, Stage};

const BOILERPLATE_TERMS: [&str; 5] = ["total", "página", "pagina", "subtotal", "sub-total"];

static SLASH_DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{2})/(\d{2})/(\d{4})").expect("valid regex"));
static PACKED_DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|\D)(\d{2})(\d{2})(\d{4})(?:\D|$)").expect("valid regex"));
static SHORT_PACKED_DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|\D)(\d)(\d{2})(\d{4})(?:\D|$)").expect("valid regex"));

/// Normalize a canonical table into a new one.
pub fn normalize(table: CanonicalTable, options: &NormalizeOptions) -> Outcome<CanonicalTable> {
    let mut diagnostics = Vec::new();
    let (columns, rows) = table.into_parts();

    let (columns, rows) = prune(columns, rows, options);

    let columns: Vec<Column> = columns
        .into_iter()
        .map(|c| Column {
            name: normalize_label(&c.name),
            ..c
        })
        .collect();

    let before = rows.len();
    let mut rows: Vec<Vec<Cell>> = rows.into_iter().filter(|r| !is_boilerplate_row(r)).collect();
    if rows.len() < before {
        log::debug!("dropped {} footer/banner row(s)", before - rows.len());
    }

    if options.convert_dates {
        for (j, column) in columns.iter().enumerate() {
            if column.kind == FieldKind::Date {
                convert_date_column(&mut rows, j, &column.name, &mut diagnostics);
            }
        }
    }

    if options.convert_money {
        for (j, column) in columns.iter().enumerate() {
            if column.kind == FieldKind::Money {
                convert_money_column(&mut rows, j, &column.name, &mut diagnostics);
            }
        }
    }

    let (columns, rows) = derive_period(columns, rows, options.convert_dates);
    let (columns, rows) = prune(columns, rows, options);

    Outcome::from_parts(CanonicalTable::new(columns, rows), diagnostics)
}

fn prune(
    columns: Vec<Column>,
    mut rows: Vec<Vec<Cell>>,
    options: &NormalizeOptions,
) -> (Vec<Column>, Vec<Vec<Cell>>) {
    if options.remove_empty_rows {
        rows.retain(|r| !r.iter().all(Cell::is_blank));
    }
    if !options.remove_empty_cols || rows.is_empty() {
        return (columns, rows);
    }

    let keep: Vec<bool> = (0..columns.len())
        .map(|j| rows.iter().any(|r| r.get(j).is_some_and(|c| !c.is_blank())))
        .collect();
    if keep.iter().all(|k| *k) {
        return (columns, rows);
    }

    let columns = columns
        .into_iter()
        .zip(&keep)
        .filter_map(|(c, k)| k.then_some(c))
        .collect();
    let rows = rows
        .into_iter()
        .map(|r| {
            r.into_iter()
                .zip(&keep)
                .filter_map(|(c, k)| k.then_some(c))
                .collect()
        })
        .collect();
    (columns, rows)
}

/// Page totals, subtotals and page counters are rendering artifacts.
pub fn is_boilerplate_row(row: &[Cell]) -> bool {
    row.iter().any(|cell| match cell {
        Cell::Text(s) => {
            let lower = s.to_lowercase();
            BOILERPLATE_TERMS.iter().any(|t| lower.contains(t))
        }
        _ => false,
    })
}

fn convert_date_column(
    rows: &mut [Vec<Cell>],
    col: usize,
    name: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    for (i, row) in rows.iter_mut().enumerate() {
        let Some(cell) = row.get_mut(col) else {
            continue;
        };
        if cell.is_blank() {
            *cell = Cell::Empty;
            continue;
        }
        let raw = cell.as_text().into_owned();
        *cell = match resolve_date(&raw) {
            Some((date, _)) => Cell::Text(date),
            None => {
                diagnostics.push(
                    Diagnostic::new(Stage::Normalization, format!("unrecognized date '{raw}'"))
                        .at_row(i)
                        .in_column(name),
                );
                Cell::Empty
            }
        };
    }
}

/// Parse a whole money column. If any cell fails, the column is left as
/// it was.
fn convert_money_column(
    rows: &mut [Vec<Cell>],
    col: usize,
    name: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let mut parsed = Vec::with_capacity(rows.len());
    for (i, row) in rows.iter().enumerate() {
        let value = match row.get(col) {
            Some(Cell::Number(d)) => Some(*d),
            Some(Cell::Text(s)) => parse_money(s),
            Some(Cell::Empty) | None => Some(Decimal::ZERO),
        };
        match value {
            Some(d) => parsed.push(d),
            None => {
                let raw = row.get(col).map(|c| c.as_text().into_owned()).unwrap_or_default();
                log::warn!("column '{name}': '{raw}' is not a monetary value, column left as-is");
                diagnostics.push(
                    Diagnostic::new(
                        Stage::Normalization,
                        format!("'{raw}' is not a monetary value; column left as-is"),
                    )
                    .at_row(i)
                    .in_column(name),
                );
                return;
            }
        }
    }
    for (row, value) in rows.iter_mut().zip(parsed) {
        if let Some(cell) = row.get_mut(col) {
            *cell = Cell::Number(value);
        }
    }
}

/// Parse a Brazilian-notation amount: `.` groups thousands, `,` marks
/// decimals, currency symbols and other characters are ignored. A value
/// with no digits at all reads as zero.
pub fn parse_money(raw: &str) -> Option<Decimal> {
    let stripped: String = raw
        .replace("R$", "")
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .collect();
    if stripped.is_empty() {
        return Some(Decimal::ZERO);
    }
    let normalized = stripped.replace('.', "").replace(',', ".");
    Decimal::from_str(&normalized).ok()
}

/// Recognize an issuance date in one of the report's encodings:
/// `DD/MM/YYYY` anywhere in the text, eight packed digits `DDMMYYYY`, or
/// seven packed digits `DMMYYYY` with a single-digit day.
///
/// Returns the date as `DD/MM/YYYY` with its period.
pub fn resolve_date(raw: &str) -> Option<(String, Period)> {
    let clean = raw.trim();
    let clean = clean.strip_suffix(".0").unwrap_or(clean);

    [&*SLASH_DATE_RE, &*PACKED_DATE_RE, &*SHORT_PACKED_DATE_RE]
        .into_iter()
        .find_map(|re| {
            let caps = re.captures(clean)?;
            build_date(&caps[1], &caps[2], &caps[3])
        })
}

fn build_date(day: &str, month: &str, year: &str) -> Option<(String, Period)> {
    let day: u8 = day.parse().ok()?;
    if !(1..=31).contains(&day) {
        return None;
    }
    let period = Period::new(month.parse().ok()?, year.parse().ok()?)?;
    Some((
        format!("{:02}/{:02}/{:04}", day, period.month(), period.year()),
        period,
    ))
}

/// Fill the period column from the first date column. An existing period
/// column is rewritten in place; otherwise one is inserted right after the
/// date column.
fn derive_period(
    columns: Vec<Column>,
    rows: Vec<Vec<Cell>>,
    convert_dates: bool,
) -> (Vec<Column>, Vec<Vec<Cell>>) {
    let date_col = columns
        .iter()
        .position(|c| c.role == Some(Field::IssueDate))
        .or_else(|| columns.iter().position(|c| c.kind == FieldKind::Date));
    let Some(date_col) = date_col else {
        return (columns, rows);
    };
    let existing = columns.iter().position(|c| c.role == Some(Field::Period));

    let mut columns = columns;
    if existing.is_none() {
        columns.insert(date_col + 1, Column::for_field(Field::Period));
    }

    let rows = rows
        .into_iter()
        .map(|mut row| {
            let raw = row.get(date_col).map(|c| c.as_text().into_owned()).unwrap_or_default();
            let resolved = resolve_date(&raw);
            let period = resolved
                .as_ref()
                .map(|(_, p)| Cell::Text(p.to_string()))
                .unwrap_or_default();
            // Without date conversion the date cell stays as extracted.
            if convert_dates {
                if let Some(cell) = row.get_mut(date_col) {
                    *cell = resolved.map(|(date, _)| Cell::Text(date)).unwrap_or_default();
                }
            }
            match existing {
                Some(p) => {
                    if let Some(cell) = row.get_mut(p) {
                        *cell = period;
                    }
                }
                None => row.insert((date_col + 1).min(row.len()), period),
            }
            row
        })
        .collect();

    (columns, rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn table(labels: &[(&str, Option<Field>)], rows: &[&[&str]]) -> CanonicalTable {
        CanonicalTable::new(
            labels.iter().map(|(n, r)| Column::new(*n, *r)).collect(),
            rows.iter()
                .map(|r| r.iter().map(|c| Cell::text(*c)).collect())
                .collect(),
        )
    }

    fn opts() -> NormalizeOptions {
        NormalizeOptions::default()
    }

    #[test]
    fn test_parse_money_brazilian() {
        assert_eq!(parse_money("R$ 1.234,56"), Some(dec!(1234.56)));
        assert_eq!(parse_money(""), Some(dec!(0)));
        assert_eq!(parse_money("  75,00 "), Some(dec!(75.00)));
        assert_eq!(parse_money("1.000.000,00"), Some(dec!(1000000)));
        assert_eq!(parse_money("1,2,3"), None);
    }

    #[test]
    fn test_resolve_date_encodings() {
        for raw in ["07/08/2022", "07082022", "7082022", "Emitida em 07/08/2022 10:31", "7082022.0"] {
            let (date, period) = resolve_date(raw).unwrap();
            assert_eq!(date, "07/08/2022", "{raw}");
            assert_eq!(period.to_string(), "08/2022", "{raw}");
        }
    }

    #[test]
    fn test_resolve_date_rejects_noise() {
        assert!(resolve_date("").is_none());
        assert!(resolve_date("total").is_none());
        assert!(resolve_date("2022000000001").is_none());
        assert!(resolve_date("07/13/2022").is_none());
    }

    #[test]
    fn test_column_names_canonicalized() {
        let t = table(&[("  N° Nota ", Some(Field::NoteNumber))], &[&["2022000000001"]]);
        let out = normalize(t, &opts()).into_value();
        assert_eq!(out.columns()[0].name, "n° nota");
    }

    #[test]
    fn test_money_column_parsed() {
        let t = table(
            &[("N° Nota", Some(Field::NoteNumber)), ("Base de Cálculo", Some(Field::TaxBase))],
            &[&["1", "R$ 1.234,56"], &["2", ""]],
        );
        let out = normalize(t, &opts()).into_value();
        assert_eq!(out.rows()[0][1], Cell::Number(dec!(1234.56)));
        assert_eq!(out.rows()[1][1], Cell::Number(dec!(0)));
    }

    #[test]
    fn test_unparseable_money_column_left_as_is() {
        let t = table(
            &[
                ("N° Nota", Some(Field::NoteNumber)),
                ("Base de Cálculo", Some(Field::TaxBase)),
                ("ISS Próprio", Some(Field::OwnTax)),
            ],
            &[&["1", "1,2,3", "10,00"], &["2", "5,00", "1,00"]],
        );
        let out = normalize(t, &opts());
        assert!(out.is_degraded());
        let out = out.into_value();
        assert_eq!(out.rows()[0][1], Cell::text("1,2,3"));
        assert_eq!(out.rows()[1][1], Cell::text("5,00"));
        assert_eq!(out.rows()[0][2], Cell::Number(dec!(10)));
    }

    #[test]
    fn test_money_disabled_keeps_text() {
        let t = table(
            &[("N° Nota", Some(Field::NoteNumber)), ("Base de Cálculo", Some(Field::TaxBase))],
            &[&["1", "1.234,56"]],
        );
        let options = NormalizeOptions {
            convert_money: false,
            ..opts()
        };
        let out = normalize(t, &options).into_value();
        assert_eq!(out.rows()[0][1], Cell::text("1.234,56"));
    }

    #[test]
    fn test_boilerplate_rows_dropped() {
        let t = table(
            &[("N° Nota", Some(Field::NoteNumber)), ("Tomador", Some(Field::PayerName))],
            &[
                &["2022000000001", "ACME"],
                &["2022000000002", "Total"],
                &["Página 2 de 3", ""],
                &["2022000000003", "Sub-Total do dia"],
            ],
        );
        let out = normalize(t, &opts()).into_value();
        assert_eq!(out.len(), 1);
        assert_eq!(out.rows()[0][0], Cell::text("2022000000001"));
    }

    #[test]
    fn test_period_inserted_after_date() {
        let t = table(
            &[
                ("N° Nota", Some(Field::NoteNumber)),
                ("Dt. Emissão", Some(Field::IssueDate)),
                ("Tomador", Some(Field::PayerName)),
            ],
            &[&["1", "07082022", "A"], &["2", "7082022", "B"], &["3", "xx", "C"]],
        );
        let out = normalize(t, &opts());
        assert!(out.is_degraded());
        let out = out.into_value();
        let names: Vec<&str> = out.columns().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["n° nota", "dt. emissão", "competência", "tomador"]);
        assert_eq!(out.rows()[0][1], Cell::text("07/08/2022"));
        assert_eq!(out.rows()[1][2], Cell::text("08/2022"));
        assert_eq!(out.rows()[2][1], Cell::Empty);
        assert_eq!(out.rows()[2][2], Cell::Empty);
    }

    #[test]
    fn test_unmatched_date_kept_per_row_when_dates_not_converted() {
        let t = table(
            &[("N° Nota", Some(Field::NoteNumber)), ("Dt. Emissão", Some(Field::IssueDate))],
            &[&["1", "07/08/2022"], &["2", "sem data"]],
        );
        let options = NormalizeOptions {
            convert_dates: false,
            ..opts()
        };
        let out = normalize(t, &options).into_value();
        assert_eq!(out.rows()[1][1], Cell::text("sem data"));
        assert_eq!(out.rows()[1][2], Cell::Empty);
        assert_eq!(out.rows()[0][2], Cell::text("08/2022"));
    }

    #[test]
    fn test_packed_date_untouched_when_dates_not_converted() {
        let t = table(
            &[("N° Nota", Some(Field::NoteNumber)), ("Dt. Emissão", Some(Field::IssueDate))],
            &[&["1", "07082022"], &["2", "7082022.0"]],
        );
        let options = NormalizeOptions {
            convert_dates: false,
            ..opts()
        };
        let once = normalize(t, &options).into_value();
        assert_eq!(once.rows()[0][1], Cell::text("07082022"));
        assert_eq!(once.rows()[1][1], Cell::text("7082022.0"));
        assert_eq!(once.rows()[0][2], Cell::text("08/2022"));
        assert_eq!(once.rows()[1][2], Cell::text("08/2022"));
        assert_eq!(normalize(once.clone(), &options).into_value(), once);
    }

    #[test]
    fn test_empty_rows_and_columns_dropped() {
        let t = table(
            &[
                ("N° Nota", Some(Field::NoteNumber)),
                ("ISS Retido", Some(Field::ThirdPartyTax)),
                ("Base de Cálculo", Some(Field::TaxBase)),
            ],
            &[&["1", "", "10,00"], &["", "", ""], &["2", " ", "20,00"]],
        );
        let out = normalize(t, &opts()).into_value();
        assert_eq!(out.width(), 2);
        assert_eq!(out.len(), 2);
        assert_eq!(out.position(Field::ThirdPartyTax), None);
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let t = table(
            &[
                ("N° Nota", Some(Field::NoteNumber)),
                ("Dt. Emissão", Some(Field::IssueDate)),
                ("Vlr. Serviço", Some(Field::ServiceValue)),
                ("Observação", None),
            ],
            &[
                &["2022000000001", "07/08/2022", "R$ 1.500,00", ""],
                &["2022000000002", "lixo", "", ""],
                &["2022000000003", "7082022", "2,50", ""],
            ],
        );
        let once = normalize(t, &opts()).into_value();
        let twice = normalize(once.clone(), &opts()).into_value();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_idempotent_without_any_date() {
        let t = table(
            &[("N° Nota", Some(Field::NoteNumber)), ("Dt. Emissão", Some(Field::IssueDate))],
            &[&["1", "?"], &["2", "-"]],
        );
        let once = normalize(t, &opts()).into_value();
        assert_eq!(once.width(), 1);
        let twice = normalize(once.clone(), &opts()).into_value();
        assert_eq!(once, twice);
    }
}
