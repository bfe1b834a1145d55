use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::fields::Field;
use crate::model::{CanonicalTable, Cell, Column, NormalizedRecord, Period, PeriodSummaryRow};
use crate::model::{CANCELLED_MARKER, OPEN_STATUS};

/// Role-less columns are told apart by name and by how many columns of
/// that name came before them in the same table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum ColumnKey {
    Role(Field),
    Name(String, usize),
}

impl ColumnKey {
    fn keys(columns: &[Column]) -> Vec<ColumnKey> {
        let mut seen: HashMap<&str, usize> = HashMap::new();
        columns
            .iter()
            .map(|column| match column.role {
                Some(field) => ColumnKey::Role(field),
                None => {
                    let nth = seen.entry(column.name.as_str()).or_default();
                    *nth += 1;
                    ColumnKey::Name(column.name.clone(), *nth)
                }
            })
            .collect()
    }
}

/// Stack normalized tables into one.
///
/// Columns are matched by field role, or by name when they have none, and
/// appear in first-seen order. Cells a table lacks are left empty. Row
/// order follows table order, then row order within each table.
pub fn union_tables(tables: Vec<CanonicalTable>) -> CanonicalTable {
    let mut columns: Vec<Column> = Vec::new();
    let mut index: HashMap<ColumnKey, usize> = HashMap::new();

    let mut parts = Vec::with_capacity(tables.len());
    for table in tables {
        let (cols, rows) = table.into_parts();
        let keys = ColumnKey::keys(&cols);
        let slots: Vec<usize> = cols
            .into_iter()
            .zip(keys)
            .map(|(col, key)| {
                *index.entry(key).or_insert_with(|| {
                    columns.push(col);
                    columns.len() - 1
                })
            })
            .collect();
        parts.push((slots, rows));
    }

    let width = columns.len();
    let mut rows = Vec::new();
    for (slots, table_rows) in parts {
        for row in table_rows {
            let mut merged = vec![Cell::Empty; width];
            for (slot, cell) in slots.iter().zip(row) {
                merged[*slot] = cell;
            }
            rows.push(merged);
        }
    }

    CanonicalTable::new(columns, rows)
}

/// Roll records up by accounting period, oldest first.
///
/// Records without a period are not counted. Exact duplicates within a
/// period count once.
pub fn summarize(records: &[NormalizedRecord]) -> Vec<PeriodSummaryRow> {
    let mut groups: BTreeMap<Period, Vec<&NormalizedRecord>> = BTreeMap::new();
    let mut seen: HashSet<&NormalizedRecord> = HashSet::new();
    let mut skipped = 0usize;

    for record in records {
        let Some(period) = record.period else {
            skipped += 1;
            continue;
        };
        if seen.insert(record) {
            groups.entry(period).or_default().push(record);
        }
    }
    if skipped > 0 {
        log::debug!("{skipped} record(s) without a period left out of the summary");
    }

    groups
        .into_iter()
        .map(|(period, group)| summarize_period(period, &group))
        .collect()
}

fn summarize_period(period: Period, group: &[&NormalizedRecord]) -> PeriodSummaryRow {
    let total = group.len();
    let valid: Vec<&NormalizedRecord> = group.iter().copied().filter(|r| !r.is_cancelled()).collect();
    let sum = |f: fn(&NormalizedRecord) -> Option<Decimal>| -> Decimal {
        valid.iter().filter_map(|r| f(r)).sum()
    };

    PeriodSummaryRow {
        period,
        status: status_label(&valid),
        total,
        cancelled: total - valid.len(),
        valid: valid.len(),
        tax_base: sum(|r| r.tax_base),
        own_tax: sum(|r| r.own_tax),
        third_party_tax: sum(|r| r.third_party_tax),
    }
}

/// "CANCELADA" when nothing in the period is valid, otherwise the most
/// common status among valid records (earliest wins a tie), or "EM ABERTO"
/// when none of them has a status.
fn status_label(valid: &[&NormalizedRecord]) -> String {
    if valid.is_empty() {
        return CANCELLED_MARKER.to_string();
    }

    let mut counts: Vec<(&str, usize)> = Vec::new();
    for record in valid {
        let status = record.status.trim();
        if status.is_empty() {
            continue;
        }
        match counts.iter_mut().find(|(s, _)| *s == status) {
            Some((_, n)) => *n += 1,
            None => counts.push((status, 1)),
        }
    }

    // max_by_key keeps the last maximum, so scan from the back.
    counts
        .iter()
        .rev()
        .max_by_key(|(_, n)| *n)
        .map(|(s, _)| s.to_string())
        .unwrap_or_else(|| OPEN_STATUS.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn record(note: &str, period: &str, base: Decimal, status: &str) -> NormalizedRecord {
        NormalizedRecord {
            note_number: note.into(),
            period: Some(period.parse().unwrap()),
            tax_base: Some(base),
            own_tax: Some(base / dec!(20)),
            status: status.into(),
            ..Default::default()
        }
    }

    #[test]
    fn sums_valid_records() {
        let rows = summarize(&[
            record("1", "08/2022", dec!(100), "Normal"),
            record("2", "08/2022", dec!(200), "Normal"),
        ]);
        assert_eq!(rows.len(), 1);
        let r = &rows[0];
        assert_eq!(r.period.to_string(), "08/2022");
        assert_eq!((r.total, r.cancelled, r.valid), (2, 0, 2));
        assert_eq!(r.tax_base, dec!(300));
        assert_eq!(r.own_tax, dec!(15));
        assert_eq!(r.status, "Normal");
    }

    #[test]
    fn cancelled_records_counted_but_not_summed() {
        let rows = summarize(&[
            record("1", "08/2022", dec!(100), "Normal"),
            record("2", "08/2022", dec!(900), "Cancelada"),
        ]);
        let r = &rows[0];
        assert_eq!((r.total, r.cancelled, r.valid), (2, 1, 1));
        assert_eq!(r.valid, r.total - r.cancelled);
        assert_eq!(r.tax_base, dec!(100));
    }

    #[test]
    fn all_cancelled_period_is_labelled_cancelled() {
        let rows = summarize(&[record("1", "09/2022", dec!(5), "NOTA CANCELADA")]);
        assert_eq!(rows[0].status, "CANCELADA");
        assert_eq!(rows[0].tax_base, dec!(0));
    }

    #[test]
    fn status_label_majority_then_first_seen() {
        let rows = summarize(&[
            record("1", "08/2022", dec!(1), "Emitida"),
            record("2", "08/2022", dec!(1), "Substituta"),
            record("3", "08/2022", dec!(1), "Substituta"),
            record("4", "09/2022", dec!(1), "Emitida"),
            record("5", "09/2022", dec!(1), "Substituta"),
            record("6", "10/2022", dec!(1), ""),
        ]);
        assert_eq!(rows[0].status, "Substituta");
        assert_eq!(rows[1].status, "Emitida");
        assert_eq!(rows[2].status, "EM ABERTO");
    }

    #[test]
    fn periods_sorted_chronologically_across_years() {
        let rows = summarize(&[
            record("1", "01/2022", dec!(1), ""),
            record("2", "12/2021", dec!(1), ""),
            record("3", "02/2021", dec!(1), ""),
        ]);
        let periods: Vec<String> = rows.iter().map(|r| r.period.to_string()).collect();
        assert_eq!(periods, vec!["02/2021", "12/2021", "01/2022"]);
    }

    #[test]
    fn duplicates_within_period_counted_once() {
        let a = record("1", "08/2022", dec!(100), "");
        let rows = summarize(&[a.clone(), a, record("2", "08/2022", dec!(50), "")]);
        assert_eq!(rows[0].total, 2);
        assert_eq!(rows[0].tax_base, dec!(150));
    }

    #[test]
    fn records_without_period_are_skipped() {
        let mut r = record("1", "08/2022", dec!(1), "");
        r.period = None;
        assert!(summarize(&[r]).is_empty());
    }

    #[test]
    fn union_aligns_columns_and_fills_gaps() {
        let a = CanonicalTable::new(
            vec![Column::for_field(Field::NoteNumber), Column::new("obs", None)],
            vec![vec![Cell::text("1"), Cell::text("x")]],
        );
        let b = CanonicalTable::new(
            vec![
                Column::new("número", Some(Field::NoteNumber)),
                Column::for_field(Field::TaxBase),
            ],
            vec![vec![Cell::text("2"), Cell::Number(dec!(10))]],
        );
        let u = union_tables(vec![a, b]);
        let names: Vec<&str> = u.columns().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["n° nota", "obs", "base de cálculo"]);
        assert_eq!(u.rows()[0], vec![Cell::text("1"), Cell::text("x"), Cell::Empty]);
        assert_eq!(u.rows()[1], vec![Cell::text("2"), Cell::Empty, Cell::Number(dec!(10))]);
    }

    #[test]
    fn union_keeps_same_named_columns_apart() {
        let t = || {
            CanonicalTable::new(
                vec![
                    Column::for_field(Field::NoteNumber),
                    Column::new("obs", None),
                    Column::for_field(Field::TaxBase),
                    Column::new("obs", None),
                ],
                vec![vec![
                    Cell::text("2022000000001"),
                    Cell::text("ACME"),
                    Cell::Number(dec!(1500.00)),
                    Cell::text("Normal"),
                ]],
            )
        };
        let u = union_tables(vec![t(), t()]);
        assert_eq!(u.width(), 4);
        assert_eq!(u.rows()[0][1], Cell::text("ACME"));
        assert_eq!(u.rows()[0][3], Cell::text("Normal"));
        assert_eq!(u.rows()[1], u.rows()[0]);
    }

    #[test]
    fn union_of_nothing_is_empty() {
        let u = union_tables(Vec::new());
        assert_eq!(u.width(), 0);
        assert!(u.is_empty());
    }
}
