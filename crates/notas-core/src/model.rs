use rust_decimal::Decimal;
use serde::{Serialize, Serializer};
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use crate::fields::{infer_kind, Field, FieldKind};
use crate::normalize::parse_money;

/// A grid of nullable text cells as produced by a PDF engine.
/// Rows may have differing lengths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RawTable {
    pub page_number: usize,
    pub rows: Vec<Vec<Option<String>>>,
}

impl RawTable {
    pub fn new(page_number: usize, rows: Vec<Vec<Option<String>>>) -> Self {
        RawTable { page_number, rows }
    }

    /// All non-null cell texts, row-major.
    pub fn cells(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().flatten().filter_map(|c| c.as_deref())
    }
}

/// A raw table known to contain invoice line items.
///
/// Only the table selector constructs these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectedTable(RawTable);

impl SelectedTable {
    pub(crate) fn new(table: RawTable) -> Self {
        SelectedTable(table)
    }

    pub fn raw(&self) -> &RawTable {
        &self.0
    }

    pub fn rows(&self) -> &[Vec<Option<String>>] {
        &self.0.rows
    }

    pub fn page_number(&self) -> usize {
        self.0.page_number
    }
}

/// A single value in a canonical table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum Cell {
    #[default]
    Empty,
    Text(String),
    Number(Decimal),
}

impl Cell {
    pub fn text(s: impl Into<String>) -> Cell {
        let s = s.into();
        if s.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(s)
        }
    }

    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            Cell::Number(_) => false,
        }
    }

    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            Cell::Empty => Cow::Borrowed(""),
            Cell::Text(s) => Cow::Borrowed(s),
            Cell::Number(d) => Cow::Owned(d.to_string()),
        }
    }

    pub fn as_number(&self) -> Option<Decimal> {
        match self {
            Cell::Number(d) => Some(*d),
            _ => None,
        }
    }
}

impl From<Option<String>> for Cell {
    fn from(value: Option<String>) -> Self {
        value.map(Cell::text).unwrap_or_default()
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_text())
    }
}

impl Serialize for Cell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Cell::Empty => serializer.serialize_none(),
            Cell::Text(s) => serializer.serialize_str(s),
            Cell::Number(d) => Serialize::serialize(d, serializer),
        }
    }
}

/// A named column with its recognized role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Column {
    pub name: String,
    pub role: Option<Field>,
    pub kind: FieldKind,
}

impl Column {
    pub fn new(name: impl Into<String>, role: Option<Field>) -> Self {
        let name = name.into();
        let kind = role.map(Field::kind).unwrap_or_else(|| infer_kind(&name));
        Column { name, role, kind }
    }

    pub fn for_field(field: Field) -> Self {
        Column::new(field.default_label(), Some(field))
    }
}

/// A table with a fixed column list. Every row is exactly as wide as the
/// column list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CanonicalTable {
    columns: Vec<Column>,
    rows: Vec<Vec<Cell>>,
}

impl CanonicalTable {
    /// Build a table, padding short rows with empty cells and truncating
    /// long ones.
    pub fn new(columns: Vec<Column>, rows: Vec<Vec<Cell>>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, Cell::Empty);
                row
            })
            .collect();
        CanonicalTable { columns, rows }
    }

    pub fn empty() -> Self {
        CanonicalTable {
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of the column carrying `field`, if any.
    pub fn position(&self, field: Field) -> Option<usize> {
        self.columns.iter().position(|c| c.role == Some(field))
    }

    pub fn position_by_name(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn into_parts(self) -> (Vec<Column>, Vec<Vec<Cell>>) {
        (self.columns, self.rows)
    }

    /// Typed view of every row.
    pub fn records(&self) -> Vec<NormalizedRecord> {
        self.rows
            .iter()
            .map(|row| NormalizedRecord::from_row(&self.columns, row))
            .collect()
    }
}

/// An accounting period (competência), ordered chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Period {
    year: u16,
    month: u8,
}

impl Period {
    pub fn new(month: u8, year: u16) -> Option<Period> {
        if (1..=12).contains(&month) {
            Some(Period { year, month })
        } else {
            None
        }
    }

    pub fn month(&self) -> u8 {
        self.month
    }

    pub fn year(&self) -> u16 {
        self.year
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}/{:04}", self.month, self.year)
    }
}

impl FromStr for Period {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (month, year) = s
            .trim()
            .split_once('/')
            .ok_or_else(|| format!("invalid period '{s}' (expected MM/YYYY)"))?;
        let month: u8 = month
            .parse()
            .map_err(|_| format!("invalid period month in '{s}'"))?;
        let year: u16 = year
            .parse()
            .map_err(|_| format!("invalid period year in '{s}'"))?;
        Period::new(month, year).ok_or_else(|| format!("month out of range in '{s}'"))
    }
}

impl Serialize for Period {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One canonical-table row with monetary fields parsed and the period
/// resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct NormalizedRecord {
    pub note_number: String,
    pub issue_date: String,
    pub period: Option<Period>,
    pub payer_tax_id: String,
    pub payer_name: String,
    pub service_description: String,
    pub service_value: Option<Decimal>,
    pub tax_base: Option<Decimal>,
    pub tax_rate: Option<Decimal>,
    pub own_tax: Option<Decimal>,
    pub third_party_tax: Option<Decimal>,
    pub operation_nature: String,
    pub incidence: String,
    pub status: String,
    /// Values of columns without a recognized role, in column order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub extra: Vec<String>,
}

impl NormalizedRecord {
    fn from_row(columns: &[Column], row: &[Cell]) -> Self {
        let mut rec = NormalizedRecord::default();
        for (column, cell) in columns.iter().zip(row) {
            let Some(role) = column.role else {
                rec.extra.push(cell.as_text().into_owned());
                continue;
            };
            let text = || cell.as_text().trim().to_string();
            let money = || match cell {
                Cell::Number(d) => Some(*d),
                Cell::Text(s) if !s.trim().is_empty() => parse_money(s),
                _ => None,
            };
            match role {
                Field::NoteNumber => rec.note_number = text(),
                Field::IssueDate => rec.issue_date = text(),
                Field::Period => rec.period = cell.as_text().parse().ok(),
                Field::PayerTaxId => rec.payer_tax_id = text(),
                Field::PayerName => rec.payer_name = text(),
                Field::ServiceDescription => rec.service_description = text(),
                Field::ServiceValue => rec.service_value = money(),
                Field::TaxBase => rec.tax_base = money(),
                Field::TaxRate => rec.tax_rate = money(),
                Field::OwnTax => rec.own_tax = money(),
                Field::ThirdPartyTax => rec.third_party_tax = money(),
                Field::OperationNature => rec.operation_nature = text(),
                Field::Incidence => rec.incidence = text(),
                Field::Status => rec.status = text(),
            }
        }
        rec
    }

    /// Cancelled notes carry "CANCELADA" in their status.
    pub fn is_cancelled(&self) -> bool {
        self.status.to_uppercase().contains(CANCELLED_MARKER)
    }
}

pub const CANCELLED_MARKER: &str = "CANCELADA";
pub const OPEN_STATUS: &str = "EM ABERTO";

/// Rollup of all records sharing one accounting period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeriodSummaryRow {
    pub period: Period,
    pub status: String,
    pub total: usize,
    pub cancelled: usize,
    pub valid: usize,
    pub tax_base: Decimal,
    pub own_tax: Decimal,
    pub third_party_tax: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn canonical_table_fits_rows_to_columns() {
        let columns = vec![Column::for_field(Field::NoteNumber), Column::for_field(Field::TaxBase)];
        let t = CanonicalTable::new(
            columns,
            vec![
                vec![Cell::text("1")],
                vec![Cell::text("2"), Cell::text("3"), Cell::text("4")],
            ],
        );
        assert!(t.rows().iter().all(|r| r.len() == t.width()));
        assert_eq!(t.rows()[0][1], Cell::Empty);
    }

    #[test]
    fn period_orders_across_years() {
        let dec21: Period = "12/2021".parse().unwrap();
        let jan22: Period = "01/2022".parse().unwrap();
        assert!(dec21 < jan22);
        assert_eq!(jan22.to_string(), "01/2022");
        assert!("13/2022".parse::<Period>().is_err());
    }

    #[test]
    fn records_parse_text_money_and_keep_unknown_columns() {
        let columns = vec![
            Column::new("n° nota", Some(Field::NoteNumber)),
            Column::new("base de cálculo", Some(Field::TaxBase)),
            Column::new("iss próprio", Some(Field::OwnTax)),
            Column::new("observações", None),
            Column::new("competência", Some(Field::Period)),
        ];
        let t = CanonicalTable::new(
            columns,
            vec![vec![
                Cell::text("2022000000001"),
                Cell::text("1.500,00"),
                Cell::Number(dec!(30)),
                Cell::text("obs"),
                Cell::text("08/2022"),
            ]],
        );
        let rec = &t.records()[0];
        assert_eq!(rec.tax_base, Some(dec!(1500.00)));
        assert_eq!(rec.own_tax, Some(dec!(30)));
        assert_eq!(rec.extra, vec!["obs".to_string()]);
        assert_eq!(rec.period, Period::new(8, 2022));
    }

    #[test]
    fn cells_serialize_as_null_text_or_decimal() {
        let value = serde_json::to_value(vec![
            Cell::Empty,
            Cell::text("ACME"),
            Cell::Number(dec!(1500.00)),
        ])
        .unwrap();
        assert_eq!(value[0], serde_json::Value::Null);
        assert_eq!(value[1], "ACME");
        assert_eq!(value[2], serde_json::to_value(dec!(1500.00)).unwrap());
    }

    #[test]
    fn cancelled_status_is_case_insensitive() {
        let rec = NormalizedRecord {
            status: "Nota Cancelada".into(),
            ..Default::default()
        };
        assert!(rec.is_cancelled());
    }
}
