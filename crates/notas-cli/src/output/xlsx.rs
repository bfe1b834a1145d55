use notas_core::fields::FieldKind;
use notas_core::model::{CanonicalTable, Cell, PeriodSummaryRow};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder, Workbook, Worksheet, XlsxError};
use std::path::Path;

pub const DATA_SHEET: &str = "Dados";
pub const SUMMARY_SHEET: &str = "Resumo";

const HEADER_FILL: u32 = 0x4472C4;
const MONEY_FORMAT: &str = "R$ #,##0.00";
const MIN_WIDTH: usize = 10;
const MAX_WIDTH: usize = 50;

const SUMMARY_HEADERS: [&str; 8] = [
    "competência",
    "situação",
    "total de notas",
    "canceladas",
    "válidas",
    "base de cálculo",
    "iss próprio",
    "iss retido",
];

struct Formats {
    header: Format,
    text: Format,
    date: Format,
    period: Format,
    money: Format,
    number: Format,
}

impl Formats {
    fn new() -> Self {
        let cell = Format::new().set_border(FormatBorder::Thin);
        Formats {
            header: Format::new()
                .set_bold()
                .set_font_size(12)
                .set_font_color(Color::White)
                .set_background_color(Color::RGB(HEADER_FILL))
                .set_align(FormatAlign::Center)
                .set_align(FormatAlign::VerticalCenter)
                .set_text_wrap()
                .set_border(FormatBorder::Thin),
            text: cell.clone(),
            // Dates and periods stay text so spreadsheet locales cannot reinterpret them.
            date: cell.clone().set_num_format("@"),
            period: cell
                .clone()
                .set_num_format("@")
                .set_align(FormatAlign::Center),
            money: cell
                .clone()
                .set_num_format(MONEY_FORMAT)
                .set_align(FormatAlign::Right),
            number: cell.set_align(FormatAlign::Right),
        }
    }
}

/// Write the invoice table to a `Dados` sheet and the period summary to a
/// `Resumo` sheet.
pub fn write_workbook(
    path: &Path,
    table: &CanonicalTable,
    summary: &[PeriodSummaryRow],
) -> Result<(), XlsxError> {
    let formats = Formats::new();
    let mut workbook = Workbook::new();

    let sheet = workbook.add_worksheet();
    sheet.set_name(DATA_SHEET)?;
    write_data_sheet(sheet, table, &formats)?;

    let sheet = workbook.add_worksheet();
    sheet.set_name(SUMMARY_SHEET)?;
    write_summary_sheet(sheet, summary, &formats)?;

    workbook.save(path)?;
    Ok(())
}

fn write_data_sheet(
    sheet: &mut Worksheet,
    table: &CanonicalTable,
    formats: &Formats,
) -> Result<(), XlsxError> {
    let headers: Vec<&str> = table.columns().iter().map(|c| c.name.as_str()).collect();
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    write_header(sheet, &headers, formats)?;

    for (i, row) in table.rows().iter().enumerate() {
        let r = (i + 1) as u32;
        for (j, (cell, column)) in row.iter().zip(table.columns()).enumerate() {
            let c = j as u16;
            let shown = match cell {
                Cell::Empty => {
                    sheet.write_blank(r, c, &formats.text)?;
                    0
                }
                Cell::Number(d) => {
                    let format = if column.kind == FieldKind::Money {
                        &formats.money
                    } else {
                        &formats.number
                    };
                    sheet.write_number_with_format(r, c, to_f64(*d), format)?;
                    money_width(*d)
                }
                Cell::Text(s) => {
                    let format = match column.kind {
                        FieldKind::Date => &formats.date,
                        FieldKind::Period => &formats.period,
                        _ => &formats.text,
                    };
                    sheet.write_string_with_format(r, c, s, format)?;
                    s.chars().count()
                }
            };
            widths[j] = widths[j].max(shown);
        }
    }

    set_widths(sheet, &widths)?;
    sheet.set_freeze_panes(1, 0)?;
    Ok(())
}

fn write_summary_sheet(
    sheet: &mut Worksheet,
    summary: &[PeriodSummaryRow],
    formats: &Formats,
) -> Result<(), XlsxError> {
    let mut widths: Vec<usize> = SUMMARY_HEADERS.iter().map(|h| h.chars().count()).collect();
    write_header(sheet, &SUMMARY_HEADERS, formats)?;

    for (i, row) in summary.iter().enumerate() {
        let r = (i + 1) as u32;
        let period = row.period.to_string();
        sheet.write_string_with_format(r, 0, &period, &formats.period)?;
        sheet.write_string_with_format(r, 1, &row.status, &formats.text)?;
        widths[1] = widths[1].max(row.status.chars().count());

        let counts = [row.total, row.cancelled, row.valid];
        for (k, n) in counts.into_iter().enumerate() {
            sheet.write_number_with_format(r, 2 + k as u16, n as f64, &formats.number)?;
        }
        let sums = [row.tax_base, row.own_tax, row.third_party_tax];
        for (k, d) in sums.into_iter().enumerate() {
            let col = 5 + k;
            sheet.write_number_with_format(r, col as u16, to_f64(d), &formats.money)?;
            widths[col] = widths[col].max(money_width(d));
        }
    }

    set_widths(sheet, &widths)?;
    sheet.set_freeze_panes(1, 0)?;
    Ok(())
}

fn write_header(sheet: &mut Worksheet, headers: &[&str], formats: &Formats) -> Result<(), XlsxError> {
    for (col, header) in headers.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *header, &formats.header)?;
    }
    Ok(())
}

fn set_widths(sheet: &mut Worksheet, widths: &[usize]) -> Result<(), XlsxError> {
    for (col, w) in widths.iter().enumerate() {
        let width = (w + 2).clamp(MIN_WIDTH, MAX_WIDTH);
        sheet.set_column_width(col as u16, width as f64)?;
    }
    Ok(())
}

fn to_f64(d: Decimal) -> f64 {
    d.to_f64().unwrap_or_default()
}

/// Rendered width of an amount under the money format ("R$ 1.234,56").
fn money_width(d: Decimal) -> usize {
    d.round_dp(2).to_string().len() + 4
}
