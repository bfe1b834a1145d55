use chrono::NaiveDateTime;
use notas_core::config::Banner;
use notas_core::model::CanonicalTable;
use std::io::Write;

/// Spreadsheet programs need the BOM to read the file as UTF-8.
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Document banner lines, as printed above the data.
pub fn banner_lines(banner: &Banner, generated: NaiveDateTime) -> Vec<String> {
    let mut lines = banner.lines.clone();
    lines.push(String::new());
    lines.push(banner.title.clone());
    lines.push(format!("Gerado em: {}", generated.format("%d/%m/%Y %H:%M:%S")));
    lines.push(String::new());
    lines
}

/// Write the table as `;`-separated UTF-8, optionally under a banner.
pub fn write_table<W: Write>(
    mut out: W,
    table: &CanonicalTable,
    banner: Option<&[String]>,
) -> Result<(), csv::Error> {
    out.write_all(UTF8_BOM)?;
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b';')
        .flexible(true)
        .from_writer(out);

    for line in banner.unwrap_or_default() {
        writer.write_record([line])?;
    }
    writer.write_record(table.columns().iter().map(|c| c.name.as_str()))?;
    for row in table.rows() {
        writer.write_record(row.iter().map(|c| c.to_string()))?;
    }
    writer.flush()?;
    Ok(())
}
