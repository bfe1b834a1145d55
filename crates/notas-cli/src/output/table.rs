use notas_core::model::{CanonicalTable, PeriodSummaryRow, RawTable};

/// Render the period summary as an aligned text table.
pub fn format_summary(rows: &[PeriodSummaryRow]) -> String {
    if rows.is_empty() {
        return "No invoices with a recognizable issuance date.\n".to_string();
    }

    let status_width = rows
        .iter()
        .map(|r| r.status.chars().count())
        .max()
        .unwrap_or(0)
        .max("Status".len());

    let mut out = format!(
        "  {:<7}  {:<sw$}  {:>5}  {:>9}  {:>6}  {:>14}  {:>12}  {:>12}\n",
        "Period",
        "Status",
        "Notes",
        "Cancelled",
        "Valid",
        "Tax base",
        "Own tax",
        "Withheld",
        sw = status_width
    );
    for r in rows {
        out.push_str(&format!(
            "  {:<7}  {:<sw$}  {:>5}  {:>9}  {:>6}  {:>14}  {:>12}  {:>12}\n",
            r.period.to_string(),
            r.status,
            r.total,
            r.cancelled,
            r.valid,
            r.tax_base.round_dp(2).to_string(),
            r.own_tax.round_dp(2).to_string(),
            r.third_party_tax.round_dp(2).to_string(),
            sw = status_width
        ));
    }
    out
}

/// One line per raw table: where it came from, its shape, and whether the
/// selector kept it.
pub fn format_raw_tables(backend: &str, tables: &[(RawTable, bool)]) -> String {
    let mut out = format!("=== {backend}: {} table(s) ===\n\n", tables.len());
    for (i, (table, selected)) in tables.iter().enumerate() {
        let width = table.rows.iter().map(Vec::len).max().unwrap_or(0);
        let mark = if *selected { "invoice" } else { "-" };
        out.push_str(&format!(
            "  #{:<3} page {:<3} {:>4} row(s) x {:<3} col(s)  {}\n",
            i + 1,
            table.page_number,
            table.rows.len(),
            width,
            mark
        ));
        if let Some(first) = table.rows.first() {
            let preview: Vec<&str> = first.iter().map(|c| c.as_deref().unwrap_or("")).collect();
            out.push_str(&format!("        {}\n", truncate(&preview.join(" | "), 100)));
        }
    }
    out
}

/// A short preview of the first rows of a canonical table.
pub fn format_preview(table: &CanonicalTable, max_rows: usize) -> String {
    let mut out = String::new();
    let header: Vec<&str> = table.columns().iter().map(|c| c.name.as_str()).collect();
    out.push_str(&format!("  {}\n", header.join(" | ")));
    for row in table.rows().iter().take(max_rows) {
        let cells: Vec<String> = row.iter().map(|c| c.to_string()).collect();
        out.push_str(&format!("  {}\n", truncate(&cells.join(" | "), 160)));
    }
    if table.len() > max_rows {
        out.push_str(&format!("  ... {} more row(s)\n", table.len() - max_rows));
    }
    out
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let cut: String = s.chars().take(max_chars).collect();
    format!("{cut}...")
}

#[cfg(test)]
mod tests {
    use super::*;
    use notas_core::model::Period;
    use rust_decimal::Decimal;

    #[test]
    fn summary_rows_are_aligned() {
        let rows = vec![PeriodSummaryRow {
            period: Period::new(8, 2022).unwrap(),
            status: "CANCELADA".into(),
            total: 1,
            cancelled: 1,
            valid: 0,
            tax_base: Decimal::ZERO,
            own_tax: Decimal::ZERO,
            third_party_tax: Decimal::ZERO,
        }];
        let text = format_summary(&rows);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].len(), lines[1].len());
        assert!(lines[1].contains("08/2022"));
    }

    #[test]
    fn raw_table_listing_marks_selected() {
        let t = RawTable::new(2, vec![vec![Some("2022000000001".into()), None]]);
        let text = format_raw_tables("layout", &[(t, true)]);
        assert!(text.contains("page 2"));
        assert!(text.contains("invoice"));
        assert!(text.contains("2022000000001 | "));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("situação", 6), "situaç...");
        assert_eq!(truncate("abc", 6), "abc");
    }
}
