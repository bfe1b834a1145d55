use notas_core::config::ExtractionMethod;
use notas_core::error::NotasError;
use notas_core::extraction::pdftotext::LayoutSource;
use notas_core::extraction::text::TextSource;
use notas_core::extraction::TableSource;
use notas_core::model::RawTable;
use notas_core::selector::TableSelector;
use serde_json::json;
use std::path::PathBuf;

use crate::commands::RunArgs;
use crate::error::CliError;
use crate::output;

type StrategyReport = (String, Result<Vec<(RawTable, bool)>, String>);

/// Dump what each strategy sees. In auto mode both strategies run, so
/// their results can be compared.
pub fn run(pdf_file: PathBuf, output_format: &str, args: &RunArgs) -> Result<(), CliError> {
    let config = args.load_config()?;
    if !pdf_file.is_file() {
        return Err(NotasError::SourceNotFound(pdf_file).into());
    }
    let pdf_bytes = std::fs::read(&pdf_file)?;
    let selector = TableSelector::from_config(&config);

    let layout: &dyn TableSource = &LayoutSource::new();
    let text: &dyn TableSource = &TextSource::new();
    let sources = match config.method {
        ExtractionMethod::Auto => vec![layout, text],
        ExtractionMethod::Layout => vec![layout],
        ExtractionMethod::Text => vec![text],
    };

    let reports: Vec<StrategyReport> = sources
        .into_iter()
        .map(|source| {
            let tables = source
                .extract_tables(&pdf_bytes)
                .map(|tables| {
                    tables
                        .into_iter()
                        .map(|t| {
                            let keep = selector.accepts(&t);
                            (t, keep)
                        })
                        .collect::<Vec<_>>()
                })
                .map_err(|e| e.to_string());
            (source.backend_name().to_string(), tables)
        })
        .collect();

    match output_format {
        "json" => {
            let value: Vec<serde_json::Value> = reports
                .iter()
                .map(|(backend, result)| match result {
                    Ok(tables) => json!({
                        "backend": backend,
                        "tables": tables
                            .iter()
                            .map(|(t, selected)| json!({
                                "page": t.page_number,
                                "selected": selected,
                                "rows": t.rows,
                            }))
                            .collect::<Vec<_>>(),
                    }),
                    Err(e) => json!({ "backend": backend, "error": e }),
                })
                .collect();
            output::json::print(&value)?;
        }
        _ => {
            for (backend, result) in &reports {
                match result {
                    Ok(tables) => println!("{}", output::table::format_raw_tables(backend, tables)),
                    Err(e) => println!("=== {backend}: failed ===\n\n  {e}\n"),
                }
            }
        }
    }
    Ok(())
}
