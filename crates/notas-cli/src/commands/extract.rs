use chrono::Local;
use notas_core::error::NotasError;
use notas_core::outcome::Diagnostic;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use crate::commands::RunArgs;
use crate::error::CliError;
use crate::output::{self, ExportFormat};

pub fn run(
    pdf_file: PathBuf,
    out: Option<PathBuf>,
    format: Option<&str>,
    no_banner: bool,
    args: &RunArgs,
) -> Result<(), CliError> {
    let format = ExportFormat::resolve(format, out.as_deref())?;
    let config = args.load_config()?;

    let (extraction, diagnostics) = notas_core::extract_pdf(&pdf_file, &config)?.into_parts();
    report_diagnostics(&diagnostics);
    if extraction.is_empty() {
        return Err(NotasError::NoTablesFound.into());
    }

    let path = out.unwrap_or_else(|| pdf_file.with_extension(format.extension()));
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }

    match format {
        ExportFormat::Xlsx => {
            output::xlsx::write_workbook(&path, &extraction.table, &extraction.summary)?;
        }
        ExportFormat::Csv => {
            let banner = (!no_banner)
                .then(|| output::csv::banner_lines(&config.banner, Local::now().naive_local()));
            let file = BufWriter::new(File::create(&path)?);
            output::csv::write_table(file, &extraction.table, banner.as_deref())?;
        }
        ExportFormat::Json => {
            let json = serde_json::to_string_pretty(&extraction)?;
            std::fs::write(&path, json)?;
        }
    }

    eprintln!(
        "Extracted {} invoice(s) from {} table(s) ({} strategy), written to {}",
        extraction.table.len(),
        extraction.tables_selected,
        extraction.backend,
        path.display()
    );
    eprint!("{}", output::table::format_preview(&extraction.table, 5));
    Ok(())
}

pub fn report_diagnostics(diagnostics: &[Diagnostic]) {
    if diagnostics.is_empty() {
        return;
    }
    eprintln!("{} issue(s) while extracting:", diagnostics.len());
    for d in diagnostics {
        eprintln!("  warning: {d}");
    }
}
