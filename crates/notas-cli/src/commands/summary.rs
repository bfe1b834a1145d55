use notas_core::error::NotasError;
use std::path::PathBuf;

use crate::commands::extract::report_diagnostics;
use crate::commands::RunArgs;
use crate::error::CliError;
use crate::output;

pub fn run(pdf_file: PathBuf, output_format: &str, args: &RunArgs) -> Result<(), CliError> {
    let config = args.load_config()?;
    let (extraction, diagnostics) = notas_core::extract_pdf(&pdf_file, &config)?.into_parts();
    report_diagnostics(&diagnostics);
    if extraction.is_empty() {
        return Err(NotasError::NoTablesFound.into());
    }

    match output_format {
        "json" => output::json::print(&extraction.summary)?,
        _ => {
            println!(
                "{} invoice(s), {} strategy\n",
                extraction.table.len(),
                extraction.backend
            );
            print!("{}", output::table::format_summary(&extraction.summary));
        }
    }
    Ok(())
}
