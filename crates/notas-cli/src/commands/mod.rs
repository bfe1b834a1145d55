pub mod extract;
pub mod summary;
pub mod tables;

use clap::Args;
use std::path::PathBuf;

use notas_core::config::{load_config, validate_config, Config};
use notas_core::error::NotasError;

/// Settings shared by every command that runs the pipeline.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Extraction strategy: auto (default), layout or text
    #[arg(short, long)]
    pub method: Option<String>,

    /// Invoice-number prefix (e.g. 2022000000)
    #[arg(long, value_name = "PREFIX")]
    pub marker: Option<String>,

    /// Minimum rows for a table to be considered
    #[arg(long, value_name = "N")]
    pub min_rows: Option<usize>,

    /// JSON config file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Keep rows where every cell is empty
    #[arg(long)]
    pub keep_empty_rows: bool,

    /// Keep columns where every cell is empty
    #[arg(long)]
    pub keep_empty_cols: bool,

    /// Leave dates as extracted instead of DD/MM/YYYY
    #[arg(long)]
    pub raw_dates: bool,

    /// Leave monetary values as extracted text
    #[arg(long)]
    pub raw_money: bool,
}

impl RunArgs {
    /// The config file (or defaults) with command-line overrides applied.
    pub fn load_config(&self) -> Result<Config, NotasError> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => Config::default(),
        };

        if let Some(method) = &self.method {
            config.method = method.parse()?;
        }
        if let Some(marker) = &self.marker {
            config.marker = marker.trim().to_string();
        }
        if let Some(min_rows) = self.min_rows {
            config.min_rows = min_rows;
        }
        let normalize = &mut config.normalize;
        normalize.remove_empty_rows &= !self.keep_empty_rows;
        normalize.remove_empty_cols &= !self.keep_empty_cols;
        normalize.convert_dates &= !self.raw_dates;
        normalize.convert_money &= !self.raw_money;

        validate_config(&config)?;
        log::debug!("effective config: {config:?}");
        Ok(config)
    }
}
