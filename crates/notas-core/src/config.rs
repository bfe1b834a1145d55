use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::NotasError;

/// Which raw table source(s) to consult.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionMethod {
    /// Layout strategy first; text strategy only if layout yields no
    /// invoice tables.
    #[default]
    Auto,
    Layout,
    Text,
}

impl FromStr for ExtractionMethod {
    type Err = NotasError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Ok(ExtractionMethod::Auto),
            "layout" => Ok(ExtractionMethod::Layout),
            "text" => Ok(ExtractionMethod::Text),
            _ => Err(NotasError::UnknownMethod(s.to_string())),
        }
    }
}

impl fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractionMethod::Auto => write!(f, "auto"),
            ExtractionMethod::Layout => write!(f, "layout"),
            ExtractionMethod::Text => write!(f, "text"),
        }
    }
}

/// Field normalizer switches. All default to on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeOptions {
    pub remove_empty_rows: bool,
    pub remove_empty_cols: bool,
    pub convert_dates: bool,
    pub convert_money: bool,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        NormalizeOptions {
            remove_empty_rows: true,
            remove_empty_cols: true,
            convert_dates: true,
            convert_money: true,
        }
    }
}

/// Lines printed above the data in CSV exports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Banner {
    pub lines: Vec<String>,
    pub title: String,
}

impl Default for Banner {
    fn default() -> Self {
        Banner {
            lines: vec![
                "PREFEITURA DE IMPERATRIZ".into(),
                "SECRETARIA DE FAZENDA E GESTÃO ORÇAMENTARIA".into(),
                "SEFAZGO".into(),
                "CNPJ: 06.158.455/0001-16".into(),
                "Rua Godofredo Viana 722/738, Centro CEP: 65901-480 - Imperatriz-MA".into(),
            ],
            title: "RELATÓRIO DE SERVIÇOS PRESTADOS".into(),
        }
    }
}

/// Extraction settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Numeric prefix shared by every invoice number in the report,
    /// e.g. "2022000000" for the 2022 tax year.
    pub marker: String,
    /// Tables with fewer rows than this are ignored even if they carry the
    /// marker.
    pub min_rows: usize,
    pub method: ExtractionMethod,
    pub normalize: NormalizeOptions,
    pub banner: Banner,
}

pub const DEFAULT_MARKER: &str = "2022000000";
pub const DEFAULT_MIN_ROWS: usize = 5;

impl Default for Config {
    fn default() -> Self {
        Config {
            marker: DEFAULT_MARKER.into(),
            min_rows: DEFAULT_MIN_ROWS,
            method: ExtractionMethod::default(),
            normalize: NormalizeOptions::default(),
            banner: Banner::default(),
        }
    }
}

/// Load a config from a JSON file.
pub fn load_config(path: &Path) -> Result<Config, NotasError> {
    let content = std::fs::read_to_string(path).map_err(|e| NotasError::ConfigLoad {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let config: Config = serde_json::from_str(&content).map_err(|e| NotasError::ConfigLoad {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    validate_config(&config)?;
    Ok(config)
}

/// Parse a config from a JSON string (no file path context).
pub fn parse_config_str(json: &str) -> Result<Config, NotasError> {
    let config: Config = serde_json::from_str(json)?;
    validate_config(&config)?;
    Ok(config)
}

pub fn validate_config(config: &Config) -> Result<(), NotasError> {
    if config.marker.is_empty() {
        return Err(NotasError::ConfigInvalid("marker must not be empty".into()));
    }
    if !config.marker.chars().all(|c| c.is_ascii_digit()) {
        return Err(NotasError::ConfigInvalid(format!(
            "marker '{}' must contain only digits",
            config.marker
        )));
    }
    if config.min_rows == 0 {
        return Err(NotasError::ConfigInvalid(
            "min_rows must be at least 1".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_keys() {
        let c = parse_config_str(r#"{ "marker": "2023000000" }"#).unwrap();
        assert_eq!(c.marker, "2023000000");
        assert_eq!(c.min_rows, 5);
        assert_eq!(c.method, ExtractionMethod::Auto);
        assert!(c.normalize.convert_money);
    }

    #[test]
    fn partial_normalize_options() {
        let c = parse_config_str(r#"{ "method": "text", "normalize": { "convert_dates": false } }"#)
            .unwrap();
        assert_eq!(c.method, ExtractionMethod::Text);
        assert!(!c.normalize.convert_dates);
        assert!(c.normalize.remove_empty_rows);
    }

    #[test]
    fn non_numeric_marker_rejected() {
        assert!(parse_config_str(r#"{ "marker": "NF-2022" }"#).is_err());
        assert!(parse_config_str(r#"{ "marker": "" }"#).is_err());
        assert!(parse_config_str(r#"{ "min_rows": 0 }"#).is_err());
    }

    #[test]
    fn method_from_str() {
        assert_eq!("AUTO".parse::<ExtractionMethod>().unwrap(), ExtractionMethod::Auto);
        assert_eq!(" layout ".parse::<ExtractionMethod>().unwrap(), ExtractionMethod::Layout);
        assert_eq!("text".parse::<ExtractionMethod>().unwrap(), ExtractionMethod::Text);
        assert!(matches!(
            "pdfplumber".parse::<ExtractionMethod>(),
            Err(NotasError::UnknownMethod(_))
        ));
    }

    #[test]
    fn load_config_reports_path() {
        let err = load_config(Path::new("/nonexistent/notas.json")).unwrap_err();
        assert!(matches!(err, NotasError::ConfigLoad { .. }));
    }
}
