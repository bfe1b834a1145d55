pub mod csv;
pub mod json;
pub mod table;
pub mod xlsx;

use std::path::Path;

use crate::error::CliError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Xlsx,
    Csv,
    Json,
}

impl ExportFormat {
    pub fn from_name(name: &str) -> Result<Self, CliError> {
        match name.trim().to_lowercase().as_str() {
            "xlsx" | "excel" => Ok(ExportFormat::Xlsx),
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            _ => Err(CliError::UnknownFormat(name.to_string())),
        }
    }

    /// Explicit format first, then the output file's extension, then xlsx.
    pub fn resolve(name: Option<&str>, out: Option<&Path>) -> Result<Self, CliError> {
        if let Some(name) = name {
            return Self::from_name(name);
        }
        let from_ext = out
            .and_then(|p| p.extension())
            .and_then(|e| e.to_str())
            .and_then(|e| Self::from_name(e).ok());
        Ok(from_ext.unwrap_or(ExportFormat::Xlsx))
    }

    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Xlsx => "xlsx",
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_resolution_order() {
        assert_eq!(
            ExportFormat::resolve(Some("CSV"), Some(Path::new("a.xlsx"))).unwrap(),
            ExportFormat::Csv
        );
        assert_eq!(
            ExportFormat::resolve(None, Some(Path::new("out/notas.json"))).unwrap(),
            ExportFormat::Json
        );
        assert_eq!(
            ExportFormat::resolve(None, Some(Path::new("notas.txt"))).unwrap(),
            ExportFormat::Xlsx
        );
        assert_eq!(ExportFormat::resolve(None, None).unwrap(), ExportFormat::Xlsx);
        assert!(ExportFormat::resolve(Some("ods"), None).is_err());
    }
}
