use serde::{Deserialize, Serialize};
use std::fmt;

/// Pipeline stage that produced a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Extraction,
    Selection,
    Reconstruction,
    Normalization,
    Aggregation,
}

/// A recorded, non-fatal problem. The affected row or column was degraded
/// to a safe default and processing continued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub stage: Stage,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
}

impl Diagnostic {
    pub fn new(stage: Stage, message: impl Into<String>) -> Self {
        Diagnostic {
            stage,
            message: message.into(),
            row: None,
            column: None,
        }
    }

    pub fn at_row(mut self, row: usize) -> Self {
        self.row = Some(row);
        self
    }

    pub fn in_column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stage = match self.stage {
            Stage::Extraction => "extraction",
            Stage::Selection => "selection",
            Stage::Reconstruction => "reconstruction",
            Stage::Normalization => "normalization",
            Stage::Aggregation => "aggregation",
        };
        write!(f, "{stage}")?;
        if let Some(row) = self.row {
            write!(f, ", row {row}")?;
        }
        if let Some(column) = &self.column {
            write!(f, ", column '{column}'")?;
        }
        write!(f, ": {}", self.message)
    }
}

/// Result of a stage that can degrade without failing.
///
/// Fatal failures are carried on the `Err` side of a `Result` instead.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Ok(T),
    Degraded(T, Vec<Diagnostic>),
}

impl<T> Outcome<T> {
    /// Build an outcome, degrading only if there is something to report.
    pub fn from_parts(value: T, diagnostics: Vec<Diagnostic>) -> Self {
        if diagnostics.is_empty() {
            Outcome::Ok(value)
        } else {
            Outcome::Degraded(value, diagnostics)
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Outcome::Degraded(..))
    }

    pub fn value(&self) -> &T {
        match self {
            Outcome::Ok(v) | Outcome::Degraded(v, _) => v,
        }
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            Outcome::Ok(_) => &[],
            Outcome::Degraded(_, d) => d,
        }
    }

    pub fn into_parts(self) -> (T, Vec<Diagnostic>) {
        match self {
            Outcome::Ok(v) => (v, Vec::new()),
            Outcome::Degraded(v, d) => (v, d),
        }
    }

    pub fn into_value(self) -> T {
        self.into_parts().0
    }

    /// Transform the value, keeping any diagnostics.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Ok(v) => Outcome::Ok(f(v)),
            Outcome::Degraded(v, d) => Outcome::Degraded(f(v), d),
        }
    }
}
