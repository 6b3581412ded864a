//! Error and warning types for each pipeline stage.
//!
//! Only [`LoadError`] aborts a run. Row warnings and render failures are
//! recovered where they happen and counted, and an [`ExportError`] only fails
//! the one file it belongs to.

use std::path::PathBuf;

use thiserror::Error;

/// The input table could not be read at all.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("input file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("input file {} could not be read: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("input file {} is not valid CSV: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("input file {} has no header row", path.display())]
    NoHeader { path: PathBuf },

    #[error("input file {} is missing required columns: {}", path.display(), columns.join(", "))]
    MissingColumns { path: PathBuf, columns: Vec<String> },
}

/// A single row that was excluded while loading.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RowWarning {
    #[error("line {line}: column '{column}' value '{value}' is not a whole number")]
    Coercion {
        line: u64,
        column: &'static str,
        value: String,
    },

    #[error("line {line}: required column '{column}' is empty")]
    MissingValue { line: u64, column: &'static str },

    #[error("line {line}: row could not be decoded: {reason}")]
    Undecodable { line: u64, reason: String },
}

impl RowWarning {
    pub fn line(&self) -> u64 {
        match self {
            Self::Coercion { line, .. }
            | Self::MissingValue { line, .. }
            | Self::Undecodable { line, .. } => *line,
        }
    }
}

/// A chart that was skipped.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("chart '{chart}' has no plottable values")]
    EmptySeries { chart: String },

    #[error("chart '{chart}' is misconfigured: {reason}")]
    InvalidSpec { chart: String, reason: String },

    #[error("chart '{chart}' could not be written to {}: {source}", path.display())]
    Io {
        chart: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("chart '{chart}' failed to draw: {message}")]
    Backend { chart: String, message: String },
}

/// A single export that failed. Other exports still run.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("export {} failed: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("export {} failed: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("export {} is malformed at line {line}: {reason}", path.display())]
    Malformed {
        path: PathBuf,
        line: u64,
        reason: String,
    },
}
