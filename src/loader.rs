//! Reads the delay table from CSV and coerces each row into a [`RawRecord`].
//!
//! Problems with the file itself are fatal ([`LoadError`]). Problems with a
//! single row exclude that row and are returned as [`RowWarning`]s so the
//! caller can count them.

use std::fs::File;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim};
use tracing::{debug, info, warn};

use crate::error::{LoadError, RowWarning};
use crate::record::{DelayCause, RawRecord};
use crate::schema::{ColumnIndex, Field};

/// Largest flight or minute count accepted from a single row. Keeps every
/// summed total well inside `u64`.
pub const MAX_COUNT: i64 = u32::MAX as i64;

/// Rows that loaded, plus the ones that did not.
#[derive(Debug, Default)]
pub struct LoadOutcome {
    pub records: Vec<RawRecord>,
    /// Data rows seen, including the excluded ones.
    pub rows_read: usize,
    pub warnings: Vec<RowWarning>,
}

impl LoadOutcome {
    pub fn excluded(&self) -> usize {
        self.warnings.len()
    }
}

/// Loads at most `sample_size` data rows (all rows when `None`) from `path`.
///
/// # Errors
///
/// Returns a [`LoadError`] if the file is missing, unreadable, not CSV, or
/// lacks one of the required columns.
#[tracing::instrument(fields(path = %path.display()))]
pub fn load_records(path: &Path, sample_size: Option<usize>) -> Result<LoadOutcome, LoadError> {
    if !path.exists() {
        return Err(LoadError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let file = File::open(path).map_err(|source| LoadError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;

    let mut rdr = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(file);

    let headers = rdr
        .headers()
        .map_err(|source| LoadError::Csv {
            path: path.to_path_buf(),
            source,
        })?
        .clone();
    if headers.iter().all(|h| h.is_empty()) {
        return Err(LoadError::NoHeader {
            path: path.to_path_buf(),
        });
    }

    let index = ColumnIndex::resolve(&headers).map_err(|columns| LoadError::MissingColumns {
        path: path.to_path_buf(),
        columns,
    })?;

    let mut outcome = LoadOutcome::default();

    for (i, result) in rdr.records().enumerate() {
        if sample_size.is_some_and(|n| outcome.rows_read >= n) {
            debug!(sample_size, "Sample size reached, stopping early");
            break;
        }
        outcome.rows_read += 1;

        // header is line 1
        let fallback_line = i as u64 + 2;
        let row = match result {
            Ok(record) => {
                let line = record.position().map_or(fallback_line, |p| p.line());
                coerce_row(&index, &record, line)
            }
            Err(e) => Err(RowWarning::Undecodable {
                line: e.position().map_or(fallback_line, |p| p.line()),
                reason: e.to_string(),
            }),
        };

        match row {
            Ok(record) => outcome.records.push(record),
            Err(warning) => {
                debug!(%warning, "Row excluded");
                outcome.warnings.push(warning);
            }
        }
    }

    if outcome.excluded() > 0 {
        warn!(
            excluded = outcome.excluded(),
            rows_read = outcome.rows_read,
            "Rows excluded during load"
        );
    }
    info!(
        rows_read = outcome.rows_read,
        loaded = outcome.records.len(),
        "Loaded delay table"
    );

    Ok(outcome)
}

/// Coerces one CSV row. The first bad cell decides the warning.
fn coerce_row(index: &ColumnIndex, record: &StringRecord, line: u64) -> Result<RawRecord, RowWarning> {
    let text = |field: Field| -> Result<&str, RowWarning> {
        match index.get(record, field) {
            Some(v) if !v.is_empty() => Ok(v),
            _ => Err(RowWarning::MissingValue {
                line,
                column: field.header(),
            }),
        }
    };
    let number = |field: Field| -> Result<i64, RowWarning> {
        let value = text(field)?;
        parse_count(value).ok_or_else(|| RowWarning::Coercion {
            line,
            column: field.header(),
            value: value.to_string(),
        })
    };
    let count = |field: Field| -> Result<i64, RowWarning> {
        let value = text(field)?;
        parse_count(value)
            .filter(|v| *v <= MAX_COUNT)
            .ok_or_else(|| RowWarning::Coercion {
                line,
                column: field.header(),
                value: value.to_string(),
            })
    };
    // empty means "not recorded"; the cleaner decides what that becomes
    let optional = |field: Field| -> Result<Option<i64>, RowWarning> {
        match index.get(record, field) {
            None | Some("") => Ok(None),
            Some(value) => parse_count(value)
                .filter(|v| *v <= MAX_COUNT)
                .map(Some)
                .ok_or_else(|| RowWarning::Coercion {
                    line,
                    column: field.header(),
                    value: value.to_string(),
                }),
        }
    };

    let mut delays = [None; 5];
    let mut minutes = [None; 5];
    for (i, cause) in DelayCause::ALL.into_iter().enumerate() {
        delays[i] = optional(Field::Delays(cause))?;
        minutes[i] = optional(Field::Minutes(cause))?;
    }

    Ok(RawRecord {
        line,
        airport_code: text(Field::AirportCode)?.to_string(),
        airport_name: index
            .get(record, Field::AirportName)
            .unwrap_or_default()
            .to_string(),
        year: number(Field::Year)?,
        month: number(Field::Month)?,
        total: count(Field::Total)?,
        on_time: count(Field::OnTime)?,
        delayed: count(Field::Delayed)?,
        cancelled: count(Field::Cancelled)?,
        diverted: optional(Field::Diverted)?.unwrap_or(0),
        delays,
        minutes,
    })
}

/// Parses a whole number, accepting integral float text such as `"12.0"`.
pub fn parse_count(value: &str) -> Option<i64> {
    if let Ok(v) = value.parse::<i64>() {
        return Some(v);
    }
    value
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && v.fract() == 0.0 && v.abs() <= i64::MAX as f64)
        .map(|v| v as i64)
}
