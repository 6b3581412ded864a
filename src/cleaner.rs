//! Validation of loaded rows.
//!
//! Rows with negative counts or a year/month outside the covered range are
//! dropped. Empty delay-cause cells become zero. Inconsistent flight totals,
//! repeated `(airport, year, month)` keys and odd airport codes are kept but
//! counted as data-quality warnings.

use std::collections::{BTreeMap, HashSet};
use std::ops::RangeInclusive;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::loader::LoadOutcome;
use crate::record::{CauseCounts, DelayCause, FlightDelayRecord, RawRecord};

pub const YEAR_RANGE: RangeInclusive<i64> = 2003..=2016;
pub const MONTH_RANGE: RangeInclusive<i64> = 1..=12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// Could not be coerced by the loader.
    Malformed,
    NegativeCount,
    YearOutOfRange,
    MonthOutOfRange,
}

/// What the cleaner did, and what it noticed but let through.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleaningReport {
    pub rows_received: usize,
    pub rows_kept: usize,
    pub dropped: BTreeMap<DropReason, usize>,
    /// Empty delay-cause cells replaced by zero.
    pub defaulted_cause_fields: usize,
    pub inconsistent_totals: usize,
    pub duplicate_keys: usize,
    pub nonstandard_airport_codes: usize,
}

impl CleaningReport {
    /// Every row that did not make it into the cleaned table.
    pub fn excluded_rows(&self) -> usize {
        self.dropped.values().sum()
    }

    pub fn dropped_for(&self, reason: DropReason) -> usize {
        self.dropped.get(&reason).copied().unwrap_or(0)
    }

    pub fn quality_warnings(&self) -> usize {
        self.inconsistent_totals + self.duplicate_keys + self.nonstandard_airport_codes
    }

    fn drop_row(&mut self, reason: DropReason) {
        *self.dropped.entry(reason).or_default() += 1;
    }
}

/// Validates the loaded rows and returns the cleaned table with its report.
///
/// Rows the loader already excluded are carried into the report as
/// [`DropReason::Malformed`].
#[tracing::instrument(skip_all, fields(rows = outcome.records.len()))]
pub fn clean(outcome: LoadOutcome) -> (Vec<FlightDelayRecord>, CleaningReport) {
    let mut report = CleaningReport {
        rows_received: outcome.rows_read,
        ..Default::default()
    };
    if outcome.excluded() > 0 {
        report
            .dropped
            .insert(DropReason::Malformed, outcome.excluded());
    }

    let mut seen = HashSet::new();
    let mut cleaned = Vec::with_capacity(outcome.records.len());

    for raw in outcome.records {
        let line = raw.line;
        match validate(raw, &mut report) {
            Ok(record) => {
                if !seen.insert((record.airport_code.clone(), record.year, record.month)) {
                    report.duplicate_keys += 1;
                    debug!(line, airport = %record.airport_code, year = record.year, month = record.month, "Duplicate airport/month key");
                }
                if record.has_inconsistent_totals() {
                    report.inconsistent_totals += 1;
                    debug!(line, airport = %record.airport_code, "Flight outcomes exceed total flights");
                }
                if !is_iata_code(&record.airport_code) {
                    report.nonstandard_airport_codes += 1;
                    debug!(line, airport = %record.airport_code, "Airport code is not a 3-letter IATA code");
                }
                cleaned.push(record);
            }
            Err(reason) => {
                debug!(line, ?reason, "Row dropped");
                report.drop_row(reason);
            }
        }
    }

    report.rows_kept = cleaned.len();

    if report.quality_warnings() > 0 {
        warn!(
            inconsistent_totals = report.inconsistent_totals,
            duplicate_keys = report.duplicate_keys,
            nonstandard_airport_codes = report.nonstandard_airport_codes,
            "Data-quality warnings"
        );
    }
    info!(
        kept = report.rows_kept,
        excluded = report.excluded_rows(),
        defaulted_cause_fields = report.defaulted_cause_fields,
        "Cleaned delay table"
    );

    (cleaned, report)
}

fn validate(raw: RawRecord, report: &mut CleaningReport) -> Result<FlightDelayRecord, DropReason> {
    if !YEAR_RANGE.contains(&raw.year) {
        return Err(DropReason::YearOutOfRange);
    }
    if !MONTH_RANGE.contains(&raw.month) {
        return Err(DropReason::MonthOutOfRange);
    }

    let count = |v: i64| u64::try_from(v).map_err(|_| DropReason::NegativeCount);

    let mut defaulted = 0;
    let mut causes = |cells: &[Option<i64>; 5]| -> Result<CauseCounts, DropReason> {
        let mut out = CauseCounts::default();
        for (cause, cell) in DelayCause::ALL.into_iter().zip(cells) {
            *out.get_mut(cause) = match cell {
                Some(v) => count(*v)?,
                None => {
                    defaulted += 1;
                    0
                }
            };
        }
        Ok(out)
    };
    let delays = causes(&raw.delays)?;
    let minutes = causes(&raw.minutes)?;

    let record = FlightDelayRecord {
        airport_code: raw.airport_code.to_ascii_uppercase(),
        airport_name: raw.airport_name,
        // both ranges checked above
        year: raw.year as u16,
        month: raw.month as u8,
        total: count(raw.total)?,
        on_time: count(raw.on_time)?,
        delayed: count(raw.delayed)?,
        cancelled: count(raw.cancelled)?,
        diverted: count(raw.diverted)?,
        delays,
        minutes,
    };

    report.defaulted_cause_fields += defaulted;
    Ok(record)
}

fn is_iata_code(code: &str) -> bool {
    code.len() == 3 && code.bytes().all(|b| b.is_ascii_alphabetic())
}
