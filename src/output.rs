//! CSV export of aggregate tables for the BI dashboard, and JSON logging.
//!
//! Every export overwrites its target, creating parent directories first, so
//! re-running the pipeline needs no cleanup. Aggregate files have a fixed
//! column order, see [`aggregate_header`].

use std::fs::{self, File};
use std::path::Path;

use anyhow::Result;
use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use serde::Serialize;
use tracing::{debug, info};

use crate::analyzers::types::{
    AggregateResult, AggregateRow, Dimension, FlightTotals, GroupKey, Rate,
};
use crate::error::ExportError;
use crate::record::DelayCause;

const COUNT_COLUMNS: [&str; 6] = [
    "record_count",
    "total_flights",
    "on_time_flights",
    "delayed_flights",
    "cancelled_flights",
    "diverted_flights",
];

const RATE_COLUMNS: [&str; 4] = [
    "delay_rate",
    "cancellation_rate",
    "on_time_rate",
    "avg_delay_minutes",
];

/// Logs a value as pretty-printed JSON.
pub fn print_json(value: &impl Serialize) -> Result<()> {
    info!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Header row for an aggregate grouped by `dimension`.
pub fn aggregate_header(dimension: Dimension) -> Vec<String> {
    let mut header: Vec<String> = dimension
        .key_columns()
        .iter()
        .chain(COUNT_COLUMNS.iter())
        .map(|c| c.to_string())
        .collect();
    header.extend(DelayCause::ALL.iter().map(|c| format!("delays_{}", c.slug())));
    header.extend(DelayCause::ALL.iter().map(|c| format!("minutes_{}", c.slug())));
    header.extend(RATE_COLUMNS.iter().map(|c| c.to_string()));
    header
}

fn aggregate_record(dimension: Dimension, row: &AggregateRow) -> Vec<String> {
    let t = &row.totals;
    let mut cells = vec![row.key.as_cell()];
    if dimension == Dimension::Airport {
        cells.push(row.airport_name.clone().unwrap_or_default());
    }
    cells.push(row.record_count.to_string());
    cells.extend(
        [t.total, t.on_time, t.delayed, t.cancelled, t.diverted]
            .iter()
            .map(u64::to_string),
    );
    cells.extend(DelayCause::ALL.iter().map(|c| t.delays.get(*c).to_string()));
    cells.extend(DelayCause::ALL.iter().map(|c| t.minutes.get(*c).to_string()));
    cells.extend(rates(t).iter().map(Rate::to_string));
    cells
}

/// Derived rates in `RATE_COLUMNS` order.
fn rates(t: &FlightTotals) -> [Rate; 4] {
    [
        t.delay_rate(),
        t.cancellation_rate(),
        t.on_time_rate(),
        t.avg_delay_minutes(),
    ]
}

/// Creates (or truncates) `path`, making its parent directories first.
fn create_file(path: &Path) -> Result<File, ExportError> {
    let io_err = |source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    File::create(path).map_err(io_err)
}

/// Writes `result` to `path` as CSV with a header row.
#[tracing::instrument(skip(result), fields(aggregate = %result.name, path = %path.display()))]
pub fn export_aggregate(path: &Path, result: &AggregateResult) -> Result<(), ExportError> {
    let csv_err = |source| ExportError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let file = create_file(path)?;
    let mut writer = WriterBuilder::new().from_writer(file);

    writer
        .write_record(aggregate_header(result.dimension))
        .map_err(csv_err)?;
    for row in &result.rows {
        writer
            .write_record(aggregate_record(result.dimension, row))
            .map_err(csv_err)?;
    }
    writer.flush().map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    debug!(rows = result.len(), "Aggregate exported");
    Ok(())
}

/// Writes serializable rows to `path`, with headers taken from the field names.
#[tracing::instrument(skip(rows), fields(path = %path.display()))]
pub fn export_rows<T: Serialize>(path: &Path, rows: &[T]) -> Result<(), ExportError> {
    let csv_err = |source| ExportError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let file = create_file(path)?;
    let mut writer = WriterBuilder::new().has_headers(true).from_writer(file);

    for row in rows {
        writer.serialize(row).map_err(csv_err)?;
    }
    writer.flush().map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    debug!(rows = rows.len(), "Rows exported");
    Ok(())
}

/// Reads an aggregate previously written by [`export_aggregate`].
///
/// The dimension is taken from the first header. Rate columns are checked
/// against the rates derived from the counts on the same row.
pub fn read_aggregate(path: &Path, name: &str) -> Result<AggregateResult, ExportError> {
    let malformed = |line: u64, reason: String| ExportError::Malformed {
        path: path.to_path_buf(),
        line,
        reason,
    };
    let csv_err = |source| ExportError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let file = File::open(path).map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut rdr = ReaderBuilder::new().from_reader(file);

    let headers = rdr.headers().map_err(csv_err)?.clone();
    let dimension = match headers.get(0) {
        Some("year") => Dimension::Year,
        Some("month") => Dimension::Month,
        Some("airport_code") => Dimension::Airport,
        other => return Err(malformed(1, format!("unknown key column {other:?}"))),
    };
    let expected = aggregate_header(dimension);
    if headers.iter().ne(expected.iter().map(String::as_str)) {
        return Err(malformed(1, "header does not match the aggregate layout".into()));
    }

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result.map_err(csv_err)?;
        let line = record.position().map_or(0, |p| p.line());
        let row = parse_aggregate_row(dimension, &record).map_err(|reason| malformed(line, reason))?;

        let written = record
            .iter()
            .skip(expected.len() - RATE_COLUMNS.len())
            .zip(RATE_COLUMNS)
            .map(|(text, column)| parse_cell::<Rate>(text, column))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|reason| malformed(line, reason))?;
        if written != rates(&row.totals) {
            return Err(malformed(line, "rates disagree with counts".into()));
        }
        rows.push(row);
    }

    Ok(AggregateResult {
        name: name.to_string(),
        dimension,
        rows,
    })
}

fn parse_aggregate_row(dimension: Dimension, record: &StringRecord) -> Result<AggregateRow, String> {
    let mut cells = record.iter();
    let mut next = |column: &str| {
        cells
            .next()
            .ok_or_else(|| format!("missing column '{column}'"))
    };

    let key_text = next("key")?;
    let key = match dimension {
        Dimension::Year => GroupKey::Year(parse_cell(key_text, "year")?),
        Dimension::Month => GroupKey::Month(parse_cell(key_text, "month")?),
        Dimension::Airport => GroupKey::Airport(key_text.to_string()),
    };
    let airport_name = match dimension {
        Dimension::Airport => Some(next("airport_name")?.to_string()),
        _ => None,
    };

    let mut counts = [0u64; 6];
    for (slot, column) in counts.iter_mut().zip(COUNT_COLUMNS) {
        *slot = parse_cell(next(column)?, column)?;
    }

    let mut totals = FlightTotals {
        total: counts[1],
        on_time: counts[2],
        delayed: counts[3],
        cancelled: counts[4],
        diverted: counts[5],
        ..Default::default()
    };
    for cause in DelayCause::ALL {
        *totals.delays.get_mut(cause) = parse_cell(next(cause.slug())?, cause.slug())?;
    }
    for cause in DelayCause::ALL {
        *totals.minutes.get_mut(cause) = parse_cell(next(cause.slug())?, cause.slug())?;
    }

    Ok(AggregateRow {
        key,
        airport_name,
        record_count: counts[0] as usize,
        totals,
    })
}

fn parse_cell<T: std::str::FromStr>(text: &str, column: &str) -> Result<T, String> {
    text.parse()
        .map_err(|_| format!("column '{column}' has non-numeric value '{text}'"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::{CauseSummary, aggregate, cause_breakdown};
    use crate::record::{CauseCounts, FlightDelayRecord};

    fn record(code: &str, year: u16, month: u8, total: u64, delayed: u64) -> FlightDelayRecord {
        FlightDelayRecord {
            airport_code: code.into(),
            airport_name: format!("{code}, Field \"Main\""),
            year,
            month,
            total,
            on_time: total - delayed,
            delayed,
            cancelled: delayed / 2,
            diverted: 0,
            delays: CauseCounts {
                carrier: 1,
                weather: 2,
                late_aircraft: 3,
                national_aviation_system: 4,
                security: 5,
            },
            minutes: CauseCounts {
                carrier: 10,
                weather: 20,
                late_aircraft: 30,
                national_aviation_system: 40,
                security: 50,
            },
        }
    }

    fn sample() -> Vec<FlightDelayRecord> {
        vec![
            record("ORD", 2010, 1, 100, 10),
            record("ORD", 2011, 2, 200, 20),
            record("ATL", 2011, 2, 0, 0),
        ]
    }

    #[test]
    fn test_header_layout() {
        let header = aggregate_header(Dimension::Airport);
        assert_eq!(header[0], "airport_code");
        assert_eq!(header[1], "airport_name");
        assert_eq!(header[2], "record_count");
        assert_eq!(header[8], "delays_carrier");
        assert_eq!(header[13], "minutes_carrier");
        assert_eq!(header.last().unwrap(), "avg_delay_minutes");
        assert_eq!(aggregate_header(Dimension::Year).len(), header.len() - 1);
    }

    #[test]
    fn test_export_creates_directories_and_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/tableau/yearly_summary.csv");
        let yearly = aggregate("yearly", &sample(), Dimension::Year);

        export_aggregate(&path, &yearly).unwrap();
        let first = fs::read(&path).unwrap();
        export_aggregate(&path, &yearly).unwrap();
        let second = fs::read(&path).unwrap();

        assert_eq!(first, second);
        let content = String::from_utf8(first).unwrap();
        assert_eq!(content.lines().count(), 3);
        assert!(content.lines().nth(1).unwrap().starts_with("2010,1,100,90,10,5,0,"));
    }

    #[test]
    fn test_zero_total_row_is_marked_undefined() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("airport_summary.csv");
        let by_airport = aggregate("airport", &sample(), Dimension::Airport);
        export_aggregate(&path, &by_airport).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let atl = content.lines().find(|l| l.starts_with("ATL")).unwrap();
        assert!(atl.ends_with(",undefined,undefined,undefined,undefined"));
    }

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        for dimension in [Dimension::Year, Dimension::Month, Dimension::Airport] {
            let path = dir.path().join(format!("{dimension:?}.csv"));
            let result = aggregate("summary", &sample(), dimension);
            export_aggregate(&path, &result).unwrap();
            let loaded = read_aggregate(&path, "summary").unwrap();
            assert_eq!(loaded, result);
        }
    }

    #[test]
    fn test_read_rejects_tampered_rates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("yearly.csv");
        export_aggregate(&path, &aggregate("yearly", &sample(), Dimension::Year)).unwrap();
        let content = fs::read_to_string(&path).unwrap().replace(",0.1,", ",0.2,");
        fs::write(&path, content).unwrap();

        let err = read_aggregate(&path, "yearly").unwrap_err();
        assert!(matches!(err, ExportError::Malformed { line: 2, .. }));
    }

    #[test]
    fn test_read_parses_rate_cells() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("yearly.csv");
        let yearly = aggregate("yearly", &sample(), Dimension::Year);
        export_aggregate(&path, &yearly).unwrap();
        let written = fs::read_to_string(&path).unwrap();

        // same value, different spelling
        fs::write(&path, written.replace(",0.1,", ",0.10,")).unwrap();
        assert_eq!(read_aggregate(&path, "yearly").unwrap(), yearly);

        fs::write(&path, written.replace(",0.1,", ",ten percent,")).unwrap();
        let err = read_aggregate(&path, "yearly").unwrap_err();
        match err {
            ExportError::Malformed { line, reason, .. } => {
                assert_eq!(line, 2);
                assert!(reason.contains("delay_rate"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_export_rows_serializes_causes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("delay_causes.csv");
        let totals = aggregate("all", &sample(), Dimension::Year).rows[0].totals;
        let causes: Vec<CauseSummary> = cause_breakdown(&totals);
        export_rows(&path, &causes).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        assert_eq!(
            lines.next().unwrap(),
            "cause,delay_count,total_minutes,avg_minutes,share_of_delays"
        );
        assert!(lines.next().unwrap().starts_with("carrier,1,10,10"));
    }

    #[test]
    fn test_export_into_unwritable_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not_a_dir");
        fs::write(&blocker, "x").unwrap();
        let yearly = aggregate("yearly", &sample(), Dimension::Year);
        let err = export_aggregate(&blocker.join("yearly.csv"), &yearly).unwrap_err();
        assert!(matches!(err, ExportError::Io { .. }));
    }
}
