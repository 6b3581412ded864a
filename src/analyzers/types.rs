//! Data types produced by the aggregation stage.

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

use crate::record::{CauseCounts, DelayCause, FlightDelayRecord};

/// A ratio that may be undefined because its denominator was zero.
///
/// Undefined rates are written as `undefined` and never plotted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Rate {
    Defined(f64),
    Undefined,
}

impl Rate {
    pub const UNDEFINED_TEXT: &'static str = "undefined";

    pub fn value(self) -> Option<f64> {
        match self {
            Rate::Defined(v) => Some(v),
            Rate::Undefined => None,
        }
    }

    pub fn is_defined(self) -> bool {
        matches!(self, Rate::Defined(_))
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rate::Defined(v) => write!(f, "{v}"),
            Rate::Undefined => f.write_str(Self::UNDEFINED_TEXT),
        }
    }
}

impl FromStr for Rate {
    type Err = std::num::ParseFloatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case(Self::UNDEFINED_TEXT) {
            Ok(Rate::Undefined)
        } else {
            s.parse().map(Rate::Defined)
        }
    }
}

impl Serialize for Rate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Rate::Defined(v) => serializer.serialize_f64(*v),
            Rate::Undefined => serializer.serialize_str(Self::UNDEFINED_TEXT),
        }
    }
}

/// The column an aggregate is grouped by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Year,
    Month,
    Airport,
}

impl Dimension {
    /// Leading columns of an exported aggregate.
    pub fn key_columns(self) -> &'static [&'static str] {
        match self {
            Dimension::Year => &["year"],
            Dimension::Month => &["month"],
            Dimension::Airport => &["airport_code", "airport_name"],
        }
    }

    pub fn key_of(self, record: &FlightDelayRecord) -> GroupKey {
        match self {
            Dimension::Year => GroupKey::Year(record.year),
            Dimension::Month => GroupKey::Month(record.month),
            Dimension::Airport => GroupKey::Airport(record.airport_code.clone()),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Dimension::Year => "Year",
            Dimension::Month => "Month",
            Dimension::Airport => "Airport",
        }
    }
}

/// Value of the grouping column for one aggregate row.
///
/// Ordering is numeric for years and months and alphabetical for airports.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GroupKey {
    Year(u16),
    Month(u8),
    Airport(String),
}

impl GroupKey {
    /// Text written to the key column.
    pub fn as_cell(&self) -> String {
        match self {
            GroupKey::Year(y) => y.to_string(),
            GroupKey::Month(m) => m.to_string(),
            GroupKey::Airport(code) => code.clone(),
        }
    }

    /// Short axis label, e.g. `2010`, `Jan`, `ORD`.
    pub fn label(&self) -> String {
        match self {
            GroupKey::Month(m) => chrono::Month::try_from(*m)
                .map(|month| month.name()[..3].to_string())
                .unwrap_or_else(|_| m.to_string()),
            other => other.as_cell(),
        }
    }
}

/// Summed counts over a set of records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FlightTotals {
    pub total: u64,
    pub on_time: u64,
    pub delayed: u64,
    pub cancelled: u64,
    pub diverted: u64,
    pub delays: CauseCounts,
    pub minutes: CauseCounts,
}

impl FlightTotals {
    /// Adds one record's counts, saturating at `u64::MAX`.
    pub fn add_record(&mut self, record: &FlightDelayRecord) {
        self.total = self.total.saturating_add(record.total);
        self.on_time = self.on_time.saturating_add(record.on_time);
        self.delayed = self.delayed.saturating_add(record.delayed);
        self.cancelled = self.cancelled.saturating_add(record.cancelled);
        self.diverted = self.diverted.saturating_add(record.diverted);
        self.delays.add(&record.delays);
        self.minutes.add(&record.minutes);
    }

    pub fn delay_rate(&self) -> Rate {
        ratio(self.delayed, self.total)
    }

    pub fn cancellation_rate(&self) -> Rate {
        ratio(self.cancelled, self.total)
    }

    pub fn on_time_rate(&self) -> Rate {
        ratio(self.on_time, self.total)
    }

    /// Cause-attributed delay minutes per delayed flight.
    pub fn avg_delay_minutes(&self) -> Rate {
        ratio(self.minutes.total(), self.delayed)
    }
}

/// `numerator / denominator`, undefined when the denominator is zero.
pub fn ratio(numerator: u64, denominator: u64) -> Rate {
    if denominator == 0 {
        Rate::Undefined
    } else {
        Rate::Defined(numerator as f64 / denominator as f64)
    }
}

/// One group of an [`AggregateResult`].
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateRow {
    pub key: GroupKey,
    /// Airport name for airport groups (first name seen for the code).
    pub airport_name: Option<String>,
    pub record_count: usize,
    pub totals: FlightTotals,
}

/// A named group-by summary over one [`Dimension`].
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateResult {
    pub name: String,
    pub dimension: Dimension,
    pub rows: Vec<AggregateRow>,
}

impl AggregateResult {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn row(&self, key: &GroupKey) -> Option<&AggregateRow> {
        self.rows.iter().find(|r| &r.key == key)
    }
}

/// A per-row value that can be charted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    TotalFlights,
    OnTimeFlights,
    DelayedFlights,
    CancelledFlights,
    DelayRate,
    CancellationRate,
    OnTimeRate,
    AvgDelayMinutes,
    DelaysBy(DelayCause),
    MinutesBy(DelayCause),
}

impl Metric {
    /// `None` when the row's value is an undefined rate.
    pub fn value(self, row: &AggregateRow) -> Option<f64> {
        let t = &row.totals;
        match self {
            Metric::TotalFlights => Some(t.total as f64),
            Metric::OnTimeFlights => Some(t.on_time as f64),
            Metric::DelayedFlights => Some(t.delayed as f64),
            Metric::CancelledFlights => Some(t.cancelled as f64),
            Metric::DelayRate => t.delay_rate().value(),
            Metric::CancellationRate => t.cancellation_rate().value(),
            Metric::OnTimeRate => t.on_time_rate().value(),
            Metric::AvgDelayMinutes => t.avg_delay_minutes().value(),
            Metric::DelaysBy(cause) => Some(t.delays.get(cause) as f64),
            Metric::MinutesBy(cause) => Some(t.minutes.get(cause) as f64),
        }
    }

    pub fn is_rate(self) -> bool {
        matches!(
            self,
            Metric::DelayRate
                | Metric::CancellationRate
                | Metric::OnTimeRate
                | Metric::AvgDelayMinutes
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ratio_zero_denominator_is_undefined() {
        assert_eq!(ratio(0, 0), Rate::Undefined);
        assert_eq!(ratio(5, 0), Rate::Undefined);
        assert_eq!(ratio(1, 4), Rate::Defined(0.25));
    }

    #[test]
    fn test_rate_text_round_trip() {
        for rate in [Rate::Defined(0.1), Rate::Defined(1.0 / 3.0), Rate::Undefined] {
            let parsed: Rate = rate.to_string().parse().unwrap();
            assert_eq!(parsed, rate);
        }
        assert_eq!(Rate::Undefined.to_string(), "undefined");
    }

    #[test]
    fn test_rate_serializes_to_json() {
        assert_eq!(serde_json::to_string(&Rate::Defined(0.5)).unwrap(), "0.5");
        assert_eq!(
            serde_json::to_string(&Rate::Undefined).unwrap(),
            "\"undefined\""
        );
    }

    #[test]
    fn test_group_key_ordering_and_labels() {
        let mut keys = vec![
            GroupKey::Airport("SFO".into()),
            GroupKey::Airport("ATL".into()),
        ];
        keys.sort();
        assert_eq!(keys[0], GroupKey::Airport("ATL".into()));
        assert!(GroupKey::Month(2) < GroupKey::Month(11));
        assert_eq!(GroupKey::Month(1).label(), "Jan");
        assert_eq!(GroupKey::Month(12).label(), "Dec");
        assert_eq!(GroupKey::Year(2010).label(), "2010");
    }

    #[test]
    fn test_add_record_saturates_instead_of_overflowing() {
        let record = FlightDelayRecord {
            airport_code: "ORD".into(),
            airport_name: String::new(),
            year: 2010,
            month: 1,
            total: i64::MAX as u64,
            on_time: 0,
            delayed: i64::MAX as u64,
            cancelled: 0,
            diverted: 0,
            delays: CauseCounts::default(),
            minutes: CauseCounts::default(),
        };
        let mut totals = FlightTotals::default();
        for _ in 0..3 {
            totals.add_record(&record);
        }
        assert_eq!(totals.total, u64::MAX);
        assert_eq!(totals.delay_rate(), Rate::Defined(1.0));
    }

    #[test]
    fn test_metric_value_skips_undefined_rates() {
        let row = AggregateRow {
            key: GroupKey::Year(2010),
            airport_name: None,
            record_count: 1,
            totals: FlightTotals::default(),
        };
        assert_eq!(Metric::TotalFlights.value(&row), Some(0.0));
        assert_eq!(Metric::DelayRate.value(&row), None);
        assert!(Metric::DelayRate.is_rate());
        assert!(!Metric::DelaysBy(DelayCause::Weather).is_rate());
    }
}
