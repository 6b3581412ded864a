use std::collections::BTreeSet;

use serde::Serialize;

use crate::analyzers::types::{FlightTotals, Rate};
use crate::record::FlightDelayRecord;

/// Whole-table totals, exported as a single row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverallSummary {
    pub record_count: usize,
    pub airports: usize,
    pub first_year: Option<u16>,
    pub last_year: Option<u16>,
    pub total_flights: u64,
    pub on_time_flights: u64,
    pub delayed_flights: u64,
    pub cancelled_flights: u64,
    pub diverted_flights: u64,
    pub delay_rate: Rate,
    pub cancellation_rate: Rate,
    pub on_time_rate: Rate,
    pub avg_delay_minutes: Rate,
    #[serde(skip)]
    pub totals: FlightTotals,
}

impl OverallSummary {
    pub fn from_records(records: &[FlightDelayRecord]) -> Self {
        let mut totals = FlightTotals::default();
        let mut airports = BTreeSet::new();
        for record in records {
            totals.add_record(record);
            airports.insert(record.airport_code.as_str());
        }

        OverallSummary {
            record_count: records.len(),
            airports: airports.len(),
            first_year: records.iter().map(|r| r.year).min(),
            last_year: records.iter().map(|r| r.year).max(),
            total_flights: totals.total,
            on_time_flights: totals.on_time,
            delayed_flights: totals.delayed,
            cancelled_flights: totals.cancelled,
            diverted_flights: totals.diverted,
            delay_rate: totals.delay_rate(),
            cancellation_rate: totals.cancellation_rate(),
            on_time_rate: totals.on_time_rate(),
            avg_delay_minutes: totals.avg_delay_minutes(),
            totals,
        }
    }
}
