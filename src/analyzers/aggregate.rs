use std::collections::BTreeMap;

use tracing::debug;

use crate::analyzers::types::{AggregateResult, AggregateRow, Dimension, FlightTotals, GroupKey};
use crate::record::FlightDelayRecord;

/// Groups `records` by `dimension` and sums every count per group.
///
/// Rates are derived from the summed counts, never averaged across records.
/// Rows come back in ascending key order.
#[tracing::instrument(skip(records), fields(records = records.len(), dimension = ?dimension))]
pub fn aggregate(name: &str, records: &[FlightDelayRecord], dimension: Dimension) -> AggregateResult {
    let mut groups: BTreeMap<GroupKey, AggregateRow> = BTreeMap::new();

    for record in records {
        let key = dimension.key_of(record);
        let row = groups.entry(key.clone()).or_insert_with(|| AggregateRow {
            key,
            airport_name: (dimension == Dimension::Airport).then(|| record.airport_name.clone()),
            record_count: 0,
            totals: FlightTotals::default(),
        });
        row.record_count += 1;
        row.totals.add_record(record);
    }

    debug!(groups = groups.len(), "Aggregated");

    AggregateResult {
        name: name.to_string(),
        dimension,
        rows: groups.into_values().collect(),
    }
}

/// The `n` busiest groups of `result`, by total flights descending.
///
/// Ties keep the key order of `result`.
pub fn top_by_volume(name: &str, result: &AggregateResult, n: usize) -> AggregateResult {
    let mut rows = result.rows.clone();
    rows.sort_by(|a, b| b.totals.total.cmp(&a.totals.total).then_with(|| a.key.cmp(&b.key)));
    rows.truncate(n);

    AggregateResult {
        name: name.to_string(),
        dimension: result.dimension,
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::types::Rate;
    use crate::record::CauseCounts;

    fn record(code: &str, year: u16, month: u8, total: u64, delayed: u64) -> FlightDelayRecord {
        FlightDelayRecord {
            airport_code: code.into(),
            airport_name: format!("{code} International"),
            year,
            month,
            total,
            on_time: total - delayed,
            delayed,
            cancelled: 0,
            diverted: 0,
            delays: CauseCounts {
                carrier: delayed,
                ..Default::default()
            },
            minutes: CauseCounts {
                weather: delayed * 30,
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_ord_yearly_scenario() {
        let records = vec![
            record("ORD", 2010, 1, 100, 10),
            record("ORD", 2011, 1, 200, 20),
            record("ORD", 2012, 1, 300, 30),
        ];
        let by_airport = aggregate("airport", &records, Dimension::Airport);
        assert_eq!(by_airport.len(), 1);
        let ord = &by_airport.rows[0];
        assert_eq!(ord.totals.total, 600);
        assert_eq!(ord.totals.delayed, 60);
        assert_eq!(ord.totals.delay_rate(), Rate::Defined(0.1));
        assert_eq!(ord.airport_name.as_deref(), Some("ORD International"));

        let yearly = aggregate("yearly", &records, Dimension::Year);
        let keys: Vec<_> = yearly.rows.iter().map(|r| r.key.clone()).collect();
        assert_eq!(
            keys,
            vec![GroupKey::Year(2010), GroupKey::Year(2011), GroupKey::Year(2012)]
        );
        let sum: u64 = yearly.rows.iter().map(|r| r.totals.total).sum();
        assert_eq!(sum, 600);
    }

    #[test]
    fn test_rates_are_ratio_of_sums() {
        // average of ratios would be (0.5 + 0.0) / 2 = 0.25
        let records = vec![
            record("ATL", 2010, 1, 2, 1),
            record("BOS", 2010, 1, 98, 0),
        ];
        let yearly = aggregate("yearly", &records, Dimension::Year);
        assert_eq!(yearly.rows[0].totals.delay_rate(), Rate::Defined(0.01));
        assert_eq!(yearly.rows[0].record_count, 2);
        assert_eq!(yearly.rows[0].totals.delays.carrier, 1);
        assert_eq!(yearly.rows[0].totals.minutes.weather, 30);
    }

    #[test]
    fn test_zero_total_group_is_undefined() {
        let records = vec![record("XYZ", 2010, 1, 0, 0), record("ORD", 2010, 2, 10, 1)];
        let monthly = aggregate("monthly", &records, Dimension::Month);
        let january = monthly.row(&GroupKey::Month(1)).unwrap();
        assert_eq!(january.totals.delay_rate(), Rate::Undefined);
        assert_eq!(january.totals.cancellation_rate(), Rate::Undefined);
        assert_eq!(january.totals.avg_delay_minutes(), Rate::Undefined);
    }

    #[test]
    fn test_airports_sorted_alphabetically() {
        let records = vec![
            record("SFO", 2010, 1, 10, 1),
            record("ATL", 2010, 1, 10, 1),
            record("DEN", 2010, 1, 10, 1),
        ];
        let by_airport = aggregate("airport", &records, Dimension::Airport);
        let codes: Vec<_> = by_airport.rows.iter().map(|r| r.key.as_cell()).collect();
        assert_eq!(codes, vec!["ATL", "DEN", "SFO"]);
    }

    #[test]
    fn test_empty_input_gives_empty_result() {
        let result = aggregate("yearly", &[], Dimension::Year);
        assert!(result.is_empty());
    }

    #[test]
    fn test_top_by_volume() {
        let records = vec![
            record("ATL", 2010, 1, 50, 1),
            record("BOS", 2010, 1, 10, 1),
            record("DEN", 2010, 1, 50, 1),
            record("ORD", 2010, 1, 90, 1),
        ];
        let by_airport = aggregate("airport", &records, Dimension::Airport);
        let top = top_by_volume("top", &by_airport, 3);
        let codes: Vec<_> = top.rows.iter().map(|r| r.key.as_cell()).collect();
        assert_eq!(codes, vec!["ORD", "ATL", "DEN"]);
        assert_eq!(by_airport.rows[0].key.as_cell(), "ATL");
    }
}
