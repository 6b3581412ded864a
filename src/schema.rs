//! Source column names and their mapping onto record fields.
//!
//! The published table uses dotted headers (`Statistics.Flights.Total`).
//! Snake-case aliases are accepted too, so hand-made extracts load the same
//! way. Matching trims whitespace and ignores ASCII case.

use std::collections::HashMap;

use csv::StringRecord;

use crate::record::DelayCause;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    AirportCode,
    AirportName,
    Year,
    Month,
    Total,
    OnTime,
    Delayed,
    Cancelled,
    Diverted,
    Delays(DelayCause),
    Minutes(DelayCause),
}

#[derive(Debug, Clone, Copy)]
pub struct Column {
    pub field: Field,
    pub header: &'static str,
    pub aliases: &'static [&'static str],
    pub required: bool,
}

const fn col(
    field: Field,
    header: &'static str,
    aliases: &'static [&'static str],
    required: bool,
) -> Column {
    Column {
        field,
        header,
        aliases,
        required,
    }
}

pub const COLUMNS: &[Column] = &[
    col(Field::AirportCode, "Airport.Code", &["airport_code"], true),
    col(Field::AirportName, "Airport.Name", &["airport_name"], true),
    col(Field::Year, "Time.Year", &["year"], true),
    col(Field::Month, "Time.Month", &["month"], true),
    col(Field::Total, "Statistics.Flights.Total", &["total_flights"], true),
    col(Field::OnTime, "Statistics.Flights.On Time", &["on_time_flights"], true),
    col(Field::Delayed, "Statistics.Flights.Delayed", &["delayed_flights"], true),
    col(Field::Cancelled, "Statistics.Flights.Cancelled", &["cancelled_flights"], true),
    col(Field::Diverted, "Statistics.Flights.Diverted", &["diverted_flights"], false),
    col(
        Field::Delays(DelayCause::Carrier),
        "Statistics.# of Delays.Carrier",
        &["delays_carrier"],
        true,
    ),
    col(
        Field::Delays(DelayCause::Weather),
        "Statistics.# of Delays.Weather",
        &["delays_weather"],
        true,
    ),
    col(
        Field::Delays(DelayCause::LateAircraft),
        "Statistics.# of Delays.Late Aircraft",
        &["delays_late_aircraft"],
        true,
    ),
    col(
        Field::Delays(DelayCause::NationalAviationSystem),
        "Statistics.# of Delays.National Aviation System",
        &["delays_national_aviation_system"],
        true,
    ),
    col(
        Field::Delays(DelayCause::Security),
        "Statistics.# of Delays.Security",
        &["delays_security"],
        true,
    ),
    col(
        Field::Minutes(DelayCause::Carrier),
        "Statistics.Minutes Delayed.Carrier",
        &["minutes_carrier"],
        true,
    ),
    col(
        Field::Minutes(DelayCause::Weather),
        "Statistics.Minutes Delayed.Weather",
        &["minutes_weather"],
        true,
    ),
    col(
        Field::Minutes(DelayCause::LateAircraft),
        "Statistics.Minutes Delayed.Late Aircraft",
        &["minutes_late_aircraft"],
        true,
    ),
    col(
        Field::Minutes(DelayCause::NationalAviationSystem),
        "Statistics.Minutes Delayed.National Aviation System",
        &["minutes_national_aviation_system"],
        true,
    ),
    col(
        Field::Minutes(DelayCause::Security),
        "Statistics.Minutes Delayed.Security",
        &["minutes_security"],
        true,
    ),
];

impl Field {
    /// Canonical source header for this field.
    pub fn header(self) -> &'static str {
        COLUMNS
            .iter()
            .find(|c| c.field == self)
            .map_or("unknown", |c| c.header)
    }
}

/// Positions of the known fields within one header row.
#[derive(Debug, Clone)]
pub struct ColumnIndex {
    positions: HashMap<Field, usize>,
}

impl ColumnIndex {
    /// Resolves every known column against `headers`.
    ///
    /// Returns the canonical names of the required columns that are absent.
    pub fn resolve(headers: &StringRecord) -> Result<Self, Vec<String>> {
        let normalized: Vec<String> = headers.iter().map(normalize).collect();
        let mut positions = HashMap::new();
        let mut missing = Vec::new();

        for column in COLUMNS {
            let found = std::iter::once(column.header)
                .chain(column.aliases.iter().copied())
                .find_map(|name| {
                    let name = normalize(name);
                    normalized.iter().position(|h| *h == name)
                });

            match found {
                Some(pos) => {
                    positions.insert(column.field, pos);
                }
                None if column.required => missing.push(column.header.to_string()),
                None => {}
            }
        }

        if missing.is_empty() {
            Ok(Self { positions })
        } else {
            Err(missing)
        }
    }

    /// The trimmed cell for `field`, or `None` when the column is absent.
    pub fn get<'r>(&self, record: &'r StringRecord, field: Field) -> Option<&'r str> {
        self.positions
            .get(&field)
            .and_then(|pos| record.get(*pos))
            .map(str::trim)
    }
}

fn normalize(header: &str) -> String {
    header.trim().to_ascii_lowercase()
}
