//! Row types for the monthly per-airport delay table.

use serde::{Deserialize, Serialize};

/// BTS delay-cause category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DelayCause {
    Carrier,
    Weather,
    LateAircraft,
    NationalAviationSystem,
    Security,
}

impl DelayCause {
    pub const ALL: [DelayCause; 5] = [
        DelayCause::Carrier,
        DelayCause::Weather,
        DelayCause::LateAircraft,
        DelayCause::NationalAviationSystem,
        DelayCause::Security,
    ];

    /// Suffix used by the source headers, e.g. `Statistics.# of Delays.Late Aircraft`.
    pub fn source_name(self) -> &'static str {
        match self {
            Self::Carrier => "Carrier",
            Self::Weather => "Weather",
            Self::LateAircraft => "Late Aircraft",
            Self::NationalAviationSystem => "National Aviation System",
            Self::Security => "Security",
        }
    }

    /// Snake-case name used in exported column headers.
    pub fn slug(self) -> &'static str {
        match self {
            Self::Carrier => "carrier",
            Self::Weather => "weather",
            Self::LateAircraft => "late_aircraft",
            Self::NationalAviationSystem => "national_aviation_system",
            Self::Security => "security",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::NationalAviationSystem => "NAS",
            other => other.source_name(),
        }
    }
}

/// One value per [`DelayCause`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CauseCounts {
    pub carrier: u64,
    pub weather: u64,
    pub late_aircraft: u64,
    pub national_aviation_system: u64,
    pub security: u64,
}

impl CauseCounts {
    pub fn get(&self, cause: DelayCause) -> u64 {
        match cause {
            DelayCause::Carrier => self.carrier,
            DelayCause::Weather => self.weather,
            DelayCause::LateAircraft => self.late_aircraft,
            DelayCause::NationalAviationSystem => self.national_aviation_system,
            DelayCause::Security => self.security,
        }
    }

    pub fn get_mut(&mut self, cause: DelayCause) -> &mut u64 {
        match cause {
            DelayCause::Carrier => &mut self.carrier,
            DelayCause::Weather => &mut self.weather,
            DelayCause::LateAircraft => &mut self.late_aircraft,
            DelayCause::NationalAviationSystem => &mut self.national_aviation_system,
            DelayCause::Security => &mut self.security,
        }
    }

    pub fn total(&self) -> u64 {
        DelayCause::ALL
            .iter()
            .fold(0u64, |acc, c| acc.saturating_add(self.get(*c)))
    }

    pub fn add(&mut self, other: &CauseCounts) {
        for cause in DelayCause::ALL {
            let slot = self.get_mut(cause);
            *slot = slot.saturating_add(other.get(cause));
        }
    }
}

/// A row as coerced by the loader, before validation.
///
/// Counts are signed so that negative source values survive until the
/// cleaner can reject them. Cause cells are `None` when left empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    pub line: u64,
    pub airport_code: String,
    pub airport_name: String,
    pub year: i64,
    pub month: i64,
    pub total: i64,
    pub on_time: i64,
    pub delayed: i64,
    pub cancelled: i64,
    pub diverted: i64,
    pub delays: [Option<i64>; 5],
    pub minutes: [Option<i64>; 5],
}

/// A validated monthly row for one airport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlightDelayRecord {
    pub airport_code: String,
    pub airport_name: String,
    pub year: u16,
    pub month: u8,
    pub total: u64,
    pub on_time: u64,
    pub delayed: u64,
    pub cancelled: u64,
    pub diverted: u64,
    pub delays: CauseCounts,
    pub minutes: CauseCounts,
}

impl FlightDelayRecord {
    /// `(airport code, year, month)`, expected to be unique across the table.
    pub fn key(&self) -> (&str, u16, u8) {
        (&self.airport_code, self.year, self.month)
    }

    /// Whether the outcome counts exceed the flight total. A sum that
    /// overflows `u64` counts as exceeding it.
    pub fn has_inconsistent_totals(&self) -> bool {
        [self.delayed, self.cancelled, self.diverted]
            .into_iter()
            .try_fold(self.on_time, u64::checked_add)
            .is_none_or(|outcomes| outcomes > self.total)
    }
}
