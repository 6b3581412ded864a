use serde::Serialize;

use crate::analyzers::types::{FlightTotals, Rate, ratio};
use crate::record::DelayCause;

/// How much one cause contributes to delays overall.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CauseSummary {
    pub cause: DelayCause,
    pub delay_count: u64,
    pub total_minutes: u64,
    /// Minutes per delay attributed to this cause.
    pub avg_minutes: Rate,
    /// Fraction of all cause-attributed delays.
    pub share_of_delays: Rate,
}

/// Breaks `totals` down by delay cause, in [`DelayCause::ALL`] order.
pub fn cause_breakdown(totals: &FlightTotals) -> Vec<CauseSummary> {
    let all_delays = totals.delays.total();

    DelayCause::ALL
        .into_iter()
        .map(|cause| {
            let delay_count = totals.delays.get(cause);
            let total_minutes = totals.minutes.get(cause);
            CauseSummary {
                cause,
                delay_count,
                total_minutes,
                avg_minutes: ratio(total_minutes, delay_count),
                share_of_delays: ratio(delay_count, all_delays),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::CauseCounts;

    #[test]
    fn test_cause_breakdown() {
        let totals = FlightTotals {
            delays: CauseCounts {
                carrier: 30,
                weather: 10,
                late_aircraft: 40,
                national_aviation_system: 20,
                security: 0,
            },
            minutes: CauseCounts {
                carrier: 600,
                weather: 500,
                late_aircraft: 1000,
                national_aviation_system: 300,
                security: 0,
            },
            ..Default::default()
        };
        let breakdown = cause_breakdown(&totals);
        assert_eq!(breakdown.len(), 5);
        assert_eq!(breakdown[0].cause, DelayCause::Carrier);
        assert_eq!(breakdown[0].avg_minutes, Rate::Defined(20.0));
        assert_eq!(breakdown[2].share_of_delays, Rate::Defined(0.4));
        assert_eq!(breakdown[4].avg_minutes, Rate::Undefined);
        assert_eq!(breakdown[4].share_of_delays, Rate::Defined(0.0));
    }

    #[test]
    fn test_no_delays_at_all() {
        let breakdown = cause_breakdown(&FlightTotals::default());
        assert!(breakdown.iter().all(|c| c.share_of_delays == Rate::Undefined));
    }
}
