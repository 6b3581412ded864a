//! Group-by aggregation and derived delay metrics.
//!
//! This module sums the cleaned monthly rows by year, month or airport,
//! derives delay, cancellation and on-time rates from the summed counts, and
//! produces the whole-table and per-cause summaries.

pub mod aggregate;
pub mod causes;
pub mod summary;
pub mod types;

pub use aggregate::{aggregate, top_by_volume};
pub use causes::{CauseSummary, cause_breakdown};
pub use summary::OverallSummary;
pub use types::{AggregateResult, AggregateRow, Dimension, FlightTotals, GroupKey, Metric, Rate};
