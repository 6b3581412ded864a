//! Chart rendering for aggregate tables.

pub mod chart;
pub mod font;

pub use chart::{ChartData, ChartKind, ChartOptions, ChartSpec, SeriesSpec, prepare, render_chart};
pub use font::ensure_font;
