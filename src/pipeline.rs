//! The end-to-end run: load, clean, aggregate, then chart and export.
//!
//! Only a [`LoadError`] stops a run. Charts that cannot be drawn and exports
//! that cannot be written are recorded in the [`RunSummary`] and the run
//! carries on with the rest.

use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::analyzers::{
    AggregateResult, CauseSummary, Dimension, Metric, OverallSummary, aggregate, cause_breakdown,
    top_by_volume,
};
use crate::cleaner::{CleaningReport, clean};
use crate::config::PipelineConfig;
use crate::error::{ExportError, LoadError};
use crate::loader::load_records;
use crate::output::{export_aggregate, export_rows};
use crate::record::{DelayCause, FlightDelayRecord};
use crate::report::{ChartKind, ChartOptions, ChartSpec, SeriesSpec, ensure_font, render_chart};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    NotStarted,
    Running,
    Completed,
    Failed,
}

/// Every table derived from the cleaned records.
#[derive(Debug, Clone)]
pub struct Aggregates {
    pub yearly: AggregateResult,
    pub monthly: AggregateResult,
    pub by_airport: AggregateResult,
    pub top_airports: AggregateResult,
    pub causes: Vec<CauseSummary>,
    pub overall: OverallSummary,
}

/// Computes all aggregates over `records`.
#[tracing::instrument(skip(records), fields(records = records.len()))]
pub fn analyze(records: &[FlightDelayRecord], top_airports: usize) -> Aggregates {
    let by_airport = aggregate("airport_summary", records, Dimension::Airport);
    let overall = OverallSummary::from_records(records);

    Aggregates {
        yearly: aggregate("yearly_summary", records, Dimension::Year),
        monthly: aggregate("monthly_summary", records, Dimension::Month),
        top_airports: top_by_volume("top_airports", &by_airport, top_airports),
        by_airport,
        causes: cause_breakdown(&overall.totals),
        overall,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedChart {
    pub chart: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedExport {
    pub path: PathBuf,
    pub reason: String,
}

/// What a run did, for the final report.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub state: PipelineState,
    pub rows_read: usize,
    pub rows_processed: usize,
    pub rows_excluded: usize,
    pub cleaning: CleaningReport,
    pub charts_produced: Vec<PathBuf>,
    pub charts_skipped: Vec<SkippedChart>,
    pub files_exported: Vec<PathBuf>,
    pub export_failures: Vec<FailedExport>,
}

/// A single linear run over one input file.
pub struct Pipeline {
    config: PipelineConfig,
    state: PipelineState,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            state: PipelineState::NotStarted,
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Runs every stage once.
    ///
    /// # Errors
    ///
    /// Returns the [`LoadError`] when the input cannot be read; the pipeline
    /// is then [`PipelineState::Failed`].
    #[tracing::instrument(skip(self), fields(input = %self.config.input.display()))]
    pub fn run(&mut self) -> Result<RunSummary, LoadError> {
        let started_at = Utc::now();
        let clock = Instant::now();
        self.state = PipelineState::Running;
        info!("Pipeline started");

        let loaded = match load_records(&self.config.input, self.config.sample_size) {
            Ok(loaded) => loaded,
            Err(e) => {
                self.state = PipelineState::Failed;
                error!(error = %e, "Pipeline failed");
                return Err(e);
            }
        };
        let rows_read = loaded.rows_read;
        let (records, cleaning) = clean(loaded);
        let aggregates = analyze(&records, self.config.top_airports);

        let mut summary = RunSummary {
            started_at,
            elapsed_ms: 0,
            state: PipelineState::Running,
            rows_read,
            rows_processed: records.len(),
            rows_excluded: cleaning.excluded_rows(),
            cleaning,
            charts_produced: Vec::new(),
            charts_skipped: Vec::new(),
            files_exported: Vec::new(),
            export_failures: Vec::new(),
        };

        if self.config.skip_charts {
            info!("Chart rendering disabled");
        } else {
            self.render_charts(&aggregates, &mut summary);
        }
        self.export_tables(&aggregates, &mut summary);

        self.state = PipelineState::Completed;
        summary.state = self.state;
        summary.elapsed_ms = u64::try_from(clock.elapsed().as_millis()).unwrap_or(u64::MAX);

        info!(
            rows_read = summary.rows_read,
            rows_processed = summary.rows_processed,
            rows_excluded = summary.rows_excluded,
            charts_produced = summary.charts_produced.len(),
            charts_skipped = summary.charts_skipped.len(),
            files_exported = summary.files_exported.len(),
            export_failures = summary.export_failures.len(),
            elapsed_ms = summary.elapsed_ms,
            "Pipeline completed"
        );
        Ok(summary)
    }

    fn render_charts(&self, aggregates: &Aggregates, summary: &mut RunSummary) {
        let font = ensure_font(self.config.chart_font.as_deref());
        let options = ChartOptions {
            out_dir: self.config.visualizations_dir.clone(),
            width: self.config.chart_width,
            height: self.config.chart_height,
            text: font.is_some(),
        };

        for (result, spec) in standard_charts(aggregates) {
            match render_chart(result, &spec, &options) {
                Ok(path) => {
                    info!(chart = %spec.name, path = %path.display(), "Chart produced");
                    summary.charts_produced.push(path);
                }
                Err(e) => {
                    warn!(chart = %spec.name, error = %e, "Chart skipped");
                    summary.charts_skipped.push(SkippedChart {
                        chart: spec.name,
                        reason: e.to_string(),
                    });
                }
            }
        }
    }

    fn export_tables(&self, aggregates: &Aggregates, summary: &mut RunSummary) {
        let dir = &self.config.export_dir;

        for result in [
            &aggregates.yearly,
            &aggregates.monthly,
            &aggregates.by_airport,
            &aggregates.top_airports,
        ] {
            let path = dir.join(format!("{}.csv", result.name));
            record_export(summary, path, |p| export_aggregate(p, result));
        }
        record_export(summary, dir.join("delay_causes.csv"), |p| {
            export_rows(p, &aggregates.causes)
        });
        record_export(summary, dir.join("overall_summary.csv"), |p| {
            export_rows(p, std::slice::from_ref(&aggregates.overall))
        });
    }
}

fn record_export(
    summary: &mut RunSummary,
    path: PathBuf,
    export: impl FnOnce(&Path) -> Result<(), ExportError>,
) {
    match export(&path) {
        Ok(()) => {
            info!(path = %path.display(), "Exported");
            summary.files_exported.push(path);
        }
        Err(e) => {
            error!(path = %path.display(), error = %e, "Export failed");
            summary.export_failures.push(FailedExport {
                path,
                reason: e.to_string(),
            });
        }
    }
}

/// The fixed chart set, paired with the aggregate each one reads.
pub fn standard_charts(aggregates: &Aggregates) -> Vec<(&AggregateResult, ChartSpec)> {
    let spec = |name: &str, title: &str, kind, x: &str, y: &str, series| ChartSpec {
        name: name.to_string(),
        title: title.to_string(),
        kind,
        x_label: x.to_string(),
        y_label: y.to_string(),
        series,
    };

    vec![
        (
            &aggregates.yearly,
            spec(
                "yearly_delay_trend",
                "Delay and Cancellation Rate by Year",
                ChartKind::Line,
                "Year",
                "Share of flights",
                vec![
                    SeriesSpec::new("Delay rate", Metric::DelayRate),
                    SeriesSpec::new("Cancellation rate", Metric::CancellationRate),
                ],
            ),
        ),
        (
            &aggregates.yearly,
            spec(
                "yearly_flight_volume",
                "Total Flights by Year",
                ChartKind::Bar,
                "Year",
                "Flights",
                vec![SeriesSpec::new("Flights", Metric::TotalFlights)],
            ),
        ),
        (
            &aggregates.monthly,
            spec(
                "monthly_delay_pattern",
                "Delay Rate by Month",
                ChartKind::Bar,
                "Month",
                "Delay rate",
                vec![SeriesSpec::new("Delay rate", Metric::DelayRate)],
            ),
        ),
        (
            &aggregates.monthly,
            spec(
                "monthly_cancellation_rate",
                "Cancellation Rate by Month",
                ChartKind::Bar,
                "Month",
                "Cancellation rate",
                vec![SeriesSpec::new("Cancellation rate", Metric::CancellationRate)],
            ),
        ),
        (
            &aggregates.yearly,
            spec(
                "yearly_delay_causes",
                "Delays by Cause per Year",
                ChartKind::StackedBar,
                "Year",
                "Delays",
                DelayCause::ALL
                    .iter()
                    .map(|c| SeriesSpec::new(c.label(), Metric::DelaysBy(*c)))
                    .collect(),
            ),
        ),
        (
            &aggregates.top_airports,
            spec(
                "top_airport_delay_rates",
                "Delay Rate at the Busiest Airports",
                ChartKind::Bar,
                "Airport",
                "Delay rate",
                vec![SeriesSpec::new("Delay rate", Metric::DelayRate)],
            ),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_input_fails_the_run() {
        let mut pipeline = Pipeline::new(PipelineConfig {
            input: PathBuf::from("/nonexistent/airlines.csv"),
            ..Default::default()
        });
        assert_eq!(pipeline.state(), PipelineState::NotStarted);
        let err = pipeline.run().unwrap_err();
        assert!(matches!(err, LoadError::NotFound { .. }));
        assert_eq!(pipeline.state(), PipelineState::Failed);
    }

    #[test]
    fn test_standard_chart_names_are_unique() {
        let aggregates = analyze(&[], 5);
        let mut names: Vec<_> = standard_charts(&aggregates)
            .into_iter()
            .map(|(_, spec)| spec.file_name())
            .collect();
        let count = names.len();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), count);
        assert!(names.contains(&"yearly_delay_trend.png".to_string()));
    }

    #[test]
    fn test_rate_charts_label_the_axis_as_a_rate() {
        let aggregates = analyze(&[], 5);
        for (_, spec) in standard_charts(&aggregates) {
            if spec.series.iter().all(|s| s.metric.is_rate()) && spec.series.len() == 1 {
                assert_eq!(spec.y_label, spec.series[0].label, "{}", spec.name);
            }
        }
        let monthly: Vec<_> = standard_charts(&aggregates)
            .into_iter()
            .filter(|(_, spec)| spec.name.starts_with("monthly_"))
            .map(|(_, spec)| spec.y_label)
            .collect();
        assert_eq!(monthly, vec!["Delay rate", "Cancellation rate"]);
    }

    #[test]
    fn test_analyze_empty_table() {
        let aggregates = analyze(&[], 5);
        assert!(aggregates.yearly.is_empty());
        assert!(aggregates.top_airports.is_empty());
        assert_eq!(aggregates.causes.len(), 5);
        assert_eq!(aggregates.overall.record_count, 0);
    }
}
