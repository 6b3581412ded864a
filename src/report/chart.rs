//! Static PNG charts over aggregate tables.
//!
//! Rendering is split in two: [`prepare`] turns an [`AggregateResult`] and a
//! [`ChartSpec`] into plain category/value series, dropping every group whose
//! value is an undefined rate, and [`render_chart`] draws those series with
//! `plotters`. The input table is only read.

use std::path::{Path, PathBuf};

use plotters::prelude::*;
use tracing::debug;

use crate::analyzers::types::{AggregateResult, Metric};
use crate::error::RenderError;

const PALETTE: [RGBColor; 8] = [
    RGBColor(0x34, 0x98, 0xdb),
    RGBColor(0xe7, 0x4c, 0x3c),
    RGBColor(0x2e, 0xcc, 0x71),
    RGBColor(0xf3, 0x9c, 0x12),
    RGBColor(0x9b, 0x59, 0xb6),
    RGBColor(0x1a, 0xbc, 0x9c),
    RGBColor(0xe6, 0x7e, 0x22),
    RGBColor(0x34, 0x49, 0x5e),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    Line,
    Bar,
    StackedBar,
}

/// One plotted series: a legend label and the metric it reads from each row.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesSpec {
    pub label: String,
    pub metric: Metric,
}

impl SeriesSpec {
    pub fn new(label: impl Into<String>, metric: Metric) -> Self {
        Self {
            label: label.into(),
            metric,
        }
    }
}

/// What to draw. `name` is the output file stem.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSpec {
    pub name: String,
    pub title: String,
    pub kind: ChartKind,
    pub x_label: String,
    pub y_label: String,
    pub series: Vec<SeriesSpec>,
}

impl ChartSpec {
    pub fn file_name(&self) -> String {
        format!("{}.png", self.name)
    }

    /// True when every series is a 0..1 fraction, so the y axis reads as percent.
    fn is_fractional(&self) -> bool {
        self.series.iter().all(|s| {
            matches!(
                s.metric,
                Metric::DelayRate | Metric::CancellationRate | Metric::OnTimeRate
            )
        })
    }
}

/// Output settings shared by all charts of a run.
#[derive(Debug, Clone)]
pub struct ChartOptions {
    pub out_dir: PathBuf,
    pub width: u32,
    pub height: u32,
    /// Draw captions, axis labels and legends. Needs a registered font.
    pub text: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlotSeries {
    pub label: String,
    /// `(category index, value)`
    pub points: Vec<(usize, f64)>,
}

/// Category labels plus the series values to draw over them.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartData {
    pub categories: Vec<String>,
    pub series: Vec<PlotSeries>,
}

impl ChartData {
    fn y_max(&self, stacked: bool) -> f64 {
        let max = if stacked {
            (0..self.categories.len())
                .map(|i| {
                    self.series
                        .iter()
                        .flat_map(|s| s.points.iter())
                        .filter(|(x, _)| *x == i)
                        .map(|(_, y)| y)
                        .sum::<f64>()
                })
                .fold(0.0, f64::max)
        } else {
            self.series
                .iter()
                .flat_map(|s| s.points.iter().map(|(_, y)| *y))
                .fold(0.0, f64::max)
        };
        if max > 0.0 { max * 1.1 } else { 1.0 }
    }
}

/// Extracts the plottable values of `result` for `spec`.
///
/// A group is kept only when every series has a defined value for it, so a
/// group with an undefined rate never shows up in a rate chart.
///
/// # Errors
///
/// [`RenderError::InvalidSpec`] for an unusable spec and
/// [`RenderError::EmptySeries`] when nothing is left to plot.
pub fn prepare(result: &AggregateResult, spec: &ChartSpec) -> Result<ChartData, RenderError> {
    let invalid = |reason: &str| RenderError::InvalidSpec {
        chart: spec.name.clone(),
        reason: reason.to_string(),
    };
    if spec.series.is_empty() {
        return Err(invalid("no series"));
    }
    if spec.kind == ChartKind::Bar && spec.series.len() > 1 {
        return Err(invalid("a bar chart takes exactly one series"));
    }
    if spec.kind == ChartKind::StackedBar && spec.series.iter().any(|s| s.metric.is_rate()) {
        return Err(invalid("rates cannot be stacked"));
    }

    let mut categories = Vec::new();
    let mut series: Vec<PlotSeries> = spec
        .series
        .iter()
        .map(|s| PlotSeries {
            label: s.label.clone(),
            points: Vec::new(),
        })
        .collect();

    for row in &result.rows {
        let values: Option<Vec<f64>> = spec.series.iter().map(|s| s.metric.value(row)).collect();
        let Some(values) = values else {
            debug!(chart = %spec.name, group = %row.key.label(), "Undefined value, group not plotted");
            continue;
        };
        let x = categories.len();
        categories.push(row.key.label());
        for (plot, y) in series.iter_mut().zip(values) {
            plot.points.push((x, y));
        }
    }

    if categories.is_empty() {
        return Err(RenderError::EmptySeries {
            chart: spec.name.clone(),
        });
    }

    Ok(ChartData { categories, series })
}

/// Renders `spec` over `result` into `options.out_dir` and returns the file path.
#[tracing::instrument(skip_all, fields(chart = %spec.name, aggregate = %result.name))]
pub fn render_chart(
    result: &AggregateResult,
    spec: &ChartSpec,
    options: &ChartOptions,
) -> Result<PathBuf, RenderError> {
    let data = prepare(result, spec)?;

    std::fs::create_dir_all(&options.out_dir).map_err(|source| RenderError::Io {
        chart: spec.name.clone(),
        path: options.out_dir.clone(),
        source,
    })?;
    let path = options.out_dir.join(spec.file_name());

    draw(&path, spec, &data, options).map_err(|e| RenderError::Backend {
        chart: spec.name.clone(),
        message: e.to_string(),
    })?;

    debug!(path = %path.display(), categories = data.categories.len(), "Chart written");
    Ok(path)
}

fn draw(
    path: &Path,
    spec: &ChartSpec,
    data: &ChartData,
    options: &ChartOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let root = BitMapBackend::new(path, (options.width, options.height)).into_drawing_area();
    root.fill(&WHITE)?;

    let n = data.categories.len();
    let stacked = spec.kind == ChartKind::StackedBar;
    let percent = spec.is_fractional();

    let mut builder = ChartBuilder::on(&root);
    builder.margin(20);
    if options.text {
        builder
            .caption(&spec.title, ("sans-serif", 28))
            .x_label_area_size(50)
            .y_label_area_size(90);
    }
    let mut chart = builder.build_cartesian_2d((0..n).into_segmented(), 0f64..data.y_max(stacked))?;

    if options.text {
        let x_formatter = |v: &SegmentValue<usize>| match v {
            SegmentValue::Exact(i) | SegmentValue::CenterOf(i) => {
                data.categories.get(*i).cloned().unwrap_or_default()
            }
            SegmentValue::Last => String::new(),
        };
        let y_formatter = |y: &f64| {
            if percent {
                format!("{:.1}%", y * 100.0)
            } else {
                format!("{y:.0}")
            }
        };
        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(n)
            .x_label_formatter(&x_formatter)
            .y_label_formatter(&y_formatter)
            .x_desc(spec.x_label.as_str())
            .y_desc(spec.y_label.as_str())
            .draw()?;
    }

    match spec.kind {
        ChartKind::Line => {
            for (i, series) in data.series.iter().enumerate() {
                let color = PALETTE[i % PALETTE.len()];
                chart
                    .draw_series(LineSeries::new(
                        series
                            .points
                            .iter()
                            .map(|&(x, y)| (SegmentValue::CenterOf(x), y)),
                        color.stroke_width(3),
                    ))?
                    .label(series.label.as_str())
                    .legend(move |(x, y)| {
                        PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(3))
                    });
                chart.draw_series(
                    series
                        .points
                        .iter()
                        .map(|&(x, y)| Circle::new((SegmentValue::CenterOf(x), y), 5, color.filled())),
                )?;
            }
        }
        ChartKind::Bar | ChartKind::StackedBar => {
            let mut base = vec![0f64; n];
            for (i, series) in data.series.iter().enumerate() {
                let color = PALETTE[i % PALETTE.len()];
                let bars: Vec<_> = series
                    .points
                    .iter()
                    .map(|&(x, y)| {
                        let y0 = base[x];
                        base[x] = y0 + y;
                        let mut bar = Rectangle::new(
                            [(SegmentValue::Exact(x), y0), (SegmentValue::Exact(x + 1), y0 + y)],
                            color.filled(),
                        );
                        bar.set_margin(0, 0, 6, 6);
                        bar
                    })
                    .collect();
                chart
                    .draw_series(bars)?
                    .label(series.label.as_str())
                    .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 15, y + 5)], color.filled()));
            }
        }
    }

    if options.text && data.series.len() > 1 {
        chart
            .configure_series_labels()
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .draw()?;
    }

    root.present()?;
    Ok(())
}
