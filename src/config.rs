//! Run configuration handed from the CLI to the pipeline.

use std::path::PathBuf;

use serde::Serialize;

pub const DEFAULT_INPUT: &str = "data/airlines.csv";
pub const DEFAULT_VISUALIZATIONS_DIR: &str = "visualizations";
pub const DEFAULT_EXPORT_DIR: &str = "tableau";
pub const DEFAULT_TOP_AIRPORTS: usize = 15;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineConfig {
    pub input: PathBuf,
    pub visualizations_dir: PathBuf,
    pub export_dir: PathBuf,
    /// Read at most this many data rows.
    pub sample_size: Option<usize>,
    /// Airports kept in the top-airports export and chart.
    pub top_airports: usize,
    pub chart_width: u32,
    pub chart_height: u32,
    /// TTF used for chart text, tried before the system fonts.
    pub chart_font: Option<PathBuf>,
    pub skip_charts: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from(DEFAULT_INPUT),
            visualizations_dir: PathBuf::from(DEFAULT_VISUALIZATIONS_DIR),
            export_dir: PathBuf::from(DEFAULT_EXPORT_DIR),
            sample_size: None,
            top_airports: DEFAULT_TOP_AIRPORTS,
            chart_width: 1200,
            chart_height: 700,
            chart_font: None,
            skip_charts: false,
        }
    }
}
