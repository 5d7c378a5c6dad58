//! Analysis Module
//!
//! Turns a [`ResultSet`](crate::models::ResultSet) into presentation series
//! (baseline averaging, confidence bands, max-scaling, ratios) and charts.

pub mod chart;
pub mod normalize;

pub use chart::{plot_yearly_count, prepare_chart, ChartConfig, ChartData, ChartLine, ImageFormat};
pub use normalize::{
    baseline, comparison_series, max_scale, normalize, Baseline, NormalizeOptions, NormalizedSeries,
    NormalizedView,
};
