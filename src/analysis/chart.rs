//! Yearly count charts.
//!
//! Targets are drawn in the Tango palette; comparison terms (or their
//! average with its confidence band) in Tango yellow.

use std::path::{Path, PathBuf};

use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::FontTransform;
use tracing::{info, warn};

use super::normalize::{comparison_series, nan_max, normalize, NormalizeOptions};
use crate::models::ResultSet;
use crate::types::{AppError, AppResult};

// Tango Desktop Project: blue, green, purple, red, orange, brown.
const TARGET_COLOURS: [RGBColor; 6] = [
    RGBColor(0x20, 0x4a, 0x87),
    RGBColor(0x4e, 0x9a, 0x06),
    RGBColor(0x5c, 0x35, 0x66),
    RGBColor(0xa4, 0x00, 0x00),
    RGBColor(0xce, 0x5c, 0x00),
    RGBColor(0x8f, 0x59, 0x02),
];
pub const COMPARISON_COLOUR: RGBColor = RGBColor(0xc4, 0xa0, 0x00);

const Y_MARGIN: f64 = 1.05;

#[derive(Debug, Clone, PartialEq)]
pub struct ChartConfig {
    /// Plot targets as a ratio of the comparison baseline.
    pub plot_ratio: bool,
    /// Plot the comparison average instead of each comparison term.
    pub plot_average_comparison: bool,
    pub scale_to_max: bool,
    /// Width and height in inches.
    pub figure_size: (f64, f64),
    /// Pixels per inch.
    pub dpi: f64,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            plot_ratio: false,
            plot_average_comparison: true,
            scale_to_max: false,
            figure_size: (8.0, 6.0),
            dpi: 100.0,
        }
    }
}

impl ChartConfig {
    pub fn pixel_size(&self) -> AppResult<(u32, u32)> {
        let (w, h) = self.figure_size;
        let (w, h) = ((w * self.dpi).round(), (h * self.dpi).round());
        if !(w >= 1.0 && h >= 1.0 && w.is_finite() && h.is_finite()) {
            return Err(AppError::InvalidInput(format!(
                "figure size {:?} at {} dpi is not drawable",
                self.figure_size, self.dpi
            )));
        }
        Ok((w as u32, h as u32))
    }

    /// Font size in pixels for a size given in points.
    fn font_px(&self, points: f64) -> f64 {
        points * self.dpi / 72.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Svg,
}

/// Pick the output format from the file extension. A missing extension gets
/// `.png`; unsupported ones are replaced by `.png`.
pub fn resolve_output_path(path: &Path) -> (PathBuf, ImageFormat) {
    let ext = path.extension().map(|e| e.to_string_lossy().to_lowercase());
    match ext.as_deref() {
        Some("png") => (path.to_path_buf(), ImageFormat::Png),
        Some("svg") => (path.to_path_buf(), ImageFormat::Svg),
        None => (path.with_extension("png"), ImageFormat::Png),
        Some(other) => {
            warn!(extension = %other, "Chosen file extension not supported; reverting to PNG");
            (path.with_extension("png"), ImageFormat::Png)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartLine {
    pub label: String,
    pub colour: RGBColor,
    pub values: Vec<f64>,
}

/// Everything needed to draw a chart, computed ahead of any drawing.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartData {
    pub years: Vec<i32>,
    pub lines: Vec<ChartLine>,
    /// Lower and upper confidence band around the comparison average.
    pub band: Option<(Vec<f64>, Vec<f64>)>,
    pub y_max: f64,
    pub y_label: String,
}

fn is_banana(term: &str) -> bool {
    matches!(term, "banana" | "\"banana\"" | "'banana'")
}

/// Tick label for `year` on an axis spanning `span` years. Long ranges only
/// label even years (over 10 years) or multiples of five (over 30 years).
pub fn tick_label(year: i32, span: usize) -> String {
    let shown = match span {
        0..=10 => true,
        11..=30 => year.rem_euclid(2) == 0,
        _ => year.rem_euclid(5) == 0,
    };
    if shown {
        year.to_string()
    } else {
        String::new()
    }
}

pub fn y_label(results: &ResultSet, config: &ChartConfig) -> String {
    let mut label = if config.plot_ratio {
        match results.comparisons() {
            [only] if is_banana(only.as_str()) => "Banana ratio",
            _ => "Relative publication ratio",
        }
    } else {
        "Number of publications"
    }
    .to_string();
    if config.scale_to_max {
        label.push_str(" (max-scaled)");
    }
    label
}

/// Work out the lines, band and axis extent for `results`.
pub fn prepare_chart(results: &ResultSet, config: &ChartConfig) -> AppResult<ChartData> {
    let view = normalize(
        results,
        NormalizeOptions {
            scale_to_max: config.scale_to_max,
            ratio: config.plot_ratio,
        },
    )?;

    let mut lines = Vec::new();
    let mut band = None;
    let mut highest: f64 = 0.0;

    if !config.plot_ratio {
        if config.plot_average_comparison {
            highest = highest.max(view.baseline.peak());
            if let (Some(lower), Some(upper)) = (view.baseline.lower(), view.baseline.upper()) {
                band = Some((lower, upper));
            }
            lines.push(ChartLine {
                label: view.baseline.label.clone(),
                colour: COMPARISON_COLOUR,
                values: view.baseline.values.clone(),
            });
        } else {
            for series in comparison_series(results, config.scale_to_max) {
                highest = highest.max(nan_max(&series.values).unwrap_or(0.0));
                lines.push(ChartLine {
                    label: series.label,
                    colour: COMPARISON_COLOUR,
                    values: series.values,
                });
            }
        }
    }

    for (i, series) in view.targets.into_iter().enumerate() {
        let colour = if config.plot_ratio && is_banana(&series.label) {
            COMPARISON_COLOUR
        } else {
            TARGET_COLOURS[i % TARGET_COLOURS.len()]
        };
        highest = highest.max(nan_max(&series.values).unwrap_or(0.0));
        lines.push(ChartLine {
            label: series.label,
            colour,
            values: series.values,
        });
    }

    let y_max = if highest > 0.0 && highest.is_finite() {
        highest * Y_MARGIN
    } else {
        1.0
    };

    Ok(ChartData {
        years: results.years().to_vec(),
        lines,
        band,
        y_max,
        y_label: y_label(results, config),
    })
}

/// Split a line at missing (`NaN`) values so gaps are left undrawn.
fn segments(years: &[i32], values: &[f64]) -> Vec<Vec<(i32, f64)>> {
    let mut out = Vec::new();
    let mut current = Vec::new();
    for (&year, &value) in years.iter().zip(values) {
        if value.is_finite() {
            current.push((year, value));
        } else if !current.is_empty() {
            out.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

fn chart_error<E: std::fmt::Display>(e: E) -> AppError {
    AppError::Chart(e.to_string())
}

fn draw<DB: DrawingBackend>(
    root: DrawingArea<DB, Shift>,
    data: &ChartData,
    config: &ChartConfig,
) -> AppResult<()> {
    root.fill(&WHITE).map_err(chart_error)?;

    let first = data.years.first().copied().unwrap_or_default();
    let last = data.years.last().copied().unwrap_or(first);
    let span = data.years.len();

    let mut chart = ChartBuilder::on(&root)
        .margin(20)
        .x_label_area_size(config.font_px(40.0) as u32)
        .y_label_area_size(config.font_px(60.0) as u32)
        .build_cartesian_2d((first - 1)..(last + 1), 0f64..data.y_max)
        .map_err(chart_error)?;

    chart
        .configure_mesh()
        .disable_mesh()
        .x_labels(span + 3)
        .x_label_formatter(&|year| {
            if *year < first || *year > last {
                String::new()
            } else {
                tick_label(*year, span)
            }
        })
        .x_label_style(
            ("sans-serif", config.font_px(12.0))
                .into_font()
                .transform(FontTransform::Rotate90),
        )
        .y_label_style(("sans-serif", config.font_px(12.0)))
        .y_desc(data.y_label.as_str())
        .axis_desc_style(("sans-serif", config.font_px(16.0)))
        .draw()
        .map_err(chart_error)?;

    if let Some((lower, upper)) = &data.band {
        let mut outline: Vec<(i32, f64)> = data.years.iter().copied().zip(lower.iter().copied()).collect();
        outline.extend(data.years.iter().copied().zip(upper.iter().copied()).rev());
        chart
            .draw_series(std::iter::once(Polygon::new(outline, COMPARISON_COLOUR.mix(0.3).filled())))
            .map_err(chart_error)?;
    }

    for line in &data.lines {
        let colour = line.colour;
        let style = colour.stroke_width(2);
        chart
            .draw_series(
                segments(&data.years, &line.values)
                    .into_iter()
                    .map(move |points| PathElement::new(points, style)),
            )
            .map_err(chart_error)?
            .label(line.label.as_str())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], colour.stroke_width(2)));
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .label_font(("sans-serif", config.font_px(12.0)))
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()
        .map_err(chart_error)?;

    root.present().map_err(chart_error)?;
    Ok(())
}

/// Render `results` to `path` and return the path actually written.
pub fn plot_yearly_count(results: &ResultSet, config: &ChartConfig, path: &Path) -> AppResult<PathBuf> {
    let data = prepare_chart(results, config)?;
    let size = config.pixel_size()?;
    let (path, format) = resolve_output_path(path);

    match format {
        ImageFormat::Png => draw(BitMapBackend::new(&path, size).into_drawing_area(), &data, config)?,
        ImageFormat::Svg => draw(SVGBackend::new(&path, size).into_drawing_area(), &data, config)?,
    }

    info!(path = %path.display(), lines = data.lines.len(), "Chart written");
    Ok(path)
}
