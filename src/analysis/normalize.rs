//! Normalization of yearly counts against comparison terms.
//!
//! The baseline is the single comparison series, or the elementwise mean of
//! several. With more than two comparison terms a 95% confidence band is
//! attached: `1.96 * sd / sqrt(n - 1)` using the population standard
//! deviation. Ratio mode divides each target by the baseline; years where the
//! baseline is zero have no meaningful ratio and become `NaN`.

use crate::models::ResultSet;
use crate::types::{AppError, AppResult};

const Z_95: f64 = 1.96;

/// Label used for an averaged baseline.
pub const AVERAGE_LABEL: &str = "comparison";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizeOptions {
    /// Divide each series by its own maximum.
    pub scale_to_max: bool,
    /// Divide each target by the baseline.
    pub ratio: bool,
}

/// A derived, plot-ready series.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedSeries {
    pub label: String,
    pub values: Vec<f64>,
}

/// Comparison baseline, with a confidence half-width when enough terms exist.
#[derive(Debug, Clone, PartialEq)]
pub struct Baseline {
    pub label: String,
    pub values: Vec<f64>,
    pub half_width: Option<Vec<f64>>,
}

impl Baseline {
    pub fn lower(&self) -> Option<Vec<f64>> {
        self.half_width
            .as_ref()
            .map(|ci| self.values.iter().zip(ci).map(|(m, c)| m - c).collect())
    }

    pub fn upper(&self) -> Option<Vec<f64>> {
        self.half_width
            .as_ref()
            .map(|ci| self.values.iter().zip(ci).map(|(m, c)| m + c).collect())
    }

    /// Highest point of the baseline including the upper band.
    pub fn peak(&self) -> f64 {
        let top = self.upper().unwrap_or_else(|| self.values.clone());
        nan_max(&top).unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedView {
    pub baseline: Baseline,
    pub targets: Vec<NormalizedSeries>,
}

/// Largest non-NaN value.
pub fn nan_max(values: &[f64]) -> Option<f64> {
    values
        .iter()
        .copied()
        .filter(|v| !v.is_nan())
        .fold(None, |acc, v| Some(acc.map_or(v, |a: f64| a.max(v))))
}

/// Divide by the series maximum. Series whose maximum is not positive are
/// returned unchanged.
pub fn max_scale(values: &[f64]) -> Vec<f64> {
    match nan_max(values) {
        Some(max) if max > 0.0 && max.is_finite() => values.iter().map(|v| v / max).collect(),
        _ => values.to_vec(),
    }
}

fn prepare(values: Vec<f64>, scale_to_max: bool) -> Vec<f64> {
    if scale_to_max {
        max_scale(&values)
    } else {
        values
    }
}

/// Baseline built from the comparison terms of `results`.
pub fn baseline(results: &ResultSet, scale_to_max: bool) -> AppResult<Baseline> {
    let series: Vec<Vec<f64>> = results
        .comparison_series()
        .map(|(_, s)| prepare(s.to_f64(), scale_to_max))
        .collect();

    match series.len() {
        0 => Err(AppError::InvalidInput(
            "normalization needs at least one comparison term".to_string(),
        )),
        1 => Ok(Baseline {
            label: results.comparisons()[0].to_string(),
            values: series.into_iter().next().unwrap_or_default(),
            half_width: None,
        }),
        n => {
            let len = results.years().len();
            let mean: Vec<f64> = (0..len)
                .map(|i| series.iter().map(|s| s[i]).sum::<f64>() / n as f64)
                .collect();

            let half_width = (n > 2).then(|| {
                (0..len)
                    .map(|i| {
                        let variance = series
                            .iter()
                            .map(|s| (s[i] - mean[i]).powi(2))
                            .sum::<f64>()
                            / n as f64;
                        Z_95 * variance.sqrt() / ((n - 1) as f64).sqrt()
                    })
                    .collect()
            });

            Ok(Baseline {
                label: AVERAGE_LABEL.to_string(),
                values: mean,
                half_width,
            })
        }
    }
}

/// Comparison terms as individual series, for plotting without averaging.
pub fn comparison_series(results: &ResultSet, scale_to_max: bool) -> Vec<NormalizedSeries> {
    results
        .comparison_series()
        .map(|(term, s)| NormalizedSeries {
            label: term.to_string(),
            values: prepare(s.to_f64(), scale_to_max),
        })
        .collect()
}

/// Elementwise `values / baseline`, `NaN` where the baseline is zero.
pub fn ratio_to(values: &[f64], baseline: &[f64]) -> Vec<f64> {
    values
        .iter()
        .zip(baseline)
        .map(|(&v, &b)| if b > 0.0 { v / b } else { f64::NAN })
        .collect()
}

/// Derive the baseline and the target series for presentation.
pub fn normalize(results: &ResultSet, options: NormalizeOptions) -> AppResult<NormalizedView> {
    let baseline = baseline(results, options.scale_to_max)?;

    let targets = results
        .target_series()
        .map(|(term, s)| {
            let values = prepare(s.to_f64(), options.scale_to_max);
            let values = if options.ratio {
                ratio_to(&values, &baseline.values)
            } else {
                values
            };
            NormalizedSeries {
                label: term.to_string(),
                values,
            }
        })
        .collect();

    Ok(NormalizedView { baseline, targets })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CountSeries, SearchTerm, YearRange};

    fn pairs(list: &[(&str, &[u64])]) -> Vec<(SearchTerm, CountSeries)> {
        list.iter()
            .map(|(t, c)| (SearchTerm::new(*t).unwrap(), CountSeries::new(c.to_vec())))
            .collect()
    }

    fn results(start: i32, targets: &[(&str, &[u64])], comparisons: &[(&str, &[u64])]) -> ResultSet {
        let len = targets.iter().chain(comparisons).map(|(_, c)| c.len()).next().unwrap();
        ResultSet::from_parts(
            YearRange::new(start, start + len as i32 - 1).unwrap(),
            pairs(targets),
            pairs(comparisons),
        )
        .unwrap()
    }

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{} != {}", a, b);
    }

    #[test]
    fn test_ratio_with_zero_baseline_is_nan() {
        let rs = results(2000, &[("fart", &[1, 2, 4])], &[("banana", &[10, 20, 0])]);
        let view = normalize(&rs, NormalizeOptions { scale_to_max: false, ratio: true }).unwrap();

        let ratio = &view.targets[0].values;
        assert_close(ratio[0], 0.1);
        assert_close(ratio[1], 0.1);
        assert!(ratio[2].is_nan());
        assert_eq!(view.baseline.label, "banana");
    }

    #[test]
    fn test_single_comparison_baseline_is_unchanged() {
        let rs = results(2000, &[("fart", &[1, 2, 4])], &[("banana", &[10, 20, 0])]);
        let base = baseline(&rs, false).unwrap();
        assert_eq!(base.values, vec![10.0, 20.0, 0.0]);
        assert!(base.half_width.is_none());
        assert!(base.lower().is_none());

        let scaled = baseline(&rs, true).unwrap();
        assert_eq!(scaled.values, vec![0.5, 1.0, 0.0]);
    }

    #[test]
    fn test_two_comparisons_give_plain_mean() {
        let rs = results(2000, &[("fart", &[1, 1])], &[("banana", &[10, 20]), ("apple", &[30, 40])]);
        let base = baseline(&rs, false).unwrap();
        assert_eq!(base.values, vec![20.0, 30.0]);
        assert!(base.half_width.is_none());
        assert_eq!(base.label, AVERAGE_LABEL);
    }

    #[test]
    fn test_three_comparisons_give_confidence_band() {
        let rs = results(
            2000,
            &[("fart", &[1])],
            &[("banana", &[10]), ("apple", &[12]), ("pear", &[8])],
        );
        let base = baseline(&rs, false).unwrap();

        assert_close(base.values[0], 10.0);
        let sd = (8.0f64 / 3.0).sqrt();
        let ci = 1.96 * sd / 2f64.sqrt();
        assert_close(base.half_width.as_ref().unwrap()[0], ci);
        assert_close(base.lower().unwrap()[0], 10.0 - ci);
        assert_close(base.upper().unwrap()[0], 10.0 + ci);
        assert_close(base.peak(), 10.0 + ci);
    }

    #[test]
    fn test_three_comparisons_across_years() {
        let rs = results(
            2000,
            &[("fart", &[1, 1, 1])],
            &[("a", &[10, 20, 30]), ("b", &[12, 18, 30]), ("c", &[8, 22, 30])],
        );
        let base = baseline(&rs, false).unwrap();
        assert_eq!(base.values, vec![10.0, 20.0, 30.0]);
        // Identical counts in the final year leave no spread.
        assert_close(base.half_width.unwrap()[2], 0.0);
    }

    #[test]
    fn test_max_scale_bounds() {
        let scaled = max_scale(&[2.0, 5.0, 0.0, 10.0]);
        assert_eq!(scaled, vec![0.2, 0.5, 0.0, 1.0]);
        assert!(scaled.iter().all(|v| (0.0..=1.0).contains(v)));
        assert_eq!(nan_max(&scaled), Some(1.0));
    }

    #[test]
    fn test_max_scale_all_zero_is_left_alone() {
        let scaled = max_scale(&[0.0, 0.0, 0.0]);
        assert_eq!(scaled, vec![0.0, 0.0, 0.0]);
        assert!(scaled.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_scaled_comparisons_are_averaged_after_scaling() {
        let rs = results(2000, &[("fart", &[1, 2])], &[("a", &[5, 10]), ("b", &[0, 0])]);
        let base = baseline(&rs, true).unwrap();
        // "a" becomes [0.5, 1.0]; the all-zero "b" stays at zero.
        assert_eq!(base.values, vec![0.25, 0.5]);
    }

    #[test]
    fn test_scale_then_ratio() {
        let rs = results(2000, &[("fart", &[1, 2, 4])], &[("banana", &[10, 20, 0])]);
        let view = normalize(&rs, NormalizeOptions { scale_to_max: true, ratio: true }).unwrap();
        let ratio = &view.targets[0].values;
        assert_close(ratio[0], 0.25 / 0.5);
        assert_close(ratio[1], 0.5 / 1.0);
        assert!(ratio[2].is_nan());
    }

    #[test]
    fn test_no_comparisons_is_invalid_input() {
        let rs = results(2000, &[("fart", &[1, 2])], &[]);
        let err = normalize(&rs, NormalizeOptions::default()).unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[test]
    fn test_comparison_series_keeps_terms() {
        let rs = results(2000, &[("fart", &[1, 2])], &[("a", &[5, 10]), ("b", &[1, 4])]);
        let series = comparison_series(&rs, true);
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].label, "a");
        assert_eq!(series[1].values, vec![0.25, 1.0]);
    }

    #[test]
    fn test_nan_max_ignores_nan() {
        assert_eq!(nan_max(&[f64::NAN, 0.3, 0.1]), Some(0.3));
        assert_eq!(nan_max(&[f64::NAN]), None);
        assert_eq!(nan_max(&[]), None);
    }
}
