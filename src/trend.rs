//! Trend, seasonality, change-point and anomaly detection with forecasting.
//!
//! A series is processed in a fixed order: the linear trend is fitted first,
//! seasonality is looked for in the detrended residuals, and change points
//! and anomalies are scored on what is left after removing both. The
//! forecast recombines the trend (or the level, for a stable series) with the
//! seasonal component.

use crate::config::AnalyticsConfig;
use crate::distributions::{normal_quantile, t_quantile, t_two_tailed_p_value};
use crate::errors::{validate_all_finite, AnalyticsError, AnalyticsResult};
use crate::math_utils::{
    calculate_autocorrelations, float_total_cmp, guarded_location_scale, index_axis, mean,
    ols_line, sample_variance, std_dev, LineFit,
};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Direction of the fitted trend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum TrendDirection {
    /// Significant positive slope
    Increasing,
    /// Significant negative slope
    Decreasing,
    /// No significant or material slope
    Stable,
}

/// Dominant repeating cycle in the detrended series.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Seasonality {
    /// Cycle length in observations
    pub period: usize,
    /// Autocorrelation of the detrended series at `period`
    pub autocorrelation: f64,
}

/// Flagged anomalous observations.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Anomalies {
    /// Indices into the series, ascending
    pub indices: Vec<usize>,
    /// Signed z-score of each flagged index
    pub scores: Vec<f64>,
    /// |z| cut-off that was applied
    pub threshold: f64,
}

/// Prediction interval of one forecast point.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ForecastInterval {
    /// Lower bound
    pub lower: f64,
    /// Upper bound
    pub upper: f64,
}

/// Forward forecast with prediction intervals.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Forecast {
    /// Point forecasts for the next `forecast_horizon` periods
    pub values: Vec<f64>,
    /// One interval per forecast value
    pub confidence_intervals: Vec<ForecastInterval>,
    /// Coverage level of the intervals
    pub level: f64,
}

/// Full trend report for one series.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct TrendAnalysis {
    /// Trend classification
    pub trend: TrendDirection,
    /// 1 − p-value of the slope test
    pub strength: f64,
    /// Fitted change per period
    pub slope: f64,
    /// Two-tailed p-value of the slope
    pub slope_p_value: f64,
    /// r² of the linear fit
    pub r_squared: f64,
    /// Fitted change over the window relative to the series level, max(|mean|, sd)
    pub relative_change: Option<f64>,
    /// Dominant cycle, if any
    pub seasonality: Option<Seasonality>,
    /// First index of each new regime
    pub change_points: Vec<usize>,
    /// Anomalous observations
    pub anomalies: Anomalies,
    /// Forward forecast
    pub forecast: Forecast,
}

/// Analyse the trend of a single series.
///
/// Series shorter than `min_trend_length` (or 3) are reported as stable with
/// a flat forecast at the last observed value.
///
/// # Errors
/// - `InsufficientData` for an empty series
/// - `NonFiniteInput` for NaN or infinite values
///
/// # Example
/// ```rust
/// use insight_analytics::{trend_analysis, AnalyticsConfig, TrendDirection};
///
/// let monthly_revenue: Vec<f64> = (1..=10).map(|v| v as f64).collect();
/// let analysis = trend_analysis(&monthly_revenue, &AnalyticsConfig::default()).unwrap();
/// assert_eq!(analysis.trend, TrendDirection::Increasing);
/// assert_eq!(analysis.forecast.values.len(), 5);
/// ```
pub fn trend_analysis(series: &[f64], config: &AnalyticsConfig) -> AnalyticsResult<TrendAnalysis> {
    validate_all_finite(series, "series")?;
    let n = series.len();
    if n == 0 {
        return Err(AnalyticsError::InsufficientData {
            required: 1,
            actual: 0,
        });
    }
    if n < config.min_trend_length.max(3) {
        return Ok(short_series(series, config));
    }

    let fit = ols_line(&index_axis(n), series)?;
    let slope_p_value = slope_p_value(&fit, n)?;

    let series_mean = mean(series);
    let series_sd = std_dev(series);
    let level = series_mean.abs().max(series_sd);
    let fitted_change = fit.slope * (n - 1) as f64;
    let material = level > 0.0 && (fitted_change / level).abs() >= config.stable_trend_band;
    let trend = if !config.is_significant(slope_p_value) || !material {
        TrendDirection::Stable
    } else if fit.slope > 0.0 {
        TrendDirection::Increasing
    } else {
        TrendDirection::Decreasing
    };
    let relative_change = (level > config.tolerance).then(|| fitted_change / level);

    // Residual scale below this is treated as an exact fit
    let scale_floor = config.tolerance * (1.0 + series_sd);

    let detrended = &fit.residuals;
    let seasonality = if std_dev(detrended) >= scale_floor {
        detect_seasonality(detrended, config)
    } else {
        None
    };
    let seasonal = seasonality
        .map(|s| seasonal_component(detrended, s.period))
        .unwrap_or_default();
    let remainder: Vec<f64> = detrended
        .iter()
        .enumerate()
        .map(|(i, r)| r - seasonal_at(&seasonal, i))
        .collect();

    let change_points = detect_change_points(&remainder, scale_floor, config);
    let anomalies = detect_anomalies(&remainder, scale_floor, config);
    let forecast = build_forecast(series, &fit, trend, &seasonal, config)?;

    Ok(TrendAnalysis {
        trend,
        strength: (1.0 - slope_p_value).max(0.0),
        slope: fit.slope,
        slope_p_value,
        r_squared: fit.r_squared,
        relative_change,
        seasonality,
        change_points,
        anomalies,
        forecast,
    })
}

fn short_series(series: &[f64], config: &AnalyticsConfig) -> TrendAnalysis {
    let last = series[series.len() - 1];
    let horizon = config.forecast_horizon;
    TrendAnalysis {
        trend: TrendDirection::Stable,
        strength: 0.0,
        slope: 0.0,
        slope_p_value: 1.0,
        r_squared: 0.0,
        relative_change: None,
        seasonality: None,
        change_points: Vec::new(),
        anomalies: Anomalies {
            threshold: config.anomaly_threshold,
            ..Anomalies::default()
        },
        forecast: Forecast {
            values: vec![last; horizon],
            confidence_intervals: vec![
                ForecastInterval {
                    lower: last,
                    upper: last
                };
                horizon
            ],
            level: config.confidence_level,
        },
    }
}

/// Slope t-test at df = n − 2; an exact line has p = 0 unless it is flat.
fn slope_p_value(fit: &LineFit, n: usize) -> AnalyticsResult<f64> {
    if fit.slope_std_error > 0.0 {
        t_two_tailed_p_value(fit.slope / fit.slope_std_error, (n - 2) as f64)
    } else if fit.slope == 0.0 {
        Ok(1.0)
    } else {
        Ok(0.0)
    }
}

/// Highest autocorrelation among lags 2..=n/2 that clears the Bartlett bound.
fn detect_seasonality(detrended: &[f64], config: &AnalyticsConfig) -> Option<Seasonality> {
    let n = detrended.len();
    let max_lag = n / 2;
    if max_lag < 2 {
        return None;
    }
    let acf = calculate_autocorrelations(detrended, max_lag);
    let bound = normal_quantile(1.0 - config.significance_level / 2.0) / (n as f64).sqrt();

    (2..=max_lag)
        .filter(|&lag| acf[lag] > bound)
        .max_by(|&a, &b| float_total_cmp(&acf[a], &acf[b]).then(b.cmp(&a)))
        .map(|period| Seasonality {
            period,
            autocorrelation: acf[period],
        })
}

/// Per-phase means of the residuals, centred to sum to zero.
fn seasonal_component(detrended: &[f64], period: usize) -> Vec<f64> {
    let mut sums = vec![0.0; period];
    let mut counts = vec![0usize; period];
    for (i, &r) in detrended.iter().enumerate() {
        sums[i % period] += r;
        counts[i % period] += 1;
    }
    let phase_means: Vec<f64> = sums
        .iter()
        .zip(&counts)
        .map(|(s, &c)| if c > 0 { s / c as f64 } else { 0.0 })
        .collect();
    let centre = mean(&phase_means);
    phase_means.into_iter().map(|m| m - centre).collect()
}

fn seasonal_at(component: &[f64], index: usize) -> f64 {
    if component.is_empty() {
        0.0
    } else {
        component[index % component.len()]
    }
}

/// Sliding-window change-point scores with non-maximum suppression.
///
/// At each split t the windows `[t−w, t)` and `[t, t+w)` are compared by a
/// mean-shift z and a log-variance-ratio z; the score is the larger of the
/// two. The mean-shift z uses the larger of the pooled window variance and
/// the variance of the whole remainder, so a single window of low noise does
/// not inflate it.
fn detect_change_points(
    remainder: &[f64],
    scale_floor: f64,
    config: &AnalyticsConfig,
) -> Vec<usize> {
    let n = remainder.len();
    let w = (n / 8).max(3);
    if n < 2 * w {
        return Vec::new();
    }

    let variance_floor = scale_floor * scale_floor;
    let overall_variance = sample_variance(remainder);
    let wf = w as f64;

    let mut candidates: Vec<(usize, f64)> = Vec::new();
    for t in w..=n - w {
        let left = &remainder[t - w..t];
        let right = &remainder[t..t + w];
        let (var_left, var_right) = (sample_variance(left), sample_variance(right));

        let pooled = (0.5 * (var_left + var_right))
            .max(overall_variance)
            .max(variance_floor);
        let mean_score = (mean(right) - mean(left)).abs() / (pooled * 2.0 / wf).sqrt();

        let variance_score = if var_left > variance_floor && var_right > variance_floor {
            // Var(ln s²) ≈ 2/(w − 2) per window
            (var_right / var_left).ln().abs() / (4.0 / (wf - 2.0)).sqrt()
        } else {
            0.0
        };

        let score = mean_score.max(variance_score);
        if score > config.change_point_threshold {
            candidates.push((t, score));
        }
    }

    candidates.sort_by(|a, b| float_total_cmp(&b.1, &a.1).then(a.0.cmp(&b.0)));
    let mut accepted: Vec<usize> = Vec::new();
    for (t, _) in candidates {
        if accepted.iter().all(|&a| a.abs_diff(t) >= w) {
            accepted.push(t);
        }
    }
    accepted.sort_unstable();
    accepted
}

fn detect_anomalies(remainder: &[f64], scale_floor: f64, config: &AnalyticsConfig) -> Anomalies {
    let mut anomalies = Anomalies {
        threshold: config.anomaly_threshold,
        ..Anomalies::default()
    };
    let (location, scale) =
        match guarded_location_scale(remainder, config.robust_methods, scale_floor) {
            Some(estimates) => estimates,
            None => return anomalies,
        };
    for (i, &r) in remainder.iter().enumerate() {
        let z = (r - location) / scale;
        if z.abs() > config.anomaly_threshold {
            anomalies.indices.push(i);
            anomalies.scores.push(z);
        }
    }
    anomalies
}

/// Forecast the next `forecast_horizon` points.
///
/// Trending series extrapolate the line with the regression prediction
/// interval `ŷ ± t·s·√(1 + 1/n + (x − x̄)²/Sxx)`; stable series forecast the
/// mean with `ŷ ± t·s·√(1 + 1/n)`. The seasonal component is added to both.
fn build_forecast(
    series: &[f64],
    fit: &LineFit,
    trend: TrendDirection,
    seasonal: &[f64],
    config: &AnalyticsConfig,
) -> AnalyticsResult<Forecast> {
    let n = series.len();
    let nf = n as f64;
    let series_mean = mean(series);
    let stable = trend == TrendDirection::Stable;

    let base = |x: f64| if stable { series_mean } else { fit.predict(x) };
    let residuals: Vec<f64> = series
        .iter()
        .enumerate()
        .map(|(i, &y)| y - base(i as f64) - seasonal_at(seasonal, i))
        .collect();
    let df = if stable { nf - 1.0 } else { nf - 2.0 };
    let s = (residuals.iter().map(|r| r * r).sum::<f64>() / df).sqrt();
    let t_crit = t_quantile((1.0 + config.confidence_level) / 2.0, df)?;

    let mut values = Vec::with_capacity(config.forecast_horizon);
    let mut confidence_intervals = Vec::with_capacity(config.forecast_horizon);
    for step in 0..config.forecast_horizon {
        let index = n + step;
        let x = index as f64;
        let point = base(x) + seasonal_at(seasonal, index);
        let spread = if stable {
            1.0 + 1.0 / nf
        } else {
            1.0 + 1.0 / nf + (x - fit.x_mean).powi(2) / fit.sxx
        };
        let half_width = t_crit * s * spread.sqrt();
        values.push(point);
        confidence_intervals.push(ForecastInterval {
            lower: point - half_width,
            upper: point + half_width,
        });
    }

    Ok(Forecast {
        values,
        confidence_intervals,
        level: config.confidence_level,
    })
}
