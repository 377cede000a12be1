//! # Analytics Configuration
//!
//! This module contains the single configuration object shared by every
//! analysis group, the partial update used to change it, and the presets
//! used by the downstream services.

use crate::errors::{validate_open_unit, AnalyticsError, AnalyticsResult};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Default significance level (α)
pub const DEFAULT_SIGNIFICANCE_LEVEL: f64 = 0.05;
/// Default confidence level for intervals
pub const DEFAULT_CONFIDENCE_LEVEL: f64 = 0.95;
/// Default bound on iterative routines
pub const DEFAULT_MAX_ITERATIONS: usize = 1000;
/// Default numerical tolerance
pub const DEFAULT_TOLERANCE: f64 = 1e-8;

/// Configuration read by every analysis.
///
/// `confidence_level` and `significance_level` are independent knobs; the
/// engine never derives one from the other.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase", default))]
pub struct AnalyticsConfig {
    /// α used for every `is_significant` flag
    pub significance_level: f64,
    /// Level of confidence and prediction intervals
    pub confidence_level: f64,
    /// Bound on iterative numerical routines
    pub max_iterations: usize,
    /// Tolerance for rank detection, convergence and zero-scale guards
    pub tolerance: f64,
    /// Use median/MAD scale estimates for outliers and anomalies
    pub robust_methods: bool,
    /// |standardized residual| above which a regression point is an outlier
    pub outlier_threshold: f64,
    /// |z| above which a series point is an anomaly
    pub anomaly_threshold: f64,
    /// Window-shift score above which an index is a change point
    pub change_point_threshold: f64,
    /// Largest sample size for which Kendall's tau uses the exact null distribution
    pub kendall_exact_max_n: usize,
    /// Number of forecast points
    pub forecast_horizon: usize,
    /// Series shorter than this skip trend detection
    pub min_trend_length: usize,
    /// Relative fitted change below which a trend counts as stable
    pub stable_trend_band: f64,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            significance_level: DEFAULT_SIGNIFICANCE_LEVEL,
            confidence_level: DEFAULT_CONFIDENCE_LEVEL,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            tolerance: DEFAULT_TOLERANCE,
            robust_methods: true,
            outlier_threshold: 2.5,
            anomaly_threshold: 3.0,
            change_point_threshold: 3.0,
            kendall_exact_max_n: 10,
            forecast_horizon: 5,
            min_trend_length: 4,
            stable_trend_band: 0.05,
        }
    }
}

/// Largest sample size the exact Kendall distribution is computed for.
const KENDALL_EXACT_LIMIT: usize = 60;

impl AnalyticsConfig {
    /// Strict preset: α = 0.01, 99% intervals
    pub fn strict() -> Self {
        Self {
            significance_level: 0.01,
            confidence_level: 0.99,
            ..Self::default()
        }
    }

    /// Exploratory preset: α = 0.10, 90% intervals, lower detection thresholds
    pub fn exploratory() -> Self {
        Self {
            significance_level: 0.10,
            confidence_level: 0.90,
            anomaly_threshold: 2.5,
            change_point_threshold: 2.5,
            outlier_threshold: 2.0,
            ..Self::default()
        }
    }

    /// Check every field against its allowed range.
    pub fn validate(&self) -> AnalyticsResult<()> {
        validate_open_unit(self.significance_level, "significance_level")?;
        validate_open_unit(self.confidence_level, "confidence_level")?;

        if self.max_iterations == 0 {
            return Err(invalid("max_iterations", 0.0, ">= 1"));
        }
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(invalid("tolerance", self.tolerance, "finite and > 0"));
        }
        for (name, value) in [
            ("outlier_threshold", self.outlier_threshold),
            ("anomaly_threshold", self.anomaly_threshold),
            ("change_point_threshold", self.change_point_threshold),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(invalid(name, value, "finite and > 0"));
            }
        }
        if self.kendall_exact_max_n > KENDALL_EXACT_LIMIT {
            return Err(invalid(
                "kendall_exact_max_n",
                self.kendall_exact_max_n as f64,
                "<= 60",
            ));
        }
        if self.forecast_horizon == 0 {
            return Err(invalid("forecast_horizon", 0.0, ">= 1"));
        }
        if self.min_trend_length < 2 {
            return Err(invalid(
                "min_trend_length",
                self.min_trend_length as f64,
                ">= 2",
            ));
        }
        if !(self.stable_trend_band.is_finite() && self.stable_trend_band >= 0.0) {
            return Err(invalid(
                "stable_trend_band",
                self.stable_trend_band,
                "finite and >= 0",
            ));
        }
        Ok(())
    }

    /// Apply a partial update and return the resulting configuration.
    ///
    /// The receiver is left unchanged; the merged value is validated before
    /// it is returned.
    pub fn merged(&self, update: &AnalyticsConfigUpdate) -> AnalyticsResult<Self> {
        let mut next = self.clone();
        if let Some(v) = update.significance_level {
            next.significance_level = v;
        }
        if let Some(v) = update.confidence_level {
            next.confidence_level = v;
        }
        if let Some(v) = update.max_iterations {
            next.max_iterations = v;
        }
        if let Some(v) = update.tolerance {
            next.tolerance = v;
        }
        if let Some(v) = update.robust_methods {
            next.robust_methods = v;
        }
        if let Some(v) = update.outlier_threshold {
            next.outlier_threshold = v;
        }
        if let Some(v) = update.anomaly_threshold {
            next.anomaly_threshold = v;
        }
        if let Some(v) = update.change_point_threshold {
            next.change_point_threshold = v;
        }
        if let Some(v) = update.kendall_exact_max_n {
            next.kendall_exact_max_n = v;
        }
        if let Some(v) = update.forecast_horizon {
            next.forecast_horizon = v;
        }
        if let Some(v) = update.min_trend_length {
            next.min_trend_length = v;
        }
        if let Some(v) = update.stable_trend_band {
            next.stable_trend_band = v;
        }
        next.validate()?;

        if (next.significance_level + next.confidence_level - 1.0).abs() > 1e-12
            && (update.significance_level.is_some() || update.confidence_level.is_some())
        {
            log::warn!(
                "significance_level {} and confidence_level {} do not sum to 1; intervals and tests will use different levels",
                next.significance_level,
                next.confidence_level
            );
        }
        Ok(next)
    }

    /// Two-sided α implied by `confidence_level`, used for intervals.
    pub fn interval_alpha(&self) -> f64 {
        1.0 - self.confidence_level
    }

    /// Whether a p-value is significant at the configured level.
    pub fn is_significant(&self, p_value: f64) -> bool {
        p_value < self.significance_level
    }
}

fn invalid(parameter: &str, value: f64, constraint: &str) -> AnalyticsError {
    AnalyticsError::InvalidParameter {
        parameter: parameter.to_string(),
        value,
        constraint: constraint.to_string(),
    }
}

/// Partial configuration; `None` fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase", default))]
pub struct AnalyticsConfigUpdate {
    /// New significance level
    pub significance_level: Option<f64>,
    /// New confidence level
    pub confidence_level: Option<f64>,
    /// New iteration bound
    pub max_iterations: Option<usize>,
    /// New numerical tolerance
    pub tolerance: Option<f64>,
    /// Toggle robust scale estimates
    pub robust_methods: Option<bool>,
    /// New regression outlier threshold
    pub outlier_threshold: Option<f64>,
    /// New anomaly threshold
    pub anomaly_threshold: Option<f64>,
    /// New change-point threshold
    pub change_point_threshold: Option<f64>,
    /// New exact-Kendall cut-off
    pub kendall_exact_max_n: Option<usize>,
    /// New forecast horizon
    pub forecast_horizon: Option<usize>,
    /// New minimum trend length
    pub min_trend_length: Option<usize>,
    /// New stable-trend band
    pub stable_trend_band: Option<f64>,
}

impl AnalyticsConfigUpdate {
    /// Update that only changes the significance level
    pub fn significance_level(value: f64) -> Self {
        Self {
            significance_level: Some(value),
            ..Self::default()
        }
    }

    /// Update that only changes the confidence level
    pub fn confidence_level(value: f64) -> Self {
        Self {
            confidence_level: Some(value),
            ..Self::default()
        }
    }
}
