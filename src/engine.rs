//! Engine facades over the analysis functions.
//!
//! [`AnalyticsEngine`] owns its configuration and is the usual entry point for
//! a single caller. [`SharedAnalyticsEngine`] keeps the configuration behind a
//! read-write lock so one long-lived instance can serve many threads: updates
//! take the write lock, and each analysis runs on a snapshot cloned under the
//! read lock, so a concurrent update never changes a computation midway.

use crate::config::{AnalyticsConfig, AnalyticsConfigUpdate};
use crate::correlation::{self, CorrelationAnalysis, CorrelationMethod, PairwiseCorrelation};
use crate::errors::AnalyticsResult;
use crate::hypothesis_tests::{self, StatisticalTest, TestMode};
use crate::insights::{self, AutomatedInsight};
use crate::regression::{self, RegressionResult};
use crate::trend::{self, TrendAnalysis};
use crate::NamedSeries;
use parking_lot::RwLock;

/// Statistical analytics engine with an owned configuration.
///
/// # Example
/// ```rust
/// use insight_analytics::{AnalyticsConfigUpdate, AnalyticsEngine, TestMode};
///
/// let mut engine = AnalyticsEngine::new();
/// engine.configure(AnalyticsConfigUpdate::significance_level(0.01)).unwrap();
///
/// let result = engine
///     .t_test(&[5.1, 4.9, 5.3, 5.0], None, TestMode::OneSample, Some(5.0))
///     .unwrap();
/// assert!(!result.is_significant);
/// ```
#[derive(Debug, Clone, Default)]
pub struct AnalyticsEngine {
    config: AnalyticsConfig,
}

impl AnalyticsEngine {
    /// Engine with the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine with a validated configuration
    pub fn with_config(config: AnalyticsConfig) -> AnalyticsResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Current configuration
    pub fn config(&self) -> &AnalyticsConfig {
        &self.config
    }

    /// Merge `update` into the configuration.
    ///
    /// An invalid result is rejected and the previous configuration kept.
    pub fn configure(&mut self, update: AnalyticsConfigUpdate) -> AnalyticsResult<AnalyticsConfig> {
        let next = self.config.merged(&update)?;
        log::debug!("analytics configuration updated: {:?}", next);
        self.config = next.clone();
        Ok(next)
    }

    /// See [`hypothesis_tests::t_test`]
    pub fn t_test(
        &self,
        sample1: &[f64],
        sample2: Option<&[f64]>,
        mode: TestMode,
        hypothesized_mean: Option<f64>,
    ) -> AnalyticsResult<StatisticalTest> {
        hypothesis_tests::t_test(sample1, sample2, mode, hypothesized_mean, &self.config)
    }

    /// See [`hypothesis_tests::chi_square_test`]
    pub fn chi_square_test(
        &self,
        observed: &[f64],
        expected: Option<&[f64]>,
    ) -> AnalyticsResult<StatisticalTest> {
        hypothesis_tests::chi_square_test(observed, expected, &self.config)
    }

    /// See [`correlation::correlation_analysis`]
    pub fn correlation_analysis(
        &self,
        x: &[f64],
        y: &[f64],
        method: CorrelationMethod,
    ) -> AnalyticsResult<CorrelationAnalysis> {
        correlation::correlation_analysis(x, y, method, &self.config)
    }

    /// See [`correlation::pairwise_correlations`]
    pub fn pairwise_correlations(
        &self,
        series: &NamedSeries,
        method: CorrelationMethod,
    ) -> AnalyticsResult<Vec<PairwiseCorrelation>> {
        correlation::pairwise_correlations(series, method, &self.config)
    }

    /// See [`regression::multiple_regression`]
    pub fn multiple_regression(
        &self,
        y: &[f64],
        x_rows: &[Vec<f64>],
    ) -> AnalyticsResult<RegressionResult> {
        regression::multiple_regression(y, x_rows, &self.config)
    }

    /// See [`regression::simple_regression`]
    pub fn simple_regression(&self, x: &[f64], y: &[f64]) -> AnalyticsResult<RegressionResult> {
        regression::simple_regression(x, y, &self.config)
    }

    /// See [`trend::trend_analysis`]
    pub fn trend_analysis(&self, series: &[f64]) -> AnalyticsResult<TrendAnalysis> {
        trend::trend_analysis(series, &self.config)
    }

    /// See [`insights::generate_insights`]
    pub fn generate_insights(&self, series: &NamedSeries) -> AnalyticsResult<Vec<AutomatedInsight>> {
        insights::generate_insights(series, &self.config)
    }
}

/// Thread-safe engine for long-lived shared use.
#[derive(Debug, Default)]
pub struct SharedAnalyticsEngine {
    config: RwLock<AnalyticsConfig>,
}

impl SharedAnalyticsEngine {
    /// Shared engine with the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared engine with a validated configuration
    pub fn with_config(config: AnalyticsConfig) -> AnalyticsResult<Self> {
        config.validate()?;
        Ok(Self {
            config: RwLock::new(config),
        })
    }

    /// Copy of the current configuration
    pub fn snapshot(&self) -> AnalyticsConfig {
        self.config.read().clone()
    }

    /// Merge `update` into the configuration under the write lock.
    pub fn configure(&self, update: AnalyticsConfigUpdate) -> AnalyticsResult<AnalyticsConfig> {
        let mut guard = self.config.write();
        let next = guard.merged(&update)?;
        log::debug!("shared analytics configuration updated: {:?}", next);
        *guard = next.clone();
        Ok(next)
    }

    /// See [`hypothesis_tests::t_test`]
    pub fn t_test(
        &self,
        sample1: &[f64],
        sample2: Option<&[f64]>,
        mode: TestMode,
        hypothesized_mean: Option<f64>,
    ) -> AnalyticsResult<StatisticalTest> {
        hypothesis_tests::t_test(sample1, sample2, mode, hypothesized_mean, &self.snapshot())
    }

    /// See [`hypothesis_tests::chi_square_test`]
    pub fn chi_square_test(
        &self,
        observed: &[f64],
        expected: Option<&[f64]>,
    ) -> AnalyticsResult<StatisticalTest> {
        hypothesis_tests::chi_square_test(observed, expected, &self.snapshot())
    }

    /// See [`correlation::correlation_analysis`]
    pub fn correlation_analysis(
        &self,
        x: &[f64],
        y: &[f64],
        method: CorrelationMethod,
    ) -> AnalyticsResult<CorrelationAnalysis> {
        correlation::correlation_analysis(x, y, method, &self.snapshot())
    }

    /// See [`correlation::pairwise_correlations`]
    pub fn pairwise_correlations(
        &self,
        series: &NamedSeries,
        method: CorrelationMethod,
    ) -> AnalyticsResult<Vec<PairwiseCorrelation>> {
        correlation::pairwise_correlations(series, method, &self.snapshot())
    }

    /// See [`regression::multiple_regression`]
    pub fn multiple_regression(
        &self,
        y: &[f64],
        x_rows: &[Vec<f64>],
    ) -> AnalyticsResult<RegressionResult> {
        regression::multiple_regression(y, x_rows, &self.snapshot())
    }

    /// See [`regression::simple_regression`]
    pub fn simple_regression(&self, x: &[f64], y: &[f64]) -> AnalyticsResult<RegressionResult> {
        regression::simple_regression(x, y, &self.snapshot())
    }

    /// See [`trend::trend_analysis`]
    pub fn trend_analysis(&self, series: &[f64]) -> AnalyticsResult<TrendAnalysis> {
        trend::trend_analysis(series, &self.snapshot())
    }

    /// See [`insights::generate_insights`]
    pub fn generate_insights(&self, series: &NamedSeries) -> AnalyticsResult<Vec<AutomatedInsight>> {
        insights::generate_insights(series, &self.snapshot())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AnalyticsError;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_rejected_update_keeps_previous_config() {
        let mut engine = AnalyticsEngine::new();
        engine
            .configure(AnalyticsConfigUpdate::significance_level(0.01))
            .unwrap();
        let err = engine
            .configure(AnalyticsConfigUpdate::significance_level(1.5))
            .unwrap_err();
        assert!(matches!(err, AnalyticsError::InvalidParameter { .. }));
        assert_eq!(engine.config().significance_level, 0.01);
    }

    #[test]
    fn test_with_config_validates() {
        let bad = AnalyticsConfig {
            tolerance: 0.0,
            ..AnalyticsConfig::default()
        };
        assert!(AnalyticsEngine::with_config(bad.clone()).is_err());
        assert!(SharedAnalyticsEngine::with_config(bad).is_err());
    }

    #[test]
    fn test_shared_engine_across_threads() {
        let engine = Arc::new(SharedAnalyticsEngine::new());
        let x = [1.0, 2.0, 3.0, 4.0, 5.0];
        let y = [2.0, 4.1, 5.9, 8.2, 9.9];
        let baseline = engine
            .correlation_analysis(&x, &y, CorrelationMethod::Pearson)
            .unwrap();

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let engine = Arc::clone(&engine);
                thread::spawn(move || {
                    if i % 2 == 0 {
                        engine
                            .configure(AnalyticsConfigUpdate::significance_level(0.01))
                            .unwrap();
                    }
                    engine
                        .correlation_analysis(&x, &y, CorrelationMethod::Pearson)
                        .unwrap()
                })
            })
            .collect();

        for handle in handles {
            let result = handle.join().unwrap();
            assert_eq!(result.coefficient, baseline.coefficient);
            assert_eq!(result.p_value, baseline.p_value);
        }
        assert_eq!(engine.snapshot().significance_level, 0.01);
    }
}
