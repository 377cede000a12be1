//! # Insight Analytics
//!
//! Statistical analytics engine for marketing and sales metrics.
//!
//! The crate takes named business-metric series (revenue, ad spend, visits,
//! ...) and produces hypothesis-test results, correlation analyses,
//! regression models, trend/forecast/anomaly reports and ranked
//! natural-language insights. It performs no I/O: every operation is a pure
//! function of its input and an [`AnalyticsConfig`].
//!
//! ## Key Features
//!
//! - **Hypothesis Testing**: one-sample, Welch two-sample and paired t-tests; chi-square goodness of fit
//! - **Correlation**: Pearson, Spearman and Kendall with p-values and confidence intervals
//! - **Regression**: Householder-QR least squares with coefficient inference and outlier flags
//! - **Trend & Forecasting**: trend direction, seasonality, change points, anomalies and prediction intervals
//! - **Automated Insights**: ranked findings with evidence and recommendations
//!
//! ## Quick Start
//!
//! ```rust
//! use std::collections::BTreeMap;
//! use insight_analytics::{AnalyticsEngine, InsightSignificance};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = AnalyticsEngine::new();
//!
//!     let mut data = BTreeMap::new();
//!     data.insert("sales".to_string(), vec![100.0, 110.0, 120.0, 130.0, 140.0]);
//!     data.insert("advertising".to_string(), vec![10.0, 11.0, 12.0, 13.0, 14.0]);
//!
//!     for insight in engine.generate_insights(&data)? {
//!         if insight.significance == InsightSignificance::High {
//!             println!("{} ({:.0}% confidence)", insight.title, insight.confidence * 100.0);
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! `significance_level` drives every `is_significant` flag and
//! `confidence_level` every interval; they are independent. Changing either
//! never changes a statistic, coefficient or p-value.
//!
//! ## Cargo features
//!
//! - `serde` (default): `Serialize`/`Deserialize` on every result type, camelCase JSON
//! - `parallel`: pairwise correlations computed with rayon

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod correlation;
pub mod distributions;
pub mod engine;
pub mod errors;
pub mod hypothesis_tests;
pub mod insights;
pub mod linear_algebra;
pub mod math_utils;
pub mod narrative;
pub mod regression;
pub mod trend;

use std::collections::BTreeMap;

/// Named numeric series, iterated in name order.
pub type NamedSeries = BTreeMap<String, Vec<f64>>;

pub use config::{AnalyticsConfig, AnalyticsConfigUpdate};
pub use correlation::{
    correlation_analysis, pairwise_correlations, ConfidenceInterval, CorrelationAnalysis,
    CorrelationDirection, CorrelationMethod, CorrelationStrength, PairwiseCorrelation,
};
pub use engine::{AnalyticsEngine, SharedAnalyticsEngine};
pub use errors::{AnalyticsError, AnalyticsResult, ErrorKind};
pub use hypothesis_tests::{chi_square_test, t_test, StatisticalTest, TestKind, TestMode};
pub use insights::{generate_insights, AutomatedInsight, InsightSignificance, InsightType};
pub use regression::{multiple_regression, simple_regression, RegressionKind, RegressionResult};
pub use trend::{
    trend_analysis, Anomalies, Forecast, ForecastInterval, Seasonality, TrendAnalysis,
    TrendDirection,
};
