//! Automated insight synthesis over a named-series dataset.
//!
//! Runs pairwise Pearson correlation, per-series trend analysis and a
//! first-half versus second-half comparison, keeps the findings worth
//! reporting, grades them and renders their text through [`crate::narrative`].

use crate::config::AnalyticsConfig;
use crate::correlation::{
    pairwise_correlations, CorrelationAnalysis, CorrelationMethod, CorrelationStrength,
};
use crate::distributions::normal_two_tailed_p_value;
use crate::errors::{validate_all_finite, AnalyticsResult};
use crate::hypothesis_tests::{t_test, StatisticalTest, TestMode};
use crate::math_utils::mean;
use crate::narrative::{self, InsightText};
use crate::trend::{trend_analysis, TrendAnalysis, TrendDirection};
use crate::NamedSeries;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// |r| at or above which a correlation is reported even when not significant.
const NOTABLE_CORRELATION: f64 = 0.5;
/// Relative change at or above which a highly significant trend is graded high.
const MATERIAL_TREND_CHANGE: f64 = 0.2;

/// Analysis family an insight comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum InsightType {
    /// Pairwise relationship
    Correlation,
    /// Trend, seasonality or change point
    Trend,
    /// Anomalous observations
    Anomaly,
    /// Hypothesis test result
    Test,
}

impl InsightType {
    fn key(self) -> &'static str {
        match self {
            InsightType::Correlation => "correlation",
            InsightType::Trend => "trend",
            InsightType::Anomaly => "anomaly",
            InsightType::Test => "test",
        }
    }
}

/// Importance tier, ordered low < medium < high.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum InsightSignificance {
    /// Worth noting
    Low,
    /// Worth acting on
    Medium,
    /// Act now
    High,
}

/// One ranked, human-readable finding.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct AutomatedInsight {
    /// Stable identifier, `type:category:series...`
    pub id: String,
    /// Analysis family
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub insight_type: InsightType,
    /// Finer grouping within the type
    pub category: String,
    /// Headline
    pub title: String,
    /// Explanation
    pub description: String,
    /// Confidence in [0, 1]
    pub confidence: f64,
    /// Importance tier
    pub significance: InsightSignificance,
    /// Statistics backing the finding
    pub supporting_evidence: Vec<String>,
    /// Suggested follow-ups
    pub recommendations: Vec<String>,
    /// Medium or high significance with at least one recommendation
    pub actionable: bool,
    /// Series the insight is about
    pub series: Vec<String>,
}

impl AutomatedInsight {
    fn new(
        insight_type: InsightType,
        category: &str,
        series: Vec<String>,
        confidence: f64,
        significance: InsightSignificance,
        text: InsightText,
    ) -> Self {
        let id = std::iter::once(insight_type.key())
            .chain(std::iter::once(category))
            .chain(series.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(":");
        let actionable =
            significance >= InsightSignificance::Medium && !text.recommendations.is_empty();
        Self {
            id,
            insight_type,
            category: category.to_string(),
            title: text.title,
            description: text.description,
            confidence: clamp_unit(confidence),
            significance,
            supporting_evidence: text.supporting_evidence,
            recommendations: text.recommendations,
            actionable,
            series,
        }
    }
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Generate ranked insights for a dataset of named series.
///
/// Series that cannot be analysed on their own (empty, or too short for a
/// comparison) are skipped; non-finite values anywhere are an error.
///
/// # Example
/// ```rust
/// use std::collections::BTreeMap;
/// use insight_analytics::{generate_insights, AnalyticsConfig, InsightType};
///
/// let mut data = BTreeMap::new();
/// data.insert("sales".to_string(), vec![100.0, 110.0, 120.0, 130.0, 140.0]);
/// data.insert("advertising".to_string(), vec![10.0, 11.0, 12.0, 13.0, 14.0]);
///
/// let insights = generate_insights(&data, &AnalyticsConfig::default()).unwrap();
/// assert!(insights.iter().any(|i| i.insight_type == InsightType::Correlation));
/// ```
pub fn generate_insights(
    series: &NamedSeries,
    config: &AnalyticsConfig,
) -> AnalyticsResult<Vec<AutomatedInsight>> {
    for (name, values) in series {
        validate_all_finite(values, name)?;
    }

    let mut insights = Vec::new();

    for pair in pairwise_correlations(series, CorrelationMethod::Pearson, config)? {
        match correlation_insight(&pair.first, &pair.second, &pair.analysis, config) {
            Some(insight) => insights.push(insight),
            None => log::debug!(
                "correlation {} / {} not reported (r = {:.3}, p = {:.4})",
                pair.first,
                pair.second,
                pair.analysis.coefficient,
                pair.analysis.p_value
            ),
        }
    }

    for (name, values) in series {
        match trend_analysis(values, config) {
            Ok(analysis) => insights.extend(trend_insights(name, values, &analysis, config)),
            Err(e) if e.is_validation() => {
                log::debug!("skipping trend insights for {}: {}", name, e)
            }
            Err(e) => return Err(e),
        }

        if values.len() >= 2 * config.min_trend_length {
            let half = values.len() / 2;
            let (first, second) = values.split_at(half);
            match t_test(first, Some(second), TestMode::TwoSample, None, config) {
                Ok(test) if test.is_significant => {
                    insights.push(period_comparison_insight(name, first, second, &test, config))
                }
                Ok(_) => log::debug!("no significant level change between halves of {}", name),
                Err(e) if e.is_validation() => {
                    log::debug!("skipping period comparison for {}: {}", name, e)
                }
                Err(e) => return Err(e),
            }
        }
    }

    rank(&mut insights);
    Ok(insights)
}

/// Descending significance, then descending confidence, then id.
fn rank(insights: &mut [AutomatedInsight]) {
    insights.sort_by(|a, b| {
        b.significance
            .cmp(&a.significance)
            .then_with(|| b.confidence.total_cmp(&a.confidence))
            .then_with(|| a.id.cmp(&b.id))
    });
}

fn correlation_tier(analysis: &CorrelationAnalysis, config: &AnalyticsConfig) -> InsightSignificance {
    if analysis.is_significant && analysis.strength == CorrelationStrength::VeryStrong {
        InsightSignificance::High
    } else if analysis.is_significant || analysis.p_value < 2.0 * config.significance_level {
        InsightSignificance::Medium
    } else {
        InsightSignificance::Low
    }
}

fn correlation_insight(
    first: &str,
    second: &str,
    analysis: &CorrelationAnalysis,
    config: &AnalyticsConfig,
) -> Option<AutomatedInsight> {
    if !analysis.is_significant && analysis.coefficient.abs() < NOTABLE_CORRELATION {
        return None;
    }
    Some(AutomatedInsight::new(
        InsightType::Correlation,
        "relationship",
        vec![first.to_string(), second.to_string()],
        1.0 - analysis.p_value,
        correlation_tier(analysis, config),
        narrative::correlation_text(first, second, analysis),
    ))
}

fn trend_insights(
    name: &str,
    values: &[f64],
    analysis: &TrendAnalysis,
    config: &AnalyticsConfig,
) -> Vec<AutomatedInsight> {
    let mut insights = Vec::new();
    let series = || vec![name.to_string()];

    if analysis.trend != TrendDirection::Stable {
        let material = analysis
            .relative_change
            .map_or(false, |c| c.abs() >= MATERIAL_TREND_CHANGE);
        let tier = if analysis.slope_p_value < config.significance_level / 10.0 && material {
            InsightSignificance::High
        } else {
            InsightSignificance::Medium
        };
        insights.push(AutomatedInsight::new(
            InsightType::Trend,
            "trend",
            series(),
            analysis.strength,
            tier,
            narrative::trend_text(name, analysis, values.len()),
        ));
    }

    if let Some(seasonality) = &analysis.seasonality {
        let z = seasonality.autocorrelation * (values.len() as f64).sqrt();
        insights.push(AutomatedInsight::new(
            InsightType::Trend,
            "seasonality",
            series(),
            1.0 - normal_two_tailed_p_value(z),
            InsightSignificance::Medium,
            narrative::seasonality_text(name, seasonality),
        ));
    }

    if !analysis.change_points.is_empty() {
        // Every reported change point scored above the threshold
        insights.push(AutomatedInsight::new(
            InsightType::Trend,
            "change_point",
            series(),
            1.0 - normal_two_tailed_p_value(config.change_point_threshold),
            InsightSignificance::Medium,
            narrative::change_point_text(name, &analysis.change_points),
        ));
    }

    let anomalies = &analysis.anomalies;
    if !anomalies.indices.is_empty() {
        let max_score = anomalies.scores.iter().fold(0.0, |acc: f64, z| acc.max(z.abs()));
        let tier = if max_score >= 2.0 * anomalies.threshold {
            InsightSignificance::High
        } else {
            InsightSignificance::Medium
        };
        insights.push(AutomatedInsight::new(
            InsightType::Anomaly,
            "outlier",
            series(),
            1.0 - normal_two_tailed_p_value(max_score),
            tier,
            narrative::anomaly_text(name, &anomalies.indices, &anomalies.scores, values),
        ));
    }

    insights
}

fn period_comparison_insight(
    name: &str,
    first: &[f64],
    second: &[f64],
    test: &StatisticalTest,
    config: &AnalyticsConfig,
) -> AutomatedInsight {
    let tier = if test.p_value < config.significance_level / 10.0 {
        InsightSignificance::High
    } else {
        InsightSignificance::Medium
    };
    AutomatedInsight::new(
        InsightType::Test,
        "period_comparison",
        vec![name.to_string()],
        1.0 - test.p_value,
        tier,
        narrative::period_comparison_text(
            name,
            mean(first),
            mean(second),
            test.statistic,
            test.degrees_of_freedom,
            test.p_value,
        ),
    )
}
