//! Text rendering for analysis results.
//!
//! Every human-readable string the engine produces is built here: test
//! interpretations, regression equations and the title, description,
//! evidence and recommendations of automated insights. The numeric modules
//! never format prose themselves, so their contracts can be tested without
//! depending on wording.

use crate::correlation::{CorrelationAnalysis, CorrelationDirection, CorrelationStrength};
use crate::hypothesis_tests::TestKind;
use crate::trend::{Seasonality, TrendAnalysis, TrendDirection};

/// Name fragments that mark a series as a controllable input (spend-like).
const DRIVER_KEYWORDS: &[&str] = &[
    "spend",
    "cost",
    "budget",
    "advertising",
    "ads",
    "marketing",
    "campaign",
    "impressions",
    "clicks",
];

/// Format a number for display: at most four decimals, trailing zeros trimmed.
pub fn format_number(value: f64) -> String {
    if !value.is_finite() {
        return if value.is_nan() {
            "NaN".to_string()
        } else if value > 0.0 {
            "inf".to_string()
        } else {
            "-inf".to_string()
        };
    }
    let text = format!("{:.4}", value);
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text == "-0" || text.is_empty() {
        "0".to_string()
    } else {
        text.to_string()
    }
}

/// `p < 0.001` or `p = 0.0123`
pub fn format_p_value(p: f64) -> String {
    if p < 0.001 {
        "p < 0.001".to_string()
    } else {
        format!("p = {:.4}", p)
    }
}

fn format_df(df: f64) -> String {
    if df.fract() == 0.0 {
        format!("{}", df as i64)
    } else {
        format!("{:.2}", df)
    }
}

fn percent(value: f64) -> String {
    format!("{:.0}%", value * 100.0)
}

/// Interpretation sentence for a hypothesis test.
pub fn interpret_test(
    kind: TestKind,
    statistic: f64,
    degrees_of_freedom: f64,
    p_value: f64,
    significance_level: f64,
) -> String {
    let symbol = match kind {
        TestKind::ChiSquareGoodnessOfFit => "χ²",
        _ => "t",
    };
    let outcome = if p_value < significance_level {
        match kind {
            TestKind::ChiSquareGoodnessOfFit => {
                "the observed frequencies differ significantly from the expected distribution"
            }
            TestKind::OneSampleT => "the sample mean differs significantly from the hypothesized mean",
            TestKind::WelchT => "the two sample means differ significantly",
            TestKind::PairedT => "the paired measurements differ significantly on average",
        }
    } else {
        match kind {
            TestKind::ChiSquareGoodnessOfFit => {
                "the observed frequencies are consistent with the expected distribution"
            }
            _ => "there is no significant difference",
        }
    };
    format!(
        "{}: {} = {}, df = {}, {}; at α = {} {}.",
        kind.label(),
        symbol,
        format_number(statistic),
        format_df(degrees_of_freedom),
        format_p_value(p_value),
        significance_level,
        outcome
    )
}

/// Render `y = b0 + b1*x1 - b2*x2 ...` with display rounding.
pub fn render_equation(coefficients: &[f64]) -> String {
    let mut equation = String::from("y = ");
    match coefficients.first() {
        Some(&intercept) => equation.push_str(&format_number(intercept)),
        None => equation.push('0'),
    }
    for (i, &b) in coefficients.iter().enumerate().skip(1) {
        let sign = if b < 0.0 { '-' } else { '+' };
        equation.push_str(&format!(" {} {}*x{}", sign, format_number(b.abs()), i));
    }
    equation
}

/// Whether a series name looks like a controllable input (spend, clicks, ...).
pub fn is_driver_series(name: &str) -> bool {
    let lower = name.to_lowercase();
    DRIVER_KEYWORDS.iter().any(|k| lower.contains(k))
}

/// Order a pair as (input, outcome) when exactly one side is spend-like.
fn driver_and_outcome<'a>(first: &'a str, second: &'a str) -> Option<(&'a str, &'a str)> {
    match (is_driver_series(first), is_driver_series(second)) {
        (true, false) => Some((first, second)),
        (false, true) => Some((second, first)),
        _ => None,
    }
}

/// Rendered text of one insight.
#[derive(Debug, Clone, Default)]
pub struct InsightText {
    /// Short headline
    pub title: String,
    /// One or two sentences
    pub description: String,
    /// Statistics backing the finding
    pub supporting_evidence: Vec<String>,
    /// Suggested follow-ups
    pub recommendations: Vec<String>,
}

/// Text for a pairwise correlation.
pub fn correlation_text(first: &str, second: &str, analysis: &CorrelationAnalysis) -> InsightText {
    let direction = match analysis.direction {
        CorrelationDirection::Positive => "positive",
        CorrelationDirection::Negative => "negative",
        CorrelationDirection::None => "no",
    };
    let title = format!(
        "{} {} correlation between {} and {}",
        capitalize(analysis.strength.label()),
        direction,
        first,
        second
    );

    let movement = match analysis.direction {
        CorrelationDirection::Positive => "tends to rise as well",
        CorrelationDirection::Negative => "tends to fall",
        CorrelationDirection::None => "shows no consistent response",
    };
    let description = format!(
        "{} and {} move together: {} r = {} ({}, n = {}). As {} rises, {} {}.",
        first,
        second,
        analysis.method.label(),
        format!("{:.3}", analysis.coefficient),
        format_p_value(analysis.p_value),
        analysis.sample_size,
        first,
        second,
        movement
    );

    let shared = analysis.coefficient * analysis.coefficient;
    let supporting_evidence = vec![
        format!("{} r = {:.3}", analysis.method.label(), analysis.coefficient),
        format!(
            "{} ({})",
            format_p_value(analysis.p_value),
            if analysis.is_significant {
                "statistically significant"
            } else {
                "not statistically significant"
            }
        ),
        format!(
            "{} confidence interval for r: [{:.3}, {:.3}]",
            percent(analysis.confidence_interval.level),
            analysis.confidence_interval.lower,
            analysis.confidence_interval.upper
        ),
        format!("n = {} paired observations", analysis.sample_size),
        format!(
            "r² = {:.3}: {:.1}% of the variance in {} is shared with {}",
            shared,
            shared * 100.0,
            second,
            first
        ),
    ];

    let mut recommendations = Vec::new();
    if !analysis.is_significant {
        recommendations.push(format!(
            "Collect more observations before acting on the relationship between {} and {}.",
            first, second
        ));
    } else if analysis.strength >= CorrelationStrength::Strong {
        match (analysis.direction, driver_and_outcome(first, second)) {
            (CorrelationDirection::Positive, Some((input, outcome))) => {
                recommendations.push(format!(
                    "Consider increasing {} to lift {}; validate the effect with a controlled test before reallocating budget.",
                    input, outcome
                ));
                recommendations.push(format!(
                    "Track the marginal return of {} on {} to detect diminishing returns.",
                    input, outcome
                ));
            }
            (CorrelationDirection::Negative, Some((input, outcome))) => {
                recommendations.push(format!(
                    "Review {}: higher {} coincides with lower {}; check targeting and saturation.",
                    input, input, outcome
                ));
            }
            _ => {
                recommendations.push(format!(
                    "Investigate whether {} drives {} (or the reverse) with an experiment before treating the link as causal.",
                    first, second
                ));
                recommendations.push(format!(
                    "Use {} as a leading indicator when forecasting {}.",
                    first, second
                ));
            }
        }
    } else {
        recommendations.push(format!(
            "Monitor the {} relationship between {} and {}; it is real but explains little of the variation.",
            analysis.strength.label(),
            first,
            second
        ));
    }

    InsightText {
        title,
        description,
        supporting_evidence,
        recommendations,
    }
}

/// Text for a non-stable trend.
pub fn trend_text(name: &str, analysis: &TrendAnalysis, observations: usize) -> InsightText {
    let (word, verb) = match analysis.trend {
        TrendDirection::Increasing => ("upward", "grew"),
        TrendDirection::Decreasing => ("downward", "declined"),
        TrendDirection::Stable => ("flat", "held steady"),
    };
    let title = format!("{} is trending {}", name, word);

    let change = analysis
        .relative_change
        .map(|c| format!(" by {:+.1}% of its typical level", c * 100.0))
        .unwrap_or_default();
    let description = format!(
        "{} {}{} over {} observations (slope {} per period, {}).",
        name,
        verb,
        change,
        observations,
        format_number(analysis.slope),
        format_p_value(analysis.slope_p_value)
    );

    let mut supporting_evidence = vec![
        format!("Slope = {} per period", format_number(analysis.slope)),
        format!("Slope significance: {}", format_p_value(analysis.slope_p_value)),
        format!("Linear fit r² = {:.3}", analysis.r_squared),
    ];
    if let (Some(value), Some(interval)) = (
        analysis.forecast.values.first(),
        analysis.forecast.confidence_intervals.first(),
    ) {
        supporting_evidence.push(format!(
            "Next-period forecast: {} ({} interval {} to {})",
            format_number(*value),
            percent(analysis.forecast.level),
            format_number(interval.lower),
            format_number(interval.upper)
        ));
    }

    let recommendations = match (analysis.trend, is_driver_series(name)) {
        (TrendDirection::Increasing, true) => vec![format!(
            "Confirm that the rising {} is producing proportional returns.",
            name
        )],
        (TrendDirection::Increasing, false) => vec![format!(
            "Plan targets and capacity around the continued growth in {}.",
            name
        )],
        (TrendDirection::Decreasing, true) => vec![format!(
            "Check whether the reduction in {} is intentional and how it affects downstream results.",
            name
        )],
        (TrendDirection::Decreasing, false) => vec![
            format!(
                "Investigate the drivers behind the decline in {} and consider corrective action.",
                name
            ),
            format!("Set an alert if {} falls below the forecast interval.", name),
        ],
        (TrendDirection::Stable, _) => Vec::new(),
    };

    InsightText {
        title,
        description,
        supporting_evidence,
        recommendations,
    }
}

/// Text for a detected seasonal cycle.
pub fn seasonality_text(name: &str, seasonality: &Seasonality) -> InsightText {
    InsightText {
        title: format!(
            "{} shows a repeating cycle every {} periods",
            name, seasonality.period
        ),
        description: format!(
            "The detrended values of {} correlate with themselves at a lag of {} periods (autocorrelation {:.3}).",
            name, seasonality.period, seasonality.autocorrelation
        ),
        supporting_evidence: vec![
            format!("Dominant lag = {}", seasonality.period),
            format!("Autocorrelation at lag {} = {:.3}", seasonality.period, seasonality.autocorrelation),
        ],
        recommendations: vec![format!(
            "Align campaign timing and reporting windows with the {}-period cycle in {}.",
            seasonality.period, name
        )],
    }
}

/// Text for change points.
pub fn change_point_text(name: &str, change_points: &[usize]) -> InsightText {
    let list = join_indices(change_points);
    InsightText {
        title: format!("Shift detected in {}", name),
        description: format!(
            "The level or volatility of {} changed at index {}.",
            name, list
        ),
        supporting_evidence: vec![format!(
            "{} change point(s) at index {}",
            change_points.len(),
            list
        )],
        recommendations: vec![format!(
            "Check for campaign launches, pricing changes or tracking changes around index {} of {}.",
            list, name
        )],
    }
}

/// Text for anomalies; `values` is the analysed series.
pub fn anomaly_text(name: &str, indices: &[usize], scores: &[f64], values: &[f64]) -> InsightText {
    let supporting_evidence = indices
        .iter()
        .zip(scores)
        .map(|(&i, &z)| {
            let value = values.get(i).copied().unwrap_or(f64::NAN);
            format!("Index {}: value {}, z = {:.2}", i, format_number(value), z)
        })
        .collect();

    let list = join_indices(indices);
    InsightText {
        title: format!("{} anomalous value(s) in {}", indices.len(), name),
        description: format!(
            "{} deviates sharply from its expected path at index {}.",
            name, list
        ),
        supporting_evidence,
        recommendations: vec![
            format!(
                "Investigate index {} of {} for data-quality issues or one-off events.",
                list, name
            ),
            "Exclude confirmed data errors before using the series for forecasting.".to_string(),
        ],
    }
}

/// Text for a first-half versus second-half comparison.
pub fn period_comparison_text(
    name: &str,
    first_mean: f64,
    second_mean: f64,
    statistic: f64,
    degrees_of_freedom: f64,
    p_value: f64,
) -> InsightText {
    let moved = if second_mean > first_mean { "rose" } else { "fell" };
    InsightText {
        title: format!("{} {} between the first and second half of the period", name, moved),
        description: format!(
            "The average of {} {} from {} to {} (Welch t = {}, df = {}, {}).",
            name,
            moved,
            format_number(first_mean),
            format_number(second_mean),
            format_number(statistic),
            format_df(degrees_of_freedom),
            format_p_value(p_value)
        ),
        supporting_evidence: vec![
            format!("First-half mean = {}", format_number(first_mean)),
            format!("Second-half mean = {}", format_number(second_mean)),
            format!("Welch t = {}, {}", format_number(statistic), format_p_value(p_value)),
        ],
        recommendations: vec![format!(
            "Identify what changed between the two halves of the {} history and whether it should be repeated or reversed.",
            name
        )],
    }
}

fn join_indices(indices: &[usize]) -> String {
    indices
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
