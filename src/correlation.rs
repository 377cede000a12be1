//! Correlation analysis between paired metric series.
//!
//! Pearson, Spearman (average ranks) and Kendall tau-a coefficients with
//! significance tests and confidence intervals, plus pairwise correlation over
//! a named dataset.

use crate::config::AnalyticsConfig;
use crate::distributions::{normal_quantile, normal_two_tailed_p_value, t_two_tailed_p_value};
use crate::errors::{
    validate_all_finite, validate_data_length, validate_equal_length, AnalyticsError,
    AnalyticsResult,
};
use crate::math_utils::{
    average_ranks, constants, is_effectively_constant, mean, tie_group_sizes,
};
use crate::NamedSeries;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Correlation coefficient to compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum CorrelationMethod {
    /// Product-moment correlation
    #[default]
    Pearson,
    /// Pearson correlation of average ranks
    Spearman,
    /// Kendall's tau-a
    Kendall,
}

impl CorrelationMethod {
    /// Display name
    pub fn label(self) -> &'static str {
        match self {
            CorrelationMethod::Pearson => "Pearson",
            CorrelationMethod::Spearman => "Spearman",
            CorrelationMethod::Kendall => "Kendall",
        }
    }
}

/// Sign of the coefficient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum CorrelationDirection {
    /// r > 0
    Positive,
    /// r < 0
    Negative,
    /// r = 0
    None,
}

/// Magnitude bucket of |r|, ordered from weakest to strongest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum CorrelationStrength {
    /// |r| < 0.1
    None,
    /// 0.1 ≤ |r| < 0.3
    Weak,
    /// 0.3 ≤ |r| < 0.5
    Moderate,
    /// 0.5 ≤ |r| < 0.7
    Strong,
    /// |r| ≥ 0.7
    VeryStrong,
}

impl CorrelationStrength {
    /// Bucket a coefficient by magnitude.
    pub fn from_coefficient(r: f64) -> Self {
        match r.abs() {
            a if a < 0.1 => CorrelationStrength::None,
            a if a < 0.3 => CorrelationStrength::Weak,
            a if a < 0.5 => CorrelationStrength::Moderate,
            a if a < 0.7 => CorrelationStrength::Strong,
            _ => CorrelationStrength::VeryStrong,
        }
    }

    /// Lower-case display name
    pub fn label(self) -> &'static str {
        match self {
            CorrelationStrength::None => "no",
            CorrelationStrength::Weak => "weak",
            CorrelationStrength::Moderate => "moderate",
            CorrelationStrength::Strong => "strong",
            CorrelationStrength::VeryStrong => "very strong",
        }
    }
}

/// Two-sided confidence interval.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ConfidenceInterval {
    /// Lower bound
    pub lower: f64,
    /// Upper bound
    pub upper: f64,
    /// Confidence level, e.g. 0.95
    pub level: f64,
}

/// Result of a correlation analysis.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct CorrelationAnalysis {
    /// Coefficient computed
    pub method: CorrelationMethod,
    /// Coefficient in [-1, 1]
    pub coefficient: f64,
    /// Two-tailed p-value against zero correlation
    pub p_value: f64,
    /// p_value < significance_level
    pub is_significant: bool,
    /// Sign of the coefficient
    pub direction: CorrelationDirection,
    /// Magnitude bucket
    pub strength: CorrelationStrength,
    /// Interval for the coefficient at `confidence_level`
    pub confidence_interval: ConfidenceInterval,
    /// Number of paired observations
    pub sample_size: usize,
}

/// Correlation between two named series.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct PairwiseCorrelation {
    /// Name that sorts first
    pub first: String,
    /// Name that sorts second
    pub second: String,
    /// Correlation of `first` with `second`
    pub analysis: CorrelationAnalysis,
}

/// Correlate two paired series.
///
/// # Errors
/// - `InsufficientData` for fewer than 3 pairs
/// - `LengthMismatch` when the series differ in length
/// - `NonFiniteInput` for NaN or infinite values
/// - `InvalidInput` when either series has zero variance
///
/// # Example
/// ```rust
/// use insight_analytics::{correlation_analysis, AnalyticsConfig, CorrelationMethod};
///
/// let spend = [1.0, 2.0, 3.0, 4.0, 5.0];
/// let revenue = [2.0, 4.0, 6.0, 8.0, 10.0];
/// let result = correlation_analysis(&spend, &revenue, CorrelationMethod::Pearson, &AnalyticsConfig::default()).unwrap();
/// assert!((result.coefficient - 1.0).abs() < 1e-10);
/// assert!(result.is_significant);
/// ```
pub fn correlation_analysis(
    x: &[f64],
    y: &[f64],
    method: CorrelationMethod,
    config: &AnalyticsConfig,
) -> AnalyticsResult<CorrelationAnalysis> {
    validate_all_finite(x, "x")?;
    validate_all_finite(y, "y")?;
    validate_equal_length(x, y)?;
    validate_data_length(x, 3)?;
    for (name, data) in [("x", x), ("y", y)] {
        if is_effectively_constant(data, config.tolerance) {
            return Err(AnalyticsError::InvalidInput {
                reason: format!("{} has zero variance", name),
            });
        }
    }

    let n = x.len();
    let (coefficient, p_value, std_error) = match method {
        CorrelationMethod::Pearson => {
            let r = pearson(x, y);
            (r, pearson_p_value(r, n)?, fisher_std_error(n))
        }
        CorrelationMethod::Spearman => {
            let r = pearson(&average_ranks(x), &average_ranks(y));
            (r, pearson_p_value(r, n)?, fisher_std_error(n))
        }
        CorrelationMethod::Kendall => {
            let (tau, p) = kendall(x, y, config);
            let se = (n > 4).then(|| (0.437 / (n - 4) as f64).sqrt());
            (tau, p, se)
        }
    };

    Ok(CorrelationAnalysis {
        method,
        coefficient,
        p_value,
        is_significant: config.is_significant(p_value),
        direction: direction_of(coefficient),
        strength: CorrelationStrength::from_coefficient(coefficient),
        confidence_interval: fisher_interval(coefficient, std_error, config.confidence_level),
        sample_size: n,
    })
}

/// Correlate every unordered pair of a named dataset, in name order.
///
/// Pairs that cannot be correlated (different lengths, fewer than 3 points,
/// a constant series) are skipped. Non-finite values anywhere in the dataset
/// are an error.
pub fn pairwise_correlations(
    series: &NamedSeries,
    method: CorrelationMethod,
    config: &AnalyticsConfig,
) -> AnalyticsResult<Vec<PairwiseCorrelation>> {
    for (name, values) in series {
        validate_all_finite(values, name)?;
    }

    let entries: Vec<(&String, &Vec<f64>)> = series.iter().collect();
    let pairs: Vec<(usize, usize)> = (0..entries.len())
        .flat_map(|i| (i + 1..entries.len()).map(move |j| (i, j)))
        .collect();

    let correlate = |&(i, j): &(usize, usize)| -> AnalyticsResult<Option<PairwiseCorrelation>> {
        let (first, x) = entries[i];
        let (second, y) = entries[j];
        match correlation_analysis(x, y, method, config) {
            Ok(analysis) => Ok(Some(PairwiseCorrelation {
                first: first.clone(),
                second: second.clone(),
                analysis,
            })),
            Err(e) if e.is_validation() => {
                log::debug!("skipping correlation {} / {}: {}", first, second, e);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    };

    #[cfg(feature = "parallel")]
    let results = {
        use rayon::prelude::*;
        pairs
            .par_iter()
            .map(correlate)
            .collect::<Result<Vec<_>, _>>()?
    };
    #[cfg(not(feature = "parallel"))]
    let results = pairs
        .iter()
        .map(correlate)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(results.into_iter().flatten().collect())
}

fn direction_of(r: f64) -> CorrelationDirection {
    if r > constants::DEFAULT_EPSILON {
        CorrelationDirection::Positive
    } else if r < -constants::DEFAULT_EPSILON {
        CorrelationDirection::Negative
    } else {
        CorrelationDirection::None
    }
}

fn pearson(x: &[f64], y: &[f64]) -> f64 {
    let mx = mean(x);
    let my = mean(y);
    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (xi, yi) in x.iter().zip(y) {
        let dx = xi - mx;
        let dy = yi - my;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    (sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0)
}

/// t = r√(n−2)/√(1−r²) at df = n − 2; a perfect correlation has p = 0.
fn pearson_p_value(r: f64, n: usize) -> AnalyticsResult<f64> {
    let one_minus_r2 = 1.0 - r * r;
    if one_minus_r2 <= constants::DEFAULT_EPSILON {
        return Ok(0.0);
    }
    let df = (n - 2) as f64;
    let t = r * df.sqrt() / one_minus_r2.sqrt();
    t_two_tailed_p_value(t, df)
}

fn fisher_std_error(n: usize) -> Option<f64> {
    (n > 3).then(|| 1.0 / ((n - 3) as f64).sqrt())
}

/// `tanh(atanh(r) ± z·se)`; the full range when the standard error is undefined.
fn fisher_interval(r: f64, std_error: Option<f64>, level: f64) -> ConfidenceInterval {
    let Some(se) = std_error else {
        return ConfidenceInterval {
            lower: -1.0,
            upper: 1.0,
            level,
        };
    };
    let z_crit = normal_quantile(1.0 - (1.0 - level) / 2.0);
    let z = r.clamp(-1.0, 1.0).atanh();
    ConfidenceInterval {
        lower: (z - z_crit * se).tanh(),
        upper: (z + z_crit * se).tanh(),
        level,
    }
}

/// Kendall tau-a and its two-tailed p-value.
fn kendall(x: &[f64], y: &[f64], config: &AnalyticsConfig) -> (f64, f64) {
    let n = x.len();
    let mut s: i64 = 0;
    for i in 0..n {
        for j in i + 1..n {
            // f64::signum(0.0) is 1.0, so tied pairs are skipped explicitly
            if x[j] != x[i] && y[j] != y[i] {
                s += ((x[j] - x[i]).signum() * (y[j] - y[i]).signum()) as i64;
            }
        }
    }
    let pairs = (n * (n - 1) / 2) as f64;
    let tau = (s as f64 / pairs).clamp(-1.0, 1.0);

    let x_ties = tie_group_sizes(x);
    let y_ties = tie_group_sizes(y);
    let p_value = if n <= config.kendall_exact_max_n && x_ties.is_empty() && y_ties.is_empty() {
        kendall_exact_p_value(s, n)
    } else {
        kendall_normal_p_value(s, n, &x_ties, &y_ties)
    };
    (tau, p_value)
}

/// Exact two-tailed p-value of S under independence.
///
/// S = M − 2I where I counts inversions, and the inversion count of a random
/// permutation is a sum of independent uniforms on {0..k−1}, k = 1..n.
fn kendall_exact_p_value(s: i64, n: usize) -> f64 {
    let max_inversions = n * (n - 1) / 2;
    let mut distribution = vec![0.0; max_inversions + 1];
    distribution[0] = 1.0;
    let mut reach = 0;
    for k in 2..=n {
        let mut next = vec![0.0; max_inversions + 1];
        for (inversions, &p) in distribution.iter().enumerate().take(reach + 1) {
            if p == 0.0 {
                continue;
            }
            for added in 0..k {
                next[inversions + added] += p / k as f64;
            }
        }
        reach += k - 1;
        distribution = next;
    }

    // |S| ≥ |s| on the upper side means I ≤ (M − |s|)/2
    let cutoff = (max_inversions as i64 - s.abs()) / 2;
    let tail: f64 = distribution.iter().take(cutoff as usize + 1).sum();
    (2.0 * tail).clamp(0.0, 1.0)
}

/// Normal approximation with tie-corrected variance and continuity correction.
fn kendall_normal_p_value(s: i64, n: usize, x_ties: &[usize], y_ties: &[usize]) -> f64 {
    let nf = n as f64;
    let term = |groups: &[usize], f: fn(f64) -> f64| -> f64 {
        groups.iter().map(|&t| f(t as f64)).sum()
    };
    let v0 = nf * (nf - 1.0) * (2.0 * nf + 5.0);
    let vt = term(x_ties, |t| t * (t - 1.0) * (2.0 * t + 5.0));
    let vu = term(y_ties, |t| t * (t - 1.0) * (2.0 * t + 5.0));
    let t2 = term(x_ties, |t| t * (t - 1.0) * (t - 2.0));
    let u2 = term(y_ties, |t| t * (t - 1.0) * (t - 2.0));
    let t1 = term(x_ties, |t| t * (t - 1.0));
    let u1 = term(y_ties, |t| t * (t - 1.0));

    let mut variance = (v0 - vt - vu) / 18.0 + t1 * u1 / (2.0 * nf * (nf - 1.0));
    if n > 2 {
        variance += t2 * u2 / (9.0 * nf * (nf - 1.0) * (nf - 2.0));
    }
    if variance <= 0.0 {
        return 1.0;
    }

    let corrected = (s.abs() as f64 - 1.0).max(0.0);
    normal_two_tailed_p_value(corrected / variance.sqrt())
}
