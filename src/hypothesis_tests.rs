//! Hypothesis tests on business metric samples.
//!
//! One-sample, two-sample (Welch) and paired t-tests, and the chi-square
//! goodness-of-fit test. Every test returns a [`StatisticalTest`] whose
//! `is_significant` flag is decided against the configured significance
//! level; the statistic and p-value never depend on the configuration.

use crate::config::AnalyticsConfig;
use crate::distributions::{chi_squared_p_value, t_two_tailed_p_value};
use crate::errors::{
    validate_all_finite, validate_data_length, validate_equal_length, AnalyticsError,
    AnalyticsResult,
};
use crate::math_utils::{mean, sample_variance};
use crate::narrative;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Which t-test to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum TestMode {
    /// Mean of one sample against a hypothesized mean
    OneSample,
    /// Welch's unequal-variance comparison of two independent samples
    TwoSample,
    /// One-sample test on element-wise differences
    Paired,
}

/// Identity of the test that produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum TestKind {
    /// One-sample t-test
    OneSampleT,
    /// Welch two-sample t-test
    WelchT,
    /// Paired t-test
    PairedT,
    /// Chi-square goodness-of-fit test
    ChiSquareGoodnessOfFit,
}

impl TestKind {
    /// Human-readable test name
    pub fn label(self) -> &'static str {
        match self {
            TestKind::OneSampleT => "One-sample t-test",
            TestKind::WelchT => "Welch two-sample t-test",
            TestKind::PairedT => "Paired t-test",
            TestKind::ChiSquareGoodnessOfFit => "Chi-square goodness-of-fit test",
        }
    }
}

/// Result of a hypothesis test.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct StatisticalTest {
    /// Test name
    pub name: String,
    /// Test identity
    pub kind: TestKind,
    /// Test statistic (t or χ²)
    pub statistic: f64,
    /// p-value in [0, 1]
    pub p_value: f64,
    /// Degrees of freedom; non-integer for Welch
    pub degrees_of_freedom: f64,
    /// p_value < significance_level
    pub is_significant: bool,
    /// Cohen's d for t-tests, Cohen's w for chi-square
    pub effect_size: Option<f64>,
    /// Generated interpretation
    pub interpretation: String,
}

impl StatisticalTest {
    fn new(
        kind: TestKind,
        statistic: f64,
        p_value: f64,
        degrees_of_freedom: f64,
        effect_size: Option<f64>,
        config: &AnalyticsConfig,
    ) -> Self {
        Self {
            name: kind.label().to_string(),
            kind,
            statistic,
            p_value,
            degrees_of_freedom,
            is_significant: config.is_significant(p_value),
            effect_size,
            interpretation: narrative::interpret_test(
                kind,
                statistic,
                degrees_of_freedom,
                p_value,
                config.significance_level,
            ),
        }
    }
}

/// Student t-test.
///
/// `hypothesized_mean` defaults to 0 and is used by the one-sample and
/// paired modes. The p-value is two-tailed.
///
/// # Errors
/// - `InsufficientData` when a sample has fewer than 2 values
/// - `InvalidInput` when the mode needs a second sample and none is given
/// - `LengthMismatch` for paired samples of different length
/// - `NonFiniteInput` for NaN or infinite values
///
/// # Example
/// ```rust
/// use insight_analytics::{t_test, AnalyticsConfig, TestMode};
///
/// let control = [12.0, 14.0, 11.0, 13.0, 12.5];
/// let variant = [15.0, 16.5, 14.0, 17.0, 15.5];
/// let result = t_test(&control, Some(&variant), TestMode::TwoSample, None, &AnalyticsConfig::default()).unwrap();
/// assert!(result.is_significant);
/// ```
pub fn t_test(
    sample1: &[f64],
    sample2: Option<&[f64]>,
    mode: TestMode,
    hypothesized_mean: Option<f64>,
    config: &AnalyticsConfig,
) -> AnalyticsResult<StatisticalTest> {
    validate_all_finite(sample1, "sample1")?;
    validate_data_length(sample1, 2)?;
    let mu0 = hypothesized_mean.unwrap_or(0.0);
    if !mu0.is_finite() {
        return Err(AnalyticsError::InvalidParameter {
            parameter: "hypothesized_mean".to_string(),
            value: mu0,
            constraint: "finite".to_string(),
        });
    }

    match mode {
        TestMode::OneSample => one_sample(sample1, mu0, TestKind::OneSampleT, config),
        TestMode::TwoSample => {
            let sample2 = require_second(sample2, mode)?;
            welch(sample1, sample2, config)
        }
        TestMode::Paired => {
            let sample2 = require_second(sample2, mode)?;
            validate_equal_length(sample1, sample2)?;
            let differences: Vec<f64> = sample1.iter().zip(sample2).map(|(a, b)| a - b).collect();
            one_sample(&differences, mu0, TestKind::PairedT, config)
        }
    }
}

fn require_second(sample2: Option<&[f64]>, mode: TestMode) -> AnalyticsResult<&[f64]> {
    let sample2 = sample2.ok_or_else(|| AnalyticsError::InvalidInput {
        reason: format!("{:?} t-test requires a second sample", mode),
    })?;
    validate_all_finite(sample2, "sample2")?;
    validate_data_length(sample2, 2)?;
    Ok(sample2)
}

/// Statistic for a mean difference over its standard error.
///
/// A zero standard error yields 0 when the difference is also zero and a
/// signed infinity otherwise.
fn ratio_statistic(difference: f64, std_error: f64) -> f64 {
    if std_error > 0.0 {
        difference / std_error
    } else if difference == 0.0 {
        0.0
    } else {
        difference.signum() * f64::INFINITY
    }
}

fn one_sample(
    data: &[f64],
    mu0: f64,
    kind: TestKind,
    config: &AnalyticsConfig,
) -> AnalyticsResult<StatisticalTest> {
    let n = data.len() as f64;
    let difference = mean(data) - mu0;
    let sd = sample_variance(data).sqrt();
    let statistic = ratio_statistic(difference, sd / n.sqrt());
    let df = n - 1.0;
    let p_value = t_two_tailed_p_value(statistic, df)?;
    let effect_size = (sd > 0.0).then(|| difference / sd);

    Ok(StatisticalTest::new(kind, statistic, p_value, df, effect_size, config))
}

fn welch(a: &[f64], b: &[f64], config: &AnalyticsConfig) -> AnalyticsResult<StatisticalTest> {
    let (n1, n2) = (a.len() as f64, b.len() as f64);
    let (v1, v2) = (sample_variance(a), sample_variance(b));
    let difference = mean(a) - mean(b);

    let se1 = v1 / n1;
    let se2 = v2 / n2;
    let std_error = (se1 + se2).sqrt();
    let statistic = ratio_statistic(difference, std_error);

    // Welch-Satterthwaite; with no variance on either side fall back to the pooled df
    let denominator = se1 * se1 / (n1 - 1.0) + se2 * se2 / (n2 - 1.0);
    let df = if denominator > 0.0 {
        (se1 + se2).powi(2) / denominator
    } else {
        n1 + n2 - 2.0
    };
    let p_value = t_two_tailed_p_value(statistic, df)?;

    let pooled_sd = (((n1 - 1.0) * v1 + (n2 - 1.0) * v2) / (n1 + n2 - 2.0)).sqrt();
    let effect_size = (pooled_sd > 0.0).then(|| difference / pooled_sd);

    Ok(StatisticalTest::new(TestKind::WelchT, statistic, p_value, df, effect_size, config))
}

/// Chi-square goodness-of-fit test.
///
/// Without `expected` the expected frequency of every cell is the mean of
/// the observed counts. Supplied expected frequencies whose total differs
/// from the observed total are rescaled to it.
///
/// # Errors
/// - `InsufficientData` for fewer than 2 categories
/// - `LengthMismatch` when expected and observed differ in length
/// - `InvalidInput` for negative observed counts or non-positive expected counts
///
/// # Example
/// ```rust
/// use insight_analytics::{chi_square_test, AnalyticsConfig};
///
/// let clicks_per_variant = [48.0, 52.0, 50.0, 50.0];
/// let result = chi_square_test(&clicks_per_variant, None, &AnalyticsConfig::default()).unwrap();
/// assert!(!result.is_significant);
/// ```
pub fn chi_square_test(
    observed: &[f64],
    expected: Option<&[f64]>,
    config: &AnalyticsConfig,
) -> AnalyticsResult<StatisticalTest> {
    validate_all_finite(observed, "observed")?;
    validate_data_length(observed, 2)?;
    if observed.iter().any(|&o| o < 0.0) {
        return Err(AnalyticsError::InvalidInput {
            reason: "observed frequencies must be non-negative".to_string(),
        });
    }

    let observed_total: f64 = observed.iter().sum();
    if observed_total <= 0.0 {
        return Err(AnalyticsError::InvalidInput {
            reason: "observed frequencies sum to zero".to_string(),
        });
    }

    let expected: Vec<f64> = match expected {
        None => vec![observed_total / observed.len() as f64; observed.len()],
        Some(expected) => {
            validate_all_finite(expected, "expected")?;
            validate_equal_length(observed, expected)?;
            if expected.iter().any(|&e| e <= 0.0) {
                return Err(AnalyticsError::InvalidInput {
                    reason: "expected frequencies must be positive".to_string(),
                });
            }
            let expected_total: f64 = expected.iter().sum();
            if ((expected_total - observed_total) / observed_total).abs() > config.tolerance {
                let scale = observed_total / expected_total;
                expected.iter().map(|e| e * scale).collect()
            } else {
                expected.to_vec()
            }
        }
    };

    let statistic: f64 = observed
        .iter()
        .zip(&expected)
        .map(|(o, e)| (o - e) * (o - e) / e)
        .sum();
    let df = (observed.len() - 1) as f64;
    let p_value = chi_squared_p_value(statistic, df)?;
    let effect_size = Some((statistic / observed_total).sqrt());

    Ok(StatisticalTest::new(
        TestKind::ChiSquareGoodnessOfFit,
        statistic,
        p_value,
        df,
        effect_size,
        config,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn config() -> AnalyticsConfig {
        AnalyticsConfig::default()
    }

    #[test]
    fn test_one_sample_known_values() {
        // mean 5, sd sqrt(2.5), n = 5 → t = (5 - 3) / (sqrt(2.5)/sqrt(5)) = 2.8284
        let data = [3.0, 4.0, 5.0, 6.0, 7.0];
        let result = t_test(&data, None, TestMode::OneSample, Some(3.0), &config()).unwrap();
        assert_eq!(result.kind, TestKind::OneSampleT);
        assert_approx_eq!(result.statistic, 2.828427, 1e-5);
        assert_approx_eq!(result.degrees_of_freedom, 4.0, 1e-12);
        // two-tailed t(4) at 2.8284
        assert_approx_eq!(result.p_value, 0.04742, 1e-4);
        assert!(result.is_significant);
        assert!(result.interpretation.contains("df = 4"));
    }

    #[test]
    fn test_welch_known_values() {
        let a = [19.8, 20.4, 19.6, 17.8, 18.5, 18.9, 18.3, 18.9, 19.5, 22.0];
        let b = [28.2, 26.6, 20.1, 23.3, 25.2, 22.1, 17.7, 27.6, 20.6, 13.7];
        let result = t_test(&a, Some(&b), TestMode::TwoSample, None, &config()).unwrap();

        // mean(a) = 19.37, mean(b) = 22.51; var(a) = 1.4490, var(b) = 21.4721
        assert_approx_eq!(result.statistic, -2.0740, 2e-3);
        assert_approx_eq!(result.degrees_of_freedom, 10.209, 1e-2);
        assert!(result.degrees_of_freedom.fract() != 0.0);
        assert!(result.p_value > 0.05 && result.p_value < 0.07);
        assert!(!result.is_significant);
    }

    #[test]
    fn test_paired_equals_one_sample_on_differences() {
        let before = [200.0, 190.0, 210.0, 220.0, 205.0, 198.0];
        let after = [192.0, 185.0, 199.0, 214.0, 204.0, 190.0];
        let paired = t_test(&before, Some(&after), TestMode::Paired, None, &config()).unwrap();

        let diffs: Vec<f64> = before.iter().zip(&after).map(|(a, b)| a - b).collect();
        let direct = t_test(&diffs, None, TestMode::OneSample, None, &config()).unwrap();

        assert_eq!(paired.kind, TestKind::PairedT);
        assert_approx_eq!(paired.statistic, direct.statistic, 1e-12);
        assert_approx_eq!(paired.p_value, direct.p_value, 1e-12);
        assert!(paired.is_significant);
    }

    #[test]
    fn test_paired_requires_equal_lengths() {
        let err = t_test(&[1.0, 2.0, 3.0], Some(&[1.0, 2.0]), TestMode::Paired, None, &config())
            .unwrap_err();
        assert!(matches!(err, AnalyticsError::LengthMismatch { expected: 3, actual: 2 }));
        assert!(err.is_validation());
    }

    #[test]
    fn test_missing_or_short_samples() {
        assert!(matches!(
            t_test(&[1.0, 2.0], None, TestMode::TwoSample, None, &config()),
            Err(AnalyticsError::InvalidInput { .. })
        ));
        assert!(matches!(
            t_test(&[1.0], None, TestMode::OneSample, None, &config()),
            Err(AnalyticsError::InsufficientData { required: 2, actual: 1 })
        ));
        assert!(matches!(
            t_test(&[1.0, 2.0], Some(&[3.0]), TestMode::TwoSample, None, &config()),
            Err(AnalyticsError::InsufficientData { .. })
        ));
        assert!(matches!(
            t_test(&[1.0, f64::NAN], None, TestMode::OneSample, None, &config()),
            Err(AnalyticsError::NonFiniteInput { index: 1, .. })
        ));
    }

    #[test]
    fn test_zero_variance_samples() {
        let same = t_test(&[5.0, 5.0, 5.0], None, TestMode::OneSample, Some(5.0), &config()).unwrap();
        assert_eq!(same.statistic, 0.0);
        assert_approx_eq!(same.p_value, 1.0, 1e-12);
        assert_eq!(same.effect_size, None);

        let shifted = t_test(&[5.0, 5.0, 5.0], None, TestMode::OneSample, Some(4.0), &config()).unwrap();
        assert_eq!(shifted.statistic, f64::INFINITY);
        assert_eq!(shifted.p_value, 0.0);
        assert!(shifted.is_significant);
    }

    #[test]
    fn test_chi_square_uniform_default() {
        // Expected 25 per cell: (30-25)²/25 + (20-25)²/25 + 0 + 0 = 2.0
        let observed = [30.0, 20.0, 25.0, 25.0];
        let result = chi_square_test(&observed, None, &config()).unwrap();
        assert_approx_eq!(result.statistic, 2.0, 1e-12);
        assert_approx_eq!(result.degrees_of_freedom, 3.0, 1e-12);
        assert_approx_eq!(result.p_value, 0.5724, 1e-3);
        assert!(!result.is_significant);
    }

    #[test]
    fn test_chi_square_with_expected_proportions() {
        let observed = [90.0, 60.0, 50.0];
        // Proportions are rescaled to the observed total of 200
        let expected = [0.5, 0.25, 0.25];
        let result = chi_square_test(&observed, Some(&expected), &config()).unwrap();
        // E = 100, 50, 50 → 1 + 2 + 0 = 3
        assert_approx_eq!(result.statistic, 3.0, 1e-10);
        assert!(result.effect_size.unwrap() > 0.0);
    }

    #[test]
    fn test_chi_square_validation() {
        assert!(matches!(
            chi_square_test(&[10.0], None, &config()),
            Err(AnalyticsError::InsufficientData { .. })
        ));
        assert!(matches!(
            chi_square_test(&[10.0, -1.0], None, &config()),
            Err(AnalyticsError::InvalidInput { .. })
        ));
        assert!(matches!(
            chi_square_test(&[10.0, 5.0], Some(&[1.0, 0.0]), &config()),
            Err(AnalyticsError::InvalidInput { .. })
        ));
        assert!(matches!(
            chi_square_test(&[10.0, 5.0], Some(&[1.0]), &config()),
            Err(AnalyticsError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn test_significance_level_only_changes_flag() {
        let a = [10.0, 11.0, 12.0, 13.0, 14.0];
        let b = [11.5, 12.5, 13.0, 14.5, 15.0];
        let loose = AnalyticsConfig {
            significance_level: 0.5,
            ..AnalyticsConfig::default()
        };
        let strict = AnalyticsConfig::strict();
        let r1 = t_test(&a, Some(&b), TestMode::TwoSample, None, &loose).unwrap();
        let r2 = t_test(&a, Some(&b), TestMode::TwoSample, None, &strict).unwrap();

        assert_eq!(r1.statistic, r2.statistic);
        assert_eq!(r1.p_value, r2.p_value);
        assert!(r1.is_significant);
        assert!(!r2.is_significant);
    }
}
