//! Mathematical utility functions and constants for the analytics engine.
//!
//! Descriptive statistics, ranking, autocorrelation and the straight-line
//! least-squares fit shared by the trend and hypothesis modules. Inputs are
//! assumed to be validated (finite) by the caller.

use crate::errors::{AnalyticsError, AnalyticsResult};
use rustfft::{num_complex::Complex, FftPlanner};

/// Numerical constants
pub mod constants {
    /// Default epsilon for floating point comparisons
    pub const DEFAULT_EPSILON: f64 = 1e-12;

    /// Minimum acceptable variance to avoid division by zero
    pub const MIN_VARIANCE: f64 = 1e-15;

    /// Consistency factor turning a MAD into a normal-scale standard deviation
    pub const MAD_SCALE: f64 = 1.4826;

    /// Series longer than this use FFT autocorrelation
    pub const FFT_AUTOCORRELATION_MIN_LEN: usize = 512;
}

/// Safe floating point comparison functions
pub mod float_ops {
    use super::constants::DEFAULT_EPSILON;

    /// Check if two floating point numbers are approximately equal
    #[inline]
    pub fn approx_eq(a: f64, b: f64) -> bool {
        approx_eq_eps(a, b, DEFAULT_EPSILON)
    }

    /// Check if two floating point numbers are approximately equal with custom epsilon
    #[inline]
    pub fn approx_eq_eps(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() < epsilon
    }

    /// Check if a floating point number is approximately zero with custom epsilon
    #[inline]
    pub fn approx_zero_eps(x: f64, epsilon: f64) -> bool {
        x.abs() < epsilon
    }
}

/// Total ordering for floats (NaN sorts last)
pub fn float_total_cmp(a: &f64, b: &f64) -> std::cmp::Ordering {
    a.total_cmp(b)
}

/// Arithmetic mean; NaN for empty input
pub fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return f64::NAN;
    }
    data.iter().sum::<f64>() / data.len() as f64
}

/// Unbiased sample variance using Welford's single-pass update.
///
/// Returns 0.0 for fewer than two points.
pub fn sample_variance(data: &[f64]) -> f64 {
    if data.len() < 2 {
        return 0.0;
    }

    let mut mean = 0.0;
    let mut m2 = 0.0;
    for (i, &value) in data.iter().enumerate() {
        let count = (i + 1) as f64;
        let delta = value - mean;
        mean += delta / count;
        m2 += delta * (value - mean);
    }

    (m2 / (data.len() - 1) as f64).max(0.0)
}

/// Sample standard deviation
pub fn std_dev(data: &[f64]) -> f64 {
    sample_variance(data).sqrt()
}

/// Calculate median of already-sorted data (handles even-length correctly)
pub fn median_of_sorted(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return f64::NAN;
    }
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        0.5 * (sorted[n / 2 - 1] + sorted[n / 2])
    }
}

/// Calculate median
pub fn median(values: &[f64]) -> f64 {
    let mut v = values.to_vec();
    v.sort_by(float_total_cmp);
    median_of_sorted(&v)
}

/// Calculate median absolute deviation around `med`
pub fn mad(values: &[f64], med: f64) -> f64 {
    let mut abs_devs: Vec<f64> = values.iter().map(|&x| (x - med).abs()).collect();
    abs_devs.sort_by(float_total_cmp);
    median_of_sorted(&abs_devs)
}

/// Location and scale of a sample.
///
/// Classic estimates are mean and sample standard deviation; robust
/// estimates are median and 1.4826 * MAD.
pub fn location_scale(data: &[f64], robust: bool) -> (f64, f64) {
    if robust {
        let med = median(data);
        (med, constants::MAD_SCALE * mad(data, med))
    } else {
        (mean(data), std_dev(data))
    }
}

/// Location and scale usable for z-scores, or `None` when the scale is below `floor`.
///
/// A robust request falls back to mean/sd when more than half the values
/// coincide, since the MAD is then zero even if other points sit far away.
pub fn guarded_location_scale(data: &[f64], robust: bool, floor: f64) -> Option<(f64, f64)> {
    let usable = |(location, scale): (f64, f64)| {
        (scale >= floor && scale > 0.0).then_some((location, scale))
    };
    usable(location_scale(data, robust)).or_else(|| {
        if robust {
            usable(location_scale(data, false))
        } else {
            None
        }
    })
}

/// True when the spread of `data` is negligible relative to its magnitude.
///
/// The test is `sd <= tolerance * max|x|`, so it does not depend on units.
pub fn is_effectively_constant(data: &[f64], tolerance: f64) -> bool {
    let magnitude = data.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
    std_dev(data) <= tolerance * magnitude
}

/// Average (mid) ranks, 1-based; ties share the mean of their positions.
pub fn average_ranks(data: &[f64]) -> Vec<f64> {
    let n = data.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| float_total_cmp(&data[a], &data[b]));

    let mut ranks = vec![0.0; n];
    let mut i = 0;
    while i < n {
        let mut j = i;
        while j + 1 < n && data[order[j + 1]] == data[order[i]] {
            j += 1;
        }
        // Positions i..=j are tied; their ranks are i+1..=j+1
        let rank = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            ranks[idx] = rank;
        }
        i = j + 1;
    }
    ranks
}

/// Sizes of tie groups (only groups larger than one)
pub fn tie_group_sizes(data: &[f64]) -> Vec<usize> {
    let mut sorted = data.to_vec();
    sorted.sort_by(float_total_cmp);

    let mut groups = Vec::new();
    let mut run = 1;
    for w in sorted.windows(2) {
        if w[0] == w[1] {
            run += 1;
        } else {
            if run > 1 {
                groups.push(run);
            }
            run = 1;
        }
    }
    if run > 1 {
        groups.push(run);
    }
    groups
}

/// Calculate autocorrelations for lags `0..=max_lag`.
///
/// Uses the standard biased estimator
/// `r_k = Σ (x_t - μ)(x_{t+k} - μ) / Σ (x_t - μ)²`, which keeps every
/// coefficient in [-1, 1]. Returns zeros when the series has no variance.
///
/// # Example
/// ```rust
/// use insight_analytics::math_utils::calculate_autocorrelations;
///
/// let data = vec![1.0, 3.0, 1.0, 3.0, 1.0, 3.0, 1.0, 3.0];
/// let acf = calculate_autocorrelations(&data, 3);
/// assert_eq!(acf.len(), 4); // lags 0, 1, 2, 3
/// assert!(acf[2] > 0.5);
/// ```
pub fn calculate_autocorrelations(data: &[f64], max_lag: usize) -> Vec<f64> {
    let n = data.len();
    if n <= max_lag {
        return vec![0.0; max_lag + 1];
    }

    if n > constants::FFT_AUTOCORRELATION_MIN_LEN {
        calculate_autocorrelations_fft(data, max_lag)
    } else {
        calculate_autocorrelations_direct(data, max_lag)
    }
}

/// Direct O(n·lags) autocorrelation for short series.
fn calculate_autocorrelations_direct(data: &[f64], max_lag: usize) -> Vec<f64> {
    let n = data.len();
    let mu = mean(data);
    let denominator: f64 = data.iter().map(|x| (x - mu) * (x - mu)).sum();

    if denominator <= constants::MIN_VARIANCE {
        return vec![0.0; max_lag + 1];
    }

    let mut autocorrs = Vec::with_capacity(max_lag + 1);
    autocorrs.push(1.0);
    for lag in 1..=max_lag {
        let covariance: f64 = (0..n - lag)
            .map(|i| (data[i] - mu) * (data[i + lag] - mu))
            .sum();
        autocorrs.push(covariance / denominator);
    }
    autocorrs
}

/// FFT-based O(n log n) autocorrelation for long series.
///
/// Wiener-Khinchin: the autocovariance sums are the inverse transform of the
/// power spectrum of the zero-padded, centred series.
fn calculate_autocorrelations_fft(data: &[f64], max_lag: usize) -> Vec<f64> {
    let n = data.len();
    let mu = mean(data);
    let padded_len = (2 * n).next_power_of_two();

    let mut buffer: Vec<Complex<f64>> = data
        .iter()
        .map(|&x| Complex::new(x - mu, 0.0))
        .chain(std::iter::repeat(Complex::new(0.0, 0.0)))
        .take(padded_len)
        .collect();

    let mut planner = FftPlanner::<f64>::new();
    planner.plan_fft_forward(padded_len).process(&mut buffer);
    for value in buffer.iter_mut() {
        *value = Complex::new(value.norm_sqr(), 0.0);
    }
    planner.plan_fft_inverse(padded_len).process(&mut buffer);

    let lag0 = buffer[0].re;
    if lag0 <= constants::MIN_VARIANCE * padded_len as f64 {
        return vec![0.0; max_lag + 1];
    }
    // rustfft does not normalize; the common factor cancels in the ratio
    (0..=max_lag).map(|k| buffer[k].re / lag0).collect()
}

/// Straight-line least-squares fit `y = intercept + slope * x`.
#[derive(Debug, Clone, PartialEq)]
pub struct LineFit {
    /// Fitted slope
    pub slope: f64,
    /// Fitted intercept
    pub intercept: f64,
    /// Standard error of the slope (0 for a perfect fit)
    pub slope_std_error: f64,
    /// Residuals y - ŷ
    pub residuals: Vec<f64>,
    /// Residual variance SSres / (n - 2)
    pub residual_variance: f64,
    /// Coefficient of determination (0 when y is constant)
    pub r_squared: f64,
    /// Mean of x
    pub x_mean: f64,
    /// Centred sum of squares of x
    pub sxx: f64,
}

impl LineFit {
    /// Fitted value at `x`
    pub fn predict(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }
}

/// Ordinary least squares fit of a line, computed on centred data.
///
/// # Errors
/// - `InsufficientData` for fewer than 3 points
/// - `LengthMismatch` when x and y differ in length
/// - `InvalidInput` when x is constant
///
/// # Example
/// ```rust
/// use insight_analytics::math_utils::ols_line;
///
/// let x = vec![1.0, 2.0, 3.0, 4.0, 5.0];
/// let y = vec![2.0, 4.0, 6.0, 8.0, 10.0];
/// let fit = ols_line(&x, &y).unwrap();
/// assert!((fit.slope - 2.0).abs() < 1e-10);
/// ```
pub fn ols_line(x: &[f64], y: &[f64]) -> AnalyticsResult<LineFit> {
    if x.len() != y.len() {
        return Err(AnalyticsError::LengthMismatch {
            expected: x.len(),
            actual: y.len(),
        });
    }
    if x.len() < 3 {
        return Err(AnalyticsError::InsufficientData {
            required: 3,
            actual: x.len(),
        });
    }

    let n = x.len() as f64;
    let x_mean = mean(x);
    let y_mean = mean(y);

    let sxx: f64 = x.iter().map(|xi| (xi - x_mean) * (xi - x_mean)).sum();
    if float_ops::approx_zero_eps(sxx, constants::MIN_VARIANCE) {
        return Err(AnalyticsError::InvalidInput {
            reason: "predictor variable has zero variance".to_string(),
        });
    }
    let sxy: f64 = x
        .iter()
        .zip(y)
        .map(|(xi, yi)| (xi - x_mean) * (yi - y_mean))
        .sum();
    let syy: f64 = y.iter().map(|yi| (yi - y_mean) * (yi - y_mean)).sum();

    let slope = sxy / sxx;
    let intercept = y_mean - slope * x_mean;

    let residuals: Vec<f64> = x
        .iter()
        .zip(y)
        .map(|(xi, yi)| yi - (intercept + slope * xi))
        .collect();
    let rss: f64 = residuals.iter().map(|r| r * r).sum();
    let residual_variance = rss / (n - 2.0);
    let slope_std_error = (residual_variance / sxx).sqrt();

    let r_squared = if syy > constants::MIN_VARIANCE {
        (1.0 - rss / syy).clamp(0.0, 1.0)
    } else {
        0.0
    };

    if !slope.is_finite() || !intercept.is_finite() || !slope_std_error.is_finite() {
        return Err(AnalyticsError::numerical(
            "non-finite regression coefficients computed",
            "ols_line",
        ));
    }

    Ok(LineFit {
        slope,
        intercept,
        slope_std_error,
        residuals,
        residual_variance,
        r_squared,
        x_mean,
        sxx,
    })
}

/// Index sequence 0..n as floats
pub fn index_axis(n: usize) -> Vec<f64> {
    (0..n).map(|i| i as f64).collect()
}

/// Round to `decimals` places for display
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_mean_and_variance() {
        let data = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        assert_approx_eq!(mean(&data), 3.0, 1e-12);
        assert_approx_eq!(sample_variance(&data), 2.5, 1e-12);
        assert_approx_eq!(std_dev(&data), 2.5f64.sqrt(), 1e-12);
        assert_eq!(sample_variance(&[4.0]), 0.0);
        assert!(mean(&[]).is_nan());
    }

    #[test]
    fn test_variance_stable_for_large_offsets() {
        let data: Vec<f64> = (0..100).map(|i| 1e9 + (i % 2) as f64).collect();
        let expected = 0.25 * 100.0 / 99.0;
        assert_approx_eq!(sample_variance(&data), expected, 1e-6);
    }

    #[test]
    fn test_median_and_mad() {
        assert_approx_eq!(median(&[3.0, 1.0, 2.0]), 2.0, 1e-12);
        assert_approx_eq!(median(&[4.0, 1.0, 3.0, 2.0]), 2.5, 1e-12);
        let data = vec![1.0, 2.0, 3.0, 4.0, 100.0];
        assert_approx_eq!(mad(&data, median(&data)), 1.0, 1e-12);

        let (loc, scale) = location_scale(&data, true);
        assert_approx_eq!(loc, 3.0, 1e-12);
        assert_approx_eq!(scale, constants::MAD_SCALE, 1e-12);
    }

    #[test]
    fn test_guarded_location_scale_falls_back_when_mad_is_zero() {
        let mut data = vec![10.0; 21];
        data[10] = 100.0;
        assert_eq!(location_scale(&data, true).1, 0.0);

        let (loc, scale) = guarded_location_scale(&data, true, 1e-8).unwrap();
        assert_approx_eq!(loc, mean(&data), 1e-12);
        assert_approx_eq!(scale, std_dev(&data), 1e-12);

        let (loc, _) = guarded_location_scale(&[1.0, 2.0, 3.0, 4.0, 100.0], true, 1e-8).unwrap();
        assert_approx_eq!(loc, 3.0, 1e-12);

        assert!(guarded_location_scale(&[5.0; 8], true, 1e-8).is_none());
        assert!(guarded_location_scale(&[5.0; 8], false, 1e-8).is_none());
    }

    #[test]
    fn test_effectively_constant_is_scale_free() {
        let tiny: Vec<f64> = (1..=8).map(|i| i as f64 * 1e-9).collect();
        let huge: Vec<f64> = (1..=8).map(|i| i as f64 * 1e8).collect();
        assert!(!is_effectively_constant(&tiny, 1e-8));
        assert!(!is_effectively_constant(&huge, 1e-8));
        assert!(is_effectively_constant(&[4.0; 6], 1e-8));
        assert!(is_effectively_constant(&[0.0; 6], 1e-8));
        assert!(is_effectively_constant(&[1e-12; 6], 1e-8));
    }

    #[test]
    fn test_average_ranks_with_ties() {
        let ranks = average_ranks(&[10.0, 20.0, 20.0, 5.0, 30.0]);
        assert_eq!(ranks, vec![2.0, 3.5, 3.5, 1.0, 5.0]);
        assert_eq!(tie_group_sizes(&[1.0, 2.0, 2.0, 3.0, 3.0, 3.0]), vec![2, 3]);
        assert!(tie_group_sizes(&[1.0, 2.0, 3.0]).is_empty());
    }

    #[test]
    fn test_autocorrelation_detects_period() {
        let data: Vec<f64> = (0..40).map(|i| [1.0, 5.0, 3.0, -2.0][i % 4]).collect();
        let acf = calculate_autocorrelations(&data, 8);
        assert_eq!(acf.len(), 9);
        assert_approx_eq!(acf[0], 1.0, 1e-12);
        assert!(acf[4] > 0.8, "lag 4 should dominate, got {}", acf[4]);
        assert!(acf.iter().all(|r| r.abs() <= 1.0 + 1e-12));
    }

    #[test]
    fn test_autocorrelation_constant_series() {
        let acf = calculate_autocorrelations(&[2.0; 10], 3);
        assert_eq!(acf, vec![0.0; 4]);
        // Lag longer than the series
        assert_eq!(calculate_autocorrelations(&[1.0, 2.0], 5), vec![0.0; 6]);
    }

    #[test]
    fn test_fft_autocorrelation_matches_direct() {
        let data: Vec<f64> = (0..1024)
            .map(|i| (i as f64 * 0.3).sin() + 0.1 * ((i * 7919) % 13) as f64)
            .collect();
        let direct = calculate_autocorrelations_direct(&data, 20);
        let fft = calculate_autocorrelations_fft(&data, 20);
        for (a, b) in direct.iter().zip(&fft) {
            assert_approx_eq!(a, b, 1e-9);
        }
    }

    #[test]
    fn test_ols_line_perfect_fit() {
        let x = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let y = vec![2.0, 4.0, 6.0, 8.0, 10.0];
        let fit = ols_line(&x, &y).unwrap();

        assert_approx_eq!(fit.slope, 2.0, 1e-10);
        assert_approx_eq!(fit.intercept, 0.0, 1e-10);
        assert_approx_eq!(fit.slope_std_error, 0.0, 1e-10);
        assert_approx_eq!(fit.r_squared, 1.0, 1e-10);
        assert_approx_eq!(fit.predict(6.0), 12.0, 1e-10);
        for residual in fit.residuals {
            assert_approx_eq!(residual, 0.0, 1e-10);
        }
    }

    #[test]
    fn test_ols_line_noisy_data() {
        let x = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let y = vec![2.1, 3.9, 6.2, 7.8, 9.9];
        let fit = ols_line(&x, &y).unwrap();
        assert!((fit.slope - 2.0).abs() < 0.2);
        assert!(fit.intercept.abs() < 0.5);
        assert!(fit.slope_std_error > 0.0);
    }

    #[test]
    fn test_ols_line_errors() {
        assert!(matches!(
            ols_line(&[1.0, 2.0], &[1.0, 2.0]),
            Err(AnalyticsError::InsufficientData { .. })
        ));
        assert!(matches!(
            ols_line(&[1.0, 2.0, 3.0], &[1.0, 2.0]),
            Err(AnalyticsError::LengthMismatch { .. })
        ));
        assert!(matches!(
            ols_line(&[2.0, 2.0, 2.0], &[1.0, 2.0, 3.0]),
            Err(AnalyticsError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(1.23456, 2), 1.23);
        assert_eq!(round_to(-0.005, 1), -0.0);
    }
}
