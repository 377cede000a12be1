//! Ordinary least-squares regression.
//!
//! The design matrix (intercept column prepended) is scaled to unit column
//! norms and factorized once with Householder QR; the solution is then
//! refined against its own residuals until the correction is negligible.
//! Coefficient inference uses the covariance `σ̂²·(RᵀR)⁻¹` computed from the
//! triangular factor and mapped back to the original units.

use crate::config::AnalyticsConfig;
use crate::distributions::{f_p_value, t_two_tailed_p_value};
use crate::errors::{validate_all_finite, AnalyticsError, AnalyticsResult};
use crate::linear_algebra::{
    compute_residuals, equilibrate_columns, mat_vec, max_abs, HouseholderQr,
};
use crate::math_utils::{is_effectively_constant, location_scale, mean, std_dev};
use crate::narrative;
use nalgebra::DMatrix;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Number of predictors in the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum RegressionKind {
    /// One predictor
    Simple,
    /// Two or more predictors
    Multiple,
}

/// Fitted regression model with diagnostics.
///
/// Every per-coefficient vector is indexed like `coefficients`: index 0 is
/// the intercept, index i the i-th predictor.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct RegressionResult {
    /// Simple or multiple
    pub kind: RegressionKind,
    /// Intercept followed by one slope per predictor
    pub coefficients: Vec<f64>,
    /// Coefficient standard errors
    pub standard_errors: Vec<f64>,
    /// Coefficient t statistics
    pub t_statistics: Vec<f64>,
    /// Two-tailed coefficient p-values at df = n − p − 1
    pub coefficient_p_values: Vec<f64>,
    /// Coefficient of determination
    pub r_squared: f64,
    /// r² adjusted for the number of predictors
    pub adjusted_r_squared: f64,
    /// +∞ for a perfect fit
    pub f_statistic: f64,
    /// p-value of the overall F test
    pub p_value: f64,
    /// p_value < significance_level
    pub is_significant: bool,
    /// Display form, e.g. `y = 1.5 + 2*x1`
    pub equation: String,
    /// Observations whose standardized residual exceeds `outlier_threshold`
    pub outliers: Vec<usize>,
    /// y − ŷ per observation
    pub residuals: Vec<f64>,
    /// ŷ per observation
    pub fitted_values: Vec<f64>,
    /// sqrt(SSres / (n − p − 1))
    pub residual_standard_error: f64,
    /// Refinement steps used after the initial solve
    pub iterations: usize,
}

/// Multiple linear regression of `y` on `x_rows` (one row per observation).
///
/// # Errors
/// - `InsufficientData` when there are fewer than predictors + 2 observations
/// - `LengthMismatch` when `x_rows` and `y` differ in length
/// - `InvalidInput` for an empty or ragged design
/// - `NonFiniteInput` for NaN or infinite values
/// - `SingularMatrix` when the design is rank-deficient within `tolerance`
/// - `ConvergenceFailure` when refinement needs more than `max_iterations` steps
///
/// # Example
/// ```rust
/// use insight_analytics::{multiple_regression, AnalyticsConfig, RegressionKind};
///
/// let y = [2.0, 4.0, 6.0, 8.0, 10.0];
/// let x = vec![vec![1.0], vec![2.0], vec![3.0], vec![4.0], vec![5.0]];
/// let model = multiple_regression(&y, &x, &AnalyticsConfig::default()).unwrap();
/// assert_eq!(model.kind, RegressionKind::Simple);
/// assert!((model.r_squared - 1.0).abs() < 1e-10);
/// ```
pub fn multiple_regression(
    y: &[f64],
    x_rows: &[Vec<f64>],
    config: &AnalyticsConfig,
) -> AnalyticsResult<RegressionResult> {
    validate_all_finite(y, "y")?;
    if x_rows.len() != y.len() {
        return Err(AnalyticsError::LengthMismatch {
            expected: y.len(),
            actual: x_rows.len(),
        });
    }
    let predictors = match x_rows.first() {
        Some(row) if !row.is_empty() => row.len(),
        Some(_) => {
            return Err(AnalyticsError::InvalidInput {
                reason: "design has no predictor columns".to_string(),
            })
        }
        None => {
            return Err(AnalyticsError::InsufficientData {
                required: 3,
                actual: 0,
            })
        }
    };
    for (i, row) in x_rows.iter().enumerate() {
        if row.len() != predictors {
            return Err(AnalyticsError::InvalidInput {
                reason: format!(
                    "row {} has {} predictors, expected {}",
                    i,
                    row.len(),
                    predictors
                ),
            });
        }
        validate_all_finite(row, &format!("x_rows[{}]", i))?;
    }

    let n = y.len();
    let columns = predictors + 1;
    if n < predictors + 2 {
        return Err(AnalyticsError::InsufficientData {
            required: predictors + 2,
            actual: n,
        });
    }

    let design: Vec<Vec<f64>> = x_rows
        .iter()
        .map(|row| std::iter::once(1.0).chain(row.iter().copied()).collect())
        .collect();

    // Unit-norm columns keep the rank test independent of predictor units
    let (scaled_design, column_norms) = equilibrate_columns(&design);
    let qr = HouseholderQr::factorize(&scaled_design)?;
    let rank = qr.numerical_rank(config.tolerance);
    if rank < columns {
        return Err(AnalyticsError::SingularMatrix { rank, columns });
    }

    let (scaled_coefficients, iterations) = refine(&qr, &scaled_design, y, config)?;
    let coefficients: Vec<f64> = scaled_coefficients
        .iter()
        .zip(&column_norms)
        .map(|(b, s)| b / s)
        .collect();

    let fitted_values = mat_vec(&design, &coefficients);
    let residuals = compute_residuals(&design, y, &coefficients);

    let nf = n as f64;
    let df_model = predictors as f64;
    let df_residual = (n - columns) as f64;
    let y_mean = mean(y);
    let ss_total: f64 = y.iter().map(|v| (v - y_mean) * (v - y_mean)).sum();
    let ss_residual: f64 = residuals.iter().map(|r| r * r).sum();
    let constant_response = is_effectively_constant(y, config.tolerance);

    let (r_squared, adjusted_r_squared, f_statistic, p_value) = if constant_response {
        (0.0, 0.0, 0.0, 1.0)
    } else {
        let r2 = (1.0 - ss_residual / ss_total).clamp(0.0, 1.0);
        let adjusted = 1.0 - (1.0 - r2) * (nf - 1.0) / df_residual;
        if ss_residual <= config.tolerance * config.tolerance * ss_total {
            (r2, adjusted, f64::INFINITY, 0.0)
        } else {
            let ss_model = (ss_total - ss_residual).max(0.0);
            let f = (ss_model / df_model) / (ss_residual / df_residual);
            (r2, adjusted, f, f_p_value(f, df_model, df_residual)?)
        }
    };

    let sigma2 = ss_residual / df_residual;
    let standard_errors: Vec<f64> = coefficient_standard_errors(qr.r(), sigma2)?
        .into_iter()
        .zip(&column_norms)
        .map(|(se, s)| se / s)
        .collect();
    let t_statistics: Vec<f64> = coefficients
        .iter()
        .zip(&standard_errors)
        .map(|(&b, &se)| {
            if se > 0.0 {
                b / se
            } else if b == 0.0 {
                0.0
            } else {
                b.signum() * f64::INFINITY
            }
        })
        .collect();
    let coefficient_p_values = t_statistics
        .iter()
        .map(|&t| t_two_tailed_p_value(t, df_residual))
        .collect::<AnalyticsResult<Vec<_>>>()?;

    let outliers = flag_outliers(&residuals, std_dev(y), sigma2.sqrt(), config);

    Ok(RegressionResult {
        kind: if predictors == 1 {
            RegressionKind::Simple
        } else {
            RegressionKind::Multiple
        },
        equation: narrative::render_equation(&coefficients),
        coefficients,
        standard_errors,
        t_statistics,
        coefficient_p_values,
        r_squared,
        adjusted_r_squared,
        f_statistic,
        p_value,
        is_significant: config.is_significant(p_value),
        outliers,
        residuals,
        fitted_values,
        residual_standard_error: sigma2.sqrt(),
        iterations,
    })
}

/// Simple linear regression of `y` on a single predictor `x`.
///
/// # Example
/// ```rust
/// use insight_analytics::{simple_regression, AnalyticsConfig};
///
/// let spend = [1.0, 2.0, 3.0, 4.0, 5.0];
/// let sales = [3.0, 5.0, 7.0, 9.0, 11.0];
/// let model = simple_regression(&spend, &sales, &AnalyticsConfig::default()).unwrap();
/// assert_eq!(model.equation, "y = 1 + 2*x1");
/// ```
pub fn simple_regression(
    x: &[f64],
    y: &[f64],
    config: &AnalyticsConfig,
) -> AnalyticsResult<RegressionResult> {
    if x.len() != y.len() {
        return Err(AnalyticsError::LengthMismatch {
            expected: y.len(),
            actual: x.len(),
        });
    }
    let rows: Vec<Vec<f64>> = x.iter().map(|&v| vec![v]).collect();
    multiple_regression(y, &rows, config)
}

/// Initial QR solve followed by iterative refinement on the residuals.
fn refine(
    qr: &HouseholderQr,
    design: &[Vec<f64>],
    y: &[f64],
    config: &AnalyticsConfig,
) -> AnalyticsResult<(Vec<f64>, usize)> {
    let mut beta = qr.solve(y)?;
    for step in 1..=config.max_iterations {
        let residuals = compute_residuals(design, y, &beta);
        let correction = qr.solve(&residuals)?;
        for (b, c) in beta.iter_mut().zip(&correction) {
            *b += c;
        }
        if max_abs(&correction) <= config.tolerance * (1.0 + max_abs(&beta)) {
            return Ok((beta, step));
        }
    }
    Err(AnalyticsError::ConvergenceFailure {
        routine: "least-squares refinement".to_string(),
        iterations: config.max_iterations,
    })
}

/// sqrt(σ̂² · diag((RᵀR)⁻¹)) with (RᵀR)⁻¹ = R⁻¹R⁻ᵀ.
fn coefficient_standard_errors(r: &[Vec<f64>], sigma2: f64) -> AnalyticsResult<Vec<f64>> {
    let k = r.len();
    let r = DMatrix::from_fn(k, k, |i, j| r[i][j]);
    let r_inv = r
        .solve_upper_triangular(&DMatrix::identity(k, k))
        .ok_or_else(|| {
            AnalyticsError::numerical("triangular factor is not invertible", "coefficient_covariance")
        })?;
    let unscaled = &r_inv * r_inv.transpose();
    Ok((0..k)
        .map(|j| (sigma2 * unscaled[(j, j)]).max(0.0).sqrt())
        .collect())
}

fn flag_outliers(
    residuals: &[f64],
    response_sd: f64,
    residual_standard_error: f64,
    config: &AnalyticsConfig,
) -> Vec<usize> {
    let floor = config.tolerance * (1.0 + response_sd);
    // A zero MAD (most residuals equal) falls back to the residual standard error
    let (center, scale) = config
        .robust_methods
        .then(|| location_scale(residuals, true))
        .filter(|&(_, scale)| scale >= floor && scale > 0.0)
        .unwrap_or((0.0, residual_standard_error));
    if !(scale >= floor) || scale == 0.0 {
        return Vec::new();
    }
    residuals
        .iter()
        .enumerate()
        .filter(|(_, &r)| ((r - center) / scale).abs() > config.outlier_threshold)
        .map(|(i, _)| i)
        .collect()
}
