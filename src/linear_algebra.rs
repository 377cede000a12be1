//! Linear algebra operations for least-squares regression
//!
//! Householder QR factorization with the reflectors kept, so the same
//! factorization can project several right-hand sides (the response and the
//! residuals of each refinement step) without forming Q explicitly.

use crate::errors::{AnalyticsError, AnalyticsResult};

/// Validates that input contains no NaN or Inf values
fn ensure_finite_matrix(a: &[Vec<f64>], operation: &str) -> AnalyticsResult<()> {
    for (i, row) in a.iter().enumerate() {
        for (j, &val) in row.iter().enumerate() {
            if !val.is_finite() {
                return Err(AnalyticsError::numerical(
                    format!("Non-finite value ({}) at position [{},{}]", val, i, j),
                    operation,
                ));
            }
        }
    }
    Ok(())
}

/// Validates that a matrix is rectangular (not ragged) and non-empty
fn ensure_rectangular_matrix(a: &[Vec<f64>]) -> AnalyticsResult<(usize, usize)> {
    if a.is_empty() {
        return Err(AnalyticsError::InvalidInput {
            reason: "empty matrix provided".to_string(),
        });
    }

    let n = a[0].len();
    if n == 0 {
        return Err(AnalyticsError::InvalidInput {
            reason: "zero-width matrix (no columns)".to_string(),
        });
    }

    if let Some(row) = a.iter().position(|row| row.len() != n) {
        return Err(AnalyticsError::InvalidInput {
            reason: format!(
                "ragged matrix: row {} has {} columns, expected {}",
                row,
                a[row].len(),
                n
            ),
        });
    }

    Ok((a.len(), n))
}

/// Householder QR factorization of an m×n matrix with m ≥ n.
///
/// `A = Q·R` with `R` upper triangular; Q is kept as its sequence of unit
/// reflectors.
#[derive(Debug, Clone)]
pub struct HouseholderQr {
    rows: usize,
    cols: usize,
    r: Vec<Vec<f64>>,
    // Reflector k acts on rows k..m; empty when column k was already zero
    reflectors: Vec<Vec<f64>>,
}

impl HouseholderQr {
    /// Factorize `a` (row-major, one row per observation).
    ///
    /// # Errors
    /// - `InvalidInput` for an empty, ragged or underdetermined matrix
    /// - `NumericalError` for non-finite entries
    pub fn factorize(a: &[Vec<f64>]) -> AnalyticsResult<Self> {
        let (m, n) = ensure_rectangular_matrix(a)?;
        ensure_finite_matrix(a, "householder_qr")?;
        if n > m {
            return Err(AnalyticsError::InvalidInput {
                reason: format!("underdetermined system: {} rows, {} columns", m, n),
            });
        }

        let mut work = a.to_vec();
        let mut reflectors = Vec::with_capacity(n);

        for k in 0..n {
            let mut v: Vec<f64> = (k..m).map(|i| work[i][k]).collect();
            let norm_x = v.iter().map(|x| x * x).sum::<f64>().sqrt();
            if norm_x == 0.0 {
                reflectors.push(Vec::new());
                continue;
            }

            let sign = if v[0] >= 0.0 { 1.0 } else { -1.0 };
            v[0] += sign * norm_x;
            let norm_v = v.iter().map(|x| x * x).sum::<f64>().sqrt();
            for vi in &mut v {
                *vi /= norm_v;
            }

            for j in k..n {
                let dot: f64 = (k..m).map(|i| v[i - k] * work[i][j]).sum();
                for i in k..m {
                    work[i][j] -= 2.0 * v[i - k] * dot;
                }
            }
            reflectors.push(v);
        }

        let r = (0..n)
            .map(|i| (0..n).map(|j| if j >= i { work[i][j] } else { 0.0 }).collect())
            .collect();

        Ok(Self {
            rows: m,
            cols: n,
            r,
            reflectors,
        })
    }

    /// Number of columns
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// The n×n upper-triangular factor
    pub fn r(&self) -> &[Vec<f64>] {
        &self.r
    }

    /// Numerical rank: diagonal entries with |R_kk| > tolerance · max|R_jj|.
    pub fn numerical_rank(&self, tolerance: f64) -> usize {
        let max_diag = (0..self.cols)
            .map(|k| self.r[k][k].abs())
            .fold(0.0, f64::max);
        if max_diag == 0.0 {
            return 0;
        }
        (0..self.cols)
            .filter(|&k| self.r[k][k].abs() > tolerance * max_diag)
            .count()
    }

    /// Compute Qᵀb.
    pub fn apply_qt(&self, b: &[f64]) -> AnalyticsResult<Vec<f64>> {
        if b.len() != self.rows {
            return Err(AnalyticsError::LengthMismatch {
                expected: self.rows,
                actual: b.len(),
            });
        }
        let mut y = b.to_vec();
        for (k, v) in self.reflectors.iter().enumerate() {
            if v.is_empty() {
                continue;
            }
            let dot: f64 = (k..self.rows).map(|i| v[i - k] * y[i]).sum();
            for i in k..self.rows {
                y[i] -= 2.0 * v[i - k] * dot;
            }
        }
        Ok(y)
    }

    /// Least-squares solution of `A·x ≈ b` by back-substitution on R.
    ///
    /// Callers check [`numerical_rank`](Self::numerical_rank) first; a zero
    /// pivot here is a `NumericalError`.
    pub fn solve(&self, b: &[f64]) -> AnalyticsResult<Vec<f64>> {
        let qtb = self.apply_qt(b)?;
        let n = self.cols;
        let mut x = vec![0.0; n];
        for i in (0..n).rev() {
            let pivot = self.r[i][i];
            if pivot == 0.0 {
                return Err(AnalyticsError::numerical(
                    format!("zero pivot in column {}", i),
                    "qr_back_substitution",
                ));
            }
            let sum: f64 = qtb[i] - (i + 1..n).map(|j| self.r[i][j] * x[j]).sum::<f64>();
            x[i] = sum / pivot;
        }
        Ok(x)
    }
}

/// Scale every column of `a` to unit Euclidean norm.
///
/// Returns the scaled matrix and the column norms; an all-zero column keeps
/// a norm of 1 so it still shows up as rank-deficient. The solution of the
/// scaled system divided element-wise by the norms solves the original one.
pub fn equilibrate_columns(a: &[Vec<f64>]) -> (Vec<Vec<f64>>, Vec<f64>) {
    let cols = a.first().map_or(0, Vec::len);
    let norms: Vec<f64> = (0..cols)
        .map(|j| {
            let norm = a.iter().map(|row| row[j] * row[j]).sum::<f64>().sqrt();
            if norm > 0.0 {
                norm
            } else {
                1.0
            }
        })
        .collect();
    let scaled = a
        .iter()
        .map(|row| row.iter().zip(&norms).map(|(v, s)| v / s).collect())
        .collect();
    (scaled, norms)
}

/// Matrix-vector product `A·x`.
pub fn mat_vec(a: &[Vec<f64>], x: &[f64]) -> Vec<f64> {
    a.iter()
        .map(|row| row.iter().zip(x).map(|(aij, xj)| aij * xj).sum())
        .collect()
}

/// Residuals `y − A·β`.
pub fn compute_residuals(a: &[Vec<f64>], y: &[f64], coeffs: &[f64]) -> Vec<f64> {
    mat_vec(a, coeffs)
        .into_iter()
        .zip(y)
        .map(|(fit, yi)| yi - fit)
        .collect()
}

/// Max-norm of a vector
pub fn max_abs(v: &[f64]) -> f64 {
    v.iter().fold(0.0, |acc, x| acc.max(x.abs()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn design(xs: &[f64]) -> Vec<Vec<f64>> {
        xs.iter().map(|&x| vec![1.0, x]).collect()
    }

    #[test]
    fn test_qr_reproduces_exact_line() {
        let a = design(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        let b = vec![3.0, 5.0, 7.0, 9.0, 11.0];
        let qr = HouseholderQr::factorize(&a).unwrap();
        assert_eq!(qr.numerical_rank(1e-8), 2);

        let x = qr.solve(&b).unwrap();
        assert_approx_eq!(x[0], 1.0, 1e-10);
        assert_approx_eq!(x[1], 2.0, 1e-10);
        for r in compute_residuals(&a, &b, &x) {
            assert_approx_eq!(r, 0.0, 1e-10);
        }
    }

    #[test]
    fn test_r_factor_is_upper_triangular_and_preserves_norms() {
        let a = vec![
            vec![1.0, 2.0, 0.5],
            vec![1.0, -1.0, 2.0],
            vec![1.0, 0.0, 1.0],
            vec![1.0, 3.0, -1.0],
        ];
        let qr = HouseholderQr::factorize(&a).unwrap();
        let r = qr.r();
        for i in 0..3 {
            for j in 0..i {
                assert_eq!(r[i][j], 0.0);
            }
        }
        // Column norms of A equal column norms of R (Q is orthogonal)
        for j in 0..3 {
            let a_norm: f64 = a.iter().map(|row| row[j] * row[j]).sum();
            let r_norm: f64 = r.iter().map(|row| row[j] * row[j]).sum();
            assert_approx_eq!(a_norm, r_norm, 1e-10);
        }

        let b = vec![1.0, 2.0, 3.0, 4.0];
        let qtb = qr.apply_qt(&b).unwrap();
        let b_norm: f64 = b.iter().map(|v| v * v).sum();
        let qtb_norm: f64 = qtb.iter().map(|v| v * v).sum();
        assert_approx_eq!(b_norm, qtb_norm, 1e-10);
    }

    #[test]
    fn test_rank_deficiency_is_detected() {
        // Third column is twice the second
        let a: Vec<Vec<f64>> = (0..6).map(|i| vec![1.0, i as f64, 2.0 * i as f64]).collect();
        let qr = HouseholderQr::factorize(&a).unwrap();
        assert_eq!(qr.numerical_rank(1e-8), 2);
    }

    #[test]
    fn test_rank_is_unit_free_after_equilibration() {
        for scale in [1e8, 1e-9] {
            let a = design(&(1..=8).map(|i| i as f64 * scale).collect::<Vec<_>>());
            let (scaled, norms) = equilibrate_columns(&a);
            assert_approx_eq!(norms[0], 8f64.sqrt(), 1e-12);
            for j in 0..2 {
                let norm: f64 = scaled.iter().map(|row| row[j] * row[j]).sum();
                assert_approx_eq!(norm, 1.0, 1e-12);
            }
            let qr = HouseholderQr::factorize(&scaled).unwrap();
            assert_eq!(qr.numerical_rank(1e-8), 2);
        }

        let (_, norms) = equilibrate_columns(&[vec![1.0, 0.0], vec![1.0, 0.0]]);
        assert_eq!(norms[1], 1.0);
    }

    #[test]
    fn test_invalid_matrices() {
        assert!(matches!(
            HouseholderQr::factorize(&[]),
            Err(AnalyticsError::InvalidInput { .. })
        ));
        assert!(matches!(
            HouseholderQr::factorize(&[vec![1.0, 2.0], vec![1.0]]),
            Err(AnalyticsError::InvalidInput { .. })
        ));
        assert!(matches!(
            HouseholderQr::factorize(&[vec![1.0, 2.0, 3.0]]),
            Err(AnalyticsError::InvalidInput { .. })
        ));
        assert!(matches!(
            HouseholderQr::factorize(&[vec![1.0, f64::NAN], vec![1.0, 2.0]]),
            Err(AnalyticsError::NumericalError { .. })
        ));

        let qr = HouseholderQr::factorize(&design(&[1.0, 2.0, 3.0])).unwrap();
        assert!(matches!(
            qr.apply_qt(&[1.0, 2.0]),
            Err(AnalyticsError::LengthMismatch { expected: 3, actual: 2 })
        ));
    }

    #[test]
    fn test_max_abs_and_mat_vec() {
        assert_eq!(max_abs(&[1.0, -3.0, 2.0]), 3.0);
        assert_eq!(max_abs(&[]), 0.0);
        assert_eq!(mat_vec(&[vec![1.0, 2.0], vec![3.0, 4.0]], &[1.0, 1.0]), vec![3.0, 7.0]);
    }
}
