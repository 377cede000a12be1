//! Reference distributions for p-values and critical values.
//!
//! Thin wrappers over `statrs` that map construction failures into
//! [`AnalyticsError::NumericalError`] and handle the infinite statistics
//! produced by perfect fits.

use crate::errors::{AnalyticsError, AnalyticsResult};
use once_cell::sync::Lazy;
use statrs::distribution::{ChiSquared, ContinuousCDF, FisherSnedecor, Normal, StudentsT};

// Cached standard normal distribution
static STANDARD_NORMAL: Lazy<Normal> = Lazy::new(|| {
    Normal::new(0.0, 1.0).expect("Failed to create standard normal distribution")
});

fn students_t(df: f64) -> AnalyticsResult<StudentsT> {
    StudentsT::new(0.0, 1.0, df).map_err(|_| {
        AnalyticsError::numerical(
            format!("Failed to create Student-t distribution with {} degrees of freedom", df),
            "students_t",
        )
    })
}

/// Two-tailed p-value of a t statistic.
pub fn t_two_tailed_p_value(t: f64, df: f64) -> AnalyticsResult<f64> {
    if t.is_nan() {
        return Err(AnalyticsError::numerical("t statistic is NaN", "t_two_tailed_p_value"));
    }
    if t.is_infinite() {
        return Ok(0.0);
    }
    let dist = students_t(df)?;
    Ok((2.0 * dist.sf(t.abs())).clamp(0.0, 1.0))
}

/// Quantile of the Student-t distribution.
pub fn t_quantile(p: f64, df: f64) -> AnalyticsResult<f64> {
    Ok(students_t(df)?.inverse_cdf(p))
}

/// Upper-tail p-value of a chi-square statistic.
pub fn chi_squared_p_value(statistic: f64, df: f64) -> AnalyticsResult<f64> {
    if statistic.is_infinite() {
        return Ok(0.0);
    }
    let dist = ChiSquared::new(df).map_err(|_| {
        AnalyticsError::numerical(
            format!("Failed to create chi-squared distribution with {} degrees of freedom", df),
            "chi_squared_p_value",
        )
    })?;
    Ok(dist.sf(statistic.max(0.0)).clamp(0.0, 1.0))
}

/// Upper-tail p-value of an F statistic.
pub fn f_p_value(statistic: f64, df_numerator: f64, df_denominator: f64) -> AnalyticsResult<f64> {
    if statistic.is_infinite() {
        return Ok(0.0);
    }
    let dist = FisherSnedecor::new(df_numerator, df_denominator).map_err(|_| {
        AnalyticsError::numerical(
            format!(
                "Failed to create F distribution with ({}, {}) degrees of freedom",
                df_numerator, df_denominator
            ),
            "f_p_value",
        )
    })?;
    Ok(dist.sf(statistic.max(0.0)).clamp(0.0, 1.0))
}

/// Two-tailed p-value of a standard normal statistic.
pub fn normal_two_tailed_p_value(z: f64) -> f64 {
    if z.is_infinite() {
        return 0.0;
    }
    (2.0 * STANDARD_NORMAL.sf(z.abs())).clamp(0.0, 1.0)
}

/// Standard normal quantile.
pub fn normal_quantile(p: f64) -> f64 {
    STANDARD_NORMAL.inverse_cdf(p)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_t_p_values() {
        // t = 2.228 is the 97.5% quantile at 10 df
        assert_approx_eq!(t_two_tailed_p_value(2.228, 10.0).unwrap(), 0.05, 1e-3);
        assert_approx_eq!(t_two_tailed_p_value(0.0, 5.0).unwrap(), 1.0, 1e-12);
        assert_eq!(t_two_tailed_p_value(f64::INFINITY, 5.0).unwrap(), 0.0);
        assert!(t_two_tailed_p_value(f64::NAN, 5.0).is_err());
        assert!(t_two_tailed_p_value(1.0, -1.0).is_err());
    }

    #[test]
    fn test_t_quantile() {
        assert_approx_eq!(t_quantile(0.975, 10.0).unwrap(), 2.228, 1e-3);
    }

    #[test]
    fn test_chi_squared_and_f_p_values() {
        // 3.841 is the 95% quantile of chi-square(1)
        assert_approx_eq!(chi_squared_p_value(3.841, 1.0).unwrap(), 0.05, 1e-3);
        assert_approx_eq!(chi_squared_p_value(0.0, 3.0).unwrap(), 1.0, 1e-12);
        // 4.96 is the 95% quantile of F(1, 10)
        assert_approx_eq!(f_p_value(4.96, 1.0, 10.0).unwrap(), 0.05, 1e-3);
        assert_eq!(f_p_value(f64::INFINITY, 1.0, 10.0).unwrap(), 0.0);
    }

    #[test]
    fn test_normal_helpers() {
        assert_approx_eq!(normal_two_tailed_p_value(1.959964), 0.05, 1e-5);
        assert_approx_eq!(normal_quantile(0.975), 1.959964, 1e-5);
        assert_eq!(normal_two_tailed_p_value(f64::NEG_INFINITY), 0.0);
    }
}
