//! Ordinary least squares with a single predictor
//!
//! Fits `response ≈ β₀ + β₁ · predictor` and reports the usual summary
//! statistics (standard errors, t tests, R², F test).
//!
//! The estimates are computed from centered sums, which avoids forming and
//! inverting XᵀX and stays accurate when the predictor has a large mean
//! relative to its spread.

use serde::Serialize;
use statrs::distribution::{ContinuousCDF, FisherSnedecor, StudentsT};
use zonalreg_core::{Algorithm, Error, Result};

/// Predictor spreads up to this many ulps of its magnitude count as constant
const CONSTANT_TOLERANCE: f64 = 64.0;

/// Paired samples for [`Ols`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OlsInput {
    pub predictor: Vec<f64>,
    pub response: Vec<f64>,
}

/// A fitted single-predictor linear model
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OlsFit {
    pub intercept: f64,
    pub slope: f64,
    /// Fitted values, in input order
    pub fitted: Vec<f64>,
    /// `response - fitted`, in input order
    pub residuals: Vec<f64>,
    /// Mean of the response
    pub mean_y: f64,
    /// Sample standard deviation of the response (n - 1 denominator)
    pub std_y: f64,
    pub r_squared: f64,
    pub adj_r_squared: f64,
    /// Residual variance SSR / (n - 2)
    pub sigma_squared: f64,
    /// Standard errors of [intercept, slope]
    pub std_errors: [f64; 2],
    /// t statistics of [intercept, slope]
    pub t_statistics: [f64; 2],
    /// Two-sided p-values of [intercept, slope]
    pub p_values: [f64; 2],
    pub f_statistic: f64,
    pub f_p_value: f64,
    pub n_samples: usize,
    pub df_residual: usize,
}

impl OlsFit {
    /// [intercept, slope]
    pub fn coefficients(&self) -> [f64; 2] {
        [self.intercept, self.slope]
    }

    pub fn predict(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }

    /// Residual divided by the response standard deviation.
    ///
    /// A constant response has `std_y == 0` and an exact fit; its
    /// standardized residuals are 0.
    pub fn standardize(&self, residual: f64) -> f64 {
        if self.std_y > 0.0 {
            residual / self.std_y
        } else {
            0.0
        }
    }

    pub fn standardized_residuals(&self) -> Vec<f64> {
        self.residuals.iter().map(|&r| self.standardize(r)).collect()
    }

    /// Sum of squared residuals
    pub fn ssr(&self) -> f64 {
        self.residuals.iter().map(|r| r * r).sum()
    }
}

/// OLS estimator
#[derive(Debug, Clone, Default)]
pub struct Ols;

impl Algorithm for Ols {
    type Input = OlsInput;
    type Output = OlsFit;
    type Params = ();
    type Error = Error;

    fn name(&self) -> &'static str {
        "OLS"
    }

    fn description(&self) -> &'static str {
        "Single-predictor ordinary least squares regression"
    }

    fn execute(&self, input: Self::Input, _params: Self::Params) -> Result<Self::Output> {
        fit(&input.predictor, &input.response)
    }
}

/// Fit `response ≈ intercept + slope * predictor`.
///
/// # Errors
/// - [`Error::LengthMismatch`] if the slices differ in length
/// - [`Error::InsufficientSamples`] with fewer than 2 pairs
/// - [`Error::InvalidSample`] for a NaN or infinite value
/// - [`Error::SingularDesign`] if the predictor is constant
///
/// With exactly 2 pairs the line passes through both and there are no
/// residual degrees of freedom: standard errors, t statistics, p-values and
/// the F test are NaN.
pub fn fit(predictor: &[f64], response: &[f64]) -> Result<OlsFit> {
    if predictor.len() != response.len() {
        return Err(Error::LengthMismatch {
            predictor: predictor.len(),
            response: response.len(),
        });
    }
    let n = predictor.len();
    if n < 2 {
        return Err(Error::InsufficientSamples { needed: 2, got: n });
    }
    if let Some(index) = (0..n).find(|&i| !(predictor[i].is_finite() && response[i].is_finite())) {
        return Err(Error::InvalidSample {
            index,
            predictor: predictor[index],
            response: response[index],
        });
    }

    let nf = n as f64;
    let mean_x = predictor.iter().sum::<f64>() / nf;
    let mean_y = response.iter().sum::<f64>() / nf;

    let mut sxx = 0.0;
    let mut sxy = 0.0;
    let mut syy = 0.0;
    for (&x, &y) in predictor.iter().zip(response) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        sxx += dx * dx;
        sxy += dx * dy;
        syy += dy * dy;
    }

    // Spread within a few ulps of the values is rounding noise
    let (min_x, max_x) = predictor
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &x| (lo.min(x), hi.max(x)));
    let scale = min_x.abs().max(max_x.abs());
    if max_x - min_x <= CONSTANT_TOLERANCE * f64::EPSILON * scale || !(sxx > 0.0 && sxx.is_finite()) {
        return Err(Error::SingularDesign(format!(
            "predictor is constant ({} samples in [{}, {}])",
            n, min_x, max_x
        )));
    }

    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;

    let fitted: Vec<f64> = predictor.iter().map(|&x| intercept + slope * x).collect();
    let residuals: Vec<f64> = response.iter().zip(&fitted).map(|(y, f)| y - f).collect();

    let ssr: f64 = residuals.iter().map(|r| r * r).sum();
    let sst = syy;
    let r_squared = if sst > 0.0 { 1.0 - ssr / sst } else { 1.0 };

    let df_residual = n - 2;
    let df = df_residual as f64;

    let (sigma_squared, adj_r_squared) = if df_residual > 0 {
        (ssr / df, 1.0 - (1.0 - r_squared) * (nf - 1.0) / df)
    } else {
        (f64::NAN, f64::NAN)
    };

    let se_intercept = (sigma_squared * (1.0 / nf + mean_x * mean_x / sxx)).sqrt();
    let se_slope = (sigma_squared / sxx).sqrt();
    let std_errors = [se_intercept, se_slope];

    let t_statistics = [
        t_statistic(intercept, se_intercept),
        t_statistic(slope, se_slope),
    ];
    let p_values = [
        t_p_value(t_statistics[0], df),
        t_p_value(t_statistics[1], df),
    ];

    let f_statistic = if sigma_squared > 0.0 {
        (sst - ssr).max(0.0) / sigma_squared
    } else {
        f64::NAN
    };
    let f_p_value = f_p_value(f_statistic, df);

    Ok(OlsFit {
        intercept,
        slope,
        fitted,
        residuals,
        mean_y,
        std_y: (syy / (nf - 1.0)).sqrt(),
        r_squared,
        adj_r_squared,
        sigma_squared,
        std_errors,
        t_statistics,
        p_values,
        f_statistic,
        f_p_value,
        n_samples: n,
        df_residual,
    })
}

fn t_statistic(coefficient: f64, std_error: f64) -> f64 {
    if std_error.is_nan() || std_error == 0.0 {
        f64::NAN
    } else {
        coefficient / std_error
    }
}

/// p = 2 · P(T > |t|), T ~ t(df)
fn t_p_value(t: f64, df: f64) -> f64 {
    if t.is_nan() || df <= 0.0 {
        return f64::NAN;
    }
    StudentsT::new(0.0, 1.0, df).map_or(f64::NAN, |dist| 2.0 * dist.sf(t.abs()))
}

/// p = P(F > f), F ~ F(1, df)
fn f_p_value(f: f64, df: f64) -> f64 {
    if f.is_nan() || df <= 0.0 {
        return f64::NAN;
    }
    FisherSnedecor::new(1.0, df).map_or(f64::NAN, |dist| dist.sf(f))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_exact_linear_relationship() {
        // y = 2x + 1
        let x: Vec<f64> = (0..6).map(|i| i as f64).collect();
        let y: Vec<f64> = x.iter().map(|v| 2.0 * v + 1.0).collect();

        let model = fit(&x, &y).unwrap();

        assert_relative_eq!(model.intercept, 1.0, epsilon = 1e-10);
        assert_relative_eq!(model.slope, 2.0, epsilon = 1e-10);
        assert_relative_eq!(model.r_squared, 1.0, epsilon = 1e-10);
        for r in &model.residuals {
            assert!(r.abs() < 1e-10);
        }
        assert_eq!(model.coefficients(), [model.intercept, model.slope]);
    }

    #[test]
    fn test_known_values() {
        // Hand-checked: x̄ = 3, ȳ = 4, Sxx = 10, Sxy = 8, Syy = 10
        let x = [1.0, 2.0, 3.0, 4.0, 5.0];
        let y = [2.0, 4.0, 5.0, 4.0, 5.0];

        let model = fit(&x, &y).unwrap();

        assert_relative_eq!(model.slope, 0.6, epsilon = 1e-12);
        assert_relative_eq!(model.intercept, 2.2, epsilon = 1e-12);
        // SSR = 10 - 0.6 * 8 = 5.2
        assert_relative_eq!(model.ssr(), 5.2, epsilon = 1e-12);
        assert_relative_eq!(model.r_squared, 0.48, epsilon = 1e-12);
        assert_relative_eq!(model.sigma_squared, 5.2 / 3.0, epsilon = 1e-12);
        assert_relative_eq!(model.std_errors[1], (5.2 / 3.0 / 10.0_f64).sqrt(), epsilon = 1e-12);
        assert_relative_eq!(
            model.std_errors[0],
            (5.2 / 3.0 * (0.2 + 9.0 / 10.0_f64)).sqrt(),
            epsilon = 1e-12
        );
        assert_relative_eq!(model.std_y, (10.0_f64 / 4.0).sqrt(), epsilon = 1e-12);
        assert_relative_eq!(model.adj_r_squared, 1.0 - 0.52 * 4.0 / 3.0, epsilon = 1e-12);
        // F = SSreg / σ² = 4.8 / (5.2 / 3)
        assert_relative_eq!(model.f_statistic, 4.8 * 3.0 / 5.2, epsilon = 1e-10);
        // For one predictor F = t²
        assert_relative_eq!(model.f_statistic, model.t_statistics[1].powi(2), epsilon = 1e-10);
        assert_relative_eq!(model.f_p_value, model.p_values[1], epsilon = 1e-6);
        assert!(model.p_values[1] > 0.1 && model.p_values[1] < 0.3);
        assert_eq!(model.df_residual, 3);
    }

    #[test]
    fn test_residuals_sum_to_zero() {
        let x = [0.3, 1.7, 2.2, 4.9, 5.1, 7.4, 8.8];
        let y = [12.0, 9.5, 14.1, 7.7, 10.2, 3.3, 6.9];

        let model = fit(&x, &y).unwrap();
        let total: f64 = model.residuals.iter().sum();
        assert!(total.abs() < 1e-10, "sum of residuals = {}", total);

        for ((f, r), yi) in model.fitted.iter().zip(&model.residuals).zip(&y) {
            assert_relative_eq!(f + r, *yi, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_standardized_residuals() {
        let x = [1.0, 2.0, 3.0, 4.0, 5.0];
        let y = [2.0, 4.0, 5.0, 4.0, 5.0];
        let model = fit(&x, &y).unwrap();

        let std = model.standardized_residuals();
        for (s, r) in std.iter().zip(&model.residuals) {
            assert_relative_eq!(*s, r / model.std_y, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_two_samples_exact_fit() {
        let model = fit(&[1.0, 3.0], &[5.0, 9.0]).unwrap();

        assert_relative_eq!(model.slope, 2.0, epsilon = 1e-12);
        assert_relative_eq!(model.intercept, 3.0, epsilon = 1e-12);
        assert_relative_eq!(model.r_squared, 1.0, epsilon = 1e-12);
        assert!(model.residuals.iter().all(|r| r.abs() < 1e-12));
        assert_eq!(model.df_residual, 0);
        assert!(model.std_errors[0].is_nan() && model.std_errors[1].is_nan());
        assert!(model.p_values[1].is_nan());
        assert!(model.f_statistic.is_nan());
    }

    #[test]
    fn test_constant_response() {
        let model = fit(&[1.0, 2.0, 3.0], &[4.0, 4.0, 4.0]).unwrap();

        assert_eq!(model.slope, 0.0);
        assert_eq!(model.std_y, 0.0);
        assert_eq!(model.r_squared, 1.0);
        assert!(model.standardized_residuals().iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_large_offset_predictor() {
        // Same shape as test_known_values, shifted far from the origin
        let x: Vec<f64> = [1.0, 2.0, 3.0, 4.0, 5.0].iter().map(|v| v + 1.0e7).collect();
        let y = [2.0, 4.0, 5.0, 4.0, 5.0];

        let model = fit(&x, &y).unwrap();
        assert_relative_eq!(model.slope, 0.6, epsilon = 1e-9);
        assert_relative_eq!(model.r_squared, 0.48, epsilon = 1e-9);
    }

    #[test]
    fn test_single_sample_rejected() {
        let err = fit(&[1.0], &[2.0]).unwrap_err();
        assert!(matches!(err, Error::InsufficientSamples { needed: 2, got: 1 }));

        let err = fit(&[], &[]).unwrap_err();
        assert!(matches!(err, Error::InsufficientSamples { needed: 2, got: 0 }));
    }

    #[test]
    fn test_non_finite_rejected() {
        let err = fit(&[1.0, 2.0, 3.0], &[1.0, f64::NAN, 3.0]).unwrap_err();
        assert!(matches!(err, Error::InvalidSample { index: 1, .. }));

        let err = fit(&[1.0, f64::INFINITY], &[1.0, 2.0]).unwrap_err();
        assert!(matches!(err, Error::InvalidSample { index: 1, .. }));
    }

    #[test]
    fn test_length_mismatch_and_constant_predictor() {
        let err = fit(&[1.0, 2.0], &[1.0, 2.0, 3.0]).unwrap_err();
        assert!(matches!(err, Error::LengthMismatch { predictor: 2, response: 3 }));

        let err = fit(&[2.0, 2.0, 2.0], &[1.0, 2.0, 3.0]).unwrap_err();
        assert!(matches!(err, Error::SingularDesign(_)));
    }

    #[test]
    fn test_predictor_constant_up_to_rounding() {
        // Means of a constant 0.1 surface summed over different cell counts
        let x = [
            0.09999999999999978,
            0.10000000000000005,
            0.10000000000000071,
            0.10000000000000002,
        ];
        let err = fit(&x, &[1.0, 2.0, 3.0, 4.0]).unwrap_err();
        assert!(matches!(err, Error::SingularDesign(_)));

        // A small but real spread is still fitted
        let model = fit(&[0.1, 0.1 + 1e-9, 0.1 + 2e-9], &[1.0, 2.0, 3.0]).unwrap();
        assert_relative_eq!(model.slope, 1e9, max_relative = 1e-5);
    }

    #[test]
    fn test_algorithm_trait() {
        let input = OlsInput {
            predictor: vec![0.0, 1.0, 2.0],
            response: vec![1.0, 3.0, 5.0],
        };
        let model = Ols.execute_default(input).unwrap();
        assert_relative_eq!(model.predict(10.0), 21.0, epsilon = 1e-10);
    }
}
