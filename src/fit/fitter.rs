//! Low-level fitting routine for a single polynomial trend.
//!
//! Given binned points `(x_i, y_i)` with weights `w_i`, solve the weighted OLS
//! problem for the curve's coefficients and report the residual diagnostics.

use nalgebra::{DMatrix, DVector};

use crate::domain::{Bin, CurveKind};
use crate::error::AppError;
use crate::math::{eval_poly, fill_design_row, solve_weighted_least_squares};

/// Best fit for a single curve kind.
#[derive(Debug, Clone)]
pub struct CurveFit {
    pub kind: CurveKind,
    pub coefficients: Vec<f64>,
    /// Unweighted sum of squared residuals.
    pub sse: f64,
    pub rmse: f64,
    /// Coefficient of determination (unweighted).
    pub r2: f64,
}

/// Fit one polynomial to the bins.
///
/// With `weight_by_count`, each bin weighs as many rows as it summarizes.
pub fn fit_curve(kind: CurveKind, bins: &[Bin], weight_by_count: bool) -> Result<CurveFit, AppError> {
    if bins.is_empty() {
        return Err(AppError::data("No bins to fit."));
    }

    let p = kind.param_count();
    let n = bins.len();

    let mut x = DMatrix::zeros(n, p);
    let mut row = vec![0.0; p];
    for (i, bin) in bins.iter().enumerate() {
        fill_design_row(kind.degree(), bin.x_mean, &mut row);
        for (j, v) in row.iter().enumerate() {
            x[(i, j)] = *v;
        }
    }
    let y = DVector::from_iterator(n, bins.iter().map(|b| b.y_mean));
    let weights: Vec<f64> = if weight_by_count {
        bins.iter().map(|b| b.count as f64).collect()
    } else {
        vec![1.0; n]
    };

    let Some(beta) = solve_weighted_least_squares(&x, &y, &weights) else {
        return Err(AppError::numeric(format!(
            "Least squares failed for the {} curve.",
            kind.display_name()
        )));
    };
    let coefficients: Vec<f64> = beta.iter().copied().collect();

    let y_mean = y.mean();
    let mut sse = 0.0;
    let mut sst = 0.0;
    for bin in bins {
        let r = bin.y_mean - eval_poly(&coefficients, bin.x_mean);
        sse += r * r;
        sst += (bin.y_mean - y_mean).powi(2);
    }
    if !sse.is_finite() {
        return Err(AppError::numeric("Non-finite residuals in curve fit."));
    }
    let r2 = if sst > 0.0 { 1.0 - sse / sst } else { 1.0 };

    Ok(CurveFit {
        kind,
        coefficients,
        sse,
        rmse: (sse / n as f64).sqrt(),
        r2,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bins_from(points: &[(f64, f64)]) -> Vec<Bin> {
        points
            .iter()
            .enumerate()
            .map(|(i, &(x, y))| Bin {
                index: i,
                zero_group: x == 0.0,
                count: 10,
                x_mean: x,
                x_min: x,
                x_max: x,
                y_mean: y,
            })
            .collect()
    }

    #[test]
    fn quadratic_recovers_exact_coefficients() {
        let pts: Vec<(f64, f64)> = (0..12)
            .map(|i| {
                let x = i as f64 / 11.0;
                (x, 0.1 + 0.5 * x - 0.3 * x * x)
            })
            .collect();
        let fit = fit_curve(CurveKind::Quadratic, &bins_from(&pts), false).unwrap();
        assert!((fit.coefficients[0] - 0.1).abs() < 1e-9);
        assert!((fit.coefficients[1] - 0.5).abs() < 1e-9);
        assert!((fit.coefficients[2] + 0.3).abs() < 1e-9);
        assert!(fit.sse < 1e-18);
        assert!((fit.r2 - 1.0).abs() < 1e-9);
    }

    #[test]
    fn linear_on_curved_data_leaves_residuals() {
        let pts: Vec<(f64, f64)> = (0..10).map(|i| (i as f64, (i * i) as f64)).collect();
        let fit = fit_curve(CurveKind::Linear, &bins_from(&pts), false).unwrap();
        assert!(fit.sse > 1.0);
        assert!(fit.r2 < 1.0 && fit.r2 > 0.8);
    }

    #[test]
    fn empty_bins_is_a_data_error() {
        assert_eq!(fit_curve(CurveKind::Cubic, &[], false).unwrap_err().exit_code(), 3);
    }
}
