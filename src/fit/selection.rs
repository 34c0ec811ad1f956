//! Trend selection (linear vs quadratic vs cubic) by information criterion.
//!
//! The tool fits each enabled curve and computes:
//! - SSE / RMSE / R²
//! - AIC = n * ln(SSE/n) + 2k
//! - BIC = n * ln(SSE/n) + k * ln(n)
//!
//! Selection rules:
//! 1. Exclude underdetermined curves: require `n >= k + 2`
//! 2. Choose the curve with the minimum criterion
//! 3. If a simpler curve is within 2 points of the best, pick the simpler curve

use tracing::{debug, info};

use crate::domain::{Bin, Criterion, CurveKind, CurveModel, CurveSpec, FitQuality, FitResult};
use crate::error::AppError;
use crate::fit::fitter::{CurveFit, fit_curve};
use crate::math::{eval_poly, linspace};

/// Minimum number of bins beyond the coefficient count.
const MIN_N_BUFFER: usize = 2;

/// Criterion difference under which the simpler curve is preferred.
const SIMPLICITY_MARGIN: f64 = 2.0;

/// Output of fitting + selection.
#[derive(Debug, Clone)]
pub struct FitSelection {
    pub best: FitResult,
    /// Fits for all attempted curves (after guardrails).
    pub fits: Vec<FitResult>,
    /// Any curves that were skipped and why (for diagnostics).
    pub skipped: Vec<(CurveKind, String)>,
    pub criterion: Criterion,
}

/// Fit the requested curves to the bins and select the best one.
pub fn fit_and_select(
    bins: &[Bin],
    spec: CurveSpec,
    criterion: Criterion,
    weight_by_count: bool,
) -> Result<FitSelection, AppError> {
    let n = bins.len();

    let kinds: Vec<CurveKind> = match spec {
        CurveSpec::Linear => vec![CurveKind::Linear],
        CurveSpec::Quadratic => vec![CurveKind::Quadratic],
        CurveSpec::Cubic => vec![CurveKind::Cubic],
        CurveSpec::Auto => CurveKind::ALL.to_vec(),
    };

    let mut fits = Vec::new();
    let mut skipped = Vec::new();

    for kind in kinds {
        let k = kind.param_count();
        if n < k + MIN_N_BUFFER {
            skipped.push((
                kind,
                format!("Underdetermined: n={n} < k+{MIN_N_BUFFER}={}", k + MIN_N_BUFFER),
            ));
            continue;
        }
        let fit = fit_curve(kind, bins, weight_by_count)?;
        let result = to_fit_result(fit, n);
        debug!(
            curve = kind.display_name(),
            sse = result.quality.sse,
            r2 = result.quality.r2,
            aic = result.quality.aic,
            bic = result.quality.bic,
            "fitted trend curve"
        );
        fits.push(result);
    }

    if fits.is_empty() {
        return Err(AppError::data(
            "Insufficient bins to fit any curve after guardrails.",
        ));
    }

    // A single requested curve is the best by definition.
    let best = if matches!(spec, CurveSpec::Linear | CurveSpec::Quadratic | CurveSpec::Cubic) {
        fits[0].clone()
    } else {
        select_by_criterion(&fits, criterion)
    };
    info!(
        curve = best.model.kind.display_name(),
        criterion = criterion.label(),
        value = best.quality.criterion(criterion),
        "selected trend curve"
    );

    Ok(FitSelection {
        best,
        fits,
        skipped,
        criterion,
    })
}

fn to_fit_result(fit: CurveFit, n: usize) -> FitResult {
    let k = fit.kind.param_count();
    FitResult {
        model: CurveModel {
            kind: fit.kind,
            display_name: fit.kind.display_name().to_string(),
            coefficients: fit.coefficients,
        },
        quality: FitQuality {
            sse: fit.sse,
            rmse: fit.rmse,
            r2: fit.r2,
            aic: aic(n, fit.sse, k),
            bic: bic(n, fit.sse, k),
            n,
        },
    }
}

fn log_likelihood_term(n: usize, sse: f64) -> f64 {
    let n_f = n as f64;
    let sse_per = (sse / n_f).max(1e-12);
    n_f * sse_per.ln()
}

pub fn aic(n: usize, sse: f64, k: usize) -> f64 {
    log_likelihood_term(n, sse) + 2.0 * k as f64
}

pub fn bic(n: usize, sse: f64, k: usize) -> f64 {
    log_likelihood_term(n, sse) + k as f64 * (n as f64).ln()
}

fn select_by_criterion(fits: &[FitResult], criterion: Criterion) -> FitResult {
    let mut best = &fits[0];
    for f in &fits[1..] {
        if f.quality.criterion(criterion) < best.quality.criterion(criterion) {
            best = f;
        }
    }

    let best_value = best.quality.criterion(criterion);

    // Iterate in order of increasing complexity and pick the first fit that is
    // close enough to the best.
    for kind in CurveKind::ALL {
        if let Some(f) = fits.iter().find(|f| f.model.kind == kind) {
            if f.quality.criterion(criterion) <= best_value + SIMPLICITY_MARGIN {
                return f.clone();
            }
        }
    }

    best.clone()
}

/// Evaluate a curve on a grid of x values.
pub fn fitted_grid(model: &CurveModel, xs: &[f64]) -> Vec<f64> {
    xs.iter().map(|&x| eval_poly(&model.coefficients, x)).collect()
}

/// `n` evenly spaced `(x, y)` points of a curve across `[x_min, x_max]`.
pub fn sample_curve(model: &CurveModel, x_min: f64, x_max: f64, n: usize) -> Vec<(f64, f64)> {
    let xs = linspace(x_min, x_max, n.max(2));
    let ys = fitted_grid(model, &xs);
    xs.into_iter().zip(ys).collect()
}
