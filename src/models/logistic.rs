//! Logistic regression fitted by iteratively reweighted least squares.
//!
//! Each Newton step solves
//!
//! ```text
//! (Xᵀ W X + λ I) δ = Xᵀ (y − μ) − λ β        W = diag(μ (1 − μ))
//! ```
//!
//! with a Cholesky factorisation. The intercept is not penalised. The small ridge
//! term keeps the optimum finite when a driver perfectly separates the classes,
//! so such fits still converge, with large slopes.

use nalgebra::{DMatrix, DVector};
use tracing::{debug, warn};

use crate::error::AppError;
use crate::math::{logit, sigmoid};
use crate::models::Classifier;
use crate::sample::FeatureTable;

#[derive(Debug, Clone, Copy)]
pub struct LogisticParams {
    pub max_iter: usize,
    /// Convergence threshold on the largest coefficient update.
    pub tol: f64,
    /// Ridge penalty on the slope coefficients.
    pub l2: f64,
}

impl Default for LogisticParams {
    fn default() -> Self {
        Self {
            max_iter: 100,
            tol: 1e-8,
            l2: 1e-6,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogisticModel {
    pub intercept: f64,
    pub coefficients: Vec<f64>,
    pub feature_names: Vec<String>,
    pub iterations: usize,
    pub converged: bool,
}

impl LogisticModel {
    pub fn linear_predictor(&self, row: &[f64]) -> f64 {
        self.intercept
            + self
                .coefficients
                .iter()
                .zip(row)
                .map(|(b, x)| b * x)
                .sum::<f64>()
    }
}

impl Classifier for LogisticModel {
    fn name(&self) -> &'static str {
        "logistic regression"
    }

    fn predict_proba_row(&self, row: &[f64]) -> f64 {
        sigmoid(self.linear_predictor(row))
    }
}

pub fn fit_logistic(x: &FeatureTable, y: &[f64], params: &LogisticParams) -> Result<LogisticModel, AppError> {
    let n = x.n_rows();
    if n == 0 || y.len() != n {
        return Err(AppError::data(format!(
            "Logistic regression needs one label per row (rows={n}, labels={}).",
            y.len()
        )));
    }
    if params.max_iter == 0 || !(params.l2.is_finite() && params.l2 >= 0.0) {
        return Err(AppError::input("Invalid logistic regression parameters."));
    }

    let p = x.n_features() + 1;
    let mut beta: DVector<f64> = DVector::zeros(p);
    let positive_rate = y.iter().sum::<f64>() / n as f64;
    beta[0] = logit(positive_rate);

    let mut converged = false;
    let mut iterations = 0;
    let mut design = vec![0.0; p];

    for iter in 0..params.max_iter {
        iterations = iter + 1;
        let mut hessian: DMatrix<f64> = DMatrix::zeros(p, p);
        let mut gradient: DVector<f64> = DVector::zeros(p);

        for (row, &yi) in x.rows().zip(y) {
            design[0] = 1.0;
            design[1..].copy_from_slice(row);
            let eta: f64 = design.iter().zip(beta.iter()).map(|(a, b)| a * b).sum();
            let mu = sigmoid(eta);
            let w = (mu * (1.0 - mu)).max(1e-10);
            let resid = yi - mu;
            for a in 0..p {
                gradient[a] += design[a] * resid;
                for b in a..p {
                    hessian[(a, b)] += w * design[a] * design[b];
                }
            }
        }
        for a in 0..p {
            for b in 0..a {
                hessian[(a, b)] = hessian[(b, a)];
            }
        }
        for a in 1..p {
            hessian[(a, a)] += params.l2;
            gradient[a] -= params.l2 * beta[a];
        }

        let Some(chol) = hessian.cholesky() else {
            return Err(AppError::numeric(format!(
                "Logistic regression Hessian is not positive definite at iteration {iterations}."
            )));
        };
        let delta = chol.solve(&gradient);
        if delta.iter().any(|d| !d.is_finite()) {
            return Err(AppError::numeric("Non-finite logistic regression update."));
        }
        beta += &delta;

        let step = delta.amax();
        debug!(iteration = iterations, step, "IRLS step");
        if step < params.tol {
            converged = true;
            break;
        }
    }

    if !converged {
        warn!(
            iterations,
            "logistic regression did not converge; classes may be separable by a driver"
        );
    }

    Ok(LogisticModel {
        intercept: beta[0],
        coefficients: beta.iter().skip(1).copied().collect(),
        feature_names: x.names().to_vec(),
        iterations,
        converged,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::Raster;

    /// One-feature table plus labels where the positive share at each `x`
    /// follows `sigmoid(-2 + 4x)` as closely as 200 replicates allow.
    fn replicated_design() -> (FeatureTable, Vec<f64>) {
        let mut xs = Vec::new();
        let mut ys = Vec::new();
        for i in 0..11 {
            let x = i as f64 / 10.0;
            let positives = (200.0 * sigmoid(-2.0 + 4.0 * x)).round() as usize;
            for k in 0..200 {
                xs.push(x);
                ys.push(if k < positives { 1.0 } else { 0.0 });
            }
        }
        let n = xs.len();
        let layer = Raster::from_vec(xs, 1, n).unwrap();
        let table = FeatureTable::from_layers(&[("x", &layer)]).unwrap();
        (table, ys)
    }

    #[test]
    fn recovers_generating_coefficients() {
        let (x, y) = replicated_design();
        let model = fit_logistic(&x, &y, &LogisticParams::default()).unwrap();
        assert!(model.converged);
        assert!((model.intercept + 2.0).abs() < 0.05, "intercept {}", model.intercept);
        assert!((model.coefficients[0] - 4.0).abs() < 0.1, "slope {}", model.coefficients[0]);
        assert_eq!(model.feature_names, vec!["x".to_string()]);
    }

    #[test]
    fn probabilities_increase_with_driver() {
        let (x, y) = replicated_design();
        let model = fit_logistic(&x, &y, &LogisticParams::default()).unwrap();
        let lo = model.predict_proba_row(&[0.1]);
        let hi = model.predict_proba_row(&[0.9]);
        assert!(lo < 0.5 && hi > 0.5);
    }

    #[test]
    fn separable_classes_are_split_exactly() {
        let xs: Vec<f64> = (0..200).map(|i| i as f64 / 199.0).collect();
        let ys: Vec<f64> = xs.iter().map(|&x| if x > 0.5 { 1.0 } else { 0.0 }).collect();
        let layer = Raster::from_vec(xs, 1, 200).unwrap();
        let table = FeatureTable::from_layers(&[("x", &layer)]).unwrap();

        let model = fit_logistic(&table, &ys, &LogisticParams::default()).unwrap();
        assert!(model.converged, "stopped after {} iterations", model.iterations);
        assert!(model.coefficients[0] > 0.0);
        let correct = table
            .rows()
            .zip(&ys)
            .filter(|(row, y)| (model.predict_proba_row(row) > 0.5) == (**y > 0.5))
            .count();
        assert_eq!(correct, 200);
    }

    #[test]
    fn label_count_mismatch_is_rejected() {
        let (x, _) = replicated_design();
        let err = fit_logistic(&x, &[1.0, 0.0], &LogisticParams::default()).unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }
}
