//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the raster/fitting code stays clean and testable
//! - output changes are localized

use crate::app::pipeline::{CurveRun, PredictRun};
use crate::domain::Bin;
use crate::models::ClassificationMetrics;

/// Format the curve run summary (sample stats + fit diagnostics + chosen curve).
pub fn format_curve_summary(run: &CurveRun) -> String {
    let mut out = String::new();
    let selection = &run.selection;

    out.push_str("=== lues - ES accessibility vs land-use density ===\n");
    out.push_str(&format!("Class: {}\n", run.class.display_name()));
    out.push_str(&format!("Grid: {} x {} cells\n", run.grid_shape.0, run.grid_shape.1));
    out.push_str(&format!(
        "Samples: n={} | zero accessibility={} | groups={}\n",
        run.n_samples,
        run.n_zero,
        run.bins.len()
    ));

    out.push_str(&format!("\nCurve diagnostics ({}):\n", selection.criterion.label()));
    for fit in &selection.fits {
        let chosen = if fit.model.kind == selection.best.model.kind { "*" } else { " " };
        out.push_str(&format!(
            "{chosen} {:<10} SSE={:.5} RMSE={:.4} R2={:.4} AIC={:.3} BIC={:.3}\n",
            fit.model.display_name, fit.quality.sse, fit.quality.rmse, fit.quality.r2, fit.quality.aic, fit.quality.bic
        ));
    }
    for (kind, reason) in &selection.skipped {
        out.push_str(&format!("  (skipped {}) {reason}\n", kind.display_name()));
    }

    out.push_str("\nChosen curve:\n");
    out.push_str(&format!("- {}\n", selection.best.model.display_name));
    out.push_str(&format!("- density = {}\n", fmt_polynomial(&selection.best.model.coefficients)));
    out.push('\n');

    out
}

/// Format the binned table.
pub fn format_bins_table(bins: &[Bin]) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{:>5} {:>8} {:>10} {:>10} {:>10} {:>10}\n",
        "group", "count", "x_min", "x_mean", "x_max", "density"
    ));
    out.push_str(&format!(
        "{:->5} {:->8} {:->10} {:->10} {:->10} {:->10}\n",
        "", "", "", "", "", ""
    ));
    for b in bins {
        let label = if b.zero_group { "zero".to_string() } else { b.index.to_string() };
        out.push_str(&format!(
            "{:>5} {:>8} {:>10.4} {:>10.4} {:>10.4} {:>10.4}\n",
            label, b.count, b.x_min, b.x_mean, b.x_max, b.y_mean
        ));
    }
    out
}

/// Format the predictive-model summary.
pub fn format_predict_summary(run: &PredictRun) -> String {
    let mut out = String::new();

    out.push_str("=== lues - land-use probability models ===\n");
    out.push_str(&format!("Drivers: {}\n", run.feature_names.join(", ")));
    out.push_str(&format!(
        "Cells: n={} | train={} | test={} | developed share={:.3}\n",
        run.n_rows, run.n_train, run.n_test, run.positive_rate
    ));

    out.push_str("\nHold-out metrics:\n");
    out.push_str(&format_metrics_table(&run.metrics()));

    let logistic = &run.logistic.model;
    out.push_str(&format!(
        "\nLogistic regression ({} iterations{}):\n",
        logistic.iterations,
        if logistic.converged { "" } else { ", not converged" }
    ));
    out.push_str(&format!("  {:<18} {:>10.4}\n", "intercept", logistic.intercept));
    for (name, coef) in logistic.feature_names.iter().zip(&logistic.coefficients) {
        out.push_str(&format!("  {:<18} {:>10.4}\n", name, coef));
    }

    let gbt = &run.gbt.model;
    let leaves: usize = gbt.trees.iter().map(|t| t.n_leaves()).sum();
    out.push_str(&format!(
        "\nGradient boosted trees: {} trees, {} leaves, learning rate {}\n",
        gbt.trees.len(),
        leaves,
        gbt.learning_rate
    ));

    out
}

pub fn format_metrics_table(metrics: &[ClassificationMetrics]) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{:<24} {:>7} {:>9} {:>9} {:>9}\n",
        "model", "n", "accuracy", "log_loss", "auc"
    ));
    out.push_str(&format!("{:-<24} {:->7} {:->9} {:->9} {:->9}\n", "", "", "", "", ""));
    for m in metrics {
        out.push_str(&format!(
            "{:<24} {:>7} {:>9.4} {:>9.4} {:>9}\n",
            m.model,
            m.n,
            m.accuracy,
            m.log_loss,
            fmt_optional(m.auc)
        ));
    }
    out
}

/// `c0 + c1·x + c2·x² + ...` with signs folded in.
pub fn fmt_polynomial(coefficients: &[f64]) -> String {
    let mut out = String::new();
    for (power, &c) in coefficients.iter().enumerate() {
        let term = match power {
            0 => String::new(),
            1 => "x".to_string(),
            2 => "x²".to_string(),
            3 => "x³".to_string(),
            p => format!("x^{p}"),
        };
        if out.is_empty() {
            out.push_str(&format!("{c:.4}"));
        } else if c < 0.0 {
            out.push_str(&format!(" - {:.4}", -c));
        } else {
            out.push_str(&format!(" + {c:.4}"));
        }
        out.push_str(&term);
    }
    out
}

fn fmt_optional(v: f64) -> String {
    if v.is_finite() { format!("{v:.4}") } else { "n/a".to_string() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn polynomial_folds_signs() {
        assert_eq!(fmt_polynomial(&[0.1, -0.5, 2.0]), "0.1000 - 0.5000x + 2.0000x²");
        assert_eq!(fmt_polynomial(&[-1.0]), "-1.0000");
    }

    #[test]
    fn bins_table_marks_zero_group() {
        let bins = vec![
            Bin {
                index: 0,
                zero_group: true,
                count: 12,
                x_mean: 0.0,
                x_min: 0.0,
                x_max: 0.0,
                y_mean: 0.05,
            },
            Bin {
                index: 1,
                zero_group: false,
                count: 10,
                x_mean: 0.3,
                x_min: 0.1,
                x_max: 0.5,
                y_mean: 0.4,
            },
        ];
        let table = format_bins_table(&bins);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[2].trim_start().starts_with("zero"));
        assert!(lines[3].trim_start().starts_with('1'));
    }

    #[test]
    fn undefined_auc_prints_placeholder() {
        let m = ClassificationMetrics::evaluate("m", &[1.0, 1.0], &[0.9, 0.8]);
        let table = format_metrics_table(&[m]);
        assert!(table.lines().nth(2).unwrap().ends_with("n/a"));
    }
}
