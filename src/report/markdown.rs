//! Markdown run report.

use std::path::Path;

use chrono::{DateTime, Utc};

use crate::app::pipeline::{CurveRun, PredictRun};
use crate::error::AppError;
use crate::report::format::{fmt_polynomial, format_bins_table, format_metrics_table};

/// Render a report covering whichever stages were run.
pub fn render_markdown_report(
    curve: Option<&CurveRun>,
    predict: Option<&PredictRun>,
    generated_at: DateTime<Utc>,
) -> String {
    let mut out = String::new();
    out.push_str("# Land use and ecosystem-service accessibility\n\n");
    out.push_str(&format!("Generated {}\n", generated_at.format("%Y-%m-%d %H:%M:%S UTC")));

    if let Some(run) = curve {
        let best = &run.selection.best;
        out.push_str(&format!(
            "\n## Accessibility vs {} density\n\n",
            run.class.display_name()
        ));
        out.push_str(&format!(
            "- grid: {} x {} cells, {} usable samples ({} with zero accessibility)\n",
            run.grid_shape.0, run.grid_shape.1, run.n_samples, run.n_zero
        ));
        out.push_str(&format!(
            "- selected curve ({}): **{}**, `density = {}`\n",
            run.selection.criterion.label(),
            best.model.display_name,
            fmt_polynomial(&best.model.coefficients)
        ));
        out.push_str(&format!(
            "- fit: R² = {:.4}, RMSE = {:.4}\n\n",
            best.quality.r2, best.quality.rmse
        ));

        out.push_str("| curve | SSE | R² | AIC | BIC |\n|---|---:|---:|---:|---:|\n");
        for fit in &run.selection.fits {
            out.push_str(&format!(
                "| {} | {:.5} | {:.4} | {:.3} | {:.3} |\n",
                fit.model.display_name, fit.quality.sse, fit.quality.r2, fit.quality.aic, fit.quality.bic
            ));
        }

        out.push_str("\n```text\n");
        out.push_str(&format_bins_table(&run.bins));
        out.push_str("```\n");
    }

    if let Some(run) = predict {
        out.push_str("\n## Land-use probability models\n\n");
        out.push_str(&format!(
            "- drivers: {}\n- cells: {} (train {}, test {}), developed share {:.3}\n",
            run.feature_names.join(", "),
            run.n_rows,
            run.n_train,
            run.n_test,
            run.positive_rate
        ));
        out.push_str("\n```text\n");
        out.push_str(&format_metrics_table(&run.metrics()));
        out.push_str("```\n");

        out.push_str("\n| driver | logistic coefficient |\n|---|---:|\n");
        let logistic = &run.logistic.model;
        for (name, coef) in logistic.feature_names.iter().zip(&logistic.coefficients) {
            out.push_str(&format!("| {name} | {coef:.4} |\n"));
        }
    }

    out
}

pub fn write_markdown_report(
    path: &Path,
    curve: Option<&CurveRun>,
    predict: Option<&PredictRun>,
) -> Result<(), AppError> {
    let text = render_markdown_report(curve, predict, Utc::now());
    std::fs::write(path, text)
        .map_err(|e| AppError::input(format!("Failed to write report '{}': {e}", path.display())))
}
