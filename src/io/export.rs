//! Export binned samples and model metrics to CSV.
//!
//! The exports are meant to be easy to consume in spreadsheets or downstream scripts.

use std::path::Path;

use serde::Serialize;

use crate::domain::Bin;
use crate::error::AppError;
use crate::models::ClassificationMetrics;

/// Write the binned accessibility/density table, one row per group.
pub fn write_bins_csv(path: &Path, bins: &[Bin]) -> Result<(), AppError> {
    write_rows(path, bins, "bins")
}

/// Write hold-out metrics, one row per model.
pub fn write_metrics_csv(path: &Path, metrics: &[ClassificationMetrics]) -> Result<(), AppError> {
    write_rows(path, metrics, "metrics")
}

fn write_rows<T: Serialize>(path: &Path, rows: &[T], what: &str) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| {
        AppError::input(format!("Failed to create {what} CSV '{}': {e}", path.display()))
    })?;
    for row in rows {
        writer
            .serialize(row)
            .map_err(|e| AppError::input(format!("Failed to write {what} CSV row: {e}")))?;
    }
    writer
        .flush()
        .map_err(|e| AppError::input(format!("Failed to flush {what} CSV: {e}")))?;
    Ok(())
}
