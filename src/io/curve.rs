//! Read/write curve JSON files.
//!
//! Curve JSON is the "portable" representation of a fitted accessibility curve:
//! - polynomial kind + coefficients
//! - run metadata (land-use class, criterion, timestamp)
//! - the binned observations it was fitted to
//! - a precomputed fitted grid for quick plotting
//!
//! The schema is defined by `domain::CurveFile`.

use std::fs::File;
use std::path::Path;

use chrono::Utc;

use crate::domain::{Bin, CurveFile, CurveGrid, Criterion, FitResult, LandUseClass};
use crate::error::AppError;
use crate::fit::sample_curve;

/// Points in the saved fitted grid.
const GRID_POINTS: usize = 101;

/// Assemble the curve file for a selected fit.
pub fn curve_file(best: &FitResult, bins: &[Bin], class: LandUseClass, criterion: Criterion) -> CurveFile {
    let (x_min, x_max) = bins
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), b| {
            (lo.min(b.x_min), hi.max(b.x_max))
        });
    let (x_min, x_max) = if x_min.is_finite() && x_max > x_min {
        (x_min, x_max)
    } else {
        (0.0, 1.0)
    };
    let (x, y) = sample_curve(&best.model, x_min, x_max, GRID_POINTS).into_iter().unzip();

    CurveFile {
        tool: "lues".to_string(),
        generated_at: Utc::now(),
        class,
        criterion,
        model: best.model.clone(),
        fit_quality: best.quality.clone(),
        bins: bins.to_vec(),
        grid: CurveGrid { x, y },
    }
}

/// Write a curve JSON file.
pub fn write_curve_json(path: &Path, curve: &CurveFile) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::input(format!("Failed to create curve JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, curve)
        .map_err(|e| AppError::input(format!("Failed to write curve JSON: {e}")))?;
    Ok(())
}

/// Read a curve JSON file.
pub fn read_curve_json(path: &Path) -> Result<CurveFile, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::input(format!("Failed to open curve JSON '{}': {e}", path.display())))?;
    let curve: CurveFile =
        serde_json::from_reader(file).map_err(|e| AppError::input(format!("Invalid curve JSON: {e}")))?;
    if curve.grid.x.len() != curve.grid.y.len() {
        return Err(AppError::input("Curve JSON grid has mismatched x/y lengths."));
    }
    Ok(curve)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CurveKind, CurveModel, FitQuality};

    fn fit() -> FitResult {
        FitResult {
            model: CurveModel {
                kind: CurveKind::Linear,
                display_name: "linear".to_string(),
                coefficients: vec![0.1, 0.5],
            },
            quality: FitQuality {
                sse: 0.0,
                rmse: 0.0,
                r2: 1.0,
                aic: -100.0,
                bic: -99.0,
                n: 4,
            },
        }
    }

    fn bin(index: usize, lo: f64, hi: f64) -> Bin {
        Bin {
            index,
            zero_group: false,
            count: 10,
            x_mean: 0.5 * (lo + hi),
            x_min: lo,
            x_max: hi,
            y_mean: 0.1 + 0.25 * (lo + hi),
        }
    }

    #[test]
    fn grid_spans_the_binned_range() {
        let bins = vec![bin(0, 0.2, 0.4), bin(1, 0.4, 0.8)];
        let curve = curve_file(&fit(), &bins, LandUseClass::Commercial, Criterion::Bic);
        assert_eq!(curve.grid.x.len(), GRID_POINTS);
        assert_eq!(curve.grid.x[0], 0.2);
        assert!((curve.grid.x[GRID_POINTS - 1] - 0.8).abs() < 1e-12);
        assert!((curve.grid.y[0] - 0.2).abs() < 1e-12);
    }

    #[test]
    fn write_then_read_keeps_model_and_bins() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("curve.json");
        let bins = vec![bin(0, 0.0, 0.5), bin(1, 0.5, 1.0)];
        let curve = curve_file(&fit(), &bins, LandUseClass::Residential, Criterion::Aic);
        write_curve_json(&path, &curve).unwrap();

        let back = read_curve_json(&path).unwrap();
        assert_eq!(back.tool, "lues");
        assert_eq!(back.class, LandUseClass::Residential);
        assert_eq!(back.model.coefficients, vec![0.1, 0.5]);
        assert_eq!(back.bins.len(), 2);
        assert_eq!(back.bins[1].x_min, 0.5);
    }

    #[test]
    fn missing_file_is_an_input_error() {
        let err = read_curve_json(Path::new("/nonexistent/curve.json")).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
