//! SVG charts and maps rendered with Plotters.
//!
//! - curve chart: binned means (zero group in red) plus the fitted curve
//! - raster map: one rectangle per cell on a continuous colour ramp, missing
//!   cells in light grey
//!
//! Drawing code returns boxed Plotters errors; the public wrappers turn them
//! into `AppError` with the output path attached.

use std::error::Error;
use std::path::Path;

use plotters::prelude::*;

use crate::domain::{Bin, FitResult, LandUseClass};
use crate::error::AppError;
use crate::fit::sample_curve;
use crate::raster::Raster;

type DrawResult = Result<(), Box<dyn Error>>;

/// Colour stops of the raster ramp (dark blue to yellow).
const RAMP: [(u8, u8, u8); 5] = [(68, 1, 84), (59, 82, 139), (33, 145, 140), (94, 201, 98), (253, 231, 37)];
const MISSING: RGBColor = RGBColor(230, 230, 230);

/// Widest map the default cell size aims for, in pixels.
const MAP_TARGET_PX: usize = 800;

pub fn write_curve_svg(
    path: &Path,
    bins: &[Bin],
    fit: &FitResult,
    class: LandUseClass,
    size: (u32, u32),
) -> Result<(), AppError> {
    draw_curve_chart(path, bins, fit, class, size)
        .map_err(|e| AppError::input(format!("Failed to render curve SVG '{}': {e}", path.display())))
}

fn draw_curve_chart(path: &Path, bins: &[Bin], fit: &FitResult, class: LandUseClass, size: (u32, u32)) -> DrawResult {
    let (x0, x1) = bins
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), b| (lo.min(b.x_min), hi.max(b.x_max)));
    let (x0, x1) = if x0.is_finite() && x1 > x0 { (x0, x1) } else { (0.0, 1.0) };
    let curve = sample_curve(&fit.model, x0, x1, 200);

    let ys = bins.iter().map(|b| b.y_mean).chain(curve.iter().map(|p| p.1));
    let (y0, y1) = ys
        .filter(|y| y.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), y| (lo.min(y), hi.max(y)));
    let (y0, y1) = if y0.is_finite() && y1 > y0 { (y0, y1) } else { (0.0, 1.0) };
    let pad = 0.05 * (y1 - y0);

    let root = SVGBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(
            format!("ES accessibility vs {} density", class.display_name()),
            ("sans-serif", 20),
        )
        .margin(12)
        .x_label_area_size(40)
        .y_label_area_size(56)
        .build_cartesian_2d(x0..x1, (y0 - pad)..(y1 + pad))?;

    chart
        .configure_mesh()
        .x_desc("ES accessibility")
        .y_desc("land-use density")
        .x_labels(6)
        .y_labels(6)
        .draw()?;

    chart.draw_series(LineSeries::new(curve, BLUE.stroke_width(2)))?;
    chart.draw_series(bins.iter().map(|b| {
        let style = if b.zero_group { RED.filled() } else { BLACK.filled() };
        Circle::new((b.x_mean, b.y_mean), 4, style)
    }))?;

    root.present()?;
    Ok(())
}

/// Render a raster as a colour map; `cell_px == 0` picks a size near 800 px wide.
pub fn write_raster_svg(path: &Path, raster: &Raster, title: &str, cell_px: usize) -> Result<(), AppError> {
    draw_raster_map(path, raster, title, cell_px)
        .map_err(|e| AppError::input(format!("Failed to render map SVG '{}': {e}", path.display())))
}

fn draw_raster_map(path: &Path, raster: &Raster, title: &str, cell_px: usize) -> DrawResult {
    let (rows, cols) = raster.shape();
    let cell = if cell_px == 0 {
        (MAP_TARGET_PX / cols.max(1)).clamp(1, 8)
    } else {
        cell_px
    };
    let title_px = 30;
    let width = (cols * cell) as u32;
    let height = (rows * cell + title_px) as u32;

    let root = SVGBackend::new(path, (width.max(120), height)).into_drawing_area();
    root.fill(&WHITE)?;
    let (lo, hi) = raster.finite_range().unwrap_or((0.0, 1.0));
    let area = root.titled(&format!("{title} [{lo:.3}, {hi:.3}]"), ("sans-serif", 16))?;

    let cell = cell as i32;
    for ((row, col), &v) in raster.data().indexed_iter() {
        let color = if v.is_finite() {
            ramp(if hi > lo { (v - lo) / (hi - lo) } else { 0.0 })
        } else {
            MISSING
        };
        let (x, y) = (col as i32 * cell, row as i32 * cell);
        area.draw(&Rectangle::new([(x, y), (x + cell, y + cell)], color.filled()))?;
    }

    root.present()?;
    Ok(())
}

/// Linear interpolation along `RAMP` for `u` in `[0, 1]`.
fn ramp(u: f64) -> RGBColor {
    let u = u.clamp(0.0, 1.0) * (RAMP.len() - 1) as f64;
    let i = (u.floor() as usize).min(RAMP.len() - 2);
    let t = u - i as f64;
    let (a, b) = (RAMP[i], RAMP[i + 1]);
    let mix = |p: u8, q: u8| (p as f64 + t * (q as f64 - p as f64)).round() as u8;
    RGBColor(mix(a.0, b.0), mix(a.1, b.1), mix(a.2, b.2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CurveKind, CurveModel, FitQuality};

    #[test]
    fn ramp_hits_end_stops() {
        assert_eq!(ramp(0.0), RGBColor(68, 1, 84));
        assert_eq!(ramp(1.0), RGBColor(253, 231, 37));
        assert_eq!(ramp(0.5), RGBColor(33, 145, 140));
    }

    #[test]
    fn curve_chart_writes_svg() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("curve.svg");
        let bins: Vec<Bin> = (0..5)
            .map(|i| {
                let x = i as f64 / 4.0;
                Bin {
                    index: i,
                    zero_group: i == 0,
                    count: 3,
                    x_mean: x,
                    x_min: x,
                    x_max: x,
                    y_mean: 0.2 + 0.5 * x,
                }
            })
            .collect();
        let fit = FitResult {
            model: CurveModel {
                kind: CurveKind::Linear,
                display_name: "linear".to_string(),
                coefficients: vec![0.2, 0.5],
            },
            quality: FitQuality {
                sse: 0.0,
                rmse: 0.0,
                r2: 1.0,
                aic: 0.0,
                bic: 0.0,
                n: 5,
            },
        };
        write_curve_svg(&path, &bins, &fit, LandUseClass::Residential, (640, 480)).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("<svg"));
        assert!(text.contains("residential"));
    }

    #[test]
    fn raster_map_writes_one_rect_per_cell() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("map.svg");
        let raster = Raster::from_vec(vec![0.0, 0.5, f64::NAN, 1.0], 2, 2).unwrap();
        write_raster_svg(&path, &raster, "probability", 10).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("<svg"));
        // Background fill plus four cells.
        assert!(text.matches("<rect").count() >= 4);
    }
}
