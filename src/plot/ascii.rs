//! ASCII plotting for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! Plot elements:
//! - binned means: `o`
//! - the zero-accessibility group: `z`
//! - fitted curve: `-` line

use crate::domain::{Bin, CurveFile, CurveModel};
use crate::fit::sample_curve;

/// Render binned means and a fitted curve.
pub fn render_curve_plot(bins: &[Bin], model: &CurveModel, width: usize, height: usize) -> String {
    let (x_min, x_max) = x_range(bins).unwrap_or((0.0, 1.0));
    let curve = sample_curve(model, x_min, x_max, width.max(2));
    render_plot(&bin_marks(bins), Some(&curve), x_min, x_max, width, height)
}

/// Render a saved curve file (its bins and precomputed grid).
pub fn render_curve_file_plot(curve: &CurveFile, width: usize, height: usize) -> String {
    let grid: Vec<(f64, f64)> = curve
        .grid
        .x
        .iter()
        .zip(curve.grid.y.iter())
        .map(|(&x, &y)| (x, y))
        .collect();
    let (x_min, x_max) = grid_range(&grid)
        .or_else(|| x_range(&curve.bins))
        .unwrap_or((0.0, 1.0));
    render_plot(&bin_marks(&curve.bins), Some(&grid), x_min, x_max, width, height)
}

fn bin_marks(bins: &[Bin]) -> Vec<(f64, f64, char)> {
    bins.iter()
        .map(|b| (b.x_mean, b.y_mean, if b.zero_group { 'z' } else { 'o' }))
        .collect()
}

fn render_plot(
    points: &[(f64, f64, char)],
    curve_points: Option<&[(f64, f64)]>,
    x_min: f64,
    x_max: f64,
    width: usize,
    height: usize,
) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let (y_min, y_max) = y_range(points, curve_points).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];

    // Curve first so points overlay it.
    if let Some(curve) = curve_points {
        draw_curve(&mut grid, curve, x_min, x_max, y_min, y_max);
    }

    for &(x, y, ch) in points {
        if !(x.is_finite() && y.is_finite()) {
            continue;
        }
        let col = map_x(x, x_min, x_max, width);
        let row = map_y(y, y_min, y_max, height);
        grid[row][col] = ch;
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Plot: accessibility=[{x_min:.3}, {x_max:.3}] | density=[{y_min:.3}, {y_max:.3}]\n"
    ));
    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }
    out
}

fn x_range(bins: &[Bin]) -> Option<(f64, f64)> {
    let (lo, hi) = bins.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), b| {
        (lo.min(b.x_mean), hi.max(b.x_mean))
    });
    (lo.is_finite() && hi.is_finite() && hi > lo).then_some((lo, hi))
}

fn grid_range(grid: &[(f64, f64)]) -> Option<(f64, f64)> {
    let (lo, hi) = grid
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &(x, _)| (lo.min(x), hi.max(x)));
    (lo.is_finite() && hi.is_finite() && hi > lo).then_some((lo, hi))
}

fn y_range(points: &[(f64, f64, char)], curve: Option<&[(f64, f64)]>) -> Option<(f64, f64)> {
    let ys = points
        .iter()
        .map(|p| p.1)
        .chain(curve.into_iter().flatten().map(|p| p.1))
        .filter(|y| y.is_finite());
    let (lo, hi) = ys.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), y| (lo.min(y), hi.max(y)));
    (lo.is_finite() && hi.is_finite() && hi > lo).then_some((lo, hi))
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(x: f64, x_min: f64, x_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((x - x_min) / (x_max - x_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // Row 0 is the top (y_max).
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

fn draw_curve(grid: &mut [Vec<char>], curve: &[(f64, f64)], x_min: f64, x_max: f64, y_min: f64, y_max: f64) {
    if curve.len() < 2 {
        return;
    }
    let height = grid.len();
    let width = grid[0].len();

    let mut prev = None;
    for &(x, y) in curve.iter().filter(|(x, y)| x.is_finite() && y.is_finite()) {
        let col = map_x(x, x_min, x_max, width);
        let row = map_y(y, y_min, y_max, height);
        if let Some((c0, r0)) = prev {
            draw_line(grid, c0, r0, col, row, '-');
        } else {
            grid[row][col] = '-';
        }
        prev = Some((col, row));
    }
}

/// Integer line drawing (Bresenham).
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0
            && (y0 as usize) < grid.len()
            && x0 >= 0
            && (x0 as usize) < grid[0].len()
            && grid[y0 as usize][x0 as usize] == ' '
        {
            grid[y0 as usize][x0 as usize] = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}
