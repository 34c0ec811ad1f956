//! North-up affine georeferencing.
//!
//! ```text
//! x = origin_x + col * pixel_width
//! y = origin_y + row * pixel_height      (pixel_height < 0 for north-up)
//! ```
//!
//! GeoTIFF files in this project are written with a pixel-scale + tiepoint pair,
//! which cannot express rotation, so rotation terms are not modelled.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    /// X coordinate of the upper-left corner.
    pub origin_x: f64,
    /// Y coordinate of the upper-left corner.
    pub origin_y: f64,
    pub pixel_width: f64,
    /// Usually negative.
    pub pixel_height: f64,
}

impl GeoTransform {
    pub fn new(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self {
            origin_x,
            origin_y,
            pixel_width,
            pixel_height,
        }
    }

    /// Geographic coordinates of the centre of cell `(row, col)`.
    pub fn cell_center(&self, row: usize, col: usize) -> (f64, f64) {
        let x = self.origin_x + (col as f64 + 0.5) * self.pixel_width;
        let y = self.origin_y + (row as f64 + 0.5) * self.pixel_height;
        (x, y)
    }

    /// Fractional `(row, col)` of a geographic point.
    ///
    /// The integer part addresses the containing cell; `(r + 0.5, c + 0.5)` is
    /// that cell's centre. Returns `None` for a degenerate transform.
    pub fn geo_to_fractional(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        if self.pixel_width.abs() < 1e-12 || self.pixel_height.abs() < 1e-12 {
            return None;
        }
        let col = (x - self.origin_x) / self.pixel_width;
        let row = (y - self.origin_y) / self.pixel_height;
        Some((row, col))
    }

    /// Bounding box `(min_x, min_y, max_x, max_y)` of a `rows × cols` grid.
    pub fn extent(&self, rows: usize, cols: usize) -> (f64, f64, f64, f64) {
        let x0 = self.origin_x;
        let x1 = self.origin_x + cols as f64 * self.pixel_width;
        let y0 = self.origin_y;
        let y1 = self.origin_y + rows as f64 * self.pixel_height;
        (x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn center_round_trips_through_fractional() {
        let gt = GeoTransform::new(500_000.0, 4_200_000.0, 30.0, -30.0);
        let (x, y) = gt.cell_center(3, 7);
        let (r, c) = gt.geo_to_fractional(x, y).unwrap();
        assert!((r - 3.5).abs() < 1e-9);
        assert!((c - 7.5).abs() < 1e-9);
    }

    #[test]
    fn extent_orders_bounds() {
        let gt = GeoTransform::new(0.0, 100.0, 10.0, -10.0);
        assert_eq!(gt.extent(10, 5), (0.0, 0.0, 50.0, 100.0));
    }

    #[test]
    fn degenerate_transform_has_no_inverse() {
        let gt = GeoTransform::new(0.0, 0.0, 0.0, -1.0);
        assert!(gt.geo_to_fractional(1.0, 1.0).is_none());
    }
}
