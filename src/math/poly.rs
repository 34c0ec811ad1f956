//! Polynomial trend curves.
//!
//! Coefficients are stored in ascending powers: `c[0] + c[1] x + c[2] x² + ...`.

/// Fill a design row `[1, x, x², ..., x^degree]`.
///
/// # Panics
/// Panics if `out.len() != degree + 1`. Callers size the row from the curve kind.
pub fn fill_design_row(degree: usize, x: f64, out: &mut [f64]) {
    assert_eq!(out.len(), degree + 1, "design row length must be degree + 1");
    let mut p = 1.0;
    for slot in out.iter_mut() {
        *slot = p;
        p *= x;
    }
}

/// Evaluate a polynomial with Horner's scheme.
pub fn eval_poly(coefficients: &[f64], x: f64) -> f64 {
    coefficients.iter().rev().fold(0.0, |acc, &c| acc * x + c)
}

/// `n` evenly spaced points on `[lo, hi]` (both ends included).
pub fn linspace(lo: f64, hi: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![lo],
        _ => (0..n)
            .map(|i| lo + (hi - lo) * i as f64 / (n - 1) as f64)
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn design_row_holds_powers() {
        let mut row = [0.0; 4];
        fill_design_row(3, 2.0, &mut row);
        assert_eq!(row, [1.0, 2.0, 4.0, 8.0]);
    }

    #[test]
    fn horner_matches_expanded_form() {
        let c = [1.0, -2.0, 0.5, 3.0];
        let x: f64 = 0.7;
        let expanded = 1.0 - 2.0 * x + 0.5 * x * x + 3.0 * x.powi(3);
        assert!((eval_poly(&c, x) - expanded).abs() < 1e-12);
        assert_eq!(eval_poly(&[], x), 0.0);
    }

    #[test]
    fn linspace_includes_endpoints() {
        assert_eq!(linspace(0.0, 1.0, 5), vec![0.0, 0.25, 0.5, 0.75, 1.0]);
        assert_eq!(linspace(2.0, 3.0, 1), vec![2.0]);
    }
}
