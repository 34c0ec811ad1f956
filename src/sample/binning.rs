//! Binning `(x, y)` samples into equal-count groups for trend fitting.
//!
//! Rules:
//!
//! 1. Every row with `x == 0` collapses into one zero group, placed first.
//! 2. Remaining rows are sorted by `x` and split into exactly `n_bins` groups.
//!    With `m` rows, the first `m mod n_bins` groups hold one extra row, so
//!    group sizes never differ by more than one.
//! 3. Each group reports its mean `x`, mean `y`, count and `x` range.
//!
//! Because groups are consecutive runs of the sorted sample, group mean `x` is
//! non-decreasing across group order.

use tracing::debug;

use crate::domain::Bin;
use crate::error::AppError;

/// Group `(x, y)` pairs. Non-finite pairs are ignored.
pub fn bin_samples(samples: &[(f64, f64)], n_bins: usize) -> Result<Vec<Bin>, AppError> {
    if n_bins == 0 {
        return Err(AppError::input("Bin count must be > 0."));
    }

    let mut zeros = Vec::new();
    let mut rest = Vec::with_capacity(samples.len());
    for &(x, y) in samples {
        if !(x.is_finite() && y.is_finite()) {
            continue;
        }
        if x == 0.0 {
            zeros.push((x, y));
        } else {
            rest.push((x, y));
        }
    }

    if rest.len() < n_bins {
        return Err(AppError::data(format!(
            "Only {} non-zero samples for {n_bins} bins.",
            rest.len()
        )));
    }

    rest.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut bins = Vec::with_capacity(n_bins + 1);
    if !zeros.is_empty() {
        bins.push(summarize(0, true, &zeros));
    }

    let base = rest.len() / n_bins;
    let extra = rest.len() % n_bins;
    let mut start = 0;
    for g in 0..n_bins {
        let size = base + usize::from(g < extra);
        let group = &rest[start..start + size];
        bins.push(summarize(bins.len(), false, group));
        start += size;
    }

    debug!(
        samples = samples.len(),
        zero_rows = zeros.len(),
        groups = bins.len(),
        group_size = base,
        "binned samples"
    );
    Ok(bins)
}

fn summarize(index: usize, zero_group: bool, group: &[(f64, f64)]) -> Bin {
    let n = group.len() as f64;
    let (sx, sy) = group.iter().fold((0.0, 0.0), |(sx, sy), &(x, y)| (sx + x, sy + y));
    let x_min = group.iter().map(|p| p.0).fold(f64::INFINITY, f64::min);
    let x_max = group.iter().map(|p| p.0).fold(f64::NEG_INFINITY, f64::max);
    Bin {
        index,
        zero_group,
        count: group.len(),
        x_mean: sx / n,
        x_min,
        x_max,
        y_mean: sy / n,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn samples(n: usize) -> Vec<(f64, f64)> {
        // Deliberately unsorted.
        (0..n)
            .map(|i| {
                let x = ((i * 37) % n) as f64 + 1.0;
                (x, if x > n as f64 / 2.0 { 1.0 } else { 0.0 })
            })
            .collect()
    }

    #[test]
    fn produces_exactly_n_groups_with_nondecreasing_means() {
        let bins = bin_samples(&samples(103), 10).unwrap();
        assert_eq!(bins.len(), 10);
        assert!(bins.iter().all(|b| !b.zero_group));
        for pair in bins.windows(2) {
            assert!(pair[0].x_mean <= pair[1].x_mean);
            assert!(pair[0].x_max <= pair[1].x_min);
        }
    }

    #[test]
    fn remainder_is_spread_over_leading_groups() {
        let bins = bin_samples(&samples(103), 10).unwrap();
        let counts: Vec<usize> = bins.iter().map(|b| b.count).collect();
        assert_eq!(counts, vec![11, 11, 11, 10, 10, 10, 10, 10, 10, 10]);
        assert_eq!(counts.iter().sum::<usize>(), 103);
    }

    #[test]
    fn zero_rows_collapse_into_one_leading_group() {
        let mut s = samples(40);
        s.extend([(0.0, 1.0), (0.0, 0.0), (0.0, 1.0), (0.0, 1.0)]);
        let bins = bin_samples(&s, 4).unwrap();
        assert_eq!(bins.len(), 5);
        assert!(bins[0].zero_group);
        assert_eq!(bins[0].count, 4);
        assert_eq!(bins[0].y_mean, 0.75);
        assert_eq!(bins[0].x_mean, 0.0);
        assert!(bins[1..].iter().all(|b| !b.zero_group && b.count == 10));
        let idx: Vec<usize> = bins.iter().map(|b| b.index).collect();
        assert_eq!(idx, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn group_means_average_dependent_variable() {
        let s = vec![(0.1, 0.0), (0.2, 1.0), (0.3, 1.0), (0.4, 1.0)];
        let bins = bin_samples(&s, 2).unwrap();
        assert_eq!(bins[0].y_mean, 0.5);
        assert_eq!(bins[1].y_mean, 1.0);
        assert!((bins[0].x_mean - 0.15).abs() < 1e-12);
    }

    #[test]
    fn too_few_samples_is_a_data_error() {
        let err = bin_samples(&[(0.5, 1.0), (0.0, 1.0)], 2).unwrap_err();
        assert_eq!(err.exit_code(), 3);
        assert_eq!(bin_samples(&samples(5), 0).unwrap_err().exit_code(), 2);
    }

    #[test]
    fn non_finite_pairs_are_ignored() {
        let s = vec![(f64::NAN, 1.0), (0.5, f64::NAN), (0.1, 1.0), (0.2, 0.0)];
        let bins = bin_samples(&s, 2).unwrap();
        assert_eq!(bins.iter().map(|b| b.count).sum::<usize>(), 2);
    }
}
