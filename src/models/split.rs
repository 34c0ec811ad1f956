//! Deterministic train/test partitioning.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::error::AppError;

/// Row indices of the training and test partitions.
#[derive(Debug, Clone)]
pub struct Split {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Shuffle `0..n` with a seeded RNG and hold out `test_fraction` of it.
///
/// The test partition gets `round(n * test_fraction)` rows, but both sides keep
/// at least one row.
pub fn train_test_split(n: usize, test_fraction: f64, seed: u64) -> Result<Split, AppError> {
    if !(test_fraction.is_finite() && test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(AppError::input(format!(
            "Test fraction must lie in (0, 1), got {test_fraction}."
        )));
    }
    if n < 2 {
        return Err(AppError::data(format!("Cannot split {n} rows into train and test sets.")));
    }

    let mut idx: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    idx.shuffle(&mut rng);

    let n_test = ((n as f64 * test_fraction).round() as usize).clamp(1, n - 1);
    let train = idx.split_off(n_test);
    Ok(Split { train, test: idx })
}
