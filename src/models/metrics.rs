//! Hold-out evaluation of probability predictions.

use serde::Serialize;

use crate::math::PROB_EPS;

#[derive(Debug, Clone, Serialize)]
pub struct ClassificationMetrics {
    pub model: String,
    pub n: usize,
    pub positives: usize,
    /// Share of correct labels at a 0.5 threshold.
    pub accuracy: f64,
    pub log_loss: f64,
    /// Area under the ROC curve; `NaN` when only one class is present.
    pub auc: f64,
}

impl ClassificationMetrics {
    pub fn evaluate(model: &str, y_true: &[f64], proba: &[f64]) -> Self {
        Self {
            model: model.to_string(),
            n: y_true.len(),
            positives: y_true.iter().filter(|&&y| y > 0.5).count(),
            accuracy: accuracy(y_true, proba),
            log_loss: log_loss(y_true, proba),
            auc: roc_auc(y_true, proba),
        }
    }
}

pub fn accuracy(y_true: &[f64], proba: &[f64]) -> f64 {
    if y_true.is_empty() {
        return f64::NAN;
    }
    let hits = y_true
        .iter()
        .zip(proba)
        .filter(|&(&y, &p)| (p >= 0.5) == (y > 0.5))
        .count();
    hits as f64 / y_true.len() as f64
}

/// Mean binary cross-entropy with clipped probabilities.
pub fn log_loss(y_true: &[f64], proba: &[f64]) -> f64 {
    if y_true.is_empty() {
        return f64::NAN;
    }
    let total: f64 = y_true
        .iter()
        .zip(proba)
        .map(|(&y, &p)| {
            let p = p.clamp(PROB_EPS, 1.0 - PROB_EPS);
            -(y * p.ln() + (1.0 - y) * (1.0 - p).ln())
        })
        .sum();
    total / y_true.len() as f64
}

/// Rank-based ROC AUC (Mann–Whitney U), tied scores share their average rank.
pub fn roc_auc(y_true: &[f64], proba: &[f64]) -> f64 {
    let n = y_true.len().min(proba.len());
    let n_pos = y_true[..n].iter().filter(|&&y| y > 0.5).count();
    let n_neg = n - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return f64::NAN;
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| proba[a].total_cmp(&proba[b]));

    let mut rank_sum_pos = 0.0;
    let mut i = 0;
    while i < n {
        let mut j = i;
        while j + 1 < n && proba[order[j + 1]] == proba[order[i]] {
            j += 1;
        }
        // Ranks are 1-based; the tie block i..=j shares the mean rank.
        let avg_rank = (i + j) as f64 / 2.0 + 1.0;
        for &k in &order[i..=j] {
            if y_true[k] > 0.5 {
                rank_sum_pos += avg_rank;
            }
        }
        i = j + 1;
    }

    let n_pos_f = n_pos as f64;
    (rank_sum_pos - n_pos_f * (n_pos_f + 1.0) / 2.0) / (n_pos_f * n_neg as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perfect_ranking_has_unit_auc() {
        let y = [0.0, 0.0, 1.0, 1.0];
        let p = [0.1, 0.2, 0.8, 0.9];
        assert_eq!(roc_auc(&y, &p), 1.0);
        assert_eq!(accuracy(&y, &p), 1.0);
    }

    #[test]
    fn reversed_ranking_has_zero_auc() {
        let y = [1.0, 1.0, 0.0, 0.0];
        let p = [0.1, 0.2, 0.8, 0.9];
        assert_eq!(roc_auc(&y, &p), 0.0);
    }

    #[test]
    fn constant_scores_give_half_auc() {
        let y = [1.0, 0.0, 1.0, 0.0];
        let p = [0.5; 4];
        assert_eq!(roc_auc(&y, &p), 0.5);
    }

    #[test]
    fn single_class_auc_is_undefined() {
        assert!(roc_auc(&[1.0, 1.0], &[0.2, 0.9]).is_nan());
    }

    #[test]
    fn log_loss_is_finite_for_certain_mistakes() {
        let ll = log_loss(&[1.0, 0.0], &[0.0, 1.0]);
        assert!(ll.is_finite() && ll > 20.0);
        let good = log_loss(&[1.0, 0.0], &[0.9, 0.1]);
        assert!((good - (-(0.9f64).ln())).abs() < 1e-12);
    }

    #[test]
    fn evaluate_counts_positives() {
        let m = ClassificationMetrics::evaluate("m", &[1.0, 0.0, 1.0], &[0.7, 0.6, 0.4]);
        assert_eq!(m.n, 3);
        assert_eq!(m.positives, 2);
        assert!((m.accuracy - 1.0 / 3.0).abs() < 1e-12);
    }
}
