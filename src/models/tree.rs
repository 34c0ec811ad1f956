//! Second-order regression trees used as boosting weak learners.
//!
//! A tree is grown greedily on per-row gradients `g` and hessians `h`:
//!
//! - leaf value: `-G / (H + λ)`
//! - split gain: `G_L²/(H_L + λ) + G_R²/(H_R + λ) − G²/(H + λ)`
//!
//! Candidate splits are midpoints between consecutive distinct feature values;
//! rows with `value <= threshold` go left.

use rayon::prelude::*;

use crate::sample::FeatureTable;

/// Smallest gain accepted for a split.
const MIN_GAIN: f64 = 1e-12;

#[derive(Debug, Clone, Copy)]
pub struct TreeParams {
    pub max_depth: usize,
    pub min_samples_leaf: usize,
    /// L2 regularisation on leaf values.
    pub lambda: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone)]
pub struct RegressionTree {
    nodes: Vec<Node>,
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    feature: usize,
    threshold: f64,
    gain: f64,
}

impl RegressionTree {
    /// Grow a tree on the given rows of `x`.
    ///
    /// `grad` and `hess` are indexed by table row, like `rows`.
    pub fn fit(x: &FeatureTable, rows: &[usize], grad: &[f64], hess: &[f64], params: &TreeParams) -> Self {
        let mut tree = RegressionTree { nodes: Vec::new() };
        tree.grow(x, rows.to_vec(), grad, hess, params, 0);
        tree
    }

    fn grow(
        &mut self,
        x: &FeatureTable,
        rows: Vec<usize>,
        grad: &[f64],
        hess: &[f64],
        params: &TreeParams,
        depth: usize,
    ) -> usize {
        let g: f64 = rows.iter().map(|&i| grad[i]).sum();
        let h: f64 = rows.iter().map(|&i| hess[i]).sum();

        let split = if depth < params.max_depth && rows.len() >= 2 * params.min_samples_leaf.max(1) {
            best_split(x, &rows, grad, hess, params, g, h)
        } else {
            None
        };

        let Some(split) = split else {
            self.nodes.push(Node::Leaf {
                value: -g / (h + params.lambda),
            });
            return self.nodes.len() - 1;
        };

        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
            .iter()
            .partition(|&&i| x.row(i)[split.feature] <= split.threshold);

        // Reserve this node's slot before the children are appended.
        let id = self.nodes.len();
        self.nodes.push(Node::Leaf { value: 0.0 });
        let left = self.grow(x, left_rows, grad, hess, params, depth + 1);
        let right = self.grow(x, right_rows, grad, hess, params, depth + 1);
        self.nodes[id] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        id
    }

    pub fn predict_row(&self, row: &[f64]) -> f64 {
        let mut id = 0;
        loop {
            match &self.nodes[id] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    id = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn n_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| matches!(n, Node::Leaf { .. })).count()
    }
}

fn best_split(
    x: &FeatureTable,
    rows: &[usize],
    grad: &[f64],
    hess: &[f64],
    params: &TreeParams,
    g_total: f64,
    h_total: f64,
) -> Option<Candidate> {
    let parent_score = g_total * g_total / (h_total + params.lambda);
    let min_leaf = params.min_samples_leaf.max(1);

    let per_feature: Vec<Option<Candidate>> = (0..x.n_features())
        .into_par_iter()
        .map(|feature| {
            let mut sorted: Vec<(f64, f64, f64)> = rows
                .iter()
                .map(|&i| (x.row(i)[feature], grad[i], hess[i]))
                .collect();
            sorted.sort_by(|a, b| a.0.total_cmp(&b.0));

            let mut best: Option<Candidate> = None;
            let (mut gl, mut hl) = (0.0, 0.0);
            for k in 0..sorted.len() - 1 {
                gl += sorted[k].1;
                hl += sorted[k].2;
                let n_left = k + 1;
                if n_left < min_leaf || sorted.len() - n_left < min_leaf {
                    continue;
                }
                if sorted[k].0 == sorted[k + 1].0 {
                    continue;
                }
                let gr = g_total - gl;
                let hr = h_total - hl;
                let gain = gl * gl / (hl + params.lambda) + gr * gr / (hr + params.lambda) - parent_score;
                if gain > MIN_GAIN && best.is_none_or(|b| gain > b.gain) {
                    best = Some(Candidate {
                        feature,
                        threshold: 0.5 * (sorted[k].0 + sorted[k + 1].0),
                        gain,
                    });
                }
            }
            best
        })
        .collect();

    // Ties resolve to the lowest feature index.
    per_feature
        .into_iter()
        .flatten()
        .fold(None, |acc: Option<Candidate>, c| match acc {
            Some(a) if a.gain >= c.gain => Some(a),
            _ => Some(c),
        })
}
