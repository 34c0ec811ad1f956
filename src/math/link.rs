//! Logistic link helpers shared by the classifiers.

/// Probabilities are clipped away from 0 and 1 before taking logs.
pub const PROB_EPS: f64 = 1e-12;

/// Numerically stable logistic function.
pub fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// Log-odds of `p`, clipped to a finite value.
pub fn logit(p: f64) -> f64 {
    let p = p.clamp(PROB_EPS, 1.0 - PROB_EPS);
    (p / (1.0 - p)).ln()
}
