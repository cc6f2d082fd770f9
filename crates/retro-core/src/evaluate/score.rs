//! Multi-class scores over class ids.
use std::collections::BTreeSet;

/// Macro-averaged F1 over the union of true and predicted classes.
///
/// Per-class F1 is `2·TP / (2·TP + FP + FN)` and counts as `0.0` when undefined.
/// Only the common prefix of both slices is scored; empty input scores `0.0`.
pub fn macro_f1(y_true: &[usize], y_pred: &[usize]) -> f64 {
    let n = y_true.len().min(y_pred.len());
    if n == 0 {
        return 0.0;
    }
    let (y_true, y_pred) = (&y_true[..n], &y_pred[..n]);

    let classes: BTreeSet<usize> = y_true.iter().chain(y_pred).copied().collect();
    let sum: f64 = classes
        .iter()
        .map(|&class| {
            let mut tp = 0u64;
            let mut fp = 0u64;
            let mut fn_ = 0u64;
            for (&t, &p) in y_true.iter().zip(y_pred) {
                match (t == class, p == class) {
                    (true, true) => tp += 1,
                    (false, true) => fp += 1,
                    (true, false) => fn_ += 1,
                    (false, false) => {}
                }
            }
            let denom = 2 * tp + fp + fn_;
            if denom == 0 {
                0.0
            } else {
                (2 * tp) as f64 / denom as f64
            }
        })
        .sum();
    sum / classes.len() as f64
}
