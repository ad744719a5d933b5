//! Top-1 decoding of class scores

use std::cmp::Ordering;

/// Index and score of the best class.
///
/// The running best starts at score 0.0 and index 0, and only a strictly
/// greater score replaces it. Ties keep the lower index, and a vector with no
/// positive score (all zero, all negative) decodes to index 0 with score 0.0.
/// NaN never wins. Returns `None` for an empty slice.
pub fn top1(scores: &[f32]) -> Option<(usize, f32)> {
    if scores.is_empty() {
        return None;
    }

    let mut best_index = 0;
    let mut best_score = 0.0f32;
    for (i, &score) in scores.iter().enumerate() {
        if score > best_score {
            best_score = score;
            best_index = i;
        }
    }
    Some((best_index, best_score))
}

/// Index of the best class under the [`top1`] policy
pub fn argmax(scores: &[f32]) -> Option<usize> {
    top1(scores).map(|(index, _)| index)
}

/// Up to `k` `(index, score)` pairs, highest score first.
///
/// Equal scores stay in index order. NaN scores are skipped.
pub fn top_k(scores: &[f32], k: usize) -> Vec<(usize, f32)> {
    let mut ranked: Vec<(usize, f32)> = scores
        .iter()
        .copied()
        .enumerate()
        .filter(|(_, s)| !s.is_nan())
        .collect();
    // NaN is filtered above, so partial_cmp is total here and signed zeros compare equal
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    ranked.truncate(k);
    ranked
}
