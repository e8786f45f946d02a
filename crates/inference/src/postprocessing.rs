use crate::registry::ClassList;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelScore {
    pub label: String,
    pub score: f32,
}

/// Best label, its probability, and the ranked top-K candidates.
///
/// `all_results[0]` is always `(prediction, confidence)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub prediction: String,
    pub confidence: f32,
    pub all_results: Vec<LabelScore>,
}

/// Numerically stable softmax; the result sums to 1.
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&x| (x - max).exp()).collect();
    let sum: f32 = exps.iter().sum();

    exps.into_iter().map(|e| e / sum).collect()
}

/// Indices of the `k` highest scores, descending, ties by ascending index.
pub fn top_k(scores: &[f32], k: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]).then(a.cmp(&b)));
    order.truncate(k.max(1));
    order
}

/// Rank `logits` against `classes`. `top_k` of 0 is treated as 1.
///
/// `logits` must hold exactly one score per class.
pub fn rank(logits: &[f32], classes: &ClassList, k: usize) -> PredictionResult {
    let probabilities = softmax(logits);

    let all_results: Vec<LabelScore> = top_k(&probabilities, k)
        .into_iter()
        .map(|index| LabelScore {
            label: classes.get(index).unwrap_or_default().to_string(),
            score: probabilities[index],
        })
        .collect();

    let (prediction, confidence) = all_results
        .first()
        .map(|best| (best.label.clone(), best.score))
        .unwrap_or_default();

    PredictionResult {
        prediction,
        confidence,
        all_results,
    }
}
