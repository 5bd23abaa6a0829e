//! Similarity scoring for fixed-dimension embeddings

use std::cmp::Ordering;

use crate::domain::value_objects::DistanceMetric;

pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

pub fn norm(a: &[f32]) -> f32 {
    dot(a, a).sqrt()
}

/// Cosine similarity; zero vectors score 0.0
pub fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let denom = norm(a) * norm(b);
    if denom <= f32::EPSILON {
        0.0
    } else {
        dot(a, b) / denom
    }
}

pub fn euclidean(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

/// Similarity under `metric`, higher is closer. Euclidean distance is mapped
/// onto (0, 1] so every metric ranks descending.
pub fn similarity(metric: DistanceMetric, a: &[f32], b: &[f32]) -> f32 {
    match metric {
        DistanceMetric::Cosine => cosine(a, b),
        DistanceMetric::Dot => dot(a, b),
        DistanceMetric::Euclidean => 1.0 / (1.0 + euclidean(a, b)),
    }
}

/// Descending order for scores, NaN last
pub fn cmp_score_desc(a: f32, b: f32) -> Ordering {
    b.partial_cmp(&a).unwrap_or_else(|| a.is_nan().cmp(&b.is_nan()))
}

/// Scale a vector to unit length in place (no-op for zero vectors)
pub fn normalize(v: &mut [f32]) {
    let n = norm(v);
    if n > f32::EPSILON {
        v.iter_mut().for_each(|x| *x /= n);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_basics() {
        assert!((cosine(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_euclidean_similarity_is_descending_by_distance() {
        let q = [0.0, 0.0];
        let near = similarity(DistanceMetric::Euclidean, &q, &[1.0, 0.0]);
        let far = similarity(DistanceMetric::Euclidean, &q, &[3.0, 4.0]);
        assert!(near > far);
        assert!((far - 1.0 / 6.0).abs() < 1e-6);
    }

    #[test]
    fn test_cmp_score_desc_puts_nan_last() {
        let mut scores = vec![0.2, f32::NAN, 0.9, 0.5];
        scores.sort_by(|a, b| cmp_score_desc(*a, *b));
        assert_eq!(&scores[..3], &[0.9, 0.5, 0.2]);
        assert!(scores[3].is_nan());
    }
}
