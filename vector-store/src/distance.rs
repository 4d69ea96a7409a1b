//! Distance metrics for nearest-neighbor search.
//!
//! Every metric is non-negative and smaller means more similar.

use serde::{Deserialize, Serialize};

/// Metric used to rank entries against a query vector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    /// Squared euclidean distance.
    #[default]
    L2,
    /// Cosine distance, `1 - cosine_similarity`, in `[0, 2]`.
    Cosine,
}

impl DistanceMetric {
    /// Distance between two vectors of equal length.
    ///
    /// Accumulation happens in `f64`; results beyond `f32` range saturate to
    /// `f32::MAX` so finite inputs always give a finite distance.
    pub fn distance(self, a: &[f32], b: &[f32]) -> f32 {
        let distance = match self {
            Self::L2 => squared_l2(a, b),
            Self::Cosine => cosine_distance(a, b),
        };
        saturate(distance)
    }
}

fn saturate(distance: f64) -> f32 {
    if distance.is_nan() {
        return f32::MAX;
    }
    distance.min(f64::from(f32::MAX)) as f32
}

/// Compute the squared euclidean distance between two vectors.
pub fn squared_l2(a: &[f32], b: &[f32]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (f64::from(*x) - f64::from(*y)).powi(2))
        .sum()
}

/// Compute the cosine distance between two vectors.
///
/// A zero vector has no direction; its distance to anything is 1.0
/// (orthogonal).
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    let dot_product: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| f64::from(*x) * f64::from(*y))
        .sum();
    let magnitude_a = a.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt();
    let magnitude_b = b.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt();

    if magnitude_a == 0.0 || magnitude_b == 0.0 {
        return 1.0;
    }

    // Rounding can push identical vectors slightly below zero.
    (1.0 - dot_product / (magnitude_a * magnitude_b)).clamp(0.0, 2.0)
}
