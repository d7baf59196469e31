//! Distance and similarity metrics over equal-length numeric vectors.
//!
//! All functions here are pure and stateless; the binary metrics
//! ([`jaccard_distance`], [`kulczynski_distance`],
//! [`sokal_michener_distance`]) treat a nonzero entry as presence.
//! Parameterized metrics ([`Minkowski`], [`WeightedEuclidean`]) are small
//! immutable structs validated at construction.
//!
//! Inputs must have equal length; mismatched lengths are a caller error
//! and panic.

use crate::traits::FloatScalar;

/// Errors from metric construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricError {
    /// Minkowski order below one does not satisfy the triangle inequality.
    OrderOutOfRange,
}

impl core::fmt::Display for MetricError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            MetricError::OrderOutOfRange => {
                write!(f, "minkowski order must be at least one")
            }
        }
    }
}

impl std::error::Error for MetricError {}

/// Presence/absence agreement counts for the binary metrics.
struct BinaryCounts {
    tt: f64,
    tf: f64,
    ft: f64,
    ff: f64,
}

fn binary_counts<T: FloatScalar>(x: &[T], y: &[T]) -> BinaryCounts {
    assert_eq!(x.len(), y.len(), "dimension mismatch");
    let mut c = BinaryCounts {
        tt: 0.0,
        tf: 0.0,
        ft: 0.0,
        ff: 0.0,
    };
    for (&a, &b) in x.iter().zip(y.iter()) {
        match (a != T::zero(), b != T::zero()) {
            (true, true) => c.tt += 1.0,
            (true, false) => c.tf += 1.0,
            (false, true) => c.ft += 1.0,
            (false, false) => c.ff += 1.0,
        }
    }
    c
}

/// Jaccard distance: mismatched presences over the union of presences.
///
/// An empty union (both vectors all-zero) is defined as distance zero.
///
/// ```
/// use dynalg::metrics::jaccard_distance;
///
/// assert_eq!(jaccard_distance(&[1.0, 0.0, 1.0], &[1.0, 1.0, 0.0]), 2.0 / 3.0);
/// assert_eq!(jaccard_distance(&[0.0, 0.0], &[0.0, 0.0]), 0.0);
/// ```
pub fn jaccard_distance<T: FloatScalar>(x: &[T], y: &[T]) -> f64 {
    let c = binary_counts(x, y);
    let union = c.tt + c.tf + c.ft;
    if union == 0.0 {
        0.0
    } else {
        (c.tf + c.ft) / union
    }
}

/// Jaccard similarity; complements [`jaccard_distance`] so the two sum to
/// one whenever the union is nonempty.
pub fn jaccard_similarity<T: FloatScalar>(x: &[T], y: &[T]) -> f64 {
    1.0 - jaccard_distance(x, y)
}

/// Kulczynski distance: mismatched presences over all presences counted
/// with agreement. Both vectors all-zero is defined as distance zero.
pub fn kulczynski_distance<T: FloatScalar>(x: &[T], y: &[T]) -> f64 {
    let c = binary_counts(x, y);
    let denom = c.tf + c.ft + c.tt;
    if denom == 0.0 {
        0.0
    } else {
        (c.tf + c.ft) / denom
    }
}

/// Sokal-Michener distance with double-weighted disagreements:
/// `2(tf + ft) / (tt + ff + 2(tf + ft))`.
pub fn sokal_michener_distance<T: FloatScalar>(x: &[T], y: &[T]) -> f64 {
    let c = binary_counts(x, y);
    let r = 2.0 * (c.tf + c.ft);
    if r == 0.0 {
        0.0
    } else {
        r / (c.tt + c.ff + r)
    }
}

/// Minkowski distance of a fixed order `p`:
/// `(Σ |xᵢ − yᵢ|^p)^(1/p)`.
///
/// Order 1 is Manhattan distance and order 2 Euclidean. Orders below one
/// break the triangle inequality, so [`new`](Self::new) rejects them;
/// [`nonmetric`](Self::nonmetric) deliberately skips the check for callers
/// who want a fractional dissimilarity anyway.
///
/// ```
/// use dynalg::metrics::Minkowski;
///
/// let euclidean = Minkowski::new(2.0).unwrap();
/// assert!((euclidean.distance(&[0.0, 0.0], &[3.0, 4.0]) - 5.0).abs() < 1e-12);
/// assert!(Minkowski::new(0.5).is_err());
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Minkowski {
    order: f64,
}

impl Minkowski {
    pub fn new(order: f64) -> Result<Self, MetricError> {
        if !(order >= 1.0) {
            return Err(MetricError::OrderOutOfRange);
        }
        Ok(Self { order })
    }

    /// Construct without the `order ≥ 1` check. The result is a valid
    /// dissimilarity but not a metric.
    pub fn nonmetric(order: f64) -> Self {
        Self { order }
    }

    pub fn order(&self) -> f64 {
        self.order
    }

    pub fn distance(&self, x: &[f64], y: &[f64]) -> f64 {
        assert_eq!(x.len(), y.len(), "dimension mismatch");
        let sum: f64 = x
            .iter()
            .zip(y.iter())
            .map(|(a, b)| (a - b).abs().powf(self.order))
            .sum();
        sum.powf(1.0 / self.order)
    }
}

/// Euclidean distance with a per-dimension weight:
/// `sqrt(Σ wᵢ (xᵢ − yᵢ)²)`.
#[derive(Debug, Clone)]
pub struct WeightedEuclidean {
    weights: Vec<f64>,
}

impl WeightedEuclidean {
    pub fn new(weights: &[f64]) -> Self {
        Self {
            weights: weights.to_vec(),
        }
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn distance(&self, x: &[f64], y: &[f64]) -> f64 {
        assert_eq!(x.len(), y.len(), "dimension mismatch");
        assert_eq!(x.len(), self.weights.len(), "dimension mismatch");
        let sum: f64 = self
            .weights
            .iter()
            .zip(x.iter().zip(y.iter()))
            .map(|(w, (a, b))| w * (a - b) * (a - b))
            .sum();
        sum.sqrt()
    }
}
