//! Similarity metrics used by the vector indexes.
//!
//! A metric is a pure value: a function from two vectors to a scalar plus two
//! flags that tell an index how to order results and whether it must
//! unit-normalize vectors at insertion time.

/// A pairwise similarity/distance function and the flags that describe how to
/// use it.
pub trait SimilarityMetric: Send + Sync + std::fmt::Debug {
    /// Compute the raw score between two vectors of equal length.
    fn compute(&self, a: &[f32], b: &[f32]) -> f32;

    /// `true` when a larger raw score means "more similar" (cosine); `false`
    /// when a smaller score does (L2, Manhattan).
    fn higher_is_better(&self) -> bool;

    /// `true` when vectors must be unit-normalized before this metric is
    /// meaningful (cosine reduces to a dot product only on the unit sphere).
    fn requires_unit_norm(&self) -> bool;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Cosine;

impl SimilarityMetric for Cosine {
    fn compute(&self, a: &[f32], b: &[f32]) -> f32 {
        let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
        let norm_a = l2_norm(a);
        let norm_b = l2_norm(b);
        if norm_a == 0.0 || norm_b == 0.0 {
            return 0.0;
        }
        dot / (norm_a * norm_b)
    }

    fn higher_is_better(&self) -> bool {
        true
    }

    fn requires_unit_norm(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct L2Distance;

impl SimilarityMetric for L2Distance {
    fn compute(&self, a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum::<f32>().sqrt()
    }

    fn higher_is_better(&self) -> bool {
        false
    }

    fn requires_unit_norm(&self) -> bool {
        false
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Manhattan;

impl SimilarityMetric for Manhattan {
    fn compute(&self, a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| (x - y).abs()).sum()
    }

    fn higher_is_better(&self) -> bool {
        false
    }

    fn requires_unit_norm(&self) -> bool {
        false
    }
}

pub fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Unit-normalize `v` in place if `metric` requires it. Zero vectors are left
/// as-is (normalizing them would divide by zero).
pub fn normalize_if_needed(metric: &dyn SimilarityMetric, v: &[f32]) -> Vec<f32> {
    if !metric.requires_unit_norm() {
        return v.to_vec();
    }
    let norm = l2_norm(v);
    if norm > 0.0 {
        v.iter().map(|x| x / norm).collect()
    } else {
        v.to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn cosine_of_parallel_vectors_is_one() {
        let m = Cosine;
        assert_relative_eq!(m.compute(&[1.0, 0.0], &[2.0, 0.0]), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn cosine_of_zero_vector_is_zero() {
        let m = Cosine;
        assert_eq!(m.compute(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn cosine_classic_3_4_5_triangle() {
        let m = Cosine;
        let score = m.compute(&[1.0, 0.0], &[3.0, 4.0]);
        assert_relative_eq!(score, 0.6, epsilon = 1e-6);
    }

    #[test]
    fn l2_distance_between_identical_vectors_is_zero() {
        let m = L2Distance;
        assert_eq!(m.compute(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]), 0.0);
    }

    #[test]
    fn manhattan_sums_absolute_differences() {
        let m = Manhattan;
        assert_relative_eq!(m.compute(&[0.0, 0.0], &[3.0, 4.0]), 7.0, epsilon = 1e-6);
    }

    #[test]
    fn normalize_leaves_zero_vector_unchanged() {
        let out = normalize_if_needed(&Cosine, &[0.0, 0.0, 0.0]);
        assert_eq!(out, vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn normalize_produces_unit_vector() {
        let out = normalize_if_needed(&Cosine, &[3.0, 4.0]);
        assert_relative_eq!(l2_norm(&out), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn normalize_is_noop_when_metric_does_not_require_it() {
        let out = normalize_if_needed(&L2Distance, &[3.0, 4.0]);
        assert_eq!(out, vec![3.0, 4.0]);
    }
}
