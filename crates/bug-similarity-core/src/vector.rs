//! Vector helpers shared by the strategies.
//!
//! Dense vectors are plain `&[f64]` slices. Sparse vectors are
//! `(index, weight)` pairs sorted by index with no duplicate indices, the
//! form produced by the TF-IDF models.

/// Sparse vector: `(index, weight)` sorted by index.
pub type SparseVec = Vec<(u32, f64)>;

/// Compute cosine similarity between two dense vectors.
///
/// Returns a value in `[-1.0, 1.0]`:
/// - `1.0` = identical direction
/// - `0.0` = orthogonal (unrelated)
/// - `-1.0` = opposite direction
///
/// Returns `0.0` for empty vectors, vectors of different lengths, or a
/// zero vector on either side.
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f64::EPSILON {
        return 0.0;
    }

    dot / denom
}

/// Dense dot product. Extra trailing elements of the longer slice are ignored.
pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Scale `v` to unit L2 norm in place. Zero vectors are left untouched.
pub fn l2_normalize(v: &mut [f64]) {
    let norm = v.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm > f64::EPSILON {
        v.iter_mut().for_each(|x| *x /= norm);
    }
}

/// Dot product of two sorted sparse vectors (merge join).
pub fn sparse_dot(a: &[(u32, f64)], b: &[(u32, f64)]) -> f64 {
    let (mut i, mut j) = (0, 0);
    let mut sum = 0.0;
    while i < a.len() && j < b.len() {
        match a[i].0.cmp(&b[j].0) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                sum += a[i].1 * b[j].1;
                i += 1;
                j += 1;
            }
        }
    }
    sum
}

pub fn sparse_norm(v: &[(u32, f64)]) -> f64 {
    v.iter().map(|(_, w)| w * w).sum::<f64>().sqrt()
}

/// Scale a sparse vector to unit L2 norm in place.
pub fn sparse_l2_normalize(v: &mut [(u32, f64)]) {
    let norm = sparse_norm(v);
    if norm > f64::EPSILON {
        v.iter_mut().for_each(|(_, w)| *w /= norm);
    }
}

/// Euclidean distance between two sparse vectors.
///
/// Uses `|a|^2 + |b|^2 - 2 a.b`, clamped at zero against rounding.
pub fn sparse_euclidean(a: &[(u32, f64)], b: &[(u32, f64)]) -> f64 {
    let aa = sparse_dot(a, a);
    let bb = sparse_dot(b, b);
    (aa + bb - 2.0 * sparse_dot(a, b)).max(0.0).sqrt()
}

/// Expand a sparse vector into a dense one of length `dim`.
///
/// Indices at or beyond `dim` are dropped.
pub fn sparse_to_dense(v: &[(u32, f64)], dim: usize) -> Vec<f64> {
    let mut dense = vec![0.0; dim];
    for &(idx, w) in v {
        if let Some(slot) = dense.get_mut(idx as usize) {
            *slot = w;
        }
    }
    dense
}

/// Hellinger distance between two discrete distributions.
///
/// `sqrt(0.5 * sum((sqrt(p) - sqrt(q))^2))`, in `[0, 1]` for
/// probability vectors. Symmetric; zero for identical inputs.
pub fn hellinger(p: &[f64], q: &[f64]) -> f64 {
    let sum: f64 = p
        .iter()
        .zip(q)
        .map(|(a, b)| {
            let d = a.max(0.0).sqrt() - b.max(0.0).sqrt();
            d * d
        })
        .sum();
    (0.5 * sum).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_cosine_identical() {
        let v = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_cosine_orthogonal() {
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-12);
    }

    #[test]
    fn test_cosine_opposite() {
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_cosine_empty_and_mismatched() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn test_sparse_dot_merges_indices() {
        let a = vec![(0, 1.0), (3, 2.0), (7, 1.0)];
        let b = vec![(3, 4.0), (5, 1.0), (7, -1.0)];
        assert_eq!(sparse_dot(&a, &b), 7.0);
    }

    #[test]
    fn test_sparse_euclidean() {
        let a = vec![(0, 3.0)];
        let b = vec![(1, 4.0)];
        assert!((sparse_euclidean(&a, &b) - 5.0).abs() < 1e-12);
        assert_eq!(sparse_euclidean(&a, &a), 0.0);
    }

    #[test]
    fn test_normalize() {
        let mut v = vec![3.0, 4.0];
        l2_normalize(&mut v);
        assert!((v[0] - 0.6).abs() < 1e-12);
        let mut s = vec![(2, 3.0), (9, 4.0)];
        sparse_l2_normalize(&mut s);
        assert!((sparse_norm(&s) - 1.0).abs() < 1e-12);
        let mut zero = vec![0.0, 0.0];
        l2_normalize(&mut zero);
        assert_eq!(zero, vec![0.0, 0.0]);
    }

    #[test]
    fn test_sparse_to_dense() {
        assert_eq!(sparse_to_dense(&[(1, 0.5), (4, 2.0)], 3), vec![0.0, 0.5, 0.0]);
    }

    #[test]
    fn test_hellinger_disjoint_is_one() {
        assert!((hellinger(&[1.0, 0.0], &[0.0, 1.0]) - 1.0).abs() < 1e-12);
    }

    fn distribution() -> impl Strategy<Value = Vec<f64>> {
        prop::collection::vec(0.0f64..1.0, 8).prop_map(|mut v| {
            let sum: f64 = v.iter().sum::<f64>() + 1e-9;
            v.iter_mut().for_each(|x| *x /= sum);
            v
        })
    }

    proptest! {
        #[test]
        fn prop_hellinger_symmetric(p in distribution(), q in distribution()) {
            prop_assert!((hellinger(&p, &q) - hellinger(&q, &p)).abs() < 1e-12);
        }

        #[test]
        fn prop_hellinger_zero_on_identity(p in distribution()) {
            prop_assert!(hellinger(&p, &p).abs() < 1e-12);
        }

        #[test]
        fn prop_hellinger_bounded(p in distribution(), q in distribution()) {
            let d = hellinger(&p, &q);
            prop_assert!((0.0..=1.0 + 1e-9).contains(&d));
        }
    }
}
