//! Randomized truncated SVD for latent semantic indexing.
//!
//! The term-document matrix `A` (terms x documents) is never densified; it
//! is held as one sparse column per document. The range of `A` is sampled
//! with a Gaussian test matrix, sharpened with power iterations, and the
//! small projected problem `B B^T` (with `B = Q^T A`) is solved with cyclic
//! Jacobi rotations.

use ndarray::{Array2, Axis};
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::vector::SparseVec;

const OVERSAMPLES: usize = 10;
const POWER_ITERATIONS: usize = 2;
const JACOBI_SWEEPS: usize = 100;

/// Left singular vectors and singular values, largest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TruncatedSvd {
    /// `num_terms x rank`.
    pub u: Array2<f64>,
    pub singular_values: Vec<f64>,
}

impl TruncatedSvd {
    pub fn rank(&self) -> usize {
        self.singular_values.len()
    }

    /// `U^T v` for a sparse term vector. Out-of-range terms are ignored.
    pub fn project(&self, v: &[(u32, f64)]) -> Vec<f64> {
        let mut out = vec![0.0; self.rank()];
        for &(term, w) in v {
            let term = term as usize;
            if term >= self.u.nrows() {
                continue;
            }
            for (slot, u) in out.iter_mut().zip(self.u.row(term)) {
                *slot += w * u;
            }
        }
        out
    }
}

/// Rank-`k` SVD of the `num_rows x columns.len()` sparse matrix.
///
/// `k` is clamped to the matrix dimensions; components with a numerically
/// zero singular value are dropped.
pub fn randomized_svd(columns: &[SparseVec], num_rows: usize, k: usize, rng: &mut StdRng) -> TruncatedSvd {
    let num_cols = columns.len();
    let k = k.min(num_rows).min(num_cols);
    if k == 0 {
        return TruncatedSvd {
            u: Array2::zeros((num_rows, 0)),
            singular_values: Vec::new(),
        };
    }
    let l = (k + OVERSAMPLES).min(num_rows).min(num_cols);

    let omega = Array2::from_shape_fn((num_cols, l), |_| standard_normal(rng));
    let mut q = orthonormalize(mul_a(columns, num_rows, &omega));
    for _ in 0..POWER_ITERATIONS {
        let z = orthonormalize(mul_at(columns, &q));
        q = orthonormalize(mul_a(columns, num_rows, &z));
    }

    // B^T = A^T Q, so B B^T = (A^T Q)^T (A^T Q).
    let bt = mul_at(columns, &q);
    let bbt = bt.t().dot(&bt);
    let (eigenvalues, eigenvectors) = symmetric_eigen(&bbt);

    let mut order: Vec<usize> = (0..eigenvalues.len()).collect();
    order.sort_by(|&a, &b| eigenvalues[b].total_cmp(&eigenvalues[a]));

    let top = eigenvalues[order[0]].max(0.0).sqrt();
    let keep: Vec<usize> = order
        .into_iter()
        .take(k)
        .filter(|&i| eigenvalues[i].max(0.0).sqrt() > top * 1e-10)
        .collect();

    let w = eigenvectors.select(Axis(1), &keep);
    let u = q.dot(&w);
    let singular_values = keep.iter().map(|&i| eigenvalues[i].max(0.0).sqrt()).collect();

    TruncatedSvd { u, singular_values }
}

/// `A X` where `A` is given by sparse columns and `X` is `num_cols x l`.
fn mul_a(columns: &[SparseVec], num_rows: usize, x: &Array2<f64>) -> Array2<f64> {
    let mut y = Array2::zeros((num_rows, x.ncols()));
    for (d, col) in columns.iter().enumerate() {
        let xrow = x.row(d);
        for &(t, w) in col {
            let mut yrow = y.row_mut(t as usize);
            yrow.scaled_add(w, &xrow);
        }
    }
    y
}

/// `A^T Y` where `Y` is `num_rows x l`.
fn mul_at(columns: &[SparseVec], y: &Array2<f64>) -> Array2<f64> {
    let mut z = Array2::zeros((columns.len(), y.ncols()));
    for (d, col) in columns.iter().enumerate() {
        let mut zrow = z.row_mut(d);
        for &(t, w) in col {
            zrow.scaled_add(w, &y.row(t as usize));
        }
    }
    z
}

/// Modified Gram-Schmidt on the columns of `m`. Dependent columns become zero.
fn orthonormalize(mut m: Array2<f64>) -> Array2<f64> {
    for j in 0..m.ncols() {
        for i in 0..j {
            let proj = m.column(i).dot(&m.column(j));
            let qi = m.column(i).to_owned();
            m.column_mut(j).scaled_add(-proj, &qi);
        }
        let norm = m.column(j).dot(&m.column(j)).sqrt();
        if norm > 1e-12 {
            m.column_mut(j).mapv_inplace(|x| x / norm);
        } else {
            m.column_mut(j).fill(0.0);
        }
    }
    m
}

/// Eigen-decomposition of a symmetric matrix by cyclic Jacobi rotations.
///
/// Returns eigenvalues (unsorted) and the matching eigenvectors as columns.
pub fn symmetric_eigen(a: &Array2<f64>) -> (Vec<f64>, Array2<f64>) {
    let n = a.nrows();
    let mut a = a.clone();
    let mut v = Array2::<f64>::eye(n);

    for _ in 0..JACOBI_SWEEPS {
        let mut off = 0.0;
        for p in 0..n {
            for q in (p + 1)..n {
                off += a[[p, q]] * a[[p, q]];
            }
        }
        if off < 1e-22 {
            break;
        }

        for p in 0..n {
            for q in (p + 1)..n {
                let apq = a[[p, q]];
                if apq.abs() < 1e-300 {
                    continue;
                }
                let theta = (a[[q, q]] - a[[p, p]]) / (2.0 * apq);
                let t = if theta == 0.0 {
                    1.0
                } else {
                    theta.signum() / (theta.abs() + (theta * theta + 1.0).sqrt())
                };
                let c = 1.0 / (t * t + 1.0).sqrt();
                let s = t * c;

                for k in 0..n {
                    let (akp, akq) = (a[[k, p]], a[[k, q]]);
                    a[[k, p]] = c * akp - s * akq;
                    a[[k, q]] = s * akp + c * akq;
                }
                for k in 0..n {
                    let (apk, aqk) = (a[[p, k]], a[[q, k]]);
                    a[[p, k]] = c * apk - s * aqk;
                    a[[q, k]] = s * apk + c * aqk;
                }
                for k in 0..n {
                    let (vkp, vkq) = (v[[k, p]], v[[k, q]]);
                    v[[k, p]] = c * vkp - s * vkq;
                    v[[k, q]] = s * vkp + c * vkq;
                }
            }
        }
    }

    ((0..n).map(|i| a[[i, i]]).collect(), v)
}

/// Box-Muller sample from N(0, 1).
pub(crate) fn standard_normal(rng: &mut StdRng) -> f64 {
    let u1: f64 = 1.0 - rng.gen::<f64>();
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_symmetric_eigen_2x2() {
        let a = ndarray::arr2(&[[2.0, 1.0], [1.0, 2.0]]);
        let (mut vals, vecs) = symmetric_eigen(&a);
        let v0 = vecs.column(0).to_owned();
        let av0 = a.dot(&v0);
        for i in 0..2 {
            assert!((av0[i] - vals[0] * v0[i]).abs() < 1e-9);
        }
        vals.sort_by(f64::total_cmp);
        assert!((vals[0] - 1.0).abs() < 1e-9);
        assert!((vals[1] - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_recovers_diagonal_singular_values() {
        // 4 terms x 3 documents, diag(3, 2, 1)
        let columns = vec![vec![(0, 3.0)], vec![(1, 2.0)], vec![(2, 1.0)]];
        let mut rng = StdRng::seed_from_u64(1);
        let svd = randomized_svd(&columns, 4, 2, &mut rng);
        assert_eq!(svd.rank(), 2);
        assert!((svd.singular_values[0] - 3.0).abs() < 1e-8);
        assert!((svd.singular_values[1] - 2.0).abs() < 1e-8);
        assert!((svd.u[[0, 0]].abs() - 1.0).abs() < 1e-8);
        assert!((svd.u[[1, 1]].abs() - 1.0).abs() < 1e-8);
    }

    #[test]
    fn test_rank_one_drops_null_components() {
        let columns = vec![vec![(0, 1.0), (1, 1.0)], vec![(0, 2.0), (1, 2.0)]];
        let mut rng = StdRng::seed_from_u64(9);
        let svd = randomized_svd(&columns, 2, 5, &mut rng);
        assert_eq!(svd.rank(), 1);
        assert!((svd.singular_values[0] - 10f64.sqrt()).abs() < 1e-8);
    }

    #[test]
    fn test_projection_preserves_inner_products_in_span() {
        let columns = vec![vec![(0, 1.0)], vec![(1, 1.0)], vec![(0, 0.6), (1, 0.8)]];
        let mut rng = StdRng::seed_from_u64(3);
        let svd = randomized_svd(&columns, 2, 2, &mut rng);
        let a = svd.project(&columns[0]);
        let c = svd.project(&columns[2]);
        let dot: f64 = a.iter().zip(&c).map(|(x, y)| x * y).sum();
        assert!((dot - 0.6).abs() < 1e-8);
    }
}
