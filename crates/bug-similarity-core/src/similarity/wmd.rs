//! Word Mover's Distance with relaxed-bound pruning.
//!
//! Per query the cosine-distance matrix between the whole vocabulary and
//! the query's unique words is computed once. Every candidate document
//! then gets a cheap lower bound, the relaxed WMD: each side ships all of
//! its mass to its nearest word on the other side, and the larger of the
//! two costs is kept. Candidates are visited in ascending bound order and
//! the exact distance (optimal transport) is computed only until the next
//! bound exceeds the current k-th best exact distance.

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use super::embedding::{nbow, EmbeddingCorpus};
use super::{SimilarityStrategy, StrategyKind};
use crate::error::Result;
use crate::models::{BugId, BugRecord};
use crate::transport::emd;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WmdParams {
    /// Results at or above this exact distance are dropped.
    pub cut_off: f64,
}

impl Default for WmdParams {
    fn default() -> Self {
        Self { cut_off: 0.2 }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WmdSimilarity {
    base: EmbeddingCorpus,
}

/// A corpus document prepared against one query.
struct Candidate {
    doc: usize,
    weights: Vec<f64>,
    cost: Array2<f64>,
}

impl WmdSimilarity {
    pub fn new(base: EmbeddingCorpus) -> Self {
        Self { base }
    }

    pub fn base(&self) -> &EmbeddingCorpus {
        &self.base
    }

    /// Query weights and candidates sorted by relaxed bound.
    fn plan(&self, query: &BugRecord) -> Option<(Vec<f64>, Vec<Candidate>, Vec<(usize, f64)>)> {
        let query_bow = self.base.nbow(&self.base.tokens(query));
        if query_bow.is_empty() {
            return None;
        }
        let (query_words, query_weights): (Vec<usize>, Vec<f64>) = query_bow.into_iter().unzip();
        let all_distances = self.base.model().distance_matrix(&query_words);

        let mut candidates = Vec::new();
        let mut bounds = Vec::new();
        for (doc, tokens) in self.base.corpus().documents().iter().enumerate() {
            if self.base.ids()[doc] == query.id {
                continue;
            }
            let doc_bow = nbow(&self.base.vocab_indices(tokens));
            if doc_bow.is_empty() {
                continue;
            }
            let (doc_words, doc_weights): (Vec<usize>, Vec<f64>) = doc_bow.into_iter().unzip();
            let cost = Array2::from_shape_fn((doc_words.len(), query_words.len()), |(i, j)| {
                all_distances[[doc_words[i], j]]
            });
            if cost.sum() == 0.0 {
                continue;
            }
            bounds.push((candidates.len(), relaxed_bound(&doc_weights, &query_weights, &cost)));
            candidates.push(Candidate {
                doc,
                weights: doc_weights,
                cost,
            });
        }
        bounds.sort_by(|a, b| a.1.total_cmp(&b.1));
        Some((query_weights, candidates, bounds))
    }

    /// `(corpus index, exact distance)` nearest first, at most `k`.
    fn search(&self, query: &BugRecord, k: usize) -> Vec<(usize, f64)> {
        let Some((query_weights, candidates, bounds)) = self.plan(query) else {
            return Vec::new();
        };
        let mut evaluated = 0usize;
        let kept = bounded_scan(&bounds, k, |c| {
            evaluated += 1;
            let cand = &candidates[c];
            emd(&cand.weights, &query_weights, &cand.cost)
        });
        tracing::debug!(
            candidates = candidates.len(),
            evaluated,
            pruned = candidates.len() - evaluated,
            "wmd scan"
        );
        kept.into_iter().map(|(c, d)| (candidates[c].doc, d)).collect()
    }
}

/// Weighted relaxed WMD: a lower bound of the exact transport cost.
///
/// `cost` is `doc x query`.
pub fn relaxed_bound(doc_weights: &[f64], query_weights: &[f64], cost: &Array2<f64>) -> f64 {
    let doc_side: f64 = cost
        .rows()
        .into_iter()
        .zip(doc_weights)
        .map(|(row, w)| w * row.iter().copied().fold(f64::INFINITY, f64::min))
        .sum();
    let query_side: f64 = cost
        .columns()
        .into_iter()
        .zip(query_weights)
        .map(|(col, w)| w * col.iter().copied().fold(f64::INFINITY, f64::min))
        .sum();
    doc_side.max(query_side)
}

/// Bounded top-`k` scan over candidates sorted by ascending lower bound.
///
/// `exact` is called in candidate order; the scan stops as soon as `k`
/// results are kept and the next lower bound exceeds the worst kept exact
/// distance. Non-finite exact distances are skipped. Returns
/// `(candidate, exact distance)` sorted ascending.
pub fn bounded_scan<F>(candidates: &[(usize, f64)], k: usize, mut exact: F) -> Vec<(usize, f64)>
where
    F: FnMut(usize) -> f64,
{
    let mut kept: Vec<(usize, f64)> = Vec::with_capacity(k + 1);
    if k == 0 {
        return kept;
    }
    for &(candidate, lower_bound) in candidates {
        if kept.len() >= k && lower_bound > kept[k - 1].1 {
            break;
        }
        let distance = exact(candidate);
        if !distance.is_finite() {
            continue;
        }
        let pos = kept.partition_point(|&(_, d)| d <= distance);
        if pos < k {
            kept.insert(pos, (candidate, distance));
            kept.truncate(k);
        }
    }
    kept
}

impl SimilarityStrategy for WmdSimilarity {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Word2VecWmd
    }

    fn get_similar_bugs(&self, query: &BugRecord, k: usize) -> Result<Vec<BugId>> {
        let cut_off = self.base.cut_off();
        Ok(self
            .search(query, k)
            .into_iter()
            .filter(|&(_, d)| d < cut_off)
            .map(|(doc, _)| self.base.ids()[doc])
            .collect())
    }

    fn get_distance(&self, a: &BugRecord, b: &BugRecord) -> Result<f64> {
        let a_bow = self.base.nbow(&self.base.tokens(a));
        let b_bow = self.base.nbow(&self.base.tokens(b));
        if a_bow.is_empty() || b_bow.is_empty() {
            return Ok(f64::INFINITY);
        }
        let model = self.base.model();
        let cost = Array2::from_shape_fn((a_bow.len(), b_bow.len()), |(i, j)| {
            (1.0 - model.similarity(a_bow[i].0, b_bow[j].0)).max(0.0)
        });
        if cost.sum() == 0.0 {
            return Ok(f64::INFINITY);
        }
        let a_weights: Vec<f64> = a_bow.iter().map(|&(_, w)| w).collect();
        let b_weights: Vec<f64> = b_bow.iter().map(|&(_, w)| w).collect();
        Ok(emd(&a_weights, &b_weights, &cost))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::similarity::embedding::fixtures;
    use proptest::prelude::*;

    #[test]
    fn test_relaxed_bound_takes_larger_side() {
        // doc has two words, query one word
        let cost = ndarray::arr2(&[[0.2], [0.6]]);
        let lb = relaxed_bound(&[0.5, 0.5], &[1.0], &cost);
        // doc side 0.4, query side 0.2
        assert!((lb - 0.4).abs() < 1e-12);
        assert!(lb <= emd(&[0.5, 0.5], &[1.0], &cost) + 1e-12);
    }

    #[test]
    fn test_scan_stops_early() {
        let bounds = vec![(0, 0.1), (1, 0.2), (2, 0.9), (3, 1.0)];
        let mut calls = Vec::new();
        let kept = bounded_scan(&bounds, 2, |c| {
            calls.push(c);
            bounds[c].1 + 0.05
        });
        assert_eq!(calls, vec![0, 1]);
        assert_eq!(kept.iter().map(|&(c, _)| c).collect::<Vec<_>>(), vec![0, 1]);
    }

    #[test]
    fn test_scan_reorders_by_exact_distance() {
        let bounds = vec![(0, 0.1), (1, 0.15), (2, 0.2)];
        let exact = [0.9, 0.3, 0.25];
        let kept = bounded_scan(&bounds, 2, |c| exact[c]);
        assert_eq!(kept, vec![(2, 0.25), (1, 0.3)]);
    }

    #[test]
    fn test_scan_skips_infinite_and_zero_k() {
        let bounds = vec![(0, 0.1), (1, 0.2)];
        assert!(bounded_scan(&bounds, 0, |_| 1.0).is_empty());
        let kept = bounded_scan(&bounds, 5, |c| if c == 0 { f64::INFINITY } else { 0.5 });
        assert_eq!(kept, vec![(1, 0.5)]);
    }

    proptest! {
        #[test]
        fn prop_pruned_scan_matches_exhaustive(
            pairs in prop::collection::vec((0.0f64..2.0, 0.0f64..1.0), 1..40),
            k in 1usize..12,
        ) {
            // lower bound = exact * slack, never above the exact distance
            let exact: Vec<f64> = pairs.iter().map(|p| p.0).collect();
            let mut bounds: Vec<(usize, f64)> =
                pairs.iter().enumerate().map(|(i, p)| (i, p.0 * p.1)).collect();
            bounds.sort_by(|a, b| a.1.total_cmp(&b.1));

            let pruned: Vec<f64> = bounded_scan(&bounds, k, |c| exact[c]).into_iter().map(|p| p.1).collect();
            let mut all = exact.clone();
            all.sort_by(f64::total_cmp);
            all.truncate(k);
            prop_assert_eq!(pruned, all);
        }
    }

    fn exhaustive(wmd: &WmdSimilarity, query: &BugRecord, k: usize) -> Vec<f64> {
        let mut distances: Vec<f64> = fixtures::bugs()
            .iter()
            .filter(|b| b.id != query.id)
            .map(|b| wmd.get_distance(query, b).unwrap())
            .filter(|d| d.is_finite())
            .collect();
        distances.sort_by(f64::total_cmp);
        distances.truncate(k);
        distances
    }

    #[test]
    fn test_search_matches_exhaustive_on_corpus() {
        let wmd = WmdSimilarity::new(fixtures::base(10.0));
        for query in fixtures::bugs() {
            let pruned: Vec<f64> = wmd.search(&query, 3).into_iter().map(|p| p.1).collect();
            let expected = exhaustive(&wmd, &query, 3);
            assert_close(&pruned, &expected);
        }
    }

    fn assert_close(a: &[f64], b: &[f64]) {
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b) {
            assert!((x - y).abs() < 1e-6, "{} != {}", x, y);
        }
    }

    #[test]
    fn test_similar_bugs_same_topic_first() {
        let wmd = WmdSimilarity::new(fixtures::base(10.0));
        let bugs = fixtures::bugs();
        let result = wmd.get_similar_bugs(&bugs[0], 2).unwrap();
        assert_eq!(result.len(), 2);
        assert!(!result.contains(&1));
        assert!(result.iter().all(|id| [2, 3].contains(id)));
    }

    #[test]
    fn test_cut_off_filters() {
        let wmd = WmdSimilarity::new(fixtures::base(1e-9));
        assert!(wmd.get_similar_bugs(&fixtures::bugs()[3], 10).unwrap().is_empty());
    }

    #[test]
    fn test_distance_properties() {
        let wmd = WmdSimilarity::new(fixtures::base(0.2));
        let bugs = fixtures::bugs();
        let ab = wmd.get_distance(&bugs[0], &bugs[4]).unwrap();
        let ba = wmd.get_distance(&bugs[4], &bugs[0]).unwrap();
        assert!((ab - ba).abs() < 1e-9);
        let unknown = BugRecord::new(77, "zzz", "");
        assert_eq!(wmd.get_distance(&unknown, &bugs[0]).unwrap(), f64::INFINITY);
        assert!(wmd.get_similar_bugs(&unknown, 10).unwrap().is_empty());
    }
}
