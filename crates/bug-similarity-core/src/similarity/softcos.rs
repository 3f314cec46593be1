//! Soft-cosine ranking over a sparse term-similarity matrix.
//!
//! `S[i][j] = max(cos(i, j), 0)^exponent` for the `nonzero_limit` most
//! similar dictionary terms of each term above `threshold`, mirrored so the
//! matrix stays symmetric, with a unit diagonal. Terms missing from the
//! embedding vocabulary only match themselves.
//!
//! `softcos(x, y) = xᵀSy / sqrt(xᵀSx · yᵀSy)` over raw term counts.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::embedding::EmbeddingCorpus;
use super::{rank, Order, SimilarityStrategy, StrategyKind};
use crate::corpus::{BagOfWords, Dictionary};
use crate::error::Result;
use crate::models::{BugId, BugRecord};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SoftCosParams {
    /// Only neighbours with cosine strictly above this enter the matrix.
    pub threshold: f64,
    pub exponent: f64,
    /// Neighbours kept per term.
    pub nonzero_limit: usize,
}

impl Default for SoftCosParams {
    fn default() -> Self {
        Self {
            threshold: 0.0,
            exponent: 2.0,
            nonzero_limit: 100,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SoftCosSimilarity {
    base: EmbeddingCorpus,
    dictionary: Dictionary,
    /// Sparse rows of the term-similarity matrix, sorted by column.
    matrix: Vec<Vec<(u32, f64)>>,
    documents: Vec<BagOfWords>,
    norms: Vec<f64>,
}

impl SoftCosSimilarity {
    pub fn new(base: EmbeddingCorpus, params: &SoftCosParams) -> Self {
        let dictionary = Dictionary::from_documents(base.corpus().documents());
        let matrix = term_similarity_matrix(&base, &dictionary, params);
        let documents: Vec<BagOfWords> = base.corpus().documents().iter().map(|d| dictionary.doc2bow(d)).collect();
        let norms = documents.iter().map(|d| inner(&matrix, d, d).sqrt()).collect();
        let nonzero: usize = matrix.iter().map(Vec::len).sum();
        tracing::info!(terms = dictionary.len(), nonzero, "soft-cosine index built");

        Self {
            base,
            dictionary,
            matrix,
            documents,
            norms,
        }
    }

    pub fn base(&self) -> &EmbeddingCorpus {
        &self.base
    }

    /// Soft-cosine score of the query against every document.
    fn scores(&self, query: &BagOfWords) -> Vec<f64> {
        let query_norm = inner(&self.matrix, query, query).sqrt();
        let mut projected = vec![0.0; self.dictionary.len()];
        for &(i, count) in query {
            for &(j, s) in &self.matrix[i as usize] {
                projected[j as usize] += count as f64 * s;
            }
        }
        self.documents
            .iter()
            .zip(&self.norms)
            .map(|(doc, &norm)| {
                let denom = query_norm * norm;
                if denom <= 0.0 {
                    return f64::NEG_INFINITY;
                }
                let dot: f64 = doc.iter().map(|&(j, c)| c as f64 * projected[j as usize]).sum();
                dot / denom
            })
            .collect()
    }
}

fn term_similarity_matrix(base: &EmbeddingCorpus, dictionary: &Dictionary, params: &SoftCosParams) -> Vec<Vec<(u32, f64)>> {
    let model = base.model();
    let n = dictionary.len();
    let vocab: Vec<Option<usize>> = dictionary.tokens().iter().map(|t| model.index(t)).collect();

    let mut rows: Vec<BTreeMap<u32, f64>> = (0..n as u32).map(|i| BTreeMap::from([(i, 1.0)])).collect();
    for i in 0..n {
        let Some(vi) = vocab[i] else { continue };
        let sims = model.similarities(vi);
        let mut neighbours: Vec<(usize, f64)> = vocab
            .iter()
            .enumerate()
            .filter_map(|(j, vj)| {
                let vj = (*vj)?;
                (j != i && sims[vj] > params.threshold).then(|| (j, sims[vj]))
            })
            .collect();
        neighbours.sort_by(|a, b| b.1.total_cmp(&a.1));
        neighbours.truncate(params.nonzero_limit);
        for (j, cos) in neighbours {
            let value = cos.max(0.0).powf(params.exponent);
            if value > 0.0 {
                rows[i].insert(j as u32, value);
                rows[j].insert(i as u32, value);
            }
        }
    }
    rows.into_iter().map(|row| row.into_iter().collect()).collect()
}

/// `xᵀSy` for bags of words over the matrix dictionary.
fn inner(matrix: &[Vec<(u32, f64)>], x: &BagOfWords, y: &BagOfWords) -> f64 {
    let mut total = 0.0;
    for &(i, xc) in x {
        let row = &matrix[i as usize];
        let (mut a, mut b) = (0, 0);
        while a < row.len() && b < y.len() {
            match row[a].0.cmp(&y[b].0) {
                std::cmp::Ordering::Less => a += 1,
                std::cmp::Ordering::Greater => b += 1,
                std::cmp::Ordering::Equal => {
                    total += xc as f64 * row[a].1 * y[b].1 as f64;
                    a += 1;
                    b += 1;
                }
            }
        }
    }
    total
}

impl SimilarityStrategy for SoftCosSimilarity {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Word2VecSoftCos
    }

    fn get_similar_bugs(&self, query: &BugRecord, k: usize) -> Result<Vec<BugId>> {
        let bow = self.dictionary.doc2bow(&self.base.tokens(query));
        if bow.is_empty() {
            return Ok(Vec::new());
        }
        let scores: Vec<f64> = self
            .scores(&bow)
            .into_iter()
            .map(|s| if s > 0.0 { s } else { f64::NEG_INFINITY })
            .collect();
        Ok(rank(self.base.ids(), &scores, Order::Descending, query.id, k))
    }
}
