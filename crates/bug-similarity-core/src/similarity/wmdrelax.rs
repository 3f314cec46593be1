//! Relaxed Word Mover's Distance.
//!
//! Documents are TF-IDF weighted bags of words restricted to the embedding
//! vocabulary, rescaled to sum to one. Ranking uses the relaxed bound
//! itself (each side moves all of its mass to the nearest word of the
//! other side, larger side kept) instead of solving the transport problem.

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use super::embedding::EmbeddingCorpus;
use super::wmd::relaxed_bound;
use super::{rank, Order, SimilarityStrategy, StrategyKind};
use crate::corpus::Dictionary;
use crate::error::Result;
use crate::models::{BugId, BugRecord};
use crate::tfidf::TfidfModel;

#[derive(Debug, Serialize, Deserialize)]
pub struct WmdRelaxSimilarity {
    base: EmbeddingCorpus,
    dictionary: Dictionary,
    tfidf: TfidfModel,
    /// Per document `(vocabulary index, weight)`, weights summing to one.
    documents: Vec<Vec<(usize, f64)>>,
}

impl WmdRelaxSimilarity {
    pub fn new(base: EmbeddingCorpus) -> Self {
        let dictionary = Dictionary::from_documents(base.corpus().documents());
        let tfidf = TfidfModel::new(&dictionary);
        let mut this = Self {
            base,
            dictionary,
            tfidf,
            documents: Vec::new(),
        };
        this.documents = this
            .base
            .corpus()
            .documents()
            .iter()
            .map(|d| this.weights(d))
            .collect();
        let empty = this.documents.iter().filter(|d| d.is_empty()).count();
        tracing::info!(documents = this.documents.len(), empty, "relaxed wmd index built");
        this
    }

    pub fn base(&self) -> &EmbeddingCorpus {
        &self.base
    }

    /// TF-IDF weights of the in-vocabulary terms, sorted by vocabulary index.
    fn weights(&self, tokens: &[String]) -> Vec<(usize, f64)> {
        let model = self.base.model();
        let mut weights: Vec<(usize, f64)> = self
            .tfidf
            .transform(&self.dictionary.doc2bow(tokens))
            .into_iter()
            .filter_map(|(id, w)| Some((model.index(self.dictionary.token(id))?, w)))
            .collect();
        let total: f64 = weights.iter().map(|&(_, w)| w).sum();
        if total <= 0.0 {
            return Vec::new();
        }
        weights.iter_mut().for_each(|(_, w)| *w /= total);
        weights.sort_by_key(|&(i, _)| i);
        weights
    }
}

fn split(weights: &[(usize, f64)]) -> (Vec<usize>, Vec<f64>) {
    weights.iter().copied().unzip()
}

impl SimilarityStrategy for WmdRelaxSimilarity {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Word2VecWmdRelax
    }

    fn get_similar_bugs(&self, query: &BugRecord, k: usize) -> Result<Vec<BugId>> {
        let q = self.weights(&self.base.tokens(query));
        if q.is_empty() {
            return Ok(Vec::new());
        }
        let (query_words, query_weights) = split(&q);
        let all_distances = self.base.model().distance_matrix(&query_words);

        let distances: Vec<f64> = self
            .documents
            .iter()
            .map(|doc| {
                if doc.is_empty() {
                    return f64::INFINITY;
                }
                let (doc_words, doc_weights) = split(doc);
                let cost = Array2::from_shape_fn((doc_words.len(), query_words.len()), |(i, j)| {
                    all_distances[[doc_words[i], j]]
                });
                if cost.sum() == 0.0 {
                    return f64::INFINITY;
                }
                relaxed_bound(&doc_weights, &query_weights, &cost)
            })
            .collect();
        Ok(rank(self.base.ids(), &distances, Order::Ascending, query.id, k))
    }

    fn get_distance(&self, a: &BugRecord, b: &BugRecord) -> Result<f64> {
        let a = self.weights(&self.base.tokens(a));
        let b = self.weights(&self.base.tokens(b));
        if a.is_empty() || b.is_empty() {
            return Ok(f64::INFINITY);
        }
        let model = self.base.model();
        let cost = Array2::from_shape_fn((a.len(), b.len()), |(i, j)| {
            (1.0 - model.similarity(a[i].0, b[j].0)).max(0.0)
        });
        if cost.sum() == 0.0 {
            return Ok(f64::INFINITY);
        }
        let (_, a_weights) = split(&a);
        let (_, b_weights) = split(&b);
        Ok(relaxed_bound(&a_weights, &b_weights, &cost))
    }
}
