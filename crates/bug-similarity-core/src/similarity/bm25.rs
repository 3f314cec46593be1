//! Okapi BM25 ranking.
//!
//! `idf(t) = ln(N - df + 0.5) - ln(df + 0.5)`. Terms present in more than
//! half the corpus get a negative idf, which is replaced by
//! `epsilon * mean(idf)` so frequent terms still contribute a little.

use serde::{Deserialize, Serialize};

use super::{rank, Order, SimilarityStrategy, StrategyKind};
use crate::corpus::{BagOfWords, Corpus, Dictionary};
use crate::error::Result;
use crate::models::{BugId, BugRecord};
use crate::preprocess::Preprocessor;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Bm25Params {
    pub k1: f64,
    pub b: f64,
    pub epsilon: f64,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self {
            k1: 1.5,
            b: 0.75,
            epsilon: 0.25,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Bm25Similarity {
    params: Bm25Params,
    preprocessor: Preprocessor,
    ids: Vec<BugId>,
    dictionary: Dictionary,
    documents: Vec<BagOfWords>,
    lengths: Vec<usize>,
    avg_length: f64,
    idf: Vec<f64>,
}

impl Bm25Similarity {
    pub fn build(corpus: &Corpus, preprocessor: Preprocessor, params: &Bm25Params) -> Self {
        let dictionary = Dictionary::from_documents(corpus.documents());
        let documents: Vec<BagOfWords> = corpus.documents().iter().map(|d| dictionary.doc2bow(d)).collect();
        let lengths: Vec<usize> = corpus.documents().iter().map(Vec::len).collect();
        let avg_length = lengths.iter().sum::<usize>() as f64 / lengths.len().max(1) as f64;

        let n = corpus.len() as f64;
        let mut idf: Vec<f64> = (0..dictionary.len() as u32)
            .map(|id| {
                let df = dictionary.df(id) as f64;
                (n - df + 0.5).ln() - (df + 0.5).ln()
            })
            .collect();
        let mean_idf = if idf.is_empty() {
            0.0
        } else {
            idf.iter().sum::<f64>() / idf.len() as f64
        };
        let floor = params.epsilon * mean_idf;
        idf.iter_mut().filter(|v| **v < 0.0).for_each(|v| *v = floor);

        tracing::info!(terms = dictionary.len(), avg_length, "bm25 index built");

        Self {
            params: params.clone(),
            preprocessor,
            ids: corpus.ids().to_vec(),
            dictionary,
            documents,
            lengths,
            avg_length,
            idf,
        }
    }

    /// Score of every document for the query term ids (duplicates count).
    pub fn scores(&self, query_terms: &[u32]) -> Vec<f64> {
        let Bm25Params { k1, b, .. } = self.params;
        self.documents
            .iter()
            .zip(&self.lengths)
            .map(|(doc, &len)| {
                if len == 0 {
                    return f64::NEG_INFINITY;
                }
                let norm = k1 * (1.0 - b + b * len as f64 / self.avg_length);
                query_terms
                    .iter()
                    .filter_map(|t| {
                        let pos = doc.binary_search_by_key(t, |&(id, _)| id).ok()?;
                        let tf = doc[pos].1 as f64;
                        Some(self.idf[*t as usize] * tf * (k1 + 1.0) / (tf + norm))
                    })
                    .sum()
            })
            .collect()
    }
}

impl SimilarityStrategy for Bm25Similarity {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Bm25
    }

    fn get_similar_bugs(&self, query: &BugRecord, k: usize) -> Result<Vec<BugId>> {
        let terms: Vec<u32> = self
            .preprocessor
            .tokens(&query.text())
            .iter()
            .filter_map(|t| self.dictionary.id(t))
            .collect();
        if terms.is_empty() {
            return Ok(Vec::new());
        }
        let scores = self.scores(&terms);
        Ok(rank(&self.ids, &scores, Order::Descending, query.id, k))
    }
}
