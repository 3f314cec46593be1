//! Brute-force nearest neighbors over TF-IDF vectors.

use serde::{Deserialize, Serialize};

use super::{rank, Order, SimilarityStrategy, StrategyKind};
use crate::corpus::Corpus;
use crate::error::Result;
use crate::models::{BugId, BugRecord};
use crate::preprocess::Preprocessor;
use crate::tfidf::TfidfVectorizer;
use crate::vector::{sparse_euclidean, SparseVec};

/// Euclidean k-nearest neighbors on unit-length TF-IDF vectors of the
/// joined, preprocessed text. The bigram variant adds word bigrams.
#[derive(Debug, Serialize, Deserialize)]
pub struct NeighborsSimilarity {
    bigrams: bool,
    preprocessor: Preprocessor,
    ids: Vec<BugId>,
    vectorizer: TfidfVectorizer,
    vectors: Vec<SparseVec>,
}

impl NeighborsSimilarity {
    pub fn build(corpus: &Corpus, preprocessor: Preprocessor, bigrams: bool) -> Self {
        let texts: Vec<String> = corpus.documents().iter().map(|d| d.join(" ")).collect();
        let mut vectorizer = TfidfVectorizer::new(if bigrams { 2 } else { 1 });
        let vectors = vectorizer.fit_transform(&texts);
        tracing::info!(features = vectorizer.vocabulary_len(), bigrams, "neighbor index built");

        Self {
            bigrams,
            preprocessor,
            ids: corpus.ids().to_vec(),
            vectorizer,
            vectors,
        }
    }
}

impl SimilarityStrategy for NeighborsSimilarity {
    fn kind(&self) -> StrategyKind {
        if self.bigrams {
            StrategyKind::NeighborsTfidfBigrams
        } else {
            StrategyKind::NeighborsTfidf
        }
    }

    fn get_similar_bugs(&self, query: &BugRecord, k: usize) -> Result<Vec<BugId>> {
        let text = self.preprocessor.tokens(&query.text()).join(" ");
        let v = self.vectorizer.transform(&text);
        if v.is_empty() {
            return Ok(Vec::new());
        }

        let distances: Vec<f64> = self
            .vectors
            .iter()
            .map(|doc| {
                if doc.is_empty() {
                    f64::INFINITY
                } else {
                    sparse_euclidean(&v, doc)
                }
            })
            .collect();
        Ok(rank(&self.ids, &distances, Order::Ascending, query.id, k))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bugs() -> Vec<BugRecord> {
        vec![
            BugRecord::new(1, "video player controls broken", "controls vanish in fullscreen"),
            BugRecord::new(2, "fullscreen video controls missing", "player controls disappear"),
            BugRecord::new(3, "bookmark sync fails", "sync error after login"),
            BugRecord::new(4, "password manager prompt", "login prompt appears twice"),
        ]
    }

    fn build(bigrams: bool) -> NeighborsSimilarity {
        let pre = Preprocessor::default();
        let corpus = Corpus::build(&bugs(), &pre, 42).unwrap();
        NeighborsSimilarity::build(&corpus, pre, bigrams)
    }

    #[test]
    fn test_kinds() {
        assert_eq!(build(false).kind(), StrategyKind::NeighborsTfidf);
        assert_eq!(build(true).kind(), StrategyKind::NeighborsTfidfBigrams);
    }

    #[test]
    fn test_nearest_first_and_self_excluded() {
        for bigrams in [false, true] {
            let n = build(bigrams);
            let result = n.get_similar_bugs(&bugs()[0], 3).unwrap();
            assert_eq!(result.len(), 3);
            assert_eq!(result[0], 2);
            assert!(!result.contains(&1));
        }
    }

    #[test]
    fn test_bigram_features_added() {
        assert!(build(true).vectorizer.vocabulary_len() > build(false).vectorizer.vocabulary_len());
    }

    #[test]
    fn test_unknown_query_is_empty() {
        let q = BugRecord::new(50, "qwerty", "");
        assert!(build(false).get_similar_bugs(&q, 10).unwrap().is_empty());
    }
}
