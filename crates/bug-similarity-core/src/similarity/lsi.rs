//! Latent semantic indexing.
//!
//! Documents are weighted with [`TfidfModel`], projected onto the top
//! singular vectors of the term-document matrix, and compared by cosine
//! similarity in the latent space.

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use super::{rank, Order, SimilarityStrategy, StrategyKind};
use crate::corpus::{Corpus, Dictionary};
use crate::error::Result;
use crate::linalg::{randomized_svd, TruncatedSvd};
use crate::models::{BugId, BugRecord};
use crate::preprocess::Preprocessor;
use crate::tfidf::TfidfModel;
use crate::vector::{dot, l2_normalize, SparseVec};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LsiParams {
    /// Latent dimensions; clamped to the rank of the term-document matrix.
    pub num_topics: usize,
}

impl Default for LsiParams {
    fn default() -> Self {
        Self { num_topics: 300 }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LsiSimilarity {
    preprocessor: Preprocessor,
    ids: Vec<BugId>,
    dictionary: Dictionary,
    tfidf: TfidfModel,
    svd: TruncatedSvd,
    /// Unit-length latent vectors; empty for documents with no weighted terms.
    index: Vec<Vec<f64>>,
}

impl LsiSimilarity {
    pub fn build(corpus: &Corpus, preprocessor: Preprocessor, params: &LsiParams, seed: u64) -> Result<Self> {
        let dictionary = Dictionary::from_documents(corpus.documents());
        let tfidf = TfidfModel::new(&dictionary);
        let weighted: Vec<SparseVec> = corpus
            .documents()
            .iter()
            .map(|doc| tfidf.transform(&dictionary.doc2bow(doc)))
            .collect();

        let mut rng = StdRng::seed_from_u64(seed);
        let svd = randomized_svd(&weighted, dictionary.len(), params.num_topics, &mut rng);
        tracing::info!(
            terms = dictionary.len(),
            topics = svd.rank(),
            "latent semantic index built"
        );

        let index = weighted.iter().map(|v| project(&svd, v)).collect();

        Ok(Self {
            preprocessor,
            ids: corpus.ids().to_vec(),
            dictionary,
            tfidf,
            svd,
            index,
        })
    }

    pub fn num_topics(&self) -> usize {
        self.svd.rank()
    }
}

/// Unit-length projection, or empty when nothing survives weighting.
fn project(svd: &TruncatedSvd, v: &SparseVec) -> Vec<f64> {
    if v.is_empty() {
        return Vec::new();
    }
    let mut latent = svd.project(v);
    l2_normalize(&mut latent);
    if latent.iter().all(|x| *x == 0.0) {
        return Vec::new();
    }
    latent
}

impl SimilarityStrategy for LsiSimilarity {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Lsi
    }

    fn get_similar_bugs(&self, query: &BugRecord, k: usize) -> Result<Vec<BugId>> {
        let tokens = self.preprocessor.tokens(&query.text());
        let weighted = self.tfidf.transform(&self.dictionary.doc2bow(&tokens));
        let latent = project(&self.svd, &weighted);
        if latent.is_empty() {
            return Ok(Vec::new());
        }

        let scores: Vec<f64> = self
            .index
            .iter()
            .map(|doc| if doc.is_empty() { f64::NEG_INFINITY } else { dot(&latent, doc) })
            .collect();
        Ok(rank(&self.ids, &scores, Order::Descending, query.id, k))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SimilarityError;

    fn bugs() -> Vec<BugRecord> {
        vec![
            BugRecord::new(1, "Browser crash on startup", "Firefox crashes immediately at launch"),
            BugRecord::new(2, "Crash at startup", "The browser crashes when launching"),
            BugRecord::new(3, "Dark mode feature request", "Please add a dark theme"),
            BugRecord::new(4, "Video playback stutters", "YouTube video playback is choppy"),
            BugRecord::new(5, "Theme request", "Support a dark color theme"),
        ]
    }

    fn build() -> LsiSimilarity {
        let pre = Preprocessor::default();
        let corpus = Corpus::build(&bugs(), &pre, 42).unwrap();
        LsiSimilarity::build(&corpus, pre, &LsiParams::default(), 42).unwrap()
    }

    #[test]
    fn test_num_topics_clamped_to_rank() {
        assert!(build().num_topics() <= 5);
    }

    #[test]
    fn test_related_bug_ranked_first() {
        let lsi = build();
        let result = lsi.get_similar_bugs(&bugs()[0], 10).unwrap();
        assert_eq!(result.first(), Some(&2));
        assert!(!result.contains(&1));
    }

    #[test]
    fn test_unknown_query_is_empty() {
        let lsi = build();
        let query = BugRecord::new(99, "zzzz qqqq", "");
        assert!(lsi.get_similar_bugs(&query, 10).unwrap().is_empty());
    }

    #[test]
    fn test_distance_not_supported() {
        let lsi = build();
        let b = bugs();
        assert!(matches!(
            lsi.get_distance(&b[0], &b[1]),
            Err(SimilarityError::NotSupported { strategy: "lsi" })
        ));
    }
}
