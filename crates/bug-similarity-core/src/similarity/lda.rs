//! Topic-distribution ranking with LDA and Hellinger distance.

use serde::{Deserialize, Serialize};

use super::{rank, Order, SimilarityStrategy, StrategyKind};
use crate::corpus::{BagOfWords, Corpus, Dictionary};
use crate::error::Result;
use crate::lda::{LdaModel, LdaParams};
use crate::models::{BugId, BugRecord};
use crate::preprocess::Preprocessor;
use crate::vector::hellinger;

#[derive(Debug, Serialize, Deserialize)]
pub struct LdaSimilarity {
    preprocessor: Preprocessor,
    ids: Vec<BugId>,
    dictionary: Dictionary,
    model: LdaModel,
    /// Dense topic distributions; `None` for documents with no known terms.
    distributions: Vec<Option<Vec<f64>>>,
}

impl LdaSimilarity {
    pub fn build(corpus: &Corpus, preprocessor: Preprocessor, params: &LdaParams, seed: u64) -> Result<Self> {
        let dictionary = Dictionary::from_documents(corpus.documents());
        let bows: Vec<BagOfWords> = corpus.documents().iter().map(|d| dictionary.doc2bow(d)).collect();
        let model = LdaModel::train(&bows, dictionary.len(), params, seed)?;
        let distributions = bows
            .iter()
            .map(|bow| (!bow.is_empty()).then(|| model.topic_distribution(bow)))
            .collect();

        Ok(Self {
            preprocessor,
            ids: corpus.ids().to_vec(),
            dictionary,
            model,
            distributions,
        })
    }

    fn distribution(&self, bug: &BugRecord) -> Option<Vec<f64>> {
        let bow = self.dictionary.doc2bow(&self.preprocessor.tokens(&bug.text()));
        (!bow.is_empty()).then(|| self.model.topic_distribution(&bow))
    }
}

impl SimilarityStrategy for LdaSimilarity {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Lda
    }

    fn get_similar_bugs(&self, query: &BugRecord, k: usize) -> Result<Vec<BugId>> {
        let Some(q) = self.distribution(query) else {
            return Ok(Vec::new());
        };
        let distances: Vec<f64> = self
            .distributions
            .iter()
            .map(|d| d.as_ref().map_or(f64::INFINITY, |d| hellinger(&q, d)))
            .collect();
        Ok(rank(&self.ids, &distances, Order::Ascending, query.id, k))
    }

    /// Hellinger distance between the two topic distributions.
    fn get_distance(&self, a: &BugRecord, b: &BugRecord) -> Result<f64> {
        match (self.distribution(a), self.distribution(b)) {
            (Some(p), Some(q)) => Ok(hellinger(&p, &q)),
            _ => Ok(f64::INFINITY),
        }
    }
}
