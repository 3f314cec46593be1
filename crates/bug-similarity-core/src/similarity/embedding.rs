//! Shared base of the word-embedding strategies.
//!
//! [`EmbeddingCorpus`] owns the shuffled corpus, the bug ids, the trained
//! [`Word2Vec`] model and the distance cut-off. The exact WMD, relaxed
//! WMD and soft-cosine strategies wrap it and differ only in how they
//! compare documents.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::corpus::Corpus;
use crate::error::Result;
use crate::models::{BugId, BugRecord};
use crate::preprocess::Preprocessor;
use crate::word2vec::{PretrainedVectors, Word2Vec, Word2VecParams};

#[derive(Debug, Serialize, Deserialize)]
pub struct EmbeddingCorpus {
    preprocessor: Preprocessor,
    corpus: Corpus,
    model: Word2Vec,
    cut_off: f64,
}

impl EmbeddingCorpus {
    /// Train embeddings on the corpus, seeded from `params.pretrained` if set.
    pub fn build(
        corpus: Corpus,
        preprocessor: Preprocessor,
        params: &Word2VecParams,
        cut_off: f64,
        seed: u64,
    ) -> Result<Self> {
        let pretrained = match &params.pretrained {
            Some(path) => {
                let vectors = PretrainedVectors::from_path(path)?;
                tracing::info!(path = %path.display(), words = vectors.len(), "loaded pretrained vectors");
                Some(vectors)
            }
            None => None,
        };
        let model = Word2Vec::train(corpus.documents(), params, seed, pretrained.as_ref())?;
        Ok(Self {
            preprocessor,
            corpus,
            model,
            cut_off,
        })
    }

    pub fn ids(&self) -> &[BugId] {
        self.corpus.ids()
    }

    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    pub fn model(&self) -> &Word2Vec {
        &self.model
    }

    pub fn preprocessor(&self) -> &Preprocessor {
        &self.preprocessor
    }

    pub fn cut_off(&self) -> f64 {
        self.cut_off
    }

    /// Preprocessed tokens of `bug`.
    pub fn tokens(&self, bug: &BugRecord) -> Vec<String> {
        self.preprocessor.tokens(&bug.text())
    }

    /// Vocabulary indices of the in-vocabulary tokens, in text order.
    pub fn vocab_indices(&self, tokens: &[String]) -> Vec<usize> {
        tokens.iter().filter_map(|t| self.model.index(t)).collect()
    }

    /// Normalized bag of words over vocabulary indices.
    ///
    /// Unique words sorted by index, each weighted `count / len`.
    pub fn nbow(&self, tokens: &[String]) -> Vec<(usize, f64)> {
        nbow(&self.vocab_indices(tokens))
    }
}

pub(crate) fn nbow(indices: &[usize]) -> Vec<(usize, f64)> {
    let mut counts: BTreeMap<usize, usize> = BTreeMap::new();
    for &i in indices {
        *counts.entry(i).or_insert(0) += 1;
    }
    let total = indices.len() as f64;
    counts.into_iter().map(|(i, c)| (i, c as f64 / total)).collect()
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nbow_weights() {
        let bow = nbow(&[4, 1, 4, 4]);
        assert_eq!(bow, vec![(1, 0.25), (4, 0.75)]);
        assert!(nbow(&[]).is_empty());
    }

    #[test]
    fn test_vocab_indices_skip_unknown() {
        let base = fixtures::base(0.2);
        let tokens = vec!["crash".to_string(), "zzz".to_string(), "video".to_string()];
        assert_eq!(base.vocab_indices(&tokens).len(), 2);
        assert_eq!(base.ids().len(), 9);
    }

    #[test]
    fn test_missing_pretrained_file_fails() {
        let pre = Preprocessor::default();
        let corpus = Corpus::build(&fixtures::bugs(), &pre, 1).unwrap();
        let params = Word2VecParams {
            pretrained: Some("/nonexistent/vectors.txt".into()),
            ..fixtures::params()
        };
        assert!(EmbeddingCorpus::build(corpus, pre, &params, 0.2, 1).is_err());
    }
}
