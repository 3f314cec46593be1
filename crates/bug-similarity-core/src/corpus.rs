//! Corpus snapshot, term dictionary, and bag-of-words conversion.
//!
//! A [`Corpus`] holds bug ids and their preprocessed token streams in two
//! index-aligned vectors. It is built once from a full snapshot, shuffled
//! with a seeded RNG so batch training sees documents in uncorrelated
//! order, and never mutated afterwards.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{Result, SimilarityError};
use crate::models::{BugId, BugRecord};
use crate::preprocess::Preprocessor;

/// Sparse term counts: `(term id, count)` sorted by term id.
pub type BagOfWords = Vec<(u32, u32)>;

/// Index-aligned bug ids and token streams.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Corpus {
    ids: Vec<BugId>,
    documents: Vec<Vec<String>>,
}

impl Corpus {
    /// Preprocess every bug and shuffle the result with `seed`.
    ///
    /// Fails with [`SimilarityError::EmptyCorpus`] when `bugs` is empty.
    pub fn build(bugs: &[BugRecord], preprocessor: &Preprocessor, seed: u64) -> Result<Self> {
        if bugs.is_empty() {
            return Err(SimilarityError::EmptyCorpus);
        }

        let mut order: Vec<usize> = (0..bugs.len()).collect();
        order.shuffle(&mut StdRng::seed_from_u64(seed));

        let mut ids = Vec::with_capacity(bugs.len());
        let mut documents = Vec::with_capacity(bugs.len());
        for idx in order {
            let bug = &bugs[idx];
            ids.push(bug.id);
            documents.push(preprocessor.tokens(&bug.text()));
        }

        let tokens: usize = documents.iter().map(Vec::len).sum();
        tracing::info!(documents = ids.len(), tokens, "corpus built");

        Ok(Self { ids, documents })
    }

    /// Wrap already-tokenized documents without shuffling.
    pub fn from_documents(ids: Vec<BugId>, documents: Vec<Vec<String>>) -> Result<Self> {
        if ids.is_empty() {
            return Err(SimilarityError::EmptyCorpus);
        }
        if ids.len() != documents.len() {
            return Err(SimilarityError::InsufficientVocabulary(format!(
                "{} ids for {} documents",
                ids.len(),
                documents.len()
            )));
        }
        Ok(Self { ids, documents })
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> &[BugId] {
        &self.ids
    }

    pub fn documents(&self) -> &[Vec<String>] {
        &self.documents
    }

    pub fn id(&self, index: usize) -> BugId {
        self.ids[index]
    }

    pub fn document(&self, index: usize) -> &[String] {
        &self.documents[index]
    }
}

/// Token <-> integer id mapping with document frequencies.
///
/// Ids are assigned in order of first appearance across the documents.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Dictionary {
    token2id: HashMap<String, u32>,
    id2token: Vec<String>,
    dfs: Vec<u32>,
    num_docs: usize,
}

impl Dictionary {
    pub fn from_documents<D: AsRef<[String]>>(documents: &[D]) -> Self {
        let mut dict = Dictionary::default();
        for doc in documents {
            dict.num_docs += 1;
            let mut seen: Vec<u32> = Vec::new();
            for token in doc.as_ref() {
                let id = match dict.token2id.get(token) {
                    Some(&id) => id,
                    None => {
                        let id = dict.id2token.len() as u32;
                        dict.token2id.insert(token.clone(), id);
                        dict.id2token.push(token.clone());
                        dict.dfs.push(0);
                        id
                    }
                };
                seen.push(id);
            }
            seen.sort_unstable();
            seen.dedup();
            for id in seen {
                dict.dfs[id as usize] += 1;
            }
        }
        dict
    }

    /// Count known tokens; unknown tokens are ignored.
    pub fn doc2bow(&self, tokens: &[String]) -> BagOfWords {
        let mut counts: HashMap<u32, u32> = HashMap::new();
        for token in tokens {
            if let Some(&id) = self.token2id.get(token) {
                *counts.entry(id).or_insert(0) += 1;
            }
        }
        let mut bow: BagOfWords = counts.into_iter().collect();
        bow.sort_unstable_by_key(|(id, _)| *id);
        bow
    }

    pub fn id(&self, token: &str) -> Option<u32> {
        self.token2id.get(token).copied()
    }

    pub fn token(&self, id: u32) -> &str {
        &self.id2token[id as usize]
    }

    /// Number of documents containing term `id`.
    pub fn df(&self, id: u32) -> u32 {
        self.dfs[id as usize]
    }

    pub fn num_docs(&self) -> usize {
        self.num_docs
    }

    pub fn len(&self) -> usize {
        self.id2token.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id2token.is_empty()
    }

    pub fn tokens(&self) -> &[String] {
        &self.id2token
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(s: &str) -> Vec<String> {
        s.split_whitespace().map(String::from).collect()
    }

    #[test]
    fn test_corpus_stays_aligned_after_shuffle() {
        let bugs: Vec<BugRecord> = (1..=20)
            .map(|i| BugRecord::new(i, &format!("summary{}", i), ""))
            .collect();
        let corpus = Corpus::build(&bugs, &Preprocessor::default(), 7).unwrap();
        assert_eq!(corpus.len(), 20);
        for (i, id) in corpus.ids().iter().enumerate() {
            assert_eq!(corpus.document(i), &[format!("summary{}", id)][..]);
        }
    }

    #[test]
    fn test_corpus_shuffle_is_seeded() {
        let bugs: Vec<BugRecord> = (1..=30).map(|i| BugRecord::new(i, "a", "")).collect();
        let pre = Preprocessor::default();
        let a = Corpus::build(&bugs, &pre, 3).unwrap();
        let b = Corpus::build(&bugs, &pre, 3).unwrap();
        assert_eq!(a.ids(), b.ids());
    }

    #[test]
    fn test_empty_corpus_rejected() {
        let err = Corpus::build(&[], &Preprocessor::default(), 1).unwrap_err();
        assert!(matches!(err, SimilarityError::EmptyCorpus));
    }

    #[test]
    fn test_dictionary_ids_and_dfs() {
        let docs = vec![toks("crash tab crash"), toks("tab hang")];
        let dict = Dictionary::from_documents(&docs);
        assert_eq!(dict.len(), 3);
        assert_eq!(dict.id("crash"), Some(0));
        assert_eq!(dict.id("tab"), Some(1));
        assert_eq!(dict.df(1), 2);
        assert_eq!(dict.df(0), 1);
        assert_eq!(dict.num_docs(), 2);
    }

    #[test]
    fn test_doc2bow_ignores_unknown() {
        let docs = vec![toks("crash tab"), toks("hang")];
        let dict = Dictionary::from_documents(&docs);
        let bow = dict.doc2bow(&toks("hang crash crash missing"));
        assert_eq!(bow, vec![(0, 2), (2, 1)]);
    }
}
