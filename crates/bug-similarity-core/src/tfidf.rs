//! TF-IDF weighting.
//!
//! Two flavours are used across the crate:
//!
//! | Type | Input | IDF | Used by |
//! |------|-------|-----|---------|
//! | [`TfidfModel`] | bag-of-words over a [`Dictionary`] | `log2(N / df)` | LSI, relaxed WMD |
//! | [`TfidfVectorizer`] | raw text, n-grams | `ln((1 + n) / (1 + df)) + 1` | nearest-neighbor, tracking features |
//!
//! Both produce L2-normalized [`SparseVec`]s.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

use crate::corpus::{BagOfWords, Dictionary};
use crate::preprocess::stopwords::StopWords;
use crate::vector::{sparse_l2_normalize, SparseVec};

static TOKEN_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?u)\b\w\w+\b").expect("token pattern"));
static ENGLISH: Lazy<StopWords> = Lazy::new(StopWords::english);

/// Corpus-level TF-IDF over dictionary term ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TfidfModel {
    idfs: Vec<f64>,
}

impl TfidfModel {
    pub fn new(dictionary: &Dictionary) -> Self {
        let n = dictionary.num_docs() as f64;
        let idfs = (0..dictionary.len() as u32)
            .map(|id| {
                let df = dictionary.df(id) as f64;
                if df > 0.0 {
                    (n / df).log2()
                } else {
                    0.0
                }
            })
            .collect();
        Self { idfs }
    }

    /// Weight a bag of words: `tf * idf`, zeros dropped, unit length.
    pub fn transform(&self, bow: &BagOfWords) -> SparseVec {
        let mut out: SparseVec = bow
            .iter()
            .filter_map(|&(id, tf)| {
                let idf = self.idfs.get(id as usize).copied().unwrap_or(0.0);
                let w = tf as f64 * idf;
                (w.abs() > 1e-12).then_some((id, w))
            })
            .collect();
        sparse_l2_normalize(&mut out);
        out
    }

    pub fn idf(&self, id: u32) -> f64 {
        self.idfs.get(id as usize).copied().unwrap_or(0.0)
    }

    pub fn num_terms(&self) -> usize {
        self.idfs.len()
    }
}

/// Text vectorizer with word n-grams and smoothed IDF.
///
/// Terms are lowercased tokens matching `\b\w\w+\b`. The vocabulary is
/// indexed in lexicographic order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TfidfVectorizer {
    ngram_max: usize,
    stop_words: bool,
    vocabulary: HashMap<String, u32>,
    idf: Vec<f64>,
}

impl TfidfVectorizer {
    /// Unfitted vectorizer producing n-grams of length `1..=ngram_max`.
    pub fn new(ngram_max: usize) -> Self {
        Self {
            ngram_max: ngram_max.max(1),
            stop_words: false,
            vocabulary: HashMap::new(),
            idf: Vec::new(),
        }
    }

    /// Drop English stopwords before building n-grams.
    pub fn with_english_stop_words(mut self) -> Self {
        self.stop_words = true;
        self
    }

    /// Learn the vocabulary and IDF weights from `documents`.
    pub fn fit<S: AsRef<str>>(&mut self, documents: &[S]) {
        let analyzed: Vec<Vec<String>> = documents.iter().map(|d| self.analyze(d.as_ref())).collect();

        let terms: BTreeSet<&str> = analyzed.iter().flatten().map(String::as_str).collect();
        self.vocabulary = terms
            .into_iter()
            .enumerate()
            .map(|(i, t)| (t.to_string(), i as u32))
            .collect();

        let mut df = vec![0usize; self.vocabulary.len()];
        for doc in &analyzed {
            let mut seen: Vec<u32> = doc.iter().filter_map(|t| self.vocabulary.get(t).copied()).collect();
            seen.sort_unstable();
            seen.dedup();
            for id in seen {
                df[id as usize] += 1;
            }
        }

        let n = documents.len() as f64;
        self.idf = df
            .into_iter()
            .map(|d| ((1.0 + n) / (1.0 + d as f64)).ln() + 1.0)
            .collect();
    }

    /// Fit on `documents` and return their vectors.
    pub fn fit_transform<S: AsRef<str>>(&mut self, documents: &[S]) -> Vec<SparseVec> {
        self.fit(documents);
        documents.iter().map(|d| self.transform(d.as_ref())).collect()
    }

    /// Vectorize one document. Unknown terms are ignored.
    pub fn transform(&self, text: &str) -> SparseVec {
        let mut counts: HashMap<u32, f64> = HashMap::new();
        for term in self.analyze(text) {
            if let Some(&id) = self.vocabulary.get(&term) {
                *counts.entry(id).or_insert(0.0) += 1.0;
            }
        }
        let mut out: SparseVec = counts
            .into_iter()
            .map(|(id, tf)| (id, tf * self.idf[id as usize]))
            .collect();
        out.sort_unstable_by_key(|(id, _)| *id);
        sparse_l2_normalize(&mut out);
        out
    }

    pub fn vocabulary_len(&self) -> usize {
        self.vocabulary.len()
    }

    pub fn term_id(&self, term: &str) -> Option<u32> {
        self.vocabulary.get(term).copied()
    }

    /// Vocabulary terms in index order.
    pub fn feature_names(&self) -> Vec<String> {
        let mut names = vec![String::new(); self.vocabulary.len()];
        for (term, &id) in &self.vocabulary {
            names[id as usize] = term.clone();
        }
        names
    }

    fn analyze(&self, text: &str) -> Vec<String> {
        let lowered = text.to_lowercase();
        let words: Vec<&str> = TOKEN_PATTERN
            .find_iter(&lowered)
            .map(|m| m.as_str())
            .filter(|w| !self.stop_words || !ENGLISH.contains(w))
            .collect();

        let mut terms: Vec<String> = Vec::new();
        for n in 1..=self.ngram_max {
            if words.len() < n {
                break;
            }
            terms.extend(words.windows(n).map(|w| w.join(" ")));
        }
        terms
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::sparse_norm;

    fn toks(s: &str) -> Vec<String> {
        s.split_whitespace().map(String::from).collect()
    }

    #[test]
    fn test_model_drops_terms_in_every_document() {
        let docs = vec![toks("crash tab"), toks("crash hang")];
        let dict = Dictionary::from_documents(&docs);
        let model = TfidfModel::new(&dict);
        let v = model.transform(&dict.doc2bow(&docs[0]));
        // "crash" has idf log2(2/2) = 0
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].0, dict.id("tab").unwrap());
        assert!((v[0].1 - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_model_weights() {
        let docs = vec![toks("a b b"), toks("c"), toks("c"), toks("c")];
        let dict = Dictionary::from_documents(&docs);
        let model = TfidfModel::new(&dict);
        assert!((model.idf(0) - 2.0).abs() < 1e-12);
        let v = model.transform(&dict.doc2bow(&docs[0]));
        // equal idf, tf 1 vs 2
        assert!((v[1].1 / v[0].1 - 2.0).abs() < 1e-12);
        assert!((sparse_norm(&v) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_vectorizer_smooth_idf() {
        let mut vec = TfidfVectorizer::new(1);
        vec.fit(&["crash tab", "crash hang"]);
        assert_eq!(vec.feature_names(), vec!["crash", "hang", "tab"]);
        let v = vec.transform("crash tab");
        let crash = v.iter().find(|(i, _)| *i == 0).unwrap().1;
        let tab = v.iter().find(|(i, _)| *i == 2).unwrap().1;
        let idf_tab = (3.0f64 / 2.0).ln() + 1.0;
        assert!((tab / crash - idf_tab).abs() < 1e-12);
    }

    #[test]
    fn test_vectorizer_bigrams_and_short_tokens() {
        let mut vec = TfidfVectorizer::new(2);
        vec.fit(&["a video player crash"]);
        let names = vec.feature_names();
        assert!(names.contains(&"video player".to_string()));
        assert!(!names.iter().any(|n| n == "a"));
        assert_eq!(names.len(), 5);
    }

    #[test]
    fn test_vectorizer_stop_words() {
        let mut vec = TfidfVectorizer::new(1).with_english_stop_words();
        vec.fit(&["the page is blank"]);
        assert_eq!(vec.feature_names(), vec!["blank", "page"]);
    }

    #[test]
    fn test_unknown_text_is_empty() {
        let mut vec = TfidfVectorizer::new(1);
        vec.fit(&["crash"]);
        assert!(vec.transform("hang freeze").is_empty());
    }
}
