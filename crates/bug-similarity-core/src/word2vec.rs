//! Word embeddings trained with negative sampling.
//!
//! Supports CBOW (default) and skip-gram. Training is single-threaded and
//! fully determined by the seed. After training every vector is scaled to
//! unit length, so cosine similarity is a plain dot product.
//!
//! A pretrained model in the word2vec text format can seed training: its
//! words are merged into the vocabulary, their rows start from the
//! pretrained values, and updates to them are scaled by `lockf`
//! (`0.0` keeps them frozen).

use ndarray::{Array1, Array2, ArrayView1};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use crate::error::{Result, SimilarityError};

/// Training hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Word2VecParams {
    pub dims: usize,
    pub window: usize,
    pub min_count: usize,
    pub negative: usize,
    pub sample: f64,
    pub epochs: usize,
    pub alpha: f64,
    pub min_alpha: f64,
    pub skip_gram: bool,
    /// Optional word2vec text file used to seed the vocabulary.
    pub pretrained: Option<PathBuf>,
    /// Learning-rate factor applied to pretrained rows.
    pub lockf: f64,
}

impl Default for Word2VecParams {
    fn default() -> Self {
        Self {
            dims: 100,
            window: 5,
            min_count: 5,
            negative: 5,
            sample: 1e-3,
            epochs: 5,
            alpha: 0.025,
            min_alpha: 0.0001,
            skip_gram: false,
            pretrained: None,
            lockf: 0.0,
        }
    }
}

/// Vectors parsed from a word2vec text file.
#[derive(Debug, Clone)]
pub struct PretrainedVectors {
    dims: usize,
    words: Vec<String>,
    vectors: Vec<Vec<f64>>,
}

impl PretrainedVectors {
    pub fn from_path(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Self::read(BufReader::new(file))
    }

    /// Parse `<count> <dims>` then one `word v1 .. vd` line per word.
    pub fn read<R: BufRead>(reader: R) -> Result<Self> {
        let mut lines = reader.lines();
        let header = lines.next().ok_or_else(|| SimilarityError::Pretrained {
            line: 1,
            reason: "missing header".to_string(),
        })??;

        let mut fields = header.split_whitespace();
        let mut header_field = |name: &str| -> Result<usize> {
            fields
                .next()
                .and_then(|f| f.parse().ok())
                .ok_or_else(|| SimilarityError::Pretrained {
                    line: 1,
                    reason: format!("header must be '<count> <dims>', bad {}", name),
                })
        };
        let count = header_field("count")?;
        let dims = header_field("dims")?;

        let mut words = Vec::with_capacity(count);
        let mut vectors = Vec::with_capacity(count);
        for (offset, line) in lines.enumerate() {
            let line_no = offset + 2;
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let mut parts = line.split_whitespace();
            let word = parts.next().unwrap_or_default().to_string();
            let values: Vec<f64> = parts
                .map(|p| p.parse::<f64>())
                .collect::<std::result::Result<_, _>>()
                .map_err(|e| SimilarityError::Pretrained {
                    line: line_no,
                    reason: e.to_string(),
                })?;
            if values.len() != dims {
                return Err(SimilarityError::Pretrained {
                    line: line_no,
                    reason: format!("expected {} values, found {}", dims, values.len()),
                });
            }
            words.push(word);
            vectors.push(values);
        }

        if words.len() != count {
            return Err(SimilarityError::Pretrained {
                line: words.len() + 1,
                reason: format!("header announces {} vectors, found {}", count, words.len()),
            });
        }

        Ok(Self { dims, words, vectors })
    }

    pub fn dims(&self) -> usize {
        self.dims
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

/// A trained embedding: vocabulary plus unit-length vectors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Word2Vec {
    index: HashMap<String, usize>,
    words: Vec<String>,
    vectors: Array2<f64>,
}

impl Word2Vec {
    /// Train on tokenized sentences.
    ///
    /// Fails with [`SimilarityError::InsufficientVocabulary`] when no word
    /// reaches `min_count` and nothing was pretrained.
    pub fn train(
        sentences: &[Vec<String>],
        params: &Word2VecParams,
        seed: u64,
        pretrained: Option<&PretrainedVectors>,
    ) -> Result<Self> {
        if let Some(p) = pretrained {
            if p.dims() != params.dims {
                return Err(SimilarityError::Pretrained {
                    line: 1,
                    reason: format!("pretrained dims {} != configured dims {}", p.dims(), params.dims),
                });
            }
        }

        let vocab = Vocabulary::build(sentences, params.min_count, pretrained);
        if vocab.words.is_empty() {
            return Err(SimilarityError::InsufficientVocabulary(format!(
                "no token occurs at least {} times",
                params.min_count
            )));
        }
        tracing::info!(
            vocabulary = vocab.words.len(),
            dims = params.dims,
            skip_gram = params.skip_gram,
            "training word embeddings"
        );

        let mut trainer = Trainer::new(&vocab, params, seed, pretrained);
        trainer.run(sentences, &vocab);

        let mut vectors = Array2::from_shape_vec((vocab.words.len(), params.dims), trainer.syn0)
            .map_err(|e| SimilarityError::Model(e.to_string()))?;
        for mut row in vectors.rows_mut() {
            let norm = row.dot(&row).sqrt();
            if norm > f64::EPSILON {
                row.mapv_inplace(|x| x / norm);
            }
        }

        Ok(Self {
            index: vocab.index,
            words: vocab.words,
            vectors,
        })
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn dims(&self) -> usize {
        self.vectors.ncols()
    }

    pub fn index(&self, word: &str) -> Option<usize> {
        self.index.get(word).copied()
    }

    pub fn contains(&self, word: &str) -> bool {
        self.index.contains_key(word)
    }

    pub fn word(&self, idx: usize) -> &str {
        &self.words[idx]
    }

    pub fn vector(&self, idx: usize) -> ArrayView1<'_, f64> {
        self.vectors.row(idx)
    }

    /// Cosine similarity of two vocabulary entries.
    pub fn similarity(&self, a: usize, b: usize) -> f64 {
        self.vectors.row(a).dot(&self.vectors.row(b))
    }

    /// Cosine similarity of `idx` against every vocabulary entry.
    pub fn similarities(&self, idx: usize) -> Array1<f64> {
        self.vectors.dot(&self.vectors.row(idx))
    }

    /// `vocab x columns.len()` matrix of cosine distances `1 - cos`,
    /// clamped at zero.
    pub fn distance_matrix(&self, columns: &[usize]) -> Array2<f64> {
        let selected = self.vectors.select(ndarray::Axis(0), columns);
        let mut m = self.vectors.dot(&selected.t());
        m.mapv_inplace(|cos| (1.0 - cos).max(0.0));
        m
    }
}

/// Vocabulary sorted by descending count, ties by word.
struct Vocabulary {
    index: HashMap<String, usize>,
    words: Vec<String>,
    counts: Vec<u64>,
}

impl Vocabulary {
    fn build(sentences: &[Vec<String>], min_count: usize, pretrained: Option<&PretrainedVectors>) -> Self {
        let mut raw: HashMap<&str, u64> = HashMap::new();
        for sentence in sentences {
            for token in sentence {
                *raw.entry(token.as_str()).or_insert(0) += 1;
            }
        }

        let mut entries: Vec<(String, u64)> = raw
            .into_iter()
            .filter(|(_, c)| *c as usize >= min_count)
            .map(|(w, c)| (w.to_string(), c))
            .collect();

        if let Some(p) = pretrained {
            let present: std::collections::HashSet<String> =
                entries.iter().map(|(w, _)| w.clone()).collect();
            for word in &p.words {
                if !present.contains(word) {
                    entries.push((word.clone(), 0));
                }
            }
        }

        entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        entries.dedup_by(|a, b| a.0 == b.0);

        let index = entries.iter().enumerate().map(|(i, (w, _))| (w.clone(), i)).collect();
        let (words, counts) = entries.into_iter().unzip();
        Self { index, words, counts }
    }
}

struct Trainer<'a> {
    params: &'a Word2VecParams,
    dims: usize,
    rng: StdRng,
    syn0: Vec<f64>,
    syn1neg: Vec<f64>,
    lockf: Vec<f64>,
    cum_table: Vec<f64>,
    keep_prob: Vec<f64>,
}

impl<'a> Trainer<'a> {
    fn new(vocab: &Vocabulary, params: &'a Word2VecParams, seed: u64, pretrained: Option<&PretrainedVectors>) -> Self {
        let dims = params.dims;
        let v = vocab.words.len();
        let mut rng = StdRng::seed_from_u64(seed);

        let mut syn0: Vec<f64> = (0..v * dims).map(|_| (rng.gen::<f64>() - 0.5) / dims as f64).collect();
        let mut lockf = vec![1.0; v];
        if let Some(p) = pretrained {
            for (word, vec) in p.words.iter().zip(&p.vectors) {
                if let Some(&i) = vocab.index.get(word) {
                    syn0[i * dims..(i + 1) * dims].copy_from_slice(vec);
                    lockf[i] = params.lockf;
                }
            }
        }

        let mut acc = 0.0;
        let cum_table = vocab
            .counts
            .iter()
            .map(|&c| {
                acc += (c as f64).powf(0.75);
                acc
            })
            .collect();

        let total: u64 = vocab.counts.iter().sum();
        let threshold = params.sample * total as f64;
        let keep_prob = vocab
            .counts
            .iter()
            .map(|&c| {
                if params.sample <= 0.0 || c == 0 {
                    1.0
                } else {
                    let c = c as f64;
                    (((c / threshold).sqrt() + 1.0) * threshold / c).min(1.0)
                }
            })
            .collect();

        Self {
            params,
            dims,
            rng,
            syn0,
            syn1neg: vec![0.0; v * dims],
            lockf,
            cum_table,
            keep_prob,
        }
    }

    fn run(&mut self, sentences: &[Vec<String>], vocab: &Vocabulary) {
        let indexed: Vec<Vec<usize>> = sentences
            .iter()
            .map(|s| s.iter().filter_map(|t| vocab.index.get(t).copied()).collect())
            .collect();
        let words_per_epoch: usize = indexed.iter().map(Vec::len).sum();
        let total_words = (words_per_epoch * self.params.epochs).max(1) as f64;
        let mut processed = 0usize;

        for epoch in 0..self.params.epochs {
            for sentence in &indexed {
                let alpha = self.params.alpha
                    - (self.params.alpha - self.params.min_alpha) * (processed as f64 / total_words);
                let alpha = alpha.max(self.params.min_alpha);
                processed += sentence.len();

                let kept: Vec<usize> = sentence
                    .iter()
                    .copied()
                    .filter(|&w| self.keep_prob[w] >= 1.0 || self.keep_prob[w] >= self.rng.gen::<f64>())
                    .collect();
                self.train_sentence(&kept, alpha);
            }
            tracing::debug!(epoch, "word embedding epoch complete");
        }
    }

    fn train_sentence(&mut self, sentence: &[usize], alpha: f64) {
        let window = self.params.window.max(1);
        for pos in 0..sentence.len() {
            let reduced = self.rng.gen_range(0..window);
            let span = window - reduced;
            let start = pos.saturating_sub(span);
            let end = (pos + span + 1).min(sentence.len());
            let context: Vec<usize> = (start..end).filter(|&c| c != pos).map(|c| sentence[c]).collect();
            if context.is_empty() {
                continue;
            }
            let target = sentence[pos];

            if self.params.skip_gram {
                for &c in &context {
                    let l1 = self.syn0[c * self.dims..(c + 1) * self.dims].to_vec();
                    let neu1e = self.train_pair(target, &l1, alpha);
                    self.apply(c, &neu1e);
                }
            } else {
                let mut l1 = vec![0.0; self.dims];
                for &c in &context {
                    for (h, x) in l1.iter_mut().zip(&self.syn0[c * self.dims..(c + 1) * self.dims]) {
                        *h += x;
                    }
                }
                let n = context.len() as f64;
                l1.iter_mut().for_each(|h| *h /= n);
                let neu1e = self.train_pair(target, &l1, alpha);
                for &c in &context {
                    self.apply(c, &neu1e);
                }
            }
        }
    }

    /// One positive and `negative` noise updates of the output layer.
    /// Returns the gradient for the input vector.
    fn train_pair(&mut self, target: usize, l1: &[f64], alpha: f64) -> Vec<f64> {
        let dims = self.dims;
        let mut neu1e = vec![0.0; dims];
        for d in 0..=self.params.negative {
            let (word, label) = if d == 0 {
                (target, 1.0)
            } else {
                match self.sample_negative() {
                    Some(w) if w != target => (w, 0.0),
                    _ => continue,
                }
            };
            let out = &mut self.syn1neg[word * dims..(word + 1) * dims];
            let f: f64 = l1.iter().zip(out.iter()).map(|(a, b)| a * b).sum();
            let g = (label - sigmoid(f)) * alpha;
            for ((e, o), x) in neu1e.iter_mut().zip(out.iter_mut()).zip(l1) {
                *e += g * *o;
                *o += g * x;
            }
        }
        neu1e
    }

    fn apply(&mut self, word: usize, neu1e: &[f64]) {
        let lock = self.lockf[word];
        if lock == 0.0 {
            return;
        }
        for (w, e) in self.syn0[word * self.dims..(word + 1) * self.dims].iter_mut().zip(neu1e) {
            *w += lock * e;
        }
    }

    fn sample_negative(&mut self) -> Option<usize> {
        let total = *self.cum_table.last()?;
        if total <= 0.0 {
            return None;
        }
        let r = self.rng.gen::<f64>() * total;
        let idx = self.cum_table.partition_point(|&c| c <= r);
        Some(idx.min(self.cum_table.len() - 1))
    }
}

fn sigmoid(x: f64) -> f64 {
    if x > 30.0 {
        1.0
    } else if x < -30.0 {
        0.0
    } else {
        1.0 / (1.0 + (-x).exp())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> Vec<Vec<String>> {
        let base = [
            "browser crash on startup",
            "browser hang on startup",
            "tab crash after update",
            "tab hang after update",
            "dark mode feature request",
            "theme color feature request",
        ];
        (0..20)
            .flat_map(|_| base.iter())
            .map(|s| s.split_whitespace().map(String::from).collect())
            .collect()
    }

    fn params() -> Word2VecParams {
        Word2VecParams {
            dims: 16,
            window: 2,
            min_count: 1,
            sample: 0.0,
            epochs: 20,
            ..Default::default()
        }
    }

    #[test]
    fn test_vocabulary_and_unit_vectors() {
        let model = Word2Vec::train(&corpus(), &params(), 42, None).unwrap();
        assert_eq!(model.len(), 14);
        assert_eq!(model.dims(), 16);
        for i in 0..model.len() {
            assert!((model.similarity(i, i) - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_deterministic_for_seed() {
        let a = Word2Vec::train(&corpus(), &params(), 7, None).unwrap();
        let b = Word2Vec::train(&corpus(), &params(), 7, None).unwrap();
        assert_eq!(a.vectors, b.vectors);
    }

    #[test]
    fn test_shared_contexts_are_closer() {
        let model = Word2Vec::train(&corpus(), &params(), 42, None).unwrap();
        let crash = model.index("crash").unwrap();
        let hang = model.index("hang").unwrap();
        let theme = model.index("theme").unwrap();
        assert!(model.similarity(crash, hang) > model.similarity(crash, theme));
    }

    #[test]
    fn test_min_count_filters_everything() {
        let p = Word2VecParams {
            min_count: 1000,
            ..params()
        };
        let err = Word2Vec::train(&corpus(), &p, 1, None).unwrap_err();
        assert!(matches!(err, SimilarityError::InsufficientVocabulary(_)));
    }

    #[test]
    fn test_distance_matrix_shape_and_diagonal() {
        let model = Word2Vec::train(&corpus(), &params(), 42, None).unwrap();
        let cols = [model.index("tab").unwrap(), model.index("mode").unwrap()];
        let m = model.distance_matrix(&cols);
        assert_eq!(m.dim(), (model.len(), 2));
        assert!(m[[cols[0], 0]].abs() < 1e-9);
        assert!(m.iter().all(|&d| d >= 0.0));
    }

    fn pretrained_text() -> String {
        let mut text = String::from("2 4\n");
        text.push_str("crash 1.0 0.0 0.0 0.0\n");
        text.push_str("segfault 0.0 3.0 4.0 0.0\n");
        text
    }

    #[test]
    fn test_pretrained_parse() {
        let p = PretrainedVectors::read(pretrained_text().as_bytes()).unwrap();
        assert_eq!(p.len(), 2);
        assert_eq!(p.dims(), 4);
    }

    #[test]
    fn test_pretrained_bad_line_reports_line_number() {
        let text = "1 2\nword 0.5 nope\n";
        match PretrainedVectors::read(text.as_bytes()) {
            Err(SimilarityError::Pretrained { line, .. }) => assert_eq!(line, 2),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_pretrained_count_mismatch() {
        let text = "3 2\nword 0.5 0.5\n";
        assert!(PretrainedVectors::read(text.as_bytes()).is_err());
    }

    #[test]
    fn test_pretrained_union_and_locking() {
        let pretrained = PretrainedVectors::read(pretrained_text().as_bytes()).unwrap();
        let p = Word2VecParams { dims: 4, ..params() };
        let model = Word2Vec::train(&corpus(), &p, 42, Some(&pretrained)).unwrap();

        // union: corpus words plus the pretrained-only word
        assert_eq!(model.len(), 15);
        let seg = model.index("segfault").unwrap();
        let v = model.vector(seg);
        assert!((v[1] - 0.6).abs() < 1e-12);
        assert!((v[2] - 0.8).abs() < 1e-12);

        // locked rows keep their pretrained direction even when trained on
        let crash = model.index("crash").unwrap();
        assert!((model.vector(crash)[0] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_pretrained_dims_mismatch() {
        let pretrained = PretrainedVectors::read(pretrained_text().as_bytes()).unwrap();
        assert!(Word2Vec::train(&corpus(), &params(), 42, Some(&pretrained)).is_err());
    }
}
