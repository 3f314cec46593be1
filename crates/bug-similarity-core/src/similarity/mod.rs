//! The similarity strategy contract and its registry.
//!
//! Every strategy ingests a corpus snapshot once, builds an immutable
//! index or model, and then answers two questions about live bug records:
//! which corpus bugs are most similar to this one, and how far apart are
//! two given bugs.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Strategy (enum)                        │
//! │  ┌──────────────────────────┐ ┌──────────────────────────┐  │
//! │  │ Vector space             │ │ Embedding distance       │  │
//! │  │ LSI / Neighbors / BM25   │ │ WMD / relaxed WMD        │  │
//! │  │ LDA                      │ │ soft cosine              │  │
//! │  └──────────────────────────┘ └──────────────────────────┘  │
//! └──────────────┬──────────────────────────────────────────────┘
//!                ▼
//!     SimilarityStrategy: get_similar_bugs / get_distance / evaluate
//! ```
//!
//! Strategies are selected by [`StrategyKind`], parsed from short keys:
//!
//! | Key | Type | Distance |
//! |-----|------|----------|
//! | `lsi` | [`LsiSimilarity`] | no |
//! | `neighbors_tfidf` | [`NeighborsSimilarity`] (unigrams) | no |
//! | `neighbors_tfidf_bigrams` | [`NeighborsSimilarity`] (uni+bigrams) | no |
//! | `word2vec_wmdrelax` | [`WmdRelaxSimilarity`] | yes |
//! | `word2vec_wmd` | [`WmdSimilarity`] | yes |
//! | `word2vec_softcos` | [`SoftCosSimilarity`] | no |
//! | `bm25` | [`Bm25Similarity`] | no |
//! | `lda` | [`LdaSimilarity`] | yes (Hellinger) |
//!
//! # Usage
//!
//! ```rust,no_run
//! use bug_similarity_core::similarity::{SimilarityStrategy, Strategy, StrategyConfig, StrategyKind};
//! # fn bugs() -> Vec<bug_similarity_core::BugRecord> { Vec::new() }
//!
//! let bugs = bugs();
//! let kind: StrategyKind = "bm25".parse()?;
//! let strategy = Strategy::build(kind, &bugs, &StrategyConfig::default())?;
//! let similar = strategy.get_similar_bugs(&bugs[0], 10)?;
//! # Ok::<(), bug_similarity_core::SimilarityError>(())
//! ```

pub mod bm25;
pub mod embedding;
pub mod lda;
pub mod lsi;
pub mod neighbors;
pub mod softcos;
pub mod wmd;
pub mod wmdrelax;

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::artifact;
use crate::corpus::Corpus;
use crate::error::{Result, SimilarityError};
use crate::evaluation::{self, EvaluationOptions, EvaluationReport, NoopObserver};
use crate::lda::LdaParams;
use crate::models::{BugId, BugRecord};
use crate::preprocess::{PreprocessOptions, Preprocessor};
use crate::word2vec::Word2VecParams;

pub use self::bm25::{Bm25Params, Bm25Similarity};
pub use self::embedding::EmbeddingCorpus;
pub use self::lda::LdaSimilarity;
pub use self::lsi::{LsiParams, LsiSimilarity};
pub use self::neighbors::NeighborsSimilarity;
pub use self::softcos::{SoftCosParams, SoftCosSimilarity};
pub use self::wmd::{bounded_scan, WmdParams, WmdSimilarity};
pub use self::wmdrelax::WmdRelaxSimilarity;

// ═══════════════════════════════════════════════════════════════════════
// Strategy Trait
// ═══════════════════════════════════════════════════════════════════════

/// Capability shared by every similarity strategy.
///
/// Implementations must never return the query's own id from
/// [`get_similar_bugs`](SimilarityStrategy::get_similar_bugs), must return
/// at most `k` distinct ids, and must treat a query with no known tokens
/// as having no similar bugs rather than failing.
pub trait SimilarityStrategy {
    fn kind(&self) -> StrategyKind;

    /// Corpus bug ids ordered nearest-first.
    fn get_similar_bugs(&self, query: &BugRecord, k: usize) -> Result<Vec<BugId>>;

    /// Pairwise distance; `f64::INFINITY` when either side has no known tokens.
    ///
    /// Ranking-only strategies return [`SimilarityError::NotSupported`].
    fn get_distance(&self, _a: &BugRecord, _b: &BugRecord) -> Result<f64> {
        Err(SimilarityError::NotSupported {
            strategy: self.kind().key(),
        })
    }

    /// Evaluate duplicate retrieval over `bugs` with the default options.
    fn evaluate(&self, bugs: &[BugRecord]) -> Result<EvaluationReport> {
        evaluation::evaluate(self, bugs, &EvaluationOptions::default(), &mut NoopObserver)
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Registry
// ═══════════════════════════════════════════════════════════════════════

/// Registry key of a strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StrategyKind {
    #[serde(rename = "lsi")]
    Lsi,
    #[serde(rename = "neighbors_tfidf")]
    NeighborsTfidf,
    #[serde(rename = "neighbors_tfidf_bigrams")]
    NeighborsTfidfBigrams,
    #[serde(rename = "word2vec_wmdrelax")]
    Word2VecWmdRelax,
    #[serde(rename = "word2vec_wmd")]
    Word2VecWmd,
    #[serde(rename = "word2vec_softcos")]
    Word2VecSoftCos,
    #[serde(rename = "bm25")]
    Bm25,
    #[serde(rename = "lda")]
    Lda,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 8] = [
        StrategyKind::Lsi,
        StrategyKind::NeighborsTfidf,
        StrategyKind::NeighborsTfidfBigrams,
        StrategyKind::Word2VecWmdRelax,
        StrategyKind::Word2VecWmd,
        StrategyKind::Word2VecSoftCos,
        StrategyKind::Bm25,
        StrategyKind::Lda,
    ];

    pub fn key(self) -> &'static str {
        match self {
            StrategyKind::Lsi => "lsi",
            StrategyKind::NeighborsTfidf => "neighbors_tfidf",
            StrategyKind::NeighborsTfidfBigrams => "neighbors_tfidf_bigrams",
            StrategyKind::Word2VecWmdRelax => "word2vec_wmdrelax",
            StrategyKind::Word2VecWmd => "word2vec_wmd",
            StrategyKind::Word2VecSoftCos => "word2vec_softcos",
            StrategyKind::Bm25 => "bm25",
            StrategyKind::Lda => "lda",
        }
    }

    /// Type name used for the artifact file.
    pub fn type_name(self) -> &'static str {
        match self {
            StrategyKind::Lsi => "LSISimilarity",
            StrategyKind::NeighborsTfidf => "NeighborsSimilarity",
            StrategyKind::NeighborsTfidfBigrams => "NeighborsBigramsSimilarity",
            StrategyKind::Word2VecWmdRelax => "Word2VecWmdRelaxSimilarity",
            StrategyKind::Word2VecWmd => "Word2VecWmdSimilarity",
            StrategyKind::Word2VecSoftCos => "Word2VecSoftCosSimilarity",
            StrategyKind::Bm25 => "BM25Similarity",
            StrategyKind::Lda => "LDASimilarity",
        }
    }

    /// `<type-name-lowercase>.similaritymodel`
    pub fn artifact_file_name(self) -> String {
        format!("{}.{}", self.type_name().to_lowercase(), artifact::EXTENSION)
    }

    pub fn supports_distance(self) -> bool {
        matches!(
            self,
            StrategyKind::Word2VecWmd | StrategyKind::Word2VecWmdRelax | StrategyKind::Lda
        )
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for StrategyKind {
    type Err = SimilarityError;

    fn from_str(s: &str) -> Result<Self> {
        StrategyKind::ALL
            .into_iter()
            .find(|k| k.key() == s)
            .ok_or_else(|| SimilarityError::UnknownStrategy(s.to_string()))
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Configuration
// ═══════════════════════════════════════════════════════════════════════

/// Parameters for building any strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    /// Seed for corpus shuffling and model initialization.
    pub seed: u64,
    pub preprocess: PreprocessOptions,
    pub lsi: LsiParams,
    pub bm25: Bm25Params,
    pub lda: LdaParams,
    pub word2vec: Word2VecParams,
    pub wmd: WmdParams,
    pub softcos: SoftCosParams,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            preprocess: PreprocessOptions::default(),
            lsi: LsiParams::default(),
            bm25: Bm25Params::default(),
            lda: LdaParams::default(),
            word2vec: Word2VecParams::default(),
            wmd: WmdParams::default(),
            softcos: SoftCosParams::default(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Strategy
// ═══════════════════════════════════════════════════════════════════════

/// Closed set of strategies behind [`SimilarityStrategy`].
#[derive(Debug)]
pub enum Strategy {
    Lsi(LsiSimilarity),
    Neighbors(NeighborsSimilarity),
    Bm25(Bm25Similarity),
    Lda(LdaSimilarity),
    Wmd(WmdSimilarity),
    WmdRelax(WmdRelaxSimilarity),
    SoftCos(SoftCosSimilarity),
}

impl Strategy {
    /// Preprocess `bugs`, shuffle them with the configured seed, and build
    /// the index for `kind`.
    pub fn build(kind: StrategyKind, bugs: &[BugRecord], config: &StrategyConfig) -> Result<Strategy> {
        let preprocessor = Preprocessor::new(config.preprocess);
        let corpus = Corpus::build(bugs, &preprocessor, config.seed)?;
        tracing::info!(strategy = kind.key(), bugs = corpus.len(), "building strategy");

        let strategy = match kind {
            StrategyKind::Lsi => Strategy::Lsi(LsiSimilarity::build(&corpus, preprocessor, &config.lsi, config.seed)?),
            StrategyKind::NeighborsTfidf => {
                Strategy::Neighbors(NeighborsSimilarity::build(&corpus, preprocessor, false))
            }
            StrategyKind::NeighborsTfidfBigrams => {
                Strategy::Neighbors(NeighborsSimilarity::build(&corpus, preprocessor, true))
            }
            StrategyKind::Bm25 => Strategy::Bm25(Bm25Similarity::build(&corpus, preprocessor, &config.bm25)),
            StrategyKind::Lda => Strategy::Lda(LdaSimilarity::build(&corpus, preprocessor, &config.lda, config.seed)?),
            StrategyKind::Word2VecWmd => {
                let base = EmbeddingCorpus::build(corpus, preprocessor, &config.word2vec, config.wmd.cut_off, config.seed)?;
                Strategy::Wmd(WmdSimilarity::new(base))
            }
            StrategyKind::Word2VecWmdRelax => {
                let base = EmbeddingCorpus::build(corpus, preprocessor, &config.word2vec, config.wmd.cut_off, config.seed)?;
                Strategy::WmdRelax(WmdRelaxSimilarity::new(base))
            }
            StrategyKind::Word2VecSoftCos => {
                let base = EmbeddingCorpus::build(corpus, preprocessor, &config.word2vec, config.wmd.cut_off, config.seed)?;
                Strategy::SoftCos(SoftCosSimilarity::new(base, &config.softcos))
            }
        };
        Ok(strategy)
    }

    fn inner(&self) -> &dyn SimilarityStrategy {
        match self {
            Strategy::Lsi(s) => s,
            Strategy::Neighbors(s) => s,
            Strategy::Bm25(s) => s,
            Strategy::Lda(s) => s,
            Strategy::Wmd(s) => s,
            Strategy::WmdRelax(s) => s,
            Strategy::SoftCos(s) => s,
        }
    }

    /// Write `<dir>/<type-name-lowercase>.similaritymodel` and return its path.
    pub fn save(&self, dir: &Path) -> Result<PathBuf> {
        let payload = match self {
            Strategy::Lsi(s) => serde_json::to_vec(s)?,
            Strategy::Neighbors(s) => serde_json::to_vec(s)?,
            Strategy::Bm25(s) => serde_json::to_vec(s)?,
            Strategy::Lda(s) => serde_json::to_vec(s)?,
            Strategy::Wmd(s) => serde_json::to_vec(s)?,
            Strategy::WmdRelax(s) => serde_json::to_vec(s)?,
            Strategy::SoftCos(s) => serde_json::to_vec(s)?,
        };
        let kind = self.kind();
        let path = dir.join(kind.artifact_file_name());
        artifact::write(&path, kind, &payload)?;
        tracing::info!(path = %path.display(), bytes = payload.len(), "saved strategy");
        Ok(path)
    }

    /// Restore a strategy written by [`Strategy::save`].
    pub fn load(path: &Path) -> Result<Strategy> {
        let (kind, payload) = artifact::read(path)?;
        let strategy = match kind {
            StrategyKind::Lsi => Strategy::Lsi(decode(&payload)?),
            StrategyKind::NeighborsTfidf | StrategyKind::NeighborsTfidfBigrams => {
                let s: NeighborsSimilarity = decode(&payload)?;
                if s.kind() != kind {
                    return Err(SimilarityError::Artifact(format!(
                        "header says {} but payload is {}",
                        kind,
                        s.kind()
                    )));
                }
                Strategy::Neighbors(s)
            }
            StrategyKind::Bm25 => Strategy::Bm25(decode(&payload)?),
            StrategyKind::Lda => Strategy::Lda(decode(&payload)?),
            StrategyKind::Word2VecWmd => Strategy::Wmd(decode(&payload)?),
            StrategyKind::Word2VecWmdRelax => Strategy::WmdRelax(decode(&payload)?),
            StrategyKind::Word2VecSoftCos => Strategy::SoftCos(decode(&payload)?),
        };
        tracing::info!(path = %path.display(), strategy = kind.key(), "loaded strategy");
        Ok(strategy)
    }
}

fn decode<T: serde::de::DeserializeOwned>(payload: &[u8]) -> Result<T> {
    serde_json::from_slice(payload).map_err(|e| SimilarityError::Artifact(format!("corrupt payload: {}", e)))
}

impl SimilarityStrategy for Strategy {
    fn kind(&self) -> StrategyKind {
        self.inner().kind()
    }

    fn get_similar_bugs(&self, query: &BugRecord, k: usize) -> Result<Vec<BugId>> {
        self.inner().get_similar_bugs(query, k)
    }

    fn get_distance(&self, a: &BugRecord, b: &BugRecord) -> Result<f64> {
        self.inner().get_distance(a, b)
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Ranking
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Order {
    /// Similarity scores: larger is nearer.
    Descending,
    /// Distances: smaller is nearer.
    Ascending,
}

/// Turn per-document scores into at most `k` distinct ids.
///
/// Non-finite scores are dropped, ties keep corpus order, and `exclude`
/// (the query's own id) is removed before truncation.
pub(crate) fn rank(ids: &[BugId], scores: &[f64], order: Order, exclude: BugId, k: usize) -> Vec<BugId> {
    let mut idx: Vec<usize> = (0..scores.len().min(ids.len()))
        .filter(|&i| scores[i].is_finite())
        .collect();
    match order {
        Order::Descending => idx.sort_by(|&a, &b| scores[b].total_cmp(&scores[a])),
        Order::Ascending => idx.sort_by(|&a, &b| scores[a].total_cmp(&scores[b])),
    }

    let mut seen = HashSet::new();
    idx.into_iter()
        .map(|i| ids[i])
        .filter(|&id| id != exclude && seen.insert(id))
        .take(k)
        .collect()
}
