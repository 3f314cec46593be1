//! # Bug Similarity Core
//!
//! Pure algorithms for duplicate-bug detection: the bug data model, text
//! preprocessing, the family of similarity strategies, the evaluation
//! harness, and the release-tracking classifier.
//!
//! This crate contains no configuration-file parsing, CLI, or logging
//! setup. Those live in the `bug-similarity` app crate, which constructs
//! the resources defined here and passes them in.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`models`] | `BugRecord` and its nested history/comment types |
//! | [`preprocess`] | Cleanup chain, stemming/lemmatization, tokenization |
//! | [`corpus`] | Shuffled corpus, term dictionary, bag-of-words |
//! | [`vector`] | Sparse/dense vector helpers, cosine and Hellinger |
//! | [`tfidf`] | Corpus TF-IDF model and n-gram TF-IDF vectorizer |
//! | [`linalg`] | Randomized truncated SVD for latent semantic indexing |
//! | [`word2vec`] | CBOW/skip-gram word embeddings with negative sampling |
//! | [`lda`] | Latent Dirichlet allocation via variational Bayes |
//! | [`transport`] | Exact optimal transport (earth mover's distance) |
//! | [`similarity`] | The `SimilarityStrategy` contract and every strategy |
//! | [`evaluation`] | Duplicate ground truth and recall/precision/MAP |
//! | [`artifact`] | Checksummed save/load of built strategies |
//! | [`tracking`] | Tracking labels, rollback, features, classifier |
//! | [`error`] | `SimilarityError` and the crate `Result` alias |

pub mod artifact;
pub mod corpus;
pub mod error;
pub mod evaluation;
pub mod lda;
pub mod linalg;
pub mod models;
pub mod preprocess;
pub mod similarity;
pub mod tfidf;
pub mod tracking;
pub mod transport;
pub mod vector;
pub mod word2vec;

pub use error::{Result, SimilarityError};
pub use models::{BugId, BugRecord};
pub use similarity::{SimilarityStrategy, Strategy, StrategyConfig, StrategyKind};
