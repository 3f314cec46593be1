//! Error types for the similarity core.

use thiserror::Error;

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, SimilarityError>;

/// Errors raised while building, querying, or persisting strategies.
///
/// Missing vocabulary and degenerate ground-cost matrices are not errors:
/// they surface as an infinite distance so ranking loops stay simple.
#[derive(Error, Debug)]
pub enum SimilarityError {
    /// The strategy ranks documents but has no pairwise metric.
    #[error("{strategy} does not support pairwise distance")]
    NotSupported { strategy: &'static str },

    /// A strategy was asked to build an index from zero bugs.
    #[error("cannot build an index from an empty corpus")]
    EmptyCorpus,

    /// Too few tokens survived frequency filtering to train a model.
    #[error("insufficient vocabulary: {0}")]
    InsufficientVocabulary(String),

    /// No strategy is registered under the given key.
    #[error("unknown similarity strategy: '{0}'")]
    UnknownStrategy(String),

    /// The artifact is missing, truncated, tampered with, or of the wrong kind.
    #[error("invalid artifact: {0}")]
    Artifact(String),

    /// The pretrained embedding file could not be parsed.
    #[error("invalid pretrained embeddings at line {line}: {reason}")]
    Pretrained { line: usize, reason: String },

    /// The tracking model was used before training.
    #[error("model error: {0}")]
    Model(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
