//! Strategy construction and artifact persistence.
//!
//! `bugsim build` trains a strategy over the configured corpus and writes
//! `<artifacts_dir>/<type-name-lowercase>.similaritymodel`. Query commands
//! reuse that artifact when present and rebuild in memory otherwise.

use anyhow::{bail, Context, Result};
use bug_similarity_core::{BugRecord, SimilarityStrategy, Strategy, StrategyKind};
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::config::Config;

/// Build `kind` over `bugs` and save it; returns the artifact path.
pub fn run_build(config: &Config, bugs: &[BugRecord], kind: StrategyKind) -> Result<PathBuf> {
    let start = Instant::now();
    let strategy = Strategy::build(kind, bugs, &config.strategy_config())
        .with_context(|| format!("Failed to build {}", kind))?;
    let path = strategy
        .save(&config.similarity.artifacts_dir)
        .with_context(|| format!("Failed to save {}", kind))?;

    println!("Built {} over {} bugs", kind, bugs.len());
    println!("  artifact: {}", path.display());
    println!("  elapsed:  {:.1}s", start.elapsed().as_secs_f64());
    Ok(path)
}

/// Resolve the strategy a query command runs against.
///
/// An explicit `model` path must hold an artifact of `kind`. Without one,
/// the default artifact in `artifacts_dir` is used when it exists, and the
/// strategy is built in memory otherwise.
pub fn load_or_build(
    config: &Config,
    bugs: &[BugRecord],
    kind: StrategyKind,
    model: Option<&Path>,
) -> Result<Strategy> {
    let default_path = config.similarity.artifacts_dir.join(kind.artifact_file_name());
    let path = match model {
        Some(path) => Some(path.to_path_buf()),
        None if default_path.exists() => Some(default_path),
        None => None,
    };

    let Some(path) = path else {
        tracing::info!(strategy = kind.key(), "no saved artifact, building in memory");
        return Strategy::build(kind, bugs, &config.strategy_config())
            .with_context(|| format!("Failed to build {}", kind));
    };

    let strategy = Strategy::load(&path)
        .with_context(|| format!("Failed to load model: {}", path.display()))?;
    if strategy.kind() != kind {
        bail!(
            "{} holds a {} model, not {}",
            path.display(),
            strategy.kind(),
            kind
        );
    }
    tracing::info!(strategy = kind.key(), path = %path.display(), "loaded artifact");
    Ok(strategy)
}
