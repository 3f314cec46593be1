//! TOML configuration for the `bugsim` binary.
//!
//! Only `[corpus].path` is required; every other section falls back to the
//! defaults of the corresponding core parameter type.
//!
//! ```toml
//! [corpus]
//! path = "data/bugs.json"
//!
//! [similarity]
//! artifacts_dir = "models"
//! top_k = 10
//!
//! [similarity.wmd]
//! cut_off = 0.2
//! ```

use anyhow::{Context, Result};
use bug_similarity_core::evaluation::EvaluationOptions;
use bug_similarity_core::lda::LdaParams;
use bug_similarity_core::preprocess::PreprocessOptions;
use bug_similarity_core::similarity::{Bm25Params, LsiParams, SoftCosParams, WmdParams};
use bug_similarity_core::tracking::LogisticRegression;
use bug_similarity_core::word2vec::Word2VecParams;
use bug_similarity_core::StrategyConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub corpus: CorpusConfig,
    #[serde(default)]
    pub preprocess: PreprocessOptions,
    #[serde(default)]
    pub similarity: SimilarityConfig,
    #[serde(default)]
    pub evaluation: EvaluationOptions,
    #[serde(default)]
    pub tracking: TrackingConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CorpusConfig {
    /// Newline-delimited JSON dump of bug records.
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SimilarityConfig {
    #[serde(default = "default_artifacts_dir")]
    pub artifacts_dir: PathBuf,
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default)]
    pub lsi: LsiParams,
    #[serde(default)]
    pub bm25: Bm25Params,
    #[serde(default)]
    pub lda: LdaParams,
    #[serde(default)]
    pub word2vec: Word2VecParams,
    #[serde(default)]
    pub wmd: WmdParams,
    #[serde(default)]
    pub softcos: SoftCosParams,
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self {
            artifacts_dir: default_artifacts_dir(),
            seed: default_seed(),
            top_k: default_top_k(),
            lsi: LsiParams::default(),
            bm25: Bm25Params::default(),
            lda: LdaParams::default(),
            word2vec: Word2VecParams::default(),
            wmd: WmdParams::default(),
            softcos: SoftCosParams::default(),
        }
    }
}

fn default_artifacts_dir() -> PathBuf {
    PathBuf::from("models")
}
fn default_seed() -> u64 {
    42
}
fn default_top_k() -> usize {
    10
}

#[derive(Debug, Deserialize, Clone)]
pub struct TrackingConfig {
    #[serde(default = "default_model_path")]
    pub model_path: PathBuf,
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,
    #[serde(default = "default_l2")]
    pub l2: f64,
    #[serde(default = "default_epochs")]
    pub epochs: usize,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            model_path: default_model_path(),
            learning_rate: default_learning_rate(),
            l2: default_l2(),
            epochs: default_epochs(),
        }
    }
}

fn default_model_path() -> PathBuf {
    PathBuf::from("models/tracking.json")
}
fn default_learning_rate() -> f64 {
    0.5
}
fn default_l2() -> f64 {
    1e-4
}
fn default_epochs() -> usize {
    300
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// `EnvFilter` directives; `BUGSIM_LOG` takes precedence.
    #[serde(default = "default_filter")]
    pub filter: String,
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
            json: false,
        }
    }
}

fn default_filter() -> String {
    "info".to_string()
}

impl Config {
    /// Parameters handed to `Strategy::build`.
    pub fn strategy_config(&self) -> StrategyConfig {
        let s = &self.similarity;
        StrategyConfig {
            seed: s.seed,
            preprocess: self.preprocess,
            lsi: s.lsi.clone(),
            bm25: s.bm25.clone(),
            lda: s.lda.clone(),
            word2vec: s.word2vec.clone(),
            wmd: s.wmd.clone(),
            softcos: s.softcos.clone(),
        }
    }

    pub fn classifier(&self) -> LogisticRegression {
        LogisticRegression::new(self.tracking.learning_rate, self.tracking.l2, self.tracking.epochs)
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    let s = &config.similarity;

    if s.top_k < 1 {
        anyhow::bail!("similarity.top_k must be >= 1");
    }
    if s.lsi.num_topics < 1 {
        anyhow::bail!("similarity.lsi.num_topics must be >= 1");
    }
    if s.lda.num_topics < 1 {
        anyhow::bail!("similarity.lda.num_topics must be >= 1");
    }
    if s.word2vec.dims < 1 {
        anyhow::bail!("similarity.word2vec.dims must be >= 1");
    }
    if s.word2vec.window < 1 {
        anyhow::bail!("similarity.word2vec.window must be >= 1");
    }
    if !(s.wmd.cut_off > 0.0) {
        anyhow::bail!("similarity.wmd.cut_off must be > 0");
    }
    if !(0.0..=1.0).contains(&s.bm25.b) {
        anyhow::bail!("similarity.bm25.b must be in [0.0, 1.0]");
    }
    if !(s.softcos.exponent > 0.0) {
        anyhow::bail!("similarity.softcos.exponent must be > 0");
    }
    if config.tracking.epochs < 1 {
        anyhow::bail!("tracking.epochs must be >= 1");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml: &str) -> Result<Config> {
        let config: Config = toml::from_str(toml)?;
        validate(&config)?;
        Ok(config)
    }

    #[test]
    fn minimal_config_uses_defaults() {
        let config = parse("[corpus]\npath = \"bugs.json\"\n").unwrap();
        assert_eq!(config.similarity.top_k, 10);
        assert_eq!(config.similarity.seed, 42);
        assert_eq!(config.similarity.artifacts_dir, PathBuf::from("models"));
        assert_eq!(config.evaluation.review_keyword, "dupeme");
        assert!(config.preprocess.cleanup_urls);
        assert_eq!(config.logging.filter, "info");
        assert_eq!(config.strategy_config(), StrategyConfig::default());
    }

    #[test]
    fn nested_sections_override() {
        let config = parse(
            r#"
[corpus]
path = "bugs.json"

[similarity]
seed = 7

[similarity.wmd]
cut_off = 0.5

[similarity.word2vec]
dims = 50
min_count = 1
"#,
        )
        .unwrap();
        let sc = config.strategy_config();
        assert_eq!(sc.seed, 7);
        assert_eq!(sc.wmd.cut_off, 0.5);
        assert_eq!(sc.word2vec.dims, 50);
        assert_eq!(sc.word2vec.window, 5);
    }

    #[test]
    fn rejects_out_of_range_values() {
        let cases = [
            ("[similarity]\ntop_k = 0", "top_k"),
            ("[similarity.lsi]\nnum_topics = 0", "lsi.num_topics"),
            ("[similarity.lda]\nnum_topics = 0", "lda.num_topics"),
            ("[similarity.word2vec]\ndims = 0", "word2vec.dims"),
            ("[similarity.word2vec]\nwindow = 0", "word2vec.window"),
            ("[similarity.wmd]\ncut_off = 0.0", "cut_off"),
            ("[similarity.bm25]\nb = 1.5", "bm25.b"),
            ("[similarity.softcos]\nexponent = -1.0", "exponent"),
        ];
        for (section, needle) in cases {
            let toml = format!("[corpus]\npath = \"bugs.json\"\n{}\n", section);
            let err = parse(&toml).unwrap_err().to_string();
            assert!(err.contains(needle), "{}: {}", needle, err);
        }
    }

    #[test]
    fn example_config_matches_defaults() {
        let config = parse(include_str!("../config/bugsim.example.toml")).unwrap();
        assert_eq!(config.strategy_config(), StrategyConfig::default());
        assert_eq!(config.tracking.model_path, PathBuf::from("models/tracking.json"));
        assert_eq!(config.tracking.epochs, 300);
    }

    #[test]
    fn missing_corpus_is_an_error() {
        assert!(parse("[similarity]\ntop_k = 3\n").is_err());
    }
}
