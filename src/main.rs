//! # Bug Similarity CLI (`bugsim`)
//!
//! ## Usage
//!
//! ```bash
//! bugsim --config ./config/bugsim.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `bugsim strategies` | List registered strategies |
//! | `bugsim build <strategy>` | Build a strategy and save its artifact |
//! | `bugsim similar <strategy> <bug-id>` | Print the most similar corpus bugs |
//! | `bugsim distance <strategy> <a> <b>` | Print the distance between two bugs |
//! | `bugsim evaluate <strategy>` | Recall, precision, and MAP over known duplicates |
//! | `bugsim tracking labels` | Count tracking labels in the corpus |
//! | `bugsim tracking train` | Train the release-tracking classifier |
//! | `bugsim tracking classify <bug-id>` | Classify one bug |
//! | `bugsim completions <shell>` | Print a shell completion script |
//!
//! ## Examples
//!
//! ```bash
//! # Train and save an LSI index
//! bugsim build lsi --config ./config/bugsim.toml
//!
//! # Ten nearest bugs, reusing the saved artifact
//! bugsim similar lsi 1234567
//!
//! # Word mover's distance between two bugs
//! bugsim distance word2vec_wmd 1234567 1234568
//!
//! # Machine-readable evaluation with JSON progress
//! bugsim evaluate bm25 --progress json --json
//! ```

use anyhow::Result;
use bug_similarity::config::{self, Config};
use bug_similarity::progress::ProgressMode;
use bug_similarity::source::{BugSource, JsonlBugSource};
use bug_similarity::{
    build_cmd, distance, evaluate, logging, similar, strategies, tracking_cmd,
};
use bug_similarity_core::{BugId, BugRecord, StrategyKind};
use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;

/// Bug Similarity CLI: find duplicate bug reports with interchangeable
/// text-similarity strategies.
///
/// All commands except `strategies` and `completions` read a TOML
/// configuration. See `config/bugsim.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "bugsim",
    about = "Find duplicate bug reports with interchangeable text-similarity strategies",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/bugsim.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// List registered strategies, their artifact type, and distance support.
    Strategies,

    /// Build a strategy over the corpus and save its artifact.
    ///
    /// Writes `<artifacts_dir>/<type-name-lowercase>.similaritymodel`.
    Build {
        /// Strategy key, e.g. `lsi`, `bm25`, `word2vec_wmd`.
        strategy: StrategyKind,
    },

    /// Print the corpus bugs most similar to a bug, nearest first.
    Similar {
        strategy: StrategyKind,
        bug_id: BugId,

        /// Maximum number of results. Defaults to `[similarity].top_k`.
        #[arg(long)]
        limit: Option<usize>,

        /// Saved artifact to query instead of the default one.
        #[arg(long)]
        model: Option<PathBuf>,
    },

    /// Print the distance between two bugs.
    ///
    /// Only `word2vec_wmd`, `word2vec_wmdrelax`, and `lda` define a distance.
    Distance {
        strategy: StrategyKind,
        a: BugId,
        b: BugId,

        #[arg(long)]
        model: Option<PathBuf>,
    },

    /// Evaluate duplicate retrieval over the corpus.
    Evaluate {
        strategy: StrategyKind,

        #[arg(long)]
        model: Option<PathBuf>,

        /// Progress on stderr. Defaults to `human` on a terminal, `off` otherwise.
        #[arg(long, value_enum)]
        progress: Option<ProgressMode>,

        /// Print the report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Release-tracking classifier.
    Tracking {
        #[command(subcommand)]
        action: TrackingAction,
    },

    /// Print a shell completion script to stdout.
    Completions {
        shell: clap_complete::Shell,
    },
}

/// Tracking subcommands.
#[derive(Subcommand)]
enum TrackingAction {
    /// Count tracked and untracked bugs derived from history.
    Labels,

    /// Train the classifier on labelled bugs.
    Train {
        /// Output path. Defaults to `[tracking].model_path`.
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Classify one bug with a trained model.
    Classify {
        bug_id: BugId,

        #[arg(long)]
        model: PathBuf,
    },
}

fn load_bugs(cfg: &Config) -> Result<Vec<BugRecord>> {
    JsonlBugSource::new(&cfg.corpus.path).bugs()
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Commands that don't require config
    match &cli.command {
        Commands::Strategies => return strategies::list_strategies(),
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(*shell, &mut command, "bugsim", &mut std::io::stdout());
            return Ok(());
        }
        _ => {}
    }

    let cfg = config::load_config(&cli.config)?;
    logging::init(&cfg.logging)?;
    let bugs = load_bugs(&cfg)?;

    match cli.command {
        Commands::Build { strategy } => {
            build_cmd::run_build(&cfg, &bugs, strategy)?;
        }
        Commands::Similar {
            strategy,
            bug_id,
            limit,
            model,
        } => {
            let strategy = build_cmd::load_or_build(&cfg, &bugs, strategy, model.as_deref())?;
            let limit = limit.unwrap_or(cfg.similarity.top_k);
            similar::run_similar(&strategy, &bugs, bug_id, limit)?;
        }
        Commands::Distance {
            strategy,
            a,
            b,
            model,
        } => {
            let strategy = build_cmd::load_or_build(&cfg, &bugs, strategy, model.as_deref())?;
            distance::run_distance(&strategy, &bugs, a, b)?;
        }
        Commands::Evaluate {
            strategy,
            model,
            progress,
            json,
        } => {
            let strategy = build_cmd::load_or_build(&cfg, &bugs, strategy, model.as_deref())?;
            let progress = progress.unwrap_or_else(ProgressMode::default_for_tty);
            evaluate::run_evaluate(&cfg, &strategy, &bugs, progress, json)?;
        }
        Commands::Tracking { action } => match action {
            TrackingAction::Labels => tracking_cmd::run_labels(&bugs)?,
            TrackingAction::Train { output } => {
                let output = output.unwrap_or_else(|| cfg.tracking.model_path.clone());
                tracking_cmd::run_train(&cfg, &bugs, &output)?;
            }
            TrackingAction::Classify { bug_id, model } => {
                tracking_cmd::run_classify(&bugs, bug_id, &model)?;
            }
        },
        Commands::Strategies | Commands::Completions { .. } => {
            // Handled above (before config loading)
            unreachable!()
        }
    }

    Ok(())
}
