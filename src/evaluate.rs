//! `bugsim evaluate`: duplicate-retrieval metrics for one strategy.

use anyhow::{Context, Result};
use bug_similarity_core::evaluation::{self, EvaluationReport};
use bug_similarity_core::{BugRecord, SimilarityStrategy};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::Config;
use crate::progress::ProgressMode;

/// Report envelope written by `--json`.
#[derive(Debug, Serialize)]
pub struct EvaluationOutput {
    pub strategy: &'static str,
    pub generated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub report: EvaluationReport,
}

pub fn run_evaluate(
    config: &Config,
    strategy: &dyn SimilarityStrategy,
    bugs: &[BugRecord],
    progress: ProgressMode,
    json: bool,
) -> Result<EvaluationReport> {
    let kind = strategy.kind();
    let mut observer = progress.observer(kind);
    let report = evaluation::evaluate(strategy, bugs, &config.evaluation, observer.as_mut())
        .with_context(|| format!("Evaluation of {} failed", kind))?;

    if json {
        let output = EvaluationOutput {
            strategy: kind.key(),
            generated_at: Utc::now(),
            report: report.clone(),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_report(kind.key(), &report);
    }
    Ok(report)
}

fn print_report(strategy: &str, report: &EvaluationReport) {
    println!("Evaluation of {} ({} queries)", strategy, report.queries);
    println!();
    println!("  Recall@1:     {:>6.2}%", report.recall_at_1);
    println!("  Recall@5:     {:>6.2}%", report.recall_at_5);
    println!("  Recall@10:    {:>6.2}%", report.recall_at_10);
    println!("  Precision@1:  {:>6.2}%", report.precision_at_1);
    println!("  Precision@5:  {:>6.2}%", report.precision_at_5);
    println!("  Precision@10: {:>6.2}%", report.precision_at_10);
    println!("  Recall:       {:>6.2}%", report.recall);
    println!("  Precision:    {:>6.2}%", report.precision);
    println!("  MAP@10:       {:>6.2}%", report.map_at_10);
}
