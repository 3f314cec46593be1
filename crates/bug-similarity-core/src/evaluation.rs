//! Duplicate-detection evaluation.
//!
//! Builds symmetric duplicate ground truth from the corpus, asks a
//! strategy for the top-10 similar bugs of every bug that has at least one
//! known duplicate, and aggregates ranking metrics over all such queries.
//!
//! # Metrics
//!
//! All values are percentages. For a query with duplicate set `D` and
//! ranked result `R` (at most 10 ids):
//!
//! | Metric | Numerator | Denominator |
//! |--------|-----------|-------------|
//! | recall@k | duplicates found in `R[..k]` | total duplicates over all queries |
//! | precision@1 | queries whose first result is a duplicate | queries |
//! | precision@5, @10 | `1/5` (`1/10`) per hit within the first 5 (10) | queries |
//! | recall | duplicates found in `R` | total duplicates |
//! | precision | hits in `R` | total results returned |
//! | MAP@10 | per query `sum(hits_so_far / rank) / min(|D|, 10)` | queries |
//!
//! An empty denominator yields `0.0`.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::error::Result;
use crate::models::{BugId, BugRecord};
use crate::similarity::SimilarityStrategy;

/// Number of results requested per query.
pub const EVALUATION_K: usize = 10;

/// Which bugs take part in the evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationOptions {
    /// Reporters whose bugs carry little signal (automated filers).
    pub ignored_reporters: Vec<String>,
    /// Keyword marking bugs that are pending deduplication review.
    pub review_keyword: String,
}

impl Default for EvaluationOptions {
    fn default() -> Self {
        Self {
            ignored_reporters: vec![
                "intermittent-bug-filer@mozilla.bugs".to_string(),
                "wptsync@mozilla.bugs".to_string(),
            ],
            review_keyword: "dupeme".to_string(),
        }
    }
}

/// Symmetric `bug -> duplicates` map.
#[derive(Debug, Clone, Default)]
pub struct DuplicateGroundTruth {
    duplicates: BTreeMap<BugId, BTreeSet<BugId>>,
}

impl DuplicateGroundTruth {
    /// Collect duplicate links between eligible bugs.
    ///
    /// A bug is eligible unless its creator is an ignored reporter or it
    /// carries the review keyword. Links touching an ineligible bug are
    /// dropped in both directions.
    pub fn build(bugs: &[BugRecord], options: &EvaluationOptions) -> Self {
        let eligible: BTreeSet<BugId> = bugs
            .iter()
            .filter(|b| {
                !options.ignored_reporters.iter().any(|r| r == &b.creator)
                    && !b.has_keyword(&options.review_keyword)
            })
            .map(|b| b.id)
            .collect();

        let mut duplicates: BTreeMap<BugId, BTreeSet<BugId>> = BTreeMap::new();
        for bug in bugs.iter().filter(|b| eligible.contains(&b.id)) {
            let linked = bug.duplicates.iter().copied().chain(bug.dupe_of);
            for other in linked {
                if other == bug.id || !eligible.contains(&other) {
                    continue;
                }
                duplicates.entry(bug.id).or_default().insert(other);
                duplicates.entry(other).or_default().insert(bug.id);
            }
        }
        Self { duplicates }
    }

    pub fn duplicates_of(&self, id: BugId) -> Option<&BTreeSet<BugId>> {
        self.duplicates.get(&id).filter(|d| !d.is_empty())
    }

    /// Number of bugs with at least one duplicate.
    pub fn len(&self) -> usize {
        self.duplicates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.duplicates.is_empty()
    }
}

/// Aggregated metrics, as percentages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub queries: usize,
    pub recall_at_1: f64,
    pub recall_at_5: f64,
    pub recall_at_10: f64,
    pub precision_at_1: f64,
    pub precision_at_5: f64,
    pub precision_at_10: f64,
    pub recall: f64,
    pub precision: f64,
    pub map_at_10: f64,
}

/// Progress hook invoked while an evaluation runs.
pub trait EvaluationObserver {
    fn on_start(&mut self, _queries: usize) {}
    fn on_query(&mut self, _done: usize, _queries: usize, _bug: BugId) {}
    fn on_finish(&mut self, _report: &EvaluationReport) {}
}

/// Observer that ignores every event.
pub struct NoopObserver;

impl EvaluationObserver for NoopObserver {}

/// Running totals; turned into a report by [`Accumulator::finish`].
#[derive(Debug, Default)]
pub struct Accumulator {
    queries: usize,
    total_r: usize,
    hits_r: usize,
    total_p: usize,
    hits_p: usize,
    recall_1: usize,
    recall_5: usize,
    recall_10: usize,
    precision_1: f64,
    precision_5: f64,
    precision_10: f64,
    average_precisions: f64,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Score one query. `ranked` is truncated to the first 10 ids.
    pub fn add(&mut self, duplicates: &BTreeSet<BugId>, ranked: &[BugId]) {
        if duplicates.is_empty() {
            return;
        }
        let ranked = &ranked[..ranked.len().min(EVALUATION_K)];
        self.queries += 1;

        for dup in duplicates {
            self.total_r += 1;
            if let Some(pos) = ranked.iter().position(|id| id == dup) {
                self.hits_r += 1;
                if pos < 1 {
                    self.recall_1 += 1;
                }
                if pos < 5 {
                    self.recall_5 += 1;
                }
                if pos < 10 {
                    self.recall_10 += 1;
                }
            }
        }

        let mut hits = 0usize;
        let mut score = 0.0;
        for (pos, id) in ranked.iter().enumerate() {
            self.total_p += 1;
            if !duplicates.contains(id) {
                continue;
            }
            self.hits_p += 1;
            if pos == 0 {
                self.precision_1 += 1.0;
            }
            if pos < 5 {
                self.precision_5 += 1.0 / 5.0;
            }
            if pos < 10 {
                self.precision_10 += 1.0 / 10.0;
            }
            hits += 1;
            score += hits as f64 / (pos + 1) as f64;
        }
        self.average_precisions += score / duplicates.len().min(EVALUATION_K) as f64;
    }

    pub fn finish(&self) -> EvaluationReport {
        EvaluationReport {
            queries: self.queries,
            recall_at_1: percent(self.recall_1 as f64, self.total_r),
            recall_at_5: percent(self.recall_5 as f64, self.total_r),
            recall_at_10: percent(self.recall_10 as f64, self.total_r),
            precision_at_1: percent(self.precision_1, self.queries),
            precision_at_5: percent(self.precision_5, self.queries),
            precision_at_10: percent(self.precision_10, self.queries),
            recall: percent(self.hits_r as f64, self.total_r),
            precision: percent(self.hits_p as f64, self.total_p),
            map_at_10: percent(self.average_precisions, self.queries),
        }
    }
}

fn percent(numerator: f64, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator / denominator as f64 * 100.0
    }
}

/// Run the evaluation of `strategy` over `bugs`.
pub fn evaluate<S>(
    strategy: &S,
    bugs: &[BugRecord],
    options: &EvaluationOptions,
    observer: &mut dyn EvaluationObserver,
) -> Result<EvaluationReport>
where
    S: SimilarityStrategy + ?Sized,
{
    let truth = DuplicateGroundTruth::build(bugs, options);
    let queries: Vec<(&BugRecord, &BTreeSet<BugId>)> = bugs
        .iter()
        .filter_map(|b| truth.duplicates_of(b.id).map(|d| (b, d)))
        .collect();

    tracing::info!(
        strategy = strategy.kind().key(),
        queries = queries.len(),
        "evaluating"
    );
    observer.on_start(queries.len());

    let mut acc = Accumulator::new();
    for (done, (bug, duplicates)) in queries.iter().enumerate() {
        let ranked = strategy.get_similar_bugs(bug, EVALUATION_K)?;
        acc.add(duplicates, &ranked);
        observer.on_query(done + 1, queries.len(), bug.id);
    }

    let report = acc.finish();
    observer.on_finish(&report);
    Ok(report)
}
