//! Release-tracking classifier.
//!
//! Predicts whether a bug will get a `cf_tracking_firefoxNN` flag set to
//! `+` or `blocking`.
//!
//! - [`labels`]: class per bug from its change history.
//! - [`rollback`]: the bug as it was before its first tracking-flag change,
//!   so features never see the answer.
//! - [`features`]: feature functions and the fitted [`FeatureSpace`].
//! - [`classifier`]: the [`Classifier`] contract and [`LogisticRegression`].

pub mod classifier;
pub mod features;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{Result, SimilarityError};
use crate::models::{BugId, BugRecord, FieldChange};
use crate::vector::SparseVec;

pub use self::classifier::{Classifier, LogisticRegression};
pub use self::features::{BugFeatures, FeatureExtractor, FeatureSpace, FeatureValue};

const TRACKING_PREFIX: &str = "cf_tracking_firefox";
const UNLABELLED_RESOLUTIONS: [&str; 2] = ["INVALID", "DUPLICATE"];

pub fn is_tracking_change(change: &FieldChange) -> bool {
    change.field_name.starts_with(TRACKING_PREFIX)
}

fn is_unlabelled(bug: &BugRecord) -> bool {
    UNLABELLED_RESOLUTIONS.contains(&bug.resolution.as_str())
}

/// Class per bug id.
///
/// The last tracking change decides: `+` or `blocking` is 1, `-` is 0.
/// Bugs without such a change are 0, unless resolved INVALID or DUPLICATE,
/// which are left out.
pub fn labels(bugs: &[BugRecord]) -> BTreeMap<BugId, u8> {
    let mut classes = BTreeMap::new();
    for bug in bugs {
        let mut class = None;
        for change in bug.history.iter().flat_map(|e| &e.changes) {
            if !is_tracking_change(change) {
                continue;
            }
            match change.added.as_str() {
                "blocking" | "+" => class = Some(1),
                "-" => class = Some(0),
                _ => {}
            }
        }
        match class {
            Some(c) => {
                classes.insert(bug.id, c);
            }
            None if !is_unlabelled(bug) => {
                classes.insert(bug.id, 0);
            }
            None => {}
        }
    }
    classes
}

/// Undo history back to (and including) the first entry with a change
/// matching `when`. Returns the bug unchanged when nothing matches.
pub fn rollback<F>(bug: &BugRecord, when: F) -> BugRecord
where
    F: Fn(&FieldChange) -> bool,
{
    let mut rolled = bug.clone();
    let Some(first) = bug.history.iter().position(|e| e.changes.iter().any(&when)) else {
        return rolled;
    };
    for entry in bug.history[first..].iter().rev() {
        for change in entry.changes.iter().rev() {
            revert(&mut rolled, change);
        }
    }
    rolled.history.truncate(first);
    rolled
}

fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(str::trim).filter(|s| !s.is_empty())
}

fn revert(bug: &mut BugRecord, change: &FieldChange) {
    let previous = change.removed.clone();
    match change.field_name.as_str() {
        "keywords" => {
            let added: Vec<&str> = split_list(&change.added).collect();
            bug.keywords.retain(|k| !added.contains(&k.as_str()));
            for k in split_list(&change.removed) {
                if !bug.has_keyword(k) {
                    bug.keywords.push(k.to_string());
                }
            }
        }
        "summary" => bug.summary = previous,
        "severity" | "bug_severity" => bug.severity = previous,
        "priority" => bug.priority = previous,
        "status" | "bug_status" => bug.status = previous,
        "resolution" => bug.resolution = previous,
        "whiteboard" | "status_whiteboard" => bug.whiteboard = previous,
        "url" | "bug_file_loc" => bug.url = previous,
        "cf_crash_signature" => bug.cf_crash_signature = previous,
        "cf_has_str" => bug.cf_has_str = previous,
        "cf_has_regression_range" => bug.cf_has_regression_range = previous,
        _ => {}
    }
}

/// Probability of being tracked and the resulting class.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub class: u8,
    /// `[P(class 0), P(class 1)]`
    pub probabilities: [f64; 2],
}

impl Prediction {
    fn from_probability(p: f64) -> Self {
        Self {
            class: u8::from(p >= 0.5),
            probabilities: [1.0 - p, p],
        }
    }
}

/// Outcome of [`TrackingModel::train`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSummary {
    pub samples: usize,
    pub positives: usize,
    pub features: usize,
    /// Share of training samples classified correctly, in percent.
    pub accuracy: f64,
}

/// Feature space plus fitted classifier; serializes to JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingModel {
    space: FeatureSpace,
    classifier: LogisticRegression,
}

impl TrackingModel {
    /// Label `bugs`, roll each labelled bug back, and fit `classifier`.
    pub fn train(bugs: &[BugRecord], mut classifier: LogisticRegression) -> Result<(Self, TrainingSummary)> {
        let classes = labels(bugs);
        let extractor = FeatureExtractor::new();
        let (features, targets): (Vec<BugFeatures>, Vec<u8>) = bugs
            .iter()
            .filter_map(|bug| {
                let class = *classes.get(&bug.id)?;
                Some((extractor.extract(&rollback(bug, is_tracking_change)), class))
            })
            .unzip();
        if features.is_empty() {
            return Err(SimilarityError::Model("no labelled bugs to train on".to_string()));
        }

        let space = FeatureSpace::fit(&features);
        let rows: Vec<SparseVec> = features.iter().map(|f| space.transform(f)).collect();
        classifier.fit(&rows, space.dims(), &targets)?;

        let correct = rows
            .iter()
            .zip(&targets)
            .filter(|&(row, &t)| classifier.predict(row) == t)
            .count();
        let summary = TrainingSummary {
            samples: rows.len(),
            positives: targets.iter().filter(|&&t| t == 1).count(),
            features: space.dims(),
            accuracy: 100.0 * correct as f64 / rows.len() as f64,
        };
        tracing::info!(
            samples = summary.samples,
            positives = summary.positives,
            features = summary.features,
            accuracy = summary.accuracy,
            "tracking model trained"
        );
        Ok((Self { space, classifier }, summary))
    }

    pub fn feature_names(&self) -> Vec<String> {
        self.space.feature_names()
    }

    pub fn classify(&self, bug: &BugRecord) -> Prediction {
        let rolled = rollback(bug, is_tracking_change);
        let features = FeatureExtractor::new().extract(&rolled);
        let p = self.classifier.predict_proba(&self.space.transform(&features));
        Prediction::from_probability(p)
    }

    /// Force INVALID and DUPLICATE bugs to class 0 with probabilities `[1, 0]`.
    pub fn overwrite_classes(bugs: &[BugRecord], predictions: &mut [Prediction]) {
        for (bug, prediction) in bugs.iter().zip(predictions.iter_mut()) {
            if is_unlabelled(bug) {
                *prediction = Prediction {
                    class: 0,
                    probabilities: [1.0, 0.0],
                };
            }
        }
    }
}
