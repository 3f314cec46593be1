//! Feature extraction for the tracking classifier.
//!
//! | Feature | Kind |
//! |---------|------|
//! | `has_str` | category (`cf_has_str`) |
//! | `has_regression_range` | category |
//! | `severity` | category |
//! | `keywords` | categories |
//! | `is_coverity_issue` | flag |
//! | `has_crash_signature` | flag |
//! | `has_url` / `has_w3c_url` / `has_github_url` | flags |
//! | `whiteboard` | categories (bracketed tag names) |
//! | `patches` | count |
//! | `landings` | count |
//! | `title` | categories (marker words in the summary) |
//! | `priority` | category |
//! | `bug_reporter` | category |
//!
//! Summary and comment text go through a reduced cleanup chain (file
//! references, URLs, synonyms) and are vectorized separately with TF-IDF.
//! [`FeatureSpace`] one-hot encodes categories as `name=value` columns and
//! lays out `[data | title | comments]` as one sparse row.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::models::BugRecord;
use crate::preprocess::cleanup::{self, TextCleanup};
use crate::tfidf::TfidfVectorizer;
use crate::vector::SparseVec;

static COVERITY: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bCID\s?[0-9]+").expect("coverity regex"));
static WHITEBOARD_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[([^\]:\s]+)").expect("whiteboard regex"));

const TITLE_MARKERS: &[&str] = &["fail", "crash", "hang", "leak", "regression", "intermittent"];
const LANDING_MARKER: &str = "https://hg.mozilla.org/";

/// One feature value before encoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FeatureValue {
    Flag(bool),
    Count(f64),
    Category(String),
    Categories(Vec<String>),
}

/// Everything extracted from one bug.
#[derive(Debug, Clone, PartialEq)]
pub struct BugFeatures {
    pub data: BTreeMap<&'static str, FeatureValue>,
    pub title: String,
    pub comments: String,
}

/// Runs the feature functions and the text cleanup chain.
pub struct FeatureExtractor {
    cleanups: Vec<Box<dyn TextCleanup>>,
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureExtractor {
    pub fn new() -> Self {
        Self {
            cleanups: vec![
                Box::new(cleanup::file_references()),
                Box::new(cleanup::urls()),
                Box::new(cleanup::synonyms()),
            ],
        }
    }

    fn clean(&self, text: &str) -> String {
        self.cleanups.iter().fold(text.to_string(), |acc, c| c.clean(&acc))
    }

    pub fn extract(&self, bug: &BugRecord) -> BugFeatures {
        use FeatureValue::*;

        let mut data = BTreeMap::new();
        data.insert("has_str", Category(bug.cf_has_str.clone()));
        data.insert("has_regression_range", Category(bug.cf_has_regression_range.clone()));
        data.insert("severity", Category(bug.severity.clone()));
        data.insert("keywords", Categories(bug.keywords.clone()));
        data.insert(
            "is_coverity_issue",
            Flag(COVERITY.is_match(&bug.summary) || bug.has_keyword("coverity")),
        );
        data.insert("has_crash_signature", Flag(!bug.cf_crash_signature.trim().is_empty()));
        data.insert("has_url", Flag(!bug.url.is_empty()));
        data.insert("has_w3c_url", Flag(bug.url.contains("w3c")));
        data.insert("has_github_url", Flag(bug.url.contains("github")));
        data.insert("whiteboard", Categories(whiteboard_tags(&bug.whiteboard)));
        data.insert("patches", Count(patch_count(bug) as f64));
        data.insert("landings", Count(landing_count(bug) as f64));
        data.insert("title", Categories(title_markers(&bug.summary)));
        data.insert("priority", Category(bug.priority.clone()));
        data.insert("bug_reporter", Category(bug.creator.clone()));

        let comments: Vec<String> = bug.comments.iter().map(|c| self.clean(&c.text)).collect();
        BugFeatures {
            data,
            title: self.clean(&bug.summary),
            comments: comments.join(" "),
        }
    }
}

fn whiteboard_tags(whiteboard: &str) -> Vec<String> {
    let tags: BTreeSet<String> = WHITEBOARD_TAG
        .captures_iter(whiteboard)
        .map(|c| c[1].to_lowercase())
        .collect();
    tags.into_iter().collect()
}

fn patch_count(bug: &BugRecord) -> usize {
    bug.attachments
        .iter()
        .filter(|a| {
            !a.is_obsolete
                && (a.is_patch
                    || a.content_type == "text/x-phabricator-request"
                    || a.content_type == "text/x-review-board-request")
        })
        .count()
}

fn landing_count(bug: &BugRecord) -> usize {
    bug.comments.iter().filter(|c| c.text.contains(LANDING_MARKER)).count()
}

fn title_markers(summary: &str) -> Vec<String> {
    let lowered = summary.to_lowercase();
    TITLE_MARKERS
        .iter()
        .filter(|m| lowered.contains(*m))
        .map(|m| m.to_string())
        .collect()
}

/// Fitted column layout for [`BugFeatures`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureSpace {
    columns: BTreeMap<String, u32>,
    title: TfidfVectorizer,
    comments: TfidfVectorizer,
}

impl FeatureSpace {
    pub fn fit(features: &[BugFeatures]) -> Self {
        let names: BTreeSet<String> = features
            .iter()
            .flat_map(|f| encode(&f.data).into_iter().map(|(name, _)| name))
            .collect();
        let columns = names.into_iter().enumerate().map(|(i, n)| (n, i as u32)).collect();

        let titles: Vec<&str> = features.iter().map(|f| f.title.as_str()).collect();
        let comments: Vec<&str> = features.iter().map(|f| f.comments.as_str()).collect();
        let mut title = TfidfVectorizer::new(1).with_english_stop_words();
        title.fit(&titles);
        let mut comments_vectorizer = TfidfVectorizer::new(1).with_english_stop_words();
        comments_vectorizer.fit(&comments);

        Self {
            columns,
            title,
            comments: comments_vectorizer,
        }
    }

    pub fn dims(&self) -> usize {
        self.columns.len() + self.title.vocabulary_len() + self.comments.vocabulary_len()
    }

    /// Encode one bug; unseen categories are ignored.
    pub fn transform(&self, features: &BugFeatures) -> SparseVec {
        let mut row: SparseVec = encode(&features.data)
            .into_iter()
            .filter_map(|(name, v)| Some((*self.columns.get(&name)?, v)))
            .filter(|&(_, v)| v != 0.0)
            .collect();
        row.sort_unstable_by_key(|&(i, _)| i);

        let title_offset = self.columns.len() as u32;
        row.extend(
            self.title
                .transform(&features.title)
                .into_iter()
                .map(|(i, v)| (i + title_offset, v)),
        );
        let comments_offset = title_offset + self.title.vocabulary_len() as u32;
        row.extend(
            self.comments
                .transform(&features.comments)
                .into_iter()
                .map(|(i, v)| (i + comments_offset, v)),
        );
        row
    }

    /// Column names in index order.
    pub fn feature_names(&self) -> Vec<String> {
        let mut names = vec![String::new(); self.columns.len()];
        for (name, &i) in &self.columns {
            names[i as usize] = name.clone();
        }
        names.extend(self.title.feature_names().into_iter().map(|n| format!("title:{}", n)));
        names.extend(self.comments.feature_names().into_iter().map(|n| format!("comments:{}", n)));
        names
    }
}

/// `(column name, value)` pairs: flags and counts use the feature name,
/// categories become `name=value`.
fn encode(data: &BTreeMap<&'static str, FeatureValue>) -> Vec<(String, f64)> {
    let mut out = Vec::new();
    for (&name, value) in data {
        match value {
            FeatureValue::Flag(b) => out.push((name.to_string(), if *b { 1.0 } else { 0.0 })),
            FeatureValue::Count(c) => out.push((name.to_string(), *c)),
            FeatureValue::Category(v) => out.push((format!("{}={}", name, v), 1.0)),
            FeatureValue::Categories(vs) => {
                out.extend(vs.iter().map(|v| (format!("{}={}", name, v), 1.0)));
            }
        }
    }
    out
}
