//! `bugsim tracking`: labels, training, and classification for the
//! release-tracking model.

use anyhow::{Context, Result};
use bug_similarity_core::tracking::{self, TrackingModel, TrainingSummary};
use bug_similarity_core::{BugId, BugRecord};
use std::path::Path;

use crate::config::Config;
use crate::source::find_bug;

/// Print label counts derived from the corpus history.
pub fn run_labels(bugs: &[BugRecord]) -> Result<()> {
    let labels = tracking::labels(bugs);
    let positives = labels.values().filter(|&&class| class == 1).count();

    println!("  Bugs:       {}", bugs.len());
    println!("  Labelled:   {}", labels.len());
    println!("  Tracked:    {}", positives);
    println!("  Untracked:  {}", labels.len() - positives);
    Ok(())
}

/// Train the tracking model and write it as JSON to `output`.
pub fn run_train(config: &Config, bugs: &[BugRecord], output: &Path) -> Result<TrainingSummary> {
    let (model, summary) = TrackingModel::train(bugs, config.classifier())
        .context("Failed to train tracking model")?;

    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(&model)?;
    std::fs::write(output, json)
        .with_context(|| format!("Failed to write model: {}", output.display()))?;

    println!("Trained tracking model on {} bugs", summary.samples);
    println!("  tracked:   {}", summary.positives);
    println!("  features:  {}", summary.features);
    println!("  accuracy:  {:.2}%", summary.accuracy);
    println!("  model:     {}", output.display());
    Ok(summary)
}

pub fn load_model(path: &Path) -> Result<TrackingModel> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read model: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse model: {}", path.display()))
}

/// Classify one bug; INVALID and DUPLICATE bugs are forced to class 0.
pub fn run_classify(bugs: &[BugRecord], id: BugId, model: &Path) -> Result<()> {
    let model = load_model(model)?;
    let bug = find_bug(bugs, id)?;

    let mut predictions = [model.classify(bug)];
    TrackingModel::overwrite_classes(std::slice::from_ref(bug), &mut predictions);
    let prediction = predictions[0];

    println!(
        "{}\tclass={}\tp0={:.4}\tp1={:.4}",
        id, prediction.class, prediction.probabilities[0], prediction.probabilities[1]
    );
    Ok(())
}
