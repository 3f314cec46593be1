use anyhow::Result;
use bug_similarity_core::{BugId, BugRecord, SimilarityStrategy};

use crate::source::find_bug;

/// Print the distance between bugs `a` and `b`; `inf` when either has no known tokens.
pub fn run_distance(
    strategy: &dyn SimilarityStrategy,
    bugs: &[BugRecord],
    a: BugId,
    b: BugId,
) -> Result<f64> {
    let left = find_bug(bugs, a)?;
    let right = find_bug(bugs, b)?;
    let distance = strategy.get_distance(left, right)?;
    println!("{:.6}", distance);
    Ok(distance)
}
