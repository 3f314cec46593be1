use anyhow::{Context, Result};
use bug_similarity_core::{BugId, BugRecord, SimilarityStrategy};

use crate::source::find_bug;

/// Print the corpus bugs most similar to `id`, nearest first.
pub fn run_similar(
    strategy: &dyn SimilarityStrategy,
    bugs: &[BugRecord],
    id: BugId,
    limit: usize,
) -> Result<()> {
    let query = find_bug(bugs, id)?;
    let similar = strategy
        .get_similar_bugs(query, limit)
        .with_context(|| format!("{} failed for bug {}", strategy.kind(), id))?;

    if similar.is_empty() {
        println!("No similar bugs found for {}.", id);
        return Ok(());
    }

    for (rank, similar_id) in similar.iter().enumerate() {
        let summary = bugs
            .iter()
            .find(|b| b.id == *similar_id)
            .map(|b| b.summary.as_str())
            .unwrap_or("");
        println!("{:>3}. {:<10} {}", rank + 1, similar_id, summary);
    }
    Ok(())
}
