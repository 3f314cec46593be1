use anyhow::Result;
use bug_similarity_core::StrategyKind;

/// Print every registered strategy with its artifact type and distance support.
pub fn list_strategies() -> Result<()> {
    println!("{:<26} {:<28} DISTANCE", "STRATEGY", "TYPE");
    for kind in StrategyKind::ALL {
        println!(
            "{:<26} {:<28} {}",
            kind.key(),
            kind.type_name(),
            if kind.supports_distance() { "yes" } else { "no" }
        );
    }
    Ok(())
}
