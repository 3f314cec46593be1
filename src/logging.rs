//! Tracing subscriber setup.
//!
//! Log lines go to stderr so stdout stays parseable. `BUGSIM_LOG` takes
//! precedence over `[logging].filter`, e.g.
//! `BUGSIM_LOG=bug_similarity_core=debug` to see pruning statistics.

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

pub const LOG_ENV: &str = "BUGSIM_LOG";

fn filter(config: &LoggingConfig) -> Result<EnvFilter> {
    match EnvFilter::try_from_env(LOG_ENV) {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&config.filter)
            .with_context(|| format!("Invalid logging.filter: '{}'", config.filter)),
    }
}

/// Install the global subscriber. Safe to call more than once; later
/// calls are ignored.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let filter = filter(config)?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true);

    let result = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    // A subscriber already installed (tests, repeated init) is not an error.
    let _ = result;
    Ok(())
}
