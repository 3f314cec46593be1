//! Evaluation progress reporting.
//!
//! Reports how many duplicate queries `bugsim evaluate` has run so far.
//! Progress is emitted on **stderr** so stdout remains parseable for scripts.

use bug_similarity_core::evaluation::{EvaluationObserver, EvaluationReport};
use bug_similarity_core::{BugId, StrategyKind};
use std::io::Write;

/// Human progress is printed every this many queries (and on the last one).
const HUMAN_EVERY: usize = 100;

/// Human-friendly progress on stderr: "evaluate bm25  1,200 / 5,000 queries".
pub struct StderrProgress {
    strategy: StrategyKind,
}

impl EvaluationObserver for StderrProgress {
    fn on_start(&mut self, queries: usize) {
        write_line(&format!(
            "evaluate {}  {} queries\n",
            self.strategy,
            format_number(queries as u64)
        ));
    }

    fn on_query(&mut self, done: usize, queries: usize, _bug: BugId) {
        if done % HUMAN_EVERY != 0 && done != queries {
            return;
        }
        write_line(&format!(
            "evaluate {}  {} / {} queries\n",
            self.strategy,
            format_number(done as u64),
            format_number(queries as u64)
        ));
    }

    fn on_finish(&mut self, report: &EvaluationReport) {
        write_line(&format!(
            "evaluate {}  done  MAP@10 {:.2}\n",
            self.strategy, report.map_at_10
        ));
    }
}

fn write_line(line: &str) {
    let _ = std::io::stderr().lock().write_all(line.as_bytes());
    let _ = std::io::stderr().lock().flush();
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress {
    strategy: StrategyKind,
}

impl JsonProgress {
    fn emit(&self, obj: serde_json::Value) {
        if let Ok(line) = serde_json::to_string(&obj) {
            let _ = writeln!(std::io::stderr().lock(), "{}", line);
            let _ = std::io::stderr().lock().flush();
        }
    }
}

impl EvaluationObserver for JsonProgress {
    fn on_start(&mut self, queries: usize) {
        self.emit(serde_json::json!({
            "event": "start",
            "strategy": self.strategy.key(),
            "queries": queries
        }));
    }

    fn on_query(&mut self, done: usize, queries: usize, bug: BugId) {
        self.emit(serde_json::json!({
            "event": "progress",
            "strategy": self.strategy.key(),
            "n": done,
            "total": queries,
            "bug": bug
        }));
    }

    fn on_finish(&mut self, report: &EvaluationReport) {
        self.emit(serde_json::json!({
            "event": "finish",
            "strategy": self.strategy.key(),
            "report": report
        }));
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl EvaluationObserver for NoProgress {}

fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + (s.len() - 1) / 3);
    let chars: Vec<char> = s.chars().rev().collect();
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(*c);
    }
    result.chars().rev().collect()
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    /// Build an observer for this mode.
    pub fn observer(&self, strategy: StrategyKind) -> Box<dyn EvaluationObserver> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress { strategy }),
            ProgressMode::Json => Box::new(JsonProgress { strategy }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_number_comma() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(1), "1");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1234), "1,234");
        assert_eq!(format_number(1_234_567), "1,234,567");
    }

    #[test]
    fn observers_accept_every_event() {
        for mode in [ProgressMode::Off, ProgressMode::Human, ProgressMode::Json] {
            let mut observer = mode.observer(StrategyKind::Bm25);
            observer.on_start(2);
            observer.on_query(1, 2, 10);
            observer.on_query(2, 2, 11);
            observer.on_finish(&EvaluationReport::default());
        }
    }
}
