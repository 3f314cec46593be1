//! Corpus sources.
//!
//! The tracker itself is never queried: the corpus is a newline-delimited
//! JSON dump with one bug record per line.

use anyhow::{Context, Result};
use bug_similarity_core::{BugId, BugRecord};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Anything that can produce the full corpus snapshot.
pub trait BugSource {
    fn bugs(&self) -> Result<Vec<BugRecord>>;
}

/// Reads `{"id": ..., "summary": ..., ...}` lines; blank lines are skipped.
pub struct JsonlBugSource {
    path: PathBuf,
}

impl JsonlBugSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl BugSource for JsonlBugSource {
    fn bugs(&self) -> Result<Vec<BugRecord>> {
        let file = File::open(&self.path)
            .with_context(|| format!("Failed to open corpus: {}", self.path.display()))?;

        let mut bugs = Vec::new();
        for (i, line) in BufReader::new(file).lines().enumerate() {
            let line = line.with_context(|| format!("Failed to read {}", self.path.display()))?;
            if line.trim().is_empty() {
                continue;
            }
            let bug: BugRecord = serde_json::from_str(&line).with_context(|| {
                format!("{}:{}: invalid bug record", self.path.display(), i + 1)
            })?;
            bugs.push(bug);
        }

        tracing::info!(path = %self.path.display(), bugs = bugs.len(), "loaded corpus");
        Ok(bugs)
    }
}

/// In-memory corpus.
pub struct VecBugSource(pub Vec<BugRecord>);

impl BugSource for VecBugSource {
    fn bugs(&self) -> Result<Vec<BugRecord>> {
        Ok(self.0.clone())
    }
}

/// Look up a bug by id or fail with a readable message.
pub fn find_bug(bugs: &[BugRecord], id: BugId) -> Result<&BugRecord> {
    bugs.iter()
        .find(|b| b.id == id)
        .with_context(|| format!("Bug {} is not in the corpus", id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn reads_records_and_skips_blank_lines() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("bugs.json");
        fs::write(
            &path,
            "{\"id\": 1, \"summary\": \"crash\"}\n\n{\"id\": 2, \"summary\": \"hang\", \"dupe_of\": 1}\n",
        )
        .unwrap();
        let bugs = JsonlBugSource::new(&path).bugs().unwrap();
        assert_eq!(bugs.len(), 2);
        assert_eq!(bugs[1].dupe_of, Some(1));
        assert_eq!(find_bug(&bugs, 2).unwrap().summary, "hang");
        assert!(find_bug(&bugs, 3).is_err());
    }

    #[test]
    fn reports_line_number_of_bad_record() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("bugs.json");
        fs::write(&path, "{\"id\": 1}\n{not json}\n").unwrap();
        let err = JsonlBugSource::new(&path).bugs().unwrap_err();
        assert!(format!("{:#}", err).contains(":2: invalid bug record"));
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(JsonlBugSource::new("/nonexistent/bugs.json").bugs().is_err());
    }

    #[test]
    fn vec_source_returns_its_records() {
        let source = VecBugSource(vec![BugRecord::new(5, "a", "b")]);
        assert_eq!(source.bugs().unwrap()[0].id, 5);
    }
}
