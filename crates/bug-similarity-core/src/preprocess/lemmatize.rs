//! Lemmatization resources.
//!
//! The [`Lemmatizer`] trait lets callers plug in a full morphological
//! analyzer. [`RuleLemmatizer`] is the built-in fallback: an irregular-form
//! table plus conservative English suffix rules.

use std::collections::HashMap;

/// Maps a surface token to its lemma.
pub trait Lemmatizer: Send + Sync {
    fn lemmatize(&self, token: &str) -> String;
}

const IRREGULAR: &[(&str, &str)] = &[
    ("am", "be"),
    ("is", "be"),
    ("are", "be"),
    ("was", "be"),
    ("were", "be"),
    ("been", "be"),
    ("being", "be"),
    ("has", "have"),
    ("had", "have"),
    ("does", "do"),
    ("did", "do"),
    ("done", "do"),
    ("went", "go"),
    ("gone", "go"),
    ("made", "make"),
    ("ran", "run"),
    ("got", "get"),
    ("gotten", "get"),
    ("began", "begin"),
    ("begun", "begin"),
    ("broke", "break"),
    ("broken", "break"),
    ("built", "build"),
    ("froze", "freeze"),
    ("frozen", "freeze"),
    ("hung", "hang"),
    ("shown", "show"),
    ("saw", "see"),
    ("seen", "see"),
    ("took", "take"),
    ("taken", "take"),
    ("wrote", "write"),
    ("written", "write"),
    ("children", "child"),
    ("men", "man"),
    ("women", "woman"),
    ("mice", "mouse"),
    ("indices", "index"),
    ("better", "good"),
    ("best", "good"),
    ("worse", "bad"),
    ("worst", "bad"),
];

/// Rule-based English lemmatizer.
pub struct RuleLemmatizer {
    irregular: HashMap<&'static str, &'static str>,
}

impl RuleLemmatizer {
    pub fn new() -> Self {
        Self {
            irregular: IRREGULAR.iter().copied().collect(),
        }
    }

    fn strip_verb_suffix(word: &str, suffix: &str) -> Option<String> {
        let stem = word.strip_suffix(suffix)?;
        if stem.len() < 3 || !stem.chars().any(is_vowel) {
            return None;
        }
        let bytes = stem.as_bytes();
        let n = bytes.len();
        // "running" -> "run", but keep "falling" -> "fall".
        if n >= 2 && bytes[n - 1] == bytes[n - 2] && !matches!(bytes[n - 1], b'l' | b's' | b'z') {
            return Some(stem[..n - 1].to_string());
        }
        Some(stem.to_string())
    }
}

fn is_vowel(c: char) -> bool {
    matches!(c, 'a' | 'e' | 'i' | 'o' | 'u')
}

impl Default for RuleLemmatizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Lemmatizer for RuleLemmatizer {
    fn lemmatize(&self, token: &str) -> String {
        let word = token.to_lowercase();
        if let Some(lemma) = self.irregular.get(word.as_str()) {
            return (*lemma).to_string();
        }
        if word.len() <= 3 || word.chars().any(|c| c.is_ascii_digit()) {
            return word;
        }
        if let Some(stem) = word.strip_suffix("ies") {
            return format!("{}y", stem);
        }
        for suffix in ["sses", "shes", "ches", "xes", "zes"] {
            if word.ends_with(suffix) {
                return word[..word.len() - 2].to_string();
            }
        }
        if let Some(lemma) = Self::strip_verb_suffix(&word, "ing") {
            return lemma;
        }
        if let Some(stem) = word.strip_suffix("ied") {
            return format!("{}y", stem);
        }
        if let Some(lemma) = Self::strip_verb_suffix(&word, "ed") {
            return lemma;
        }
        if word.ends_with('s') && !word.ends_with("ss") && !word.ends_with("us") && !word.ends_with("is") {
            return word[..word.len() - 1].to_string();
        }
        word
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_irregular_forms() {
        let l = RuleLemmatizer::new();
        assert_eq!(l.lemmatize("Was"), "be");
        assert_eq!(l.lemmatize("froze"), "freeze");
        assert_eq!(l.lemmatize("children"), "child");
    }

    #[test]
    fn test_suffix_rules() {
        let l = RuleLemmatizer::new();
        assert_eq!(l.lemmatize("crashes"), "crash");
        assert_eq!(l.lemmatize("tabs"), "tab");
        assert_eq!(l.lemmatize("queries"), "query");
        assert_eq!(l.lemmatize("running"), "run");
        assert_eq!(l.lemmatize("loading"), "load");
        assert_eq!(l.lemmatize("crashed"), "crash");
        assert_eq!(l.lemmatize("status"), "status");
        assert_eq!(l.lemmatize("process"), "process");
    }

    #[test]
    fn test_short_and_numeric_tokens_untouched() {
        let l = RuleLemmatizer::new();
        assert_eq!(l.lemmatize("gps"), "gps");
        assert_eq!(l.lemmatize("x86s"), "x86s");
    }
}
