//! Text preprocessing for bug summaries and descriptions.
//!
//! # Pipeline
//!
//! 1. Apply the ordered cleanup chain ([`cleanup`]).
//! 2. Replace every character outside `[a-zA-Z0-9]` with a space.
//! 3. Either lemmatize every token, or lowercase, tokenize, drop stopwords
//!    and single-character tokens, and stem what remains.
//! 4. Optionally join the tokens with single spaces.
//!
//! The pipeline is pure and deterministic for a fixed chain and fixed
//! resources. Only [`PreprocessOptions`] is persisted with a strategy; a
//! deserialized [`Preprocessor`] rebuilds the default resources.
//!
//! # Example
//!
//! ```rust
//! use bug_similarity_core::preprocess::{PreprocessOptions, Preprocessor};
//!
//! let pre = Preprocessor::new(PreprocessOptions::default());
//! let tokens = pre.preprocess("The browser crashes on startup", false);
//! assert_eq!(tokens, vec!["browser", "crash", "startup"]);
//! ```

pub mod cleanup;
pub mod lemmatize;
pub mod stopwords;

use rust_stemmers::{Algorithm, Stemmer};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use unicode_segmentation::UnicodeSegmentation;

use self::cleanup::TextCleanup;
use self::lemmatize::{Lemmatizer, RuleLemmatizer};
use self::stopwords::StopWords;

/// Options that select the preprocessing path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessOptions {
    /// Append the URL rewrite to the cleanup chain.
    pub cleanup_urls: bool,
    /// Use Unicode word segmentation instead of whitespace splitting.
    pub word_tokenizer: bool,
    /// Lemmatize instead of stemming when strategies tokenize documents.
    pub lemmatize: bool,
}

impl Default for PreprocessOptions {
    fn default() -> Self {
        Self {
            cleanup_urls: true,
            word_tokenizer: false,
            lemmatize: false,
        }
    }
}

/// Cleans and tokenizes free text.
pub struct Preprocessor {
    options: PreprocessOptions,
    cleanups: Vec<Box<dyn TextCleanup>>,
    stopwords: StopWords,
    lemmatizer: Box<dyn Lemmatizer>,
    stemmer: Stemmer,
}

impl Preprocessor {
    /// Build a preprocessor with the default cleanup chain and English resources.
    pub fn new(options: PreprocessOptions) -> Self {
        Self::with_resources(
            options,
            cleanup::default_chain(options.cleanup_urls),
            StopWords::english(),
            Box::new(RuleLemmatizer::new()),
        )
    }

    /// Build a preprocessor from explicitly supplied resources.
    pub fn with_resources(
        options: PreprocessOptions,
        cleanups: Vec<Box<dyn TextCleanup>>,
        stopwords: StopWords,
        lemmatizer: Box<dyn Lemmatizer>,
    ) -> Self {
        Self {
            options,
            cleanups,
            stopwords,
            lemmatizer,
            stemmer: Stemmer::create(Algorithm::English),
        }
    }

    pub fn options(&self) -> PreprocessOptions {
        self.options
    }

    /// Run the pipeline and return tokens.
    pub fn preprocess(&self, text: &str, lemmatize: bool) -> Vec<String> {
        let cleaned = self.clean(text);

        if lemmatize {
            return cleaned
                .split_whitespace()
                .map(|token| self.lemmatizer.lemmatize(token))
                .collect();
        }

        let lowered = cleaned.to_lowercase();
        let tokens: Vec<&str> = if self.options.word_tokenizer {
            lowered.unicode_words().collect()
        } else {
            lowered.split_whitespace().collect()
        };

        tokens
            .into_iter()
            .filter(|word| word.len() > 1 && !self.stopwords.contains(word))
            .map(|word| self.stemmer.stem(word).into_owned())
            .collect()
    }

    /// Run the pipeline and join tokens with single spaces.
    pub fn preprocess_joined(&self, text: &str, lemmatize: bool) -> String {
        self.preprocess(text, lemmatize).join(" ")
    }

    /// Tokens using the configured path (stem or lemmatize).
    pub fn tokens(&self, text: &str) -> Vec<String> {
        self.preprocess(text, self.options.lemmatize)
    }

    /// Steps 1 and 2: cleanup chain, then strip non-alphanumerics.
    fn clean(&self, text: &str) -> String {
        let mut out = text.to_string();
        for step in &self.cleanups {
            out = step.clean(&out);
        }
        out.chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { ' ' })
            .collect()
    }
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new(PreprocessOptions::default())
    }
}

impl fmt::Debug for Preprocessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.cleanups.iter().map(|c| c.name()).collect();
        f.debug_struct("Preprocessor")
            .field("options", &self.options)
            .field("cleanups", &names)
            .field("stopwords", &self.stopwords.len())
            .finish()
    }
}

impl Serialize for Preprocessor {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.options.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Preprocessor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        PreprocessOptions::deserialize(deserializer).map(Preprocessor::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stem_path_drops_stopwords_and_short_tokens() {
        let pre = Preprocessor::default();
        let tokens = pre.preprocess("A tab is crashing when I open x", false);
        assert_eq!(tokens, vec!["tab", "crash", "open"]);
    }

    #[test]
    fn test_non_alphanumerics_become_separators() {
        let pre = Preprocessor::default();
        let tokens = pre.preprocess("video-player/controls: broken!!", false);
        assert_eq!(tokens, vec!["video", "player", "control", "broken"]);
    }

    #[test]
    fn test_cleanup_runs_before_stripping() {
        let pre = Preprocessor::default();
        let tokens = pre.preprocess("crash at 0xdeadbeef", false);
        assert_eq!(tokens, vec!["crash", "hex", "number"]);
    }

    #[test]
    fn test_url_toggle() {
        let with_urls = Preprocessor::default();
        let without = Preprocessor::new(PreprocessOptions {
            cleanup_urls: false,
            ..Default::default()
        });
        let text = "see https://example.org/page";
        assert!(with_urls.preprocess(text, false).contains(&"url".to_string()));
        assert!(without.preprocess(text, false).contains(&"exampl".to_string()));
    }

    #[test]
    fn test_lemmatize_path_keeps_every_token() {
        let pre = Preprocessor::default();
        let tokens = pre.preprocess("Tabs were crashing", true);
        assert_eq!(tokens, vec!["tab", "be", "crash"]);
    }

    #[test]
    fn test_joined() {
        let pre = Preprocessor::default();
        assert_eq!(
            pre.preprocess_joined("Firefox freezes on startup", false),
            "firefox freez startup"
        );
    }

    #[test]
    fn test_word_tokenizer_matches_whitespace_after_stripping() {
        let a = Preprocessor::default();
        let b = Preprocessor::new(PreprocessOptions {
            word_tokenizer: true,
            ..Default::default()
        });
        let text = "Scrolling is janky on long pages";
        assert_eq!(a.preprocess(text, false), b.preprocess(text, false));
    }

    #[test]
    fn test_custom_resources() {
        let pre = Preprocessor::with_resources(
            PreprocessOptions::default(),
            vec![Box::new(|t: &str| t.replace("Firefox", ""))],
            StopWords::from_words(["crash"]),
            Box::new(RuleLemmatizer::new()),
        );
        assert_eq!(
            pre.preprocess("Firefox crash on the startup", false),
            vec!["on", "the", "startup"]
        );
    }

    #[test]
    fn test_serde_roundtrip_keeps_options() {
        let pre = Preprocessor::new(PreprocessOptions {
            cleanup_urls: false,
            word_tokenizer: true,
            lemmatize: true,
        });
        let json = serde_json::to_string(&pre).unwrap();
        let back: Preprocessor = serde_json::from_str(&json).unwrap();
        assert_eq!(back.options(), pre.options());
    }
}
