//! Text cleanup functions applied before tokenization.
//!
//! Each [`TextCleanup`] rewrites one family of noisy patterns found in bug
//! reports (quoted replies, hex addresses, library names, file paths, crash
//! links, URLs) into a stable placeholder, or canonicalizes synonym phrases.
//! The chain is ordered: crash-stats links must be rewritten before the
//! generic URL rule sees them.

use once_cell::sync::Lazy;
use regex::Regex;

/// A pure text-to-text rewrite step.
pub trait TextCleanup: Send + Sync {
    /// Short identifier used in logs and `Debug` output.
    fn name(&self) -> &str;

    /// Rewrite `text`, returning the cleaned copy.
    fn clean(&self, text: &str) -> String;
}

impl<F> TextCleanup for F
where
    F: Fn(&str) -> String + Send + Sync,
{
    fn name(&self) -> &str {
        "custom"
    }

    fn clean(&self, text: &str) -> String {
        self(text)
    }
}

/// Replace every match of a regex with a fixed placeholder.
pub struct RegexCleanup {
    name: &'static str,
    pattern: &'static Lazy<Regex>,
    replacement: &'static str,
}

impl TextCleanup for RegexCleanup {
    fn name(&self) -> &str {
        self.name
    }

    fn clean(&self, text: &str) -> String {
        self.pattern.replace_all(text, self.replacement).into_owned()
    }
}

static RESPONSES: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^>.*$").expect("responses regex"));
static BUG_REFERENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bbug\s*#?\s*\d+\b").expect("bug reference regex"));
static HEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b0[xX][0-9a-fA-F]+\b").expect("hex regex"));
static DLL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b[\w-]+\.(?:dll|so|dylib)(?:\.\d+)*\b").expect("dll regex")
});
static FILE_REFERENCES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b[\w/\\.-]*\w\.(?:jsm|js|py|cpp|cc|c|h|hpp|rs|java|html|xhtml|css|xul|json|idl|webidl|mm|sh|txt|log|xml|ini)\b",
    )
    .expect("file reference regex")
});
static CRASH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)https?://crash-stats\.mozilla\.(?:com|org)/report/index/[0-9a-f-]+|\[@\s*[^\]]*\]",
    )
    .expect("crash regex")
});
static URLS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:https?://|www\.)\S+").expect("url regex"));

/// Drop quoted reply lines (`> ...`).
pub fn responses() -> RegexCleanup {
    RegexCleanup {
        name: "responses",
        pattern: &RESPONSES,
        replacement: " ",
    }
}

/// `bug 123456` -> `__BUG_REFERENCE__`.
pub fn bug_references() -> RegexCleanup {
    RegexCleanup {
        name: "bug_references",
        pattern: &BUG_REFERENCES,
        replacement: "__BUG_REFERENCE__",
    }
}

/// `0xdeadbeef` -> `__HEX_NUMBER__`.
pub fn hex() -> RegexCleanup {
    RegexCleanup {
        name: "hex",
        pattern: &HEX,
        replacement: "__HEX_NUMBER__",
    }
}

/// `xul.dll`, `libxul.so.1` -> `__DLL_NAME__`.
pub fn dll() -> RegexCleanup {
    RegexCleanup {
        name: "dll",
        pattern: &DLL,
        replacement: "__DLL_NAME__",
    }
}

/// Source and log file paths -> `__FILE_REFERENCE__`.
pub fn file_references() -> RegexCleanup {
    RegexCleanup {
        name: "file_references",
        pattern: &FILE_REFERENCES,
        replacement: "__FILE_REFERENCE__",
    }
}

/// Crash-stats report links and `[@ signature]` blocks -> `__CRASH_STATS_LINK__`.
pub fn crash() -> RegexCleanup {
    RegexCleanup {
        name: "crash",
        pattern: &CRASH,
        replacement: "__CRASH_STATS_LINK__",
    }
}

/// Any remaining URL -> `__URL__`.
pub fn urls() -> RegexCleanup {
    RegexCleanup {
        name: "urls",
        pattern: &URLS,
        replacement: "__URL__",
    }
}

const SYNONYMS: &[(&str, &[&str])] = &[
    ("safemode", &["safe mode", "safemode"]),
    ("str", &["steps to reproduce", "repro steps", "str"]),
    ("uaf", &["use after free", "use-after-free", "uaf"]),
    ("asan", &["address sanitizer", "addresssanitizer", "asan"]),
    (
        "permafailure",
        &[
            "permafailure",
            "permafailing",
            "permafail",
            "perma failure",
            "perma failing",
            "perma fail",
            "perma-failure",
            "perma-failing",
            "perma-fail",
        ],
    ),
    ("spec", &["specification", "spec"]),
];

/// Canonicalize known synonym phrases (`use-after-free` -> `uaf`).
pub struct SynonymCleanup {
    rules: Vec<(Regex, &'static str)>,
}

impl SynonymCleanup {
    fn new() -> Self {
        let rules = SYNONYMS
            .iter()
            .map(|(canonical, variants)| {
                let mut variants: Vec<&str> = variants.to_vec();
                // Longest first so "perma-failure" wins over "perma-fail".
                variants.sort_by_key(|v| std::cmp::Reverse(v.len()));
                let alternation = variants
                    .iter()
                    .map(|v| regex::escape(v))
                    .collect::<Vec<_>>()
                    .join("|");
                let pattern = format!(r"(?i)\b(?:{})\b", alternation);
                (
                    Regex::new(&pattern).expect("synonym regex"),
                    *canonical,
                )
            })
            .collect();
        Self { rules }
    }
}

impl TextCleanup for SynonymCleanup {
    fn name(&self) -> &str {
        "synonyms"
    }

    fn clean(&self, text: &str) -> String {
        let mut out = text.to_string();
        for (re, canonical) in &self.rules {
            out = re.replace_all(&out, *canonical).into_owned();
        }
        out
    }
}

pub fn synonyms() -> SynonymCleanup {
    SynonymCleanup::new()
}

/// The default chain used by every similarity strategy.
///
/// URL cleanup is last and optional.
pub fn default_chain(cleanup_urls: bool) -> Vec<Box<dyn TextCleanup>> {
    let mut chain: Vec<Box<dyn TextCleanup>> = vec![
        Box::new(responses()),
        Box::new(bug_references()),
        Box::new(hex()),
        Box::new(dll()),
        Box::new(file_references()),
        Box::new(synonyms()),
        Box::new(crash()),
    ];
    if cleanup_urls {
        chain.push(Box::new(urls()));
    }
    chain
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_responses_removes_quoted_lines() {
        let out = responses().clean("> previous reply\nnew text");
        assert!(!out.contains("previous"));
        assert!(out.contains("new text"));
    }

    #[test]
    fn test_bug_references() {
        let out = bug_references().clean("see Bug 1234567 and bug #42");
        assert_eq!(out, "see __BUG_REFERENCE__ and __BUG_REFERENCE__");
    }

    #[test]
    fn test_hex() {
        assert_eq!(hex().clean("at 0x7ffe1234 crash"), "at __HEX_NUMBER__ crash");
    }

    #[test]
    fn test_dll() {
        let out = dll().clean("loaded xul.dll and libxul.so.1");
        assert_eq!(out, "loaded __DLL_NAME__ and __DLL_NAME__");
    }

    #[test]
    fn test_file_references() {
        let out = file_references().clean("error in dom/base/nsDocument.cpp line 3");
        assert_eq!(out, "error in __FILE_REFERENCE__ line 3");
    }

    #[test]
    fn test_synonyms_longest_variant() {
        let s = synonyms();
        assert_eq!(s.clean("a Use-After-Free bug"), "a uaf bug");
        assert_eq!(s.clean("perma-failure seen"), "permafailure seen");
        assert_eq!(s.clean("Steps to reproduce:"), "str:");
    }

    #[test]
    fn test_crash_before_urls() {
        let text = "see https://crash-stats.mozilla.com/report/index/abc-123 and https://example.com/x";
        let mut out = crash().clean(text);
        out = urls().clean(&out);
        assert_eq!(out, "see __CRASH_STATS_LINK__ and __URL__");
    }

    #[test]
    fn test_crash_signature() {
        let out = crash().clean("[@ mozilla::dom::Foo::Bar] again");
        assert_eq!(out, "__CRASH_STATS_LINK__ again");
    }

    #[test]
    fn test_default_chain_url_toggle() {
        assert_eq!(default_chain(true).len(), 8);
        let names: Vec<String> = default_chain(false)
            .iter()
            .map(|c| c.name().to_string())
            .collect();
        assert!(!names.contains(&"urls".to_string()));
        assert_eq!(names.last().map(String::as_str), Some("crash"));
    }

    #[test]
    fn test_closure_cleanup() {
        let upper = |t: &str| t.to_uppercase();
        assert_eq!(upper.name(), "custom");
        assert_eq!(TextCleanup::clean(&upper, "abc"), "ABC");
    }
}
