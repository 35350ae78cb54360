//! Citation / footnote sentence filter.
//!
//! Reference sections survive boilerplate removal because they are plain
//! text; they are near-useless as excerpts and drown out prose in BM25
//! statistics. Classification is a pure predicate on sentence text: strong
//! patterns fire at any length, weaker ones only on short sentences.

use regex::Regex;
use std::sync::LazyLock;

/// Sentences shorter than this are checked against the short patterns too.
const SHORT_SENTENCE_CHARS: usize = 50;

static STRONG_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // Wikipedia-style footnote marker: "^ a b c ..." then the reference.
        r#"(?i)^\^\s*(?:[a-z]\s*)*["'\w]"#,
        r"(?i)\bretrieved (?:\d{1,2} \w+ \d{4}|\w+ \d{1,2},? \d{4})",
        r"(?i)\baccessed (?:\d{1,2} \w+ \d{4}|\w+ \d{1,2},? \d{4})",
        r"(?i)\barchived from (?:the )?original",
        r"(?i)\bdoi:\s*10\.\d+",
        r"(?i)\bisbn[: ]?[\d-]{10,}",
        r"(?i)\bpmid[: ]?\d+",
        r"(?i)\barxiv[: ]?[\d.]+",
        r"(?i)\bissn[: ]?[\d-]+",
        r#"(?i)^\[\d+\]\s*["'\w]"#,
    ]
    .iter()
    .map(|p| Regex::new(p).expect("citation pattern"))
    .collect()
});

static SHORT_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // Standalone domain.
        r"(?i)\.(?:com|org|net|edu|gov|io|co\.uk)\.*\s*$",
        r"(?i)^(?:retrieved|accessed)\s",
        // Known publishers standing alone.
        r"(?i)^(?:github|arxiv|lwn|nist|wikipedia|ieee|acm|mdn|springer|elsevier|nature|reuters|bbc|wired)\.?$",
        // Standalone date.
        r"(?i)^(?:\d{1,2}\s+)?(?:january|february|march|april|may|june|july|august|september|october|november|december)(?:\s+\d{1,2})?,?\s+\d{4}\.?$",
        r"^\d{4}-\d{2}-\d{2}$",
        // Proper-noun phrase, optionally with a trailing year.
        r"^[A-Z][\w.&'-]*(?:\s+(?:of|the|and|for|&|[A-Z][\w.&'-]*)){1,6}(?:,?\s+\(?\d{4}\)?)?\.?$",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("citation short pattern"))
    .collect()
});

/// True when the sentence is a reference/footnote, not prose.
pub fn is_citation(text: &str) -> bool {
    let t = text.trim();
    if t.is_empty() {
        return false;
    }
    if STRONG_PATTERNS.iter().any(|re| re.is_match(t)) {
        return true;
    }
    if t.chars().count() < SHORT_SENTENCE_CHARS {
        return SHORT_PATTERNS.iter().any(|re| re.is_match(t));
    }
    false
}
