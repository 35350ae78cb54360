//! Text normalization and tokenization.
//!
//! The same tokenizer runs over queries, sentences, and heading paths so that
//! every comparison downstream happens in one token space:
//! camelCase split, lowercase, punctuation-as-separator, stop-word removal,
//! then English (Porter-family) stemming.

use crate::stopwords;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

static STEMMER: LazyLock<rust_stemmers::Stemmer> =
    LazyLock::new(|| rust_stemmers::Stemmer::create(rust_stemmers::Algorithm::English));

#[derive(Debug, Clone, Copy)]
pub struct TokenizeOptions {
    pub remove_stop_words: bool,
    pub apply_stemming: bool,
    /// Tokens shorter than this (in chars) are dropped.
    pub min_length: usize,
}

impl Default for TokenizeOptions {
    fn default() -> Self {
        Self {
            remove_stop_words: true,
            apply_stemming: true,
            min_length: 2,
        }
    }
}

/// Insert spaces at camelCase / PascalCase boundaries.
///
/// `createXMLParser` becomes `create XML Parser`: a boundary sits between a
/// lowercase and an uppercase char, and between an uppercase run and an
/// Upper-then-lower pair.
fn split_camel_case(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len() + 8);
    for (i, &c) in chars.iter().enumerate() {
        if i > 0 && c.is_uppercase() {
            let prev = chars[i - 1];
            let next_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            if prev.is_lowercase() || (prev.is_uppercase() && next_lower) {
                out.push(' ');
            }
        }
        out.push(c);
    }
    out
}

/// Normalize, split, filter, and stem `text` into scoring tokens.
pub fn tokenize(text: &str, opts: &TokenizeOptions) -> Vec<String> {
    let split = split_camel_case(text);

    // Lowercase + punctuation-as-separator in one pass; runs of separators
    // collapse via split_whitespace below.
    let mut scrubbed = String::with_capacity(split.len());
    for ch in split.chars() {
        if ch.is_alphanumeric() {
            for lc in ch.to_lowercase() {
                scrubbed.push(lc);
            }
        } else {
            scrubbed.push(' ');
        }
    }

    let mut out = Vec::new();
    for tok in scrubbed.split_whitespace() {
        if tok.chars().count() < opts.min_length {
            continue;
        }
        if opts.remove_stop_words && stopwords::is_stopword(tok) {
            continue;
        }
        if opts.apply_stemming {
            out.push(STEMMER.stem(tok).into_owned());
        } else {
            out.push(tok.to_string());
        }
    }
    out
}

/// Token -> occurrence count.
pub fn term_frequency_map(tokens: &[String]) -> BTreeMap<&str, usize> {
    let mut map = BTreeMap::new();
    for t in tokens {
        *map.entry(t.as_str()).or_insert(0) += 1;
    }
    map
}

/// `|set(a) ∩ set(b)| / |set(a) ∪ set(b)|`; 0 when the union is empty.
pub fn jaccard_similarity(a: &[String], b: &[String]) -> f64 {
    let sa: BTreeSet<&str> = a.iter().map(String::as_str).collect();
    let sb: BTreeSet<&str> = b.iter().map(String::as_str).collect();
    let union = sa.union(&sb).count();
    if union == 0 {
        return 0.0;
    }
    let inter = sa.intersection(&sb).count();
    inter as f64 / union as f64
}

/// `|set(a) ∩ set(b)| / |a|`; 0 when `a` is empty.
pub fn term_overlap_ratio(a: &[String], b: &[String]) -> f64 {
    if a.is_empty() {
        return 0.0;
    }
    let sa: BTreeSet<&str> = a.iter().map(String::as_str).collect();
    let sb: BTreeSet<&str> = b.iter().map(String::as_str).collect();
    let inter = sa.intersection(&sb).count();
    inter as f64 / a.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(text: &str) -> Vec<String> {
        tokenize(text, &TokenizeOptions::default())
    }

    #[test]
    fn splits_camel_case_before_normalizing() {
        assert_eq!(split_camel_case("createXMLParser"), "create XML Parser");
        assert_eq!(split_camel_case("useState"), "use State");
        assert_eq!(split_camel_case("plain"), "plain");
    }

    #[test]
    fn drops_stopwords_and_short_tokens() {
        let t = toks("The promise is a value");
        assert!(
            !t.iter().any(|x| x == "the" || x == "is"),
            "stopwords must be removed; got {t:?}"
        );
        assert!(t.iter().any(|x| x.starts_with("promis")), "got {t:?}");
    }

    #[test]
    fn punctuation_separates_tokens() {
        let t = toks("async/await, promises!");
        assert!(t.iter().any(|x| x.starts_with("async")), "got {t:?}");
        assert!(t.iter().any(|x| x.starts_with("await")), "got {t:?}");
    }

    #[test]
    fn stemming_conflates_inflections() {
        let a = toks("running runs");
        assert_eq!(a[0], a[1], "expected a shared stem; got {a:?}");
    }

    #[test]
    fn stemming_can_be_disabled() {
        let opts = TokenizeOptions {
            apply_stemming: false,
            ..Default::default()
        };
        let t = tokenize("running quickly", &opts);
        assert_eq!(t, vec!["running".to_string(), "quickly".to_string()]);
    }

    #[test]
    fn term_frequency_counts_occurrences() {
        let t = vec!["a1".to_string(), "b1".to_string(), "a1".to_string()];
        let m = term_frequency_map(&t);
        assert_eq!(m.get("a1"), Some(&2));
        assert_eq!(m.get("b1"), Some(&1));
    }

    #[test]
    fn jaccard_handles_empty_sides() {
        assert_eq!(jaccard_similarity(&[], &[]), 0.0);
        let a = vec!["x1".to_string()];
        assert_eq!(jaccard_similarity(&a, &[]), 0.0);
        assert!((jaccard_similarity(&a, &a) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn overlap_ratio_is_query_normalized() {
        let q = vec!["a1".to_string(), "b1".to_string()];
        let s = vec!["a1".to_string(), "c1".to_string(), "d1".to_string()];
        assert!((term_overlap_ratio(&q, &s) - 0.5).abs() < 1e-12);
        assert_eq!(term_overlap_ratio(&[], &s), 0.0);
    }
}
