//! Okapi BM25 over sentences-as-documents.
//!
//! Statistics are built once per extraction and owned by it; there is no
//! shared index. Ranking order is made deterministic by the caller
//! (score desc, then global index asc).

use crate::segment::Sentence;
use crate::text::term_frequency_map;
use pagesift_core::Bm25Config;
use std::collections::{BTreeMap, BTreeSet};

/// Corpus statistics over one document's sentences.
#[derive(Debug, Clone)]
pub struct DocumentStats {
    pub total_docs: usize,
    pub avg_doc_length: f64,
    pub doc_frequency: BTreeMap<String, usize>,
}

pub fn build_stats(sentences: &[Sentence]) -> DocumentStats {
    let total_docs = sentences.len();
    let mut doc_frequency: BTreeMap<String, usize> = BTreeMap::new();
    let mut token_total = 0usize;
    for s in sentences {
        token_total += s.tokens.len();
        let unique: BTreeSet<&str> = s.tokens.iter().map(String::as_str).collect();
        for t in unique {
            *doc_frequency.entry(t.to_string()).or_insert(0) += 1;
        }
    }
    let avg_doc_length = if total_docs == 0 {
        0.0
    } else {
        token_total as f64 / total_docs as f64
    };
    DocumentStats {
        total_docs,
        avg_doc_length,
        doc_frequency,
    }
}

impl DocumentStats {
    /// `ln((N − df + 0.5) / (df + 0.5) + 1)`.
    ///
    /// Unseen terms (df = 0) reduce to `ln((N + 0.5) / 0.5 + 1)`, which is
    /// strictly positive, so rare query terms always carry weight.
    pub fn idf(&self, term: &str) -> f64 {
        let n = self.total_docs as f64;
        let df = self.doc_frequency.get(term).copied().unwrap_or(0) as f64;
        ((n - df + 0.5) / (df + 0.5) + 1.0).ln()
    }
}

/// BM25 score of one sentence against the query token sequence.
///
/// Duplicate query terms contribute independently: the score scales with
/// query-term multiplicity but not order.
pub fn score_sentence(sentence: &Sentence, query_tokens: &[String], stats: &DocumentStats, cfg: &Bm25Config) -> f64 {
    if query_tokens.is_empty() || sentence.tokens.is_empty() || stats.avg_doc_length == 0.0 {
        return 0.0;
    }
    let tf_map = term_frequency_map(&sentence.tokens);
    let doc_len = sentence.tokens.len() as f64;
    let norm = 1.0 - cfg.b + cfg.b * doc_len / stats.avg_doc_length;

    let mut score = 0.0;
    for term in query_tokens {
        let tf = tf_map.get(term.as_str()).copied().unwrap_or(0) as f64;
        if tf == 0.0 {
            continue;
        }
        let idf = stats.idf(term);
        score += idf * tf * (cfg.k1 + 1.0) / (tf + cfg.k1 * norm);
    }
    score
}
