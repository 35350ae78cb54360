//! Ranking: BM25 + heuristics combined, plus the document-level relevance
//! decision.
//!
//! The relevance thresholds read the *raw* BM25 maximum; normalization to
//! `[0, 1]` happens afterwards so the combined score stays comparable across
//! documents regardless of absolute BM25 magnitudes.

use crate::bm25::{build_stats, score_sentence};
use crate::heuristics::{density_stats, heuristic_score};
use crate::segment::Sentence;
use pagesift_core::{RankerConfig, RelevanceMode};
use serde::Serialize;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Serialize)]
pub struct ScoredSentence {
    pub sentence: Sentence,
    /// Min-max normalized BM25, in `[0, 1]`.
    pub bm25_score: f64,
    /// Combined heuristic score, in `[0, 1]` when weights sum to 1.
    pub heuristic_score: f64,
    pub combined_score: f64,
}

#[derive(Debug, Clone)]
pub struct RankedDocument {
    /// Sorted by combined score desc, then global index asc.
    pub sentences: Vec<ScoredSentence>,
    pub has_relevant_results: bool,
    pub query_term_coverage: f64,
    /// Raw (un-normalized) BM25 maximum.
    pub max_bm25: f64,
    pub max_cooccurrence: usize,
}

impl RankedDocument {
    fn empty() -> Self {
        Self {
            sentences: Vec::new(),
            has_relevant_results: false,
            query_term_coverage: 0.0,
            max_bm25: 0.0,
            max_cooccurrence: 0,
        }
    }
}

pub fn rank(sentences: Vec<Sentence>, query_tokens: &[String], cfg: &RankerConfig) -> RankedDocument {
    if sentences.is_empty() || query_tokens.is_empty() {
        return RankedDocument::empty();
    }

    let stats = build_stats(&sentences);
    let total = sentences.len();

    let raw_bm25: Vec<f64> = sentences
        .iter()
        .map(|s| score_sentence(s, query_tokens, &stats, &cfg.bm25))
        .collect();
    let max_bm25 = raw_bm25.iter().copied().fold(0.0_f64, f64::max);

    let unique_terms: BTreeSet<&str> = query_tokens.iter().map(String::as_str).collect();
    let found_terms = unique_terms
        .iter()
        .filter(|t| stats.doc_frequency.contains_key(**t))
        .count();
    let query_term_coverage = found_terms as f64 / query_tokens.len() as f64;

    let max_cooccurrence = sentences
        .iter()
        .map(|s| {
            let set: BTreeSet<&str> = s.tokens.iter().map(String::as_str).collect();
            unique_terms.iter().filter(|t| set.contains(**t)).count()
        })
        .max()
        .unwrap_or(0);

    // A query term present in a sizable share of sentences marks the page as
    // topically about that term.
    let central_threshold = 3.max((0.10 * total as f64).ceil() as usize);
    let has_central_term = unique_terms
        .iter()
        .any(|t| stats.doc_frequency.get(*t).copied().unwrap_or(0) >= central_threshold);

    let has_relevant_results = match cfg.relevance_mode {
        RelevanceMode::Search => {
            (max_bm25 > 0.8 && query_term_coverage >= 0.25)
                || (max_cooccurrence >= 2 && max_bm25 > 0.5)
                || (has_central_term && max_bm25 > 0.4)
                || (query_term_coverage >= 0.5 && max_bm25 > 0.3)
        }
        RelevanceMode::Strict => {
            (max_cooccurrence >= 2 && max_bm25 > 1.0)
                || (has_central_term && max_bm25 > 0.8)
                || (query_term_coverage >= 0.8 && max_bm25 > 0.5)
        }
    };

    let min_raw = raw_bm25.iter().copied().fold(f64::INFINITY, f64::min);
    let range = max_bm25 - min_raw;
    let normalized: Vec<f64> = raw_bm25
        .iter()
        .map(|&x| if range > 0.0 { (x - min_raw) / range } else { 0.5 })
        .collect();

    let density = density_stats(&sentences, query_tokens);
    let heuristics: Vec<f64> = (0..sentences.len())
        .map(|i| {
            heuristic_score(
                i,
                &sentences,
                query_tokens,
                &stats,
                &density,
                &cfg.heuristic_weights,
            )
        })
        .collect();

    let mut scored: Vec<ScoredSentence> = sentences
        .into_iter()
        .enumerate()
        .map(|(i, sentence)| ScoredSentence {
            sentence,
            bm25_score: normalized[i],
            heuristic_score: heuristics[i],
            combined_score: cfg.bm25_weight * normalized[i] + cfg.heuristic_weight * heuristics[i],
        })
        .collect();

    scored.sort_by(|a, b| {
        b.combined_score
            .total_cmp(&a.combined_score)
            .then_with(|| a.sentence.global_index.cmp(&b.sentence.global_index))
    });

    RankedDocument {
        sentences: scored,
        has_relevant_results,
        query_term_coverage,
        max_bm25,
        max_cooccurrence,
    }
}
