//! Query-focused HTML excerpt extraction.
//!
//! Given a raw HTML page and a natural-language query, [`extract`] returns a
//! small, budget-bounded set of excerpts ranked by relevance, each with
//! enough surrounding context to stand alone and with heading ancestry
//! preserved.
//!
//! The pipeline is strictly forward and purely computational: preprocess →
//! segment → quality gate → citation filter → BM25 + heuristics → rank →
//! anchors → expand → dedupe → assemble. Every sort carries a deterministic
//! tie-break, so identical inputs produce byte-identical results. Content
//! defects (no main container, no sentences, low quality, not relevant) are
//! outcomes on the result, never errors.

pub mod anchors;
pub mod assemble;
pub mod bm25;
pub mod citations;
pub mod dedupe;
pub mod expand;
pub mod heuristics;
pub mod preprocess;
pub mod quality;
pub mod rank;
pub mod segment;
pub mod stopwords;
pub mod text;

pub use expand::Chunk;
pub use pagesift_core::{
    Config, Error, Excerpt, ExtractionResult, Outcome, RelevanceMetrics, Result,
};
pub use rank::ScoredSentence;
pub use segment::{Block, BlockType, Sentence};

use crate::text::{tokenize, TokenizeOptions};
use tracing::debug;

/// Sentences earlier than this position qualify for the empty-query fallback.
const FALLBACK_POSITION_CUTOFF: f64 = 0.4;

/// Run the full extraction pipeline over one `(html, query)` pair.
///
/// This function is total: malformed HTML degrades to an empty main
/// container, and content defects surface as [`Outcome`] variants with
/// structurally valid metrics. Only configuration is validated separately
/// (see [`Config::validate`]).
pub fn extract(html: &str, query: &str, config: &Config) -> ExtractionResult {
    let query_tokens = tokenize(query, &TokenizeOptions::default());

    let pre = preprocess::preprocess(html);
    debug!(
        stage = "preprocess",
        main = %pre.main_selector,
        found = pre.main.is_some(),
        "located main container"
    );
    if pre.main.is_none() {
        return result_with_title(
            ExtractionResult::empty(Outcome::NoMainContent, query, RelevanceMetrics::default()),
            pre.title,
        );
    }

    let blocks = segment::segment_blocks(&pre, &segment::SegmentOptions::default());
    let mut sentences = segment::sentences_from_blocks(&blocks);
    debug!(
        stage = "segment",
        blocks = blocks.len(),
        sentences = sentences.len()
    );
    if sentences.is_empty() {
        return result_with_title(
            ExtractionResult::empty(Outcome::NoSentences, query, RelevanceMetrics::default()),
            pre.title,
        );
    }

    if !config.skip_quality_check {
        let report = quality::assess(&sentences, &config.quality);
        if !report.passes {
            debug!(stage = "quality", reason = ?report.reason, "rejected");
            let relevance = RelevanceMetrics {
                sentence_count: report.total_sentences,
                quality_reject_reason: report.reason,
                ..Default::default()
            };
            return result_with_title(
                ExtractionResult::empty(Outcome::LowQuality, query, relevance),
                pre.title,
            );
        }
    }

    let before_filter = sentences.len();
    sentences.retain(|s| !citations::is_citation(&s.text));
    debug!(
        stage = "citations",
        removed = before_filter - sentences.len(),
        kept = sentences.len()
    );
    if sentences.is_empty() {
        return result_with_title(
            ExtractionResult::empty(Outcome::AllCitations, query, RelevanceMetrics::default()),
            pre.title,
        );
    }
    // Re-densify after filtering: downstream windows index sentences by
    // global_index, which must match array positions.
    for (i, s) in sentences.iter_mut().enumerate() {
        s.global_index = i;
    }

    if query_tokens.is_empty() {
        return result_with_title(extract_leading_content(&sentences, query, config), pre.title);
    }

    let ranked = rank::rank(sentences.clone(), &query_tokens, &config.ranker);
    let relevance = RelevanceMetrics {
        has_relevant_results: ranked.has_relevant_results,
        sentence_count: sentences.len(),
        query_term_coverage: ranked.query_term_coverage,
        max_bm25: ranked.max_bm25,
        max_cooccurrence: ranked.max_cooccurrence,
        quality_reject_reason: None,
    };
    debug!(
        stage = "rank",
        relevant = ranked.has_relevant_results,
        max_bm25 = ranked.max_bm25,
        coverage = ranked.query_term_coverage
    );
    if !ranked.has_relevant_results {
        return result_with_title(
            ExtractionResult::empty(Outcome::NotRelevant, query, relevance),
            pre.title,
        );
    }

    let anchors = anchors::select_anchors(&ranked.sentences, &config.anchors);
    let chunks: Vec<Chunk> = anchors
        .iter()
        .map(|a| expand::expand_anchor(&sentences, a, &config.expand))
        .collect();
    let deduped = dedupe::full_dedupe(chunks, &config.dedupe);
    let (excerpts, total_chars) = assemble::assemble(&deduped, &config.excerpts);
    debug!(
        stage = "assemble",
        anchors = anchors.len(),
        chunks = deduped.len(),
        excerpts = excerpts.len(),
        total_chars
    );

    ExtractionResult {
        outcome: Outcome::Ok,
        excerpts,
        total_chars,
        query: query.to_string(),
        title: pre.title,
        relevance,
    }
}

/// Empty-query fallback: lead with the document's opening content.
///
/// Anchors are the first `max_anchors` sentences with position < 0.4, scored
/// `1 − position`, then expanded and assembled under the normal budget.
fn extract_leading_content(
    sentences: &[Sentence],
    query: &str,
    config: &Config,
) -> ExtractionResult {
    let anchors: Vec<ScoredSentence> = sentences
        .iter()
        .filter(|s| s.position < FALLBACK_POSITION_CUTOFF)
        .take(config.anchors.max_anchors)
        .map(|s| ScoredSentence {
            sentence: s.clone(),
            bm25_score: 0.0,
            heuristic_score: 0.0,
            combined_score: 1.0 - s.position,
        })
        .collect();

    let chunks: Vec<Chunk> = anchors
        .iter()
        .map(|a| expand::expand_anchor(sentences, a, &config.expand))
        .collect();
    let deduped = dedupe::full_dedupe(chunks, &config.dedupe);
    let (excerpts, total_chars) = assemble::assemble(&deduped, &config.excerpts);

    let relevance = RelevanceMetrics {
        has_relevant_results: !excerpts.is_empty(),
        sentence_count: sentences.len(),
        ..Default::default()
    };
    ExtractionResult {
        outcome: Outcome::Ok,
        excerpts,
        total_chars,
        query: query.to_string(),
        title: None,
        relevance,
    }
}

fn result_with_title(mut result: ExtractionResult, title: Option<String>) -> ExtractionResult {
    result.title = title;
    result
}
