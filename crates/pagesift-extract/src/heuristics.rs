//! Nine structural heuristics, combined by weighted sum.
//!
//! Each metric maps a sentence to `[0, 1]`; weights conventionally sum to 1.0
//! so the combination stays in `[0, 1]`. BM25 knows term statistics; these
//! metrics know document shape: where the sentence sits, what heads it, what
//! surrounds it, and whether its section is meta rather than substance.

use crate::bm25::DocumentStats;
use crate::segment::{BlockType, Sentence};
use crate::text::{term_overlap_ratio, tokenize, TokenizeOptions};
use pagesift_core::HeuristicWeights;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

/// Headings that introduce structural regions rather than substance.
/// Anchored full match, case-insensitive.
static META_HEADING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:introduction|overview|about(?: this)? \w+|about|prerequisites|requirements|summary|conclusions?|tl;?dr|(?:key )?takeaways|next steps|further reading|references|see also|related(?: (?:articles|posts|links))?|table of contents|disclaimer|privacy(?: policy)?|comments?|share|subscribe|newsletter|author(?: bio)?|specifications|browser compatibility|acknowledge?ments|credits|license|changelog|feedback)$",
    )
    .expect("meta heading pattern")
});

/// Phrases that mark framing/outro prose inside otherwise-content sections.
static META_PHRASES: &[&str] = &[
    "in this article",
    "in this post",
    "in this tutorial",
    "in this guide",
    "we will cover",
    "we'll cover",
    "you will learn",
    "you'll learn",
    "let's dive",
    "if you enjoyed this",
    "buy me a coffee",
    "subscribe to our",
    "sign up for our",
    "follow me on",
    "thanks for reading",
    "leave a comment",
];

/// Median and median-absolute-deviation of per-sentence query-term density.
#[derive(Debug, Clone, Copy)]
pub struct DensityStats {
    pub median: f64,
    pub mad: f64,
}

fn query_density(sentence: &Sentence, query_set: &BTreeSet<&str>) -> f64 {
    if sentence.tokens.is_empty() || query_set.is_empty() {
        return 0.0;
    }
    let matches = sentence
        .tokens
        .iter()
        .filter(|t| query_set.contains(t.as_str()))
        .count();
    matches as f64 / sentence.tokens.len() as f64
}

/// Computed once per document; the MAD floor keeps the z-score finite on
/// uniform documents.
pub fn density_stats(sentences: &[Sentence], query_tokens: &[String]) -> DensityStats {
    let query_set: BTreeSet<&str> = query_tokens.iter().map(String::as_str).collect();
    let mut densities: Vec<f64> = sentences
        .iter()
        .map(|s| query_density(s, &query_set))
        .collect();
    densities.sort_by(|a, b| a.total_cmp(b));
    let median = median_of_sorted(&densities);
    let mut deviations: Vec<f64> = densities.iter().map(|d| (d - median).abs()).collect();
    deviations.sort_by(|a, b| a.total_cmp(b));
    let mad = median_of_sorted(&deviations).max(0.001);
    DensityStats { median, mad }
}

fn median_of_sorted(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return 0.0;
    }
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    }
}

fn logistic(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Piecewise-linear early-content preference, continuous at the knees:
/// 1.0 → 0.7 over [0, 0.3], 0.7 → 0.5 over (0.3, 0.7], 0.5 → 0.3 after.
fn position_score(position: f64) -> f64 {
    let p = position.clamp(0.0, 1.0);
    if p <= 0.3 {
        1.0 - p
    } else if p <= 0.7 {
        0.7 - (p - 0.3) * 0.5
    } else {
        0.5 - (p - 0.7) * (0.2 / 0.3)
    }
}

fn heading_proximity_score(idx: usize, sentences: &[Sentence], query_tokens: &[String]) -> f64 {
    let mut found: Option<(usize, &Sentence)> = None;
    for j in (0..idx).rev() {
        if sentences[j].block_type.is_heading() {
            found = Some((j, &sentences[j]));
            break;
        }
    }
    let Some((j, heading)) = found else {
        return 0.3;
    };
    let gap = (idx - j) as f64;
    let dist_score = 1.0 / (1.0 + gap / 5.0);
    let overlap = term_overlap_ratio(query_tokens, &heading.tokens);
    if overlap > 0.0 {
        (0.6 * overlap + 0.4 * dist_score).min(1.0)
    } else {
        0.5 * dist_score
    }
}

fn density_score(sentence: &Sentence, query_tokens: &[String], query_set: &BTreeSet<&str>) -> f64 {
    if sentence.tokens.is_empty() || query_tokens.is_empty() {
        return 0.0;
    }
    let raw = query_density(sentence, query_set);
    let sentence_set: BTreeSet<&str> = sentence.tokens.iter().map(String::as_str).collect();
    let unique_matches = query_set.iter().filter(|t| sentence_set.contains(**t)).count();
    let cov = unique_matches as f64 / query_tokens.len() as f64;
    0.4 * raw + 0.6 * cov
}

fn structure_score(idx: usize, sentences: &[Sentence], query_tokens: &[String]) -> f64 {
    let sentence = &sentences[idx];
    let mut score: f64 = match sentence.block_type {
        BlockType::P => 0.8,
        BlockType::Li => 0.7,
        BlockType::Pre => 0.65,
        _ => 0.4,
    };

    // Code-adjacent prose tends to be the explanation of the code.
    let lo = idx.saturating_sub(2);
    let hi = (idx + 2).min(sentences.len().saturating_sub(1));
    let code_adjacent = (lo..=hi)
        .filter(|&j| j != idx)
        .any(|j| sentences[j].block_type == BlockType::Pre);
    if code_adjacent {
        score += 0.1;
    }

    let block_peer_matches = sentences.iter().any(|other| {
        other.block_index == sentence.block_index
            && other.global_index != sentence.global_index
            && term_overlap_ratio(query_tokens, &other.tokens) > 0.3
    });
    if block_peer_matches {
        score += 0.15;
    }

    let heading_mentions_query = sentence.heading_path.iter().any(|h| {
        let hl = h.to_lowercase();
        query_tokens.iter().any(|t| hl.contains(t.as_str()))
    });
    if heading_mentions_query {
        score += 0.1;
    }

    score.min(1.0)
}

fn proximity_score(sentence: &Sentence, query_tokens: &[String], query_set: &BTreeSet<&str>) -> f64 {
    if sentence.tokens.is_empty() || query_tokens.is_empty() {
        return 0.0;
    }

    // Positions of query-term hits, with a dense id per distinct term.
    let mut term_ids: BTreeMap<&str, usize> = BTreeMap::new();
    let mut hits: Vec<(usize, usize)> = Vec::new();
    for (pos, tok) in sentence.tokens.iter().enumerate() {
        if !query_set.contains(tok.as_str()) {
            continue;
        }
        let next_id = term_ids.len();
        let id = *term_ids.entry(tok.as_str()).or_insert(next_id);
        hits.push((pos, id));
    }
    let matched = term_ids.len();
    if matched == 0 {
        return 0.0;
    }
    let coverage = matched as f64 / query_tokens.len() as f64;
    if matched == 1 {
        return coverage * 0.5;
    }

    // Smallest window over hit positions covering every matched term.
    let mut counts = vec![0usize; matched];
    let mut covered = 0usize;
    let mut left = 0usize;
    let mut best_span = usize::MAX;
    for right in 0..hits.len() {
        let (_, id) = hits[right];
        counts[id] += 1;
        if counts[id] == 1 {
            covered += 1;
        }
        while covered == matched {
            let span = hits[right].0 - hits[left].0 + 1;
            best_span = best_span.min(span);
            let (_, left_id) = hits[left];
            counts[left_id] -= 1;
            if counts[left_id] == 0 {
                covered -= 1;
            }
            left += 1;
        }
    }

    let span = best_span.max(1) as f64;
    let span_tightness = 1.0 - (span / sentence.tokens.len() as f64).min(1.0);
    let density_in_span = matched as f64 / span;
    0.4 * coverage + 0.35 * span_tightness + 0.25 * density_in_span.min(1.0)
}

fn idf_weighted_overlap(
    query_tokens: &[String],
    token_set: &BTreeSet<&str>,
    stats: &DocumentStats,
) -> f64 {
    let mut num = 0.0;
    let mut den = 0.0;
    for t in query_tokens {
        let idf = stats.idf(t);
        den += idf;
        if token_set.contains(t.as_str()) {
            num += idf;
        }
    }
    if den == 0.0 {
        0.0
    } else {
        num / den
    }
}

fn heading_path_score(
    sentence: &Sentence,
    query_tokens: &[String],
    stats: &DocumentStats,
) -> f64 {
    if sentence.heading_path.is_empty() || query_tokens.is_empty() {
        return 0.3;
    }
    let path_text = sentence.heading_path.join(" ");
    let path_tokens = tokenize(&path_text, &TokenizeOptions::default());
    let path_set: BTreeSet<&str> = path_tokens.iter().map(String::as_str).collect();
    let overlap = idf_weighted_overlap(query_tokens, &path_set, stats);
    0.3 + 0.7 * overlap
}

fn coverage_score(sentence: &Sentence, query_tokens: &[String], stats: &DocumentStats) -> f64 {
    if sentence.tokens.is_empty() || query_tokens.is_empty() {
        return 0.0;
    }
    let sentence_set: BTreeSet<&str> = sentence.tokens.iter().map(String::as_str).collect();
    let idf_cov = idf_weighted_overlap(query_tokens, &sentence_set, stats);
    let unique: BTreeSet<&str> = query_tokens.iter().map(String::as_str).collect();
    let found = unique.iter().filter(|t| sentence_set.contains(**t)).count();
    let simple_cov = found as f64 / query_tokens.len() as f64;
    0.7 * idf_cov + 0.3 * simple_cov
}

fn outlier_score(
    sentence: &Sentence,
    query_tokens: &[String],
    query_set: &BTreeSet<&str>,
    stats: &DensityStats,
) -> f64 {
    if sentence.tokens.is_empty() || query_tokens.is_empty() {
        return 0.3;
    }
    let density = query_density(sentence, query_set);
    let z = (density - stats.median) / stats.mad;
    if z <= 0.0 {
        return 0.3;
    }
    0.3 + 0.7 * logistic(z - 2.0)
}

fn meta_section_score(sentence: &Sentence) -> f64 {
    if sentence
        .heading_path
        .iter()
        .any(|h| META_HEADING_RE.is_match(h.trim()))
    {
        return 0.2;
    }
    let lower = sentence.text.to_lowercase();
    if META_PHRASES.iter().any(|p| lower.contains(p)) {
        return 0.3;
    }
    1.0
}

/// Weighted sum of the nine metrics for `sentences[idx]`.
pub fn heuristic_score(
    idx: usize,
    sentences: &[Sentence],
    query_tokens: &[String],
    stats: &DocumentStats,
    density: &DensityStats,
    weights: &HeuristicWeights,
) -> f64 {
    let sentence = &sentences[idx];
    let query_set: BTreeSet<&str> = query_tokens.iter().map(String::as_str).collect();

    weights.position * position_score(sentence.position)
        + weights.heading_proximity * heading_proximity_score(idx, sentences, query_tokens)
        + weights.density * density_score(sentence, query_tokens, &query_set)
        + weights.structure * structure_score(idx, sentences, query_tokens)
        + weights.proximity * proximity_score(sentence, query_tokens, &query_set)
        + weights.heading_path * heading_path_score(sentence, query_tokens, stats)
        + weights.coverage * coverage_score(sentence, query_tokens, stats)
        + weights.outlier * outlier_score(sentence, query_tokens, &query_set, density)
        + weights.meta_section * meta_section_score(sentence)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bm25::build_stats;
    use crate::text::tokenize;

    fn sentence(text: &str, idx: usize, block_type: BlockType, path: &[&str]) -> Sentence {
        Sentence {
            tokens: tokenize(text, &TokenizeOptions::default()),
            text: text.to_string(),
            heading_path: path.iter().map(|s| s.to_string()).collect(),
            block_type,
            block_index: idx,
            sentence_index: 0,
            global_index: idx,
            position: 0.0,
        }
    }

    fn q(text: &str) -> Vec<String> {
        tokenize(text, &TokenizeOptions::default())
    }

    #[test]
    fn position_is_piecewise_and_continuous() {
        assert!((position_score(0.0) - 1.0).abs() < 1e-12);
        assert!((position_score(0.3) - 0.7).abs() < 1e-12);
        assert!((position_score(0.7) - 0.5).abs() < 1e-12);
        assert!((position_score(1.0) - 0.3).abs() < 1e-12);
        // Monotone in between.
        assert!(position_score(0.2) > position_score(0.4));
        assert!(position_score(0.5) > position_score(0.9));
    }

    #[test]
    fn heading_proximity_defaults_without_heading() {
        let s = vec![sentence("plain text sentence", 0, BlockType::P, &[])];
        assert_eq!(heading_proximity_score(0, &s, &q("anything")), 0.3);
    }

    #[test]
    fn heading_proximity_rewards_matching_nearby_heading() {
        let s = vec![
            sentence("Promises", 0, BlockType::H2, &[]),
            sentence("They simplify async code.", 1, BlockType::P, &["Promises"]),
        ];
        let with_match = heading_proximity_score(1, &s, &q("promises"));
        let without = heading_proximity_score(1, &s, &q("carburetor"));
        assert!(with_match > without, "{with_match} vs {without}");
        // gap 1 => dist = 1/(1.2); non-matching: 0.5 * dist.
        assert!((without - 0.5 / 1.2).abs() < 1e-9);
    }

    #[test]
    fn density_blends_raw_and_coverage() {
        let s = sentence("widget widget frame", 0, BlockType::P, &[]);
        let query = q("widget panel");
        let qs: BTreeSet<&str> = query.iter().map(String::as_str).collect();
        // raw = 2/3, cov = 1/2.
        let got = density_score(&s, &query, &qs);
        assert!((got - (0.4 * (2.0 / 3.0) + 0.6 * 0.5)).abs() < 1e-9);
    }

    #[test]
    fn structure_prefers_paragraphs_and_code_adjacency() {
        let s = vec![
            sentence("let x = 1;", 0, BlockType::Pre, &[]),
            sentence("The snippet assigns a value.", 1, BlockType::P, &[]),
            sentence("Middle paragraph between them.", 2, BlockType::P, &[]),
            sentence("Unrelated paragraph far away from code.", 3, BlockType::P, &[]),
        ];
        let near = structure_score(1, &s, &q("assigns"));
        let far = structure_score(3, &s, &q("assigns"));
        assert!(near > far, "{near} vs {far}");
    }

    #[test]
    fn structure_heading_path_mention_bonus() {
        let s = vec![
            sentence("Call it inside a component.", 0, BlockType::P, &["Hooks"]),
            sentence("Call it inside a component.", 1, BlockType::P, &["Misc"]),
        ];
        let with_hit = structure_score(0, &s, &q("hooks"));
        let without = structure_score(1, &s, &q("hooks"));
        assert!((with_hit - without - 0.1).abs() < 1e-9);
    }

    #[test]
    fn proximity_rewards_tight_term_windows() {
        let tight = sentence("async promises simplify things in general overall", 0, BlockType::P, &[]);
        let loose = sentence(
            "async code exists and later somewhere promises appear eventually maybe",
            1,
            BlockType::P,
            &[],
        );
        let query = q("async promises");
        let qs: BTreeSet<&str> = query.iter().map(String::as_str).collect();
        let t = proximity_score(&tight, &query, &qs);
        let l = proximity_score(&loose, &query, &qs);
        assert!(t > l, "{t} vs {l}");
    }

    #[test]
    fn proximity_single_match_is_half_coverage() {
        let s = sentence("only promises here today", 0, BlockType::P, &[]);
        let query = q("promises carburetor");
        let qs: BTreeSet<&str> = query.iter().map(String::as_str).collect();
        let got = proximity_score(&s, &query, &qs);
        assert!((got - 0.5 * 0.5).abs() < 1e-9);
    }

    #[test]
    fn heading_path_score_floors_at_point_three() {
        let s = sentence("text", 0, BlockType::P, &[]);
        let stats = build_stats(&[s.clone()]);
        assert_eq!(heading_path_score(&s, &q("query terms"), &stats), 0.3);
    }

    #[test]
    fn meta_section_penalizes_intro_headings_and_phrases() {
        let in_intro = sentence("Some intro text.", 0, BlockType::P, &["Introduction"]);
        assert_eq!(meta_section_score(&in_intro), 0.2);
        let framing = sentence("In this article we will cover hooks.", 1, BlockType::P, &["Hooks"]);
        assert_eq!(meta_section_score(&framing), 0.3);
        let content = sentence("Call useState inside a component.", 2, BlockType::P, &["Usage"]);
        assert_eq!(meta_section_score(&content), 1.0);
    }

    #[test]
    fn outlier_rewards_clear_density_spikes() {
        let mut sentences: Vec<Sentence> = (0..20)
            .map(|i| sentence("ordinary filler prose sentence here", i, BlockType::P, &[]))
            .collect();
        sentences.push(sentence("widget widget widget widget", 20, BlockType::P, &[]));
        let query = q("widget");
        let stats = density_stats(&sentences, &query);
        let qs: BTreeSet<&str> = query.iter().map(String::as_str).collect();
        let spike = outlier_score(&sentences[20], &query, &qs, &stats);
        let flat = outlier_score(&sentences[0], &query, &qs, &stats);
        assert_eq!(flat, 0.3);
        assert!(spike > 0.9, "strong spike should saturate; got {spike}");
    }

    #[test]
    fn mad_is_floored() {
        let sentences = vec![sentence("same text", 0, BlockType::P, &[])];
        let stats = density_stats(&sentences, &q("same"));
        assert!(stats.mad >= 0.001);
    }

    #[test]
    fn combined_score_stays_in_unit_interval() {
        let sentences = vec![
            sentence("Usage", 0, BlockType::H2, &[]),
            sentence(
                "Call useState inside a function component to add state.",
                1,
                BlockType::P,
                &["Usage"],
            ),
        ];
        let query = q("useState state");
        let stats = build_stats(&sentences);
        let density = density_stats(&sentences, &query);
        let w = HeuristicWeights::default();
        for i in 0..sentences.len() {
            let s = heuristic_score(i, &sentences, &query, &stats, &density, &w);
            assert!((0.0..=1.0).contains(&s), "score out of range: {s}");
        }
    }
}
