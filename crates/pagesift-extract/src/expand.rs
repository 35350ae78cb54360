//! Context expansion: one chunk per anchor.
//!
//! Section mode takes the whole enclosing section when it fits the character
//! budget, otherwise grows outward from the anchor, alternating sides, until
//! the budget or the section bounds stop it. A trailing code block may bleed
//! past the window: an example right after a matched paragraph is usually the
//! payoff the reader wants.

use crate::rank::ScoredSentence;
use crate::segment::{BlockType, Sentence};
use pagesift_core::ExpandConfig;
use serde::Serialize;

/// Expanded context window around an anchor.
#[derive(Debug, Clone, Serialize)]
pub struct Chunk {
    /// Ordered by global index, no duplicates.
    pub sentences: Vec<Sentence>,
    /// Global index of the seed sentence.
    pub anchor_index: usize,
    /// Inherited from the anchor's combined score.
    pub score: f64,
    pub text: String,
    /// Sum of raw sentence text lengths (not the formatted text).
    pub char_count: usize,
    pub heading_path: Vec<String>,
}

/// Budget cost of a sentence inside a window: raw length plus a separator.
fn cost(sentence: &Sentence) -> usize {
    sentence.text.chars().count() + 1
}

pub fn expand_anchor(
    sentences: &[Sentence],
    anchor: &ScoredSentence,
    cfg: &ExpandConfig,
) -> Chunk {
    debug_assert!(!sentences.is_empty());
    let anchor_idx = anchor.sentence.global_index.min(sentences.len() - 1);

    let (lo, mut hi) = if cfg.expand_to_section {
        section_window(sentences, anchor_idx, cfg.max_chunk_chars)
    } else {
        count_window(sentences, anchor_idx, cfg)
    };

    let mut total: usize = sentences[lo..=hi].iter().map(cost).sum();

    if cfg.include_code_blocks {
        // Bleed past the window: stop at any heading; a code block may exceed
        // the budget up to 1.5x and always terminates the walk.
        let mut j = hi + 1;
        while j < sentences.len() {
            let s = &sentences[j];
            if s.block_type.is_heading() {
                break;
            }
            if s.block_type == BlockType::Pre {
                if (total + cost(s)) * 2 <= cfg.max_chunk_chars * 3 {
                    total += cost(s);
                    hi = j;
                }
                break;
            }
            if total + cost(s) <= cfg.max_chunk_chars {
                total += cost(s);
                hi = j;
                j += 1;
            } else {
                break;
            }
        }
    }

    let window: Vec<Sentence> = sentences[lo..=hi].to_vec();
    let char_count = window.iter().map(|s| s.text.chars().count()).sum();
    let text = build_chunk_text(&window);
    Chunk {
        sentences: window,
        anchor_index: anchor.sentence.global_index,
        score: anchor.combined_score,
        text,
        char_count,
        heading_path: anchor.sentence.heading_path.clone(),
    }
}

/// Section bounds for the anchor, shrunk to the budget when oversized.
fn section_window(sentences: &[Sentence], anchor_idx: usize, budget: usize) -> (usize, usize) {
    // Section heading: nearest heading at or before the anchor. Without one,
    // the "section" is the preamble: document start up to the first heading.
    let mut start = 0usize;
    let mut level = 7usize;
    for j in (0..=anchor_idx).rev() {
        if let Some(l) = sentences[j].block_type.heading_level() {
            start = j;
            level = l;
            break;
        }
    }
    let mut end = sentences.len() - 1;
    for (offset, s) in sentences[anchor_idx + 1..].iter().enumerate() {
        if let Some(l) = s.block_type.heading_level() {
            if l <= level {
                end = anchor_idx + offset;
                break;
            }
        }
    }

    let section_total: usize = sentences[start..=end].iter().map(cost).sum();
    if section_total <= budget {
        return (start, end);
    }

    // Center on the anchor and expand outward alternating before/after until
    // the budget is reached or both sides hit the section bounds.
    let mut lo = anchor_idx;
    let mut hi = anchor_idx;
    let mut total = cost(&sentences[anchor_idx]);
    let mut can_before = lo > start;
    let mut can_after = hi < end;
    while can_before || can_after {
        if can_before {
            let c = cost(&sentences[lo - 1]);
            if total + c <= budget {
                lo -= 1;
                total += c;
                can_before = lo > start;
            } else {
                can_before = false;
            }
        }
        if can_after {
            let c = cost(&sentences[hi + 1]);
            if total + c <= budget {
                hi += 1;
                total += c;
                can_after = hi < end;
            } else {
                can_after = false;
            }
        }
    }
    (lo, hi)
}

/// Fixed sentence-count window, shrunk from the far ends to fit the budget.
fn count_window(sentences: &[Sentence], anchor_idx: usize, cfg: &ExpandConfig) -> (usize, usize) {
    let mut lo = anchor_idx.saturating_sub(cfg.context_before);
    let mut hi = (anchor_idx + cfg.context_after).min(sentences.len() - 1);
    let mut total: usize = sentences[lo..=hi].iter().map(cost).sum();
    while total > cfg.max_chunk_chars && (lo < anchor_idx || hi > anchor_idx) {
        let before_span = anchor_idx - lo;
        let after_span = hi - anchor_idx;
        if before_span > after_span {
            total -= cost(&sentences[lo]);
            lo += 1;
        } else {
            total -= cost(&sentences[hi]);
            hi -= 1;
        }
    }
    (lo, hi)
}

/// Render a sentence run as display text.
///
/// Headings get paragraph breaks, code blocks are fenced, list items become
/// dashes, and paragraph sentences flow with single spaces.
pub fn build_chunk_text(sentences: &[Sentence]) -> String {
    let mut out = String::new();
    let mut prev: Option<BlockType> = None;
    for s in sentences {
        match s.block_type {
            t if t.is_heading() => {
                if !out.is_empty() {
                    out.push_str("\n\n");
                }
                out.push_str(&s.text);
            }
            BlockType::Pre => {
                out.push_str("\n\n```\n");
                out.push_str(&s.text);
                out.push_str("\n```");
            }
            BlockType::Li => {
                if prev != Some(BlockType::Li) {
                    out.push('\n');
                }
                out.push_str("\n- ");
                out.push_str(&s.text);
            }
            _ => {
                let after_break = matches!(prev, Some(t) if t.is_heading() || t == BlockType::Pre);
                if after_break {
                    out.push_str("\n\n");
                } else if !out.is_empty() {
                    out.push(' ');
                }
                out.push_str(&s.text);
            }
        }
        prev = Some(s.block_type);
    }
    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::{tokenize, TokenizeOptions};

    fn sentence(text: &str, idx: usize, block_type: BlockType) -> Sentence {
        Sentence {
            tokens: tokenize(text, &TokenizeOptions::default()),
            text: text.to_string(),
            heading_path: Vec::new(),
            block_type,
            block_index: idx,
            sentence_index: 0,
            global_index: idx,
            position: 0.0,
        }
    }

    fn anchor_at(sentences: &[Sentence], idx: usize, score: f64) -> ScoredSentence {
        ScoredSentence {
            sentence: sentences[idx].clone(),
            bm25_score: score,
            heuristic_score: score,
            combined_score: score,
        }
    }

    fn doc() -> Vec<Sentence> {
        vec![
            sentence("Setup", 0, BlockType::H2),
            sentence("Install the package first.", 1, BlockType::P),
            sentence("Usage", 2, BlockType::H2),
            sentence("Call the function with a query.", 3, BlockType::P),
            sentence("It returns ranked excerpts.", 4, BlockType::P),
            sentence("let r = extract(html, q);", 5, BlockType::Pre),
            sentence("Internals", 6, BlockType::H2),
            sentence("Scoring combines two signals.", 7, BlockType::P),
        ]
    }

    #[test]
    fn whole_section_taken_when_it_fits() {
        let s = doc();
        let chunk = expand_anchor(&s, &anchor_at(&s, 3, 0.9), &ExpandConfig::default());
        let indexes: Vec<usize> = chunk.sentences.iter().map(|x| x.global_index).collect();
        // Section "Usage" spans sentences 2..=5; the next h2 closes it.
        assert_eq!(indexes, vec![2, 3, 4, 5]);
        assert_eq!(chunk.anchor_index, 3);
    }

    #[test]
    fn oversized_section_grows_from_anchor() {
        let s = doc();
        let cfg = ExpandConfig {
            max_chunk_chars: 70,
            include_code_blocks: false,
            ..Default::default()
        };
        let chunk = expand_anchor(&s, &anchor_at(&s, 3, 0.9), &cfg);
        let indexes: Vec<usize> = chunk.sentences.iter().map(|x| x.global_index).collect();
        assert!(indexes.contains(&3), "anchor always included: {indexes:?}");
        assert!(chunk.sentences.iter().map(cost).sum::<usize>() <= 70 || indexes == vec![3]);
        // Growth stays inside the section.
        assert!(indexes.iter().all(|&i| (2..=5).contains(&i)), "{indexes:?}");
    }

    #[test]
    fn sentence_count_mode_uses_fixed_window() {
        let s = doc();
        let cfg = ExpandConfig {
            expand_to_section: false,
            context_before: 1,
            context_after: 1,
            include_code_blocks: false,
            ..Default::default()
        };
        let chunk = expand_anchor(&s, &anchor_at(&s, 4, 0.9), &cfg);
        let indexes: Vec<usize> = chunk.sentences.iter().map(|x| x.global_index).collect();
        assert_eq!(indexes, vec![3, 4, 5]);
    }

    #[test]
    fn count_window_shrinks_far_side_first() {
        let s: Vec<Sentence> = (0..9)
            .map(|i| sentence(&format!("sentence body number {i} with padding text"), i, BlockType::P))
            .collect();
        let cfg = ExpandConfig {
            expand_to_section: false,
            context_before: 2,
            context_after: 4,
            max_chunk_chars: 170,
            include_code_blocks: false,
            ..Default::default()
        };
        let chunk = expand_anchor(&s, &anchor_at(&s, 3, 0.9), &cfg);
        let indexes: Vec<usize> = chunk.sentences.iter().map(|x| x.global_index).collect();
        assert!(indexes.contains(&3));
        // The after side is longer, so it shrinks before the before side.
        assert!(indexes.first() == Some(&1) || indexes.first() == Some(&2), "{indexes:?}");
    }

    #[test]
    fn code_bleed_includes_trailing_pre_then_stops() {
        let s = vec![
            sentence("Usage", 0, BlockType::H2),
            sentence("Call the function like this.", 1, BlockType::P),
            sentence("let out = extract(html, query);", 2, BlockType::Pre),
            sentence("More prose after the example.", 3, BlockType::P),
        ];
        let cfg = ExpandConfig {
            expand_to_section: false,
            context_before: 0,
            context_after: 0,
            ..Default::default()
        };
        let chunk = expand_anchor(&s, &anchor_at(&s, 1, 0.9), &cfg);
        let indexes: Vec<usize> = chunk.sentences.iter().map(|x| x.global_index).collect();
        assert_eq!(indexes, vec![1, 2], "pre bleeds in, then the walk stops");
    }

    #[test]
    fn code_bleed_stops_at_headings() {
        let s = vec![
            sentence("Call the function like this.", 0, BlockType::P),
            sentence("Other", 1, BlockType::H2),
            sentence("let out = extract(html, query);", 2, BlockType::Pre),
        ];
        let cfg = ExpandConfig {
            expand_to_section: false,
            context_before: 0,
            context_after: 0,
            ..Default::default()
        };
        let chunk = expand_anchor(&s, &anchor_at(&s, 0, 0.9), &cfg);
        assert_eq!(chunk.sentences.len(), 1);
    }

    #[test]
    fn chunk_text_formats_by_block_type() {
        let s = vec![
            sentence("Usage", 0, BlockType::H2),
            sentence("First sentence.", 1, BlockType::P),
            sentence("Second sentence.", 2, BlockType::P),
            sentence("first item", 3, BlockType::Li),
            sentence("second item", 4, BlockType::Li),
            sentence("let x = 1;", 5, BlockType::Pre),
            sentence("After code.", 6, BlockType::P),
        ];
        let text = build_chunk_text(&s);
        assert_eq!(
            text,
            "Usage\n\nFirst sentence. Second sentence.\n\n- first item\n- second item\n\n```\nlet x = 1;\n```\n\nAfter code."
        );
    }

    #[test]
    fn char_count_is_raw_not_formatted() {
        let s = vec![
            sentence("Usage", 0, BlockType::H2),
            sentence("Body text.", 1, BlockType::P),
        ];
        let chunk = expand_anchor(&s, &anchor_at(&s, 1, 0.5), &ExpandConfig::default());
        assert_eq!(chunk.char_count, 5 + 10);
        assert!(chunk.text.chars().count() > chunk.char_count - 5);
    }
}
