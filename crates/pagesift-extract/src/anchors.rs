//! Anchor selection: greedy, diversity-filtered top-K over ranked sentences.
//!
//! Greedy in rank order keeps the best sentence unconditionally (subject to
//! the score floor); every later candidate must differ from all accepted
//! anchors in both content (Jaccard) and document position.

use crate::rank::ScoredSentence;
use crate::text::jaccard_similarity;
use pagesift_core::AnchorConfig;

pub fn select_anchors(ranked: &[ScoredSentence], cfg: &AnchorConfig) -> Vec<ScoredSentence> {
    let mut anchors: Vec<ScoredSentence> = Vec::new();
    for candidate in ranked {
        if anchors.len() >= cfg.max_anchors {
            break;
        }
        if candidate.combined_score < cfg.min_score {
            continue;
        }
        let diverse = anchors.iter().all(|a| {
            let sim = jaccard_similarity(&candidate.sentence.tokens, &a.sentence.tokens);
            let gap = candidate
                .sentence
                .global_index
                .abs_diff(a.sentence.global_index);
            sim <= cfg.diversity_threshold && gap >= cfg.min_position_gap
        });
        if diverse {
            anchors.push(candidate.clone());
        }
    }
    anchors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::{BlockType, Sentence};
    use crate::text::{tokenize, TokenizeOptions};

    fn scored(text: &str, global_index: usize, combined: f64) -> ScoredSentence {
        ScoredSentence {
            sentence: Sentence {
                tokens: tokenize(text, &TokenizeOptions::default()),
                text: text.to_string(),
                heading_path: Vec::new(),
                block_type: BlockType::P,
                block_index: global_index,
                sentence_index: 0,
                global_index,
                position: 0.0,
            },
            bm25_score: combined,
            heuristic_score: combined,
            combined_score: combined,
        }
    }

    #[test]
    fn respects_score_floor_and_cap() {
        let ranked = vec![
            scored("alpha topic sentence", 0, 0.9),
            scored("beta topic sentence entirely different", 10, 0.5),
            scored("gamma words below the floor", 20, 0.1),
        ];
        let cfg = AnchorConfig {
            max_anchors: 2,
            ..Default::default()
        };
        let anchors = select_anchors(&ranked, &cfg);
        assert_eq!(anchors.len(), 2);
        assert!(anchors.iter().all(|a| a.combined_score >= 0.25));
    }

    #[test]
    fn near_duplicate_content_is_rejected() {
        let ranked = vec![
            scored("promises simplify asynchronous code", 0, 0.9),
            scored("promises simplify asynchronous code", 10, 0.8),
            scored("callbacks nest deeply without promises", 20, 0.7),
        ];
        let anchors = select_anchors(&ranked, &AnchorConfig::default());
        let texts: Vec<&str> = anchors.iter().map(|a| a.sentence.text.as_str()).collect();
        assert_eq!(anchors.len(), 2, "{texts:?}");
        assert_eq!(anchors[1].sentence.global_index, 20);
    }

    #[test]
    fn nearby_positions_are_rejected() {
        let ranked = vec![
            scored("first distinct topical sentence", 5, 0.9),
            scored("second unrelated material entirely", 6, 0.8),
            scored("third faraway unrelated material", 30, 0.7),
        ];
        let anchors = select_anchors(&ranked, &AnchorConfig::default());
        assert_eq!(anchors.len(), 2);
        assert_eq!(anchors[0].sentence.global_index, 5);
        assert_eq!(anchors[1].sentence.global_index, 30);
    }

    #[test]
    fn pairwise_constraints_hold_for_all_selected() {
        let cfg = AnchorConfig::default();
        let ranked: Vec<ScoredSentence> = (0..40)
            .map(|i| scored(&format!("sentence about subject {i} with words {i}"), i, 0.9))
            .collect();
        let anchors = select_anchors(&ranked, &cfg);
        assert!(anchors.len() <= cfg.max_anchors);
        for (i, a) in anchors.iter().enumerate() {
            for b in anchors.iter().skip(i + 1) {
                assert!(
                    a.sentence.global_index.abs_diff(b.sentence.global_index)
                        >= cfg.min_position_gap
                );
                assert!(
                    jaccard_similarity(&a.sentence.tokens, &b.sentence.tokens)
                        <= cfg.diversity_threshold
                );
            }
        }
    }
}
