//! Budget-bounded excerpt assembly.
//!
//! The budget loop continues past oversized chunks instead of breaking: a
//! smaller, lower-ranked chunk may still fit the remaining budget. Callers
//! depend on that gap-filling behavior.

use crate::expand::Chunk;
use pagesift_core::{Excerpt, ExcerptConfig};

pub fn assemble(chunks: &[Chunk], cfg: &ExcerptConfig) -> (Vec<Excerpt>, usize) {
    let mut ordered: Vec<&Chunk> = chunks.iter().collect();
    ordered.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.anchor_index.cmp(&b.anchor_index))
    });

    let mut excerpts: Vec<Excerpt> = Vec::new();
    let mut total_chars = 0usize;
    for chunk in ordered {
        if excerpts.len() >= cfg.max_excerpts {
            break;
        }
        if chunk.char_count < cfg.min_excerpt_chars {
            continue;
        }
        if total_chars + chunk.char_count > cfg.char_budget {
            continue;
        }
        total_chars += chunk.char_count;
        excerpts.push(Excerpt {
            text: chunk.text.clone(),
            heading_path: chunk.heading_path.clone(),
            score: chunk.score,
            char_count: chunk.char_count,
        });
    }
    (excerpts, total_chars)
}
