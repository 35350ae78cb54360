//! Chunk dedup: merge overlapping windows, drop near-duplicates and subsets.
//!
//! Phase A merges transitively by sentence overlap (measured against the
//! smaller chunk) and drops token-level near-duplicates. Phase B removes any
//! chunk whose sentence-index set is contained in an already-kept chunk;
//! identical sets count as subsets, so exactly one survives.

use crate::expand::{build_chunk_text, Chunk};
use crate::text::jaccard_similarity;
use pagesift_core::DedupeConfig;
use std::collections::BTreeSet;

fn index_set(chunk: &Chunk) -> BTreeSet<usize> {
    chunk.sentences.iter().map(|s| s.global_index).collect()
}

fn chunk_tokens(chunk: &Chunk) -> Vec<String> {
    chunk
        .sentences
        .iter()
        .flat_map(|s| s.tokens.iter().cloned())
        .collect()
}

/// `|a ∩ b| / min(|a|, |b|)`; 0 when either is empty.
fn sentence_overlap(a: &BTreeSet<usize>, b: &BTreeSet<usize>) -> f64 {
    let min = a.len().min(b.len());
    if min == 0 {
        return 0.0;
    }
    let inter = a.intersection(b).count();
    inter as f64 / min as f64
}

fn by_score_then_anchor(a: &Chunk, b: &Chunk) -> std::cmp::Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.anchor_index.cmp(&b.anchor_index))
}

pub fn full_dedupe(chunks: Vec<Chunk>, cfg: &DedupeConfig) -> Vec<Chunk> {
    let merged = merge_overlapping(chunks, cfg);
    remove_subset_chunks(merged)
}

fn merge_overlapping(mut chunks: Vec<Chunk>, cfg: &DedupeConfig) -> Vec<Chunk> {
    chunks.sort_by(by_score_then_anchor);
    let mut consumed = vec![false; chunks.len()];
    let mut out: Vec<Chunk> = Vec::new();

    for i in 0..chunks.len() {
        if consumed[i] {
            continue;
        }
        let mut acc = chunks[i].clone();
        let mut acc_set = index_set(&acc);
        let mut acc_tokens = chunk_tokens(&acc);

        // Re-scan after every merge so overlap is measured against the
        // accumulated chunk (transitive merging).
        loop {
            let mut merged_any = false;
            for j in (i + 1)..chunks.len() {
                if consumed[j] {
                    continue;
                }
                let other_set = index_set(&chunks[j]);
                if sentence_overlap(&acc_set, &other_set) >= cfg.overlap_threshold {
                    consumed[j] = true;
                    acc.sentences.extend(chunks[j].sentences.iter().cloned());
                    acc.sentences
                        .sort_by(|a, b| a.global_index.cmp(&b.global_index));
                    acc.sentences.dedup_by_key(|s| s.global_index);
                    // Score/anchor/heading stay with the higher-scoring parent,
                    // which is `acc` by sort order.
                    merged_any = true;
                } else if jaccard_similarity(&acc_tokens, &chunk_tokens(&chunks[j]))
                    >= cfg.token_similarity_threshold
                {
                    consumed[j] = true;
                }
            }
            if !merged_any {
                break;
            }
            acc_set = index_set(&acc);
            acc_tokens = chunk_tokens(&acc);
        }

        acc.text = build_chunk_text(&acc.sentences);
        acc.char_count = acc.sentences.iter().map(|s| s.text.chars().count()).sum();
        out.push(acc);
    }
    out
}

fn remove_subset_chunks(mut chunks: Vec<Chunk>) -> Vec<Chunk> {
    chunks.sort_by(|a, b| {
        b.sentences
            .len()
            .cmp(&a.sentences.len())
            .then_with(|| a.anchor_index.cmp(&b.anchor_index))
    });

    let mut kept_sets: Vec<BTreeSet<usize>> = Vec::new();
    let mut kept: Vec<Chunk> = Vec::new();
    for chunk in chunks {
        let set = index_set(&chunk);
        if kept_sets.iter().any(|ks| set.is_subset(ks)) {
            continue;
        }
        kept_sets.push(set);
        kept.push(chunk);
    }

    kept.sort_by(by_score_then_anchor);
    kept
}
