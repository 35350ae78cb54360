//! Document quality gate: reject low-signal pages before scoring.
//!
//! Thresholds apply in a fixed priority; the first failure wins so reject
//! reasons stay stable across documents.

use crate::segment::Sentence;
use pagesift_core::QualityConfig;

/// Sentences longer than this count as "long" (substantive prose).
const LONG_SENTENCE_CHARS: usize = 50;
/// Sentences shorter than this count as fragments.
const FRAGMENT_CHARS: usize = 30;

#[derive(Debug, Clone)]
pub struct QualityReport {
    pub total_sentences: usize,
    pub long_sentence_count: usize,
    pub median_sentence_length: f64,
    pub fragment_ratio: f64,
    pub passes: bool,
    pub reason: Option<String>,
}

pub fn assess(sentences: &[Sentence], cfg: &QualityConfig) -> QualityReport {
    if sentences.is_empty() {
        return QualityReport {
            total_sentences: 0,
            long_sentence_count: 0,
            median_sentence_length: 0.0,
            fragment_ratio: 1.0,
            passes: false,
            reason: Some("No sentences found".to_string()),
        };
    }

    let mut lengths: Vec<usize> = sentences
        .iter()
        .map(|s| s.text.chars().count())
        .collect();
    lengths.sort_unstable();

    let total = lengths.len();
    let long_count = lengths.iter().filter(|&&l| l > LONG_SENTENCE_CHARS).count();
    let fragments = lengths.iter().filter(|&&l| l < FRAGMENT_CHARS).count();
    let fragment_ratio = fragments as f64 / total as f64;
    let median = if total % 2 == 1 {
        lengths[total / 2] as f64
    } else {
        (lengths[total / 2 - 1] + lengths[total / 2]) as f64 / 2.0
    };

    let reason = if total < cfg.min_total_sentences {
        Some(format!(
            "Too few sentences ({total} < {})",
            cfg.min_total_sentences
        ))
    } else if long_count < cfg.min_long_sentences {
        Some(format!(
            "Too few long sentences ({long_count} < {})",
            cfg.min_long_sentences
        ))
    } else if fragment_ratio > cfg.max_fragment_ratio {
        Some(format!(
            "Too many fragments ({fragment_ratio:.2} > {})",
            cfg.max_fragment_ratio
        ))
    } else if median < cfg.min_median_length {
        Some(format!(
            "Median sentence too short ({median:.1} < {})",
            cfg.min_median_length
        ))
    } else {
        None
    };

    QualityReport {
        total_sentences: total,
        long_sentence_count: long_count,
        median_sentence_length: median,
        fragment_ratio,
        passes: reason.is_none(),
        reason,
    }
}
