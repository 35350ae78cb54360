//! Contract: every content defect maps to its outcome variant, with
//! structurally valid metrics and no excerpts.

use pagesift_core::{Config, Outcome};
use pagesift_extract::extract;

fn lenient() -> Config {
    Config {
        skip_quality_check: true,
        ..Default::default()
    }
}

#[test]
fn missing_container_is_no_main_content() {
    let r = extract("<html><body></body></html>", "query", &Config::default());
    assert_eq!(r.outcome, Outcome::NoMainContent);
    assert!(r.excerpts.is_empty());
    assert_eq!(r.total_chars, 0);
    assert!(!r.relevance.has_relevant_results);
    assert_eq!(r.relevance.sentence_count, 0);
}

#[test]
fn blockless_container_is_no_sentences() {
    // A main container whose text sits outside h/p/li/pre never yields blocks.
    let r = extract(
        "<html><body><main><div>bare text outside any block element</div></main></body></html>",
        "query",
        &Config::default(),
    );
    assert_eq!(r.outcome, Outcome::NoSentences);
    assert!(r.excerpts.is_empty());
}

#[test]
fn reference_only_page_is_all_citations() {
    let r = extract(
        "<article>\
         <p>Retrieved 12 March 2021.</p>\
         <p>Archived from the original on 4 May 2019.</p>\
         <p>[3] Knuth, The Art of Computer Programming</p>\
         </article>",
        "sorting algorithms",
        &lenient(),
    );
    assert_eq!(r.outcome, Outcome::AllCitations, "relevance={:?}", r.relevance);
    assert!(r.excerpts.is_empty());
}

#[test]
fn thin_page_is_low_quality_with_reason() {
    let r = extract(
        "<article><p>One line.</p></article>",
        "anything at all",
        &Config::default(),
    );
    assert_eq!(r.outcome, Outcome::LowQuality);
    let reason = r.relevance.quality_reject_reason.expect("reason populated");
    assert!(reason.starts_with("Too few sentences"), "reason={reason}");
    assert_eq!(r.relevance.sentence_count, 1);
}

#[test]
fn off_topic_page_is_not_relevant_with_metrics() {
    let r = extract(
        "<article><h2>Gardening</h2>\
         <p>Compost improves soil structure and drainage through organic matter.</p>\
         <p>Mulch keeps roots cool in summer and suppresses most annual weeds.</p>\
         <p>Watering deeply but rarely encourages deeper root growth over time.</p>\
         </article>",
        "kubernetes ingress controller",
        &lenient(),
    );
    assert_eq!(r.outcome, Outcome::NotRelevant);
    assert!(r.excerpts.is_empty());
    assert_eq!(r.relevance.query_term_coverage, 0.0);
    assert_eq!(r.relevance.max_bm25, 0.0);
    assert!(r.relevance.sentence_count > 0, "metrics stay populated");
}

#[test]
fn outcome_serializes_into_snake_case_wire_format() {
    let r = extract("<html><body></body></html>", "q", &Config::default());
    let json = serde_json::to_value(&r).expect("serialize");
    assert_eq!(json["outcome"], "no_main_content");
    assert_eq!(json["relevanceMetrics"]["hasRelevantResults"], false);
}
