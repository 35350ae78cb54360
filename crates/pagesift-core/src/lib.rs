//! Backend-agnostic contracts for `pagesift`.
//!
//! This crate intentionally contains no HTML parsing or scoring logic.
//! It defines the configuration tree, the output types, and the outcome
//! taxonomy shared by the extraction engine and its callers.

use serde::{Deserialize, Serialize};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("config parse failed: {0}")]
    ConfigParse(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Relevance thresholds profile.
///
/// `Search` is the default: it accepts a page whenever any of several
/// moderate signals fire. `Strict` demands much stronger evidence and suits
/// orchestrators that aggregate many pages and can afford to drop weak ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RelevanceMode {
    Strict,
    #[default]
    Search,
}

/// BM25 parameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Bm25Config {
    /// Term-frequency saturation parameter.
    #[serde(default = "default_k1")]
    pub k1: f64,
    /// Length normalization parameter.
    #[serde(default = "default_b")]
    pub b: f64,
}

fn default_k1() -> f64 {
    1.5
}
fn default_b() -> f64 {
    0.75
}

impl Default for Bm25Config {
    fn default() -> Self {
        Self {
            k1: default_k1(),
            b: default_b(),
        }
    }
}

/// Weights for the nine structural heuristics.
///
/// By convention the weights sum to 1.0 so the combined heuristic score stays
/// in `[0, 1]`; `Config::validate` checks this within a small tolerance.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeuristicWeights {
    #[serde(default = "default_w_position")]
    pub position: f64,
    #[serde(default = "default_w_heading_proximity")]
    pub heading_proximity: f64,
    #[serde(default = "default_w_density")]
    pub density: f64,
    #[serde(default = "default_w_structure")]
    pub structure: f64,
    #[serde(default = "default_w_proximity")]
    pub proximity: f64,
    #[serde(default = "default_w_heading_path")]
    pub heading_path: f64,
    #[serde(default = "default_w_coverage")]
    pub coverage: f64,
    #[serde(default = "default_w_outlier")]
    pub outlier: f64,
    #[serde(default = "default_w_meta_section")]
    pub meta_section: f64,
}

fn default_w_position() -> f64 {
    0.05
}
fn default_w_heading_proximity() -> f64 {
    0.11
}
fn default_w_density() -> f64 {
    0.09
}
fn default_w_structure() -> f64 {
    0.11
}
fn default_w_proximity() -> f64 {
    0.14
}
fn default_w_heading_path() -> f64 {
    0.17
}
fn default_w_coverage() -> f64 {
    0.16
}
fn default_w_outlier() -> f64 {
    0.09
}
fn default_w_meta_section() -> f64 {
    0.08
}

impl Default for HeuristicWeights {
    fn default() -> Self {
        Self {
            position: default_w_position(),
            heading_proximity: default_w_heading_proximity(),
            density: default_w_density(),
            structure: default_w_structure(),
            proximity: default_w_proximity(),
            heading_path: default_w_heading_path(),
            coverage: default_w_coverage(),
            outlier: default_w_outlier(),
            meta_section: default_w_meta_section(),
        }
    }
}

impl HeuristicWeights {
    pub fn sum(&self) -> f64 {
        self.position
            + self.heading_proximity
            + self.density
            + self.structure
            + self.proximity
            + self.heading_path
            + self.coverage
            + self.outlier
            + self.meta_section
    }
}

/// Ranker configuration: BM25/heuristic blend and the relevance decision mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankerConfig {
    #[serde(default = "default_bm25_weight")]
    pub bm25_weight: f64,
    #[serde(default = "default_heuristic_weight")]
    pub heuristic_weight: f64,
    #[serde(default, rename = "bm25Config")]
    pub bm25: Bm25Config,
    #[serde(default)]
    pub heuristic_weights: HeuristicWeights,
    #[serde(default)]
    pub relevance_mode: RelevanceMode,
}

fn default_bm25_weight() -> f64 {
    0.6
}
fn default_heuristic_weight() -> f64 {
    0.4
}

impl Default for RankerConfig {
    fn default() -> Self {
        Self {
            bm25_weight: default_bm25_weight(),
            heuristic_weight: default_heuristic_weight(),
            bm25: Bm25Config::default(),
            heuristic_weights: HeuristicWeights::default(),
            relevance_mode: RelevanceMode::default(),
        }
    }
}

/// Anchor selection: diversity-filtered greedy top-K over ranked sentences.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnchorConfig {
    #[serde(default = "default_max_anchors")]
    pub max_anchors: usize,
    #[serde(default = "default_min_score")]
    pub min_score: f64,
    /// Maximum Jaccard token similarity allowed between two anchors.
    #[serde(default = "default_diversity_threshold")]
    pub diversity_threshold: f64,
    /// Minimum global-index distance between two anchors.
    #[serde(default = "default_min_position_gap")]
    pub min_position_gap: usize,
}

fn default_max_anchors() -> usize {
    5
}
fn default_min_score() -> f64 {
    0.25
}
fn default_diversity_threshold() -> f64 {
    0.4
}
fn default_min_position_gap() -> usize {
    3
}

impl Default for AnchorConfig {
    fn default() -> Self {
        Self {
            max_anchors: default_max_anchors(),
            min_score: default_min_score(),
            diversity_threshold: default_diversity_threshold(),
            min_position_gap: default_min_position_gap(),
        }
    }
}

/// Context-window expansion around each anchor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpandConfig {
    /// Sentences before the anchor (sentence-count mode only).
    #[serde(default = "default_context_before")]
    pub context_before: usize,
    /// Sentences after the anchor (sentence-count mode only).
    #[serde(default = "default_context_after")]
    pub context_after: usize,
    /// Carried on the config surface for callers; windows are always built
    /// from whole sentences, so this knob has no further effect.
    #[serde(default = "default_true")]
    pub respect_block_boundaries: bool,
    #[serde(default = "default_max_chunk_chars")]
    pub max_chunk_chars: usize,
    /// Allow a trailing code block to bleed past the window.
    #[serde(default = "default_true")]
    pub include_code_blocks: bool,
    /// Expand to the enclosing section when it fits the budget.
    #[serde(default = "default_true")]
    pub expand_to_section: bool,
}

fn default_context_before() -> usize {
    5
}
fn default_context_after() -> usize {
    8
}
fn default_max_chunk_chars() -> usize {
    2000
}
fn default_true() -> bool {
    true
}

impl Default for ExpandConfig {
    fn default() -> Self {
        Self {
            context_before: default_context_before(),
            context_after: default_context_after(),
            respect_block_boundaries: true,
            max_chunk_chars: default_max_chunk_chars(),
            include_code_blocks: true,
            expand_to_section: true,
        }
    }
}

/// Chunk dedup: overlap merging and near-duplicate dropping.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DedupeConfig {
    /// Sentence-overlap ratio (vs the smaller chunk) at which chunks merge.
    #[serde(default = "default_overlap_threshold")]
    pub overlap_threshold: f64,
    /// Jaccard token similarity at which the lower-scoring chunk is dropped.
    #[serde(default = "default_token_similarity_threshold")]
    pub token_similarity_threshold: f64,
}

fn default_overlap_threshold() -> f64 {
    0.3
}
fn default_token_similarity_threshold() -> f64 {
    0.72
}

impl Default for DedupeConfig {
    fn default() -> Self {
        Self {
            overlap_threshold: default_overlap_threshold(),
            token_similarity_threshold: default_token_similarity_threshold(),
        }
    }
}

/// Final excerpt assembly budget.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExcerptConfig {
    #[serde(default = "default_max_excerpts")]
    pub max_excerpts: usize,
    /// Total raw-character budget across all excerpts.
    #[serde(default = "default_char_budget")]
    pub char_budget: usize,
    /// Chunks smaller than this are skipped outright.
    #[serde(default = "default_min_excerpt_chars")]
    pub min_excerpt_chars: usize,
}

fn default_max_excerpts() -> usize {
    3
}
fn default_char_budget() -> usize {
    2000
}
fn default_min_excerpt_chars() -> usize {
    50
}

impl Default for ExcerptConfig {
    fn default() -> Self {
        Self {
            max_excerpts: default_max_excerpts(),
            char_budget: default_char_budget(),
            min_excerpt_chars: default_min_excerpt_chars(),
        }
    }
}

/// Document quality gate thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityConfig {
    #[serde(default = "default_min_total_sentences")]
    pub min_total_sentences: usize,
    #[serde(default = "default_min_long_sentences")]
    pub min_long_sentences: usize,
    #[serde(default = "default_max_fragment_ratio")]
    pub max_fragment_ratio: f64,
    #[serde(default = "default_min_median_length")]
    pub min_median_length: f64,
}

fn default_min_total_sentences() -> usize {
    5
}
fn default_min_long_sentences() -> usize {
    3
}
fn default_max_fragment_ratio() -> f64 {
    0.65
}
fn default_min_median_length() -> f64 {
    25.0
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            min_total_sentences: default_min_total_sentences(),
            min_long_sentences: default_min_long_sentences(),
            max_fragment_ratio: default_max_fragment_ratio(),
            min_median_length: default_min_median_length(),
        }
    }
}

/// Full extraction configuration. Every field defaults; partial JSON works.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub ranker: RankerConfig,
    #[serde(default)]
    pub anchors: AnchorConfig,
    #[serde(default)]
    pub expand: ExpandConfig,
    #[serde(default)]
    pub dedupe: DedupeConfig,
    #[serde(default)]
    pub excerpts: ExcerptConfig,
    #[serde(default)]
    pub quality: QualityConfig,
    #[serde(default)]
    pub skip_quality_check: bool,
}

impl Config {
    /// Parse a config from JSON. Missing keys take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let cfg: Config =
            serde_json::from_str(json).map_err(|e| Error::ConfigParse(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject configs the pipeline cannot score meaningfully.
    ///
    /// Extraction itself is total: callers that skip validation get clamped
    /// behavior rather than panics. Validation exists so hosts can surface
    /// bad configuration at load time instead of as silently-odd rankings.
    pub fn validate(&self) -> Result<()> {
        fn unit(name: &str, v: f64) -> Result<()> {
            if !v.is_finite() || !(0.0..=1.0).contains(&v) {
                return Err(Error::InvalidConfig(format!(
                    "{name} must be in [0, 1]; got {v}"
                )));
            }
            Ok(())
        }

        unit("ranker.bm25Weight", self.ranker.bm25_weight)?;
        unit("ranker.heuristicWeight", self.ranker.heuristic_weight)?;
        let blend = self.ranker.bm25_weight + self.ranker.heuristic_weight;
        if (blend - 1.0).abs() > 1e-6 {
            return Err(Error::InvalidConfig(format!(
                "ranker weights must sum to 1.0; got {blend}"
            )));
        }

        if !self.ranker.bm25.k1.is_finite() || self.ranker.bm25.k1 < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "bm25.k1 must be >= 0; got {}",
                self.ranker.bm25.k1
            )));
        }
        unit("bm25.b", self.ranker.bm25.b)?;

        let w = &self.ranker.heuristic_weights;
        for (name, v) in [
            ("heuristicWeights.position", w.position),
            ("heuristicWeights.headingProximity", w.heading_proximity),
            ("heuristicWeights.density", w.density),
            ("heuristicWeights.structure", w.structure),
            ("heuristicWeights.proximity", w.proximity),
            ("heuristicWeights.headingPath", w.heading_path),
            ("heuristicWeights.coverage", w.coverage),
            ("heuristicWeights.outlier", w.outlier),
            ("heuristicWeights.metaSection", w.meta_section),
        ] {
            unit(name, v)?;
        }
        if (w.sum() - 1.0).abs() > 1e-6 {
            return Err(Error::InvalidConfig(format!(
                "heuristic weights must sum to 1.0; got {}",
                w.sum()
            )));
        }

        unit("anchors.minScore", self.anchors.min_score)?;
        unit("anchors.diversityThreshold", self.anchors.diversity_threshold)?;
        unit("dedupe.overlapThreshold", self.dedupe.overlap_threshold)?;
        unit(
            "dedupe.tokenSimilarityThreshold",
            self.dedupe.token_similarity_threshold,
        )?;
        unit("quality.maxFragmentRatio", self.quality.max_fragment_ratio)?;
        if !self.quality.min_median_length.is_finite() || self.quality.min_median_length < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "quality.minMedianLength must be >= 0; got {}",
                self.quality.min_median_length
            )));
        }
        Ok(())
    }
}

/// Why an extraction produced (or did not produce) excerpts.
///
/// Content defects are outcomes, never errors: every variant still comes with
/// structurally valid metrics on the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Ok,
    NoMainContent,
    NoSentences,
    AllCitations,
    LowQuality,
    NotRelevant,
}

/// The public output unit: one self-contained excerpt with source structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Excerpt {
    pub text: String,
    /// Ancestor heading texts of the anchor sentence, outermost first.
    pub heading_path: Vec<String>,
    pub score: f64,
    /// Raw character count (sum of sentence text lengths, not formatted).
    pub char_count: usize,
}

/// Relevance signals observed while ranking; populated on every outcome.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelevanceMetrics {
    pub has_relevant_results: bool,
    /// Sentences that survived segmentation and the citation filter.
    pub sentence_count: usize,
    /// Fraction of query terms found anywhere in the document.
    pub query_term_coverage: f64,
    /// Best raw (un-normalized) BM25 score across sentences.
    pub max_bm25: f64,
    /// Most distinct query terms seen together in a single sentence.
    pub max_cooccurrence: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality_reject_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    pub outcome: Outcome,
    pub excerpts: Vec<Excerpt>,
    /// Sum of excerpt `char_count`s.
    pub total_chars: usize,
    pub query: String,
    /// Document `<title>`, when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "relevanceMetrics")]
    pub relevance: RelevanceMetrics,
}

impl ExtractionResult {
    /// An empty result for a non-`ok` outcome, with whatever metrics exist.
    pub fn empty(outcome: Outcome, query: &str, relevance: RelevanceMetrics) -> Self {
        Self {
            outcome,
            excerpts: Vec::new(),
            total_chars: 0,
            query: query.to_string(),
            title: None,
            relevance,
        }
    }
}
