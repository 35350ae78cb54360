//! DOM segmentation: blocks with heading ancestry, then sentences with
//! scoring metadata.
//!
//! The walk emits a block per `h1..h6 | p | li | pre` element and does not
//! descend into emitted blocks, so nested markup contributes text to exactly
//! one block. Heading-path bookkeeping is asymmetric on purpose: a heading's
//! own path holds only its strict ancestors, while later content sees the
//! most recent heading at each level.

use crate::preprocess::{normalized_text, Preprocessed};
use crate::text::{tokenize, TokenizeOptions};
use regex::Regex;
use ego_tree::NodeRef;
use scraper::Node;
use serde::Serialize;
use std::sync::LazyLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockType {
    H1,
    H2,
    H3,
    H4,
    H5,
    H6,
    P,
    Li,
    Pre,
}

impl BlockType {
    pub fn from_tag(tag: &str) -> Option<Self> {
        Some(match tag {
            "h1" => Self::H1,
            "h2" => Self::H2,
            "h3" => Self::H3,
            "h4" => Self::H4,
            "h5" => Self::H5,
            "h6" => Self::H6,
            "p" => Self::P,
            "li" => Self::Li,
            "pre" => Self::Pre,
            _ => return None,
        })
    }

    /// 1..=6 for headings, `None` otherwise.
    pub fn heading_level(self) -> Option<usize> {
        Some(match self {
            Self::H1 => 1,
            Self::H2 => 2,
            Self::H3 => 3,
            Self::H4 => 4,
            Self::H5 => 5,
            Self::H6 => 6,
            _ => return None,
        })
    }

    pub fn is_heading(self) -> bool {
        self.heading_level().is_some()
    }
}

/// Atomic structural unit of a document.
#[derive(Debug, Clone, Serialize)]
pub struct Block {
    pub block_type: BlockType,
    /// Whitespace-normalized; `pre` keeps internal line breaks.
    pub text: String,
    /// 0-based document order.
    pub index: usize,
    /// Ancestor heading texts, excluding self.
    pub heading_path: Vec<String>,
}

/// Unit of scoring.
#[derive(Debug, Clone, Serialize)]
pub struct Sentence {
    pub text: String,
    pub tokens: Vec<String>,
    pub heading_path: Vec<String>,
    pub block_type: BlockType,
    pub block_index: usize,
    /// Position within the parent block; 0 for headings and code.
    pub sentence_index: usize,
    /// Dense 0-based rank across all sentences of the document.
    pub global_index: usize,
    /// `block_index / max(1, total_blocks - 1)`, clamped to `[0, 1]`.
    pub position: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct SegmentOptions {
    /// Do not descend into `<nav>` elements.
    pub skip_nav: bool,
}

impl Default for SegmentOptions {
    fn default() -> Self {
        Self { skip_nav: true }
    }
}

/// Trailing UI captions that highlighters append to code blocks.
static CODE_TRAILER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?:\s*(?:Try|Run|Copy)|\s*Open in (?:Playground|CodeSandbox|StackBlitz)|\s*(?:Edit|View) on GitHub)$",
    )
    .expect("code trailer pattern")
});

/// Tokens that block a sentence split at a following period.
static ABBREVIATIONS: &[&str] = &[
    "al", "ave", "blvd", "cf", "dr", "e.g", "etc", "fig", "i.e", "inc", "jr", "ltd", "mr", "mrs",
    "ms", "no", "prof", "rd", "sr", "st", "vol", "vs",
];

/// Walk the main container and emit blocks in document order.
pub fn segment_blocks(pre: &Preprocessed, opts: &SegmentOptions) -> Vec<Block> {
    let Some(main) = pre.main_element() else {
        return Vec::new();
    };
    let mut blocks = Vec::new();
    let mut path: Vec<String> = Vec::new();
    walk(*main, pre, opts, &mut path, &mut blocks);
    blocks
}

fn walk(
    node: NodeRef<'_, Node>,
    pre: &Preprocessed,
    opts: &SegmentOptions,
    path: &mut Vec<String>,
    blocks: &mut Vec<Block>,
) {
    for child in node.children() {
        if pre.is_removed(child.id()) {
            continue;
        }
        let Node::Element(el) = child.value() else {
            continue;
        };
        if opts.skip_nav && el.name() == "nav" {
            continue;
        }
        let Some(block_type) = BlockType::from_tag(el.name()) else {
            walk(child, pre, opts, path, blocks);
            continue;
        };

        let text = if block_type == BlockType::Pre {
            clean_code_text(pre_text(child, pre))
        } else {
            normalized_text(child, &pre.removed)
        };
        if text.is_empty() {
            continue;
        }

        if let Some(level) = block_type.heading_level() {
            // Truncate to the parent level before capturing: the heading's own
            // path excludes siblings of equal level.
            path.truncate(level - 1);
            blocks.push(Block {
                block_type,
                text: text.clone(),
                index: blocks.len(),
                heading_path: path.clone(),
            });
            path.push(text);
        } else {
            blocks.push(Block {
                block_type,
                text,
                index: blocks.len(),
                heading_path: path.clone(),
            });
        }
        // Emitted blocks own their whole subtree; no descent.
    }
}

/// Text for a `<pre>` block with line structure preserved.
///
/// Highlighters that wrap each line in a `*line*`-classed element lose
/// newlines in raw text; those lines are rejoined explicitly. Otherwise
/// `<br>`s become newlines and remaining text is kept as written.
fn pre_text(node: NodeRef<'_, Node>, pre: &Preprocessed) -> String {
    let mut lines: Vec<String> = Vec::new();
    collect_line_elements(node, pre, &mut lines);
    if !lines.is_empty() {
        return lines.join("\n").trim().to_string();
    }
    let mut raw = String::new();
    collect_code_text(node, pre, &mut raw);
    raw.trim().to_string()
}

fn collect_line_elements(node: NodeRef<'_, Node>, pre: &Preprocessed, lines: &mut Vec<String>) {
    for child in node.children() {
        if pre.is_removed(child.id()) {
            continue;
        }
        let Node::Element(el) = child.value() else {
            continue;
        };
        let is_line = el
            .attr("class")
            .is_some_and(|c| c.to_ascii_lowercase().contains("line"));
        if is_line {
            let mut s = String::new();
            collect_code_text(child, pre, &mut s);
            lines.push(s.trim_end().to_string());
        } else {
            collect_line_elements(child, pre, lines);
        }
    }
}

fn collect_code_text(node: NodeRef<'_, Node>, pre: &Preprocessed, out: &mut String) {
    for child in node.children() {
        if pre.is_removed(child.id()) {
            continue;
        }
        match child.value() {
            Node::Text(t) => out.push_str(&t),
            Node::Element(el) if el.name() == "br" => out.push('\n'),
            Node::Element(_) => collect_code_text(child, pre, out),
            _ => {}
        }
    }
}

fn clean_code_text(mut text: String) -> String {
    loop {
        let next = CODE_TRAILER_RE.replace(&text, "").into_owned();
        if next == text {
            return text;
        }
        text = next;
    }
}

/// Split paragraph/list text into sentences.
///
/// A split point is `. ! ?` followed by a space and an uppercase letter (or
/// end of string), unless the token before a period is a known abbreviation.
pub fn split_sentences(text: &str) -> Vec<String> {
    let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let chars: Vec<char> = normalized.chars().collect();
    let mut out = Vec::new();
    let mut start = 0usize;

    for i in 0..chars.len() {
        let c = chars[i];
        if !matches!(c, '.' | '!' | '?') {
            continue;
        }
        let at_end = i + 1 == chars.len();
        let before_upper = chars.get(i + 1) == Some(&' ')
            && chars.get(i + 2).is_some_and(|n| n.is_uppercase());
        if !(at_end || before_upper) {
            continue;
        }
        if c == '.' && is_abbreviation_before(&chars, i) {
            continue;
        }
        let s: String = chars[start..=i].iter().collect();
        let s = s.trim();
        if !s.is_empty() {
            out.push(s.to_string());
        }
        start = i + 1;
    }
    if start < chars.len() {
        let s: String = chars[start..].iter().collect();
        let s = s.trim();
        if !s.is_empty() {
            out.push(s.to_string());
        }
    }
    out
}

fn is_abbreviation_before(chars: &[char], period: usize) -> bool {
    let mut start = period;
    while start > 0 {
        let p = chars[start - 1];
        if p.is_alphanumeric() || p == '.' {
            start -= 1;
        } else {
            break;
        }
    }
    if start == period {
        return false;
    }
    let token: String = chars[start..period]
        .iter()
        .collect::<String>()
        .to_lowercase();
    let token = token.trim_matches('.');
    ABBREVIATIONS.contains(&token)
}

/// Explode blocks into sentences with scoring metadata.
///
/// Headings and code blocks become a single sentence each; `global_index` is
/// dense over the whole document in order.
pub fn sentences_from_blocks(blocks: &[Block]) -> Vec<Sentence> {
    let total_blocks = blocks.len();
    let opts = TokenizeOptions::default();
    let mut out: Vec<Sentence> = Vec::new();
    for block in blocks {
        let texts: Vec<String> = match block.block_type {
            BlockType::P | BlockType::Li => split_sentences(&block.text),
            _ => vec![block.text.clone()],
        };
        let position = (block.index as f64 / total_blocks.saturating_sub(1).max(1) as f64)
            .clamp(0.0, 1.0);
        for (sentence_index, text) in texts.into_iter().enumerate() {
            out.push(Sentence {
                tokens: tokenize(&text, &opts),
                text,
                heading_path: block.heading_path.clone(),
                block_type: block.block_type,
                block_index: block.index,
                sentence_index,
                global_index: out.len(),
                position,
            });
        }
    }
    out
}
