//! HTML preprocessing: strip non-content, remove boilerplate with
//! main-content protection, locate the main container, and remove UI widgets
//! inside it.
//!
//! `scraper`'s DOM is immutable, so "removal" is an exclusion set of node ids.
//! Every later walk (including the segmenter) skips excluded subtrees; the
//! observable contract is the same as destructive DOM surgery, and the set
//! makes each stage's effect inspectable in tests.

use regex::Regex;
use ego_tree::NodeId;
use scraper::{ElementRef, Html, Node, Selector};
use std::collections::HashSet;
use std::sync::LazyLock;

/// Element kinds that can never carry content: scripts, styles, media, form
/// controls, vector/canvas surfaces.
static STRIP_TAGS: &[&str] = &[
    "script", "style", "link", "img", "iframe", "audio", "video", "embed", "object", "input",
    "select", "textarea", "button", "label", "fieldset", "legend", "output", "progress", "meter",
    "noscript", "svg", "canvas", "map", "area",
];

static BOILERPLATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:nav|navigation|footer|header|sidebar|menu|breadcrumbs?|cookie|consent|banner|adverts?|advertisements?|ads?|social|share|comments?|related|recommend|recommended|recommendations?|popup|modal|newsletter|subscribe|signup|login|signin|search|widgets?|toolbar|promo)\b",
    )
    .expect("boilerplate pattern")
});

static UI_PATTERN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:copy|share|clipboard|open-in|feedback|edit-page|edit-this-page|page-actions|action-menu|action-button|action-bar|actions|toc|table-of-contents|on-this-page|sticky|floating|anchor-link|heading-link|tabs|tablist)\b",
    )
    .expect("ui pattern")
});

/// Anchored patterns for short UI-control captions; applied to lowercased,
/// whitespace-normalized element text under 50 chars.
static UI_TEXT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:copy(?: as \w+)?|open in \w+(?: .*)?|(?:share|copy)(?: (?:this|link|page))?|edit(?: this)?(?: page| on github)?|(?:give )?feedback|(?:scroll to )?top|on this page|table of contents)$",
    )
    .expect("ui text pattern")
});

/// Class-name substrings that identify copy/share chrome regardless of text.
static UI_CLASS_SUBSTRINGS: &[&str] = &[
    "copy-button",
    "share-button",
    "actionmenu",
    "pageactions",
    "anchor-link",
    "heading-link",
    "sticky",
];

static SEL_PROTECTED: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("main, article, [role=\"main\"]").expect("static selector"));
static SEL_TITLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("title").expect("static selector"));
static SEL_BODY: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("body").expect("static selector"));

/// Fallback container selectors, tried after `<main>`/`<article>`.
static CANDIDATE_SELECTORS: &[&str] = &[
    "[role=\"main\"]",
    "#content",
    "#main-content",
    ".content",
    ".main-content",
    ".post-content",
    ".article-content",
    ".entry-content",
];

/// A parsed document plus the exclusion set and located main container.
pub struct Preprocessed {
    pub html: Html,
    pub(crate) removed: HashSet<NodeId>,
    pub main: Option<NodeId>,
    /// Selector-ish description of the chosen container ("main", "article",
    /// "#content", "body > div:nth-child(2)", ...). Empty when none.
    pub main_selector: String,
    pub title: Option<String>,
}

impl Preprocessed {
    pub fn is_removed(&self, id: NodeId) -> bool {
        self.removed.contains(&id)
    }

    pub fn main_element(&self) -> Option<ElementRef<'_>> {
        let id = self.main?;
        self.html.tree.get(id).and_then(ElementRef::wrap)
    }
}

/// Run all four preprocessing stages over raw HTML.
pub fn preprocess(raw_html: &str) -> Preprocessed {
    let html = Html::parse_document(raw_html);
    let mut removed: HashSet<NodeId> = HashSet::new();

    let title = html.select(&SEL_TITLE).next().map(|el| {
        el.text()
            .collect::<Vec<_>>()
            .join(" ")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    });
    let title = title.filter(|t| !t.is_empty());

    strip_non_content(&html, &mut removed);
    remove_boilerplate(&html, &mut removed);
    let (main, main_selector) = locate_main(&html, &removed);
    if let Some(main_id) = main {
        remove_ui_widgets(&html, main_id, &mut removed);
    }

    Preprocessed {
        html,
        removed,
        main,
        main_selector,
        title,
    }
}

fn strip_non_content(html: &Html, removed: &mut HashSet<NodeId>) {
    for node in html.tree.root().descendants() {
        if let Node::Element(el) = node.value() {
            if STRIP_TAGS.contains(&el.name()) {
                removed.insert(node.id());
            }
        }
    }
}

fn id_class_attr(el: &scraper::node::Element) -> String {
    let mut s = String::new();
    if let Some(id) = el.attr("id") {
        s.push_str(id);
    }
    s.push(' ');
    if let Some(class) = el.attr("class") {
        s.push_str(class);
    }
    s
}

fn remove_boilerplate(html: &Html, removed: &mut HashSet<NodeId>) {
    // Protection: nothing inside <main>/<article>/[role=main] (and no ancestor
    // of such a container) may be removed by this stage.
    let mut protected: HashSet<NodeId> = HashSet::new();
    let mut protected_ancestors: HashSet<NodeId> = HashSet::new();
    for root in html.select(&SEL_PROTECTED) {
        for node in root.descendants() {
            protected.insert(node.id());
        }
        let mut up = root.parent();
        while let Some(node) = up {
            protected_ancestors.insert(node.id());
            up = node.parent();
        }
    }
    let shielded = |id: NodeId| protected.contains(&id) || protected_ancestors.contains(&id);

    for node in html.tree.root().descendants() {
        let Node::Element(el) = node.value() else {
            continue;
        };
        let id = node.id();
        if shielded(id) {
            continue;
        }
        // The document roots stay even when their classes look like chrome.
        if matches!(el.name(), "html" | "body" | "head") {
            continue;
        }
        if matches!(el.name(), "nav" | "footer" | "aside" | "header") {
            removed.insert(id);
            continue;
        }
        if BOILERPLATE_RE.is_match(&id_class_attr(el)) {
            removed.insert(id);
        }
    }
}

/// Characters of text under `node`, excluding removed subtrees.
fn text_chars(node: ego_tree::NodeRef<'_, Node>, removed: &HashSet<NodeId>) -> usize {
    let mut count = 0;
    for child in node.children() {
        if removed.contains(&child.id()) {
            continue;
        }
        match child.value() {
            Node::Text(t) => count += t.chars().count(),
            Node::Element(_) => count += text_chars(child, removed),
            _ => {}
        }
    }
    count
}

/// Characters of text under `<a>` descendants, excluding removed subtrees.
fn link_text_chars(node: ego_tree::NodeRef<'_, Node>, removed: &HashSet<NodeId>) -> usize {
    let mut count = 0;
    for child in node.children() {
        if removed.contains(&child.id()) {
            continue;
        }
        if let Node::Element(el) = child.value() {
            if el.name() == "a" {
                count += text_chars(child, removed);
            } else {
                count += link_text_chars(child, removed);
            }
        }
    }
    count
}

fn collect_raw_text(
    node: ego_tree::NodeRef<'_, Node>,
    removed: &HashSet<NodeId>,
    out: &mut String,
) {
    for child in node.children() {
        if removed.contains(&child.id()) {
            continue;
        }
        match child.value() {
            Node::Text(t) => out.push_str(&t),
            Node::Element(_) => collect_raw_text(child, removed, out),
            _ => {}
        }
    }
}

/// Whitespace-normalized text of a node, excluding removed subtrees.
pub(crate) fn normalized_text(
    node: ego_tree::NodeRef<'_, Node>,
    removed: &HashSet<NodeId>,
) -> String {
    let mut raw = String::new();
    collect_raw_text(node, removed, &mut raw);
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn locate_main(html: &Html, removed: &HashSet<NodeId>) -> (Option<NodeId>, String) {
    let first_not_removed = |tag: &str| -> Option<NodeId> {
        let sel = Selector::parse(tag).ok()?;
        html.select(&sel)
            .map(|el| el.id())
            .find(|id| !removed.contains(id))
    };

    if let Some(id) = first_not_removed("main") {
        return (Some(id), "main".to_string());
    }
    if let Some(id) = first_not_removed("article") {
        return (Some(id), "article".to_string());
    }

    struct Candidate {
        selector: String,
        id: NodeId,
        score: i64,
        ordinal: usize,
    }

    let mut candidates: Vec<Candidate> = Vec::new();
    let mut seen: HashSet<NodeId> = HashSet::new();
    let mut ordinal = 0usize;

    if let Some(body) = html.select(&SEL_BODY).next() {
        let mut nth = 0usize;
        for child in body.children() {
            let Node::Element(el) = child.value() else {
                continue;
            };
            nth += 1;
            if removed.contains(&child.id()) {
                continue;
            }
            if seen.insert(child.id()) {
                candidates.push(Candidate {
                    selector: format!("body > {}:nth-child({nth})", el.name()),
                    id: child.id(),
                    score: 0,
                    ordinal,
                });
                ordinal += 1;
            }
        }
    }
    for sel_str in CANDIDATE_SELECTORS {
        let Ok(sel) = Selector::parse(sel_str) else {
            continue;
        };
        for el in html.select(&sel) {
            if removed.contains(&el.id()) {
                continue;
            }
            if seen.insert(el.id()) {
                candidates.push(Candidate {
                    selector: (*sel_str).to_string(),
                    id: el.id(),
                    score: 0,
                    ordinal,
                });
                ordinal += 1;
            }
        }
    }

    for cand in &mut candidates {
        if let Some(node) = html.tree.get(cand.id) {
            let txt = text_chars(node, removed) as i64;
            let link = link_text_chars(node, removed) as i64;
            cand.score = txt - 2 * link;
        }
    }

    // Highest score wins; ties break on the selector string, then document
    // order, so the choice is total.
    candidates.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| a.selector.cmp(&b.selector))
            .then_with(|| a.ordinal.cmp(&b.ordinal))
    });

    match candidates.first() {
        Some(c) => (Some(c.id), c.selector.clone()),
        None => (None, String::new()),
    }
}

fn count_anchor_descendants(
    node: ego_tree::NodeRef<'_, Node>,
    removed: &HashSet<NodeId>,
) -> usize {
    let mut count = 0;
    for child in node.children() {
        if removed.contains(&child.id()) {
            continue;
        }
        if let Node::Element(el) = child.value() {
            if el.name() == "a" {
                count += 1;
            }
            count += count_anchor_descendants(child, removed);
        }
    }
    count
}

fn remove_ui_widgets(html: &Html, main_id: NodeId, removed: &mut HashSet<NodeId>) {
    let Some(main) = html.tree.get(main_id) else {
        return;
    };

    // Collect first, insert after: the walk reads the removal set it mutates.
    let mut to_remove: Vec<NodeId> = Vec::new();
    walk_ui(main, removed, &mut to_remove);
    removed.extend(to_remove);
}

fn walk_ui(
    node: ego_tree::NodeRef<'_, Node>,
    removed: &HashSet<NodeId>,
    to_remove: &mut Vec<NodeId>,
) {
    for child in node.children() {
        if removed.contains(&child.id()) {
            continue;
        }
        let Node::Element(el) = child.value() else {
            continue;
        };
        if is_ui_widget(child, el, removed) {
            to_remove.push(child.id());
            continue;
        }
        walk_ui(child, removed, to_remove);
    }
}

fn is_ui_widget(
    node: ego_tree::NodeRef<'_, Node>,
    el: &scraper::node::Element,
    removed: &HashSet<NodeId>,
) -> bool {
    if UI_PATTERN_RE.is_match(&id_class_attr(el)) {
        return true;
    }
    if let Some(role) = el.attr("role") {
        if matches!(role.trim(), "tab" | "tablist") {
            return true;
        }
    }
    if el.attr("data-copy").is_some() || el.attr("data-clipboard").is_some() {
        return true;
    }
    if let Some(label) = el.attr("aria-label") {
        let l = label.to_ascii_lowercase();
        if l.contains("copy") || l.contains("share") {
            return true;
        }
    }
    if let Some(title) = el.attr("title") {
        let t = title.to_ascii_lowercase();
        if t.contains("copy") || t.contains("share") {
            return true;
        }
    }
    if let Some(class) = el.attr("class") {
        let c = class.to_ascii_lowercase();
        if UI_CLASS_SUBSTRINGS.iter().any(|s| c.contains(s)) {
            return true;
        }
    }

    let name = el.name();
    if matches!(name, "button" | "a" | "span" | "div") {
        let text = normalized_text(node, removed).to_lowercase();
        if !text.is_empty() && text.chars().count() < 50 && UI_TEXT_RE.is_match(&text) {
            return true;
        }
    }

    // Link-heavy runs of short text are in-content navigation, not prose.
    if matches!(name, "p" | "div" | "span") {
        let anchors = count_anchor_descendants(node, removed);
        if anchors >= 3 {
            let total = text_chars(node, removed);
            let linked = link_text_chars(node, removed);
            if total < 200 && linked as f64 > 0.8 * total as f64 {
                return true;
            }
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_scripts_and_form_controls() {
        let pre = preprocess(
            "<html><body><main><p>Keep me.</p><script>var x=1;</script>\
             <button>Click</button></main></body></html>",
        );
        let main = pre.main_element().expect("main located");
        let text = normalized_text(*main, &pre.removed);
        assert_eq!(text, "Keep me.");
    }

    #[test]
    fn prefers_main_over_article() {
        let pre = preprocess(
            "<html><body><article><p>article text</p></article>\
             <main><p>main text</p></main></body></html>",
        );
        assert_eq!(pre.main_selector, "main");
    }

    #[test]
    fn protected_nav_inside_main_survives() {
        let pre = preprocess(
            "<html><body>\
             <nav><a href=\"/\">Top nav</a></nav>\
             <main><nav class=\"local-jump\"><p>In-main nav</p></nav><p>Body.</p></main>\
             </body></html>",
        );
        let main = pre.main_element().expect("main located");
        let text = normalized_text(*main, &pre.removed);
        assert!(
            text.contains("In-main nav"),
            "protected nav must survive boilerplate removal; got {text:?}"
        );
        // The unprotected top-level nav is gone.
        let body = pre.html.select(&SEL_BODY).next().unwrap();
        let all = normalized_text(*body, &pre.removed);
        assert!(!all.contains("Top nav"), "got {all:?}");
    }

    #[test]
    fn boilerplate_classes_removed_outside_protection() {
        let pre = preprocess(
            "<html><body><div id=\"content\">\
             <div class=\"cookie-banner\">We use cookies</div>\
             <p>Real content paragraph with enough text to win.</p>\
             </div></body></html>",
        );
        let main = pre.main_element().expect("container located");
        let text = normalized_text(*main, &pre.removed);
        assert!(!text.contains("cookies"), "got {text:?}");
        assert!(text.contains("Real content"), "got {text:?}");
    }

    #[test]
    fn candidate_scoring_penalizes_link_text() {
        let pre = preprocess(
            "<html><body>\
             <div id=\"x1\"><a href=\"/a\">link link link link link link link link</a></div>\
             <div id=\"x2\"><p>plain prose of a similar length overall here</p></div>\
             </body></html>",
        );
        assert!(
            pre.main_selector.contains("nth-child(2)"),
            "expected the prose div to win; got {:?}",
            pre.main_selector
        );
    }

    #[test]
    fn no_candidates_yields_none() {
        let pre = preprocess("<html><head><title>t</title></head><body></body></html>");
        assert!(pre.main.is_none());
        assert_eq!(pre.main_selector, "");
    }

    #[test]
    fn ui_text_buttons_removed_inside_main() {
        let pre = preprocess(
            "<html><body><main>\
             <p>Some documentation text here.</p>\
             <div>Copy</div><span>Open in Playground</span><a href=\"#\">Edit on GitHub</a>\
             </main></body></html>",
        );
        let main = pre.main_element().unwrap();
        let text = normalized_text(*main, &pre.removed);
        assert_eq!(text, "Some documentation text here.");
    }

    #[test]
    fn link_heavy_paragraph_removed() {
        let pre = preprocess(
            "<html><body><main>\
             <p><a href=\"1\">One</a> <a href=\"2\">Two</a> <a href=\"3\">Three</a></p>\
             <p>An actual paragraph of content.</p>\
             </main></body></html>",
        );
        let main = pre.main_element().unwrap();
        let text = normalized_text(*main, &pre.removed);
        assert_eq!(text, "An actual paragraph of content.");
    }

    #[test]
    fn captures_document_title() {
        let pre = preprocess(
            "<html><head><title>  Doc   Title </title></head><body><main><p>x</p></main></body></html>",
        );
        assert_eq!(pre.title.as_deref(), Some("Doc Title"));
    }
}
