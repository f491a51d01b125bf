//! Element scanner: flattens rendered HTML into candidate blocks.

use scraper::{ElementRef, Html, Node, Selector as CssSelector};

use crate::config::ScanConfig;
use crate::element::{normalize_text, ContentElement, TagKind};
use crate::error::TocError;

/// Subtrees that never contribute text.
const SKIPPED_TAGS: &[&str] = &["script", "style", "noscript", "template", "head"];

/// Block-level tags. Their text belongs to themselves, not to the enclosing block.
const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "details", "dialog", "dd", "div", "dl", "dt",
    "fieldset", "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6",
    "header", "hgroup", "hr", "li", "main", "nav", "ol", "p", "pre", "section", "table", "tbody",
    "td", "tfoot", "th", "thead", "tr", "ul",
];

/// Scan `html` and return candidate elements in document order.
///
/// When `config.selector` is set, only the first matching element is
/// scanned; no match yields an empty list.
pub fn scan_html(html: &str, config: &ScanConfig) -> Result<Vec<ContentElement>, TocError> {
    let document = Html::parse_document(html);

    let root = match config.selector.as_deref() {
        Some(selector_str) => {
            let selector =
                CssSelector::parse(selector_str).map_err(|e| TocError::InvalidSelector {
                    selector: selector_str.to_string(),
                    reason: format!("{e:?}"),
                })?;
            match document.select(&selector).next() {
                Some(element) => element,
                None => {
                    log::debug!("selector '{selector_str}' matched nothing");
                    return Ok(Vec::new());
                }
            }
        }
        None => document.root_element(),
    };

    let mut scanner = Scanner {
        extra_tags: config
            .extra_tags
            .iter()
            .map(|tag| tag.to_ascii_lowercase())
            .collect(),
        elements: Vec::new(),
    };
    scanner.walk(root);

    log::debug!("scanner found {} candidate element(s)", scanner.elements.len());
    Ok(scanner.elements)
}

struct Scanner {
    extra_tags: Vec<String>,
    elements: Vec<ContentElement>,
}

impl Scanner {
    fn walk(&mut self, element: ElementRef<'_>) {
        let name = element.value().name();
        if SKIPPED_TAGS.contains(&name) {
            return;
        }

        if let Some(tag_kind) = self.candidate_kind(name) {
            let text = normalize_text(&inline_text(element));
            if !text.is_empty() {
                let sequence_index = self.elements.len() as u32;
                let mut candidate = ContentElement::new(tag_kind, text, sequence_index);
                if let Some(id) = element.value().attr("id").map(str::trim) {
                    if !id.is_empty() {
                        candidate = candidate.with_existing_id(id);
                    }
                }
                self.elements.push(candidate);
            }
        }

        for child in element.children() {
            if let Some(child) = ElementRef::wrap(child) {
                self.walk(child);
            }
        }
    }

    fn candidate_kind(&self, name: &str) -> Option<TagKind> {
        match TagKind::from_tag_name(name) {
            TagKind::Other if self.extra_tags.iter().any(|tag| tag == name) => Some(TagKind::Other),
            TagKind::Other => None,
            kind => Some(kind),
        }
    }
}

/// Text owned by `element`: its text nodes and inline descendants, without
/// nested block elements.
fn inline_text(element: ElementRef<'_>) -> String {
    let mut out = String::new();
    collect_inline(element, &mut out);
    out
}

fn collect_inline(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) => {
                let name = el.name();
                if name == "br" {
                    out.push(' ');
                    continue;
                }
                if SKIPPED_TAGS.contains(&name) || BLOCK_TAGS.contains(&name) {
                    // Keep words on either side of the block apart.
                    out.push(' ');
                    continue;
                }
                if let Some(inline) = ElementRef::wrap(child) {
                    collect_inline(inline, out);
                }
            }
            _ => {}
        }
    }
}
