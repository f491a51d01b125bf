//! Hierarchy builder: turns classified elements into a TOC forest.

use serde::{Deserialize, Serialize};

use crate::config::BuildConfig;
use crate::diagnostics::Diagnostic;
use crate::element::truncate_label;
use crate::numbering::{ClassifiedElement, NumberingFamily};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TocNode {
    pub label: String,
    /// Filled in by [`crate::anchor::assign_anchors`].
    pub anchor_id: String,
    /// Tree depth, 1 for roots.
    pub depth: u8,
    /// `sequence_index` of the element this node points at.
    pub element_index: u32,
    pub family: NumberingFamily,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TocNode>,
}

impl TocNode {
    fn new(label: String, element_index: u32, family: NumberingFamily) -> Self {
        Self {
            label,
            anchor_id: String::new(),
            depth: 1,
            element_index,
            family,
            children: Vec::new(),
        }
    }

    /// Number of nodes in this subtree, including `self`.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(TocNode::node_count).sum::<usize>()
    }
}

/// Which strategy produced the forest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildMode {
    Numbered,
    Fallback,
    HeadingOutline,
    Empty,
}

#[derive(Debug, Clone)]
pub struct Forest {
    pub mode: BuildMode,
    pub nodes: Vec<TocNode>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Build the TOC forest from the classifier output.
///
/// Numbered mode is used as soon as one element carries numbering. A
/// numbered pass that yields nothing falls back to the flat list.
pub fn build(classified: &[ClassifiedElement], config: &BuildConfig) -> Forest {
    let mut diagnostics = Vec::new();

    if classified.is_empty() {
        let diagnostic = Diagnostic::EmptyContent;
        diagnostic.log();
        diagnostics.push(diagnostic);
        return Forest {
            mode: BuildMode::Empty,
            nodes: Vec::new(),
            diagnostics,
        };
    }

    let numbered_elements = classified.iter().filter(|c| c.token.is_numbered()).count();

    if numbered_elements > 0 {
        let nodes = build_numbered(classified, config);
        if !nodes.is_empty() {
            return Forest {
                mode: BuildMode::Numbered,
                nodes,
                diagnostics,
            };
        }
        let diagnostic = Diagnostic::DegenerateTree { numbered_elements };
        diagnostic.log();
        diagnostics.push(diagnostic);
    } else if config.heading_outline {
        let nodes = build_heading_outline(classified, config);
        if !nodes.is_empty() {
            return Forest {
                mode: BuildMode::HeadingOutline,
                nodes,
                diagnostics,
            };
        }
    }

    Forest {
        mode: BuildMode::Fallback,
        nodes: build_fallback(classified, config),
        diagnostics,
    }
}

fn build_numbered(classified: &[ClassifiedElement], config: &BuildConfig) -> Vec<TocNode> {
    let items = classified
        .iter()
        // Bare markers ("12" on its own) are page numbers, not sections.
        .filter(|c| c.token.is_numbered() && !c.token.label.is_empty())
        .map(|c| {
            let node = TocNode::new(
                truncate_label(&c.element.raw_text, config.max_label_chars),
                c.element.sequence_index,
                c.token.family,
            );
            (c.token.depth, node)
        });
    nest(items)
}

fn build_heading_outline(classified: &[ClassifiedElement], config: &BuildConfig) -> Vec<TocNode> {
    let items = classified.iter().filter_map(|c| {
        let level = c.element.tag_kind.heading_level()?;
        let node = TocNode::new(
            truncate_label(&c.element.raw_text, config.max_label_chars),
            c.element.sequence_index,
            NumberingFamily::None,
        );
        Some((level, node))
    });
    nest(items)
}

fn build_fallback(classified: &[ClassifiedElement], config: &BuildConfig) -> Vec<TocNode> {
    classified
        .iter()
        .filter(|c| !c.element.raw_text.is_empty())
        .map(|c| {
            let label = format!("[{}] {}", c.element.tag_kind, c.element.raw_text);
            TocNode::new(
                truncate_label(&label, config.max_label_chars),
                c.element.sequence_index,
                NumberingFamily::None,
            )
        })
        .collect()
}

/// Stack-based nesting keyed by the source depth (numbering depth or
/// heading level). Node depth is the stack height, so a jump from "1" to
/// "1.1.1" still yields a child at depth 2.
fn nest(items: impl Iterator<Item = (u8, TocNode)>) -> Vec<TocNode> {
    let mut stack: Vec<(u8, TocNode)> = Vec::new();
    let mut roots: Vec<TocNode> = Vec::new();

    for (key, mut node) in items {
        while stack.last().is_some_and(|(top, _)| *top >= key) {
            close_top(&mut stack, &mut roots);
        }
        node.depth = stack.len() as u8 + 1;
        stack.push((key, node));
    }

    while !stack.is_empty() {
        close_top(&mut stack, &mut roots);
    }

    roots
}

fn close_top(stack: &mut Vec<(u8, TocNode)>, roots: &mut Vec<TocNode>) {
    if let Some((_, finished)) = stack.pop() {
        match stack.last_mut() {
            Some((_, parent)) => parent.children.push(finished),
            None => roots.push(finished),
        }
    }
}
