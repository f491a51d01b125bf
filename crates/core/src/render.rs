//! Serializers for a finished TOC forest.
//!
//! The viewer turns these into clickable controls; each entry carries the
//! anchor it should scroll to.

use std::fmt::Write;

use crate::error::TocError;
use crate::hierarchy::TocNode;
use crate::toc::TocOutput;

/// Format TOC as indented text (2 spaces per level) with anchors
pub fn format_toc_indented(nodes: &[TocNode]) -> String {
    let mut lines = Vec::new();
    walk(nodes, &mut |node| {
        let indent = "  ".repeat(usize::from(node.depth.saturating_sub(1)));
        lines.push(format!("{}{}  [#{}]", indent, node.label, node.anchor_id));
    });
    lines.join("\n")
}

/// Format TOC as markdown nested list of anchor links
pub fn format_toc_markdown(nodes: &[TocNode]) -> String {
    let mut lines = Vec::new();
    walk(nodes, &mut |node| {
        let indent = "  ".repeat(usize::from(node.depth.saturating_sub(1)));
        let label = node.label.replace('[', "\\[").replace(']', "\\]");
        lines.push(format!("{}* [{}](#{})", indent, label, node.anchor_id));
    });
    lines.join("\n")
}

/// Format TOC as a navigation list for the document viewer.
pub fn format_toc_html(nodes: &[TocNode]) -> String {
    let mut html = String::new();
    write_html_list(nodes, "nav-list", 0, &mut html);
    html
}

/// Formats TOC output as JSON string
pub fn format_toc_json(output: &TocOutput) -> Result<String, TocError> {
    Ok(serde_json::to_string_pretty(output)?)
}

fn write_html_list(nodes: &[TocNode], class: &str, level: usize, html: &mut String) {
    let pad = "  ".repeat(level * 2);
    // Writing into a String cannot fail.
    let _ = writeln!(html, "{pad}<ul class=\"{class}\">");
    for node in nodes {
        let _ = write!(
            html,
            "{pad}  <li class=\"nav-item\"><a href=\"#{}\" class=\"nav-link\">{}</a>",
            html_escape::encode_double_quoted_attribute(&node.anchor_id),
            html_escape::encode_text(&node.label),
        );
        if node.children.is_empty() {
            html.push_str("</li>\n");
        } else {
            html.push('\n');
            write_html_list(&node.children, "nav-sublist", level + 1, html);
            let _ = writeln!(html, "{pad}  </li>");
        }
    }
    let _ = writeln!(html, "{pad}</ul>");
}

fn walk<'a>(nodes: &'a [TocNode], visit: &mut impl FnMut(&'a TocNode)) {
    for node in nodes {
        visit(node);
        walk(&node.children, visit);
    }
}
