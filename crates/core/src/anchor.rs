//! Anchor IDs for deep-linking into the content.
//!
//! IDs are derived only from the element sequence, so unchanged content
//! always yields the same IDs.

use std::collections::{HashMap, HashSet};

use crate::config::AnchorConfig;
use crate::element::ContentElement;
use crate::hierarchy::TocNode;

const FALLBACK_SLUG: &str = "section";

/// Assign a unique `anchor_id` to every node of the forest, in document order.
///
/// Existing element ids are kept when they are the first claim on that id.
/// Ids of elements outside the forest are never generated.
/// Everything else gets a slug of its text, suffixed `-2`, `-3`, ... on collision.
pub fn assign_anchors(nodes: &mut [TocNode], elements: &[ContentElement], config: &AnchorConfig) {
    let by_index: HashMap<u32, &ContentElement> =
        elements.iter().map(|e| (e.sequence_index, e)).collect();

    let mut order = Vec::new();
    collect_preorder(nodes, &mut order);

    // Every id on the page is taken, including ids of elements that did not
    // become nodes. The first element carrying an id owns it.
    let mut reserved: HashMap<&str, u32> = HashMap::new();
    for element in elements {
        if let Some(id) = element.existing_id.as_deref() {
            reserved.entry(id).or_insert(element.sequence_index);
        }
    }

    let mut used: HashSet<String> = reserved.keys().map(|id| id.to_string()).collect();
    let mut assigned: HashMap<u32, String> = HashMap::new();

    for index in &order {
        let element = by_index.get(index);
        let existing = element.and_then(|e| e.existing_id.as_deref());

        let id = match existing {
            Some(id) if reserved.get(id) == Some(index) => id.to_string(),
            _ => {
                let base = element
                    .map(|e| slugify(&e.raw_text, config.max_len))
                    .unwrap_or_else(|| FALLBACK_SLUG.to_string());
                let id = disambiguate(&base, &used);
                used.insert(id.clone());
                id
            }
        };
        assigned.insert(*index, id);
    }

    apply(nodes, &mut assigned);
}

fn collect_preorder(nodes: &[TocNode], order: &mut Vec<u32>) {
    for node in nodes {
        order.push(node.element_index);
        collect_preorder(&node.children, order);
    }
}

fn apply(nodes: &mut [TocNode], assigned: &mut HashMap<u32, String>) {
    for node in nodes {
        if let Some(id) = assigned.remove(&node.element_index) {
            node.anchor_id = id;
        }
        apply(&mut node.children, assigned);
    }
}

fn disambiguate(base: &str, used: &HashSet<String>) -> String {
    if !used.contains(base) {
        return base.to_string();
    }
    (2..)
        .map(|n| format!("{base}-{n}"))
        .find(|candidate| !used.contains(candidate))
        .unwrap_or_else(|| base.to_string())
}

/// Lowercase, collapse non-alphanumeric runs to `-`, trim, and cap the length.
pub fn slugify(text: &str, max_len: usize) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;

    for ch in text.chars().flat_map(char::to_lowercase) {
        if ch.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch);
        } else {
            pending_dash = true;
        }
    }

    let truncated: String = slug.chars().take(max_len).collect();
    let truncated = truncated.trim_end_matches('-');

    if truncated.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        truncated.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::TagKind;
    use crate::numbering::NumberingFamily;

    fn node(index: u32, children: Vec<TocNode>) -> TocNode {
        TocNode {
            label: String::new(),
            anchor_id: String::new(),
            depth: 1,
            element_index: index,
            family: NumberingFamily::None,
            children,
        }
    }

    fn element(index: u32, text: &str) -> ContentElement {
        ContentElement::new(TagKind::Paragraph, text, index)
    }

    fn ids(nodes: &[TocNode]) -> Vec<String> {
        let mut out = Vec::new();
        for n in nodes {
            out.push(n.anchor_id.clone());
            out.extend(ids(&n.children));
        }
        out
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("1.1 Background & Scope", 40), "1-1-background-scope");
        assert_eq!(slugify("  --Hello--  ", 40), "hello");
        assert_eq!(slugify("Café Résumé", 40), "café-résumé");
        assert_eq!(slugify("!!!", 40), "section");
        assert_eq!(slugify("", 40), "section");
    }

    #[test]
    fn test_slugify_truncates_without_trailing_dash() {
        assert_eq!(slugify("abcd efgh", 5), "abcd");
        assert_eq!(slugify(&"x".repeat(100), 40).len(), 40);
    }

    #[test]
    fn test_collisions_get_numeric_suffixes() {
        let elements = vec![element(0, "Notes"), element(1, "Notes"), element(2, "Notes")];
        let mut nodes = vec![node(0, vec![]), node(1, vec![]), node(2, vec![])];
        assign_anchors(&mut nodes, &elements, &AnchorConfig::default());

        assert_eq!(ids(&nodes), vec!["notes", "notes-2", "notes-3"]);
    }

    #[test]
    fn test_existing_ids_are_reused_and_reserved() {
        let elements = vec![
            element(0, "Intro"),
            element(1, "Other").with_existing_id("intro"),
        ];
        let mut nodes = vec![node(0, vec![]), node(1, vec![])];
        assign_anchors(&mut nodes, &elements, &AnchorConfig::default());

        assert_eq!(ids(&nodes), vec!["intro-2", "intro"]);
    }

    #[test]
    fn test_duplicate_existing_ids_are_disambiguated() {
        let elements = vec![
            element(0, "One").with_existing_id("dup"),
            element(1, "Two").with_existing_id("dup"),
        ];
        let mut nodes = vec![node(0, vec![]), node(1, vec![])];
        assign_anchors(&mut nodes, &elements, &AnchorConfig::default());

        assert_eq!(ids(&nodes), vec!["dup", "two"]);
    }

    #[test]
    fn test_ids_of_elements_outside_forest_are_reserved() {
        let elements = vec![
            element(0, "See the method below.").with_existing_id("2-method"),
            element(1, "1. Intro"),
            element(2, "2. Method"),
        ];
        let mut nodes = vec![node(1, vec![]), node(2, vec![])];
        assign_anchors(&mut nodes, &elements, &AnchorConfig::default());

        assert_eq!(ids(&nodes), vec!["1-intro", "2-method-2"]);
    }

    #[test]
    fn test_node_loses_id_claimed_by_earlier_element() {
        let elements = vec![
            element(0, "Preface").with_existing_id("intro"),
            element(1, "Intro").with_existing_id("intro"),
        ];
        let mut nodes = vec![node(1, vec![])];
        assign_anchors(&mut nodes, &elements, &AnchorConfig::default());

        assert_eq!(ids(&nodes), vec!["intro-2"]);
    }

    #[test]
    fn test_nested_nodes_in_document_order() {
        let elements = vec![element(0, "A"), element(1, "A"), element(2, "A")];
        let mut nodes = vec![node(0, vec![node(1, vec![])]), node(2, vec![])];
        assign_anchors(&mut nodes, &elements, &AnchorConfig::default());

        assert_eq!(nodes[0].anchor_id, "a");
        assert_eq!(nodes[0].children[0].anchor_id, "a-2");
        assert_eq!(nodes[1].anchor_id, "a-3");
    }

    #[test]
    fn test_assignment_is_stable() {
        let elements = vec![element(0, "Same"), element(1, "Same")];
        let mut first = vec![node(0, vec![]), node(1, vec![])];
        let mut second = first.clone();
        assign_anchors(&mut first, &elements, &AnchorConfig::default());
        assign_anchors(&mut second, &elements, &AnchorConfig::default());

        assert_eq!(first, second);
    }
}
