use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of block element a candidate was scanned from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagKind {
    Heading1,
    Heading2,
    Heading3,
    Heading4,
    Heading5,
    Heading6,
    Paragraph,
    Div,
    Other,
}

impl TagKind {
    /// Map an HTML tag name to its kind. Unknown tags map to `Other`.
    pub fn from_tag_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "h1" => TagKind::Heading1,
            "h2" => TagKind::Heading2,
            "h3" => TagKind::Heading3,
            "h4" => TagKind::Heading4,
            "h5" => TagKind::Heading5,
            "h6" => TagKind::Heading6,
            "p" => TagKind::Paragraph,
            "div" => TagKind::Div,
            _ => TagKind::Other,
        }
    }

    /// Heading level (1..=6) for heading kinds.
    pub fn heading_level(self) -> Option<u8> {
        match self {
            TagKind::Heading1 => Some(1),
            TagKind::Heading2 => Some(2),
            TagKind::Heading3 => Some(3),
            TagKind::Heading4 => Some(4),
            TagKind::Heading5 => Some(5),
            TagKind::Heading6 => Some(6),
            _ => None,
        }
    }

    pub fn is_heading(self) -> bool {
        self.heading_level().is_some()
    }
}

impl fmt::Display for TagKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagKind::Heading1 => write!(f, "H1"),
            TagKind::Heading2 => write!(f, "H2"),
            TagKind::Heading3 => write!(f, "H3"),
            TagKind::Heading4 => write!(f, "H4"),
            TagKind::Heading5 => write!(f, "H5"),
            TagKind::Heading6 => write!(f, "H6"),
            TagKind::Paragraph => write!(f, "P"),
            TagKind::Div => write!(f, "DIV"),
            TagKind::Other => write!(f, "OTHER"),
        }
    }
}

/// A candidate block element in document order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentElement {
    pub tag_kind: TagKind,
    /// Whitespace-normalized text, never empty.
    pub raw_text: String,
    /// 0-based position in the scanner output.
    pub sequence_index: u32,
    /// The element's own `id` attribute, when it has a non-blank one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub existing_id: Option<String>,
}

impl ContentElement {
    pub fn new(tag_kind: TagKind, raw_text: impl Into<String>, sequence_index: u32) -> Self {
        Self {
            tag_kind,
            raw_text: raw_text.into(),
            sequence_index,
            existing_id: None,
        }
    }

    pub fn with_existing_id(mut self, id: impl Into<String>) -> Self {
        self.existing_id = Some(id.into());
        self
    }
}

/// Collapse whitespace runs into single spaces and trim both ends.
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Truncate to at most `max_chars` characters, ending in `...` when cut.
pub fn truncate_label(text: &str, max_chars: usize) -> String {
    const ELLIPSIS: &str = "...";

    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    if max_chars <= ELLIPSIS.len() {
        return text.chars().take(max_chars).collect();
    }

    let kept: String = text.chars().take(max_chars - ELLIPSIS.len()).collect();
    format!("{}{}", kept.trim_end(), ELLIPSIS)
}
