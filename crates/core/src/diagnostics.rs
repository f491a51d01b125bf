//! Advisory events emitted while synthesizing a TOC.
//!
//! Diagnostics never change control flow. They are collected into the
//! output so hosts can surface them, and mirrored to the `log` facade.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::numbering::NumberingFamily;
use crate::readiness::ReadinessState;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// The readiness gate hit its ceiling; the content was analyzed best-effort.
    ReadinessTimeout {
        last_state: ReadinessState,
        elapsed_ms: u64,
    },
    /// No candidate elements were found.
    EmptyContent,
    /// A single-character marker could be a Roman numeral or a letter.
    AmbiguousNumbering {
        sequence_index: u32,
        token: String,
        resolved: NumberingFamily,
    },
    /// Numbering was detected but produced no nodes; the flat list was used.
    DegenerateTree { numbered_elements: usize },
}

impl Diagnostic {
    /// Mirror the diagnostic to the logging facade.
    pub fn log(&self) {
        match self {
            Diagnostic::AmbiguousNumbering { .. } => log::debug!("{self}"),
            _ => log::warn!("{self}"),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::ReadinessTimeout {
                last_state,
                elapsed_ms,
            } => write!(
                f,
                "content not ready after {elapsed_ms} ms (last state: {last_state}), proceeding best-effort"
            ),
            Diagnostic::EmptyContent => write!(f, "no sections found"),
            Diagnostic::AmbiguousNumbering {
                sequence_index,
                token,
                resolved,
            } => write!(
                f,
                "element #{sequence_index}: marker '{token}' is ambiguous, resolved as {resolved}"
            ),
            Diagnostic::DegenerateTree { numbered_elements } => write!(
                f,
                "{numbered_elements} numbered element(s) produced no sections, using flat list"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        assert_eq!(Diagnostic::EmptyContent.to_string(), "no sections found");

        let ambiguous = Diagnostic::AmbiguousNumbering {
            sequence_index: 3,
            token: "I".to_string(),
            resolved: NumberingFamily::Roman,
        };
        assert!(ambiguous.to_string().contains("'I'"));
        assert!(ambiguous.to_string().contains("roman"));
    }

    #[test]
    fn test_serializes_with_kind_tag() {
        let json = serde_json::to_string(&Diagnostic::DegenerateTree {
            numbered_elements: 2,
        })
        .unwrap();
        assert!(json.contains("\"kind\":\"degenerate_tree\""));
        assert!(json.contains("\"numbered_elements\":2"));
    }
}
