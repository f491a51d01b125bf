//! End-to-end synthesis: scan → classify → build → assign anchors.

use serde::{Deserialize, Serialize};

use crate::anchor::assign_anchors;
use crate::config::TocConfig;
use crate::diagnostics::Diagnostic;
use crate::element::ContentElement;
use crate::error::TocError;
use crate::hierarchy::{build, BuildMode, TocNode};
use crate::numbering::classify;
use crate::scan::scan_html;

/// The finished TOC of one synthesis run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TocOutput {
    pub mode: BuildMode,
    pub nodes: Vec<TocNode>,
    /// Number of candidate elements the scanner found.
    pub element_count: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

impl TocOutput {
    /// True when the host should render its "no sections found" state.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.iter().map(TocNode::node_count).sum()
    }

    /// Attach a diagnostic produced outside the pure pipeline (e.g. by the gate).
    pub fn push_diagnostic(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.insert(0, diagnostic);
    }
}

/// Synthesize a TOC from rendered HTML.
///
/// The container is selected with `config.scan.selector`. Only an invalid
/// selector is an error; empty or unstructured content yields an empty or
/// flat result.
pub fn synthesize(html: &str, config: &TocConfig) -> Result<TocOutput, TocError> {
    let elements = scan_html(html, &config.scan)?;
    Ok(synthesize_elements(elements, config))
}

/// Synthesize a TOC from already scanned elements.
pub fn synthesize_elements(elements: Vec<ContentElement>, config: &TocConfig) -> TocOutput {
    let element_count = elements.len();

    let classification = classify(elements, &config.numbering);
    let forest = build(&classification.elements, &config.build);

    let mut nodes = forest.nodes;
    let scanned: Vec<ContentElement> = classification
        .elements
        .into_iter()
        .map(|classified| classified.element)
        .collect();
    assign_anchors(&mut nodes, &scanned, &config.anchor);

    let mut diagnostics = classification.diagnostics;
    diagnostics.extend(forest.diagnostics);

    let output = TocOutput {
        mode: forest.mode,
        nodes,
        element_count,
        diagnostics,
    };

    log::info!(
        "synthesized {} TOC node(s) from {} element(s) in {:?} mode",
        output.node_count(),
        element_count,
        output.mode
    );

    output
}
