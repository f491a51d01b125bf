//! Core library for tocsmith
//!
//! This crate implements the **Functional Core** of the tocsmith application,
//! following the Functional Core - Imperative Shell architectural pattern.
//!
//! # Architecture Overview
//!
//! - **`tocsmith_core`** (this crate): Pure transformation functions with zero I/O
//! - **`tocsmith`**: File and browser access, the readiness poll loop, and the CLI
//!
//! Everything here is deterministic: the same HTML and configuration always
//! produce the same TOC, labels and anchor IDs included.
//!
//! # Pipeline
//!
//! - [`readiness`]: Evaluates whether a container snapshot is safe to scan
//! - [`scan`]: Flattens rendered HTML into candidate block elements
//! - [`numbering`]: Recognizes decimal, Roman and letter outline markers
//! - [`hierarchy`]: Builds the TOC forest, with a flat fallback
//! - [`anchor`]: Assigns unique, stable anchor IDs
//! - [`render`]: Serializes the forest for display
//!
//! # Example Usage
//!
//! ```rust
//! use tocsmith_core::{synthesize, TocConfig};
//!
//! let html = "<h1>1. Intro</h1><h2>1.1 Background</h2><h1>2. Method</h1>";
//! let output = synthesize(html, &TocConfig::default()).unwrap();
//!
//! assert_eq!(output.nodes.len(), 2);
//! assert_eq!(output.nodes[0].children[0].anchor_id, "1-1-background");
//! ```

pub mod anchor;
pub mod config;
pub mod diagnostics;
pub mod element;
pub mod error;
pub mod hierarchy;
pub mod numbering;
pub mod readiness;
pub mod render;
pub mod scan;
pub mod toc;

pub use config::TocConfig;
pub use diagnostics::Diagnostic;
pub use error::TocError;
pub use hierarchy::{BuildMode, TocNode};
pub use toc::{synthesize, synthesize_elements, TocOutput};
