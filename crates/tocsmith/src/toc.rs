use crate::prelude::{eprintln, println, *};
use std::io::IsTerminal;
use std::path::Path;
use std::time::Instant;

use tocsmith_core::render::{
    format_toc_html, format_toc_indented, format_toc_json, format_toc_markdown,
};
use tocsmith_core::{synthesize, TocOutput};

use crate::settings::SourceOptions;
use crate::source::{acquire, container_config};

#[derive(Debug, Clone, clap::Args)]
pub struct TocOptions {
    #[clap(flatten)]
    pub source: SourceOptions,

    /// Output format: indented, markdown, json, or html (default: indented)
    #[arg(long, env = "TOCSMITH_OUTPUT", default_value = "indented")]
    pub output: OutputFormat,

    /// Output as JSON (alias for --output json)
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, clap::ValueEnum, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Indented text format (2 spaces per level)
    Indented,
    /// Markdown nested list of anchor links
    Markdown,
    /// JSON format with structured data
    Json,
    /// Navigation list markup for a document viewer
    Html,
}

/// What the header reports about a run.
#[derive(Debug)]
struct RunSummary<'a> {
    source: &'a str,
    selector: Option<&'a str>,
    elapsed_ms: u64,
}

pub async fn run(options: TocOptions, global: crate::Global) -> Result<()> {
    let start = Instant::now();
    let config = options.source.resolve(global.config.as_deref().map(Path::new))?;

    let Some(acquired) = acquire(&options.source.source, &config).await? else {
        eprintln!("Cancelled.");
        return Ok(());
    };

    let mut output = synthesize(&acquired.html, &container_config(&config))?;
    if let Some(diagnostic) = acquired.diagnostic {
        output.push_diagnostic(diagnostic);
    }
    for diagnostic in &output.diagnostics {
        diagnostic.log();
    }

    // --json takes precedence
    let format = if options.json {
        OutputFormat::Json
    } else {
        options.output.clone()
    };

    let summary = RunSummary {
        source: &options.source.source,
        selector: config.scan.selector.as_deref(),
        elapsed_ms: u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
    };

    match format {
        OutputFormat::Json => println!("{}", format_toc_json(&output)?),
        _ => output_formatted(&output, &format, &summary, global.verbose),
    }

    Ok(())
}

fn format_content(output: &TocOutput, format: &OutputFormat) -> String {
    match format {
        OutputFormat::Indented => format_toc_indented(&output.nodes),
        OutputFormat::Markdown => format_toc_markdown(&output.nodes),
        OutputFormat::Html => format_toc_html(&output.nodes),
        OutputFormat::Json => unreachable!("JSON format handled separately"),
    }
}

/// Metadata block printed to stderr on a terminal.
fn format_output_text(output: &TocOutput, summary: &RunSummary, verbose: bool) -> String {
    use colored::Colorize;

    let mut result = String::new();

    result.push_str(&format!("\n{}\n", "=".repeat(80).bright_cyan()));
    result.push_str(&format!("{}\n", "TABLE OF CONTENTS".bright_cyan().bold()));
    result.push_str(&format!("{}\n", "=".repeat(80).bright_cyan()));

    result.push_str(&format!(
        "\n{}: {}\n",
        "Source".green(),
        summary.source.cyan().underline()
    ));

    if let Some(selector) = summary.selector {
        result.push_str(&format!(
            "{}: {}\n",
            "CSS Selector".green(),
            selector.bright_white().bold()
        ));
    }

    result.push_str(&format!(
        "{}: {}\n",
        "Mode".green(),
        format!("{:?}", output.mode).to_lowercase().bright_white()
    ));
    result.push_str(&format!(
        "{}: {}\n",
        "Elements Scanned".green(),
        output.element_count.to_string().bright_yellow().bold()
    ));
    result.push_str(&format!(
        "{}: {}\n",
        "Entries".green(),
        output.node_count().to_string().bright_yellow().bold()
    ));
    result.push_str(&format!(
        "{}: {}\n",
        "Time".green(),
        format!("{} ms", summary.elapsed_ms).bright_yellow()
    ));

    let shown: Vec<_> = output
        .diagnostics
        .iter()
        .filter(|d| verbose || !matches!(d, tocsmith_core::Diagnostic::AmbiguousNumbering { .. }))
        .collect();
    if !shown.is_empty() {
        result.push('\n');
        for diagnostic in shown {
            result.push_str(&format!("{} {}\n", "warning:".yellow().bold(), diagnostic));
        }
    }

    result.push('\n');

    result
}

fn output_formatted(
    output: &TocOutput,
    format: &OutputFormat,
    summary: &RunSummary,
    verbose: bool,
) {
    use colored::Colorize;
    let is_tty = std::io::stdout().is_terminal();

    if output.is_empty() {
        if is_tty {
            eprint!("{}", format_output_text(output, summary, verbose));
        }
        eprintln!("No sections found.");
        return;
    }

    let content = format_content(output, format);

    if is_tty {
        // Metadata to stderr, content to stdout
        eprint!("{}", format_output_text(output, summary, verbose));
        for line in content.lines() {
            println!("{}", line.white());
        }
    } else {
        println!("{}", content);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tocsmith_core::{Diagnostic, TocConfig};

    fn create_test_output() -> TocOutput {
        synthesize(
            "<h1>1. Intro</h1><h2>1.1 Background</h2><h1>2. Method</h1>",
            &TocConfig::default(),
        )
        .unwrap()
    }

    fn summary() -> RunSummary<'static> {
        RunSummary {
            source: "docs/report.html",
            selector: Some("#doc"),
            elapsed_ms: 120,
        }
    }

    #[test]
    fn test_format_content_per_format() {
        let output = create_test_output();

        assert!(format_content(&output, &OutputFormat::Indented).contains("  1.1 Background"));
        assert!(format_content(&output, &OutputFormat::Markdown).contains("* [1. Intro](#1-intro)"));
        assert!(format_content(&output, &OutputFormat::Html).contains("class=\"nav-list\""));
    }

    #[test]
    fn test_format_output_text_metadata() {
        let output = create_test_output();
        let text = format_output_text(&output, &summary(), false);

        assert!(text.contains("TABLE OF CONTENTS"));
        assert!(text.contains("docs/report.html"));
        assert!(text.contains("#doc"));
        assert!(text.contains("numbered"));
        assert!(text.contains("120 ms"));
    }

    #[test]
    fn test_format_output_text_shows_timeout_warning() {
        let mut output = create_test_output();
        output.push_diagnostic(Diagnostic::ReadinessTimeout {
            last_state: tocsmith_core::readiness::ReadinessState::TextMeaningful,
            elapsed_ms: 5000,
        });

        let text = format_output_text(&output, &summary(), false);
        assert!(text.contains("content not ready after 5000 ms"));
    }

    #[test]
    fn test_ambiguity_notes_only_when_verbose() {
        let mut output = create_test_output();
        output.push_diagnostic(Diagnostic::AmbiguousNumbering {
            sequence_index: 0,
            token: "I".to_string(),
            resolved: tocsmith_core::numbering::NumberingFamily::Roman,
        });

        assert!(!format_output_text(&output, &summary(), false).contains("ambiguous"));
        assert!(format_output_text(&output, &summary(), true).contains("ambiguous"));
    }
}
