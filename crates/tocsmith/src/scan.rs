use crate::prelude::{eprintln, println, *};
use std::path::Path;

use tocsmith_core::numbering::{classify, ClassifiedElement, NumberingFamily};
use tocsmith_core::scan::scan_html;

use crate::settings::SourceOptions;
use crate::source::{acquire, container_config};

#[derive(Debug, Clone, clap::Args)]
pub struct ScanOptions {
    #[clap(flatten)]
    pub source: SourceOptions,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, serde::Serialize)]
struct ScanRow {
    sequence_index: u32,
    tag: String,
    family: NumberingFamily,
    depth: u8,
    ordinal_path: Vec<u32>,
    text: String,
}

impl From<&ClassifiedElement> for ScanRow {
    fn from(classified: &ClassifiedElement) -> Self {
        Self {
            sequence_index: classified.element.sequence_index,
            tag: classified.element.tag_kind.to_string(),
            family: classified.token.family,
            depth: classified.token.depth,
            ordinal_path: classified.token.ordinal_path.clone(),
            text: classified.element.raw_text.clone(),
        }
    }
}

pub async fn run(options: ScanOptions, global: crate::Global) -> Result<()> {
    let config = options.source.resolve(global.config.as_deref().map(Path::new))?;

    let Some(acquired) = acquire(&options.source.source, &config).await? else {
        eprintln!("Cancelled.");
        return Ok(());
    };
    if let Some(diagnostic) = &acquired.diagnostic {
        diagnostic.log();
    }

    let config = container_config(&config);
    let elements = scan_html(&acquired.html, &config.scan)?;
    let classification = classify(elements, &config.numbering);
    if global.verbose {
        for diagnostic in &classification.diagnostics {
            diagnostic.log();
        }
    }

    let rows: Vec<ScanRow> = classification.elements.iter().map(ScanRow::from).collect();

    if options.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&rows)
                .map_err(|e| eyre!("JSON serialization failed: {}", e))?
        );
        return Ok(());
    }

    if rows.is_empty() {
        eprintln!("No candidate elements found.");
        return Ok(());
    }

    build_table(&rows).printstd();
    eprintln!(
        "{} element(s), {} numbered",
        rows.len(),
        classification.numbered_count()
    );

    Ok(())
}

fn build_table(rows: &[ScanRow]) -> prettytable::Table {
    let mut table = new_table();
    table.set_titles(prettytable::row!["#", "Tag", "Family", "Depth", "Ordinal", "Text"]);

    for row in rows {
        let ordinal = row
            .ordinal_path
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join(".");
        table.add_row(prettytable::row![
            row.sequence_index,
            row.tag,
            row.family,
            row.depth,
            ordinal,
            tocsmith_core::element::truncate_label(&row.text, 60)
        ]);
    }

    table
}
