//! Render command - Serialize a records file.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde::Deserialize;
use tracing::debug;

use forge_chart::helm_default_labels;
use forge_manifest::{inject_labels, Mapping, PlaceholderScanner, Value, YamlEmitter};

#[derive(Args)]
pub struct RenderArgs {
    /// Multi-document YAML file of records
    #[arg(short, long)]
    file: PathBuf,

    /// Inject the default Helm labels into each record
    #[arg(long)]
    labels: bool,
}

pub fn execute(args: RenderArgs) -> Result<()> {
    let text = fs::read_to_string(&args.file)
        .with_context(|| format!("Failed to read records file {:?}", args.file))?;

    let labels = if args.labels {
        helm_default_labels()
    } else {
        Mapping::new()
    };
    let output = render(&text, &labels)?;
    print!("{}", output);
    Ok(())
}

/// Parse every document, tag expressions, inject `labels` and emit the result.
pub fn render(text: &str, labels: &Mapping) -> Result<String> {
    let scanner = PlaceholderScanner::new();
    let mut records = Vec::new();

    for document in serde_yaml::Deserializer::from_str(text) {
        let record = Value::deserialize(document).context("Failed to parse records")?;
        if record.is_null() {
            continue;
        }
        records.push(inject_labels(scanner.tag(record)?, labels));
    }

    debug!("Rendering {} record(s)", records.len());
    Ok(YamlEmitter::new().emit_documents(&records))
}
