//! Write command - Write a chart from a package description.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use forge_chart::ChartWriter;

use crate::package::PackageFile;

#[derive(Args)]
pub struct WriteArgs {
    /// Package description file (YAML)
    #[arg(short, long)]
    package: PathBuf,

    /// Output directory for the chart
    #[arg(short, long)]
    out: PathBuf,
}

pub fn execute(args: WriteArgs, quiet: bool) -> Result<()> {
    info!("Loading package description {:?}", args.package);

    let package = PackageFile::load(&args.package)?;
    let writer = ChartWriter::new(package.layout()?);
    let name = package.chart.name.clone();
    let options = package.into_options(&writer)?;

    let report = writer
        .write(&args.out, &options)
        .with_context(|| format!("Failed to write chart '{}' to {:?}", name, args.out))?;

    if !quiet {
        println!("📦 Chart '{}' written to {}", name, report.root.display());
        for file in &report.files {
            println!("   ✅ {}", file.display());
        }
        if report.ignore_file_preserved {
            println!("   ⚠️  Kept existing ignore file");
        }
    }

    Ok(())
}
