//! CLI command definitions.
//!
//! This module defines the command structure for the chartforge CLI.

use clap::{Parser, Subcommand};

pub mod render;
pub mod write;

/// chartforge - Helm chart package generator
#[derive(Parser)]
#[command(name = "chartforge")]
#[command(version, about = "chartforge - Helm chart package generator")]
#[command(long_about = r#"
chartforge assembles Helm chart directories from a package description:
chart metadata, values, per-environment overrides, resource records with
template expressions, helpers, notes and a values schema.

COMMANDS:
  write   → Write a chart from a package description file
  render  → Print records as YAML with template expressions left unquoted

EXIT CODES:
  0 - Success
  1 - General error
  2 - Invalid arguments
  3 - Invalid identifier, environment name or path escape
  4 - Malformed template expression
  5 - Filesystem error
"#)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a chart directory from a package description
    Write(write::WriteArgs),

    /// Serialize a multi-document records file
    Render(render::RenderArgs),
}
