//! # forge_chart
//!
//! Chart package assembly for chartforge.
//!
//! This crate turns chart metadata, values, serialized assets and optional
//! helper, notes and schema content into a Helm chart directory. Every file it
//! writes is checked to stay inside the output root right before it is written.
//!
//! ## Features
//!
//! - Asset identifier validation (no traversal, empty segments or control characters)
//! - Containment guard re-checked before each directory creation and write
//! - Multi-document assets split into numbered files or kept as one
//! - Per-environment values files with validated names
//! - Named helper blocks, `NOTES.txt`, `values.schema.json`
//! - `.helmignore` written only when missing
//!
//! ## Example
//!
//! ```rust,no_run
//! use forge_chart::{ChartMetadata, ChartWriter, SynthAsset, WriteOptions};
//! use forge_manifest::Mapping;
//! use std::path::Path;
//!
//! let mut values = Mapping::new();
//! values.insert("replicas", 1);
//!
//! let options = WriteOptions::new(ChartMetadata::new("demo", "1.0.0"))
//!     .with_values(values)
//!     .with_environment("prod", Mapping::from_iter([("replicas", 3)]))
//!     .with_asset(SynthAsset::new("deployment", "kind: Deployment\n"));
//!
//! let report = ChartWriter::default()
//!     .write(Path::new("./charts/demo"), &options)
//!     .unwrap();
//! println!("{} files written", report.files.len());
//! ```

pub mod asset;
pub mod error;
pub mod layout;
pub mod metadata;
pub mod paths;
pub mod writer;

pub use asset::{plan_files, AssetMaterializer, AssetTarget, PlannedFile, SynthAsset};
pub use error::{ChartError, ChartResult};
pub use layout::{helm_default_labels, ChartLayout, DEFAULT_HELMIGNORE};
pub use metadata::{ChartDependency, ChartMetadata, ChartType, Maintainer};
pub use paths::{
    create_dir_guarded, ensure_contained, resolve_asset_id, write_guarded, AssetPath,
    BANNED_CHARS,
};
pub use writer::{ChartWriter, HelperBlock, Helpers, WriteOptions, WriteReport};
