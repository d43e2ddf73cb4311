//! Synthesized assets and their materialization into files.

use std::path::PathBuf;

use forge_manifest::{
    inject_labels, join_documents, repair_quoted_placeholders, split_documents, Mapping,
    PlaceholderScanner, Value, YamlEmitter,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::ChartResult;
use crate::paths::{resolve_asset_id, write_guarded};

/// Which subtree an asset is written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetTarget {
    /// The templates directory.
    #[default]
    Primary,
    /// The secondary assets directory (CRDs for Helm).
    Secondary,
}

impl AssetTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetTarget::Primary => "primary",
            AssetTarget::Secondary => "secondary",
        }
    }
}

impl std::fmt::Display for AssetTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Serialized documents plus their output routing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthAsset {
    pub id: String,
    pub content: String,
    pub target: AssetTarget,
    pub single_file: bool,
}

impl SynthAsset {
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            target: AssetTarget::Primary,
            single_file: false,
        }
    }

    /// Tag placeholders, inject default labels and serialize each record as one document.
    pub fn from_records(
        id: impl Into<String>,
        records: Vec<Value>,
        default_labels: &Mapping,
    ) -> ChartResult<Self> {
        let scanner = PlaceholderScanner::new();
        let prepared = records
            .into_iter()
            .map(|record| Ok(inject_labels(scanner.tag(record)?, default_labels)))
            .collect::<ChartResult<Vec<_>>>()?;

        let content = YamlEmitter::new().emit_documents(&prepared);
        Ok(Self::new(id, content))
    }

    /// Serialize arbitrary documents through `serde_yaml`, then unquote placeholder values
    /// the generic emitter quoted.
    pub fn from_serialize<T: Serialize>(id: impl Into<String>, documents: &[T]) -> ChartResult<Self> {
        let mut rendered = Vec::with_capacity(documents.len());
        for document in documents {
            let text = serde_yaml::to_string(document)?;
            let text = text.strip_prefix("---\n").unwrap_or(&text);
            rendered.push(repair_quoted_placeholders(text.trim()));
        }
        Ok(Self::new(id, join_documents(&rendered)))
    }

    /// Route the asset to the secondary directory.
    pub fn secondary(mut self) -> Self {
        self.target = AssetTarget::Secondary;
        self
    }

    pub fn with_target(mut self, target: AssetTarget) -> Self {
        self.target = target;
        self
    }

    /// Keep all documents in one file.
    pub fn single_file(mut self, single_file: bool) -> Self {
        self.single_file = single_file;
        self
    }
}

/// Writes assets under their target root.
pub struct AssetMaterializer {
    templates_root: PathBuf,
    secondary_root: PathBuf,
    extension: String,
}

impl AssetMaterializer {
    pub fn new(
        templates_root: impl Into<PathBuf>,
        secondary_root: impl Into<PathBuf>,
        extension: impl Into<String>,
    ) -> Self {
        Self {
            templates_root: templates_root.into(),
            secondary_root: secondary_root.into(),
            extension: extension.into(),
        }
    }

    pub fn root_for(&self, target: AssetTarget) -> &PathBuf {
        match target {
            AssetTarget::Primary => &self.templates_root,
            AssetTarget::Secondary => &self.secondary_root,
        }
    }

    /// Write one asset and return the files written, in order.
    ///
    /// The identifier is resolved before anything is created. Each file is
    /// guarded against the asset's target root.
    pub fn materialize(&self, asset: &SynthAsset) -> ChartResult<Vec<PathBuf>> {
        let root = self.root_for(asset.target);
        let files = plan_files(asset, &self.extension)?;
        if files.is_empty() {
            warn!("Asset '{}' has no documents, nothing written", asset.id);
        }

        debug!(
            "Materializing asset '{}' ({}) into {} file(s)",
            asset.id,
            asset.target,
            files.len()
        );

        let mut written = Vec::with_capacity(files.len());
        for file in files {
            let path = root.join(&file.relative);
            write_guarded(&path, root, &file.contents)?;
            written.push(path);
        }
        Ok(written)
    }
}

/// A file an asset will produce, relative to its target root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedFile {
    pub relative: PathBuf,
    pub contents: String,
}

/// Work out the files `asset` produces without touching the filesystem.
///
/// Multi-document content becomes `<base>-1.<ext>`, `<base>-2.<ext>`, ...; a
/// single document, or a single-file asset, becomes `<base>.<ext>`.
pub fn plan_files(asset: &SynthAsset, extension: &str) -> ChartResult<Vec<PlannedFile>> {
    let resolved = resolve_asset_id(&asset.id)?;
    let planned = |file_name: String, contents: String| PlannedFile {
        relative: resolved.relative_file(&file_name),
        contents,
    };

    if asset.single_file {
        return Ok(vec![planned(
            format!("{}.{}", resolved.base_name, extension),
            asset.content.clone(),
        )]);
    }

    let documents = split_documents(&asset.content);
    let files = match documents.len() {
        0 => Vec::new(),
        1 => vec![planned(
            format!("{}.{}", resolved.base_name, extension),
            format!("{}\n", documents[0]),
        )],
        _ => documents
            .iter()
            .enumerate()
            .map(|(i, doc)| {
                planned(
                    format!("{}-{}.{}", resolved.base_name, i + 1, extension),
                    format!("{}\n", doc),
                )
            })
            .collect(),
    };
    Ok(files)
}
