//! Package description files.
//!
//! A package description is a YAML file holding everything one chart needs:
//!
//! ```yaml
//! chart:
//!   name: demo
//!   version: 1.0.0
//! values:
//!   replicas: 1
//! environments:
//!   prod:
//!     replicas: 3
//! assets:
//!   - id: deployment
//!     records:
//!       - apiVersion: apps/v1
//!         kind: Deployment
//!         metadata:
//!           name: "{{ .Release.Name }}"
//! helpers:
//!   - name: demo.fullname
//!     body: "{{ .Release.Name }}-{{ .Chart.Name }}"
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use forge_chart::{AssetTarget, ChartLayout, ChartMetadata, ChartWriter, Helpers, SynthAsset, WriteOptions};
use forge_manifest::{PlaceholderScanner, Value};
use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PackageError {
    #[error("Asset '{0}' must set exactly one of 'records' or 'content'")]
    AssetSource(String),

    #[error("'labels' must be a mapping of label names to values")]
    InvalidLabels,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetEntry {
    pub id: String,
    #[serde(default)]
    pub records: Option<Vec<Value>>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub target: AssetTarget,
    #[serde(default)]
    pub single_file: bool,
}

#[derive(Debug, Deserialize)]
pub struct PackageFile {
    pub chart: ChartMetadata,
    #[serde(default)]
    pub values: Option<Value>,
    #[serde(default)]
    pub environments: BTreeMap<String, Value>,
    #[serde(default)]
    pub assets: Vec<AssetEntry>,
    #[serde(default)]
    pub helpers: Option<Helpers>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub schema: Option<Value>,
    /// Extra default labels, added to (or replacing) the Helm defaults.
    #[serde(default)]
    pub labels: Option<Value>,
}

impl PackageFile {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read package description {:?}", path))?;
        Self::parse(&text).with_context(|| format!("Invalid package description {:?}", path))
    }

    pub fn parse(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Layout with this package's extra labels merged into the defaults.
    pub fn layout(&self) -> Result<ChartLayout> {
        let mut layout = ChartLayout::helm();
        match &self.labels {
            None | Some(Value::Null) => {}
            Some(labels) => {
                let tagged = PlaceholderScanner::new().tag(labels.clone())?;
                let mapping = tagged.as_mapping().ok_or(PackageError::InvalidLabels)?;
                for (key, value) in mapping.iter() {
                    layout.default_labels.insert(key, value.clone());
                }
            }
        }
        Ok(layout)
    }

    /// Build write options, synthesizing record-based assets with `writer`'s labels.
    pub fn into_options(self, writer: &ChartWriter) -> Result<WriteOptions> {
        let mut options = WriteOptions::new(self.chart);
        if let Some(values) = self.values.filter(|v| !v.is_null()) {
            options = options.with_values(values);
        }
        options.environments = self.environments;

        for entry in self.assets {
            let asset = match (entry.records, entry.content) {
                (Some(records), None) => writer
                    .synthesize(&entry.id, records)
                    .with_context(|| format!("Failed to serialize asset '{}'", entry.id))?,
                (None, Some(content)) => SynthAsset::new(&entry.id, content),
                _ => return Err(PackageError::AssetSource(entry.id).into()),
            };
            options = options.with_asset(asset.with_target(entry.target).single_file(entry.single_file));
        }

        options.helpers = self.helpers;
        options.notes = self.notes;
        options.schema = self.schema;
        Ok(options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forge_chart::HelperBlock;

    const PACKAGE: &str = r#"
chart:
  name: demo
  version: 1.0.0
  appVersion: "2.1"
values:
  replicas: 1
environments:
  prod:
    replicas: 3
assets:
  - id: deployment
    records:
      - kind: Deployment
        metadata:
          name: "{{ .Release.Name }}"
  - id: bundle
    content: "kind: A\n---\nkind: B\n"
    singleFile: true
  - id: widgets
    target: secondary
    content: "kind: CustomResourceDefinition\n"
helpers:
  - name: demo.fullname
    body: "{{ .Release.Name }}"
notes: "Installed {{ .Chart.Name }}"
labels:
  team: platform
  app.kubernetes.io/part-of: "{{ .Values.partOf }}"
"#;

    #[test]
    fn test_parse_package() {
        let package = PackageFile::parse(PACKAGE).unwrap();
        assert_eq!(package.chart.name, "demo");
        assert_eq!(package.chart.app_version.as_deref(), Some("2.1"));
        assert_eq!(package.assets.len(), 3);
        assert!(package.assets[1].single_file);
        assert_eq!(package.assets[2].target, AssetTarget::Secondary);
        assert_eq!(
            package.helpers,
            Some(Helpers::Blocks(vec![HelperBlock::new("demo.fullname", "{{ .Release.Name }}")]))
        );
    }

    #[test]
    fn test_helpers_as_raw_text() {
        let package =
            PackageFile::parse("chart:\n  name: a\n  version: 0.1.0\nhelpers: \"{{/* x */}}\"\n").unwrap();
        assert_eq!(package.helpers, Some(Helpers::Raw("{{/* x */}}".to_string())));
    }

    #[test]
    fn test_labels_merge_into_layout() {
        let package = PackageFile::parse(PACKAGE).unwrap();
        let layout = package.layout().unwrap();

        assert_eq!(layout.default_labels.get("team").and_then(|v| v.as_str()), Some("platform"));
        assert!(layout
            .default_labels
            .get("app.kubernetes.io/part-of")
            .unwrap()
            .is_placeholder());
        assert!(layout.default_labels.contains_key("app.kubernetes.io/managed-by"));
    }

    #[test]
    fn test_into_options() {
        let package = PackageFile::parse(PACKAGE).unwrap();
        let writer = ChartWriter::new(package.layout().unwrap());
        let options = package.into_options(&writer).unwrap();

        assert_eq!(options.assets.len(), 3);
        assert!(options.assets[0].content.contains("name: {{ .Release.Name }}"));
        assert!(options.assets[0].content.contains("team: platform"));
        assert!(options.assets[1].single_file);
        assert_eq!(options.assets[2].target, AssetTarget::Secondary);
        assert!(options.environments.contains_key("prod"));
        assert!(options.notes.is_some());
    }

    #[test]
    fn test_asset_needs_one_source() {
        let package = PackageFile::parse(
            "chart:\n  name: a\n  version: 0.1.0\nassets:\n  - id: empty\n",
        )
        .unwrap();
        let err = package.into_options(&ChartWriter::default()).unwrap_err();
        assert!(err.downcast_ref::<PackageError>().is_some());
    }

    #[test]
    fn test_labels_must_be_mapping() {
        let package =
            PackageFile::parse("chart:\n  name: a\n  version: 0.1.0\nlabels: [a, b]\n").unwrap();
        assert!(package.layout().is_err());
    }
}
