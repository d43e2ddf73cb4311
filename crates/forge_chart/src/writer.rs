//! Chart package assembly.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use forge_manifest::{ManifestError, Mapping, Value, YamlEmitter};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::asset::{plan_files, AssetMaterializer, AssetTarget, SynthAsset};
use crate::error::{ChartError, ChartResult};
use crate::layout::ChartLayout;
use crate::metadata::ChartMetadata;
use crate::paths::{create_dir_guarded, ensure_contained, write_guarded};

/// One named template definition in the helpers file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelperBlock {
    pub name: String,
    pub body: String,
}

impl HelperBlock {
    pub fn new(name: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            body: body.into(),
        }
    }
}

/// Contents of the helpers file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Helpers {
    Raw(String),
    Blocks(Vec<HelperBlock>),
}

impl Helpers {
    /// Render to file contents. Block names may not contain quotes, newlines or braces.
    pub fn render(&self) -> ChartResult<String> {
        match self {
            Helpers::Raw(text) => Ok(text.clone()),
            Helpers::Blocks(blocks) => {
                let mut rendered = Vec::with_capacity(blocks.len());
                for block in blocks {
                    validate_block_name(&block.name)?;
                    rendered.push(format!(
                        "{{{{- define \"{}\" -}}}}\n{}\n{{{{- end }}}}",
                        block.name,
                        block.body.trim_end_matches('\n')
                    ));
                }
                Ok(format!("{}\n", rendered.join("\n\n")))
            }
        }
    }
}

fn validate_block_name(name: &str) -> ChartResult<()> {
    if name.is_empty() {
        return Err(ManifestError::malformed(name, "helper block name is empty").into());
    }
    if let Some(c) = name
        .chars()
        .find(|c| matches!(c, '"' | '\n' | '\r' | '{' | '}'))
    {
        return Err(
            ManifestError::malformed(name, format!("illegal character {:?} in helper block name", c))
                .into(),
        );
    }
    Ok(())
}

/// Everything written for one chart.
#[derive(Debug, Clone)]
pub struct WriteOptions {
    pub metadata: ChartMetadata,
    pub values: Value,
    pub environments: BTreeMap<String, Value>,
    pub assets: Vec<SynthAsset>,
    pub helpers: Option<Helpers>,
    pub notes: Option<String>,
    pub schema: Option<Value>,
}

impl WriteOptions {
    pub fn new(metadata: ChartMetadata) -> Self {
        Self {
            metadata,
            values: Value::Mapping(Mapping::new()),
            environments: BTreeMap::new(),
            assets: Vec::new(),
            helpers: None,
            notes: None,
            schema: None,
        }
    }

    pub fn with_values(mut self, values: impl Into<Value>) -> Self {
        self.values = values.into();
        self
    }

    pub fn with_environment(mut self, name: impl Into<String>, values: impl Into<Value>) -> Self {
        self.environments.insert(name.into(), values.into());
        self
    }

    pub fn with_asset(mut self, asset: SynthAsset) -> Self {
        self.assets.push(asset);
        self
    }

    pub fn with_helpers(mut self, helpers: Helpers) -> Self {
        self.helpers = Some(helpers);
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn with_schema(mut self, schema: impl Into<Value>) -> Self {
        self.schema = Some(schema.into());
        self
    }
}

/// Files produced by a write, relative to the output root, in write order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteReport {
    pub root: PathBuf,
    pub files: Vec<PathBuf>,
    /// An ignore file already existed and was left alone.
    pub ignore_file_preserved: bool,
}

impl WriteReport {
    fn record(&mut self, path: &Path) {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        self.files.push(relative.to_path_buf());
    }
}

/// Writes chart packages using a [`ChartLayout`].
pub struct ChartWriter {
    layout: ChartLayout,
    emitter: YamlEmitter,
    env_pattern: Regex,
}

impl Default for ChartWriter {
    fn default() -> Self {
        Self::new(ChartLayout::default())
    }
}

impl ChartWriter {
    pub fn new(layout: ChartLayout) -> Self {
        Self {
            layout,
            emitter: YamlEmitter::new(),
            env_pattern: Regex::new(r"^[A-Za-z0-9_-]{1,63}$").unwrap(),
        }
    }

    pub fn layout(&self) -> &ChartLayout {
        &self.layout
    }

    /// Build an asset from records using this writer's default labels.
    pub fn synthesize(&self, id: impl Into<String>, records: Vec<Value>) -> ChartResult<SynthAsset> {
        SynthAsset::from_records(id, records, &self.layout.default_labels)
    }

    pub fn is_valid_environment(&self, name: &str) -> bool {
        self.env_pattern.is_match(name)
    }

    /// Write a complete chart under `root`.
    ///
    /// Identifiers, environment names and helper block names are all checked
    /// before the first file is created. After that, writes are sequential and
    /// the first failure aborts the call, leaving what was already written.
    pub fn write(&self, root: &Path, options: &WriteOptions) -> ChartResult<WriteReport> {
        info!(
            "Writing chart {} {} to {:?}",
            options.metadata.name, options.metadata.version, root
        );

        self.preflight(options)?;

        let root = self.prepare_root(root)?;
        let mut report = WriteReport {
            root: root.clone(),
            ..Default::default()
        };

        let templates_root = create_dir_guarded(&root.join(&self.layout.templates_dir), &root)?;
        let secondary_root = ensure_contained(&root.join(&self.layout.secondary_dir), &root)?;

        // Metadata and values
        self.write_yaml(&root, &self.layout.metadata_file, &options.metadata.to_value(), &mut report)?;
        self.write_yaml(&root, &self.layout.values_file, &options.values, &mut report)?;

        for (env, values) in &options.environments {
            self.check_environment(env)?;
            self.write_yaml(&root, &self.layout.env_values_file(env), values, &mut report)?;
        }

        // Assets
        let materializer = AssetMaterializer::new(
            &templates_root,
            &secondary_root,
            &self.layout.asset_extension,
        );
        for asset in &options.assets {
            for path in materializer.materialize(asset)? {
                report.record(&path);
            }
        }

        if let Some(helpers) = &options.helpers {
            let path = templates_root.join(&self.layout.helpers_file);
            write_guarded(&path, &templates_root, &helpers.render()?)?;
            report.record(&path);
        }

        if let Some(notes) = &options.notes {
            let path = templates_root.join(&self.layout.notes_file);
            write_guarded(&path, &templates_root, notes)?;
            report.record(&path);
        }

        if let Some(schema) = &options.schema {
            let path = root.join(&self.layout.schema_file);
            let json = serde_json::to_string_pretty(schema)?;
            write_guarded(&path, &root, &format!("{}\n", json))?;
            report.record(&path);
        }

        let ignore_path = root.join(&self.layout.ignore_file);
        if fs::symlink_metadata(&ignore_path).is_ok() {
            debug!("Keeping existing {:?}", ignore_path);
            report.ignore_file_preserved = true;
        } else {
            write_guarded(&ignore_path, &root, &self.layout.ignore_contents)?;
            report.record(&ignore_path);
        }

        info!(
            "Chart {} written: {} file(s)",
            options.metadata.name,
            report.files.len()
        );
        Ok(report)
    }

    fn preflight(&self, options: &WriteOptions) -> ChartResult<()> {
        for env in options.environments.keys() {
            self.check_environment(env)?;
        }
        if let Some(Helpers::Blocks(blocks)) = &options.helpers {
            for block in blocks {
                validate_block_name(&block.name)?;
            }
        }
        self.check_output_files(options)
    }

    /// Reject assets whose output files would overwrite each other or a helpers/notes file.
    fn check_output_files(&self, options: &WriteOptions) -> ChartResult<()> {
        let templates_dir = Path::new(&self.layout.templates_dir);
        let secondary_dir = Path::new(&self.layout.secondary_dir);

        let mut owners: HashMap<PathBuf, String> = HashMap::new();
        if options.helpers.is_some() {
            owners.insert(
                templates_dir.join(&self.layout.helpers_file),
                "the helpers file".to_string(),
            );
        }
        if options.notes.is_some() {
            owners.insert(
                templates_dir.join(&self.layout.notes_file),
                "the notes file".to_string(),
            );
        }

        for asset in &options.assets {
            let dir = match asset.target {
                AssetTarget::Primary => templates_dir,
                AssetTarget::Secondary => secondary_dir,
            };
            for file in plan_files(asset, &self.layout.asset_extension)? {
                let path = dir.join(&file.relative);
                let owner = format!("asset '{}'", asset.id);
                if let Some(previous) = owners.insert(path.clone(), owner) {
                    return Err(ChartError::invalid_id(
                        &asset.id,
                        format!(
                            "output file {} is already written by {}",
                            path.display(),
                            previous
                        ),
                    ));
                }
            }
        }
        Ok(())
    }

    fn check_environment(&self, env: &str) -> ChartResult<()> {
        if self.is_valid_environment(env) {
            Ok(())
        } else {
            Err(ChartError::InvalidEnvironmentName(env.to_string()))
        }
    }

    /// Create the output root and return its canonical path.
    fn prepare_root(&self, root: &Path) -> ChartResult<PathBuf> {
        if root.as_os_str().is_empty() || (root.exists() && !root.is_dir()) {
            return Err(ChartError::InvalidOutputRoot(root.to_path_buf()));
        }
        fs::create_dir_all(root).map_err(ChartError::fs(root))?;
        root.canonicalize().map_err(ChartError::fs(root))
    }

    fn write_yaml(
        &self,
        root: &Path,
        file_name: &str,
        value: &Value,
        report: &mut WriteReport,
    ) -> ChartResult<()> {
        let path = root.join(file_name);
        write_guarded(&path, root, &self.emitter.emit(value))?;
        report.record(&path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_render_helper_blocks() {
        let helpers = Helpers::Blocks(vec![
            HelperBlock::new("demo.name", "{{ .Chart.Name }}\n"),
            HelperBlock::new("demo.fullname", "{{ .Release.Name }}-{{ .Chart.Name }}"),
        ]);

        assert_eq!(
            helpers.render().unwrap(),
            "{{- define \"demo.name\" -}}\n{{ .Chart.Name }}\n{{- end }}\n\n\
             {{- define \"demo.fullname\" -}}\n{{ .Release.Name }}-{{ .Chart.Name }}\n{{- end }}\n"
        );
    }

    #[test]
    fn test_render_raw_helpers_verbatim() {
        let text = "{{/* raw */}}\n";
        assert_eq!(Helpers::Raw(text.to_string()).render().unwrap(), text);
    }

    #[test]
    fn test_rejects_bad_block_names() {
        for name in ["", "bad\"name", "two\nlines", "{{ x }}"] {
            let helpers = Helpers::Blocks(vec![HelperBlock::new(name, "x")]);
            assert!(
                matches!(helpers.render(), Err(ChartError::Manifest(_))),
                "{:?} should be rejected",
                name
            );
        }
    }

    #[test]
    fn test_environment_pattern() {
        let writer = ChartWriter::default();
        assert!(writer.is_valid_environment("prod"));
        assert!(writer.is_valid_environment("eu_west-1"));
        assert!(writer.is_valid_environment(&"a".repeat(63)));
        assert!(!writer.is_valid_environment(&"a".repeat(64)));
        assert!(!writer.is_valid_environment(""));
        assert!(!writer.is_valid_environment("../prod"));
        assert!(!writer.is_valid_environment("prod.yaml"));
        assert!(!writer.is_valid_environment("prod\n"));
    }

    #[test]
    fn test_write_report_lists_files_in_order() {
        let dir = tempdir().unwrap();
        let options = WriteOptions::new(ChartMetadata::new("demo", "1.0.0"))
            .with_environment("prod", Value::Mapping(Mapping::new()))
            .with_environment("dev", Value::Mapping(Mapping::new()))
            .with_asset(SynthAsset::new("service", "kind: Service\n"))
            .with_notes("Installed.\n");

        let report = ChartWriter::default().write(dir.path(), &options).unwrap();

        let files: Vec<String> = report
            .files
            .iter()
            .map(|p| p.to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(
            files,
            vec![
                "Chart.yaml",
                "values.yaml",
                "values-dev.yaml",
                "values-prod.yaml",
                "templates/service.yaml",
                "templates/NOTES.txt",
                ".helmignore",
            ]
        );
        assert!(!report.ignore_file_preserved);
    }

    #[test]
    fn test_output_root_must_be_directory() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("not-a-dir");
        fs::write(&file, "x").unwrap();

        let options = WriteOptions::new(ChartMetadata::new("demo", "1.0.0"));
        let result = ChartWriter::default().write(&file, &options);
        assert!(matches!(result, Err(ChartError::InvalidOutputRoot(_))));
    }

    #[test]
    fn test_layout_escaping_root_is_refused() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("chart");
        let writer = ChartWriter::new(ChartLayout::helm().with_templates_dir("../outside"));

        let options = WriteOptions::new(ChartMetadata::new("demo", "1.0.0"));
        let result = writer.write(&root, &options);

        assert!(matches!(result, Err(ChartError::PathEscape { .. })));
        assert!(!dir.path().join("outside").exists());
    }

    fn two_documents() -> &'static str {
        "kind: Deployment\nmetadata:\n  name: a\n---\nkind: Deployment\nmetadata:\n  name: b\n"
    }

    fn assert_collision(writer: &ChartWriter, options: &WriteOptions, id: &str) {
        let dir = tempdir().unwrap();
        let root = dir.path().join("chart");

        let result = writer.write(&root, options);

        match result {
            Err(ChartError::InvalidAssetIdentifier { id: got, reason }) => {
                assert_eq!(got, id);
                assert!(reason.contains("already written by"), "{}", reason);
            }
            other => panic!("expected a collision error, got {:?}", other),
        }
        assert!(!root.exists());
    }

    #[test]
    fn test_numbered_documents_collide_with_later_asset() {
        let options = WriteOptions::new(ChartMetadata::new("demo", "1.0.0"))
            .with_asset(SynthAsset::new("deployment", two_documents()))
            .with_asset(SynthAsset::new("deployment-1", "kind: Deployment\n"));

        assert_collision(&ChartWriter::default(), &options, "deployment-1");
    }

    #[test]
    fn test_duplicate_asset_ids_collide() {
        let options = WriteOptions::new(ChartMetadata::new("demo", "1.0.0"))
            .with_asset(SynthAsset::new("web/service", "kind: Service\n"))
            .with_asset(SynthAsset::new("web\\service", "kind: Service\n"));

        assert_collision(&ChartWriter::default(), &options, "web\\service");
    }

    #[test]
    fn test_asset_colliding_with_notes_file() {
        let writer = ChartWriter::new(ChartLayout::helm().with_asset_extension("txt"));
        let options = WriteOptions::new(ChartMetadata::new("demo", "1.0.0"))
            .with_notes("Installed.\n")
            .with_asset(SynthAsset::new("NOTES", "kind: ConfigMap\n"));

        assert_collision(&writer, &options, "NOTES");
    }

    #[test]
    fn test_same_id_in_both_targets_is_allowed() {
        let dir = tempdir().unwrap();
        let options = WriteOptions::new(ChartMetadata::new("demo", "1.0.0"))
            .with_asset(SynthAsset::new("widgets", "kind: Widget\n"))
            .with_asset(SynthAsset::new("widgets", "kind: CustomResourceDefinition\n").secondary());

        ChartWriter::default().write(dir.path(), &options).unwrap();

        assert!(dir.path().join("templates/widgets.yaml").exists());
        assert!(dir.path().join("crds/widgets.yaml").exists());
    }
}
