//! File and directory names of a generated chart.

use std::path::Path;

use forge_manifest::{Mapping, Placeholder};

/// Ignore file written when the output root has none.
pub const DEFAULT_HELMIGNORE: &str = r#"# Patterns to ignore when building packages.
# This supports shell glob matching, relative path matching, and
# negation (prefixed with !). Only one pattern per line.
.DS_Store
# Common VCS dirs
.git/
.gitignore
.bzr/
.bzrignore
.hg/
.hgignore
.svn/
# Common backup files
*.swp
*.bak
*.tmp
*.orig
*~
# Various IDEs
.project
.idea/
*.tmproj
.vscode/
"#;

/// Names used when writing a chart, plus the labels injected into every record.
#[derive(Debug, Clone)]
pub struct ChartLayout {
    pub metadata_file: String,
    /// Also names the per-environment overrides, see [`ChartLayout::env_values_file`].
    pub values_file: String,
    pub templates_dir: String,
    pub secondary_dir: String,
    pub helpers_file: String,
    pub notes_file: String,
    pub schema_file: String,
    pub ignore_file: String,
    pub ignore_contents: String,
    pub asset_extension: String,
    pub default_labels: Mapping,
}

impl Default for ChartLayout {
    fn default() -> Self {
        Self::helm()
    }
}

impl ChartLayout {
    /// The standard Helm chart layout.
    pub fn helm() -> Self {
        Self {
            metadata_file: "Chart.yaml".to_string(),
            values_file: "values.yaml".to_string(),
            templates_dir: "templates".to_string(),
            secondary_dir: "crds".to_string(),
            helpers_file: "_helpers.tpl".to_string(),
            notes_file: "NOTES.txt".to_string(),
            schema_file: "values.schema.json".to_string(),
            ignore_file: ".helmignore".to_string(),
            ignore_contents: DEFAULT_HELMIGNORE.to_string(),
            asset_extension: "yaml".to_string(),
            default_labels: helm_default_labels(),
        }
    }

    pub fn with_values_file(mut self, file: impl Into<String>) -> Self {
        self.values_file = file.into();
        self
    }

    pub fn with_templates_dir(mut self, dir: impl Into<String>) -> Self {
        self.templates_dir = dir.into();
        self
    }

    pub fn with_secondary_dir(mut self, dir: impl Into<String>) -> Self {
        self.secondary_dir = dir.into();
        self
    }

    pub fn with_asset_extension(mut self, ext: impl Into<String>) -> Self {
        self.asset_extension = ext.into();
        self
    }

    pub fn with_ignore_contents(mut self, contents: impl Into<String>) -> Self {
        self.ignore_contents = contents.into();
        self
    }

    pub fn with_default_labels(mut self, labels: Mapping) -> Self {
        self.default_labels = labels;
        self
    }

    /// Add or replace one default label.
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<forge_manifest::Value>) -> Self {
        self.default_labels.insert(key, value);
        self
    }

    /// File name of the values override for `env`: `values.yaml` becomes `values-<env>.yaml`.
    pub fn env_values_file(&self, env: &str) -> String {
        let path = Path::new(&self.values_file);
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy())
            .unwrap_or_default();
        let name = match path.extension() {
            Some(ext) => format!("{}-{}.{}", stem, env, ext.to_string_lossy()),
            None => format!("{}-{}", stem, env),
        };
        path.with_file_name(name).to_string_lossy().into_owned()
    }
}

/// Recommended Kubernetes labels, rendered by Helm at install time.
pub fn helm_default_labels() -> Mapping {
    let mut labels = Mapping::new();
    labels.insert(
        "helm.sh/chart",
        Placeholder::new_unchecked(r#"{{ .Chart.Name }}-{{ .Chart.Version | replace "+" "_" }}"#),
    );
    labels.insert(
        "app.kubernetes.io/name",
        Placeholder::new_unchecked("{{ .Chart.Name }}"),
    );
    labels.insert(
        "app.kubernetes.io/instance",
        Placeholder::new_unchecked("{{ .Release.Name }}"),
    );
    labels.insert(
        "app.kubernetes.io/version",
        Placeholder::new_unchecked("{{ .Chart.AppVersion | quote }}"),
    );
    labels.insert(
        "app.kubernetes.io/managed-by",
        Placeholder::new_unchecked("{{ .Release.Service }}"),
    );
    labels
}
