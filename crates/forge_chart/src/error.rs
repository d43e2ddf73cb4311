//! Error types for chart assembly.

use std::path::{Path, PathBuf};

use forge_manifest::ManifestError;
use thiserror::Error;

/// Result type alias for chart operations.
pub type ChartResult<T> = Result<T, ChartError>;

/// Errors that can occur while assembling a chart.
#[derive(Error, Debug)]
pub enum ChartError {
    #[error("Invalid asset identifier {id:?}: {reason}")]
    InvalidAssetIdentifier { id: String, reason: String },

    #[error("Path {path} escapes output root {root}")]
    PathEscape { path: PathBuf, root: PathBuf },

    #[error("Invalid environment name {0:?}: expected 1-63 letters, digits, '-' or '_'")]
    InvalidEnvironmentName(String),

    #[error("Invalid output root: {0}")]
    InvalidOutputRoot(PathBuf),

    #[error("Filesystem error at {path}: {source}")]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Manifest error: {0}")]
    Manifest(#[from] ManifestError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl ChartError {
    pub(crate) fn invalid_id(id: &str, reason: impl Into<String>) -> Self {
        Self::InvalidAssetIdentifier {
            id: id.to_string(),
            reason: reason.into(),
        }
    }

    /// Attach `path` to an I/O error.
    pub(crate) fn fs(path: &Path) -> impl FnOnce(std::io::Error) -> Self + '_ {
        move |source| Self::Filesystem {
            path: path.to_path_buf(),
            source,
        }
    }
}
