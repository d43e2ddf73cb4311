//! Asset identifier resolution and output containment.
//!
//! Identifiers are resolved into validated path segments before anything
//! touches the filesystem, and every directory creation and file write is
//! re-checked against its root right before it happens.

use std::ffi::OsString;
use std::fs;
use std::path::{Component, Path, PathBuf, MAIN_SEPARATOR};

use tracing::debug;

use crate::error::{ChartError, ChartResult};

/// Characters that may not appear in an identifier segment.
pub const BANNED_CHARS: &[char] = &['<', '>', ':', '"', '|', '?', '*'];

/// A validated asset identifier split into directories and a base name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetPath {
    pub dir_segments: Vec<String>,
    pub base_name: String,
}

impl AssetPath {
    /// Path of `file_name` inside the identifier's subdirectories.
    pub fn relative_file(&self, file_name: &str) -> PathBuf {
        let mut path: PathBuf = self.dir_segments.iter().collect();
        path.push(file_name);
        path
    }
}

/// Resolve an asset identifier such as `"networking/service"`.
///
/// Both `/` and `\` separate segments. Every segment must be non-empty, not
/// `.` or `..`, and free of [`BANNED_CHARS`] and control characters.
pub fn resolve_asset_id(id: &str) -> ChartResult<AssetPath> {
    if id.is_empty() {
        return Err(ChartError::invalid_id(id, "identifier is empty"));
    }

    let normalized = id.replace('\\', "/");
    let segments: Vec<&str> = normalized.split('/').collect();
    for segment in &segments {
        validate_segment(id, segment)?;
    }

    let (base_name, dirs) = segments
        .split_last()
        .ok_or_else(|| ChartError::invalid_id(id, "identifier is empty"))?;

    Ok(AssetPath {
        dir_segments: dirs.iter().map(|s| s.to_string()).collect(),
        base_name: base_name.to_string(),
    })
}

fn validate_segment(id: &str, segment: &str) -> ChartResult<()> {
    if segment.is_empty() {
        return Err(ChartError::invalid_id(id, "empty path segment"));
    }
    if segment == "." || segment == ".." {
        return Err(ChartError::invalid_id(
            id,
            format!("relative segment '{}'", segment),
        ));
    }
    if segment.contains('\0') {
        return Err(ChartError::invalid_id(id, "null byte"));
    }
    if let Some(c) = segment.chars().find(|c| BANNED_CHARS.contains(c)) {
        return Err(ChartError::invalid_id(id, format!("illegal character {:?}", c)));
    }
    if let Some(c) = segment.chars().find(|c| is_control_char(*c)) {
        return Err(ChartError::invalid_id(
            id,
            format!("control character U+{:04X}", c as u32),
        ));
    }
    Ok(())
}

/// C0 controls, DEL and C1 controls.
fn is_control_char(c: char) -> bool {
    matches!(c as u32, 0x00..=0x1F | 0x7F | 0x80..=0x9F)
}

/// Normalize a path by resolving `.` and `..` components without requiring it to exist.
fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                normalized.pop();
            }
            Component::CurDir => {}
            other => normalized.push(other),
        }
    }
    normalized
}

/// Absolute, normalized form of `path` with symlinks resolved for the part that exists.
pub fn resolve_path(path: &Path) -> ChartResult<PathBuf> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(ChartError::fs(path))?
            .join(path)
    };
    let normalized = normalize_path(&absolute);

    let mut existing = normalized.as_path();
    let mut missing: Vec<OsString> = Vec::new();
    loop {
        if let Ok(canonical) = existing.canonicalize() {
            let mut resolved = canonical;
            for name in missing.iter().rev() {
                resolved.push(name);
            }
            return Ok(resolved);
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name.to_os_string());
                existing = parent;
            }
            _ => return Ok(normalized),
        }
    }
}

/// Require `candidate` to be `root` or a descendant of it.
///
/// Both paths are re-resolved on every call. Returns the resolved candidate.
pub fn ensure_contained(candidate: &Path, root: &Path) -> ChartResult<PathBuf> {
    let resolved_root = resolve_path(root)?;
    let resolved = resolve_path(candidate)?;

    let root_str = resolved_root.to_string_lossy();
    let prefix = if root_str.ends_with(MAIN_SEPARATOR) {
        root_str.to_string()
    } else {
        format!("{}{}", root_str, MAIN_SEPARATOR)
    };

    if resolved == resolved_root || resolved.to_string_lossy().starts_with(&prefix) {
        Ok(resolved)
    } else {
        Err(ChartError::PathEscape {
            path: candidate.to_path_buf(),
            root: root.to_path_buf(),
        })
    }
}

/// Create `dir` and its parents after checking it stays inside `root`.
pub fn create_dir_guarded(dir: &Path, root: &Path) -> ChartResult<PathBuf> {
    let checked = ensure_contained(dir, root)?;
    fs::create_dir_all(&checked).map_err(ChartError::fs(&checked))?;
    Ok(checked)
}

/// Write `contents` to `path`, checking containment before creating the
/// parent directory and again before the write itself.
pub fn write_guarded(path: &Path, root: &Path, contents: &str) -> ChartResult<()> {
    let checked = ensure_contained(path, root)?;
    if let Some(parent) = checked.parent() {
        create_dir_guarded(parent, root)?;
    }

    let checked = ensure_contained(path, root)?;
    // A dangling symlink survives resolution but the write would follow it
    if fs::symlink_metadata(&checked).is_ok_and(|m| m.file_type().is_symlink()) {
        return Err(ChartError::PathEscape {
            path: path.to_path_buf(),
            root: root.to_path_buf(),
        });
    }

    fs::write(&checked, contents).map_err(ChartError::fs(&checked))?;
    debug!("Wrote {:?}", checked);
    Ok(())
}
