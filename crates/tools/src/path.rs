//! Path normalization for the file tools.
//!
//! Every path a tool touches goes through [`normalize_path`]: home-directory
//! shorthands and parent-directory components are refused, relative paths
//! are anchored at the workspace root, and existing paths are canonicalized
//! so the same file always yields the same context marker.

use std::path::{Component, Path, PathBuf};

/// Error returned when a path is refused.
#[derive(Debug, thiserror::Error)]
pub enum PathError {
    #[error("Home directory references not allowed in '{path}'")]
    HomeReference { path: String },

    #[error("Invalid path: {path} contains parent directory references")]
    PathTraversal { path: String },

    #[error("Empty path")]
    Empty,

    #[error("Failed to canonicalize path '{path}': {reason}")]
    CanonicalizeFailed { path: String, reason: String },
}

/// Return a canonical, absolute version of `raw`, resolved against `root`.
///
/// Paths that do not exist yet (files about to be created) are resolved
/// through their nearest existing parent.
pub fn normalize_path(raw: &str, root: &Path) -> Result<PathBuf, PathError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(PathError::Empty);
    }

    let input = Path::new(trimmed);
    for component in input.components() {
        match component {
            Component::ParentDir => {
                return Err(PathError::PathTraversal { path: raw.into() });
            }
            Component::Normal(part) if part.to_string_lossy().starts_with('~') => {
                return Err(PathError::HomeReference { path: raw.into() });
            }
            _ => {}
        }
    }

    let absolute = if input.is_absolute() {
        input.to_path_buf()
    } else {
        root.join(input)
    };
    let absolute: PathBuf = absolute
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect();

    if absolute.exists() {
        return canonicalize(&absolute, raw);
    }

    // Walk up to the nearest existing ancestor and re-attach the rest.
    let mut existing = absolute.as_path();
    let mut missing = Vec::new();
    while !existing.exists() {
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name.to_os_string());
                existing = parent;
            }
            _ => return Ok(absolute),
        }
    }

    let mut resolved = canonicalize(existing, raw)?;
    resolved.extend(missing.iter().rev());
    Ok(resolved)
}

fn canonicalize(path: &Path, raw: &str) -> Result<PathBuf, PathError> {
    path.canonicalize()
        .map_err(|e| PathError::CanonicalizeFailed {
            path: raw.into(),
            reason: e.to_string(),
        })
}
