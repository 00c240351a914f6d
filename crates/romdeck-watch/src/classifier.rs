//! Path classification for library change events
//!
//! Pure logic: a changed path is mapped to the platform directory it falls
//! under and to a depth, with no filesystem access.

use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// OS-generated marker files that never indicate library changes
const IGNORED_ARTIFACTS: &[&str] = &[".DS_Store", "Thumbs.db"];

#[derive(Debug, Error)]
pub enum ClassificationError {
    #[error("Path outside watched root: {0}")]
    OutsideRoot(PathBuf),

    #[error("Path has no segment below the watched root: {0}")]
    NoPlatformSegment(PathBuf),

    #[error("Path has a non-unicode segment: {0}")]
    NonUnicodeSegment(PathBuf),
}

/// How deep under the watched root a change happened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeDepth {
    /// The platform directory itself
    PlatformRoot,
    /// Anything below a platform directory
    Nested,
}

/// A change event mapped onto the library layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedChange {
    /// First path segment below the watched root
    pub platform_slug: String,
    pub depth: ChangeDepth,
    pub is_directory: bool,
}

/// Classify a changed path relative to the watched root.
///
/// Returns `Ok(None)` for recognized OS artifacts, which produce no
/// classification.
pub fn classify(
    watch_root: &Path,
    path: &Path,
    is_directory: bool,
) -> Result<Option<ClassifiedChange>, ClassificationError> {
    let relative = path
        .strip_prefix(watch_root)
        .map_err(|_| ClassificationError::OutsideRoot(path.to_path_buf()))?;

    let mut segments = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(segment) => {
                let segment = segment
                    .to_str()
                    .ok_or_else(|| ClassificationError::NonUnicodeSegment(path.to_path_buf()))?;
                segments.push(segment);
            }
            Component::CurDir => {}
            _ => return Err(ClassificationError::OutsideRoot(path.to_path_buf())),
        }
    }

    let Some(platform_slug) = segments.first() else {
        return Err(ClassificationError::NoPlatformSegment(path.to_path_buf()));
    };

    if let Some(last) = segments.last()
        && IGNORED_ARTIFACTS.contains(last)
    {
        return Ok(None);
    }

    let depth = if segments.len() == 1 {
        ChangeDepth::PlatformRoot
    } else {
        ChangeDepth::Nested
    };

    Ok(Some(ClassifiedChange {
        platform_slug: platform_slug.to_string(),
        depth,
        is_directory,
    }))
}
