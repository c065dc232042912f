use std::path::{Path, PathBuf};

use crate::error::{ErrorContext, NobusError, Result};

/// Markers that identify the top of a version-controlled project.
const ROOT_MARKERS: &[&str] = &[".git", ".hg"];

/// Walk upwards from `start` to the nearest directory holding a VCS marker.
///
/// `.git` may be a directory or a file (worktrees and submodules).
pub fn find_project_root(start: &Path) -> Result<PathBuf> {
    let start = start
        .canonicalize()
        .with_io_context(|| format!("resolving {}", start.display()))?;

    start
        .ancestors()
        .find(|dir| ROOT_MARKERS.iter().any(|marker| dir.join(marker).exists()))
        .map(Path::to_path_buf)
        .ok_or_else(|| NobusError::not_found("project root", start.display()))
}
