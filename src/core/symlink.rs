use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

#[cfg(unix)]
use std::os::unix::fs as unix_fs;

use crate::core::fsops::copy_with_metadata;
use crate::error::{ErrorContext, NobusError, Result};

/// How an unchanged file is carried into a new snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkMode {
    /// Symbolic link to the earlier snapshot's file
    Symlink,
    /// Hard link to the earlier snapshot's file (same filesystem only)
    Hardlink,
    /// Plain copy, for filesystems without link support
    Copy,
}

impl LinkMode {
    /// Symlinks where the platform supports them, copies elsewhere.
    pub fn platform_default() -> Self {
        if cfg!(unix) {
            LinkMode::Symlink
        } else {
            LinkMode::Copy
        }
    }
}

impl Default for LinkMode {
    fn default() -> Self {
        Self::platform_default()
    }
}

/// Place `link` so that it refers to `target`, per `mode`.
///
/// Never replaces an existing entry at `link`; parent directories are created.
pub fn create_link(mode: LinkMode, target: &Path, link: &Path) -> Result<()> {
    if link.symlink_metadata().is_ok() {
        return Err(NobusError::already_exists("snapshot entry", link.display()));
    }

    if let Some(parent) = link.parent() {
        fs::create_dir_all(parent)
            .with_io_context(|| format!("creating parent directory {}", parent.display()))?;
    }

    match mode {
        LinkMode::Symlink => symlink_file(target, link),
        LinkMode::Hardlink => fs::hard_link(target, link).with_io_context(|| {
            format!("creating hard link {} -> {}", link.display(), target.display())
        }),
        LinkMode::Copy => copy_with_metadata(target, link),
    }
}

#[cfg(unix)]
fn symlink_file(target: &Path, link: &Path) -> Result<()> {
    unix_fs::symlink(target, link)
        .with_io_context(|| format!("creating symlink {} -> {}", link.display(), target.display()))
}

#[cfg(windows)]
fn symlink_file(target: &Path, link: &Path) -> Result<()> {
    std::os::windows::fs::symlink_file(target, link)
        .with_io_context(|| format!("creating symlink {} -> {}", link.display(), target.display()))
}

#[cfg(not(any(unix, windows)))]
fn symlink_file(target: &Path, link: &Path) -> Result<()> {
    copy_with_metadata(target, link)
}

/// Real path behind `link`, with every chained link followed.
pub fn resolve_symlink(link: &Path) -> Result<PathBuf> {
    let target = fs::read_link(link)
        .with_io_context(|| format!("reading link {}", link.display()))?;

    let anchored = match link.parent() {
        Some(parent) if target.is_relative() => parent.join(target),
        _ => target,
    };
    anchored
        .canonicalize()
        .with_io_context(|| format!("following link {}", link.display()))
}
