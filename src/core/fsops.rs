use std::fs;
use std::path::Path;

use filetime::FileTime;

use crate::error::{ErrorContext, Result};

/// Copy a file's bytes, permissions and timestamps.
///
/// Parent directories of `dst` must already exist.
pub fn copy_with_metadata(src: &Path, dst: &Path) -> Result<()> {
    fs::copy(src, dst)
        .with_io_context(|| format!("copying file {} to {}", src.display(), dst.display()))?;

    let metadata = fs::metadata(src)
        .with_io_context(|| format!("reading metadata of {}", src.display()))?;
    let atime = FileTime::from_last_access_time(&metadata);
    let mtime = FileTime::from_last_modification_time(&metadata);

    filetime::set_file_times(dst, atime, mtime)
        .with_io_context(|| format!("setting file times on {}", dst.display()))?;

    Ok(())
}

/// Recursively remove `path`. A path that does not exist is left alone.
pub fn remove_tree(path: &Path) -> Result<()> {
    let metadata = match fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => {
            return Err(e).with_io_context(|| format!("reading metadata of {}", path.display()))
        }
    };

    if metadata.is_dir() {
        fs::remove_dir_all(path)
            .with_io_context(|| format!("removing directory {}", path.display()))
    } else {
        fs::remove_file(path)
            .with_io_context(|| format!("removing file {}", path.display()))
    }
}
