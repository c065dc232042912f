use std::cmp::Ordering;
use std::fmt;
use std::fs::{self, File};
use std::hash::{Hash, Hasher};
use std::io::{BufReader, Read};
use std::path::{Component, Path, PathBuf};

use crate::core::fsops::copy_with_metadata;
use crate::core::hash::hash_file;
use crate::error::{ErrorContext, NobusError, Result};

const COMPARE_CHUNK: usize = 64 * 1024;

/// A single tracked file: a path relative to an optional base directory.
///
/// Two managed files are equal when their resolved full paths are equal.
#[derive(Debug, Clone)]
pub struct ManagedFile {
    relative_path: PathBuf,
    base_dir: Option<PathBuf>,
    full_path: PathBuf,
}

impl ManagedFile {
    /// Track a file by a self-contained path (no base directory).
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        Self {
            full_path: path.clone(),
            relative_path: path,
            base_dir: None,
        }
    }

    /// Track `relative` underneath `base_dir`.
    pub fn with_base<P: AsRef<Path>, B: AsRef<Path>>(relative: P, base_dir: B) -> Result<Self> {
        let relative = relative.as_ref();
        let base_dir = base_dir.as_ref();

        if relative.is_absolute() {
            let reason = if relative.starts_with(base_dir) {
                format!("already starts with base dir {}", base_dir.display())
            } else {
                "must be relative when a base dir is given".to_string()
            };
            return Err(NobusError::invalid_argument("relative path", relative.display(), reason));
        }
        if has_parent_dir(relative) {
            return Err(NobusError::invalid_argument(
                "relative path",
                relative.display(),
                "must stay below the base dir",
            ));
        }

        Ok(Self {
            full_path: base_dir.join(relative),
            relative_path: relative.to_path_buf(),
            base_dir: Some(base_dir.to_path_buf()),
        })
    }

    pub fn relative_path(&self) -> &Path {
        &self.relative_path
    }

    pub fn base_dir(&self) -> Option<&Path> {
        self.base_dir.as_deref()
    }

    pub fn full_path(&self) -> &Path {
        &self.full_path
    }

    /// Where this file lives inside a snapshot: the relative path with any
    /// root or prefix component dropped, so it always nests under the snapshot.
    /// Paths with `..` would escape it and are rejected.
    pub fn snapshot_path(&self) -> Result<PathBuf> {
        if has_parent_dir(&self.relative_path) {
            return Err(NobusError::invalid_argument(
                "tracked path",
                self.relative_path.display(),
                "contains '..' and would escape the snapshot",
            ));
        }

        Ok(self
            .relative_path
            .components()
            .filter(|c| matches!(c, Component::Normal(_)))
            .collect())
    }

    /// Compare against another file.
    ///
    /// With `shallow` set, files with identical size and modification time are
    /// treated as equal without reading them.
    pub fn compare(&self, other: impl AsRef<Path>, shallow: bool) -> Result<bool> {
        compare_files(&self.full_path, other.as_ref(), shallow)
    }

    /// Content hash of the file; `NotFound` if it is missing.
    pub fn hash(&self) -> Result<String> {
        hash_file(&self.full_path)
    }

    /// Copy the file to `dest_dir/<relative path>`, creating directories as needed.
    /// An existing destination file is overwritten.
    pub fn save<P: AsRef<Path>>(&self, dest_dir: P) -> Result<PathBuf> {
        let dest = dest_dir.as_ref().join(self.snapshot_path()?);

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)
                .with_io_context(|| format!("creating directory {}", parent.display()))?;
        }
        copy_with_metadata(&self.full_path, &dest)?;

        Ok(dest)
    }
}

impl AsRef<Path> for ManagedFile {
    fn as_ref(&self) -> &Path {
        &self.full_path
    }
}

impl PartialEq for ManagedFile {
    fn eq(&self, other: &Self) -> bool {
        self.full_path == other.full_path
    }
}

impl Eq for ManagedFile {}

impl Hash for ManagedFile {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.full_path.hash(state);
    }
}

impl PartialOrd for ManagedFile {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ManagedFile {
    fn cmp(&self, other: &Self) -> Ordering {
        self.full_path.cmp(&other.full_path)
    }
}

impl fmt::Display for ManagedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.full_path.display())
    }
}

fn has_parent_dir(path: &Path) -> bool {
    path.components().any(|c| c == Component::ParentDir)
}

/// Compare two files by content, optionally short-circuiting on size and mtime.
pub fn compare_files(a: &Path, b: &Path, shallow: bool) -> Result<bool> {
    let meta_a = file_metadata(a)?;
    let meta_b = file_metadata(b)?;

    if shallow {
        if let (Ok(mtime_a), Ok(mtime_b)) = (meta_a.modified(), meta_b.modified()) {
            if meta_a.len() == meta_b.len() && mtime_a == mtime_b {
                return Ok(true);
            }
        }
    }

    if meta_a.len() != meta_b.len() {
        return Ok(false);
    }

    let mut reader_a = BufReader::new(
        File::open(a).with_io_context(|| format!("opening file {}", a.display()))?,
    );
    let mut reader_b = BufReader::new(
        File::open(b).with_io_context(|| format!("opening file {}", b.display()))?,
    );
    let mut buf_a = vec![0u8; COMPARE_CHUNK];
    let mut buf_b = vec![0u8; COMPARE_CHUNK];

    loop {
        let read_a = fill(&mut reader_a, &mut buf_a)
            .with_io_context(|| format!("reading file {}", a.display()))?;
        let read_b = fill(&mut reader_b, &mut buf_b)
            .with_io_context(|| format!("reading file {}", b.display()))?;

        if read_a != read_b || buf_a[..read_a] != buf_b[..read_b] {
            return Ok(false);
        }
        if read_a == 0 {
            return Ok(true);
        }
    }
}

fn file_metadata(path: &Path) -> Result<fs::Metadata> {
    match fs::metadata(path) {
        Ok(meta) if meta.is_file() => Ok(meta),
        Ok(_) => Err(NobusError::not_found("file", path.display())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(NobusError::not_found("file", path.display()))
        }
        Err(e) => Err(e).with_io_context(|| format!("reading metadata of {}", path.display())),
    }
}

/// Read until `buf` is full or the reader is exhausted.
fn fill<R: Read>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut total = 0;
    while total < buf.len() {
        match reader.read(&mut buf[total..]) {
            Ok(0) => break,
            Ok(n) => total += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use filetime::FileTime;
    use std::collections::HashSet;
    use tempfile::TempDir;

    #[test]
    fn test_full_path_and_equality() {
        let a = ManagedFile::with_base("src/lib.rs", "/project").unwrap();
        let b = ManagedFile::new("/project/src/lib.rs");

        assert_eq!(a.full_path(), Path::new("/project/src/lib.rs"));
        assert_eq!(a.relative_path(), Path::new("src/lib.rs"));
        assert_eq!(a, b);

        let set: HashSet<_> = [a, b].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_rejects_double_prefix() {
        let err = ManagedFile::with_base("/project/src/lib.rs", "/project").unwrap_err();
        assert!(matches!(err, NobusError::InvalidArgument { .. }));

        let err = ManagedFile::with_base("/elsewhere/a.txt", "/project").unwrap_err();
        assert!(matches!(err, NobusError::InvalidArgument { .. }));
    }

    #[test]
    fn test_snapshot_path_drops_root() {
        let file = ManagedFile::new("/etc/hosts");
        assert_eq!(file.snapshot_path().unwrap(), PathBuf::from("etc/hosts"));

        let file = ManagedFile::with_base("./src/lib.rs", "/project").unwrap();
        assert_eq!(file.snapshot_path().unwrap(), PathBuf::from("src/lib.rs"));
    }

    #[test]
    fn test_parent_dir_never_escapes() {
        let err = ManagedFile::with_base("../shared/a.txt", "/project/app").unwrap_err();
        assert!(matches!(err, NobusError::InvalidArgument { .. }));

        let err = ManagedFile::new("../x.txt").snapshot_path().unwrap_err();
        assert!(matches!(err, NobusError::InvalidArgument { .. }));

        let err = ManagedFile::new("/project/app/../x.txt").snapshot_path().unwrap_err();
        assert!(matches!(err, NobusError::InvalidArgument { .. }));
    }

    #[test]
    fn test_compare_content() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a.txt"), "same").unwrap();
        fs::write(temp.path().join("b.txt"), "same").unwrap();
        fs::write(temp.path().join("c.txt"), "diff").unwrap();

        let a = ManagedFile::with_base("a.txt", temp.path()).unwrap();
        assert!(a.compare(temp.path().join("b.txt"), false).unwrap());
        assert!(!a.compare(temp.path().join("c.txt"), false).unwrap());

        let c = ManagedFile::with_base("c.txt", temp.path()).unwrap();
        assert!(!c.compare(&a, false).unwrap());
    }

    #[test]
    fn test_shallow_compare_trusts_metadata() {
        let temp = TempDir::new().unwrap();
        let a = temp.path().join("a.txt");
        let b = temp.path().join("b.txt");
        fs::write(&a, "aaaa").unwrap();
        fs::write(&b, "bbbb").unwrap();
        let stamp = FileTime::from_unix_time(1_500_000_000, 0);
        filetime::set_file_mtime(&a, stamp).unwrap();
        filetime::set_file_mtime(&b, stamp).unwrap();

        let file = ManagedFile::new(&a);
        assert!(file.compare(&b, true).unwrap());
        assert!(!file.compare(&b, false).unwrap());
    }

    #[test]
    fn test_compare_missing_file() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a.txt"), "x").unwrap();
        let a = ManagedFile::with_base("a.txt", temp.path()).unwrap();

        let err = a.compare(temp.path().join("missing.txt"), false).unwrap_err();
        assert!(matches!(err, NobusError::NotFound { .. }));
    }

    #[test]
    fn test_hash_missing_file() {
        let file = ManagedFile::new("/definitely/not/here.txt");
        assert!(matches!(file.hash().unwrap_err(), NobusError::NotFound { .. }));
    }

    #[test]
    fn test_save_creates_parents_and_overwrites() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        fs::create_dir_all(src.path().join("nested/dir")).unwrap();
        fs::write(src.path().join("nested/dir/file.txt"), "v1").unwrap();

        let file = ManagedFile::with_base("nested/dir/file.txt", src.path()).unwrap();
        let saved = file.save(dst.path()).unwrap();
        assert_eq!(saved, dst.path().join("nested/dir/file.txt"));
        assert_eq!(fs::read_to_string(&saved).unwrap(), "v1");

        fs::write(src.path().join("nested/dir/file.txt"), "v2").unwrap();
        file.save(dst.path()).unwrap();
        assert_eq!(fs::read_to_string(&saved).unwrap(), "v2");
    }
}
