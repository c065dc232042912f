use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use globset::{GlobBuilder, GlobMatcher};
use tracing::debug;
use walkdir::WalkDir;

use crate::core::hash::hash_concat;
use crate::core::ignore::Ignore;
use crate::core::managed_file::ManagedFile;
use crate::error::{ErrorContext, NobusError, Result};

/// A set of files selected by (subpath, pattern) pairs under an optional base directory.
///
/// Patterns are shell globs matched against the path relative to
/// `base_dir/subpath`: `*` and `?` stay within one path segment, `**` spans
/// any number of directories. Enumeration is always sorted by path.
#[derive(Debug, Clone)]
pub struct ManagedDirectory {
    patterns: Vec<(PathBuf, String)>,
    base_dir: Option<PathBuf>,
    /// `None` means the default ignore set, or whatever a resource supplies.
    ignore: Option<Ignore>,
}

impl ManagedDirectory {
    pub fn new<P: AsRef<Path>>(subpath: P, pattern: &str) -> Self {
        Self {
            patterns: vec![(subpath.as_ref().to_path_buf(), pattern.to_string())],
            base_dir: None,
            ignore: None,
        }
    }

    /// Add another (subpath, pattern) pair.
    pub fn include<P: AsRef<Path>>(mut self, subpath: P, pattern: &str) -> Self {
        self.patterns.push((subpath.as_ref().to_path_buf(), pattern.to_string()));
        self
    }

    /// Add several patterns for the same subpath.
    pub fn include_all<P: AsRef<Path>>(mut self, subpath: P, patterns: &[&str]) -> Self {
        let subpath = subpath.as_ref();
        for pattern in patterns {
            self.patterns.push((subpath.to_path_buf(), pattern.to_string()));
        }
        self
    }

    pub fn with_base_dir<P: AsRef<Path>>(mut self, base_dir: P) -> Self {
        self.base_dir = Some(base_dir.as_ref().to_path_buf());
        self
    }

    pub fn with_ignore(mut self, ignore: Ignore) -> Self {
        self.ignore = Some(ignore);
        self
    }

    pub fn base_dir(&self) -> Option<&Path> {
        self.base_dir.as_deref()
    }

    pub fn patterns(&self) -> &[(PathBuf, String)] {
        &self.patterns
    }

    /// The ignore set explicitly given to this directory, if any.
    pub fn ignore(&self) -> Option<&Ignore> {
        self.ignore.as_ref()
    }

    /// All matching files, sorted and deduplicated, with ignored paths removed.
    pub fn enumerate(&self) -> Result<Vec<PathBuf>> {
        let mut found = BTreeSet::new();
        let ignore = self.ignore.clone().unwrap_or_default();

        for (subpath, pattern) in &self.patterns {
            let matcher = compile_pattern(pattern)?;
            let root: PathBuf = match &self.base_dir {
                Some(base) => base.join(subpath),
                None => subpath.clone(),
            }
            .components()
            .collect();

            if !root.is_dir() {
                debug!("Skipping {}: not a directory", root.display());
                continue;
            }

            for entry in WalkDir::new(&root).follow_links(false).sort_by_file_name() {
                let entry = entry.with_io_context(|| format!("walking directory {}", root.display()))?;
                if entry.depth() == 0 {
                    continue;
                }

                let path = entry.path();
                let is_file = entry.file_type().is_file()
                    || (entry.path_is_symlink() && path.is_file());
                if !is_file {
                    continue;
                }

                let relative = path.strip_prefix(&root).unwrap_or(path);
                if matcher.is_match(relative) && !self.is_ignored(&ignore, path) {
                    found.insert(path.to_path_buf());
                }
            }
        }

        Ok(found.into_iter().collect())
    }

    /// Same as [`enumerate`](Self::enumerate), wrapped as managed files relative to `base_dir`.
    pub fn managed_files(&self) -> Result<Vec<ManagedFile>> {
        let paths = self.enumerate()?;

        let Some(base) = &self.base_dir else {
            return Ok(paths.into_iter().map(ManagedFile::new).collect());
        };

        paths
            .into_iter()
            .map(|path| {
                let relative = path.strip_prefix(base).map_err(|_| {
                    NobusError::inconsistent(
                        &path,
                        format!("enumerated path is outside base dir {}", base.display()),
                    )
                })?;
                ManagedFile::with_base(relative, base)
            })
            .collect()
    }

    /// Directory-level fingerprint over the sorted files' content hashes.
    pub fn hash(&self) -> Result<String> {
        let hashes = self
            .managed_files()?
            .iter()
            .map(ManagedFile::hash)
            .collect::<Result<Vec<_>>>()?;
        Ok(hash_concat(&hashes))
    }

    fn is_ignored(&self, ignore: &Ignore, path: &Path) -> bool {
        let candidate = self
            .base_dir
            .as_deref()
            .and_then(|base| path.strip_prefix(base).ok())
            .unwrap_or(path);
        ignore.is_ignored(candidate)
    }
}

fn compile_pattern(pattern: &str) -> Result<GlobMatcher> {
    GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .map(|glob| glob.compile_matcher())
        .map_err(|e| NobusError::Pattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn fixture() -> TempDir {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("src/nested")).unwrap();
        fs::create_dir_all(root.join("src/__pycache__")).unwrap();
        fs::create_dir_all(root.join("docs")).unwrap();
        fs::write(root.join("src/main.py"), "print('hi')").unwrap();
        fs::write(root.join("src/util.py"), "def f(): pass").unwrap();
        fs::write(root.join("src/nested/deep.py"), "x = 1").unwrap();
        fs::write(root.join("src/nested/data.json"), "{}").unwrap();
        fs::write(root.join("src/__pycache__/main.cpython.pyc"), "bytecode").unwrap();
        fs::write(root.join("docs/readme.md"), "# docs").unwrap();
        temp
    }

    #[test]
    fn test_enumerate_recursive_sorted() {
        let temp = fixture();
        let dir = ManagedDirectory::new("src", "**/*.py").with_base_dir(temp.path());

        let files = dir.enumerate().unwrap();
        assert_eq!(
            files,
            vec![
                temp.path().join("src/main.py"),
                temp.path().join("src/nested/deep.py"),
                temp.path().join("src/util.py"),
            ]
        );
    }

    #[test]
    fn test_single_star_stays_in_segment() {
        let temp = fixture();
        let dir = ManagedDirectory::new("src", "*.py").with_base_dir(temp.path());

        let files = dir.enumerate().unwrap();
        assert_eq!(files.len(), 2);
        assert!(!files.contains(&temp.path().join("src/nested/deep.py")));
    }

    #[test]
    fn test_ignore_default_and_disabled() {
        let temp = fixture();
        let cached = temp.path().join("src/__pycache__/main.cpython.pyc");

        let dir = ManagedDirectory::new("src", "**/*").with_base_dir(temp.path());
        assert!(!dir.enumerate().unwrap().contains(&cached));

        let dir = dir.with_ignore(Ignore::none());
        assert!(dir.enumerate().unwrap().contains(&cached));
    }

    #[test]
    fn test_ignore_only_set_when_given() {
        let dir = ManagedDirectory::new("src", "**/*");
        assert!(dir.ignore().is_none());
        assert!(dir.with_ignore(Ignore::none()).ignore().is_some());
    }

    #[test]
    fn test_subpath_above_base_is_rejected() {
        let temp = fixture();
        fs::create_dir_all(temp.path().join("shared")).unwrap();
        fs::write(temp.path().join("shared/notes.txt"), "outside").unwrap();

        let dir = ManagedDirectory::new("../shared", "*.txt").with_base_dir(temp.path().join("src"));
        assert!(matches!(
            dir.managed_files().unwrap_err(),
            NobusError::InvalidArgument { .. }
        ));
    }

    #[test]
    fn test_multiple_pairs_merge_and_dedupe() {
        let temp = fixture();
        let dir = ManagedDirectory::new("src", "**/*.py")
            .include("src", "*.py")
            .include_all("docs", &["*.md", "**/*.md"])
            .with_base_dir(temp.path());

        let files = dir.enumerate().unwrap();
        assert_eq!(files.len(), 4);
        let mut sorted = files.clone();
        sorted.sort();
        assert_eq!(files, sorted);
    }

    #[test]
    fn test_managed_files_strip_base() {
        let temp = fixture();
        let dir = ManagedDirectory::new("src", "**/*.json").with_base_dir(temp.path());

        let files = dir.managed_files().unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].relative_path(), Path::new("src/nested/data.json"));
        assert_eq!(files[0].base_dir(), Some(temp.path()));
        assert_eq!(files[0].full_path(), temp.path().join("src/nested/data.json"));
    }

    #[test]
    fn test_enumeration_is_deterministic() {
        let temp = fixture();
        let dir = ManagedDirectory::new(".", "**/*").with_base_dir(temp.path());

        assert_eq!(dir.managed_files().unwrap(), dir.managed_files().unwrap());
        assert_eq!(dir.hash().unwrap(), dir.hash().unwrap());
    }

    #[test]
    fn test_hash_changes_with_content() {
        let temp = fixture();
        let dir = ManagedDirectory::new("src", "**/*.py").with_base_dir(temp.path());

        let before = dir.hash().unwrap();
        fs::write(temp.path().join("src/util.py"), "def f(): return 1").unwrap();
        assert_ne!(before, dir.hash().unwrap());
    }

    #[test]
    fn test_missing_subpath_is_empty() {
        let temp = fixture();
        let dir = ManagedDirectory::new("nope", "**/*").with_base_dir(temp.path());
        assert!(dir.enumerate().unwrap().is_empty());
    }

    #[test]
    fn test_invalid_pattern() {
        let temp = fixture();
        let dir = ManagedDirectory::new("src", "[").with_base_dir(temp.path());
        assert!(matches!(dir.enumerate().unwrap_err(), NobusError::Pattern { .. }));
    }
}
