use std::collections::BTreeSet;
use std::fmt;
use std::path::{Component, Path};
use std::sync::Arc;

/// Directory names skipped by default: interpreter caches and notebook checkpoints.
pub const DEFAULT_IGNORE_NAMES: &[&str] = &["__pycache__", ".ipynb_checkpoints"];

/// Decides whether a path is excluded from enumeration and snapshot discovery.
#[derive(Clone)]
pub enum Ignore {
    /// Nothing is ignored.
    Disabled,
    /// Ignore any path with a segment equal to one of these names.
    Names(BTreeSet<String>),
    /// Arbitrary predicate; `true` means ignored.
    Custom(Arc<dyn Fn(&Path) -> bool + Send + Sync>),
}

impl Ignore {
    pub fn none() -> Self {
        Ignore::Disabled
    }

    /// Replace the default names entirely.
    pub fn names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Ignore::Names(names.into_iter().map(Into::into).collect())
    }

    /// The default names plus `extra`.
    pub fn with_extra<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut names: BTreeSet<String> = DEFAULT_IGNORE_NAMES.iter().map(|s| s.to_string()).collect();
        names.extend(extra.into_iter().map(Into::into));
        Ignore::Names(names)
    }

    pub fn custom<F>(predicate: F) -> Self
    where
        F: Fn(&Path) -> bool + Send + Sync + 'static,
    {
        Ignore::Custom(Arc::new(predicate))
    }

    pub fn is_ignored(&self, path: &Path) -> bool {
        match self {
            Ignore::Disabled => false,
            Ignore::Names(names) => path.components().any(|c| match c {
                Component::Normal(segment) => names.contains(&*segment.to_string_lossy()),
                _ => false,
            }),
            Ignore::Custom(predicate) => predicate(path),
        }
    }
}

impl Default for Ignore {
    fn default() -> Self {
        Ignore::names(DEFAULT_IGNORE_NAMES.iter().copied())
    }
}

impl fmt::Debug for Ignore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ignore::Disabled => write!(f, "Ignore::Disabled"),
            Ignore::Names(names) => f.debug_tuple("Ignore::Names").field(names).finish(),
            Ignore::Custom(_) => write!(f, "Ignore::Custom(..)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ignores_caches() {
        let ignore = Ignore::default();
        assert!(ignore.is_ignored(Path::new("pkg/__pycache__/mod.pyc")));
        assert!(ignore.is_ignored(Path::new(".ipynb_checkpoints/nb.ipynb")));
        assert!(!ignore.is_ignored(Path::new("pkg/mod.py")));
        // Segment match, not substring
        assert!(!ignore.is_ignored(Path::new("pkg/my__pycache__/mod.pyc")));
    }

    #[test]
    fn test_disabled() {
        assert!(!Ignore::none().is_ignored(Path::new("pkg/__pycache__/mod.pyc")));
    }

    #[test]
    fn test_with_extra_keeps_defaults() {
        let ignore = Ignore::with_extra(["build"]);
        assert!(ignore.is_ignored(Path::new("build/out.o")));
        assert!(ignore.is_ignored(Path::new("__pycache__/x.pyc")));

        let replaced = Ignore::names(["build"]);
        assert!(!replaced.is_ignored(Path::new("__pycache__/x.pyc")));
    }

    #[test]
    fn test_custom_predicate() {
        let ignore = Ignore::custom(|p| p.extension().is_some_and(|e| e == "log"));
        assert!(ignore.is_ignored(Path::new("a/b.log")));
        assert!(!ignore.is_ignored(Path::new("a/b.txt")));
        assert_eq!(format!("{:?}", ignore), "Ignore::Custom(..)");
    }
}
