use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::NobusConfig;
use crate::core::ignore::Ignore;
use crate::core::labels::{LabelGenerator, WordLabelGenerator};
use crate::core::symlink::LinkMode;

/// How a tracked file is compared with its cached copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompareMode {
    /// Byte-for-byte comparison.
    #[default]
    Full,
    /// Equal size and mtime are taken as equal content. Can miss edits that
    /// keep both, so it has to be asked for.
    Shallow,
}

impl CompareMode {
    pub fn is_shallow(self) -> bool {
        self == CompareMode::Shallow
    }
}

/// Knobs shared by all cache operations of a resource.
#[derive(Clone)]
pub struct CacheOptions {
    pub link_mode: LinkMode,
    pub compare: CompareMode,
    /// Used by `create_cache`; `save_cache` takes it per call.
    pub prevent_duplication: bool,
    pub seeded_labels: bool,
    pub lock_cache_root: bool,
    pub show_progress: bool,
    /// Applied during snapshot discovery and to directory members that
    /// don't set their own ignore.
    pub ignore: Ignore,
    pub labels: Arc<dyn LabelGenerator>,
}

impl CacheOptions {
    pub fn from_config(config: &NobusConfig) -> Self {
        Self {
            link_mode: config.cache.link_mode,
            compare: config.cache.compare,
            prevent_duplication: config.cache.prevent_duplication,
            seeded_labels: config.cache.seeded_labels,
            lock_cache_root: config.cache.lock_cache_root,
            show_progress: config.ui.progress_bars,
            ignore: config.ignore.to_ignore(),
            labels: Arc::new(WordLabelGenerator),
        }
    }

    pub fn with_labels<G: LabelGenerator + 'static>(mut self, generator: G) -> Self {
        self.labels = Arc::new(generator);
        self
    }
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self::from_config(&NobusConfig::default())
    }
}

impl fmt::Debug for CacheOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheOptions")
            .field("link_mode", &self.link_mode)
            .field("compare", &self.compare)
            .field("prevent_duplication", &self.prevent_duplication)
            .field("seeded_labels", &self.seeded_labels)
            .field("lock_cache_root", &self.lock_cache_root)
            .field("show_progress", &self.show_progress)
            .field("ignore", &self.ignore)
            .finish_non_exhaustive()
    }
}

/// Per-call switches for `Resource::save_cache`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveOptions {
    /// Remove an existing destination instead of failing.
    pub overwrite: bool,
    /// Return the reference snapshot instead of writing when nothing changed.
    pub prevent_duplication: bool,
}
