use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::ignore::Ignore;
use crate::core::options::CompareMode;
use crate::core::symlink::LinkMode;
use crate::error::{ErrorContext, NobusError, Result};

/// File name looked up at the project root
pub const CONFIG_FILE_NAME: &str = "nobus.toml";

/// Main nobus configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NobusConfig {
    pub cache: CacheSettings,
    pub ignore: IgnoreSettings,
    pub ui: UiConfig,
}

/// How snapshots are created and compared
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// How unchanged files are carried into a new snapshot
    pub link_mode: LinkMode,
    /// Skip creating a snapshot when nothing changed since the last one
    pub prevent_duplication: bool,
    /// Derive snapshot labels from the resource fingerprint
    pub seeded_labels: bool,
    /// Take an advisory lock on the cache root while creating snapshots
    pub lock_cache_root: bool,
    /// Content comparison strategy ("full" or "shallow")
    pub compare: CompareMode,
}

/// Names excluded from directory enumeration and snapshot discovery
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IgnoreSettings {
    /// Keep `__pycache__` and `.ipynb_checkpoints` in the ignore set
    pub use_defaults: bool,
    /// Additional directory names to ignore
    pub extra: Vec<String>,
}

/// UI and display configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// Whether to show progress bars while materializing snapshots
    pub progress_bars: bool,
    /// Log level (error, warn, info, debug, trace)
    pub log_level: String,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            link_mode: LinkMode::platform_default(),
            prevent_duplication: true,
            seeded_labels: false,
            lock_cache_root: true,
            compare: CompareMode::Full,
        }
    }
}

impl Default for IgnoreSettings {
    fn default() -> Self {
        Self {
            use_defaults: true,
            extra: Vec::new(),
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            progress_bars: false,
            log_level: "info".to_string(),
        }
    }
}

impl IgnoreSettings {
    /// The ignore predicate these settings describe
    pub fn to_ignore(&self) -> Ignore {
        match (self.use_defaults, self.extra.is_empty()) {
            (true, _) => Ignore::with_extra(self.extra.iter().cloned()),
            (false, true) => Ignore::none(),
            (false, false) => Ignore::names(self.extra.iter().cloned()),
        }
    }
}

impl NobusConfig {
    /// Load configuration from file or create default
    pub fn load<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let config_path = config_path.as_ref();

        if config_path.exists() {
            let content = fs::read_to_string(config_path)
                .with_io_context(|| format!("reading config file {}", config_path.display()))?;

            toml::from_str(&content)
                .map_err(|e| NobusError::Config {
                    message: format!("Invalid TOML: {}", e),
                    path: Some(config_path.to_path_buf()),
                })
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub fn save<P: AsRef<Path>>(&self, config_path: P) -> Result<()> {
        let config_path = config_path.as_ref();

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)
                .with_io_context(|| format!("creating config directory {}", parent.display()))?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| NobusError::Config {
                message: format!("Failed to serialize config: {}", e),
                path: Some(config_path.to_path_buf()),
            })?;

        fs::write(config_path, content)
            .with_io_context(|| format!("writing config file {}", config_path.display()))?;

        Ok(())
    }

    /// Get the project configuration file path
    pub fn project_config_path<P: AsRef<Path>>(project_root: P) -> PathBuf {
        project_root.as_ref().join(CONFIG_FILE_NAME)
    }

    /// Load `nobus.toml` from a project root, falling back to defaults
    pub fn load_project<P: AsRef<Path>>(project_root: P) -> Result<Self> {
        Self::load(Self::project_config_path(project_root))
    }
}
