//! Content-addressed snapshots of project files.
//!
//! A [`Resource`] groups tracked files and directories. Each call to
//! [`Resource::create_cache`] writes a timestamped snapshot under a cache
//! root, linking files that are unchanged since the previous snapshot and
//! copying the rest.

pub mod config;
pub mod core;
pub mod error;
pub mod logging;
pub mod progress;

pub use config::NobusConfig;
pub use core::{
    CacheDiff, CacheOptions, CacheRef, CacheStatus, CompareMode, Ignore, LinkMode,
    ManagedDirectory, ManagedFile, Resource, SaveOptions, SnapshotInfo,
};
pub use error::{NobusError, Result};
