pub mod fsops;
pub mod hash;
pub mod ignore;
pub mod labels;
pub mod lock;
pub mod managed_dir;
pub mod managed_file;
pub mod options;
pub mod project;
pub mod resource;
pub mod snapshot;
pub mod symlink;

pub use hash::{compute_content_hash, hash_concat, hash_file};
pub use ignore::{Ignore, DEFAULT_IGNORE_NAMES};
pub use labels::{LabelGenerator, WordLabelGenerator};
pub use lock::CacheLock;
pub use managed_dir::ManagedDirectory;
pub use managed_file::{compare_files, ManagedFile};
pub use options::{CacheOptions, CompareMode, SaveOptions};
pub use project::find_project_root;
pub use resource::{CacheDiff, CacheEntry, CacheStatus, Member, ResolvedFile, Resource};
pub use snapshot::{latest_snapshot, list_snapshots, CacheRef, SnapshotInfo};
pub use symlink::{create_link, LinkMode};
