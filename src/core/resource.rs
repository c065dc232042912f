use std::fs;
use std::path::{Component, Path, PathBuf};

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::config::NobusConfig;
use crate::core::fsops::remove_tree;
use crate::core::hash::{hash_concat, short_hash};
use crate::core::lock::CacheLock;
use crate::core::managed_dir::ManagedDirectory;
use crate::core::managed_file::ManagedFile;
use crate::core::options::{CacheOptions, SaveOptions};
use crate::core::project::find_project_root;
use crate::core::snapshot::{latest_snapshot, snapshot_label, CacheRef};
use crate::core::symlink::{create_link, resolve_symlink, LinkMode};
use crate::error::{ErrorContext, NobusError, Result};
use crate::progress::track;

/// One tracked member of a resource.
#[derive(Debug, Clone)]
pub enum Member {
    File(ManagedFile),
    Directory(ManagedDirectory),
}

impl From<ManagedFile> for Member {
    fn from(file: ManagedFile) -> Self {
        Member::File(file)
    }
}

impl From<ManagedDirectory> for Member {
    fn from(dir: ManagedDirectory) -> Self {
        Member::Directory(dir)
    }
}

/// A tracked file and where it sits in the selected snapshot, if anywhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFile {
    pub file: ManagedFile,
    /// Real path (symlinks followed) of the snapshot's copy.
    pub cached: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheStatus {
    /// The snapshot holds identical content at this real path.
    Cached(PathBuf),
    /// Missing from the snapshot or different; needs a fresh copy.
    Stale,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub file: ManagedFile,
    pub status: CacheStatus,
}

/// Per-file reuse decisions against one snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheDiff {
    snapshot: Option<PathBuf>,
    entries: Vec<CacheEntry>,
}

impl CacheDiff {
    /// The snapshot the diff was computed against; `None` when there was no cache.
    pub fn snapshot(&self) -> Option<&Path> {
        self.snapshot.as_deref()
    }

    pub fn entries(&self) -> &[CacheEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<CacheEntry> {
        self.entries
    }

    pub fn cached_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e.status, CacheStatus::Cached(_)))
            .count()
    }

    pub fn stale_count(&self) -> usize {
        self.entries.len() - self.cached_count()
    }

    pub fn is_fully_cached(&self) -> bool {
        self.stale_count() == 0
    }
}

/// A logical set of tracked files that is fingerprinted and cached as a unit.
#[derive(Debug, Clone, Default)]
pub struct Resource {
    members: Vec<Member>,
    base_dir: Option<PathBuf>,
    options: CacheOptions,
}

impl Resource {
    pub fn new() -> Self {
        Self::default()
    }

    /// A resource rooted at the project containing `start`, configured from
    /// its `nobus.toml` when present.
    pub fn from_project_root<P: AsRef<Path>>(start: P) -> Result<Self> {
        let root = find_project_root(start.as_ref())?;
        let config = NobusConfig::load_project(&root)?;
        debug!("Using project root {}", root.display());

        Ok(Self::new()
            .with_base_dir(root)
            .with_options(CacheOptions::from_config(&config)))
    }

    /// Base directory for members that don't carry their own.
    pub fn with_base_dir<P: AsRef<Path>>(mut self, base_dir: P) -> Self {
        self.base_dir = Some(base_dir.as_ref().to_path_buf());
        self
    }

    pub fn with_options(mut self, options: CacheOptions) -> Self {
        self.options = options;
        self
    }

    /// Track a single file, relative to the resource base dir when one is set.
    pub fn file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.track(ManagedFile::new(path));
        self
    }

    pub fn directory(mut self, dir: ManagedDirectory) -> Self {
        self.track(dir);
        self
    }

    pub fn add_file(&mut self, file: ManagedFile) {
        self.track(file);
    }

    pub fn add_directory(&mut self, dir: ManagedDirectory) {
        self.track(dir);
    }

    pub fn track(&mut self, member: impl Into<Member>) {
        self.members.push(member.into());
    }

    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn base_dir(&self) -> Option<&Path> {
        self.base_dir.as_deref()
    }

    pub fn options(&self) -> &CacheOptions {
        &self.options
    }

    /// Every tracked file, member by member; directories contribute theirs in sorted order.
    pub fn managed_files(&self) -> Result<Vec<ManagedFile>> {
        let mut files = Vec::new();

        for member in &self.members {
            match member {
                Member::File(file) => files.push(self.rebase(file)?),
                Member::Directory(dir) => files.extend(self.scope(dir).managed_files()?),
            }
        }

        Ok(files)
    }

    /// Hash over the content hashes of all tracked files, in `managed_files` order.
    pub fn fingerprint(&self) -> Result<String> {
        let hashes = self
            .managed_files()?
            .iter()
            .map(ManagedFile::hash)
            .collect::<Result<Vec<_>>>()?;
        let fingerprint = hash_concat(&hashes);

        debug!("Fingerprint of {} files: {}", hashes.len(), short_hash(&fingerprint));
        Ok(fingerprint)
    }

    /// Locate every tracked file inside the snapshot `cache` selects.
    pub fn resolve(&self, cache: &CacheRef) -> Result<Vec<ResolvedFile>> {
        let snapshot = cache.select(&self.options.ignore)?;
        self.resolve_in(snapshot.as_deref())
    }

    /// Decide per file whether the selected snapshot can be reused.
    pub fn calc_cache(&self, cache: &CacheRef) -> Result<CacheDiff> {
        let snapshot = cache.select(&self.options.ignore)?;
        self.diff_against(snapshot)
    }

    /// Materialize a snapshot of all tracked files at `dest`.
    ///
    /// Files unchanged since `reference` are linked to it per the configured
    /// link mode, everything else is copied. Returns the snapshot path, which
    /// is the reference itself when `prevent_duplication` is set and nothing
    /// changed. A failed run leaves whatever was already written in `dest`.
    pub fn save_cache<P: AsRef<Path>>(
        &self,
        dest: P,
        reference: Option<&CacheRef>,
        save: SaveOptions,
    ) -> Result<PathBuf> {
        let dest = dest.as_ref();
        self.guard_destination(dest)?;

        let snapshot = match reference {
            Some(cache) => cache.select(&self.options.ignore)?,
            None => None,
        };
        if let Some(snapshot) = &snapshot {
            if contains(dest, snapshot) {
                return Err(NobusError::invalid_argument(
                    "destination",
                    dest.display(),
                    "is or contains the reference snapshot",
                ));
            }
        }

        let diff = self.diff_against(snapshot)?;

        if save.prevent_duplication && diff.is_fully_cached() {
            if let Some(existing) = diff.snapshot() {
                info!("Nothing changed since {}, reusing it", existing.display());
                return Ok(existing.to_path_buf());
            }
        }

        if dest.symlink_metadata().is_ok() {
            if !save.overwrite {
                return Err(NobusError::already_exists("snapshot", dest.display()));
            }
            warn!("Overwriting existing snapshot {}", dest.display());
            remove_tree(dest)?;
        }

        fs::create_dir_all(dest)
            .with_io_context(|| format!("creating snapshot directory {}", dest.display()))?;
        self.materialize(dest, &diff)?;

        info!(
            "Saved snapshot {} ({} linked, {} copied)",
            dest.display(),
            diff.cached_count(),
            diff.stale_count()
        );
        Ok(dest.to_path_buf())
    }

    /// Create a new, uniquely labelled snapshot under `cache_root`, using the
    /// most recent snapshot there as the reference.
    pub fn create_cache<P: AsRef<Path>>(&self, cache_root: P) -> Result<PathBuf> {
        let cache_root = cache_root.as_ref();

        let _lock = if self.options.lock_cache_root {
            Some(CacheLock::acquire(cache_root)?)
        } else {
            fs::create_dir_all(cache_root)
                .with_io_context(|| format!("creating cache root {}", cache_root.display()))?;
            None
        };

        let reference = latest_snapshot(cache_root, &self.options.ignore)?;

        let seed = if self.options.seeded_labels {
            Some(self.fingerprint()?)
        } else {
            None
        };
        let label = snapshot_label(
            self.options.labels.as_ref(),
            seed.as_deref().map(str::as_bytes),
            Utc::now(),
        );
        let dest = cache_root.join(label);

        self.save_cache(
            &dest,
            reference.map(CacheRef::Snapshot).as_ref(),
            SaveOptions {
                overwrite: false,
                prevent_duplication: self.options.prevent_duplication,
            },
        )
    }

    fn rebase(&self, file: &ManagedFile) -> Result<ManagedFile> {
        let (Some(base), None) = (&self.base_dir, file.base_dir()) else {
            return Ok(file.clone());
        };

        let path = file.relative_path();
        if path.is_relative() {
            ManagedFile::with_base(path, base)
        } else if let Ok(relative) = path.strip_prefix(base) {
            ManagedFile::with_base(relative, base)
        } else {
            Ok(file.clone())
        }
    }

    /// A directory member with the resource's base dir and ignore filled in
    /// where it doesn't set its own.
    fn scope(&self, dir: &ManagedDirectory) -> ManagedDirectory {
        let mut dir = dir.clone();
        if let (Some(base), None) = (&self.base_dir, dir.base_dir()) {
            dir = dir.with_base_dir(base);
        }
        if dir.ignore().is_none() {
            dir = dir.with_ignore(self.options.ignore.clone());
        }
        dir
    }

    fn resolve_in(&self, snapshot: Option<&Path>) -> Result<Vec<ResolvedFile>> {
        self.managed_files()?
            .into_iter()
            .map(|file| {
                let relative = file.snapshot_path()?;
                let cached = match snapshot {
                    Some(snapshot) => resolve_entry(&snapshot.join(relative))?,
                    None => None,
                };
                Ok(ResolvedFile { file, cached })
            })
            .collect()
    }

    fn diff_against(&self, snapshot: Option<PathBuf>) -> Result<CacheDiff> {
        let shallow = self.options.compare.is_shallow();
        let mut entries = Vec::new();

        for ResolvedFile { file, cached } in self.resolve_in(snapshot.as_deref())? {
            let status = match cached {
                Some(real) if file.compare(&real, shallow)? => CacheStatus::Cached(real),
                _ => CacheStatus::Stale,
            };
            entries.push(CacheEntry { file, status });
        }

        let diff = CacheDiff { snapshot, entries };
        debug!(
            "Cache diff: {} cached, {} stale",
            diff.cached_count(),
            diff.stale_count()
        );
        Ok(diff)
    }

    fn materialize(&self, dest: &Path, diff: &CacheDiff) -> Result<()> {
        let entries = diff.entries();
        let message = format!("Writing {}", dest.display());

        for entry in track(entries, entries.len() as u64, &message, self.options.show_progress) {
            let target = dest.join(entry.file.snapshot_path()?);
            match &entry.status {
                CacheStatus::Cached(real) => create_link(self.options.link_mode, real, &target)?,
                CacheStatus::Stale => create_link(LinkMode::Copy, entry.file.full_path(), &target)?,
            }
        }

        Ok(())
    }

    /// Refuse destinations that are, or would swallow, one of the tracked source trees.
    fn guard_destination(&self, dest: &Path) -> Result<()> {
        let member_bases = self.members.iter().filter_map(|member| match member {
            Member::File(file) => file.base_dir(),
            Member::Directory(dir) => dir.base_dir(),
        });

        for base in self.base_dir.as_deref().into_iter().chain(member_bases) {
            if contains(dest, base) {
                return Err(NobusError::invalid_argument(
                    "destination",
                    dest.display(),
                    format!("is or contains the tracked base dir {}", base.display()),
                ));
            }
        }

        Ok(())
    }
}

/// Real path of a snapshot entry, `None` if absent, `Inconsistent` if it is not a file.
fn resolve_entry(path: &Path) -> Result<Option<PathBuf>> {
    match fs::symlink_metadata(path) {
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(NobusError::Io {
            source: e,
            context: format!("inspecting snapshot entry {}", path.display()),
        }),
        Ok(meta) if meta.file_type().is_symlink() && path.is_file() => {
            resolve_symlink(path).map(Some)
        }
        Ok(_) if path.is_file() => path
            .canonicalize()
            .map(Some)
            .with_io_context(|| format!("resolving snapshot entry {}", path.display())),
        Ok(meta) => Err(NobusError::inconsistent(
            path,
            if meta.is_dir() {
                "expected a file, found a directory"
            } else {
                "expected a file, found a non-file entry"
            },
        )),
    }
}

/// Whether `path` is `ancestor` or lies somewhere below it.
fn contains(ancestor: &Path, path: &Path) -> bool {
    physical(path).starts_with(physical(ancestor))
}

/// Canonical form of an existing path, else a lexically normalized absolute one.
fn physical(path: &Path) -> PathBuf {
    if let Ok(real) = path.canonicalize() {
        return real;
    }

    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };

    let mut normalized = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other),
        }
    }
    normalized
}
