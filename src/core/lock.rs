use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, OnceLock};

use fs2::FileExt as _;
use tracing::debug;

use crate::error::{ErrorContext, Result};

/// Name of the lock file kept at the top of a cache root.
pub const LOCK_FILE_NAME: &str = ".nobus.lock";

/// Exclusive advisory lock on a cache root, held until dropped.
///
/// `fs2` locks only exclude other processes on unix, so a per-path mutex
/// covers threads of the current process.
#[derive(Debug)]
pub struct CacheLock {
    file: File,
    path: PathBuf,
    _guard: MutexGuard<'static, ()>,
}

impl CacheLock {
    /// Block until the lock for `cache_root` is ours. Creates the root if needed.
    pub fn acquire(cache_root: &Path) -> Result<Self> {
        fs::create_dir_all(cache_root)
            .with_io_context(|| format!("creating cache root {}", cache_root.display()))?;

        let path = cache_root.join(LOCK_FILE_NAME);
        let guard = process_lock_for(&path)
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&path)
            .with_io_context(|| format!("opening lock file {}", path.display()))?;
        file.lock_exclusive()
            .with_io_context(|| format!("locking {}", path.display()))?;

        debug!("Acquired cache lock {}", path.display());
        Ok(Self {
            file,
            path,
            _guard: guard,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for CacheLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

fn process_lock_for(path: &Path) -> &'static Mutex<()> {
    static LOCKS: OnceLock<Mutex<HashMap<PathBuf, &'static Mutex<()>>>> = OnceLock::new();

    let mut map = LOCKS
        .get_or_init(|| Mutex::new(HashMap::new()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());

    if let Some(existing) = map.get(path) {
        return existing;
    }

    let mutex: &'static Mutex<()> = Box::leak(Box::new(Mutex::new(())));
    map.insert(path.to_path_buf(), mutex);
    mutex
}
