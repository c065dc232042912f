use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::Serialize;
use tracing::debug;

use crate::core::ignore::Ignore;
use crate::core::labels::LabelGenerator;
use crate::error::{ErrorContext, NobusError, Result};

/// Prefix of every snapshot name. Fixed width, so names sort chronologically.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S%.6f";

/// Which snapshot a cache operation should work against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheRef {
    /// One specific snapshot directory
    Snapshot(PathBuf),
    /// A cache root; the most recent snapshot inside it is used
    Root(PathBuf),
}

impl CacheRef {
    /// Build from a pair of optional selectors; exactly one must be given.
    pub fn from_options(snapshot: Option<&Path>, cache_root: Option<&Path>) -> Result<Self> {
        match (snapshot, cache_root) {
            (Some(snapshot), None) => Ok(CacheRef::Snapshot(snapshot.to_path_buf())),
            (None, Some(root)) => Ok(CacheRef::Root(root.to_path_buf())),
            (Some(snapshot), Some(root)) => Err(NobusError::invalid_argument(
                "cache selection",
                format!("{} / {}", snapshot.display(), root.display()),
                "give either a snapshot or a cache root, not both",
            )),
            (None, None) => Err(NobusError::invalid_argument(
                "cache selection",
                "<none>",
                "a snapshot or a cache root is required",
            )),
        }
    }

    /// The concrete snapshot directory, or `None` when a cache root holds no snapshots.
    pub fn select(&self, ignore: &Ignore) -> Result<Option<PathBuf>> {
        match self {
            CacheRef::Snapshot(path) => {
                if path.is_dir() {
                    Ok(Some(path.clone()))
                } else {
                    Err(NobusError::not_found("snapshot", path.display()))
                }
            }
            CacheRef::Root(root) => latest_snapshot(root, ignore),
        }
    }
}

/// A snapshot directory found under a cache root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotInfo {
    pub name: String,
    pub path: PathBuf,
    /// Parsed from the name's timestamp prefix, when it has one.
    pub created_at: Option<DateTime<Utc>>,
}

/// All snapshots directly under `cache_root`, oldest first.
///
/// Hidden entries, non-directories and ignored names are skipped. A missing
/// cache root simply has no snapshots.
pub fn list_snapshots(cache_root: &Path, ignore: &Ignore) -> Result<Vec<SnapshotInfo>> {
    let mut snapshots = Vec::new();

    if !cache_root.is_dir() {
        return Ok(snapshots);
    }

    let entries = fs::read_dir(cache_root)
        .with_io_context(|| format!("reading cache root {}", cache_root.display()))?;

    for entry in entries {
        let entry = entry
            .with_io_context(|| format!("reading entry in {}", cache_root.display()))?;

        let is_dir = entry
            .file_type()
            .with_io_context(|| "getting file type for cache entry".to_string())?
            .is_dir();
        let name = entry.file_name().to_string_lossy().to_string();

        if !is_dir || name.starts_with('.') || ignore.is_ignored(Path::new(&name)) {
            continue;
        }

        snapshots.push(SnapshotInfo {
            created_at: parse_snapshot_time(&name),
            path: entry.path(),
            name,
        });
    }

    snapshots.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(snapshots)
}

/// The most recently created snapshot under `cache_root`, if any.
pub fn latest_snapshot(cache_root: &Path, ignore: &Ignore) -> Result<Option<PathBuf>> {
    let latest = list_snapshots(cache_root, ignore)?.pop().map(|info| info.path);

    match &latest {
        Some(path) => debug!("Latest snapshot in {}: {}", cache_root.display(), path.display()),
        None => debug!("No snapshots in {}", cache_root.display()),
    }

    Ok(latest)
}

/// `<timestamp>_<label>` for a new snapshot created at `now`.
pub fn snapshot_label(
    generator: &dyn LabelGenerator,
    seed: Option<&[u8]>,
    now: DateTime<Utc>,
) -> String {
    format!("{}_{}", now.format(TIMESTAMP_FORMAT), generator.generate(seed))
}

/// Creation time encoded in a snapshot name, if the name carries one.
pub fn parse_snapshot_time(name: &str) -> Option<DateTime<Utc>> {
    let (prefix, _) = name.split_once('_')?;
    let naive = NaiveDateTime::parse_from_str(prefix, TIMESTAMP_FORMAT).ok()?;
    Some(Utc.from_utc_datetime(&naive))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::labels::WordLabelGenerator;
    use chrono::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_from_options() {
        let a = Path::new("/cache/snap");
        let b = Path::new("/cache");

        assert_eq!(
            CacheRef::from_options(Some(a), None).unwrap(),
            CacheRef::Snapshot(a.to_path_buf())
        );
        assert_eq!(
            CacheRef::from_options(None, Some(b)).unwrap(),
            CacheRef::Root(b.to_path_buf())
        );
        assert!(matches!(
            CacheRef::from_options(Some(a), Some(b)).unwrap_err(),
            NobusError::InvalidArgument { .. }
        ));
        assert!(matches!(
            CacheRef::from_options(None, None).unwrap_err(),
            NobusError::InvalidArgument { .. }
        ));
    }

    #[test]
    fn test_labels_sort_chronologically() {
        let generator = WordLabelGenerator;
        let t0 = Utc::now();
        let earlier = snapshot_label(&generator, None, t0);
        let later = snapshot_label(&generator, None, t0 + Duration::microseconds(1));
        let much_later = snapshot_label(&generator, None, t0 + Duration::days(400));

        assert!(earlier < later);
        assert!(later < much_later);
    }

    #[test]
    fn test_parse_snapshot_time() {
        let now = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        let label = snapshot_label(&WordLabelGenerator, Some(b"seed"), now);

        assert!(label.starts_with("20240309-140507.000000_"));
        assert_eq!(parse_snapshot_time(&label), Some(now));
        assert_eq!(parse_snapshot_time("hand-made"), None);
    }

    #[test]
    fn test_latest_snapshot_filters() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::create_dir(root.join("20240101-000000.000000_old")).unwrap();
        fs::create_dir(root.join("20240102-000000.000000_new")).unwrap();
        fs::create_dir(root.join("__pycache__")).unwrap();
        fs::create_dir(root.join(".staging")).unwrap();
        fs::write(root.join("zzz-not-a-dir"), "").unwrap();

        let latest = latest_snapshot(root, &Ignore::default()).unwrap();
        assert_eq!(latest, Some(root.join("20240102-000000.000000_new")));

        let all = list_snapshots(root, &Ignore::default()).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].name, "20240101-000000.000000_old");
        assert!(all[0].created_at.is_some());
    }

    #[test]
    fn test_empty_or_missing_root() {
        let temp = TempDir::new().unwrap();
        assert_eq!(latest_snapshot(temp.path(), &Ignore::default()).unwrap(), None);
        assert_eq!(
            latest_snapshot(&temp.path().join("missing"), &Ignore::default()).unwrap(),
            None
        );
    }

    #[test]
    fn test_select_explicit_snapshot() {
        let temp = TempDir::new().unwrap();
        let snap = temp.path().join("snap");
        fs::create_dir(&snap).unwrap();

        let selected = CacheRef::Snapshot(snap.clone()).select(&Ignore::default()).unwrap();
        assert_eq!(selected, Some(snap));

        let err = CacheRef::Snapshot(temp.path().join("gone"))
            .select(&Ignore::default())
            .unwrap_err();
        assert!(matches!(err, NobusError::NotFound { .. }));
    }
}
