//! Store contract and the two built-in backends.
//!
//! A store knows exactly three things: LIST every document with its
//! content and timestamp, POLL the timestamps alone, and SAVE one
//! document returning the acknowledged timestamp. Timestamps are opaque
//! beyond ordering; the directory backend uses unix seconds, the
//! in-memory backend a monotonic counter.
//!
//! Every backend enforces the same save rules: a name and content must
//! both be present, path components are stripped so the document lands
//! under its basename (names reducing to `.`/`..`/empty are rejected),
//! and the content must contain a `<svg` drawing marker.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use super::error::StoreError;

/// One document as the store holds it.
#[derive(Debug, Clone)]
pub struct StoredFile {
    pub name: String,
    pub content: String,
    pub mtime: u64,
}

/// The persistence seam of a session.
pub trait Store {
    /// Short human label for status lines.
    fn label(&self) -> &'static str;

    /// Every document with content and timestamp.
    fn list(&self) -> Result<Vec<StoredFile>, StoreError>;

    /// Timestamps only, keyed by name. Cheap enough to call on a timer.
    fn poll(&self) -> Result<FxHashMap<String, u64>, StoreError>;

    /// Persist one document, returning the acknowledged timestamp.
    fn save(&mut self, name: &str, content: &str) -> Result<u64, StoreError>;
}

/// Reduce a client-supplied name to a safe basename. Rejects anything
/// that reduces to empty, `.` or `..`.
pub fn sanitize_name(name: &str) -> Option<&str> {
    let base = name.rsplit(['/', '\\']).next()?;
    match base {
        "" | "." | ".." => None,
        _ => Some(base),
    }
}

fn validate_save(name: &str, content: &str) -> Result<String, StoreError> {
    if name.is_empty() || content.is_empty() {
        return Err(StoreError::MissingData);
    }
    let base = sanitize_name(name).ok_or(StoreError::InvalidContent)?;
    if !content.contains("<svg") {
        return Err(StoreError::InvalidContent);
    }
    Ok(base.to_string())
}

// ============================================================================
// Directory store
// ============================================================================

/// Store backed by a directory of `.svg` files.
pub struct DirStore {
    dir: PathBuf,
}

impl DirStore {
    /// Open (creating if needed) the given directory.
    pub fn open(dir: &Path) -> Result<Self, StoreError> {
        fs::create_dir_all(dir)
            .map_err(|e| StoreError::Unavailable(format!("{}: {e}", dir.display())))?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn svg_paths(&self) -> Result<Vec<PathBuf>, StoreError> {
        let entries = fs::read_dir(&self.dir)
            .map_err(|e| StoreError::Unavailable(format!("{}: {e}", self.dir.display())))?;
        let mut paths = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "svg") {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths)
    }
}

fn mtime_secs(path: &Path) -> Result<u64, StoreError> {
    let modified = fs::metadata(path)?.modified()?;
    Ok(modified
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0))
}

impl Store for DirStore {
    fn label(&self) -> &'static str {
        "dir"
    }

    fn list(&self) -> Result<Vec<StoredFile>, StoreError> {
        let mut files = Vec::new();
        for path in self.svg_paths()? {
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            files.push(StoredFile {
                name: name.to_string(),
                content: fs::read_to_string(&path)?,
                mtime: mtime_secs(&path)?,
            });
        }
        Ok(files)
    }

    fn poll(&self) -> Result<FxHashMap<String, u64>, StoreError> {
        let mut mtimes = FxHashMap::default();
        for path in self.svg_paths()? {
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            mtimes.insert(name.to_string(), mtime_secs(&path)?);
        }
        Ok(mtimes)
    }

    fn save(&mut self, name: &str, content: &str) -> Result<u64, StoreError> {
        let base = validate_save(name, content)?;
        let path = self.dir.join(base);
        fs::write(&path, content)?;
        mtime_secs(&path)
    }
}

// ============================================================================
// In-memory store
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
struct MemEntry {
    content: String,
    mtime: u64,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct MemState {
    clock: u64,
    entries: FxHashMap<String, MemEntry>,
}

/// Local-only store used when no directory backend is available.
/// Timestamps come from a monotonic counter; state optionally persists
/// to a JSON blob so a later session can pick it back up.
pub struct MemStore {
    state: MemState,
    blob: Option<PathBuf>,
}

impl MemStore {
    /// Purely in-memory, nothing persisted.
    pub fn ephemeral() -> Self {
        Self {
            state: MemState::default(),
            blob: None,
        }
    }

    /// Backed by a JSON blob; picks up earlier state when the blob
    /// parses, starts empty otherwise.
    pub fn open(blob: &Path) -> Self {
        let state = fs::read_to_string(blob)
            .ok()
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_default();
        Self {
            state,
            blob: Some(blob.to_path_buf()),
        }
    }

    fn persist(&self) -> Result<(), StoreError> {
        let Some(blob) = &self.blob else {
            return Ok(());
        };
        if let Some(parent) = blob.parent() {
            fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_string(&self.state)
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        fs::write(blob, raw)?;
        Ok(())
    }
}

impl Store for MemStore {
    fn label(&self) -> &'static str {
        "local"
    }

    fn list(&self) -> Result<Vec<StoredFile>, StoreError> {
        let mut files: Vec<StoredFile> = self
            .state
            .entries
            .iter()
            .map(|(name, entry)| StoredFile {
                name: name.clone(),
                content: entry.content.clone(),
                mtime: entry.mtime,
            })
            .collect();
        files.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(files)
    }

    fn poll(&self) -> Result<FxHashMap<String, u64>, StoreError> {
        Ok(self
            .state
            .entries
            .iter()
            .map(|(name, entry)| (name.clone(), entry.mtime))
            .collect())
    }

    fn save(&mut self, name: &str, content: &str) -> Result<u64, StoreError> {
        let base = validate_save(name, content)?;
        self.state.clock += 1;
        let mtime = self.state.clock;
        self.state.entries.insert(
            base,
            MemEntry {
                content: content.to_string(),
                mtime,
            },
        );
        self.persist()?;
        Ok(mtime)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const ICON: &str = r#"<svg viewBox="0 0 24 24"><path d="M0 0"/></svg>"#;

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("icon.svg"), Some("icon.svg"));
        assert_eq!(sanitize_name("a/b/icon.svg"), Some("icon.svg"));
        assert_eq!(sanitize_name("..\\icon.svg"), Some("icon.svg"));
        assert_eq!(sanitize_name(""), None);
        assert_eq!(sanitize_name("."), None);
        assert_eq!(sanitize_name("../.."), None);
        assert_eq!(sanitize_name("a/"), None);
    }

    #[test]
    fn test_save_rejections() {
        let mut store = MemStore::ephemeral();
        assert!(matches!(
            store.save("", ICON),
            Err(StoreError::MissingData)
        ));
        assert!(matches!(
            store.save("icon.svg", ""),
            Err(StoreError::MissingData)
        ));
        assert!(matches!(
            store.save("..", ICON),
            Err(StoreError::InvalidContent)
        ));
        assert!(matches!(
            store.save("a/..", ICON),
            Err(StoreError::InvalidContent)
        ));
        assert!(matches!(
            store.save("icon.svg", "<div>not a drawing</div>"),
            Err(StoreError::InvalidContent)
        ));
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_save_strips_path_components() {
        let mut store = MemStore::ephemeral();
        store.save("a/b/icon.svg", ICON).unwrap();
        store.save("..\\up.svg", ICON).unwrap();

        let names: Vec<String> = store.list().unwrap().into_iter().map(|f| f.name).collect();
        assert_eq!(names, vec!["icon.svg", "up.svg"]);
    }

    #[test]
    fn test_dir_store_saves_under_basename() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = DirStore::open(tmp.path()).unwrap();
        store.save("nested/dir/icon.svg", ICON).unwrap();

        assert!(tmp.path().join("icon.svg").is_file());
        assert!(!tmp.path().join("nested").exists());
    }

    #[test]
    fn test_dir_store_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = DirStore::open(tmp.path()).unwrap();

        let mtime = store.save("icon.svg", ICON).unwrap();
        assert!(mtime > 0);

        let files = store.list().unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name, "icon.svg");
        assert_eq!(files[0].content, ICON);
        assert_eq!(files[0].mtime, mtime);

        let mtimes = store.poll().unwrap();
        assert_eq!(mtimes.get("icon.svg"), Some(&mtime));
    }

    #[test]
    fn test_dir_store_ignores_non_svg() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("notes.txt"), "hi").unwrap();
        std::fs::write(tmp.path().join("icon.svg"), ICON).unwrap();

        let store = DirStore::open(tmp.path()).unwrap();
        let names: Vec<String> = store.list().unwrap().into_iter().map(|f| f.name).collect();
        assert_eq!(names, vec!["icon.svg"]);
    }

    #[test]
    fn test_mem_store_mtimes_are_monotonic() {
        let mut store = MemStore::ephemeral();
        let first = store.save("a.svg", ICON).unwrap();
        let second = store.save("a.svg", ICON).unwrap();
        let third = store.save("b.svg", ICON).unwrap();
        assert!(first < second && second < third);
        assert_eq!(store.poll().unwrap().get("a.svg"), Some(&second));
    }

    #[test]
    fn test_mem_store_persists_between_sessions() {
        let tmp = tempfile::tempdir().unwrap();
        let blob = tmp.path().join("state/local.json");

        let mut store = MemStore::open(&blob);
        let mtime = store.save("icon.svg", ICON).unwrap();
        drop(store);

        let reopened = MemStore::open(&blob);
        let files = reopened.list().unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].mtime, mtime);
        assert_eq!(files[0].content, ICON);
    }
}
