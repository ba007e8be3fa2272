//! Session state and the optimistic-concurrency sync protocol.
//!
//! A `Session` holds the working copies of every document, a per-file
//! record of the last acknowledged store timestamp plus a dirty flag,
//! and the global undo history. The protocol is deliberately simple:
//!
//! - every local edit marks its file dirty; only a successful save
//!   acknowledgment clears the flag
//! - `poll` compares remote timestamps against the records: an unknown
//!   name triggers a full reload, a newer timestamp on a clean file
//!   triggers a reload, a newer timestamp on a dirty file is reported
//!   as a conflict and nothing is overwritten
//! - reloads never touch dirty files, so unsaved work survives both
//!   remote changes and remote deletions

pub mod error;
pub mod store;

pub use error::{StoreError, SyncError};
pub use store::{DirStore, MemStore, Store, StoredFile};

use rustc_hash::FxHashMap;

use crate::classify;
use crate::history::History;
use crate::{debug, log};
use crate::palette::Palette;
use crate::svg::SvgDoc;

/// Tuning knobs for a session.
#[derive(Debug, Clone, Copy)]
pub struct SessionOptions {
    /// Whether `poll` does anything at all.
    pub polling: bool,
    /// Width/height ratio documents are normalized toward.
    pub target_ratio: f64,
    /// Allowed ratio deviation before normalization kicks in.
    pub ratio_tolerance: f64,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            polling: false,
            target_ratio: 1.0,
            ratio_tolerance: 0.05,
        }
    }
}

/// Per-file sync record: last acknowledged store timestamp and whether
/// local edits are unsaved. `mtime` never decreases; `dirty` flips back
/// to false only through a save acknowledgment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileRecord {
    pub mtime: u64,
    pub dirty: bool,
}

/// What a full reload did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LoadSummary {
    /// Files freshly (re)loaded from the store.
    pub loaded: usize,
    /// Dirty files whose local state was preserved.
    pub kept_dirty: usize,
    /// Files skipped because their content failed to parse.
    pub skipped: usize,
}

/// What one poll pass found.
#[derive(Debug, Default)]
pub struct PollOutcome {
    /// Polling was disabled or paused; nothing was checked.
    pub skipped: bool,
    /// Set when a reload ran, with its summary.
    pub reloaded: Option<LoadSummary>,
    /// Dirty files with newer remote timestamps. Reported, never resolved.
    pub conflicts: Vec<String>,
}

/// Totals from sweeping every document.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepSummary {
    pub files_changed: usize,
    pub shapes_changed: usize,
}

/// Failures collected by `save_all`; successful files are already clean.
pub type SaveFailures = Vec<(String, SyncError)>;

pub struct Session {
    store: Box<dyn Store>,
    pub palette: Palette,
    docs: FxHashMap<String, SvgDoc>,
    files: FxHashMap<String, FileRecord>,
    history: History,
    options: SessionOptions,
    paused: bool,
}

impl Session {
    pub fn new(store: Box<dyn Store>, palette: Palette, options: SessionOptions) -> Self {
        Self {
            store,
            palette,
            docs: FxHashMap::default(),
            files: FxHashMap::default(),
            history: History::new(),
            options,
            paused: false,
        }
    }

    pub fn store_label(&self) -> &'static str {
        self.store.label()
    }

    /// Direct store access, for seeding and for callers that bypass the
    /// working copies (an external writer does the same thing).
    pub fn store_mut(&mut self) -> &mut dyn Store {
        self.store.as_mut()
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// Suspend polling without forgetting that it is enabled.
    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Known file names, sorted.
    pub fn file_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.docs.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn record(&self, file: &str) -> Option<&FileRecord> {
        self.files.get(file)
    }

    pub fn is_dirty(&self, file: &str) -> bool {
        self.files.get(file).is_some_and(|record| record.dirty)
    }

    /// Names of files with unsaved edits, sorted.
    pub fn dirty_files(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .files
            .iter()
            .filter(|(_, record)| record.dirty)
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    pub fn doc(&self, file: &str) -> Option<&SvgDoc> {
        self.docs.get(file)
    }

    /// Serialized markup of a working copy.
    pub fn markup(&self, file: &str) -> Option<String> {
        self.docs.get(file).map(SvgDoc::to_markup)
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    // ========================================================================
    // Loading
    // ========================================================================

    /// Replace the working set with the store's listing.
    ///
    /// Dirty files keep their local document and record, whether the
    /// listing still names them or not. Content that fails to parse is
    /// skipped with a log line rather than aborting the load.
    pub fn load_all(&mut self) -> Result<LoadSummary, SyncError> {
        let listing = self.store.list()?;
        let mut docs = FxHashMap::default();
        let mut files = FxHashMap::default();
        let mut summary = LoadSummary::default();

        for stored in listing {
            if self.is_dirty(&stored.name) {
                if let Some(doc) = self.docs.remove(&stored.name) {
                    docs.insert(stored.name.clone(), doc);
                }
                if let Some(record) = self.files.remove(&stored.name) {
                    files.insert(stored.name.clone(), record);
                }
                summary.kept_dirty += 1;
                continue;
            }
            match SvgDoc::parse(&stored.content) {
                Ok(doc) => {
                    docs.insert(stored.name.clone(), doc);
                    files.insert(
                        stored.name,
                        FileRecord {
                            mtime: stored.mtime,
                            dirty: false,
                        },
                    );
                    summary.loaded += 1;
                }
                Err(e) => {
                    log!("error"; "skipping {}: {e}", stored.name);
                    summary.skipped += 1;
                }
            }
        }

        // Dirty files the listing no longer names survive the reload.
        for (name, record) in self.files.drain() {
            if record.dirty && !files.contains_key(&name) {
                if let Some(doc) = self.docs.remove(&name) {
                    docs.insert(name.clone(), doc);
                    files.insert(name, record);
                    summary.kept_dirty += 1;
                }
            }
        }

        self.docs = docs;
        self.files = files;
        Ok(summary)
    }

    /// Bring a new document into the session as an unsaved local file.
    pub fn import(&mut self, name: &str, content: &str) -> Result<(), SyncError> {
        let doc = SvgDoc::parse(content)?;
        self.docs.insert(name.to_string(), doc);
        self.mark_dirty(name);
        Ok(())
    }

    // ========================================================================
    // Edits
    // ========================================================================

    /// Assign a palette role to a shape, addressed by pre-order index.
    pub fn assign_role(&mut self, file: &str, shape: usize, role: &str) -> Result<(), SyncError> {
        let role_color = self.role_color(role)?;
        let doc = self.doc_mut(file)?;
        let snapshot = doc.to_markup();
        let element = doc
            .element_mut(shape)
            .ok_or(SyncError::UnknownShape(shape))?;
        classify::assign_role(element, role, &role_color);
        self.history.push(file, snapshot);
        self.mark_dirty(file);
        Ok(())
    }

    /// Assign a palette role to the document's background rectangle,
    /// creating the rectangle first when the document has none.
    pub fn assign_background_role(&mut self, file: &str, role: &str) -> Result<(), SyncError> {
        let role_color = self.role_color(role)?;
        let doc = self.doc_mut(file)?;
        let snapshot = doc.to_markup();
        let index = classify::ensure_background(doc);
        let element = doc
            .element_mut(index)
            .ok_or(SyncError::UnknownShape(index))?;
        classify::assign_role(element, role, &role_color);
        self.history.push(file, snapshot);
        self.mark_dirty(file);
        Ok(())
    }

    /// Delete a shape by pre-order index, descendants included.
    pub fn delete_shape(&mut self, file: &str, shape: usize) -> Result<(), SyncError> {
        let doc = self.doc_mut(file)?;
        let snapshot = doc.to_markup();
        if !doc.remove_element(shape) {
            return Err(SyncError::UnknownShape(shape));
        }
        self.history.push(file, snapshot);
        self.mark_dirty(file);
        Ok(())
    }

    /// Reconcile one document against the palette. Marks the file dirty
    /// only when the sweep changed something.
    pub fn sweep_file(&mut self, file: &str) -> Result<usize, SyncError> {
        let doc = self
            .docs
            .get_mut(file)
            .ok_or_else(|| SyncError::UnknownFile(file.to_string()))?;
        let changed = classify::sweep(doc, &self.palette);
        if changed > 0 {
            self.mark_dirty(file);
        }
        Ok(changed)
    }

    /// Reconcile every document against the palette.
    pub fn sweep_all(&mut self) -> SweepSummary {
        let mut summary = SweepSummary::default();
        for name in self.file_names() {
            if let Ok(changed) = self.sweep_file(&name) {
                if changed > 0 {
                    summary.files_changed += 1;
                    summary.shapes_changed += changed;
                }
            }
        }
        summary
    }

    /// Restore the most recent snapshot, whichever file it belongs to.
    /// The restored file is dirty again. Returns its name.
    pub fn undo(&mut self) -> Result<Option<String>, SyncError> {
        let Some(entry) = self.history.pop() else {
            return Ok(None);
        };
        let doc = SvgDoc::parse(&entry.snapshot)?;
        self.docs.insert(entry.file.clone(), doc);
        self.mark_dirty(&entry.file);
        Ok(Some(entry.file))
    }

    /// Grow a document's view box toward the target ratio when it
    /// deviates beyond the tolerance, then try to save immediately.
    /// A failed save leaves the file dirty for the next `save_all`.
    pub fn fix_aspect(&mut self, file: &str) -> Result<bool, SyncError> {
        let SessionOptions {
            target_ratio,
            ratio_tolerance,
            ..
        } = self.options;
        let doc = self.doc_mut(file)?;
        // Falls back to width/height (default 100x100) when no viewBox.
        let vb = doc.view_box();
        if !vb.deviates_from(target_ratio, ratio_tolerance) {
            return Ok(false);
        }
        let Some(fixed) = vb.normalized_to(target_ratio) else {
            return Ok(false);
        };

        let snapshot = doc.to_markup();
        doc.apply_view_box(&fixed);
        self.history.push(file, snapshot);
        self.mark_dirty(file);

        if let Err(e) = self.save(file) {
            log!("error"; "save failed for {file}: {e}");
        }
        Ok(true)
    }

    // ========================================================================
    // Saving and polling
    // ========================================================================

    /// Persist one working copy. On acknowledgment the record turns
    /// clean and its timestamp advances; on any error the file stays
    /// dirty and the error propagates.
    pub fn save(&mut self, file: &str) -> Result<u64, SyncError> {
        let content = self
            .markup(file)
            .ok_or_else(|| SyncError::UnknownFile(file.to_string()))?;
        let mtime = self.store.save(file, &content)?;
        if let Some(record) = self.files.get_mut(file) {
            record.dirty = false;
            record.mtime = record.mtime.max(mtime);
        }
        Ok(mtime)
    }

    /// Persist every dirty file, best-effort. Failed files stay dirty.
    pub fn save_all(&mut self) -> (usize, SaveFailures) {
        let mut saved = 0;
        let mut failures = SaveFailures::new();
        for name in self.dirty_files() {
            match self.save(&name) {
                Ok(_) => saved += 1,
                Err(e) => failures.push((name, e)),
            }
        }
        (saved, failures)
    }

    /// One pass of the change-detection protocol.
    pub fn poll(&mut self) -> Result<PollOutcome, SyncError> {
        if !self.options.polling || self.paused {
            return Ok(PollOutcome {
                skipped: true,
                ..PollOutcome::default()
            });
        }

        let remote = self.store.poll()?;
        debug!("sync"; "poll returned {} remote timestamps", remote.len());
        let mut needs_reload = false;
        let mut conflicts = Vec::new();

        let mut names: Vec<&String> = remote.keys().collect();
        names.sort();
        for name in names {
            let mtime = remote[name];
            match self.files.get(name.as_str()) {
                None => needs_reload = true,
                Some(record) if mtime > record.mtime => {
                    if record.dirty {
                        conflicts.push(name.clone());
                    } else {
                        needs_reload = true;
                    }
                }
                _ => {}
            }
        }

        for name in &conflicts {
            log!("conflict"; "{name} changed remotely but has unsaved local edits");
        }

        let reloaded = if needs_reload {
            Some(self.load_all()?)
        } else {
            None
        };
        Ok(PollOutcome {
            skipped: false,
            reloaded,
            conflicts,
        })
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn role_color(&self, role: &str) -> Result<String, SyncError> {
        self.palette
            .get(role)
            .map(str::to_string)
            .ok_or_else(|| SyncError::UnknownRole(role.to_string()))
    }

    fn doc_mut(&mut self, file: &str) -> Result<&mut SvgDoc, SyncError> {
        self.docs
            .get_mut(file)
            .ok_or_else(|| SyncError::UnknownFile(file.to_string()))
    }

    /// New files start at timestamp 0 so the first remote listing of
    /// the same name always counts as newer.
    fn mark_dirty(&mut self, file: &str) {
        self.files
            .entry(file.to_string())
            .or_insert(FileRecord {
                mtime: 0,
                dirty: false,
            })
            .dirty = true;
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const ICON: &str = r##"<svg viewBox="0 0 24 24"><path d="M0 0" fill="#ad8957"/></svg>"##;
    const WIDE: &str = r##"<svg viewBox="0 0 100 50"><path d="M0 0"/></svg>"##;

    fn polling_options() -> SessionOptions {
        SessionOptions {
            polling: true,
            ..SessionOptions::default()
        }
    }

    fn session_with(files: &[(&str, &str)]) -> Session {
        let mut store = MemStore::ephemeral();
        for (name, content) in files {
            store.save(name, content).unwrap();
        }
        let mut session = Session::new(Box::new(store), Palette::default(), polling_options());
        session.load_all().unwrap();
        session
    }

    #[test]
    fn test_load_all_populates_clean_records() {
        let session = session_with(&[("icon.svg", ICON)]);
        assert_eq!(session.file_names(), vec!["icon.svg"]);
        assert!(!session.is_dirty("icon.svg"));
        assert_eq!(session.record("icon.svg").unwrap().mtime, 1);
    }

    #[test]
    fn test_edit_marks_dirty_and_save_clears() {
        let mut session = session_with(&[("icon.svg", ICON)]);
        session.assign_role("icon.svg", 0, "gold").unwrap();
        assert!(session.is_dirty("icon.svg"));
        assert!(session.markup("icon.svg").unwrap().contains("tinct-gold"));

        let mtime = session.save("icon.svg").unwrap();
        assert!(!session.is_dirty("icon.svg"));
        assert!(mtime > 1);
        assert_eq!(session.record("icon.svg").unwrap().mtime, mtime);
    }

    #[test]
    fn test_unknown_role_rejected_without_side_effects() {
        let mut session = session_with(&[("icon.svg", ICON)]);
        let before = session.markup("icon.svg").unwrap();
        assert!(matches!(
            session.assign_role("icon.svg", 0, "nope"),
            Err(SyncError::UnknownRole(_))
        ));
        assert!(!session.is_dirty("icon.svg"));
        assert_eq!(session.markup("icon.svg").unwrap(), before);
        assert_eq!(session.history_len(), 0);
    }

    #[test]
    fn test_poll_reloads_clean_file() {
        let mut session = session_with(&[("icon.svg", ICON)]);
        let changed = r##"<svg viewBox="0 0 24 24"><rect width="4" height="4"/></svg>"##;
        session.store_mut().save("icon.svg", changed).unwrap();

        let outcome = session.poll().unwrap();
        assert!(outcome.conflicts.is_empty());
        assert_eq!(outcome.reloaded.unwrap().loaded, 1);
        assert!(session.markup("icon.svg").unwrap().contains("<rect"));
        assert_eq!(session.record("icon.svg").unwrap().mtime, 2);
    }

    #[test]
    fn test_poll_reports_conflict_and_keeps_local_edits() {
        let mut session = session_with(&[("icon.svg", ICON)]);
        session.assign_role("icon.svg", 0, "red").unwrap();

        let changed = r##"<svg viewBox="0 0 24 24"><rect width="4" height="4"/></svg>"##;
        session.store_mut().save("icon.svg", changed).unwrap();

        let outcome = session.poll().unwrap();
        assert_eq!(outcome.conflicts, vec!["icon.svg"]);
        assert!(outcome.reloaded.is_none());
        assert!(session.is_dirty("icon.svg"));
        assert!(session.markup("icon.svg").unwrap().contains("tinct-red"));

        // Nothing acknowledged the remote change, so it keeps reporting.
        let again = session.poll().unwrap();
        assert_eq!(again.conflicts, vec!["icon.svg"]);
    }

    #[test]
    fn test_poll_unknown_file_reloads_but_preserves_dirty() {
        let mut session = session_with(&[("a.svg", ICON)]);
        session.assign_role("a.svg", 0, "gold").unwrap();
        session.store_mut().save("b.svg", ICON).unwrap();

        let outcome = session.poll().unwrap();
        let summary = outcome.reloaded.unwrap();
        assert_eq!(summary.loaded, 1);
        assert_eq!(summary.kept_dirty, 1);
        assert_eq!(session.file_names(), vec!["a.svg", "b.svg"]);
        assert!(session.is_dirty("a.svg"));
        assert!(session.markup("a.svg").unwrap().contains("tinct-gold"));
    }

    #[test]
    fn test_reload_keeps_dirty_file_deleted_remotely() {
        let mut session = session_with(&[("a.svg", ICON), ("b.svg", ICON)]);
        session.assign_role("a.svg", 0, "gold").unwrap();

        // Fresh store without a.svg at all.
        let mut replacement = MemStore::ephemeral();
        replacement.save("b.svg", ICON).unwrap();
        session.store = Box::new(replacement);

        let summary = session.load_all().unwrap();
        assert_eq!(summary.kept_dirty, 1);
        assert!(session.file_names().contains(&"a.svg".to_string()));
        assert!(session.is_dirty("a.svg"));
    }

    #[test]
    fn test_poll_skipped_when_disabled_or_paused() {
        let mut store = MemStore::ephemeral();
        store.save("icon.svg", ICON).unwrap();
        let mut session = Session::new(
            Box::new(store),
            Palette::default(),
            SessionOptions::default(),
        );
        session.load_all().unwrap();
        assert!(session.poll().unwrap().skipped);

        let mut session = session_with(&[("icon.svg", ICON)]);
        session.set_paused(true);
        assert!(session.poll().unwrap().skipped);
        session.set_paused(false);
        assert!(!session.poll().unwrap().skipped);
    }

    #[test]
    fn test_rejected_save_leaves_file_dirty() {
        let mut session = session_with(&[]);
        session.import("shape.svg", "<g><path d=\"M0 0\"/></g>").unwrap();
        assert!(session.is_dirty("shape.svg"));

        // Serialized markup has no <svg marker, so the store rejects it.
        assert!(matches!(
            session.save("shape.svg"),
            Err(SyncError::Store(StoreError::InvalidContent))
        ));
        assert!(session.is_dirty("shape.svg"));
    }

    #[test]
    fn test_save_all_is_best_effort() {
        let mut session = session_with(&[("good.svg", ICON)]);
        session.assign_role("good.svg", 0, "gold").unwrap();
        session.import("bad.svg", "<g/>").unwrap();

        let (saved, failures) = session.save_all();
        assert_eq!(saved, 1);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, "bad.svg");
        assert!(!session.is_dirty("good.svg"));
        assert!(session.is_dirty("bad.svg"));
    }

    #[test]
    fn test_undo_restores_snapshot_and_marks_dirty() {
        let mut session = session_with(&[("icon.svg", ICON)]);
        let before = session.markup("icon.svg").unwrap();
        session.assign_role("icon.svg", 0, "gold").unwrap();
        session.save("icon.svg").unwrap();

        let restored = session.undo().unwrap();
        assert_eq!(restored.as_deref(), Some("icon.svg"));
        assert_eq!(session.markup("icon.svg").unwrap(), before);
        assert!(session.is_dirty("icon.svg"));

        // Stack exhausted
        assert_eq!(session.undo().unwrap(), None);
    }

    #[test]
    fn test_undo_interleaves_files() {
        let mut session = session_with(&[("a.svg", ICON), ("b.svg", ICON)]);
        session.assign_role("a.svg", 0, "gold").unwrap();
        session.assign_role("b.svg", 0, "red").unwrap();

        assert_eq!(session.undo().unwrap().as_deref(), Some("b.svg"));
        assert_eq!(session.undo().unwrap().as_deref(), Some("a.svg"));
    }

    #[test]
    fn test_delete_shape_then_undo() {
        let mut session = session_with(&[("icon.svg", ICON)]);
        session.delete_shape("icon.svg", 0).unwrap();
        assert!(!session.markup("icon.svg").unwrap().contains("<path"));

        session.undo().unwrap();
        assert!(session.markup("icon.svg").unwrap().contains("<path"));
    }

    #[test]
    fn test_sweep_all_marks_only_changed_files() {
        let plain = r##"<svg viewBox="0 0 24 24"><path fill="#0000ff"/></svg>"##;
        let mut session = session_with(&[("gold.svg", ICON), ("plain.svg", plain)]);

        let summary = session.sweep_all();
        assert_eq!(summary.files_changed, 1);
        assert_eq!(summary.shapes_changed, 1);
        assert!(session.is_dirty("gold.svg"));
        assert!(!session.is_dirty("plain.svg"));
    }

    #[test]
    fn test_fix_aspect_normalizes_and_saves() {
        let mut session = session_with(&[("wide.svg", WIDE)]);
        assert!(session.fix_aspect("wide.svg").unwrap());

        // Saved immediately, so the record is clean again.
        assert!(!session.is_dirty("wide.svg"));
        let markup = session.markup("wide.svg").unwrap();
        assert!(markup.contains(r#"viewBox="0 -25 100 100""#));

        // Already square: a second pass is a no-op.
        assert!(!session.fix_aspect("wide.svg").unwrap());
    }

    #[test]
    fn test_assign_background_role() {
        let mut session = session_with(&[("icon.svg", ICON)]);
        session.assign_background_role("icon.svg", "dark").unwrap();

        let markup = session.markup("icon.svg").unwrap();
        assert!(markup.contains("canvas-bg"));
        assert!(markup.contains("tinct-dark"));
        assert!(session.is_dirty("icon.svg"));
    }
}
