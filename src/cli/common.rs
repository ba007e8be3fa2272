//! Shared helpers for CLI commands.

use anyhow::Result;

use crate::config::TinctConfig;
use crate::log;
use crate::palette::Palette;
use crate::sync::{DirStore, MemStore, Session, SessionOptions, Store, SyncError};

/// Open a session against the configured store.
///
/// The directory store is the normal backend; when its directory cannot
/// be opened the session degrades to the local-only store backed by the
/// configured state blob, so editing keeps working offline.
pub fn open_session(config: &TinctConfig, polling: bool) -> Session {
    let store: Box<dyn Store> = match DirStore::open(&config.store.dir) {
        Ok(store) => Box::new(store),
        Err(e) => {
            log!("store"; "{e}");
            log!("store"; "falling back to local-only mode ({})", config.store.state.display());
            Box::new(MemStore::open(&config.store.state))
        }
    };

    let palette = Palette::load(&config.palette.path);
    let options = SessionOptions {
        polling,
        target_ratio: config.layout.target_ratio,
        ratio_tolerance: config.layout.ratio_tolerance,
    };
    Session::new(store, palette, options)
}

/// Open a session and pull the store's current listing.
pub fn load_session(config: &TinctConfig, polling: bool) -> Result<Session> {
    let mut session = open_session(config, polling);
    let summary = session.load_all()?;
    log!(
        "store";
        "loaded {} documents from {} store",
        summary.loaded + summary.kept_dirty,
        session.store_label()
    );
    if summary.skipped > 0 {
        log!("store"; "skipped {} unparseable documents", summary.skipped);
    }
    Ok(session)
}

/// Save every dirty file and report failures. Returns the saved count.
pub fn flush_dirty(session: &mut Session) -> usize {
    let (saved, failures) = session.save_all();
    for (name, error) in &failures {
        report_save_failure(name, error);
    }
    saved
}

fn report_save_failure(name: &str, error: &SyncError) {
    log!("error"; "{name} not saved: {error}");
}
