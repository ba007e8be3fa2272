//! Sweep command - reconcile every document against the palette.

use anyhow::Result;

use crate::cli::common::{flush_dirty, load_session};
use crate::config::TinctConfig;
use crate::log;

/// Run the sweep command
pub fn run_sweep(config: &TinctConfig) -> Result<()> {
    let mut session = load_session(config, false)?;

    let summary = session.sweep_all();
    if summary.shapes_changed == 0 {
        log!("sweep"; "all documents already consistent");
        return Ok(());
    }

    log!(
        "sweep";
        "classified {} shapes across {} documents",
        summary.shapes_changed,
        summary.files_changed
    );
    let saved = flush_dirty(&mut session);
    log!("sweep"; "saved {saved} documents");
    Ok(())
}
