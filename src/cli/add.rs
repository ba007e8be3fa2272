//! Add command - import SVG files into the store.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::cli::common::load_session;
use crate::config::TinctConfig;
use crate::log;
use crate::sync::Session;

/// Run the add command
pub fn run_add(config: &TinctConfig, files: &[PathBuf]) -> Result<()> {
    let mut session = load_session(config, false)?;

    let mut imported = 0;
    for path in files {
        match import_file(&mut session, path) {
            Ok(name) => {
                log!("store"; "imported {name}");
                imported += 1;
            }
            Err(e) => log!("error"; "{}: {e:#}", path.display()),
        }
    }

    log!("store"; "imported {imported} of {} files", files.len());
    Ok(())
}

/// Read, classify and persist one file. The stored name is the file's
/// basename; a failed save leaves the document dirty in the session
/// only, which for a one-shot command means it is simply not persisted.
fn import_file(session: &mut Session, path: &Path) -> Result<String> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("unusable file name: {}", path.display()))?
        .to_string();
    let content = fs::read_to_string(path).context("read failed")?;

    session.import(&name, &content).context("parse failed")?;
    session.sweep_file(&name)?;
    session.save(&name).context("save failed")?;
    Ok(name)
}
