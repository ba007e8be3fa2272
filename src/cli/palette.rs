//! Palette command - inspect and edit roles, cascading edits to the store.

use anyhow::{Result, bail};

use crate::cli::args::PaletteCommands;
use crate::cli::common::{flush_dirty, load_session};
use crate::config::TinctConfig;
use crate::log;
use crate::palette::{KEY_SLOTS, Palette};

/// Run a palette subcommand
pub fn run_palette(config: &TinctConfig, command: &PaletteCommands) -> Result<()> {
    match command {
        PaletteCommands::List => list(config),
        PaletteCommands::Set { role, color } => set(config, role, color),
        PaletteCommands::Remove { role } => remove(config, role),
        PaletteCommands::Css => css(config),
    }
}

fn list(config: &TinctConfig) -> Result<()> {
    let palette = Palette::load(&config.palette.path);
    for (slot, (role, color)) in palette.iter().enumerate() {
        // The first slots are reachable by number key in editing frontends.
        if slot < KEY_SLOTS {
            println!("[{}] {role}  {color}", slot + 1);
        } else {
            println!("    {role}  {color}");
        }
    }
    Ok(())
}

fn set(config: &TinctConfig, role: &str, color: &str) -> Result<()> {
    let mut palette = Palette::load(&config.palette.path);
    palette.set(role, color)?;
    palette.save(&config.palette.path)?;
    log!("palette"; "{role} = {color}");

    // The new color may now match literal fills, so resweep everything.
    resweep(config)
}

fn remove(config: &TinctConfig, role: &str) -> Result<()> {
    let mut palette = Palette::load(&config.palette.path);
    if !palette.remove(role) {
        bail!("role `{role}` is not in the palette");
    }
    palette.save(&config.palette.path)?;
    log!("palette"; "removed {role}");

    // Strip the now-orphaned role class from every document. Fills are
    // left alone, so nothing changes visually.
    resweep(config)
}

fn css(config: &TinctConfig) -> Result<()> {
    print!("{}", Palette::load(&config.palette.path).css_stylesheet());
    Ok(())
}

fn resweep(config: &TinctConfig) -> Result<()> {
    let mut session = load_session(config, false)?;
    let summary = session.sweep_all();
    if summary.shapes_changed > 0 {
        log!(
            "sweep";
            "updated {} shapes across {} documents",
            summary.shapes_changed,
            summary.files_changed
        );
        flush_dirty(&mut session);
    }
    Ok(())
}
