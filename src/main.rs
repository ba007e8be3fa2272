//! Tinct - palette-driven recoloring for SVG icon sets.

#![allow(dead_code)]

mod classify;
mod cli;
mod color;
mod config;
mod history;
mod logger;
mod palette;
mod svg;
mod sync;

use anyhow::Result;
use clap::{ColorChoice, Parser};
use cli::{Cli, Commands};
use config::TinctConfig;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }
    logger::set_verbose(cli.verbose);

    let config = TinctConfig::load(&cli.config)?;

    match &cli.command {
        Commands::Sweep => cli::sweep::run_sweep(&config),
        Commands::Normalize => cli::normalize::run_normalize(&config),
        Commands::Watch => cli::watch::run_watch(&config),
        Commands::Add { files } => cli::add::run_add(&config, files),
        Commands::Palette { command } => cli::palette::run_palette(&config, command),
    }
}
