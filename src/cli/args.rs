//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

/// Tinct icon recoloring CLI
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Show debug output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file path (default: tinct.toml)
    #[arg(short = 'C', long, default_value = "tinct.toml", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Reconcile every document against the palette and save changes
    #[command(visible_alias = "s")]
    Sweep,

    /// Grow view boxes toward the target aspect ratio
    #[command(visible_alias = "n")]
    Normalize,

    /// Poll the store for remote changes, sweeping as documents arrive
    #[command(visible_alias = "w")]
    Watch,

    /// Import SVG files into the store
    #[command(visible_alias = "a")]
    Add {
        /// Files to import
        #[arg(value_name = "FILE", required = true, value_hint = clap::ValueHint::FilePath)]
        files: Vec<PathBuf>,
    },

    /// Inspect or edit the palette
    #[command(visible_alias = "p")]
    Palette {
        #[command(subcommand)]
        command: PaletteCommands,
    },
}

/// Palette subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum PaletteCommands {
    /// Print roles, colors and key slots
    List,

    /// Add a role or change its color, then resweep the store
    Set {
        /// Role name
        role: String,
        /// Color in any supported notation (hex, rgb(), hsl(), named)
        color: String,
    },

    /// Remove a role, stripping it from every document
    Remove {
        /// Role name
        role: String,
    },

    /// Print the palette as a CSS stylesheet
    Css,
}
