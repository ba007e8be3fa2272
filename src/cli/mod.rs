//! Command-line interface module.

mod args;
pub mod add;
pub mod common;
pub mod normalize;
pub mod palette;
pub mod sweep;
pub mod watch;

pub use args::{Cli, Commands, PaletteCommands};
