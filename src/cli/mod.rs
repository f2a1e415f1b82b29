//! Command-line interface definitions and terminal output.

mod commands;
mod display;

pub use commands::{CategoryArg, Cli, Commands, OutputFormat, TargetAction};
pub use display::Display;
