//! Library side of the `geoslice` command: configuration, argument parsing
//! and the subcommand implementations, kept out of `main.rs` so they can be
//! tested.

pub mod cli;
pub mod commands;
pub mod config;

pub use cli::{Cli, Command};
pub use config::{ConfigError, TilerConfig};
