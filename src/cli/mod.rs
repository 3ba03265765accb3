//! CLI module
//!
//! Command-line interface over the REST listing transport.
//!
//! # Commands
//!
//! - `list` - Print a collection, one JSON record per line
//! - `get` - Print a single entity

mod commands;
mod runner;

pub use commands::{Cli, Commands};
pub use runner::{get, list, list_options, ListArgs, Runner};
