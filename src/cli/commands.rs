//! CLI commands and argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Paginated listing of REST collections
#[derive(Parser, Debug)]
#[command(name = "remote-list")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Endpoint configuration file (YAML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Bearer token sent with every request
    #[arg(long, global = true, env = "REMOTE_LIST_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List a collection, one JSON record per line
    List {
        /// Collection path, relative to the base URL; may use `{{ vars.* }}`
        path: String,

        /// Server-side filter expression
        #[arg(long)]
        filter: Option<String>,

        /// Fields to return (comma-separated)
        #[arg(long)]
        select: Option<String>,

        /// Page size requested from the server
        #[arg(long)]
        top: Option<u32>,

        /// Cap on the number of records printed
        #[arg(long)]
        max_items: Option<usize>,

        /// Follow continuations until the listing is exhausted
        #[arg(long)]
        all: bool,

        /// Key to pin at the top of the output (repeatable)
        #[arg(long = "pin")]
        pins: Vec<String>,
    },

    /// Fetch a single entity from a collection
    Get {
        /// Collection path, relative to the base URL
        path: String,

        /// Entity key
        key: String,
    },
}
