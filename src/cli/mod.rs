//! CLI module for schemals
//!
//! Provides command-line interface using clap derive macros.

pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use commands::{config::ConfigArgs, serve::ServeArgs};

const LONG_ABOUT: &str = r#"
schemals - schema-driven language server for block-structured configuration

Speaks the Language Server Protocol over stdio (default) or TCP and offers
completion and document symbols for the blocks, labels and attributes
described by a core schema.

EXAMPLES:
  schemals serve                         # stdio, for editors that spawn the server
  schemals serve --port 4389             # TCP on 127.0.0.1:4389
  schemals serve --schema ./core.toml    # custom core schema
  schemals config                        # print effective configuration

Logs go to stderr; set RUST_LOG=schemals=debug for request tracing.
"#;

/// schemals - schema-driven language server
#[derive(Parser, Debug)]
#[command(name = "schemals")]
#[command(author, version, about, long_about = LONG_ABOUT)]
#[command(propagate_version = true)]
#[command(after_help = "Use 'schemals <COMMAND> --help' for more information about a command.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Verbose output (debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the language server
    Serve(ServeArgs),

    /// Show the effective configuration
    Config(ConfigArgs),
}
