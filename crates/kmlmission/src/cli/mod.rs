//! Command-line interface for kmlmission.
//!
//! This module provides the CLI structure for the `kmlm` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    ConfigCommand, DecodeCommand, ImportCommand, ListCommand, PolicyArg, ShowCommand,
};

/// kmlm - Import survey boundaries from KML into missions
///
/// Decodes the first polygon boundary of a KML document, stores it as a
/// mission, and serves it back by identifier.
#[derive(Debug, Parser)]
#[command(name = "kmlm")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Import a KML file as a new mission
    Import(ImportCommand),

    /// Show a stored mission's boundary
    Show(ShowCommand),

    /// List stored missions
    List(ListCommand),

    /// Decode a KML file without storing it
    Decode(DecodeCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        crate::logging::Verbosity::from_flags(self.verbose, self.quiet)
    }
}
