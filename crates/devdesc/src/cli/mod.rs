//! Command-line interface for devdesc.
//!
//! This module provides the CLI structure for the `devdesc` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    ConfigCommand, FindCommand, IdentCodeArg, IdentCommand, ReadCommand, ShowCommand,
};

use crate::logging::Verbosity;

/// devdesc - Inspect the descriptors identifying this device
///
/// Builds a descriptor registry from the configuration file and platform
/// sources, then prints, looks up or reads its entries.
#[derive(Debug, Parser)]
#[command(name = "devdesc")]
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
    /// Print every installed descriptor
    Show(ShowCommand),

    /// List custom descriptors in installation order
    List,

    /// Look up one descriptor
    Find(FindCommand),

    /// Read the value of a custom descriptor
    Read(ReadCommand),

    /// Print the device identification objects
    Ident(IdentCommand),

    /// View or check configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.quiet, self.verbose)
    }
}
