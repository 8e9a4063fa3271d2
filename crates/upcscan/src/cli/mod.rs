//! Command-line interface for upcscan.
//!
//! This module provides the CLI structure for the `upcscan` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    ClearCommand, ConfigCommand, ListCommand, LookupCommand, ScanCommand, StatusCommand,
};

/// upcscan - Scan UPC/EAN barcodes and look up products
///
/// Reads barcodes from a scanner in keyboard mode, looks them up against a
/// product API and keeps a local history of scanned items.
#[derive(Debug, Parser)]
#[command(name = "upcscan")]
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
    /// Scan barcodes from standard input
    Scan(ScanCommand),

    /// Look up a single barcode
    Lookup(LookupCommand),

    /// List scanned items
    List(ListCommand),

    /// Remove all scanned items
    Clear(ClearCommand),

    /// Show connectivity and storage status
    Status(StatusCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        if self.quiet {
            crate::logging::Verbosity::Quiet
        } else {
            match self.verbose {
                0 => crate::logging::Verbosity::Normal,
                1 => crate::logging::Verbosity::Verbose,
                _ => crate::logging::Verbosity::Trace,
            }
        }
    }
}
