//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand};

use crate::app::SessionMode;

/// Scan command arguments.
#[derive(Debug, Args)]
pub struct ScanCommand {
    /// Keep scanning after each lookup until interrupted
    #[arg(long)]
    pub continuous: bool,
}

impl ScanCommand {
    /// The session mode selected by the flags.
    #[must_use]
    pub fn mode(&self) -> SessionMode {
        if self.continuous {
            SessionMode::Continuous
        } else {
            SessionMode::Single
        }
    }
}

/// Lookup command arguments.
#[derive(Debug, Args)]
pub struct LookupCommand {
    /// The barcode to look up
    pub barcode: String,
}

/// List command arguments.
#[derive(Debug, Args)]
pub struct ListCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Clear command arguments.
#[derive(Debug, Args)]
pub struct ClearCommand {
    /// Skip confirmation
    #[arg(short, long)]
    pub yes: bool,
}

/// Status command arguments.
#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}
