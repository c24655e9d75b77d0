//! Command-line interface for ecorent.
//!
//! This module provides the CLI structure for the `ecorent` binary. Each
//! subcommand stands for one desk action: register, edit, delete, look up,
//! print, share and sync contracts.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    CatalogCommand, ClientCommand, ConfigCommand, ContractArgs, ContractRef, DeleteCommand,
    EditCommand, ExportCommand, ExportFormat, HistoryCommand, ModuleArg, NewCommand,
    OutputFormat, SettingsCommand, StatusCommand, SyncCommand,
};

/// ecorent - Rental contract desk
///
/// Registers rental contracts for vehicles, bikes and tours, keeps them in a
/// local database and pushes them to the company spreadsheet.
#[derive(Debug, Parser)]
#[command(name = "ecorent")]
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
    /// Commands that work on the contract database
    #[command(flatten)]
    Desk(DeskCommand),

    /// Print the messaging link to technical support
    Support,

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

/// Commands that need the contract database.
#[derive(Debug, Subcommand)]
pub enum DeskCommand {
    /// Register a new contract
    New(NewCommand),

    /// Edit an active contract
    Edit(EditCommand),

    /// Soft-delete a contract
    Delete(DeleteCommand),

    /// Show a stored contract
    Show(ContractRef),

    /// List active contracts, newest first
    History(HistoryCommand),

    /// Print the invoice of a contract
    Invoice(ContractRef),

    /// Print the QR verification payload of a contract
    Qr(ContractRef),

    /// Print the messaging share link of a contract
    Share(ContractRef),

    /// Push one contract, or every pending one, to the sync endpoint
    Sync(SyncCommand),

    /// View or edit the product catalog
    #[command(subcommand)]
    Catalog(CatalogCommand),

    /// View or change the sync endpoint
    #[command(subcommand)]
    Settings(SettingsCommand),

    /// Show the last client profile
    #[command(subcommand)]
    Client(ClientCommand),

    /// Export every record, deleted ones included
    Export(ExportCommand),

    /// Show the dashboard summary
    Status(StatusCommand),
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
