//! Command-line interface for amfe.
//!
//! This module provides the CLI structure for the `amfe` binary. Handlers
//! live in `main.rs`.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    ConfigCommand, KindArg, LoginCommand, MatrixArgs, MatrixCommand, OutputFormat, RoleArg,
    RpnCommand, SchemeArg, UserCommand,
};

use crate::logging::Verbosity;

/// amfe - Manage AMFE (FMEA) risk-assessment matrices
///
/// Create, review and score failure-mode matrices for biomedical equipment,
/// against the matrix backend or an offline local database.
#[derive(Debug, Parser)]
#[command(name = "amfe")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Use the local database instead of the backend
    #[arg(long, global = true)]
    pub offline: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Log in to the backend
    Login(LoginCommand),

    /// Forget the stored session
    Logout,

    /// Show the logged-in user
    Whoami {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Work with matrices
    Matrix(MatrixArgs),

    /// Manage user accounts (administrators only)
    #[command(subcommand)]
    User(UserCommand),

    /// Compute a risk priority number
    Rpn(RpnCommand),

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
