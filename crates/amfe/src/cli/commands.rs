//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

use crate::accounts::Role;
use crate::rpn::{RiskScheme, MAX_SCORE, MIN_SCORE};
use crate::store::Collection;

/// Login command arguments.
#[derive(Debug, Args)]
pub struct LoginCommand {
    /// Account name
    pub username: String,

    /// Password (read from `AMFE_PASSWORD` when omitted)
    #[arg(short, long, env = "AMFE_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

/// Matrix command arguments.
#[derive(Debug, Args)]
pub struct MatrixArgs {
    /// Which kind of matrix to work with
    #[arg(short, long, global = true, value_enum, default_value_t = KindArg::Modular)]
    pub kind: KindArg,

    /// The matrix operation
    #[command(subcommand)]
    pub command: MatrixCommand,
}

/// Matrix operations.
#[derive(Debug, Subcommand)]
pub enum MatrixCommand {
    /// List matrices
    List {
        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Show one matrix
    Show {
        /// Matrix id
        id: i64,

        /// Output the stored record as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Print a blank draft to fill in and pass to `create`
    Template,

    /// Create a matrix from a draft file
    Create {
        /// Draft file (`{name, description, data}` JSON)
        #[arg(short, long, value_name = "FILE")]
        file: PathBuf,
    },

    /// Replace a matrix with the contents of a draft file
    Update {
        /// Matrix id
        id: i64,

        /// Draft file (`{name, description, data}` JSON)
        #[arg(short, long, value_name = "FILE")]
        file: PathBuf,
    },

    /// Delete a matrix
    Delete {
        /// Matrix id
        id: i64,
    },

    /// Download the spreadsheet rendering of a modular matrix
    Export {
        /// Matrix id
        id: i64,

        /// Output path (defaults to `AMFE_Modular_<name>.xlsx`)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },

    /// Show the RPN and risk level of every failure mode
    Score {
        /// Matrix id
        id: i64,

        /// Risk thresholds (defaults to the matrix kind's own)
        #[arg(short, long, value_enum)]
        scheme: Option<SchemeArg>,
    },
}

/// User management commands.
#[derive(Debug, Subcommand)]
pub enum UserCommand {
    /// List accounts
    List {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Register an account
    Add {
        /// Account name
        username: String,

        /// Contact email
        #[arg(short, long)]
        email: String,

        /// Password
        #[arg(short, long)]
        password: String,

        /// Role to grant
        #[arg(short, long, value_enum, default_value_t = RoleArg::User)]
        role: RoleArg,
    },

    /// Delete an account
    Delete {
        /// Account id
        id: i64,
    },
}

/// RPN command arguments.
#[derive(Debug, Args)]
pub struct RpnCommand {
    /// Severity (1-5)
    #[arg(value_parser = clap::value_parser!(i64).range(i64::from(MIN_SCORE)..=i64::from(MAX_SCORE)))]
    pub severity: i64,

    /// Detectability (1-5)
    #[arg(value_parser = clap::value_parser!(i64).range(i64::from(MIN_SCORE)..=i64::from(MAX_SCORE)))]
    pub detectability: i64,

    /// Occurrence (1-5)
    #[arg(value_parser = clap::value_parser!(i64).range(i64::from(MIN_SCORE)..=i64::from(MAX_SCORE)))]
    pub occurrence: i64,

    /// Risk thresholds
    #[arg(short, long, value_enum, default_value_t = SchemeArg::Modular)]
    pub scheme: SchemeArg,
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

/// Matrix kind argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum KindArg {
    /// Process trees
    #[default]
    Modular,
    /// Single-form assessments
    Legacy,
}

impl From<KindArg> for Collection {
    fn from(arg: KindArg) -> Self {
        match arg {
            KindArg::Modular => Self::Modular,
            KindArg::Legacy => Self::Legacy,
        }
    }
}

/// Risk scheme argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SchemeArg {
    /// Thresholds 25/50/100 for 1-5 scales
    Modular,
    /// Thresholds 20/50/100 for single-form assessments
    Legacy,
}

impl From<SchemeArg> for RiskScheme {
    fn from(arg: SchemeArg) -> Self {
        match arg {
            SchemeArg::Modular => Self::Modular,
            SchemeArg::Legacy => Self::Legacy,
        }
    }
}

/// Account role argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RoleArg {
    /// Can manage accounts
    Admin,
    /// Regular account
    User,
}

impl From<RoleArg> for Role {
    fn from(arg: RoleArg) -> Self {
        match arg {
            RoleArg::Admin => Self::Admin,
            RoleArg::User => Self::User,
        }
    }
}

/// Output format for commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Plain text output
    #[default]
    Plain,
    /// Formatted table
    Table,
    /// JSON output
    Json,
}
