//! CLI module for Commit Keys
//!
//! Subcommands:
//! - `serve`: run the HTTP API
//! - `migrate`: apply or revert PostgreSQL schema migrations

pub mod migrate;
pub mod serve;

use clap::{Parser, Subcommand};

/// Commit Keys - API keys and usage analytics for a commit CLI
#[derive(Parser)]
#[command(name = "commit-keys")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the API server
    Serve,

    /// Manage PostgreSQL schema migrations
    Migrate(migrate::MigrateArgs),
}
