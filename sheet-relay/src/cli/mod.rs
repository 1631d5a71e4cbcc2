//! Command-line interface

pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use commands::{AuthCommands, ServeArgs};

#[derive(Parser, Debug)]
#[command(name = "sheet-relay", version, about = "Relay an HTML form into a Google Sheets spreadsheet")]
pub struct Cli {
    /// Config file (defaults to ~/.config/sheet-relay/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve the form and relay submissions
    Serve(ServeArgs),
    /// Manage the cached OAuth credential
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },
}
