pub mod handler;

use clap::Subcommand;

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum AuthCommands {
    /// Authorize access to Google Sheets and cache the token
    Login,
    /// Show the cached token's state
    Status,
}
