use anyhow::Result;
use clap::Parser;

use sheet_relay::cli::commands::auth::handler::handle_auth_command;
use sheet_relay::cli::commands::serve::handler::handle_serve_command;
use sheet_relay::cli::{Cli, Commands};
use sheet_relay::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    config.apply_env()?;

    match cli.command {
        Commands::Serve(args) => handle_serve_command(args, config).await,
        Commands::Auth { command } => handle_auth_command(command, config).await,
    }
}
