//! Serve command handler

use anyhow::{Context, Result};
use std::sync::Arc;

use super::ServeArgs;
use crate::api::SheetsClient;
use crate::cli::commands::auth::handler::load_auth_manager;
use crate::config::Config;
use crate::server::{self, AppState, FormPage};
use crate::services::relay::Relay;

/// Build the relay from configuration and run the HTTP server
pub async fn handle_serve_command(args: ServeArgs, mut config: Config) -> Result<()> {
    args.apply(&mut config);

    let settings = config.relay_settings()?;
    let (host, port) = config.bind_target()?;
    let listener = server::bind(host, port).await?;

    let auth = Arc::new(load_auth_manager(&config).await?);
    let client = SheetsClient::with_options(auth, &config.sheets.api_base, config.request_timeout())
        .context("Failed to build Sheets client")?;

    log::info!(
        "Relaying to spreadsheet {} ({:?} dispatch, fixed range {})",
        settings.spreadsheet_id,
        settings.mode,
        settings.fixed_range
    );
    let relay = Relay::new(Arc::new(client), settings);

    let form = match &config.server.form_template {
        Some(path) => {
            if !path.exists() {
                anyhow::bail!("Form template does not exist: {}", path.display());
            }
            FormPage::File(path.clone())
        }
        None => FormPage::Embedded,
    };

    server::run(listener, Arc::new(AppState::new(relay, form))).await
}
