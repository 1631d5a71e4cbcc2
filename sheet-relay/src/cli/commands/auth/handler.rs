//! Auth command handler and credential bootstrap

use anyhow::{Context, Result};
use chrono::Utc;
use colored::*;
use is_terminal::IsTerminal;
use std::sync::Arc;

use super::AuthCommands;
use crate::api::auth::SPREADSHEETS_SCOPE;
use crate::api::{AuthError, AuthManager, ClientSecret, Credential, OAuthEndpoint};
use crate::config::Config;

pub async fn handle_auth_command(command: AuthCommands, config: Config) -> Result<()> {
    match command {
        AuthCommands::Login => {
            login(&config).await?;
            Ok(())
        }
        AuthCommands::Status => status(&config),
    }
}

fn load_client_secret(config: &Config) -> Result<ClientSecret> {
    let path = &config.auth.client_secret;
    ClientSecret::from_file(path)
        .with_context(|| format!("Unable to read client secret file: {}", path.display()))
}

/// Run the authorization-code flow in the terminal and cache the result
pub async fn login(config: &Config) -> Result<Credential> {
    let endpoint = OAuthEndpoint::new(load_client_secret(config)?);
    let url = endpoint
        .secret()
        .authorization_url(SPREADSHEETS_SCOPE, "state-token");

    println!(
        "{}",
        "Open the following link in your browser, then paste the authorization code:".bold()
    );
    println!("{}", url.cyan());

    let code: String = dialoguer::Input::new()
        .with_prompt("Authorization code")
        .interact_text()
        .context("Failed to read authorization code")?;

    let credential = endpoint
        .exchange_code(code.trim())
        .await
        .context("Unable to retrieve token from the authorization server")?;

    let store = config.token_store();
    store.save(&credential).context("Unable to cache OAuth token")?;
    println!(
        "{} Saved credential to {}",
        "✓".green(),
        store.path().display()
    );
    Ok(credential)
}

fn status(config: &Config) -> Result<()> {
    let store = config.token_store();
    let credential = match store.load() {
        Ok(credential) => credential,
        Err(AuthError::NoToken(path)) => {
            println!("{} No cached token at {}", "✗".red(), path.display());
            println!("  Run `sheet-relay auth login` to authorize.");
            return Ok(());
        }
        Err(e) => return Err(e).context("Failed to read token cache"),
    };

    println!("Token cache: {}", store.path().display());
    match credential.expiry {
        Some(expiry) if expiry > Utc::now() => {
            let minutes = (expiry - Utc::now()).num_minutes();
            println!("Access token: {} (expires in {} min)", "valid".green(), minutes);
        }
        Some(expiry) => println!(
            "Access token: {} (since {})",
            "expired".yellow(),
            expiry.format("%Y-%m-%d %H:%M:%S UTC")
        ),
        None => println!("Access token: {} (no expiry recorded)", "present".green()),
    }
    let refresh = if credential.refresh_token.is_some() {
        "present".green()
    } else {
        "missing".red()
    };
    println!("Refresh token: {}", refresh);
    Ok(())
}

/// Credential manager for the server.
///
/// Uses the cached token; when there is none and a terminal is attached the
/// interactive login runs first.
pub async fn load_auth_manager(config: &Config) -> Result<AuthManager> {
    let secret = load_client_secret(config)?;
    let store = config.token_store();

    let credential = match store.load() {
        Ok(credential) => credential,
        Err(AuthError::NoToken(path)) if std::io::stdin().is_terminal() => {
            log::warn!("No cached token at {}, starting login", path.display());
            login(config).await?
        }
        Err(e) => return Err(e).context("Unable to load cached credential"),
    };

    Ok(AuthManager::new(credential, config.refresh_policy(), Arc::new(OAuthEndpoint::new(secret)))
        .with_store(store))
}
