//! Application configuration
//!
//! Layered as: built-in defaults, then `config.toml`, then environment
//! variables (a `.env` file is loaded first), then command-line flags.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::api::a1::CellRange;
use crate::api::auth::{RefreshPolicy, TokenStore};
use crate::api::client::DEFAULT_API_BASE;
use crate::services::relay::{
    DispatchMode, FIXED_RANGE, FailurePolicy, RADIO_MARKER, RelayPolicies, RelaySettings,
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub sheets: SheetsConfig,
    pub auth: AuthConfig,
    pub relay: RelayConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// HTML file served at `/`; the built-in form is used when unset
    pub form_template: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            form_template: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetsConfig {
    pub spreadsheet_id: Option<String>,
    pub api_base: String,
    pub timeout_secs: Option<u64>,
    pub dispatch: DispatchMode,
}

impl Default for SheetsConfig {
    fn default() -> Self {
        Self {
            spreadsheet_id: None,
            api_base: DEFAULT_API_BASE.to_string(),
            timeout_secs: None,
            dispatch: DispatchMode::Individual,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub client_secret: PathBuf,
    pub token_cache: Option<PathBuf>,
    /// Refresh this many seconds before expiry; negative disables refreshing
    pub refresh_skew_secs: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            client_secret: PathBuf::from("client_secret.json"),
            token_cache: None,
            refresh_skew_secs: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub fixed_range: String,
    pub marker: String,
    pub fixed_policy: FailurePolicy,
    pub field_policy: FailurePolicy,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            fixed_range: FIXED_RANGE.to_string(),
            marker: RADIO_MARKER.to_string(),
            fixed_policy: FailurePolicy::Ignore,
            field_policy: FailurePolicy::Ignore,
        }
    }
}

impl Config {
    /// `~/.config/sheet-relay/config.toml`
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("sheet-relay")
            .join("config.toml")
    }

    /// Load from `path`, or from the default location if it exists
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, required) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => (Self::default_path(), false),
        };

        if !path.exists() {
            if required {
                anyhow::bail!("Config file does not exist: {}", path.display());
            }
            log::debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config = Self::from_toml_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Apply environment overrides from the process environment
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup`, which maps a variable name to its value
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(port) = lookup("PORT").filter(|p| !p.is_empty()) {
            self.server.port = port
                .parse()
                .with_context(|| format!("PORT is not a valid port number: {port}"))?;
        }
        if let Some(id) = lookup("SHEET_RELAY_SPREADSHEET_ID").filter(|v| !v.is_empty()) {
            self.sheets.spreadsheet_id = Some(id);
        }
        if let Some(path) = lookup("SHEET_RELAY_CLIENT_SECRET").filter(|v| !v.is_empty()) {
            self.auth.client_secret = PathBuf::from(path);
        }
        if let Some(path) = lookup("SHEET_RELAY_TOKEN_CACHE").filter(|v| !v.is_empty()) {
            self.auth.token_cache = Some(PathBuf::from(path));
        }
        Ok(())
    }

    /// Host and port to listen on. The host is a name or an IP literal;
    /// IPv6 literals may be written with or without brackets.
    pub fn bind_target(&self) -> Result<(&str, u16)> {
        let host = self.server.host.trim();
        let host = host
            .strip_prefix('[')
            .and_then(|h| h.strip_suffix(']'))
            .unwrap_or(host);
        if host.is_empty() {
            anyhow::bail!("server.host must not be empty");
        }
        Ok((host, self.server.port))
    }

    pub fn token_store(&self) -> TokenStore {
        TokenStore::new(
            self.auth
                .token_cache
                .clone()
                .unwrap_or_else(TokenStore::default_path),
        )
    }

    pub fn refresh_policy(&self) -> RefreshPolicy {
        if self.auth.refresh_skew_secs < 0 {
            RefreshPolicy::Never
        } else {
            RefreshPolicy::BeforeExpiry {
                skew: chrono::Duration::seconds(self.auth.refresh_skew_secs),
            }
        }
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.sheets.timeout_secs.map(Duration::from_secs)
    }

    /// Relay settings; fails if no spreadsheet is configured
    pub fn relay_settings(&self) -> Result<RelaySettings> {
        let spreadsheet_id = self
            .sheets
            .spreadsheet_id
            .clone()
            .filter(|id| !id.is_empty())
            .context("No spreadsheet configured; set sheets.spreadsheet_id or SHEET_RELAY_SPREADSHEET_ID")?;

        let fixed_range = CellRange::parse(&self.relay.fixed_range)
            .with_context(|| format!("Invalid relay.fixed_range: {}", self.relay.fixed_range))?;

        if self.relay.marker.is_empty() {
            anyhow::bail!("relay.marker must not be empty");
        }

        Ok(RelaySettings {
            spreadsheet_id,
            fixed_range,
            marker: self.relay.marker.clone(),
            policies: RelayPolicies {
                fixed: self.relay.fixed_policy,
                fields: self.relay.field_policy,
            },
            mode: self.sheets.dispatch,
        })
    }
}
