//! OAuth2 credentials for the Sheets API
//!
//! The credential is an explicit object owned by [`AuthManager`] and handed to
//! whoever needs it. Refreshing is delegated to an injected [`TokenRefresher`]
//! and governed by a [`RefreshPolicy`], so tests can swap both out.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

use super::error::AuthError;

/// Scope needed to write spreadsheet values
pub const SPREADSHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";

/// OAuth client settings, as found in a downloaded `client_secret.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientSecret {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    #[serde(default)]
    pub redirect_uris: Vec<String>,
}

fn default_auth_uri() -> String {
    "https://accounts.google.com/o/oauth2/auth".to_string()
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

#[derive(Deserialize)]
struct ClientSecretFile {
    installed: Option<ClientSecret>,
    web: Option<ClientSecret>,
}

impl ClientSecret {
    pub fn from_json(json: &str) -> Result<Self, AuthError> {
        let file: ClientSecretFile = serde_json::from_str(json)?;
        file.installed
            .or(file.web)
            .ok_or(AuthError::UnsupportedClientSecret)
    }

    pub fn from_file(path: &Path) -> Result<Self, AuthError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Redirect URI used for the authorization-code flow
    pub fn redirect_uri(&self) -> &str {
        self.redirect_uris
            .first()
            .map(String::as_str)
            .unwrap_or("urn:ietf:wg:oauth:2.0:oob")
    }

    /// Consent page URL requesting offline access for `scope`
    pub fn authorization_url(&self, scope: &str, state: &str) -> String {
        format!(
            "{}?access_type=offline&client_id={}&redirect_uri={}&response_type=code&scope={}&state={}",
            self.auth_uri,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(self.redirect_uri()),
            urlencoding::encode(scope),
            urlencoding::encode(state),
        )
    }
}

/// Cached OAuth token
///
/// Field names match the common `oauth2` token cache layout so an existing
/// cache file can be reused.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credential {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

/// Token endpoint response
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default = "default_token_type")]
    pub token_type: String,
}

impl Credential {
    /// Build a credential from a token response. Google omits the refresh
    /// token on refresh, so the previous one is carried over.
    pub fn from_response(
        response: TokenResponse,
        previous_refresh: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            access_token: response.access_token,
            token_type: response.token_type,
            refresh_token: response.refresh_token.or(previous_refresh),
            expiry: response.expires_in.map(|secs| now + Duration::seconds(secs)),
        }
    }
}

/// When to refresh the access token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshPolicy {
    /// Use the token as-is until the service rejects it
    Never,
    /// Refresh once the token is within `skew` of its expiry
    BeforeExpiry { skew: Duration },
}

impl Default for RefreshPolicy {
    fn default() -> Self {
        Self::BeforeExpiry {
            skew: Duration::seconds(60),
        }
    }
}

impl RefreshPolicy {
    pub fn needs_refresh(&self, credential: &Credential, now: DateTime<Utc>) -> bool {
        match (self, credential.expiry) {
            (Self::Never, _) => false,
            (Self::BeforeExpiry { .. }, None) => false,
            (Self::BeforeExpiry { skew }, Some(expiry)) => expiry - *skew <= now,
        }
    }
}

/// Exchanges grants for tokens
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse, AuthError>;
}

/// Google's OAuth2 token endpoint
#[derive(Debug, Clone)]
pub struct OAuthEndpoint {
    secret: ClientSecret,
    http: reqwest::Client,
}

impl OAuthEndpoint {
    pub fn new(secret: ClientSecret) -> Self {
        Self {
            secret,
            http: reqwest::Client::new(),
        }
    }

    pub fn secret(&self) -> &ClientSecret {
        &self.secret
    }

    /// Trade an authorization code for a token
    pub async fn exchange_code(&self, code: &str) -> Result<Credential, AuthError> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", self.secret.client_id.as_str()),
            ("client_secret", self.secret.client_secret.as_str()),
            ("redirect_uri", self.secret.redirect_uri()),
        ];
        let response = self.post_token(&params).await?;
        Ok(Credential::from_response(response, None, Utc::now()))
    }

    async fn post_token(&self, params: &[(&str, &str)]) -> Result<TokenResponse, AuthError> {
        let response = self
            .http
            .post(&self.secret.token_uri)
            .form(params)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::Endpoint(format!("{status}: {body}")));
        }

        Ok(response.json::<TokenResponse>().await?)
    }
}

#[async_trait]
impl TokenRefresher for OAuthEndpoint {
    async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse, AuthError> {
        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", self.secret.client_id.as_str()),
            ("client_secret", self.secret.client_secret.as_str()),
        ];
        self.post_token(&params).await
    }
}

/// On-disk token cache
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Default location: `~/.credentials/sheets.googleapis.com-sheet-relay.json`
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".credentials")
            .join("sheets.googleapis.com-sheet-relay.json")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Credential, AuthError> {
        let json = match std::fs::read_to_string(&self.path) {
            Ok(json) => json,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(AuthError::NoToken(self.path.clone()));
            }
            Err(err) => return Err(err.into()),
        };
        Ok(serde_json::from_str(&json)?)
    }

    pub fn save(&self, credential: &Credential) -> Result<(), AuthError> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)?;
        }

        let json = serde_json::to_string_pretty(credential)?;
        let mut options = std::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        use std::io::Write;
        let mut file = options.open(&self.path)?;
        file.write_all(json.as_bytes())?;
        debug!("Saved credential to {}", self.path.display());
        Ok(())
    }
}

/// Owns the live credential and keeps it fresh
pub struct AuthManager {
    credential: RwLock<Credential>,
    policy: RefreshPolicy,
    refresher: Arc<dyn TokenRefresher>,
    store: Option<TokenStore>,
}

impl AuthManager {
    pub fn new(
        credential: Credential,
        policy: RefreshPolicy,
        refresher: Arc<dyn TokenRefresher>,
    ) -> Self {
        Self {
            credential: RwLock::new(credential),
            policy,
            refresher,
            store: None,
        }
    }

    /// Persist refreshed tokens to `store`
    pub fn with_store(mut self, store: TokenStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Current access token, refreshed first if the policy says so
    pub async fn access_token(&self) -> Result<String, AuthError> {
        {
            let credential = self.credential.read().await;
            if !self.policy.needs_refresh(&credential, Utc::now()) {
                return Ok(credential.access_token.clone());
            }
        }

        let mut credential = self.credential.write().await;
        // Another task may have refreshed while we waited for the lock
        if !self.policy.needs_refresh(&credential, Utc::now()) {
            return Ok(credential.access_token.clone());
        }

        let refresh_token = credential
            .refresh_token
            .clone()
            .ok_or(AuthError::NotRefreshable)?;

        debug!("Access token near expiry, refreshing");
        let response = self.refresher.refresh(&refresh_token).await?;
        *credential = Credential::from_response(response, Some(refresh_token), Utc::now());
        info!("Refreshed access token");

        if let Some(store) = &self.store {
            if let Err(e) = store.save(&credential) {
                warn!("Failed to persist refreshed token: {}", e);
            }
        }

        Ok(credential.access_token.clone())
    }

    /// Snapshot of the current credential
    pub async fn credential(&self) -> Credential {
        self.credential.read().await.clone()
    }
}
