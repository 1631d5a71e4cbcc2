//! Error types for the Sheets API layer

use std::path::PathBuf;
use thiserror::Error;

/// Errors from credential loading, refresh and persistence
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("no cached token at {}; run `sheet-relay auth login` first", .0.display())]
    NoToken(PathBuf),

    #[error("access token expired and no refresh token is available")]
    NotRefreshable,

    #[error("token endpoint rejected the request: {0}")]
    Endpoint(String),

    #[error("client secret file has neither an \"installed\" nor a \"web\" section")]
    UnsupportedClientSecret,

    #[error("token request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("token cache I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed credential JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors from calls to the spreadsheet service
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request to the Sheets API failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Sheets API returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("could not obtain an access token: {0}")]
    Auth(#[from] AuthError),
}

impl ApiError {
    /// HTTP status code, if the service answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Http(err) => err.status().map(|s| s.as_u16()),
            Self::Auth(_) => None,
        }
    }
}
