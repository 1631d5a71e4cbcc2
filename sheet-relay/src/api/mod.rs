//! Google Sheets Web API Module
//!
//! This module provides the outbound side of the relay: OAuth2 credentials,
//! A1 range types, the values-update wire models and an HTTPS client.

pub mod a1;
pub mod auth;
pub mod client;
pub mod error;
pub mod models;
pub mod operations;

pub use a1::{A1Error, CellRange};
pub use auth::{AuthManager, ClientSecret, Credential, OAuthEndpoint, RefreshPolicy, TokenRefresher, TokenStore};
pub use client::{SheetsApi, SheetsClient};
pub use error::{ApiError, AuthError};
pub use models::{UpdateValuesResponse, ValueInputOption, ValueRange};
pub use operations::{UpdateOutcome, UpdateRequest};
