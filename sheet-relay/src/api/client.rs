//! Google Sheets v4 values client

use async_trait::async_trait;
use log::debug;
use std::sync::Arc;
use std::time::Duration;

use super::auth::AuthManager;
use super::error::ApiError;
use super::models::{
    BatchUpdateValuesRequest, BatchUpdateValuesResponse, ErrorEnvelope, UpdateValuesResponse,
    ValueInputOption,
};
use super::operations::UpdateRequest;

pub const DEFAULT_API_BASE: &str = "https://sheets.googleapis.com";

/// The spreadsheet operations the relay depends on
#[async_trait]
pub trait SheetsApi: Send + Sync {
    /// `spreadsheets.values.update` for a single range
    async fn update_values(
        &self,
        spreadsheet_id: &str,
        request: &UpdateRequest,
    ) -> Result<UpdateValuesResponse, ApiError>;

    /// `spreadsheets.values.batchUpdate`, applied by the service as one unit
    async fn batch_update_values(
        &self,
        spreadsheet_id: &str,
        requests: &[UpdateRequest],
    ) -> Result<BatchUpdateValuesResponse, ApiError>;
}

/// HTTPS client for the Sheets API
pub struct SheetsClient {
    http: reqwest::Client,
    base_url: String,
    auth: Arc<AuthManager>,
}

impl SheetsClient {
    pub fn new(auth: Arc<AuthManager>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: DEFAULT_API_BASE.to_string(),
            auth,
        }
    }

    /// Build a client with a custom base URL and optional request timeout
    pub fn with_options(
        auth: Arc<AuthManager>,
        base_url: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, ApiError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            http: builder.build()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth,
        })
    }

    fn values_url(&self, spreadsheet_id: &str, range: &str) -> String {
        format!(
            "{}/v4/spreadsheets/{}/values/{}",
            self.base_url,
            urlencoding::encode(spreadsheet_id),
            urlencoding::encode(range)
        )
    }

    fn batch_url(&self, spreadsheet_id: &str) -> String {
        format!(
            "{}/v4/spreadsheets/{}/values:batchUpdate",
            self.base_url,
            urlencoding::encode(spreadsheet_id)
        )
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(ApiError::Status {
            status: status.as_u16(),
            message: error_message(&body),
        })
    }
}

/// Pull the human message out of a Google error body, falling back to the raw text
fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => envelope.error.message,
        Err(_) if body.trim().is_empty() => "empty response body".to_string(),
        Err(_) => body.trim().to_string(),
    }
}

#[async_trait]
impl SheetsApi for SheetsClient {
    async fn update_values(
        &self,
        spreadsheet_id: &str,
        request: &UpdateRequest,
    ) -> Result<UpdateValuesResponse, ApiError> {
        let token = self.auth.access_token().await?;
        let url = self.values_url(spreadsheet_id, request.range.as_str());
        debug!("PUT {} ({} cells)", url, request.cell_count());

        let response = self
            .http
            .put(&url)
            .bearer_auth(token)
            .query(&[("valueInputOption", request.input_option.as_str())])
            .json(&request.to_value_range())
            .send()
            .await?;

        let response = Self::check(response).await?;
        Ok(response.json::<UpdateValuesResponse>().await?)
    }

    async fn batch_update_values(
        &self,
        spreadsheet_id: &str,
        requests: &[UpdateRequest],
    ) -> Result<BatchUpdateValuesResponse, ApiError> {
        let token = self.auth.access_token().await?;
        let url = self.batch_url(spreadsheet_id);
        // The batch endpoint takes one input option for all ranges
        let body = BatchUpdateValuesRequest {
            value_input_option: requests
                .first()
                .map(|r| r.input_option)
                .unwrap_or(ValueInputOption::Raw),
            data: requests.iter().map(UpdateRequest::to_value_range).collect(),
        };
        debug!("POST {} ({} ranges)", url, body.data.len());

        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;

        let response = Self::check(response).await?;
        Ok(response.json::<BatchUpdateValuesResponse>().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::auth::{Credential, RefreshPolicy, TokenRefresher, TokenResponse};
    use crate::api::error::AuthError;

    struct NoRefresh;

    #[async_trait]
    impl TokenRefresher for NoRefresh {
        async fn refresh(&self, _: &str) -> Result<TokenResponse, AuthError> {
            Err(AuthError::NotRefreshable)
        }
    }

    fn client(base: &str) -> SheetsClient {
        let auth = AuthManager::new(
            Credential {
                access_token: "t".to_string(),
                token_type: "Bearer".to_string(),
                refresh_token: None,
                expiry: None,
            },
            RefreshPolicy::Never,
            Arc::new(NoRefresh),
        );
        SheetsClient::with_options(Arc::new(auth), base, None).unwrap()
    }

    #[test]
    fn test_values_url_encodes_range() {
        let client = client("https://example.test/");
        assert_eq!(
            client.values_url("sheet-id", "C5:C5"),
            "https://example.test/v4/spreadsheets/sheet-id/values/C5%3AC5"
        );
        assert_eq!(
            client.batch_url("sheet-id"),
            "https://example.test/v4/spreadsheets/sheet-id/values:batchUpdate"
        );
    }

    #[test]
    fn test_error_message_from_envelope() {
        let body = r#"{"error": {"code": 400, "message": "Unable to parse range: xx", "status": "INVALID_ARGUMENT"}}"#;
        assert_eq!(error_message(body), "Unable to parse range: xx");
        assert_eq!(error_message("  bad gateway \n"), "bad gateway");
        assert_eq!(error_message(""), "empty response body");
    }
}
