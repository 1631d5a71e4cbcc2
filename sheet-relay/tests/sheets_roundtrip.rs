//! Relay + SheetsClient against a local stand-in for the Sheets API.

use async_trait::async_trait;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{post, put};
use axum::{Json, Router};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use sheet_relay::api::auth::{Credential, RefreshPolicy, TokenRefresher, TokenResponse};
use sheet_relay::api::{ApiError, AuthError, AuthManager, SheetsApi, SheetsClient, UpdateRequest};
use sheet_relay::services::relay::{DispatchMode, Relay, RelaySettings, Submission};

#[derive(Debug, Clone)]
struct Call {
    spreadsheet: String,
    range: String,
    input_option: Option<String>,
    authorization: Option<String>,
    body: Value,
}

#[derive(Default)]
struct FakeSheets {
    calls: Mutex<Vec<Call>>,
}

async fn update(
    State(fake): State<Arc<FakeSheets>>,
    Path((spreadsheet, range)): Path<(String, String)>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    fake.calls.lock().unwrap().push(Call {
        spreadsheet,
        range: range.clone(),
        input_option: query.get("valueInputOption").cloned(),
        authorization: headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body,
    });

    if range == "Z9:Z9" {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": {"code": 400, "message": "protected cell", "status": "INVALID_ARGUMENT"}})),
        );
    }
    (StatusCode::OK, Json(json!({"updatedRange": range, "updatedCells": 1})))
}

async fn batch_update(
    State(fake): State<Arc<FakeSheets>>,
    Path(spreadsheet): Path<String>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    fake.calls.lock().unwrap().push(Call {
        spreadsheet,
        range: "<batch>".to_string(),
        input_option: body["valueInputOption"].as_str().map(str::to_string),
        authorization: None,
        body,
    });
    Json(json!({"totalUpdatedCells": 5, "responses": []}))
}

async fn start_fake() -> (String, Arc<FakeSheets>) {
    let fake = Arc::new(FakeSheets::default());
    let app = Router::new()
        .route("/v4/spreadsheets/{id}/values/{range}", put(update))
        .route("/v4/spreadsheets/{id}/values:batchUpdate", post(batch_update))
        .with_state(fake.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), fake)
}

struct NoRefresh;

#[async_trait]
impl TokenRefresher for NoRefresh {
    async fn refresh(&self, _refresh_token: &str) -> Result<TokenResponse, AuthError> {
        Err(AuthError::NotRefreshable)
    }
}

fn client(base: &str) -> SheetsClient {
    let auth = AuthManager::new(
        Credential {
            access_token: "test-token".to_string(),
            token_type: "Bearer".to_string(),
            refresh_token: None,
            expiry: None,
        },
        RefreshPolicy::Never,
        Arc::new(NoRefresh),
    );
    SheetsClient::with_options(Arc::new(auth), base, None).unwrap()
}

fn submission(extra: &[(&str, &str)]) -> Submission {
    let mut submission: Submission = [
        ("Data", "2020-01-01"),
        ("Operatore", "Bob"),
        ("nome_scheda", "S1"),
        ("numero_unita", "7"),
    ]
    .into_iter()
    .collect();
    for (name, value) in extra {
        submission.push(*name, *value);
    }
    submission
}

#[tokio::test]
async fn test_relay_writes_through_http() {
    let (base, fake) = start_fake().await;
    let relay = Relay::new(Arc::new(client(&base)), RelaySettings::new("sheet-xyz"));

    let report = relay
        .relay(&submission(&[("radioC5", "OK"), ("comment", "not relayed")]))
        .await
        .unwrap();
    assert_eq!(report.succeeded(), 2);

    let calls = fake.calls.lock().unwrap().clone();
    assert_eq!(calls.len(), 2);

    assert_eq!(calls[0].spreadsheet, "sheet-xyz");
    assert_eq!(calls[0].range, "B2:B");
    assert_eq!(calls[0].input_option.as_deref(), Some("RAW"));
    assert_eq!(calls[0].authorization.as_deref(), Some("Bearer test-token"));
    assert_eq!(
        calls[0].body,
        json!({
            "range": "B2:B",
            "majorDimension": "ROWS",
            "values": [["2020-01-01"], ["Bob"], ["S1"], ["7"]]
        })
    );

    assert_eq!(calls[1].range, "C5:C5");
    assert_eq!(calls[1].body["values"], json!([["OK"]]));
}

#[tokio::test]
async fn test_service_error_message_is_surfaced() {
    let (base, _fake) = start_fake().await;
    let client = client(&base);

    let request = UpdateRequest::single(
        sheet_relay::api::CellRange::single("Z9").unwrap(),
        "x",
    );
    let err = client.update_values("sheet-xyz", &request).await.unwrap_err();
    match err {
        ApiError::Status { status, message } => {
            assert_eq!(status, 400);
            assert_eq!(message, "protected cell");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_failed_cell_does_not_block_later_cells() {
    let (base, fake) = start_fake().await;
    let relay = Relay::new(Arc::new(client(&base)), RelaySettings::new("sheet-xyz"));

    let report = relay
        .relay(&submission(&[("radioZ9", "KO"), ("radioA1", "OK")]))
        .await
        .unwrap();

    assert_eq!(report.attempted(), 3);
    assert_eq!(report.failed(), 1);
    let ranges: Vec<String> = fake
        .calls
        .lock()
        .unwrap()
        .iter()
        .map(|c| c.range.clone())
        .collect();
    assert_eq!(ranges, vec!["B2:B", "A1:A1", "Z9:Z9"]);
}

#[tokio::test]
async fn test_batch_dispatch_uses_one_call() {
    let (base, fake) = start_fake().await;
    let mut settings = RelaySettings::new("sheet-xyz");
    settings.mode = DispatchMode::Batch;
    let relay = Relay::new(Arc::new(client(&base)), settings);

    let report = relay
        .relay(&submission(&[("radioC5", "OK")]))
        .await
        .unwrap();
    assert_eq!(report.succeeded(), 2);

    let calls = fake.calls.lock().unwrap().clone();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].range, "<batch>");
    assert_eq!(calls[0].input_option.as_deref(), Some("RAW"));
    assert_eq!(calls[0].body["data"].as_array().unwrap().len(), 2);
    assert_eq!(calls[0].body["data"][1]["range"], "C5:C5");
}
