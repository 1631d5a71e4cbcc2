//! HTTP front end: serves the form page and relays submissions.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use axum::extract::{Form, Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::get;
use log::{debug, error, info, warn};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::services::relay::{Relay, RelayError, Submission};

/// Inspection form served when no template file is configured
pub const DEFAULT_FORM: &str = include_str!("../templates/form.html");

/// Where the form page comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormPage {
    Embedded,
    /// Read on every request so edits show up without a restart
    File(PathBuf),
}

/// Shared application state.
pub struct AppState {
    pub relay: Relay,
    pub form: FormPage,
}

impl AppState {
    pub fn new(relay: Relay, form: FormPage) -> Self {
        Self { relay, form }
    }
}

/// Creates the router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(form_page))
        .route("/submit", get(submit_query).post(submit_form))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn form_page(State(state): State<Arc<AppState>>) -> Response {
    match &state.form {
        FormPage::Embedded => Html(DEFAULT_FORM).into_response(),
        FormPage::File(path) => match tokio::fs::read_to_string(path).await {
            Ok(html) => Html(html).into_response(),
            Err(e) => {
                error!("Failed to read form template {}: {}", path.display(), e);
                (StatusCode::INTERNAL_SERVER_ERROR, "form page unavailable").into_response()
            }
        },
    }
}

/// Name/value pairs in arrival order, repeated keys included
type Pairs = Vec<(String, String)>;

async fn submit_query(
    State(state): State<Arc<AppState>>,
    Query(query): Query<Pairs>,
) -> Response {
    handle_submission(&state, query.into_iter().collect()).await
}

/// Body fields follow any query string fields. A body that is not
/// `application/x-www-form-urlencoded` is rejected by `Form`.
async fn submit_form(
    State(state): State<Arc<AppState>>,
    Query(query): Query<Pairs>,
    Form(body): Form<Pairs>,
) -> Response {
    let submission: Submission = query.into_iter().chain(body).collect();
    handle_submission(&state, submission).await
}

async fn handle_submission(state: &AppState, submission: Submission) -> Response {
    debug!("Submission with {} distinct fields", submission.len());
    match state.relay.relay(&submission).await {
        // Back to the form, like a plain page reload
        Ok(_) => Redirect::to("/").into_response(),
        Err(err @ RelayError::MissingField(_)) => {
            warn!("Rejected submission: {}", err);
            (StatusCode::BAD_REQUEST, err.to_string()).into_response()
        }
        Err(err @ RelayError::Aborted { .. }) => {
            error!("Submission aborted: {}", err);
            (StatusCode::BAD_GATEWAY, err.to_string()).into_response()
        }
    }
}

/// Binds the listener. `host` may be a name (`localhost`) or an IPv4/IPv6
/// literal.
pub async fn bind(host: &str, port: u16) -> anyhow::Result<TcpListener> {
    TcpListener::bind((host, port))
        .await
        .with_context(|| format!("Failed to bind {host} port {port}"))
}

/// Runs the server until Ctrl+C or SIGTERM.
pub async fn run(listener: TcpListener, state: Arc<AppState>) -> anyhow::Result<()> {
    info!(
        "Listening on http://{} (spreadsheet {})",
        listener.local_addr()?,
        state.relay.settings().spreadsheet_id
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C, shutting down gracefully"),
        () = terminate => info!("Received SIGTERM, shutting down gracefully"),
    }
}
