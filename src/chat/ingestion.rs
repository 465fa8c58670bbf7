use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
};
use log::{debug, error, info, warn};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::{mpsc::Sender, watch};

use super::events::{ChatEvent, EventEnvelope};
use super::signature;

pub const EVENTS_PATH: &str = "/slack/events";

/// State shared across axum handlers.
struct AppState {
    tx: Sender<ChatEvent>,
    signing_secret: Option<String>,
    bot_user_id: Option<String>,
}

pub fn router(
    tx: Sender<ChatEvent>,
    signing_secret: Option<String>,
    bot_user_id: Option<String>,
) -> Router {
    if signing_secret.is_none() {
        warn!("SLACK_SIGNING_SECRET is not set, inbound events will not be verified");
    }
    let state = Arc::new(AppState {
        tx,
        signing_secret,
        bot_user_id,
    });
    Router::new()
        .route(EVENTS_PATH, post(slack_events))
        .with_state(state)
}

/// Start the Slack Events API endpoint and run until `shutdown` flips to true.
pub async fn start_events_service(
    addr: SocketAddr,
    app: Router,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    info!("Starting Slack events endpoint on {addr}{EVENTS_PATH}");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.wait_for(|stop| *stop).await;
            info!("Slack events endpoint shutting down");
        })
        .await
        .map_err(|e| e.into())
}

fn header<'a>(headers: &'a HeaderMap, name: &'static str) -> Result<&'a str, signature::SignatureError> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .ok_or(signature::SignatureError::MissingHeader(name))
}

fn verify_request(
    secret: &str,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<(), signature::SignatureError> {
    let timestamp = header(headers, "x-slack-request-timestamp")?;
    let sig = header(headers, "x-slack-signature")?;
    signature::verify(secret, timestamp, sig, body, chrono::Utc::now().timestamp())
}

/// Handler for Slack event callbacks.
async fn slack_events(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if let Some(secret) = &state.signing_secret {
        if let Err(e) = verify_request(secret, &headers, &body) {
            warn!("Rejected Slack request: {e}");
            return (StatusCode::UNAUTHORIZED, e.to_string()).into_response();
        }
    }

    let envelope: EventEnvelope = match serde_json::from_slice(&body) {
        Ok(envelope) => envelope,
        Err(e) => {
            warn!("Malformed Slack payload: {e}");
            return (StatusCode::BAD_REQUEST, e.to_string()).into_response();
        }
    };

    match envelope {
        EventEnvelope::UrlVerification { challenge } => {
            info!("Answering Slack url verification");
            Json(json!({ "challenge": challenge })).into_response()
        }
        EventEnvelope::EventCallback { event } => {
            // Slack redelivers when we answer slowly. The first delivery is
            // already being handled and commands must not run twice.
            if let Some(retry) = headers.get("x-slack-retry-num") {
                debug!("Ignoring Slack retry {retry:?}");
                return StatusCode::OK.into_response();
            }
            let Some(event) = event.into_chat_event(state.bot_user_id.as_deref()) else {
                return StatusCode::OK.into_response();
            };
            debug!("Queueing message from {} in {}", event.sender_id, event.channel);
            match state.tx.try_send(event) {
                Ok(()) => StatusCode::OK.into_response(),
                Err(_) => {
                    error!("Failed to queue chat event: buffer full");
                    (StatusCode::TOO_MANY_REQUESTS, "Event buffer full").into_response()
                }
            }
        }
        EventEnvelope::Unsupported => StatusCode::OK.into_response(),
    }
}
