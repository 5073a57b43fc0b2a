//! HTTP and WebSocket routing.

use crate::error::InspectorError;
use crate::payload::{ClientMessage, HistoryRecord, ServerMessage};
use crate::server::{AppState, MAX_HISTORY_LIMIT};
use axum::{
    Json, Router,
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use futures::{Sink, SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::broadcast::error::RecvError;

const DASHBOARD: &str = include_str!("static/index.html");

/// Create the router for the history server.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(dashboard))
        .route("/ws", get(ws_handler))
        .route("/health", get(health))
        .route("/api/history", get(history))
        .route("/api/test", post(echo))
        .with_state(state)
}

/// Error returned by JSON endpoints
struct ApiError(InspectorError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        log::error!("Request failed: {}", self.0);
        (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

impl From<InspectorError> for ApiError {
    fn from(e: InspectorError) -> Self {
        Self(e)
    }
}

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    limit: Option<usize>,
}

async fn dashboard() -> Html<&'static str> {
    Html(DASHBOARD)
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "connections": state.connections(),
    }))
}

async fn history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<HistoryRecord>>, ApiError> {
    let limit = query.limit.unwrap_or(state.history_limit()).clamp(1, MAX_HISTORY_LIMIT);
    Ok(Json(state.store().recent(limit).await?))
}

async fn echo(Json(received): Json<serde_json::Value>) -> impl IntoResponse {
    log::debug!("Test payload received: {}", received);
    Json(json!({ "success": true, "received": received }))
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Serve one viewer or inspector until either side hangs up.
async fn handle_socket(socket: WebSocket, state: AppState) {
    let open = state.connection_opened();
    log::info!("WebSocket connected ({} open)", open);

    // Subscribe first so no broadcast slips between the snapshot and the loop
    let mut updates = state.subscribe();
    let (mut sender, mut receiver) = socket.split();

    if send_message(&mut sender, &state.history_message().await).await.is_ok() {
        loop {
            tokio::select! {
                incoming = receiver.next() => match incoming {
                    Some(Ok(Message::Text(text))) => {
                        if let Some(reply) = handle_text(&state, text.as_str()).await {
                            if send_message(&mut sender, &reply).await.is_err() {
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        log::debug!("WebSocket receive error: {}", e);
                        break;
                    }
                },
                update = updates.recv() => match update {
                    Ok(message) => {
                        if send_message(&mut sender, &message).await.is_err() {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        log::warn!("Viewer lagged behind by {} updates", skipped);
                    }
                    Err(RecvError::Closed) => break,
                },
                _ = state.shutdown.cancelled() => {
                    let _ = sender.send(Message::Close(None)).await;
                    break;
                }
            }
        }
    }

    let open = state.connection_closed();
    log::info!("WebSocket disconnected ({} open)", open);
}

/// Apply one client message; returns a reply meant only for the sender
async fn handle_text(state: &AppState, text: &str) -> Option<ServerMessage> {
    let message = match serde_json::from_str::<ClientMessage>(text) {
        Ok(message) => message,
        Err(e) => {
            log::warn!("Rejected client message: {}", e);
            return Some(ServerMessage::Error(format!("Invalid message: {}", e)));
        }
    };

    match message {
        ClientMessage::ElementSelected(event) => match state.store().insert(&event).await {
            Ok(id) => {
                log::info!("Stored <{}> from {} as #{}", event.tag_name, event.url, id);
                state.broadcast_history().await;
                None
            }
            Err(e) => {
                log::error!("Failed to store selection: {}", e);
                Some(ServerMessage::Error(format!("Failed to store selection: {}", e)))
            }
        },
    }
}

async fn send_message<S>(sender: &mut S, message: &ServerMessage) -> Result<(), ()>
where
    S: Sink<Message> + Unpin,
{
    let json = match serde_json::to_string(message) {
        Ok(json) => json,
        Err(e) => {
            log::error!("Failed to serialize server message: {}", e);
            return Err(());
        }
    };
    sender.send(Message::Text(json.into())).await.map_err(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::SqliteHistoryStore;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use std::sync::Arc;
    use tower::ServiceExt;

    async fn app() -> (Router, AppState) {
        let store = SqliteHistoryStore::in_memory().await.unwrap();
        let state = AppState::new(Arc::new(store), 10);
        (router(state.clone()), state)
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn selected_message(tag: &str) -> String {
        json!({
            "type": "elementSelected",
            "data": {
                "tagName": tag,
                "xpath": format!("/html[1]/body[1]/{}[1]", tag),
                "cssSelector": tag,
                "url": "https://example.com",
                "timestamp": "2024-05-01T12:00:00Z"
            }
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _) = app().await;
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn test_dashboard_is_served() {
        let (app, _) = app().await;
        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(String::from_utf8_lossy(&bytes).contains("<html"));
    }

    #[tokio::test]
    async fn test_echo() {
        let (app, _) = app().await;
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/test")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"ping": 1}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        let json = body_json(response).await;
        assert_eq!(json, json!({ "success": true, "received": { "ping": 1 } }));
    }

    #[tokio::test]
    async fn test_history_limit_is_clamped() {
        let (app, state) = app().await;
        for tag in ["div", "span", "a"] {
            assert!(handle_text(&state, &selected_message(tag)).await.is_none());
        }

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/api/history?limit=0").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let json = body_json(response).await;
        assert_eq!(json.as_array().unwrap().len(), 1);
        assert_eq!(json[0]["tagName"], "a");

        let response = app
            .oneshot(Request::builder().uri("/api/history").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(body_json(response).await.as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_invalid_message_gets_error_reply() {
        let (_, state) = app().await;
        let reply = handle_text(&state, r#"{"type":"somethingElse"}"#).await;
        assert!(matches!(reply, Some(ServerMessage::Error(_))));
    }

    #[tokio::test]
    async fn test_stored_selection_is_broadcast() {
        let (_, state) = app().await;
        let mut updates = state.subscribe();

        assert!(handle_text(&state, &selected_message("button")).await.is_none());

        match updates.recv().await.unwrap() {
            ServerMessage::History(records) => {
                assert_eq!(records.len(), 1);
                assert_eq!(records[0].tag_name, "button");
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }
}
