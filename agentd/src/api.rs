//! HTTP and WebSocket API for the agent daemon.
//!
//! `POST /chat` drives one run to completion and returns the final
//! text; `GET /ws/steps` streams each produced step as one JSON text
//! frame, closing after the run's sentinel.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::json;

use crate::broadcast::StreamItem;
use crate::orchestrator::{RunError, StepOrchestrator};

#[derive(Clone)]
pub struct ApiState {
    pub orchestrator: Arc<StepOrchestrator>,
}

/// Configure all agent routes.
pub fn router() -> Router<ApiState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/chat", post(chat))
        .route("/reset", get(reset))
        .route("/ws/steps", get(steps_websocket))
}

impl IntoResponse for RunError {
    fn into_response(self) -> Response {
        let status = match &self {
            RunError::AlreadyActive => StatusCode::CONFLICT,
            RunError::Runner(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

async fn health_check(State(_state): State<ApiState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "agentd",
            "version": env!("CARGO_PKG_VERSION"),
        })),
    )
}

#[derive(Debug, Deserialize)]
struct ChatQuery {
    message: String,
}

async fn chat(
    State(state): State<ApiState>,
    Query(query): Query<ChatQuery>,
) -> Result<String, RunError> {
    state.orchestrator.chat(&query.message).await
}

async fn reset(State(state): State<ApiState>) -> impl IntoResponse {
    state.orchestrator.reset().await;
    (StatusCode::OK, Json(json!({ "status": "ok" })))
}

async fn steps_websocket(
    ws: WebSocketUpgrade,
    State(state): State<ApiState>,
) -> impl IntoResponse {
    let rx = state.orchestrator.broadcaster().subscribe();
    ws.on_upgrade(move |socket| handle_steps_socket(socket, rx))
}

async fn handle_steps_socket(
    socket: WebSocket,
    mut rx: tokio::sync::mpsc::UnboundedReceiver<StreamItem>,
) {
    tracing::info!("Step subscriber connected");
    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            item = rx.recv() => match item {
                Some(StreamItem::Step(step)) => {
                    let frame = match serde_json::to_string(&step) {
                        Ok(frame) => frame,
                        Err(e) => {
                            tracing::error!(error = %e, "Failed to serialize step frame");
                            continue;
                        }
                    };
                    if sender.send(Message::Text(frame.into())).await.is_err() {
                        break;
                    }
                }
                Some(StreamItem::End) => {
                    let _ = sender.send(Message::Close(None)).await;
                    break;
                }
                // Aborted run: close without a terminal marker.
                None => break,
            },
            msg = receiver.next() => match msg {
                Some(Ok(Message::Ping(data))) => {
                    let _ = sender.send(Message::Pong(data)).await;
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::warn!(error = %e, "Steps websocket receive error");
                    break;
                }
            },
        }
    }

    tracing::info!("Step subscriber disconnected");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::CommandRunner;

    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn test_app() -> Router {
        let runner = CommandRunner::new(Vec::new());
        let orchestrator = Arc::new(StepOrchestrator::new(Box::new(runner)));
        router().with_state(ApiState { orchestrator })
    }

    #[tokio::test]
    async fn chat_returns_final_text() {
        let app = test_app();
        let response = app
            .oneshot(
                Request::post("/chat?message=levitate")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.contains("No action named 'levitate'"));
    }

    #[tokio::test]
    async fn chat_requires_a_message() {
        let app = test_app();
        let response = app
            .oneshot(Request::post("/chat").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn reset_is_ok_from_idle() {
        let app = test_app();
        let response = app
            .oneshot(Request::get("/reset").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
