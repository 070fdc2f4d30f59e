//! HTTP API for the action registry.
//!
//! Discovery is GET-only; invocation is a POST carrying the encoded
//! arguments. Errors come back as explicit JSON error responses, never
//! as a disguised empty success.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;

use wire_types::{ActionArgs, ActionId};

use crate::registry::{ActionRegistry, RegistryError};

#[derive(Clone)]
pub struct ApiState {
    pub registry: Arc<ActionRegistry>,
}

/// Configure all registry routes.
pub fn router() -> Router<ApiState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/consts", get(get_consts))
        .route("/action/ids", get(get_action_ids))
        .route("/action/info", get(get_action_info))
        .route("/action/take", post(take_action))
}

#[derive(Debug, Deserialize)]
struct ActionIdQuery {
    action_id: String,
}

impl ActionIdQuery {
    fn id(&self) -> ActionId {
        ActionId(self.action_id.clone())
    }
}

impl IntoResponse for RegistryError {
    fn into_response(self) -> Response {
        let status = match &self {
            RegistryError::UnknownAction(_) => StatusCode::NOT_FOUND,
            RegistryError::DuplicateName(_) => StatusCode::CONFLICT,
            RegistryError::ExecutionFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

async fn health_check(State(_state): State<ApiState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "envd",
            "version": env!("CARGO_PKG_VERSION"),
        })),
    )
}

async fn get_consts(State(state): State<ApiState>) -> impl IntoResponse {
    Json(state.registry.consts().to_vec())
}

async fn get_action_ids(State(state): State<ApiState>) -> impl IntoResponse {
    Json(state.registry.action_ids())
}

async fn get_action_info(
    State(state): State<ApiState>,
    Query(query): Query<ActionIdQuery>,
) -> Result<impl IntoResponse, RegistryError> {
    let info = state.registry.action_info(&query.id())?;
    Ok(Json(info.clone()))
}

async fn take_action(
    State(state): State<ApiState>,
    Query(query): Query<ActionIdQuery>,
    Json(args): Json<ActionArgs>,
) -> Result<impl IntoResponse, RegistryError> {
    let result = state.registry.invoke(&query.id(), args)?;
    Ok(Json(result))
}
