//! HTTP route handlers for the chat API.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::Value;
use tower_http::services::ServeDir;

use crate::chat::{current_time, echo, ensure_conversation, save_echo_messages};
use crate::storage::{Conversation, Message};

use super::error::{ApiError, ApiResult};
use super::state::AppState;

/// Create the API router with all routes.
///
/// Paths outside `/api` and `/health` are served from the static directory.
pub fn create_router(state: Arc<AppState>) -> Router {
    let assets = ServeDir::new(&state.static_dir);
    Router::new()
        .route("/health", get(health_check))
        .route("/api/echo", post(echo_message))
        .route("/api/time", post(time_message))
        .route("/api/cat", post(cat_message))
        .route("/api/conversations", get(list_conversations))
        .route(
            "/api/conversations/{conversation_id}/messages",
            get(conversation_messages),
        )
        .route(
            "/api/conversations/{conversation_id}",
            delete(delete_conversation),
        )
        .fallback_service(assets)
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "echo-chat",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Chat message request.
///
/// Parsed by hand from the raw body so that every malformed `message`
/// (missing, `null`, number, object, array, or a body that is not JSON)
/// gets the same 400 answer.
#[derive(Debug, PartialEq, Eq)]
pub struct ChatRequest {
    /// Text typed by the user.
    pub message: String,
    /// Conversation to append to; `None` starts a new one.
    pub conversation_id: Option<i64>,
}

impl ChatRequest {
    /// Parse and validate a request body.
    ///
    /// # Errors
    /// [`ApiError::InvalidMessage`] if `message` is not a string,
    /// [`ApiError::InvalidConversationId`] if `conversationId` is not a whole number.
    pub fn from_body(body: &[u8]) -> ApiResult<Self> {
        let payload: Value = serde_json::from_slice(body).unwrap_or(Value::Null);

        let message = payload
            .get("message")
            .and_then(Value::as_str)
            .ok_or(ApiError::InvalidMessage)?
            .to_string();

        // 0 and null mean "no conversation yet", same as an absent field.
        let conversation_id = match payload.get("conversationId") {
            None | Some(Value::Null) => None,
            Some(value) => match value
                .as_i64()
                .or_else(|| value.as_f64().and_then(whole_number_id))
            {
                Some(0) => None,
                Some(id) => Some(id),
                None => return Err(ApiError::InvalidConversationId),
            },
        };

        Ok(Self {
            message,
            conversation_id,
        })
    }
}

/// Reply to a chat message.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    /// Generated reply.
    pub message: String,
    /// Conversation the exchange was stored under.
    pub conversation_id: i64,
}

/// Reply carrying only a message.
#[derive(Debug, Serialize)]
pub struct TimeResponse {
    /// Current time as `HH:MM`.
    pub message: String,
}

/// Acknowledgement for a deletion.
#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    /// Always `true` on a 200 answer.
    pub success: bool,
}

/// 2^63, the first float past the `i64` range.
const I64_LIMIT: f64 = 9_223_372_036_854_775_808.0;

/// Map a float to an id when it is a whole number inside the `i64` range.
#[allow(clippy::cast_possible_truncation, clippy::float_cmp)]
fn whole_number_id(value: f64) -> Option<i64> {
    let in_range = (-I64_LIMIT..I64_LIMIT).contains(&value);
    (in_range && value.trunc() == value).then(|| value as i64)
}

/// Parse a conversation id path segment.
///
/// Any numeric spelling is accepted (`7`, `7.0`, `1e2`). Numbers that
/// cannot name a row, such as `1.5` or `inf`, give `Ok(None)`.
///
/// # Errors
/// [`ApiError::InvalidConversationId`] if the segment is not a number.
pub fn parse_conversation_id(raw: &str) -> ApiResult<Option<i64>> {
    let raw = raw.trim();
    if let Ok(id) = raw.parse::<i64>() {
        return Ok(Some(id));
    }
    match raw.parse::<f64>() {
        Ok(value) if !value.is_nan() => Ok(whole_number_id(value)),
        _ => Err(ApiError::InvalidConversationId),
    }
}

/// Echo the user's message back and store both lines.
async fn echo_message(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> ApiResult<Json<ChatResponse>> {
    let request = ChatRequest::from_body(&body)?;
    let store = state.store.as_ref();

    let conversation_id =
        ensure_conversation(store, &request.message, request.conversation_id).await?;
    let reply = echo(&request.message);
    save_echo_messages(store, &request.message, &reply, conversation_id).await?;

    Ok(Json(ChatResponse {
        message: reply,
        conversation_id,
    }))
}

/// Answer with the current time. Nothing is stored.
async fn time_message() -> Json<TimeResponse> {
    Json(TimeResponse {
        message: current_time(),
    })
}

/// Answer with a cat fact and store the exchange.
async fn cat_message(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> ApiResult<Json<ChatResponse>> {
    let request = ChatRequest::from_body(&body)?;
    let store = state.store.as_ref();

    let conversation_id =
        ensure_conversation(store, &request.message, request.conversation_id).await?;
    let fact = state.cat_facts.random_fact().await;
    save_echo_messages(store, &request.message, &fact, conversation_id).await?;

    Ok(Json(ChatResponse {
        message: fact,
        conversation_id,
    }))
}

/// List all conversations, newest first.
async fn list_conversations(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<Conversation>>> {
    let conversations = state.store.get_conversations().await?;
    Ok(Json(conversations))
}

/// List the messages of one conversation.
async fn conversation_messages(
    State(state): State<Arc<AppState>>,
    Path(conversation_id): Path<String>,
) -> ApiResult<Json<Vec<Message>>> {
    let Some(conversation_id) = parse_conversation_id(&conversation_id)? else {
        return Ok(Json(Vec::new()));
    };
    let messages = state
        .store
        .get_messages_by_conversation_id(conversation_id)
        .await?;
    Ok(Json(messages))
}

/// Delete a conversation and its messages. Unknown ids succeed.
async fn delete_conversation(
    State(state): State<Arc<AppState>>,
    Path(conversation_id): Path<String>,
) -> ApiResult<Json<DeleteResponse>> {
    let Some(conversation_id) = parse_conversation_id(&conversation_id)? else {
        tracing::debug!("delete of non-integral conversation id");
        return Ok(Json(DeleteResponse { success: true }));
    };
    let removed = state.store.delete_conversation(conversation_id).await?;
    if removed == 0 {
        tracing::debug!(conversation_id, "delete of unknown conversation");
    } else {
        tracing::info!(conversation_id, "deleted conversation");
    }
    Ok(Json(DeleteResponse { success: true }))
}
