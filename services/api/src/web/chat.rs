//! services/api/src/web/chat.rs
//!
//! Handlers for the two single-turn chat assistants: homework help and
//! definition lookup. Each message is an independent pipeline invocation;
//! no prior turns are passed to the executor. The transcript is only
//! appended to after a successful call, so a failed dispatch leaves the
//! session exactly as it was.

use crate::web::protocol::{reject, ChatRequest, ChatResponse, HandlerError, TranscriptResponse};
use crate::web::state::AppState;
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::Json,
};
use std::sync::Arc;
use study_companion_core::domain::ChatMessage;
use study_companion_core::keystore::ChatChannel;
use study_companion_core::pipeline::{definition_pipeline, homework_pipeline, StageSpec};
use tracing::error;

async fn run_chat_turn(
    app_state: &AppState,
    headers: &HeaderMap,
    channel: ChatChannel,
    message: &str,
    stages: Vec<StageSpec>,
) -> Result<Json<ChatResponse>, HandlerError> {
    let scope = app_state.scope(headers).await;

    if message.trim().is_empty() {
        return Err(reject(
            StatusCode::BAD_REQUEST,
            "Message must not be empty",
        ));
    }

    let credential = scope.credential.as_deref().ok_or_else(|| {
        reject(
            StatusCode::UNAUTHORIZED,
            "Please configure your Gemini API key to use this feature",
        )
    })?;

    let reply = app_state
        .executor
        .run_pipeline(credential, &stages)
        .await
        .map_err(|e| {
            error!("Chat turn failed: {}", e);
            reject(StatusCode::BAD_GATEWAY, format!("Error: {}", e))
        })?;

    app_state
        .store
        .append_chat(&scope.namespace, channel, ChatMessage::user(message))
        .await;
    app_state
        .store
        .append_chat(&scope.namespace, channel, ChatMessage::assistant(&reply))
        .await;

    Ok(Json(ChatResponse { reply }))
}

async fn transcript(
    app_state: &AppState,
    headers: &HeaderMap,
    channel: ChatChannel,
) -> Json<TranscriptResponse> {
    let scope = app_state.scope(headers).await;
    let messages = app_state.store.transcript(&scope.namespace, channel).await;
    Json(TranscriptResponse { messages })
}

async fn clear(app_state: &AppState, headers: &HeaderMap, channel: ChatChannel) -> StatusCode {
    let scope = app_state.scope(headers).await;
    app_state.store.clear_chat(&scope.namespace, channel).await;
    StatusCode::NO_CONTENT
}

// =========================================================================
// Homework help
// =========================================================================

pub async fn homework_message_handler(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, HandlerError> {
    let stages = homework_pipeline(&payload.message);
    run_chat_turn(
        &app_state,
        &headers,
        ChatChannel::Homework,
        &payload.message,
        stages,
    )
    .await
}

pub async fn homework_transcript_handler(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Json<TranscriptResponse> {
    transcript(&app_state, &headers, ChatChannel::Homework).await
}

pub async fn clear_homework_handler(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> StatusCode {
    clear(&app_state, &headers, ChatChannel::Homework).await
}

// =========================================================================
// Definition lookup
// =========================================================================

pub async fn definition_message_handler(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, HandlerError> {
    let stages = definition_pipeline(&payload.message);
    run_chat_turn(
        &app_state,
        &headers,
        ChatChannel::Definitions,
        &payload.message,
        stages,
    )
    .await
}

pub async fn definition_transcript_handler(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Json<TranscriptResponse> {
    transcript(&app_state, &headers, ChatChannel::Definitions).await
}

pub async fn clear_definitions_handler(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> StatusCode {
    clear(&app_state, &headers, ChatChannel::Definitions).await
}
