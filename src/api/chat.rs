//! Assistant chat endpoints

use super::auth::CurrentUser;
use super::error::ApiResult;
use super::state::AppState;
use super::tickets::file_ticket;
use crate::assistant::{suggestions, ChatOutcome, DEFAULT_SUGGESTION_COUNT};
use crate::types::{ChatMessage, Ticket, TicketDraft};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

pub async fn history_handler(
    State(state): State<AppState>,
    current: CurrentUser,
) -> ApiResult<Json<Vec<ChatMessage>>> {
    Ok(Json(state.chat.history(&current.user).await?))
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub text: String,
    /// Set to false after the user declined the ticket form
    #[serde(default = "default_true")]
    pub detect_intent: bool,
}

pub async fn send_message_handler(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(req): Json<SendMessageRequest>,
) -> ApiResult<Json<ChatOutcome>> {
    let outcome = state
        .chat
        .send(&current.user, &req.text, req.detect_intent)
        .await?;
    Ok(Json(outcome))
}

/// Clear history; responds with the fresh welcome message
pub async fn clear_history_handler(
    State(state): State<AppState>,
    current: CurrentUser,
) -> ApiResult<Json<ChatMessage>> {
    Ok(Json(state.chat.clear(&current.user).await?))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatTicketResponse {
    pub ticket: Ticket,
    pub message: ChatMessage,
}

/// File the ticket drafted in the chat and confirm it in the conversation
pub async fn create_ticket_handler(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(draft): Json<TicketDraft>,
) -> ApiResult<(StatusCode, Json<ChatTicketResponse>)> {
    let ticket = file_ticket(&state, &current.user, draft).await?;
    let message = state
        .chat
        .confirm_ticket(&current.user, &ticket.title, &ticket.kind)
        .await?;
    Ok((StatusCode::CREATED, Json(ChatTicketResponse { ticket, message })))
}

#[derive(Debug, Deserialize)]
pub struct SuggestionsQuery {
    pub count: Option<usize>,
}

pub async fn suggestions_handler(
    _current: CurrentUser,
    Query(query): Query<SuggestionsQuery>,
) -> Json<Vec<&'static str>> {
    Json(suggestions(query.count.unwrap_or(DEFAULT_SUGGESTION_COUNT)))
}
