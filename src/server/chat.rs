//! Solo chat routes: tutor conversation, history, chat list, suggestions

use axum::extract::{Query, State};
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::JsonBody;
use crate::auth::AuthUser;
use crate::db::{Chat, ChatMessage, Role};
use crate::error::{ApiError, ApiResult};
use crate::prompt;
use crate::state::AppState;
use crate::text::{self, MAX_CONTEXT_CHARS, MAX_MESSAGE_CHARS};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendRequest {
    pub message: Option<String>,
    pub chat_id: Option<String>,
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendResponse {
    pub reply: String,
    pub chat_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryQuery {
    pub chat_id: Option<String>,
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MessagesResponse {
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
pub struct ChatsResponse {
    pub chats: Vec<Chat>,
}

#[derive(Debug, Deserialize)]
pub struct SuggestionRequest {
    pub context: Option<String>,
    pub input: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SuggestionResponse {
    pub suggestions: Vec<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// The query's user must be the caller
fn owned_by_caller(user: &AuthUser, user_id: Option<String>) -> ApiResult<String> {
    let user_id = non_empty(user_id).ok_or(ApiError::BadRequest)?;
    if user_id != user.id {
        return Err(ApiError::BadRequest);
    }
    Ok(user_id)
}

/// `POST /` - one tutor turn, starting a new chat when no id is given
pub async fn send(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<SendRequest>,
) -> ApiResult<Json<SendResponse>> {
    let message = req
        .message
        .filter(|m| text::is_present(m, MAX_MESSAGE_CHARS))
        .ok_or(ApiError::BadRequest)?;
    let message = message.trim();
    let user_id = non_empty(req.user_id);

    let chat_id = match non_empty(req.chat_id) {
        Some(id) => id,
        None => {
            let title = state.llm.complete(&prompt::title_context(message)).await?;
            let chat = Chat::new(user_id.clone(), Some(title.trim().to_string()));
            state.db.insert_chat(&chat)?;
            info!(chat_id = %chat.id, "started chat");
            chat.id
        }
    };

    let history = state.db.list_chat_messages(&chat_id, user_id.as_deref())?;
    state.db.insert_message(&ChatMessage::in_chat(
        &chat_id,
        user_id.clone(),
        Role::User,
        message,
    ))?;

    let reply = state
        .llm
        .complete(&prompt::solo_context(&history, message))
        .await?;
    state.db.insert_message(&ChatMessage::in_chat(
        &chat_id,
        user_id,
        Role::Assistant,
        &reply,
    ))?;

    Ok(Json(SendResponse { reply, chat_id }))
}

/// `GET /chat-history` - the caller's messages in one chat
pub async fn history(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<Json<MessagesResponse>> {
    let chat_id = non_empty(query.chat_id).ok_or(ApiError::BadRequest)?;
    let user_id = owned_by_caller(&user, query.user_id)?;

    let messages = state.db.list_chat_messages(&chat_id, Some(&user_id))?;
    Ok(Json(MessagesResponse { messages }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatsQuery {
    pub user_id: Option<String>,
}

/// `GET /chats-with-title` - the caller's chats, newest first
pub async fn list_chats(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<ChatsQuery>,
) -> ApiResult<Json<ChatsResponse>> {
    let user_id = owned_by_caller(&user, query.user_id)?;

    let chats = state.db.list_chats_for_user(&user_id)?;
    Ok(Json(ChatsResponse { chats }))
}

/// `POST /writing-suggestions` - three ways to continue a half-typed message
pub async fn suggestions(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<SuggestionRequest>,
) -> ApiResult<Json<SuggestionResponse>> {
    let input = req
        .input
        .filter(|i| text::is_present(i, MAX_MESSAGE_CHARS))
        .ok_or(ApiError::BadRequest)?;
    let context = req.context.unwrap_or_default();
    if !text::within(&context, MAX_CONTEXT_CHARS) {
        return Err(ApiError::BadRequest);
    }

    let reply = state
        .llm
        .complete(&prompt::suggestion_context(&context, input.trim()))
        .await?;

    Ok(Json(SuggestionResponse {
        suggestions: prompt::parse_suggestions(&reply),
    }))
}
