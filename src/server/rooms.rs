//! Room routes: membership, model-rewritten messages, owner edits

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::info;

use super::JsonBody;
use crate::auth::AuthUser;
use crate::db::{ChatMessage, Role, Room};
use crate::error::{ApiError, ApiResult};
use crate::prompt::{self, RoomMode};
use crate::state::AppState;
use crate::text::{self, MAX_DESCRIPTION_CHARS, MAX_MESSAGE_CHARS, MAX_ROOM_NAME_CHARS};

const AI_LIMIT_MESSAGE: &str = "Too many requests. Please wait a moment.";
const ROOM_LIMIT_MESSAGE: &str = "Too many rooms created. Please wait.";

#[derive(Debug, Serialize)]
pub struct RoomResponse {
    pub room: Room,
}

#[derive(Debug, Serialize)]
pub struct RoomsResponse {
    pub rooms: Vec<Room>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: ChatMessage,
}

#[derive(Debug, Serialize)]
pub struct MessagesResponse {
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub ok: bool,
}

#[derive(Debug, Serialize)]
pub struct TranslationResponse {
    pub translation: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateRoomRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub settings: Option<Map<String, Value>>,
    /// Any JSON value; read by truthiness
    #[serde(default)]
    pub public: Value,
}

#[derive(Debug, Deserialize)]
pub struct PostMessageRequest {
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRoomRequest {
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TranslateRequest {
    pub text: Option<String>,
}

/// Loose truthiness: `null`, `false`, `0` and `""` are false, anything else true
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn check_ai_limit(state: &AppState, user: &AuthUser) -> ApiResult<()> {
    if state.limits.ai.check(&user.id) {
        Ok(())
    } else {
        Err(ApiError::TooManyRequests(AI_LIMIT_MESSAGE))
    }
}

/// `GET /rooms` - rooms the caller participates in
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Json<RoomsResponse>> {
    let rooms = state.db.list_rooms_for_participant(&user.id)?;
    Ok(Json(RoomsResponse { rooms }))
}

/// `GET /rooms/public-rooms` - every public room
pub async fn list_public(State(state): State<AppState>) -> ApiResult<Json<RoomsResponse>> {
    let rooms = state.db.list_public_rooms()?;
    Ok(Json(RoomsResponse { rooms }))
}

/// `POST /rooms` - create a room owned by the caller
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    JsonBody(req): JsonBody<CreateRoomRequest>,
) -> ApiResult<(StatusCode, Json<RoomResponse>)> {
    if !state.limits.room_creation.check(&user.id) {
        return Err(ApiError::TooManyRequests(ROOM_LIMIT_MESSAGE));
    }

    let name = text::sanitize(req.name.as_deref().unwrap_or_default());
    let description = text::sanitize(req.description.as_deref().unwrap_or_default());
    if name.is_empty()
        || !text::within(&name, MAX_ROOM_NAME_CHARS)
        || !text::within(&description, MAX_DESCRIPTION_CHARS)
    {
        return Err(ApiError::BadRequest);
    }

    let mut room = Room::new(name, &user.id);
    room.description = description;
    room.public = is_truthy(&req.public);
    room.settings = req.settings.unwrap_or_default();
    state.db.insert_room(&room)?;

    info!(room_id = %room.id, owner = %user.id, public = room.public, "room created");
    Ok((StatusCode::CREATED, Json(RoomResponse { room })))
}

/// `POST /rooms/{room_id}/join` - public rooms admit anyone, private rooms
/// only their existing participants
pub async fn join(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(room_id): Path<String>,
) -> ApiResult<Json<RoomResponse>> {
    let room = state.db.get_room(&room_id)?.ok_or(ApiError::NotFound)?;

    if room.is_participant(&user.id) {
        return Ok(Json(RoomResponse { room }));
    }
    if !room.public {
        return Err(ApiError::Forbidden);
    }

    if state.db.add_participant(&room.id, &user.id)? {
        info!(room_id = %room.id, user = %user.id, "joined room");
    }
    let room = state.db.get_room(&room_id)?.ok_or(ApiError::NotFound)?;
    Ok(Json(RoomResponse { room }))
}

/// `POST /rooms/{room_id}/messages` - post a message; only the model's
/// rewrite of it is stored
pub async fn post_message(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(room_id): Path<String>,
    JsonBody(req): JsonBody<PostMessageRequest>,
) -> ApiResult<(StatusCode, Json<MessageResponse>)> {
    check_ai_limit(&state, &user)?;

    let content = req
        .content
        .filter(|c| text::is_present(c, MAX_MESSAGE_CHARS))
        .ok_or(ApiError::BadRequest)?;

    let room = state.db.get_room(&room_id)?.ok_or(ApiError::BadRequest)?;
    if !room.is_participant(&user.id) {
        if !room.public {
            return Err(ApiError::BadRequest);
        }
        if state.db.add_participant(&room.id, &user.id)? {
            info!(room_id = %room.id, user = %user.id, "joined room by posting");
        }
    }

    let history = state.db.list_room_messages(&room.id)?;
    let mode = RoomMode::from_settings(&room.settings);
    let rewritten = state
        .llm
        .complete(&prompt::room_context(&history, content.trim(), mode))
        .await?;

    let message = ChatMessage::in_room(&room.id, &user.id, Role::User, rewritten.trim());
    state.db.insert_message(&message)?;
    state.db.touch_room(&room.id)?;

    Ok((StatusCode::CREATED, Json(MessageResponse { message })))
}

/// `GET /rooms/{room_id}/messages` - full room history, oldest first
pub async fn messages(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(room_id): Path<String>,
) -> ApiResult<Json<MessagesResponse>> {
    let room = state.db.get_room(&room_id)?.ok_or(ApiError::BadRequest)?;
    if !room.is_visible_to(&user.id) {
        return Err(ApiError::BadRequest);
    }

    let messages = state.db.list_room_messages(&room.id)?;
    Ok(Json(MessagesResponse { messages }))
}

/// `PATCH /rooms/{room_id}` - owner-only description edit
pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(room_id): Path<String>,
    JsonBody(req): JsonBody<UpdateRoomRequest>,
) -> ApiResult<Json<RoomResponse>> {
    let description = req.description.as_deref().map(text::sanitize);
    if description
        .as_deref()
        .is_some_and(|d| !text::within(d, MAX_DESCRIPTION_CHARS))
    {
        return Err(ApiError::BadRequest);
    }

    let room = state.db.get_room(&room_id)?.ok_or(ApiError::NotFound)?;
    if !room.is_owner(&user.id) {
        return Err(ApiError::Forbidden);
    }

    match description {
        Some(description) => state.db.set_room_description(&room.id, &description)?,
        None => state.db.touch_room(&room.id)?,
    }

    let room = state.db.get_room(&room_id)?.ok_or(ApiError::NotFound)?;
    Ok(Json(RoomResponse { room }))
}

/// `DELETE /rooms/messages/{message_id}` - the author removes a room message
pub async fn delete_message(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(message_id): Path<String>,
) -> ApiResult<Json<DeleteResponse>> {
    let message = state
        .db
        .get_message(&message_id)?
        .filter(|m| m.room_id.is_some())
        .ok_or(ApiError::NotFound)?;

    if message.user_id.as_deref() != Some(user.id.as_str()) {
        return Err(ApiError::Forbidden);
    }

    state.db.delete_message(&message.id)?;
    info!(message_id = %message.id, "room message deleted");
    Ok(Json(DeleteResponse { ok: true }))
}

/// `POST /rooms/translate-message` - Japanese rendering of any text
pub async fn translate(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    JsonBody(req): JsonBody<TranslateRequest>,
) -> ApiResult<Json<TranslationResponse>> {
    check_ai_limit(&state, &user)?;

    let text = req
        .text
        .filter(|t| !t.is_empty())
        .ok_or(ApiError::BadRequest)?;

    let translation = state.llm.complete(&prompt::japanese_context(&text)).await?;
    Ok(Json(TranslationResponse { translation }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_is_truthy() {
        for value in [json!(null), json!(false), json!(0), json!(0.0), json!("")] {
            assert!(!is_truthy(&value), "{} should be false", value);
        }
        for value in [json!(true), json!(1), json!(-2.5), json!("no"), json!([]), json!({})] {
            assert!(is_truthy(&value), "{} should be true", value);
        }
    }

    #[test]
    fn test_create_request_accepts_loose_public() -> anyhow::Result<()> {
        let req: CreateRoomRequest = serde_json::from_value(json!({ "name": "a", "public": null }))?;
        assert!(!is_truthy(&req.public));

        let req: CreateRoomRequest = serde_json::from_value(json!({ "name": "a" }))?;
        assert!(!is_truthy(&req.public));

        let req: CreateRoomRequest = serde_json::from_value(json!({ "name": "a", "public": "yes" }))?;
        assert!(is_truthy(&req.public));
        Ok(())
    }
}
