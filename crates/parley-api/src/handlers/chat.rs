//! Conversation history and sender listing.

use axum::Json;
use axum::extract::{Path, Query, State};
use validator::Validate;

use parley_core::error::AppError;
use parley_database::store::{MessageStore, UserStore};
use parley_entity::user::model::UserSummary;
use parley_realtime::timeout::with_timeout;

use crate::dto::request::HistoryQuery;
use crate::dto::response::{ApiResponse, MessageResponse};
use crate::error::ApiError;
use crate::extractors::AuthUser;
use crate::state::AppState;

/// GET /api/chats/{username}
///
/// Messages exchanged with `username` in both directions, oldest first.
pub async fn get_chat(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(username): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<ApiResponse<Vec<MessageResponse>>>, ApiError> {
    query
        .validate()
        .map_err(|e| AppError::validation(format!("Invalid query: {e}")))?;
    let limit = state.realtime.config().operation_timeout();

    let other = with_timeout(limit, "user lookup", state.users.find_by_username(&username))
        .await?
        .ok_or_else(|| AppError::not_found(format!("User '{username}' not found")))?;

    let messages = with_timeout(
        limit,
        "conversation query",
        state.messages.conversation(auth.user_id, other.id, query.limit()),
    )
    .await?;

    Ok(Json(ApiResponse::ok(
        messages.into_iter().map(MessageResponse::from).collect(),
    )))
}

/// GET /api/messages/senders
///
/// Users who have sent direct messages to the caller.
pub async fn get_senders(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ApiResponse<Vec<UserSummary>>>, ApiError> {
    let limit = state.realtime.config().operation_timeout();

    let sender_ids = with_timeout(
        limit,
        "sender query",
        state.messages.sender_ids_to(auth.user_id),
    )
    .await?;
    if sender_ids.is_empty() {
        return Ok(Json(ApiResponse::ok(Vec::new())));
    }

    let users = with_timeout(limit, "user lookup", state.users.find_many(&sender_ids)).await?;

    Ok(Json(ApiResponse::ok(
        users.iter().map(UserSummary::from).collect(),
    )))
}
