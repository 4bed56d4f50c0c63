use actix_web::{get, post, web, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::guards::User;
use crate::services::{MessageService, ReadStateService};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub content: String,
}

/// Full history, oldest first. Fetching it marks the caller's unread
/// messages read first, so the body reflects the stored state.
#[get("/conversations/{conversation_id}/messages")]
pub async fn get_messages(
    state: web::Data<AppState>,
    user: User,
    conversation_id: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let conversation_id = conversation_id.into_inner();
    ReadStateService::mark_read(&state, user.id, conversation_id, None).await?;
    let messages = MessageService::history(&state, user.id, conversation_id).await?;
    Ok(HttpResponse::Ok().json(messages))
}

#[post("/conversations/{conversation_id}/messages")]
pub async fn send_message(
    state: web::Data<AppState>,
    user: User,
    conversation_id: web::Path<Uuid>,
    body: web::Json<SendMessageRequest>,
) -> Result<HttpResponse, AppError> {
    let view = MessageService::send(
        &state,
        user.id,
        conversation_id.into_inner(),
        &body.content,
    )
    .await?;
    Ok(HttpResponse::Created().json(view))
}
