use actix_web::{get, post, web, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::guards::User;
use crate::services::ConversationService;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartConversationRequest {
    pub user_id: Uuid,
}

#[get("/conversations")]
pub async fn get_conversations(
    state: web::Data<AppState>,
    user: User,
) -> Result<HttpResponse, AppError> {
    let conversations = ConversationService::list_for_user(state.store.as_ref(), user.id).await?;
    Ok(HttpResponse::Ok().json(conversations))
}

/// Get-or-create the direct conversation with another user
#[post("/conversations")]
pub async fn create_conversation(
    state: web::Data<AppState>,
    user: User,
    body: web::Json<StartConversationRequest>,
) -> Result<HttpResponse, AppError> {
    let conversation =
        ConversationService::start_with(state.store.as_ref(), user.id, body.user_id).await?;
    Ok(HttpResponse::Ok().json(conversation))
}
