use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{message::normalize_content, MessageView};
use crate::services::ConversationService;
use crate::state::AppState;
use crate::websocket::message_types::{ConversationNotice, WsOutboundEvent};
use crate::websocket::Room;

pub struct MessageService;

impl MessageService {
    /// Persist a message and fan it out.
    ///
    /// Nothing is broadcast unless the store accepted the message. The
    /// recipient additionally gets a `conversation:new-message` notice on
    /// their personal room when they are online but none of their
    /// connections is viewing the conversation.
    pub async fn send(
        state: &AppState,
        sender_id: Uuid,
        conversation_id: Uuid,
        content: &str,
    ) -> AppResult<MessageView> {
        let content = normalize_content(content)?;
        let conversation =
            ConversationService::load_for_participant(state.store.as_ref(), conversation_id, sender_id)
                .await?;
        let sender = state
            .store
            .find_user(sender_id)
            .await?
            .ok_or_else(|| AppError::NotFound("user".into()))?;

        let message = state
            .store
            .insert_message(conversation_id, sender_id, &content)
            .await
            .map_err(|e| {
                tracing::error!(%conversation_id, %sender_id, error = %e, "failed to persist message");
                AppError::from(e)
            })?;
        tracing::debug!(message_id = %message.id, %conversation_id, "message persisted");

        let view = MessageView::new(message, sender);
        let room = Room::Conversation(conversation_id);
        state
            .rooms
            .broadcast(room, &WsOutboundEvent::MessageNew(view.clone()).to_text())
            .await;

        if let Some(recipient_id) = conversation.counterpart_of(sender_id) {
            if state.presence.is_online(recipient_id).await
                && !state.rooms.user_in_room(room, recipient_id).await
            {
                let notice = WsOutboundEvent::ConversationNewMessage(ConversationNotice {
                    conversation_id,
                    message: view.clone(),
                });
                state
                    .rooms
                    .broadcast(Room::User(recipient_id), &notice.to_text())
                    .await;
            }
        }

        Ok(view)
    }

    /// Full history, oldest first
    pub async fn history(
        state: &AppState,
        user_id: Uuid,
        conversation_id: Uuid,
    ) -> AppResult<Vec<crate::models::Message>> {
        ConversationService::load_for_participant(state.store.as_ref(), conversation_id, user_id)
            .await?;
        Ok(state.store.list_messages(conversation_id).await?)
    }
}
