use uuid::Uuid;

use crate::error::AppResult;
use crate::models::Conversation;
use crate::services::ConversationService;
use crate::state::AppState;
use crate::websocket::message_types::{ReadReceipt, WsOutboundEvent};
use crate::websocket::Room;

pub struct ReadStateService;

impl ReadStateService {
    /// Mark messages read on behalf of `reader_id`.
    ///
    /// With `message_ids`, only those ids are considered; otherwise every
    /// unread message in the conversation. Messages the reader sent are never
    /// touched. Returns the ids that actually changed; a receipt is broadcast
    /// only when that list is non-empty.
    pub async fn mark_read(
        state: &AppState,
        reader_id: Uuid,
        conversation_id: Uuid,
        message_ids: Option<&[Uuid]>,
    ) -> AppResult<Vec<Uuid>> {
        let conversation =
            ConversationService::load_for_participant(state.store.as_ref(), conversation_id, reader_id)
                .await?;
        Self::mark_read_in(state, &conversation, reader_id, message_ids).await
    }

    /// Same as [`ReadStateService::mark_read`] for an already authorized conversation
    pub(crate) async fn mark_read_in(
        state: &AppState,
        conversation: &Conversation,
        reader_id: Uuid,
        message_ids: Option<&[Uuid]>,
    ) -> AppResult<Vec<Uuid>> {
        let changed = state
            .store
            .mark_read(conversation.id, reader_id, message_ids)
            .await?;

        if !changed.is_empty() {
            tracing::debug!(conversation_id = %conversation.id, %reader_id, count = changed.len(), "messages marked read");
            let receipt = WsOutboundEvent::MessagesRead(ReadReceipt {
                conversation_id: conversation.id,
                user_id: reader_id,
                message_ids: changed.clone(),
            });
            state
                .rooms
                .broadcast(Room::Conversation(conversation.id), &receipt.to_text())
                .await;
        }
        Ok(changed)
    }
}
