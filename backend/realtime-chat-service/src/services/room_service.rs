use uuid::Uuid;

use crate::error::AppResult;
use crate::services::ReadStateService;
use crate::websocket::handlers::ConnectionContext;
use crate::websocket::Room;

pub struct RoomService;

impl RoomService {
    /// Subscribe the connection to a conversation room and mark what it can
    /// now see as read.
    ///
    /// Outsiders and unknown conversations are refused without a reply; only
    /// store failures surface as errors.
    pub async fn join(ctx: &ConnectionContext, conversation_id: Uuid) -> AppResult<()> {
        let state = &ctx.state;
        let Some(conversation) = state.store.find_conversation(conversation_id).await? else {
            tracing::warn!(user_id = %ctx.user_id, %conversation_id, "join refused: unknown conversation");
            return Ok(());
        };
        if !conversation.is_participant(ctx.user_id) {
            tracing::warn!(user_id = %ctx.user_id, %conversation_id, "join refused: not a participant");
            return Ok(());
        }

        state
            .rooms
            .join(
                Room::Conversation(conversation_id),
                ctx.connection_id,
                ctx.user_id,
                ctx.outbound.clone(),
            )
            .await;
        tracing::debug!(user_id = %ctx.user_id, %conversation_id, "joined conversation");

        ReadStateService::mark_read_in(state, &conversation, ctx.user_id, None).await?;
        Ok(())
    }

    pub async fn leave(ctx: &ConnectionContext, conversation_id: Uuid) {
        ctx.state
            .rooms
            .leave(Room::Conversation(conversation_id), ctx.connection_id)
            .await;
    }
}
