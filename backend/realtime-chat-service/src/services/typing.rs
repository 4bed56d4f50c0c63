use uuid::Uuid;

use crate::websocket::handlers::ConnectionContext;
use crate::websocket::message_types::{TypingPayload, WsOutboundEvent};
use crate::websocket::Room;

pub struct TypingService;

impl TypingService {
    pub async fn start(ctx: &ConnectionContext, conversation_id: Uuid) {
        Self::relay(ctx, conversation_id, true).await;
    }

    pub async fn stop(ctx: &ConnectionContext, conversation_id: Uuid) {
        Self::relay(ctx, conversation_id, false).await;
    }

    // Only connections already in the room may signal; others are ignored.
    async fn relay(ctx: &ConnectionContext, conversation_id: Uuid, started: bool) {
        let room = Room::Conversation(conversation_id);
        if !ctx.state.rooms.is_subscribed(room, ctx.connection_id).await {
            tracing::debug!(user_id = %ctx.user_id, %conversation_id, "typing from outside the room dropped");
            return;
        }

        let payload = TypingPayload {
            conversation_id,
            user_id: ctx.user_id,
        };
        let event = if started {
            WsOutboundEvent::TypingStart(payload)
        } else {
            WsOutboundEvent::TypingStop(payload)
        };
        ctx.state
            .rooms
            .broadcast_except(room, ctx.connection_id, &event.to_text())
            .await;
    }
}
