use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use uuid::Uuid;

use super::message_types::{WsInboundEvent, WsOutboundEvent};
use super::ConnectionId;
use crate::error::{AppError, AppResult};
use crate::services::{
    MessageService, PresenceService, ReadStateService, RoomService, TypingService,
};
use crate::state::AppState;

/// Everything a handler needs to act on behalf of one connection
#[derive(Clone)]
pub struct ConnectionContext {
    pub connection_id: ConnectionId,
    pub user_id: Uuid,
    /// Text frames written here reach this connection's socket
    pub outbound: UnboundedSender<String>,
    pub state: AppState,
}

impl ConnectionContext {
    pub fn new(
        connection_id: ConnectionId,
        user_id: Uuid,
        outbound: UnboundedSender<String>,
        state: AppState,
    ) -> Self {
        Self {
            connection_id,
            user_id,
            outbound,
            state,
        }
    }

    /// Send an event to this connection only
    pub fn send(&self, event: &WsOutboundEvent) {
        if self.outbound.send(event.to_text()).is_err() {
            tracing::debug!(connection_id = %self.connection_id, "outbound channel closed");
        }
    }
}

/// A decoded client frame, or the reason it could not be decoded
#[derive(Debug)]
pub enum ClientFrame {
    Event(WsInboundEvent),
    Invalid(AppError),
}

/// Per-connection event loop.
///
/// Runs connect, then every client frame in arrival order, then disconnect.
/// The loop ends when the socket actor drops its sender, so disconnect
/// always runs, whatever state the client left in.
pub async fn run_connection(ctx: ConnectionContext, mut inbound: UnboundedReceiver<ClientFrame>) {
    if let Err(e) = PresenceService::connect(&ctx).await {
        report(&ctx, "connect", &e);
    }

    while let Some(frame) = inbound.recv().await {
        match frame {
            ClientFrame::Event(event) => {
                let name = event.name();
                if let Err(e) = dispatch(&ctx, event).await {
                    report(&ctx, name, &e);
                }
            }
            ClientFrame::Invalid(e) => report(&ctx, "decode", &e),
        }
    }

    PresenceService::disconnect(&ctx).await;
}

pub async fn dispatch(ctx: &ConnectionContext, event: WsInboundEvent) -> AppResult<()> {
    match event {
        WsInboundEvent::JoinConversation(p) => RoomService::join(ctx, p.conversation_id).await,
        WsInboundEvent::LeaveConversation(p) => {
            RoomService::leave(ctx, p.conversation_id).await;
            Ok(())
        }
        WsInboundEvent::SendMessage(p) => {
            MessageService::send(&ctx.state, ctx.user_id, p.conversation_id, &p.content).await?;
            Ok(())
        }
        WsInboundEvent::TypingStart(p) => {
            TypingService::start(ctx, p.conversation_id).await;
            Ok(())
        }
        WsInboundEvent::TypingStop(p) => {
            TypingService::stop(ctx, p.conversation_id).await;
            Ok(())
        }
        WsInboundEvent::MarkRead(p) => {
            ReadStateService::mark_read(
                &ctx.state,
                ctx.user_id,
                p.conversation_id,
                p.message_ids.as_deref(),
            )
            .await?;
            Ok(())
        }
    }
}

// Errors go to the originating connection only.
fn report(ctx: &ConnectionContext, event: &str, err: &AppError) {
    if err.status() >= 500 {
        tracing::error!(user_id = %ctx.user_id, connection_id = %ctx.connection_id, event, error = %err, "event failed");
    } else {
        tracing::warn!(user_id = %ctx.user_id, connection_id = %ctx.connection_id, event, error = %err, "event rejected");
    }
    ctx.send(&WsOutboundEvent::error(err.client_message()));
}
