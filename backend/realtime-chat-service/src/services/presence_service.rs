use uuid::Uuid;

use crate::error::AppResult;
use crate::state::AppState;
use crate::websocket::handlers::ConnectionContext;
use crate::websocket::message_types::{PresenceSnapshot, UserRef, WsOutboundEvent};
use crate::websocket::Room;

pub struct PresenceService;

impl PresenceService {
    /// Bring a freshly authenticated connection online.
    ///
    /// Counterparts hear `user:online` only for the user's first connection.
    /// The new connection always receives a snapshot of which counterparts
    /// are currently online.
    pub async fn connect(ctx: &ConnectionContext) -> AppResult<()> {
        let state = &ctx.state;
        let first = state.presence.register(ctx.user_id, ctx.connection_id).await;
        state
            .rooms
            .join(
                Room::User(ctx.user_id),
                ctx.connection_id,
                ctx.user_id,
                ctx.outbound.clone(),
            )
            .await;
        tracing::info!(user_id = %ctx.user_id, connection_id = %ctx.connection_id, first, "connection online");

        let counterparts = state.store.counterpart_ids(ctx.user_id).await?;
        if first {
            let _guard = state.presence.announcement_guard().await;
            if state.presence.is_online(ctx.user_id).await {
                let online = WsOutboundEvent::UserOnline(UserRef {
                    user_id: ctx.user_id,
                });
                Self::announce(state, &counterparts, &online).await;
            }
        }

        let snapshot = WsOutboundEvent::PresenceSnapshot(PresenceSnapshot {
            user_ids: state.presence.online_users(&counterparts).await,
        });
        ctx.send(&snapshot);
        Ok(())
    }

    /// Tear a connection down. Always completes; store failures only cost the
    /// `user:offline` announcement, as does the user reconnecting meanwhile.
    pub async fn disconnect(ctx: &ConnectionContext) {
        let state = &ctx.state;
        state.rooms.leave_all(ctx.connection_id).await;

        let Some((user_id, last)) = state.presence.unregister(ctx.connection_id).await else {
            return;
        };
        tracing::info!(%user_id, connection_id = %ctx.connection_id, last, "connection closed");
        if !last {
            return;
        }

        match state.store.counterpart_ids(user_id).await {
            Ok(counterparts) => {
                // A new connection may have come up while the store was queried.
                let _guard = state.presence.announcement_guard().await;
                if state.presence.is_online(user_id).await {
                    tracing::debug!(%user_id, "user reconnected, offline announcement dropped");
                    return;
                }
                let offline = WsOutboundEvent::UserOffline(UserRef { user_id });
                Self::announce(state, &counterparts, &offline).await;
            }
            Err(e) => {
                tracing::error!(%user_id, error = %e, "failed to load counterparts for offline announcement");
            }
        }
    }

    async fn announce(state: &AppState, counterparts: &[Uuid], event: &WsOutboundEvent) {
        let text = event.to_text();
        for counterpart in counterparts {
            state.rooms.broadcast(Room::User(*counterpart), &text).await;
        }
    }
}
