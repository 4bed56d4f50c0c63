use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard, RwLock};
use uuid::Uuid;

use super::ConnectionId;

#[derive(Default)]
struct Inner {
    by_user: HashMap<Uuid, HashSet<ConnectionId>>,
    by_connection: HashMap<ConnectionId, Uuid>,
}

/// Which users currently hold at least one live connection
///
/// Both directions are updated under one write lock, so a user key exists
/// exactly while its connection set is non-empty.
#[derive(Default, Clone)]
pub struct PresenceRegistry {
    inner: Arc<RwLock<Inner>>,
    announcements: Arc<Mutex<()>>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a live connection. Returns `true` if it is the user's first.
    pub async fn register(&self, user_id: Uuid, connection_id: ConnectionId) -> bool {
        let mut guard = self.inner.write().await;
        guard.by_connection.insert(connection_id, user_id);
        let connections = guard.by_user.entry(user_id).or_default();
        connections.insert(connection_id);
        let first = connections.len() == 1;

        tracing::debug!(
            user_id = %user_id,
            connection_id = %connection_id,
            connections = connections.len(),
            "presence registered"
        );
        first
    }

    /// Forget a connection.
    ///
    /// Returns the owning user and whether this was their last connection,
    /// or `None` if the connection was never registered.
    pub async fn unregister(&self, connection_id: ConnectionId) -> Option<(Uuid, bool)> {
        let mut guard = self.inner.write().await;
        let user_id = guard.by_connection.remove(&connection_id)?;

        let last = match guard.by_user.get_mut(&user_id) {
            Some(connections) => {
                connections.remove(&connection_id);
                connections.is_empty()
            }
            None => true,
        };
        if last {
            guard.by_user.remove(&user_id);
        }

        tracing::debug!(user_id = %user_id, connection_id = %connection_id, last, "presence unregistered");
        Some((user_id, last))
    }

    /// Held while re-checking presence and broadcasting `user:online` or
    /// `user:offline`, so counterparts receive announcements in the order
    /// the checks observed them.
    pub async fn announcement_guard(&self) -> MutexGuard<'_, ()> {
        self.announcements.lock().await
    }

    pub async fn is_online(&self, user_id: Uuid) -> bool {
        self.inner.read().await.by_user.contains_key(&user_id)
    }

    pub async fn connection_count(&self, user_id: Uuid) -> usize {
        self.inner
            .read()
            .await
            .by_user
            .get(&user_id)
            .map(|c| c.len())
            .unwrap_or(0)
    }

    /// Filter `user_ids` down to those that are online, preserving order.
    pub async fn online_users(&self, user_ids: &[Uuid]) -> Vec<Uuid> {
        let guard = self.inner.read().await;
        user_ids
            .iter()
            .copied()
            .filter(|id| guard.by_user.contains_key(id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_only_last_connection_reports_last() {
        let presence = PresenceRegistry::new();
        let user = Uuid::new_v4();
        let conns: Vec<ConnectionId> = (0..3).map(|_| ConnectionId::new()).collect();

        assert!(presence.register(user, conns[0]).await);
        assert!(!presence.register(user, conns[1]).await);
        assert!(!presence.register(user, conns[2]).await);
        assert_eq!(presence.connection_count(user).await, 3);

        assert_eq!(presence.unregister(conns[0]).await, Some((user, false)));
        assert_eq!(presence.unregister(conns[1]).await, Some((user, false)));
        assert!(presence.is_online(user).await);

        assert_eq!(presence.unregister(conns[2]).await, Some((user, true)));
        assert!(!presence.is_online(user).await);
        assert_eq!(presence.connection_count(user).await, 0);
    }

    #[tokio::test]
    async fn test_unregister_unknown_connection() {
        let presence = PresenceRegistry::new();
        assert_eq!(presence.unregister(ConnectionId::new()).await, None);
    }

    #[tokio::test]
    async fn test_online_users_filters() {
        let presence = PresenceRegistry::new();
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        presence.register(a, ConnectionId::new()).await;
        presence.register(c, ConnectionId::new()).await;

        assert_eq!(presence.online_users(&[a, b, c]).await, vec![a, c]);
    }
}
