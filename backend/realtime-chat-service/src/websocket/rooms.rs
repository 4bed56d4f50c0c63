use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use tokio::sync::{mpsc::UnboundedSender, RwLock};
use uuid::Uuid;

use super::ConnectionId;

/// Broadcast group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Room {
    /// Every connection currently viewing one conversation
    Conversation(Uuid),
    /// Every connection of one user
    User(Uuid),
}

impl fmt::Display for Room {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Room::Conversation(id) => write!(f, "conversation:{id}"),
            Room::User(id) => write!(f, "user:{id}"),
        }
    }
}

struct Subscriber {
    connection_id: ConnectionId,
    user_id: Uuid,
    sender: UnboundedSender<String>,
}

#[derive(Default)]
struct Inner {
    rooms: HashMap<Room, Vec<Subscriber>>,
    // connection -> rooms it joined, for cleanup on disconnect
    memberships: HashMap<ConnectionId, HashSet<Room>>,
}

impl Inner {
    fn remove(&mut self, room: Room, connection_id: ConnectionId) -> bool {
        let mut removed = false;
        if let Some(subscribers) = self.rooms.get_mut(&room) {
            let before = subscribers.len();
            subscribers.retain(|s| s.connection_id != connection_id);
            removed = subscribers.len() != before;
            if subscribers.is_empty() {
                self.rooms.remove(&room);
            }
        }
        if let Some(joined) = self.memberships.get_mut(&connection_id) {
            joined.remove(&room);
            if joined.is_empty() {
                self.memberships.remove(&connection_id);
            }
        }
        removed
    }

    fn send(&mut self, room: Room, msg: &str, except: Option<ConnectionId>) -> usize {
        let Some(subscribers) = self.rooms.get_mut(&room) else {
            return 0;
        };

        let mut delivered = 0;
        let mut dead = Vec::new();
        for subscriber in subscribers.iter() {
            if Some(subscriber.connection_id) == except {
                continue;
            }
            if subscriber.sender.send(msg.to_string()).is_ok() {
                delivered += 1;
            } else {
                dead.push(subscriber.connection_id);
            }
        }

        if !dead.is_empty() {
            tracing::debug!(room = %room, dead = dead.len(), "pruning closed subscribers");
            for connection_id in dead {
                self.remove(room, connection_id);
            }
        }
        delivered
    }
}

/// Connection registry for broadcast rooms
///
/// Tracks which connections are subscribed to which rooms and fans text
/// frames out to them. Subscribers whose channel has closed are dropped on
/// the next broadcast.
#[derive(Default, Clone)]
pub struct RoomRegistry {
    inner: Arc<RwLock<Inner>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe a connection to a room. Joining twice is a no-op.
    pub async fn join(
        &self,
        room: Room,
        connection_id: ConnectionId,
        user_id: Uuid,
        sender: UnboundedSender<String>,
    ) {
        let mut guard = self.inner.write().await;
        let subscribers = guard.rooms.entry(room).or_default();
        if subscribers.iter().any(|s| s.connection_id == connection_id) {
            return;
        }
        subscribers.push(Subscriber {
            connection_id,
            user_id,
            sender,
        });
        let total = subscribers.len();
        guard
            .memberships
            .entry(connection_id)
            .or_default()
            .insert(room);

        tracing::debug!(room = %room, connection_id = %connection_id, total, "joined room");
    }

    pub async fn leave(&self, room: Room, connection_id: ConnectionId) {
        if self.inner.write().await.remove(room, connection_id) {
            tracing::debug!(room = %room, connection_id = %connection_id, "left room");
        }
    }

    /// Drop a connection from every room it joined.
    pub async fn leave_all(&self, connection_id: ConnectionId) {
        let mut guard = self.inner.write().await;
        let joined: Vec<Room> = guard
            .memberships
            .get(&connection_id)
            .map(|rooms| rooms.iter().copied().collect())
            .unwrap_or_default();
        for room in joined {
            guard.remove(room, connection_id);
        }
    }

    /// Send to every subscriber of `room`. Returns how many received it.
    pub async fn broadcast(&self, room: Room, msg: &str) -> usize {
        self.inner.write().await.send(room, msg, None)
    }

    /// Send to every subscriber of `room` except `except`.
    pub async fn broadcast_except(&self, room: Room, except: ConnectionId, msg: &str) -> usize {
        self.inner.write().await.send(room, msg, Some(except))
    }

    pub async fn is_subscribed(&self, room: Room, connection_id: ConnectionId) -> bool {
        self.inner
            .read()
            .await
            .rooms
            .get(&room)
            .map(|subs| subs.iter().any(|s| s.connection_id == connection_id))
            .unwrap_or(false)
    }

    /// Whether any connection of `user_id` is subscribed to `room`.
    pub async fn user_in_room(&self, room: Room, user_id: Uuid) -> bool {
        self.inner
            .read()
            .await
            .rooms
            .get(&room)
            .map(|subs| subs.iter().any(|s| s.user_id == user_id))
            .unwrap_or(false)
    }

    pub async fn subscriber_count(&self, room: Room) -> usize {
        self.inner
            .read()
            .await
            .rooms
            .get(&room)
            .map(|v| v.len())
            .unwrap_or(0)
    }
}
