use std::fmt;

use uuid::Uuid;

pub mod handlers;
pub mod message_types;
pub mod presence;
pub mod rooms;

pub use presence::PresenceRegistry;
pub use rooms::{Room, RoomRegistry};

/// Unique identifier for one live WebSocket connection
///
/// A user may hold several connections at once (tabs, devices); every
/// registry keys on this id so each one is cleaned up precisely on close.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
