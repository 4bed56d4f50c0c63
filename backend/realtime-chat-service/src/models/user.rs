use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Public identity of a user as shown next to their messages.
///
/// Owned by the auth subsystem; this service only reads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}
