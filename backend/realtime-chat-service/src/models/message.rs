use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::UserSummary;

/// Upper bound on message length, in characters
pub const MAX_MESSAGE_LENGTH: usize = 5000;

/// Message row as persisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

/// Message as fanned out to clients, carrying the sender's identity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageView {
    #[serde(flatten)]
    pub message: Message,
    pub sender: UserSummary,
}

impl MessageView {
    pub fn new(message: Message, sender: UserSummary) -> Self {
        Self { message, sender }
    }
}

/// Trim and validate user supplied message text
pub fn normalize_content(raw: &str) -> Result<String, crate::error::AppError> {
    let content = raw.trim();
    if content.is_empty() {
        return Err(crate::error::AppError::Validation(
            "message content cannot be empty".into(),
        ));
    }
    if content.chars().count() > MAX_MESSAGE_LENGTH {
        return Err(crate::error::AppError::Validation(format!(
            "message content exceeds {MAX_MESSAGE_LENGTH} characters"
        )));
    }
    Ok(content.to_string())
}
