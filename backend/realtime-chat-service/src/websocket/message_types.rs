//! Wire events. Frames are adjacently tagged: `{"event": "<name>", "data": {...}}`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::MessageView;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationRef {
    pub conversation_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessagePayload {
    pub conversation_id: Uuid,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkReadPayload {
    pub conversation_id: Uuid,
    #[serde(default)]
    pub message_ids: Option<Vec<Uuid>>,
}

/// Inbound WebSocket events from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum WsInboundEvent {
    #[serde(rename = "conversation:join")]
    JoinConversation(ConversationRef),
    #[serde(rename = "conversation:leave")]
    LeaveConversation(ConversationRef),
    #[serde(rename = "message:send")]
    SendMessage(SendMessagePayload),
    #[serde(rename = "typing:start")]
    TypingStart(ConversationRef),
    #[serde(rename = "typing:stop")]
    TypingStop(ConversationRef),
    #[serde(rename = "messages:read")]
    MarkRead(MarkReadPayload),
}

impl WsInboundEvent {
    pub fn name(&self) -> &'static str {
        match self {
            WsInboundEvent::JoinConversation(_) => "conversation:join",
            WsInboundEvent::LeaveConversation(_) => "conversation:leave",
            WsInboundEvent::SendMessage(_) => "message:send",
            WsInboundEvent::TypingStart(_) => "typing:start",
            WsInboundEvent::TypingStop(_) => "typing:stop",
            WsInboundEvent::MarkRead(_) => "messages:read",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationNotice {
    pub conversation_id: Uuid,
    pub message: MessageView,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingPayload {
    pub conversation_id: Uuid,
    pub user_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadReceipt {
    pub conversation_id: Uuid,
    pub user_id: Uuid,
    pub message_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRef {
    pub user_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceSnapshot {
    pub user_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub message: String,
}

/// Outbound WebSocket events from server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum WsOutboundEvent {
    #[serde(rename = "message:new")]
    MessageNew(MessageView),
    /// Sent to the recipient's personal room when they are online but not
    /// viewing the conversation
    #[serde(rename = "conversation:new-message")]
    ConversationNewMessage(ConversationNotice),
    #[serde(rename = "typing:start")]
    TypingStart(TypingPayload),
    #[serde(rename = "typing:stop")]
    TypingStop(TypingPayload),
    #[serde(rename = "messages:read")]
    MessagesRead(ReadReceipt),
    #[serde(rename = "user:online")]
    UserOnline(UserRef),
    #[serde(rename = "user:offline")]
    UserOffline(UserRef),
    #[serde(rename = "presence:snapshot")]
    PresenceSnapshot(PresenceSnapshot),
    #[serde(rename = "error")]
    Error(ErrorPayload),
}

impl WsOutboundEvent {
    pub fn error(message: impl Into<String>) -> Self {
        WsOutboundEvent::Error(ErrorPayload {
            message: message.into(),
        })
    }

    /// Serialize to a text frame
    pub fn to_text(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            tracing::error!(error = %e, "failed to serialize outbound event");
            r#"{"event":"error","data":{"message":"internal server error"}}"#.to_string()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_inbound_send_parses() {
        let conversation_id = Uuid::new_v4();
        let raw = json!({
            "event": "message:send",
            "data": { "conversationId": conversation_id, "content": "hello" }
        })
        .to_string();

        match serde_json::from_str::<WsInboundEvent>(&raw).unwrap() {
            WsInboundEvent::SendMessage(p) => {
                assert_eq!(p.conversation_id, conversation_id);
                assert_eq!(p.content, "hello");
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn test_mark_read_ids_are_optional() {
        let raw = json!({
            "event": "messages:read",
            "data": { "conversationId": Uuid::new_v4() }
        })
        .to_string();
        let evt: WsInboundEvent = serde_json::from_str(&raw).unwrap();
        assert!(matches!(evt, WsInboundEvent::MarkRead(MarkReadPayload { message_ids: None, .. })));
    }

    #[test]
    fn test_unknown_event_is_rejected() {
        let raw = r#"{"event":"message:delete","data":{}}"#;
        assert!(serde_json::from_str::<WsInboundEvent>(raw).is_err());
    }

    #[test]
    fn test_outbound_wire_shape() {
        let user_id = Uuid::new_v4();
        let value: serde_json::Value =
            serde_json::from_str(&WsOutboundEvent::UserOnline(UserRef { user_id }).to_text())
                .unwrap();
        assert_eq!(value["event"], "user:online");
        assert_eq!(value["data"]["userId"], user_id.to_string());

        let value: serde_json::Value =
            serde_json::from_str(&WsOutboundEvent::error("nope").to_text()).unwrap();
        assert_eq!(value, json!({"event": "error", "data": {"message": "nope"}}));
    }
}
