use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{ChatStore, StoreError, StoreResult};
use crate::models::{Conversation, ConversationSummary, Message, UserSummary};

#[derive(Default)]
struct Inner {
    users: HashMap<Uuid, UserSummary>,
    conversations: HashMap<Uuid, Conversation>,
    // (user1_id, user2_id) -> conversation id; the unique pair index
    pairs: HashMap<(Uuid, Uuid), Uuid>,
    // persistence order across all conversations
    messages: Vec<Message>,
    last_created_at: Option<DateTime<Utc>>,
}

/// Process-local [`ChatStore`].
///
/// Enforces the same constraints as the SQL schema. `fail_writes` makes
/// every mutating call return a backend error, which lets tests observe
/// what happens when persistence fails.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_user(&self, user: UserSummary) {
        self.inner.lock().await.users.insert(user.id, user);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self) -> StoreResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("store is read-only".into()));
        }
        Ok(())
    }
}

impl Inner {
    fn next_timestamp(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let ts = match self.last_created_at {
            Some(last) if last >= now => last + Duration::microseconds(1),
            _ => now,
        };
        self.last_created_at = Some(ts);
        ts
    }
}

#[async_trait]
impl ChatStore for MemoryStore {
    async fn find_user(&self, user_id: Uuid) -> StoreResult<Option<UserSummary>> {
        Ok(self.inner.lock().await.users.get(&user_id).cloned())
    }

    async fn find_conversation(&self, conversation_id: Uuid) -> StoreResult<Option<Conversation>> {
        Ok(self
            .inner
            .lock()
            .await
            .conversations
            .get(&conversation_id)
            .cloned())
    }

    async fn find_conversation_by_pair(
        &self,
        user1_id: Uuid,
        user2_id: Uuid,
    ) -> StoreResult<Option<Conversation>> {
        let guard = self.inner.lock().await;
        Ok(guard
            .pairs
            .get(&(user1_id, user2_id))
            .and_then(|id| guard.conversations.get(id))
            .cloned())
    }

    async fn insert_conversation(
        &self,
        user1_id: Uuid,
        user2_id: Uuid,
    ) -> StoreResult<Conversation> {
        self.check_writable()?;
        if user1_id >= user2_id {
            return Err(StoreError::Backend(
                "conversation participants must be distinct and canonically ordered".into(),
            ));
        }

        let mut guard = self.inner.lock().await;
        if guard.pairs.contains_key(&(user1_id, user2_id)) {
            return Err(StoreError::UniqueViolation);
        }

        let now = Utc::now();
        let conversation = Conversation {
            id: Uuid::new_v4(),
            user1_id,
            user2_id,
            created_at: now,
            updated_at: now,
        };
        guard.pairs.insert((user1_id, user2_id), conversation.id);
        guard
            .conversations
            .insert(conversation.id, conversation.clone());
        Ok(conversation)
    }

    async fn counterpart_ids(&self, user_id: Uuid) -> StoreResult<Vec<Uuid>> {
        let guard = self.inner.lock().await;
        Ok(guard
            .conversations
            .values()
            .filter_map(|c| c.counterpart_of(user_id))
            .collect())
    }

    async fn list_conversations(&self, user_id: Uuid) -> StoreResult<Vec<ConversationSummary>> {
        let guard = self.inner.lock().await;

        let mut summaries: Vec<ConversationSummary> = guard
            .conversations
            .values()
            .filter_map(|c| {
                let other_id = c.counterpart_of(user_id)?;
                let other_user = guard.users.get(&other_id)?.clone();
                let in_conversation = guard
                    .messages
                    .iter()
                    .filter(|m| m.conversation_id == c.id);
                let unread_count = in_conversation
                    .clone()
                    .filter(|m| !m.read && m.sender_id != user_id)
                    .count() as i64;
                Some(ConversationSummary {
                    id: c.id,
                    other_user,
                    last_message: in_conversation.last().cloned(),
                    unread_count,
                    updated_at: c.updated_at,
                })
            })
            .collect();

        summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(summaries)
    }

    async fn insert_message(
        &self,
        conversation_id: Uuid,
        sender_id: Uuid,
        content: &str,
    ) -> StoreResult<Message> {
        self.check_writable()?;
        let mut guard = self.inner.lock().await;
        if !guard.conversations.contains_key(&conversation_id) {
            return Err(StoreError::Backend(format!(
                "conversation {conversation_id} does not exist"
            )));
        }

        let created_at = guard.next_timestamp();
        let message = Message {
            id: Uuid::new_v4(),
            conversation_id,
            sender_id,
            content: content.to_string(),
            read: false,
            created_at,
        };
        guard.messages.push(message.clone());
        if let Some(conversation) = guard.conversations.get_mut(&conversation_id) {
            conversation.updated_at = created_at;
        }
        Ok(message)
    }

    async fn list_messages(&self, conversation_id: Uuid) -> StoreResult<Vec<Message>> {
        Ok(self
            .inner
            .lock()
            .await
            .messages
            .iter()
            .filter(|m| m.conversation_id == conversation_id)
            .cloned()
            .collect())
    }

    async fn mark_read(
        &self,
        conversation_id: Uuid,
        reader_id: Uuid,
        message_ids: Option<&[Uuid]>,
    ) -> StoreResult<Vec<Uuid>> {
        self.check_writable()?;
        let mut guard = self.inner.lock().await;
        let mut changed = Vec::new();
        for message in guard.messages.iter_mut().filter(|m| {
            m.conversation_id == conversation_id
                && m.sender_id != reader_id
                && !m.read
                && message_ids.map_or(true, |ids| ids.contains(&m.id))
        }) {
            message.read = true;
            changed.push(message.id);
        }
        Ok(changed)
    }
}
