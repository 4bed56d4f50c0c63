use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{Conversation, ConversationSummary};
use crate::store::{ChatStore, StoreError};

pub struct ConversationService;

impl ConversationService {
    /// Return the single conversation between `a` and `b`, creating it on
    /// first contact.
    ///
    /// Safe to call concurrently from both sides: a losing insert hits the
    /// unique pair index and falls back to one more lookup.
    pub async fn get_or_create(store: &dyn ChatStore, a: Uuid, b: Uuid) -> AppResult<Conversation> {
        if a == b {
            return Err(AppError::Validation(
                "cannot start a conversation with yourself".into(),
            ));
        }
        let (user1_id, user2_id) = Conversation::canonical_pair(a, b);

        if let Some(existing) = store.find_conversation_by_pair(user1_id, user2_id).await? {
            return Ok(existing);
        }

        match store.insert_conversation(user1_id, user2_id).await {
            Ok(created) => {
                tracing::info!(conversation_id = %created.id, %user1_id, %user2_id, "conversation created");
                Ok(created)
            }
            Err(StoreError::UniqueViolation) => {
                tracing::info!(%user1_id, %user2_id, "conversation insert conflict retried");
                store
                    .find_conversation_by_pair(user1_id, user2_id)
                    .await?
                    .ok_or_else(|| {
                        AppError::Database("conversation vanished after unique violation".into())
                    })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Get-or-create on behalf of `caller`, checking that `other` exists.
    pub async fn start_with(store: &dyn ChatStore, caller: Uuid, other: Uuid) -> AppResult<Conversation> {
        if caller != other && store.find_user(other).await?.is_none() {
            return Err(AppError::NotFound("user".into()));
        }
        Self::get_or_create(store, caller, other).await
    }

    /// Load a conversation, requiring `user_id` to be one of its participants.
    pub async fn load_for_participant(
        store: &dyn ChatStore,
        conversation_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<Conversation> {
        let conversation = store
            .find_conversation(conversation_id)
            .await?
            .ok_or_else(|| AppError::NotFound("conversation".into()))?;
        if !conversation.is_participant(user_id) {
            return Err(AppError::Unauthorized);
        }
        Ok(conversation)
    }

    pub async fn list_for_user(store: &dyn ChatStore, user_id: Uuid) -> AppResult<Vec<ConversationSummary>> {
        Ok(store.list_conversations(user_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::models::{Message, UserSummary};
    use crate::store::{MemoryStore, StoreResult};

    /// Loses every insert race: the first pair lookup misses and the insert
    /// reports a unique violation, as if another request created the row in
    /// between. Whatever `inner` holds is what the retry finds.
    struct LosingInsertStore {
        inner: MemoryStore,
        pair_lookups: AtomicUsize,
    }

    impl LosingInsertStore {
        fn new(inner: MemoryStore) -> Self {
            Self {
                inner,
                pair_lookups: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ChatStore for LosingInsertStore {
        async fn find_user(&self, user_id: Uuid) -> StoreResult<Option<UserSummary>> {
            self.inner.find_user(user_id).await
        }

        async fn find_conversation(&self, conversation_id: Uuid) -> StoreResult<Option<Conversation>> {
            self.inner.find_conversation(conversation_id).await
        }

        async fn find_conversation_by_pair(
            &self,
            user1_id: Uuid,
            user2_id: Uuid,
        ) -> StoreResult<Option<Conversation>> {
            if self.pair_lookups.fetch_add(1, Ordering::SeqCst) == 0 {
                return Ok(None);
            }
            self.inner.find_conversation_by_pair(user1_id, user2_id).await
        }

        async fn insert_conversation(&self, _: Uuid, _: Uuid) -> StoreResult<Conversation> {
            Err(StoreError::UniqueViolation)
        }

        async fn counterpart_ids(&self, user_id: Uuid) -> StoreResult<Vec<Uuid>> {
            self.inner.counterpart_ids(user_id).await
        }

        async fn list_conversations(&self, user_id: Uuid) -> StoreResult<Vec<ConversationSummary>> {
            self.inner.list_conversations(user_id).await
        }

        async fn insert_message(
            &self,
            conversation_id: Uuid,
            sender_id: Uuid,
            content: &str,
        ) -> StoreResult<Message> {
            self.inner.insert_message(conversation_id, sender_id, content).await
        }

        async fn list_messages(&self, conversation_id: Uuid) -> StoreResult<Vec<Message>> {
            self.inner.list_messages(conversation_id).await
        }

        async fn mark_read(
            &self,
            conversation_id: Uuid,
            reader_id: Uuid,
            message_ids: Option<&[Uuid]>,
        ) -> StoreResult<Vec<Uuid>> {
            self.inner.mark_read(conversation_id, reader_id, message_ids).await
        }
    }

    #[tokio::test]
    async fn test_get_or_create_is_order_independent() {
        let store = MemoryStore::new();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

        let first = ConversationService::get_or_create(&store, a, b).await.unwrap();
        let second = ConversationService::get_or_create(&store, b, a).await.unwrap();

        assert_eq!(first.id, second.id);
        assert!(first.user1_id < first.user2_id);
    }

    #[tokio::test]
    async fn test_self_conversation_is_rejected() {
        let store = MemoryStore::new();
        let a = Uuid::new_v4();
        assert!(matches!(
            ConversationService::get_or_create(&store, a, a).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_start_with_unknown_user() {
        let store = MemoryStore::new();
        let err = ConversationService::start_with(&store, Uuid::new_v4(), Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(ref what) if what == "user"));
    }

    #[tokio::test]
    async fn test_load_for_outsider() {
        let store = MemoryStore::new();
        let conv = ConversationService::get_or_create(&store, Uuid::new_v4(), Uuid::new_v4())
            .await
            .unwrap();

        assert!(matches!(
            ConversationService::load_for_participant(&store, conv.id, Uuid::new_v4()).await,
            Err(AppError::Unauthorized)
        ));
        assert!(matches!(
            ConversationService::load_for_participant(&store, Uuid::new_v4(), conv.user1_id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_lost_insert_race_returns_winning_row() {
        let inner = MemoryStore::new();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let (user1_id, user2_id) = Conversation::canonical_pair(a, b);
        let winner = inner.insert_conversation(user1_id, user2_id).await.unwrap();
        let store = LosingInsertStore::new(inner);

        let conv = ConversationService::get_or_create(&store, b, a).await.unwrap();

        assert_eq!(conv.id, winner.id);
        assert_eq!(store.pair_lookups.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_lost_insert_race_without_row_is_database_error() {
        let store = LosingInsertStore::new(MemoryStore::new());

        let result = ConversationService::get_or_create(&store, Uuid::new_v4(), Uuid::new_v4()).await;

        assert!(matches!(result, Err(AppError::Database(_))));
        assert_eq!(store.pair_lookups.load(Ordering::SeqCst), 2);
    }
}
