use async_trait::async_trait;
use deadpool_postgres::Pool;
use tokio_postgres::error::SqlState;
use tokio_postgres::Row;
use uuid::Uuid;

use super::{ChatStore, StoreError, StoreResult};
use crate::models::{Conversation, ConversationSummary, Message, UserSummary};

const MESSAGE_COLUMNS: &str = "id, conversation_id, sender_id, content, read, created_at";
const CONVERSATION_COLUMNS: &str = "id, user1_id, user2_id, created_at, updated_at";

impl From<tokio_postgres::Error> for StoreError {
    fn from(e: tokio_postgres::Error) -> Self {
        if e.code() == Some(&SqlState::UNIQUE_VIOLATION) {
            StoreError::UniqueViolation
        } else {
            StoreError::Backend(e.to_string())
        }
    }
}

impl From<deadpool_postgres::PoolError> for StoreError {
    fn from(e: deadpool_postgres::PoolError) -> Self {
        StoreError::Backend(format!("pool: {e}"))
    }
}

/// PostgreSQL-backed [`ChatStore`]
#[derive(Clone)]
pub struct PgStore {
    db: Pool,
}

impl PgStore {
    pub fn new(db: Pool) -> Self {
        Self { db }
    }
}

fn conversation_from_row(row: &Row) -> Conversation {
    Conversation {
        id: row.get("id"),
        user1_id: row.get("user1_id"),
        user2_id: row.get("user2_id"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn message_from_row(row: &Row) -> Message {
    Message {
        id: row.get("id"),
        conversation_id: row.get("conversation_id"),
        sender_id: row.get("sender_id"),
        content: row.get("content"),
        read: row.get("read"),
        created_at: row.get("created_at"),
    }
}

#[async_trait]
impl ChatStore for PgStore {
    async fn find_user(&self, user_id: Uuid) -> StoreResult<Option<UserSummary>> {
        let client = self.db.get().await?;
        let row = client
            .query_opt("SELECT id, name, email FROM users WHERE id = $1", &[&user_id])
            .await?;

        Ok(row.map(|r| UserSummary {
            id: r.get("id"),
            name: r.get("name"),
            email: r.get("email"),
        }))
    }

    async fn find_conversation(&self, conversation_id: Uuid) -> StoreResult<Option<Conversation>> {
        let client = self.db.get().await?;
        let row = client
            .query_opt(
                format!("SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE id = $1").as_str(),
                &[&conversation_id],
            )
            .await?;
        Ok(row.as_ref().map(conversation_from_row))
    }

    async fn find_conversation_by_pair(
        &self,
        user1_id: Uuid,
        user2_id: Uuid,
    ) -> StoreResult<Option<Conversation>> {
        let client = self.db.get().await?;
        let row = client
            .query_opt(
                format!(
                    "SELECT {CONVERSATION_COLUMNS} FROM conversations \
                     WHERE user1_id = $1 AND user2_id = $2"
                ).as_str(),
                &[&user1_id, &user2_id],
            )
            .await?;
        Ok(row.as_ref().map(conversation_from_row))
    }

    async fn insert_conversation(
        &self,
        user1_id: Uuid,
        user2_id: Uuid,
    ) -> StoreResult<Conversation> {
        let client = self.db.get().await?;
        let row = client
            .query_one(
                format!(
                    "INSERT INTO conversations (id, user1_id, user2_id) VALUES ($1, $2, $3) \
                     RETURNING {CONVERSATION_COLUMNS}"
                ).as_str(),
                &[&Uuid::new_v4(), &user1_id, &user2_id],
            )
            .await?;
        Ok(conversation_from_row(&row))
    }

    async fn counterpart_ids(&self, user_id: Uuid) -> StoreResult<Vec<Uuid>> {
        let client = self.db.get().await?;
        let rows = client
            .query(
                r#"
                SELECT CASE WHEN user1_id = $1 THEN user2_id ELSE user1_id END AS other_id
                FROM conversations
                WHERE user1_id = $1 OR user2_id = $1
                "#,
                &[&user_id],
            )
            .await?;
        Ok(rows.iter().map(|r| r.get("other_id")).collect())
    }

    async fn list_conversations(&self, user_id: Uuid) -> StoreResult<Vec<ConversationSummary>> {
        let client = self.db.get().await?;
        let rows = client
            .query(
                r#"
                SELECT
                    c.id,
                    c.updated_at,
                    u.id AS other_id,
                    u.name AS other_name,
                    u.email AS other_email,
                    lm.id AS last_id,
                    lm.sender_id AS last_sender_id,
                    lm.content AS last_content,
                    lm.read AS last_read,
                    lm.created_at AS last_created_at,
                    (
                        SELECT COUNT(*)
                        FROM messages m
                        WHERE m.conversation_id = c.id
                          AND m.sender_id <> $1
                          AND m.read = FALSE
                    ) AS unread_count
                FROM conversations c
                JOIN users u
                  ON u.id = CASE WHEN c.user1_id = $1 THEN c.user2_id ELSE c.user1_id END
                LEFT JOIN LATERAL (
                    SELECT id, sender_id, content, read, created_at
                    FROM messages m
                    WHERE m.conversation_id = c.id
                    ORDER BY m.created_at DESC, m.id DESC
                    LIMIT 1
                ) lm ON TRUE
                WHERE c.user1_id = $1 OR c.user2_id = $1
                ORDER BY c.updated_at DESC
                "#,
                &[&user_id],
            )
            .await?;

        let summaries = rows
            .iter()
            .map(|row| {
                let id: Uuid = row.get("id");
                let last_id: Option<Uuid> = row.get("last_id");
                let last_message = last_id.map(|last_id| Message {
                    id: last_id,
                    conversation_id: id,
                    sender_id: row.get("last_sender_id"),
                    content: row.get("last_content"),
                    read: row.get("last_read"),
                    created_at: row.get("last_created_at"),
                });
                ConversationSummary {
                    id,
                    other_user: UserSummary {
                        id: row.get("other_id"),
                        name: row.get("other_name"),
                        email: row.get("other_email"),
                    },
                    last_message,
                    unread_count: row.get("unread_count"),
                    updated_at: row.get("updated_at"),
                }
            })
            .collect();
        Ok(summaries)
    }

    async fn insert_message(
        &self,
        conversation_id: Uuid,
        sender_id: Uuid,
        content: &str,
    ) -> StoreResult<Message> {
        let client = self.db.get().await?;
        // One statement: the recency bump commits or rolls back with the insert.
        let row = client
            .query_one(
                format!(
                    r#"
                    WITH inserted AS (
                        INSERT INTO messages (id, conversation_id, sender_id, content)
                        VALUES ($1, $2, $3, $4)
                        RETURNING {MESSAGE_COLUMNS}
                    ), touched AS (
                        UPDATE conversations c
                        SET updated_at = GREATEST(c.updated_at, inserted.created_at)
                        FROM inserted
                        WHERE c.id = inserted.conversation_id
                    )
                    SELECT {MESSAGE_COLUMNS} FROM inserted
                    "#
                ).as_str(),
                &[&Uuid::new_v4(), &conversation_id, &sender_id, &content],
            )
            .await?;
        Ok(message_from_row(&row))
    }

    async fn list_messages(&self, conversation_id: Uuid) -> StoreResult<Vec<Message>> {
        let client = self.db.get().await?;
        let rows = client
            .query(
                format!(
                    "SELECT {MESSAGE_COLUMNS} FROM messages WHERE conversation_id = $1 \
                     ORDER BY created_at ASC, id ASC"
                ).as_str(),
                &[&conversation_id],
            )
            .await?;
        Ok(rows.iter().map(message_from_row).collect())
    }

    async fn mark_read(
        &self,
        conversation_id: Uuid,
        reader_id: Uuid,
        message_ids: Option<&[Uuid]>,
    ) -> StoreResult<Vec<Uuid>> {
        let client = self.db.get().await?;
        let rows = match message_ids {
            Some(ids) => {
                client
                    .query(
                        r#"
                        UPDATE messages SET read = TRUE
                        WHERE conversation_id = $1
                          AND sender_id <> $2
                          AND read = FALSE
                          AND id = ANY($3)
                        RETURNING id
                        "#,
                        &[&conversation_id, &reader_id, &ids],
                    )
                    .await?
            }
            None => {
                client
                    .query(
                        r#"
                        UPDATE messages SET read = TRUE
                        WHERE conversation_id = $1
                          AND sender_id <> $2
                          AND read = FALSE
                        RETURNING id
                        "#,
                        &[&conversation_id, &reader_id],
                    )
                    .await?
            }
        };
        Ok(rows.iter().map(|r| r.get("id")).collect())
    }
}
