//! Direct message repository implementation.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use parley_core::error::{AppError, ErrorKind};
use parley_core::result::AppResult;
use parley_entity::message::{DirectMessage, NewDirectMessage};

use crate::store::MessageStore;

/// Repository for persisted direct messages.
#[derive(Debug, Clone)]
pub struct MessageRepository {
    pool: PgPool,
}

impl MessageRepository {
    /// Create a new message repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageStore for MessageRepository {
    async fn create(&self, message: NewDirectMessage) -> AppResult<DirectMessage> {
        sqlx::query_as::<_, DirectMessage>(
            r#"
            INSERT INTO direct_messages (id, sender_id, recipient_id, content, time_stamp)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(message.sender_id)
        .bind(message.recipient_id)
        .bind(&message.content)
        .bind(message.time_stamp)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to create message", e))
    }

    async fn conversation(&self, a: Uuid, b: Uuid, limit: u32) -> AppResult<Vec<DirectMessage>> {
        sqlx::query_as::<_, DirectMessage>(
            r#"
            SELECT * FROM (
                SELECT * FROM direct_messages
                WHERE (sender_id = $1 AND recipient_id = $2)
                   OR (sender_id = $2 AND recipient_id = $1)
                ORDER BY time_stamp DESC, id DESC
                LIMIT $3
            ) recent
            ORDER BY time_stamp ASC, id ASC
            "#,
        )
        .bind(a)
        .bind(b)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to load conversation", e))
    }

    async fn sender_ids_to(&self, user_id: Uuid) -> AppResult<Vec<Uuid>> {
        sqlx::query_scalar::<_, Uuid>(
            "SELECT DISTINCT sender_id FROM direct_messages WHERE recipient_id = $1",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to load senders", e))
    }
}
