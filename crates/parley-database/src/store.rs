//! Durable store contracts consumed by the real-time core.
//!
//! The Postgres repositories implement these; tests plug in in-memory
//! fakes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use parley_core::result::AppResult;
use parley_entity::message::{DirectMessage, NewDirectMessage};
use parley_entity::user::{PresenceStatus, User};

/// Read/update access to users and the friend graph.
#[async_trait]
pub trait UserStore: Send + Sync + std::fmt::Debug + 'static {
    /// Find a user by primary key.
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>>;

    /// Find a user by exact username.
    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>>;

    /// Find all users whose id is in `ids`.
    async fn find_many(&self, ids: &[Uuid]) -> AppResult<Vec<User>>;

    /// Set the durable presence status and last-seen time.
    async fn update_status(
        &self,
        id: Uuid,
        status: PresenceStatus,
        last_seen: DateTime<Utc>,
    ) -> AppResult<()>;

    /// Refresh last-seen only.
    async fn touch_last_seen(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<()>;

    /// Current friend ids of a user. Never cached.
    async fn friend_ids(&self, id: Uuid) -> AppResult<Vec<Uuid>>;
}

/// Append-only access to direct messages.
#[async_trait]
pub trait MessageStore: Send + Sync + std::fmt::Debug + 'static {
    /// Persist a new message and return the stored record.
    async fn create(&self, message: NewDirectMessage) -> AppResult<DirectMessage>;

    /// Messages exchanged between two users in either direction,
    /// oldest first, at most `limit` rows (the most recent ones).
    async fn conversation(&self, a: Uuid, b: Uuid, limit: u32) -> AppResult<Vec<DirectMessage>>;

    /// Distinct ids of users who have sent messages to `user_id`.
    async fn sender_ids_to(&self, user_id: Uuid) -> AppResult<Vec<Uuid>>;
}

/// Connectivity check of the durable store, reported by detailed health.
#[async_trait]
pub trait StoreHealth: Send + Sync + std::fmt::Debug + 'static {
    /// Whether the store currently answers queries.
    async fn health_check(&self) -> AppResult<bool>;
}
