//! In-memory collaborators for tests.
//!
//! Enabled by the `test-util` feature so that downstream crates can drive
//! the real-time core without Postgres or Redis.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::{DashMap, DashSet};
use tokio::sync::{RwLock, mpsc};
use uuid::Uuid;

use parley_core::config::AppConfig;
use parley_core::config::directory::MemoryDirectoryConfig;
use parley_core::error::AppError;
use parley_core::result::AppResult;
use parley_core::traits::{BusStream, MessageBus, PresenceDirectory};
use parley_database::store::{MessageStore, StoreHealth, UserStore};
use parley_directory::memory::MemoryDirectory;
use parley_entity::message::{DirectMessage, NewDirectMessage};
use parley_entity::user::{PresenceStatus, User};

use crate::message::types::OutboundEvent;

/// Configuration for one test instance with short deadlines.
pub fn test_config(instance_id: &str) -> AppConfig {
    let mut config = AppConfig::default();
    config.realtime.instance_id = Some(instance_id.to_string());
    config.realtime.operation_timeout_ms = 500;
    config.auth.jwt_secret = "test-secret".to_string();
    config
}

/// Collects every event currently queued on a connection.
pub fn drain(rx: &mut mpsc::Receiver<OutboundEvent>) -> Vec<OutboundEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// In-memory user store with a symmetric friend graph.
#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    users: DashMap<Uuid, User>,
    friends: DashMap<Uuid, Vec<Uuid>>,
    fail_friend_lookups: AtomicBool,
    friend_lookups: AtomicUsize,
}

impl InMemoryUserStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a user named after its username.
    pub fn add_user(&self, username: &str) -> User {
        let now = Utc::now();
        let mut chars = username.chars();
        let name = match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        };
        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            name,
            email: format!("{username}@example.com"),
            avatar: Some(format!("https://cdn.example.com/{username}.png")),
            status: PresenceStatus::Offline,
            last_seen: None,
            created_at: now,
            updated_at: now,
        };
        self.users.insert(user.id, user.clone());
        user
    }

    /// Makes two users friends in both directions.
    pub fn befriend(&self, a: Uuid, b: Uuid) {
        self.friends.entry(a).or_default().push(b);
        self.friends.entry(b).or_default().push(a);
    }

    /// Removes a friendship in both directions.
    pub fn unfriend(&self, a: Uuid, b: Uuid) {
        if let Some(mut list) = self.friends.get_mut(&a) {
            list.retain(|id| *id != b);
        }
        if let Some(mut list) = self.friends.get_mut(&b) {
            list.retain(|id| *id != a);
        }
    }

    /// Makes every friend lookup fail.
    pub fn fail_friend_lookups(&self, fail: bool) {
        self.fail_friend_lookups.store(fail, Ordering::SeqCst);
    }

    /// Number of friend lookups served.
    pub fn friend_lookup_count(&self) -> usize {
        self.friend_lookups.load(Ordering::SeqCst)
    }

    /// Current durable status of a user.
    pub fn status_of(&self, id: Uuid) -> Option<PresenceStatus> {
        self.users.get(&id).map(|user| user.status)
    }

    /// Current last-seen time of a user.
    pub fn last_seen_of(&self, id: Uuid) -> Option<DateTime<Utc>> {
        self.users.get(&id).and_then(|user| user.last_seen)
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        Ok(self.users.get(&id).map(|user| user.clone()))
    }

    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>> {
        Ok(self
            .users
            .iter()
            .find(|entry| entry.username == username)
            .map(|entry| entry.value().clone()))
    }

    async fn find_many(&self, ids: &[Uuid]) -> AppResult<Vec<User>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.users.get(id).map(|user| user.clone()))
            .collect())
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: PresenceStatus,
        last_seen: DateTime<Utc>,
    ) -> AppResult<()> {
        let mut user = self
            .users
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("User {id} not found")))?;
        user.status = status;
        user.last_seen = Some(last_seen);
        user.updated_at = Utc::now();
        Ok(())
    }

    async fn touch_last_seen(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<()> {
        let mut user = self
            .users
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("User {id} not found")))?;
        user.last_seen = Some(at);
        Ok(())
    }

    async fn friend_ids(&self, id: Uuid) -> AppResult<Vec<Uuid>> {
        if self.fail_friend_lookups.load(Ordering::SeqCst) {
            return Err(AppError::database("friend lookup unavailable"));
        }
        self.friend_lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .friends
            .get(&id)
            .map(|list| list.clone())
            .unwrap_or_default())
    }
}

/// In-memory append-only message store.
#[derive(Debug, Default)]
pub struct InMemoryMessageStore {
    messages: RwLock<Vec<DirectMessage>>,
    fail_writes: AtomicBool,
}

impl InMemoryMessageStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every write fail.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Every stored message, in insertion order.
    pub async fn all(&self) -> Vec<DirectMessage> {
        self.messages.read().await.clone()
    }
}

#[async_trait]
impl MessageStore for InMemoryMessageStore {
    async fn create(&self, message: NewDirectMessage) -> AppResult<DirectMessage> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::database("message store unavailable"));
        }
        let stored = DirectMessage {
            id: Uuid::now_v7(),
            sender_id: message.sender_id,
            recipient_id: message.recipient_id,
            content: message.content,
            time_stamp: message.time_stamp,
            created_at: Utc::now(),
        };
        self.messages.write().await.push(stored.clone());
        Ok(stored)
    }

    async fn conversation(&self, a: Uuid, b: Uuid, limit: u32) -> AppResult<Vec<DirectMessage>> {
        let mut matching: Vec<DirectMessage> = self
            .messages
            .read()
            .await
            .iter()
            .filter(|m| {
                (m.sender_id == a && m.recipient_id == b) || (m.sender_id == b && m.recipient_id == a)
            })
            .cloned()
            .collect();
        matching.sort_by_key(|m| (m.time_stamp, m.id));
        let skip = matching.len().saturating_sub(limit as usize);
        Ok(matching.into_iter().skip(skip).collect())
    }

    async fn sender_ids_to(&self, user_id: Uuid) -> AppResult<Vec<Uuid>> {
        let mut senders = Vec::new();
        for message in self.messages.read().await.iter() {
            if message.recipient_id == user_id && !senders.contains(&message.sender_id) {
                senders.push(message.sender_id);
            }
        }
        Ok(senders)
    }
}

#[async_trait]
impl StoreHealth for InMemoryMessageStore {
    async fn health_check(&self) -> AppResult<bool> {
        Ok(!self.fail_writes.load(Ordering::SeqCst))
    }
}

/// Memory directory that fails on chosen keys and remembers the last
/// TTL applied to each key.
#[derive(Debug)]
pub struct FlakyDirectory {
    inner: MemoryDirectory,
    failing: DashSet<String>,
    ttls: DashMap<String, Duration>,
}

impl Default for FlakyDirectory {
    fn default() -> Self {
        Self {
            inner: MemoryDirectory::new(&MemoryDirectoryConfig::default()),
            failing: DashSet::new(),
            ttls: DashMap::new(),
        }
    }
}

impl FlakyDirectory {
    /// Creates a directory with no failing keys.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every call touching `key` fail.
    pub fn fail_key(&self, key: impl Into<String>) {
        self.failing.insert(key.into());
    }

    /// TTL of the most recent `set` or `expire` on `key`.
    pub fn last_ttl(&self, key: &str) -> Option<Duration> {
        self.ttls.get(key).map(|ttl| *ttl)
    }

    fn check(&self, key: &str) -> AppResult<()> {
        if self.failing.contains(key) {
            return Err(AppError::directory(format!("injected failure for {key}")));
        }
        Ok(())
    }
}

#[async_trait]
impl PresenceDirectory for FlakyDirectory {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        self.check(key)?;
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()> {
        self.check(key)?;
        self.ttls.insert(key.to_string(), ttl);
        self.inner.set(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.check(key)?;
        self.inner.delete(key).await
    }

    async fn expire(&self, key: &str, ttl: Duration) -> AppResult<bool> {
        self.check(key)?;
        self.ttls.insert(key.to_string(), ttl);
        self.inner.expire(key, ttl).await
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }
}

/// Memory bus whose subscriptions can be made to end at once or fail.
///
/// Stands in for a transport that drops its connection.
#[derive(Debug)]
pub struct FlappingBus {
    inner: crate::bridge::MemoryPubSub,
    ending: AtomicUsize,
    failing: AtomicUsize,
    live: AtomicUsize,
}

impl Default for FlappingBus {
    fn default() -> Self {
        Self {
            inner: crate::bridge::MemoryPubSub::new(256),
            ending: AtomicUsize::new(0),
            failing: AtomicUsize::new(0),
            live: AtomicUsize::new(0),
        }
    }
}

impl FlappingBus {
    /// Creates a bus that behaves normally until told otherwise.
    pub fn new() -> Self {
        Self::default()
    }

    /// The next `n` subscriptions yield a stream that ends immediately.
    pub fn end_next_subscriptions(&self, n: usize) {
        self.ending.store(n, Ordering::SeqCst);
    }

    /// The next `n` subscription attempts fail. Checked before ending ones.
    pub fn fail_next_subscriptions(&self, n: usize) {
        self.failing.store(n, Ordering::SeqCst);
    }

    /// Number of subscriptions that produced a working stream.
    pub fn live_subscriptions(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    fn take(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl MessageBus for FlappingBus {
    async fn publish(&self, topic: &str, payload: &str) -> AppResult<()> {
        self.inner.publish(topic, payload).await
    }

    async fn subscribe(&self, topic: &str) -> AppResult<BusStream> {
        if Self::take(&self.failing) {
            return Err(AppError::bus(format!("subscription to {topic} refused")));
        }
        if Self::take(&self.ending) {
            return Ok(Box::pin(futures::stream::empty::<String>()));
        }
        let stream = self.inner.subscribe(topic).await?;
        self.live.fetch_add(1, Ordering::SeqCst);
        Ok(stream)
    }
}

/// Shared handles for building engines in tests.
#[derive(Debug, Clone)]
pub struct TestBackends {
    /// User store.
    pub users: Arc<InMemoryUserStore>,
    /// Message store.
    pub messages: Arc<InMemoryMessageStore>,
    /// Presence directory.
    pub directory: Arc<FlakyDirectory>,
    /// Pub/sub bus.
    pub bus: Arc<crate::bridge::MemoryPubSub>,
}

impl Default for TestBackends {
    fn default() -> Self {
        Self {
            users: Arc::new(InMemoryUserStore::new()),
            messages: Arc::new(InMemoryMessageStore::new()),
            directory: Arc::new(FlakyDirectory::new()),
            bus: Arc::new(crate::bridge::MemoryPubSub::new(256)),
        }
    }
}

impl TestBackends {
    /// Fresh, empty backends.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an engine for `instance_id` on top of these backends.
    pub fn engine(&self, instance_id: &str) -> crate::server::RealtimeEngine {
        self.engine_with(&test_config(instance_id))
    }

    /// Builds an engine from `config` on top of these backends.
    pub fn engine_with(&self, config: &AppConfig) -> crate::server::RealtimeEngine {
        self.engine_on_bus(config, self.bus.clone())
    }

    /// Builds an engine from `config` that talks over `bus` instead of the
    /// shared memory bus.
    pub fn engine_on_bus(
        &self,
        config: &AppConfig,
        bus: Arc<dyn MessageBus>,
    ) -> crate::server::RealtimeEngine {
        crate::server::RealtimeEngine::new(
            config,
            crate::server::EngineDependencies {
                users: self.users.clone(),
                messages: self.messages.clone(),
                directory: self.directory.clone(),
                bus,
            },
        )
    }
}
