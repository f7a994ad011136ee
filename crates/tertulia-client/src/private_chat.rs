//! One-to-one conversations.
//!
//! Each unordered pair of users maps to exactly one `private_chats` row,
//! stored with the lower id first. Resolved conversations are cached per
//! pair for the lifetime of this [`PrivateChats`] value and never evicted.
//! Concurrent first-time lookups of the same pair share a single
//! resolution, and a conversation created concurrently elsewhere is picked
//! up through the table's uniqueness constraint.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tertulia_shared::constants::{
    CODE_UNIQUE_VIOLATION, TABLE_PRIVATE_CHATS, TABLE_PRIVATE_CHAT_MESSAGES,
};
use tertulia_shared::models::{NewPrivateChat, NewPrivateChatMessage, PrivateChat, PrivateChatMessage};
use tertulia_shared::{ChangeFilter, EqFilter, PairKey, TableClient, UserId};
use tokio::sync::OnceCell;
use tracing::{debug, error, info};

use crate::error::{ChatError, ChatResult};
use crate::realtime::{FeedSubscription, RealtimeManager};

#[derive(Clone)]
pub struct PrivateChats {
    tables: Arc<dyn TableClient>,
    realtime: RealtimeManager,
    cache: Arc<Mutex<HashMap<PairKey, Arc<OnceCell<PrivateChat>>>>>,
}

impl PrivateChats {
    pub fn new(tables: Arc<dyn TableClient>, realtime: RealtimeManager) -> Self {
        Self {
            tables,
            realtime,
            cache: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// The conversation between `a` and `b`, created on first use.
    pub async fn resolve_thread(&self, a: &UserId, b: &UserId) -> ChatResult<PrivateChat> {
        let key = PairKey::new(a, b);
        let cell = self
            .cache
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(key.clone())
            .or_default()
            .clone();

        let chat = cell.get_or_try_init(|| self.fetch_or_create(&key)).await?;
        Ok(chat.clone())
    }

    pub async fn send_message(
        &self,
        sender: &UserId,
        receiver: &UserId,
        content: &str,
    ) -> ChatResult<PrivateChatMessage> {
        let chat = self.resolve_thread(sender, receiver).await?;

        let message = NewPrivateChatMessage {
            chat_id: chat.id,
            sender_id: sender.clone(),
            content: content.to_string(),
        };
        let row = self
            .tables
            .insert(TABLE_PRIVATE_CHAT_MESSAGES, serde_json::to_value(&message)?)
            .await
            .map_err(|e| {
                error!(chat_id = %chat.id, error = %e, "failed to send private message");
                e
            })?;

        Ok(serde_json::from_value(row)?)
    }

    /// Every message of the conversation, in storage order.
    pub async fn fetch_messages(
        &self,
        sender: &UserId,
        receiver: &UserId,
    ) -> ChatResult<Vec<PrivateChatMessage>> {
        let chat = self.resolve_thread(sender, receiver).await?;

        let rows = self
            .tables
            .select(TABLE_PRIVATE_CHAT_MESSAGES, &[EqFilter::new("chat_id", chat.id.0)])
            .await
            .map_err(|e| {
                error!(chat_id = %chat.id, error = %e, "failed to fetch private messages");
                e
            })?;

        rows.into_iter()
            .map(|row| serde_json::from_value(row).map_err(Into::into))
            .collect()
    }

    /// Call `on_message` for each message added to the conversation from now on.
    pub async fn subscribe_to_messages<F>(
        &self,
        sender: &UserId,
        receiver: &UserId,
        on_message: F,
    ) -> ChatResult<FeedSubscription>
    where
        F: FnMut(PrivateChatMessage) + Send + 'static,
    {
        let chat = self.resolve_thread(sender, receiver).await?;
        let channel = PairKey::new(sender, receiver).to_channel_name();
        let filter = ChangeFilter::inserts(TABLE_PRIVATE_CHAT_MESSAGES)
            .with_filter(EqFilter::new("chat_id", chat.id.0));

        Ok(self
            .realtime
            .open_feed::<PrivateChatMessage, _>(&channel, filter, on_message)
            .await?)
    }

    /// Number of conversations resolved so far.
    pub fn cached_count(&self) -> usize {
        self.cache
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .filter(|cell| cell.initialized())
            .count()
    }

    async fn fetch_or_create(&self, key: &PairKey) -> ChatResult<PrivateChat> {
        if let Some(chat) = self.fetch(key).await? {
            debug!(pair = %key, chat_id = %chat.id, "private chat found");
            return Ok(chat);
        }

        match self.create(key).await {
            Ok(chat) => {
                info!(pair = %key, chat_id = %chat.id, "private chat created");
                Ok(chat)
            }
            // Created concurrently by someone else.
            Err(ChatError::Provider(e)) if e.has_code(CODE_UNIQUE_VIOLATION) => {
                debug!(pair = %key, "private chat created concurrently, fetching it");
                self.fetch(key).await?.ok_or(ChatError::Provider(e))
            }
            Err(e) => Err(e),
        }
    }

    async fn fetch(&self, key: &PairKey) -> ChatResult<Option<PrivateChat>> {
        let (user_id1, user_id2) = key.ids();
        let rows = self
            .tables
            .select(
                TABLE_PRIVATE_CHATS,
                &[
                    EqFilter::new("user_id1", user_id1.as_str()),
                    EqFilter::new("user_id2", user_id2.as_str()),
                ],
            )
            .await
            .map_err(|e| {
                error!(pair = %key, error = %e, "failed to fetch private chat");
                e
            })?;

        match rows.into_iter().next() {
            Some(row) => Ok(Some(serde_json::from_value(row)?)),
            None => Ok(None),
        }
    }

    async fn create(&self, key: &PairKey) -> ChatResult<PrivateChat> {
        let (user_id1, user_id2) = key.ids();
        let new_chat = NewPrivateChat {
            user_id1: user_id1.clone(),
            user_id2: user_id2.clone(),
        };

        let row = self
            .tables
            .insert(TABLE_PRIVATE_CHATS, serde_json::to_value(&new_chat)?)
            .await?;
        Ok(serde_json::from_value(row)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::Value;
    use tertulia_shared::ProviderError;
    use tertulia_store::{Database, LocalBackend};

    /// Table client that counts inserts and answers selects slowly, so
    /// concurrent resolutions overlap.
    struct SlowTables {
        inner: LocalBackend,
        chat_inserts: AtomicUsize,
    }

    #[async_trait]
    impl TableClient for SlowTables {
        async fn insert(&self, table: &str, row: Value) -> Result<Value, ProviderError> {
            if table == TABLE_PRIVATE_CHATS {
                self.chat_inserts.fetch_add(1, Ordering::SeqCst);
            }
            self.inner.insert(table, row).await
        }

        async fn select(&self, table: &str, filters: &[EqFilter]) -> Result<Vec<Value>, ProviderError> {
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.inner.select(table, filters).await
        }

        async fn update(&self, table: &str, filters: &[EqFilter], patch: Value) -> Result<(), ProviderError> {
            self.inner.update(table, filters, patch).await
        }
    }

    fn setup() -> (Arc<LocalBackend>, Arc<SlowTables>) {
        let backend = Arc::new(LocalBackend::new(Database::open_in_memory().unwrap()));
        let tables = Arc::new(SlowTables {
            inner: LocalBackend::new(Database::open_in_memory().unwrap()),
            chat_inserts: AtomicUsize::new(0),
        });
        (backend, tables)
    }

    fn chats(tables: Arc<SlowTables>, realtime: Arc<LocalBackend>) -> PrivateChats {
        PrivateChats::new(tables, RealtimeManager::new(realtime))
    }

    #[tokio::test]
    async fn test_pair_order_does_not_matter() {
        let (realtime, tables) = setup();
        let chats = chats(tables.clone(), realtime);
        let (u1, u2) = (UserId::from("u1"), UserId::from("u2"));

        let first = chats.resolve_thread(&u1, &u2).await.unwrap();
        let second = chats.resolve_thread(&u2, &u1).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!((first.user_id1, first.user_id2), (u1, u2));
        assert_eq!(tables.chat_inserts.load(Ordering::SeqCst), 1);
        assert_eq!(chats.cached_count(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_resolution_shares_one_lookup() {
        let (realtime, tables) = setup();
        let chats = chats(tables.clone(), realtime);
        let (u1, u2) = (UserId::from("u1"), UserId::from("u2"));

        let (a, b) = tokio::join!(chats.resolve_thread(&u1, &u2), chats.resolve_thread(&u2, &u1));

        assert_eq!(a.unwrap().id, b.unwrap().id);
        assert_eq!(tables.chat_inserts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_concurrent_creation_elsewhere_is_picked_up() {
        let (realtime, tables) = setup();
        // Two independent caches over the same storage, like two devices.
        let left = chats(tables.clone(), realtime.clone());
        let right = chats(tables.clone(), realtime);
        let (u1, u2) = (UserId::from("u1"), UserId::from("u2"));

        let (a, b) = tokio::join!(left.resolve_thread(&u1, &u2), right.resolve_thread(&u2, &u1));
        assert_eq!(a.unwrap().id, b.unwrap().id);

        let rows = tables
            .inner
            .select(TABLE_PRIVATE_CHATS, &[])
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn test_messages_stay_in_their_conversation() {
        let (realtime, tables) = setup();
        let chats = chats(tables, realtime);
        let (u1, u2, u3) = (UserId::from("u1"), UserId::from("u2"), UserId::from("u3"));

        chats.send_message(&u1, &u2, "hola").await.unwrap();
        chats.send_message(&u2, &u1, "qué tal").await.unwrap();
        chats.send_message(&u1, &u3, "otro chat").await.unwrap();

        let messages = chats.fetch_messages(&u2, &u1).await.unwrap();
        let contents: Vec<_> = messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["hola", "qué tal"]);
        assert_eq!(messages[1].sender_id, u2);
        assert_eq!(chats.cached_count(), 2);
    }
}
