//! The room every signed-in user shares.

use std::sync::Arc;

use tertulia_shared::constants::{GLOBAL_CHAT_CHANNEL, TABLE_GLOBAL_CHAT_MESSAGES};
use tertulia_shared::models::{GlobalChatMessage, NewGlobalChatMessage};
use tertulia_shared::{ChangeFilter, TableClient};
use tracing::{debug, error};

use crate::error::ChatResult;
use crate::realtime::{FeedSubscription, RealtimeManager};

#[derive(Clone)]
pub struct GlobalChat {
    tables: Arc<dyn TableClient>,
    realtime: RealtimeManager,
}

impl GlobalChat {
    pub fn new(tables: Arc<dyn TableClient>, realtime: RealtimeManager) -> Self {
        Self { tables, realtime }
    }

    pub async fn send(&self, message: &NewGlobalChatMessage) -> ChatResult<GlobalChatMessage> {
        let row = self
            .tables
            .insert(TABLE_GLOBAL_CHAT_MESSAGES, serde_json::to_value(message)?)
            .await
            .map_err(|e| {
                error!(error = %e, "failed to send global chat message");
                e
            })?;

        let stored: GlobalChatMessage = serde_json::from_value(row)?;
        debug!(message_id = stored.id, "global chat message sent");
        Ok(stored)
    }

    /// Every stored message, oldest first.
    pub async fn fetch_all(&self) -> ChatResult<Vec<GlobalChatMessage>> {
        let rows = self
            .tables
            .select(TABLE_GLOBAL_CHAT_MESSAGES, &[])
            .await
            .map_err(|e| {
                error!(error = %e, "failed to fetch global chat messages");
                e
            })?;

        rows.into_iter()
            .map(|row| serde_json::from_value(row).map_err(Into::into))
            .collect()
    }

    /// Call `on_message` for each message inserted from now on.
    pub async fn subscribe<F>(&self, on_message: F) -> ChatResult<FeedSubscription>
    where
        F: FnMut(GlobalChatMessage) + Send + 'static,
    {
        let feed = self
            .realtime
            .open_feed::<GlobalChatMessage, _>(
                GLOBAL_CHAT_CHANNEL,
                ChangeFilter::inserts(TABLE_GLOBAL_CHAT_MESSAGES),
                on_message,
            )
            .await?;
        Ok(feed)
    }
}
