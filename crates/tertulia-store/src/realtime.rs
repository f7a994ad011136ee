//! In-process change feed for the local backend.
//!
//! Every committed insert or update is published once on a broadcast
//! channel. Activating a realtime channel subscribes to that broadcast and
//! yields only the records its [`ChangeFilter`] accepts.

use std::collections::HashSet;
use std::sync::Mutex;

use futures::StreamExt;
use tertulia_shared::constants::RESERVED_CHANNEL_NAME;
use tertulia_shared::{ChangeFilter, ChangeStream, ChannelError, RowChange};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Buffered changes per subscriber before the slowest one starts lagging.
const CHANGE_BUFFER: usize = 1024;

pub struct ChangeHub {
    tx: broadcast::Sender<RowChange>,
    active: Mutex<HashSet<String>>,
}

impl ChangeHub {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANGE_BUFFER);
        Self {
            tx,
            active: Mutex::new(HashSet::new()),
        }
    }

    /// Publish a committed change to every active channel.
    pub fn publish(&self, change: RowChange) {
        // No receivers simply means no channel is active.
        let receivers = self.tx.send(change).unwrap_or(0);
        debug!(receivers, "published row change");
    }

    /// Claim `name` and return the stream of matching records.
    pub fn activate(&self, name: &str, filter: &ChangeFilter) -> Result<ChangeStream, ChannelError> {
        if name == RESERVED_CHANNEL_NAME {
            return Err(ChannelError::ReservedName(name.to_string()));
        }

        {
            let mut active = self.active.lock().unwrap_or_else(|e| e.into_inner());
            if !active.insert(name.to_string()) {
                return Err(ChannelError::AlreadySubscribed(name.to_string()));
            }
        }

        info!(channel = %name, table = %filter.table, "channel activated");

        let rx = self.tx.subscribe();
        let filter = filter.clone();
        let channel = name.to_string();

        let stream = futures::stream::unfold(rx, move |mut rx| {
            let filter = filter.clone();
            let channel = channel.clone();
            async move {
                loop {
                    match rx.recv().await {
                        Ok(change) if filter.matches(&change) => return Some((change.record, rx)),
                        Ok(_) => continue,
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!(channel = %channel, skipped, "channel lagged, changes dropped");
                        }
                        Err(broadcast::error::RecvError::Closed) => return None,
                    }
                }
            }
        });

        Ok(stream.boxed())
    }

    /// Release `name` so it can be activated again.
    pub fn deactivate(&self, name: &str) {
        let removed = self
            .active
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(name);
        if removed {
            info!(channel = %name, "channel deactivated");
        }
    }

    pub fn is_active(&self, name: &str) -> bool {
        self.active
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(name)
    }
}

impl Default for ChangeHub {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tertulia_shared::{ChangeEvent, EqFilter};

    fn insert(table: &str, record: serde_json::Value) -> RowChange {
        RowChange {
            table: table.into(),
            event: ChangeEvent::Insert,
            record,
        }
    }

    #[tokio::test]
    async fn test_filtered_delivery_in_order() {
        let hub = ChangeHub::new();
        let filter = ChangeFilter::inserts("private_chat_messages")
            .with_filter(EqFilter::new("chat_id", 1));
        let mut stream = hub.activate("private_chat:a_b", &filter).unwrap();

        hub.publish(insert("private_chat_messages", json!({ "chat_id": 2, "n": 0 })));
        hub.publish(insert("private_chat_messages", json!({ "chat_id": 1, "n": 1 })));
        hub.publish(insert("global_chat_messages", json!({ "chat_id": 1, "n": 9 })));
        hub.publish(insert("private_chat_messages", json!({ "chat_id": 1, "n": 2 })));

        assert_eq!(stream.next().await.unwrap()["n"], json!(1));
        assert_eq!(stream.next().await.unwrap()["n"], json!(2));
    }

    #[test]
    fn test_reserved_and_duplicate_names() {
        let hub = ChangeHub::new();
        let filter = ChangeFilter::inserts("global_chat_messages");

        assert!(matches!(
            hub.activate("realtime", &filter),
            Err(ChannelError::ReservedName(_))
        ));

        let _stream = hub.activate("global_chat_messages", &filter).unwrap();
        assert!(matches!(
            hub.activate("global_chat_messages", &filter),
            Err(ChannelError::AlreadySubscribed(_))
        ));

        hub.deactivate("global_chat_messages");
        assert!(!hub.is_active("global_chat_messages"));
        assert!(hub.activate("global_chat_messages", &filter).is_ok());
    }
}
