//! Realtime feeds: open a named channel, forward matching rows, close it.
//!
//! A [`Channel`] is only a description (name + filter). Activating it with
//! [`Channel::subscribe`] consumes it and returns a [`FeedSubscription`],
//! and closing that consumes the subscription, so a handle can never be
//! activated twice or closed twice.

use std::fmt;
use std::sync::Arc;

use futures::StreamExt;
use serde::de::DeserializeOwned;
use tertulia_shared::constants::RESERVED_CHANNEL_NAME;
use tertulia_shared::{ChangeFilter, ChannelError, RealtimeTransport};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Validated channel name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChannelName(String);

impl ChannelName {
    pub fn new(name: impl Into<String>) -> Result<Self, ChannelError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ChannelError::InvalidName(name));
        }
        if name == RESERVED_CHANNEL_NAME {
            return Err(ChannelError::ReservedName(name));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A channel that has not been activated yet.
#[derive(Debug, Clone)]
pub struct Channel {
    name: ChannelName,
    filter: ChangeFilter,
}

impl Channel {
    pub fn new(name: ChannelName, filter: ChangeFilter) -> Self {
        Self { name, filter }
    }

    pub fn name(&self) -> &ChannelName {
        &self.name
    }

    /// Activate the channel and call `on_event` for every matching row,
    /// in the order the backend emits them.
    ///
    /// Rows that do not decode as `T` are logged and skipped. Activation
    /// failures are returned as-is; nothing is retried.
    pub async fn subscribe<T, F>(
        self,
        transport: Arc<dyn RealtimeTransport>,
        mut on_event: F,
    ) -> Result<FeedSubscription, ChannelError>
    where
        T: DeserializeOwned + Send + 'static,
        F: FnMut(T) + Send + 'static,
    {
        let mut stream = transport
            .activate(self.name.as_str(), &self.filter)
            .await
            .map_err(|e| {
                warn!(channel = %self.name, error = %e, "channel activation failed");
                e
            })?;

        info!(
            channel = %self.name,
            table = %self.filter.table,
            filter = ?self.filter.filter.as_ref().map(|f| f.to_filter_string()),
            "feed opened"
        );

        let channel = self.name.clone();
        let task = tokio::spawn(async move {
            while let Some(record) = stream.next().await {
                match serde_json::from_value::<T>(record) {
                    Ok(row) => on_event(row),
                    Err(e) => warn!(channel = %channel, error = %e, "dropping undecodable row"),
                }
            }
            debug!(channel = %channel, "feed stream ended");
        });

        Ok(FeedSubscription {
            name: self.name,
            transport,
            task: Some(task),
        })
    }
}

/// An active channel. Call [`unsubscribe`](Self::unsubscribe) to close it.
///
/// Dropping the subscription also stops delivery and releases the channel
/// name, but the release then happens in the background.
pub struct FeedSubscription {
    name: ChannelName,
    transport: Arc<dyn RealtimeTransport>,
    task: Option<JoinHandle<()>>,
}

impl FeedSubscription {
    pub fn name(&self) -> &ChannelName {
        &self.name
    }

    pub async fn unsubscribe(mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.transport.deactivate(self.name.as_str()).await;
        info!(channel = %self.name, "feed closed");
    }
}

impl fmt::Debug for FeedSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeedSubscription")
            .field("name", &self.name)
            .field("active", &self.task.is_some())
            .finish_non_exhaustive()
    }
}

impl Drop for FeedSubscription {
    fn drop(&mut self) {
        let Some(task) = self.task.take() else {
            return;
        };
        task.abort();

        let transport = self.transport.clone();
        let name = self.name.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    transport.deactivate(name.as_str()).await;
                    debug!(channel = %name, "dropped feed released");
                });
            }
            Err(_) => warn!(channel = %name, "feed dropped outside a runtime, name not released"),
        }
    }
}

/// Opens feeds against one realtime transport.
#[derive(Clone)]
pub struct RealtimeManager {
    transport: Arc<dyn RealtimeTransport>,
}

impl RealtimeManager {
    pub fn new(transport: Arc<dyn RealtimeTransport>) -> Self {
        Self { transport }
    }

    pub async fn open_feed<T, F>(
        &self,
        name: &str,
        filter: ChangeFilter,
        on_event: F,
    ) -> Result<FeedSubscription, ChannelError>
    where
        T: DeserializeOwned + Send + 'static,
        F: FnMut(T) + Send + 'static,
    {
        let channel = Channel::new(ChannelName::new(name)?, filter);
        channel.subscribe(self.transport.clone(), on_event).await
    }
}
