//! Boundary to the backend: identity, table storage and realtime.
//!
//! The client only ever talks to these three traits. `tertulia-store`
//! provides a local implementation; a hosted backend would provide another.

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde_json::Value;

use crate::error::{ChannelError, ProviderError};
use crate::filter::{ChangeFilter, EqFilter};
use crate::models::Account;

/// Stream of records pushed to an active channel, in emission order.
pub type ChangeStream = BoxStream<'static, Value>;

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Create an account and open a session for it.
    async fn sign_up(&self, email: &str, password: &str) -> Result<Account, ProviderError>;

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Account, ProviderError>;

    async fn sign_out(&self) -> Result<(), ProviderError>;

    /// The account of the persisted session, if there is one.
    async fn current_session(&self) -> Result<Option<Account>, ProviderError>;
}

#[async_trait]
pub trait TableClient: Send + Sync {
    /// Insert one row and return it as stored (with generated columns).
    async fn insert(&self, table: &str, row: Value) -> Result<Value, ProviderError>;

    /// All rows matching every filter, in storage order.
    async fn select(&self, table: &str, filters: &[EqFilter]) -> Result<Vec<Value>, ProviderError>;

    /// Apply `patch` to every row matching the filters.
    async fn update(
        &self,
        table: &str,
        filters: &[EqFilter],
        patch: Value,
    ) -> Result<(), ProviderError>;
}

#[async_trait]
pub trait RealtimeTransport: Send + Sync {
    /// Start delivering changes matching `filter` on the named channel.
    ///
    /// A name can be active at most once; activating it again before
    /// [`deactivate`](Self::deactivate) fails with
    /// [`ChannelError::AlreadySubscribed`].
    async fn activate(&self, name: &str, filter: &ChangeFilter)
        -> Result<ChangeStream, ChannelError>;

    async fn deactivate(&self, name: &str);
}

/// Handles to the three backend services.
#[derive(Clone)]
pub struct Providers {
    pub identity: Arc<dyn IdentityProvider>,
    pub tables: Arc<dyn TableClient>,
    pub realtime: Arc<dyn RealtimeTransport>,
}

impl Providers {
    /// Use one backend object for all three services.
    pub fn from_backend<B>(backend: Arc<B>) -> Self
    where
        B: IdentityProvider + TableClient + RealtimeTransport + 'static,
    {
        Self {
            identity: backend.clone(),
            tables: backend.clone(),
            realtime: backend,
        }
    }
}
