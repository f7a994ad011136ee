//! [`LocalBackend`]: the identity, table and realtime services on top of a
//! single local [`Database`].

use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;
use tertulia_shared::constants::DEFAULT_MIN_PASSWORD_LEN;
use tertulia_shared::models::Account;
use tertulia_shared::{
    ChangeEvent, ChangeFilter, ChangeStream, ChannelError, EqFilter, IdentityProvider,
    ProviderError, RealtimeTransport, RowChange, TableClient,
};
use tracing::debug;

use crate::database::Database;
use crate::error::Result;
use crate::realtime::ChangeHub;

pub struct LocalBackend {
    db: Mutex<Database>,
    hub: ChangeHub,
    min_password_len: usize,
}

impl LocalBackend {
    pub fn new(db: Database) -> Self {
        Self {
            db: Mutex::new(db),
            hub: ChangeHub::new(),
            min_password_len: DEFAULT_MIN_PASSWORD_LEN,
        }
    }

    /// Backend over the default on-disk database.
    pub fn open_default() -> Result<Self> {
        Ok(Self::new(Database::new()?))
    }

    pub fn with_min_password_len(mut self, min_password_len: usize) -> Self {
        self.min_password_len = min_password_len;
        self
    }

    pub fn hub(&self) -> &ChangeHub {
        &self.hub
    }

    /// Run `f` against the database, converting failures to provider errors.
    fn with_db<T>(&self, f: impl FnOnce(&Database) -> Result<T>) -> std::result::Result<T, ProviderError> {
        let db = self.db.lock().unwrap_or_else(|e| e.into_inner());
        f(&db).map_err(ProviderError::from)
    }
}

#[async_trait]
impl IdentityProvider for LocalBackend {
    async fn sign_up(&self, email: &str, password: &str) -> std::result::Result<Account, ProviderError> {
        self.with_db(|db| {
            let account = db.create_account(email, password, self.min_password_len)?;
            db.set_session(&account.id)?;
            Ok(account)
        })
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> std::result::Result<Account, ProviderError> {
        self.with_db(|db| {
            let account = db.verify_credentials(email, password)?;
            db.set_session(&account.id)?;
            Ok(account)
        })
    }

    async fn sign_out(&self) -> std::result::Result<(), ProviderError> {
        self.with_db(|db| db.clear_session())
    }

    async fn current_session(&self) -> std::result::Result<Option<Account>, ProviderError> {
        self.with_db(|db| db.session_account())
    }
}

#[async_trait]
impl TableClient for LocalBackend {
    async fn insert(&self, table: &str, row: Value) -> std::result::Result<Value, ProviderError> {
        let inserted = self.with_db(|db| db.insert_row(table, &row))?;
        debug!(table, "row inserted");

        self.hub.publish(RowChange {
            table: table.to_string(),
            event: ChangeEvent::Insert,
            record: inserted.clone(),
        });
        Ok(inserted)
    }

    async fn select(
        &self,
        table: &str,
        filters: &[EqFilter],
    ) -> std::result::Result<Vec<Value>, ProviderError> {
        self.with_db(|db| db.select_rows(table, filters))
    }

    async fn update(
        &self,
        table: &str,
        filters: &[EqFilter],
        patch: Value,
    ) -> std::result::Result<(), ProviderError> {
        let updated = self.with_db(|db| db.update_rows(table, filters, &patch))?;
        debug!(table, rows = updated.len(), "rows updated");

        for record in updated {
            self.hub.publish(RowChange {
                table: table.to_string(),
                event: ChangeEvent::Update,
                record,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl RealtimeTransport for LocalBackend {
    async fn activate(
        &self,
        name: &str,
        filter: &ChangeFilter,
    ) -> std::result::Result<ChangeStream, ChannelError> {
        self.hub.activate(name, filter)
    }

    async fn deactivate(&self, name: &str) {
        self.hub.deactivate(name);
    }
}
