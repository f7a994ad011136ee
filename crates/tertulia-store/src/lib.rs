//! # tertulia-store
//!
//! Local backend for Tertulia, backed by SQLite.
//!
//! The crate exposes a synchronous [`Database`] handle with typed helpers for
//! accounts and a generic JSON row API over the application tables, plus
//! [`LocalBackend`], which wraps a database and a [`ChangeHub`] to implement
//! the identity, table and realtime provider traits.

pub mod accounts;
pub mod backend;
pub mod database;
pub mod migrations;
pub mod realtime;
pub mod rows;
pub mod tables;

mod error;

pub use backend::LocalBackend;
pub use database::Database;
pub use error::StoreError;
pub use realtime::ChangeHub;
