//! # tertulia-shared
//!
//! Types shared by the Tertulia client and backends: ids, table row models,
//! row filters, error types and the provider traits that form the boundary
//! to the backend.

pub mod constants;
pub mod error;
pub mod filter;
pub mod models;
pub mod provider;
pub mod types;

pub use error::{ChannelError, ProviderError};
pub use filter::{ChangeEvent, ChangeFilter, EqFilter, RowChange};
pub use provider::{ChangeStream, IdentityProvider, Providers, RealtimeTransport, TableClient};
pub use types::{ChatId, PairKey, UserId};
