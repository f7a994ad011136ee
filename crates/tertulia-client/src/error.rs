use tertulia_shared::models::Account;
use tertulia_shared::{ChannelError, ProviderError};
use thiserror::Error;

/// Errors from authentication and profile operations.
#[derive(Error, Debug)]
pub enum AuthError {
    /// The identity or profile call failed. Displays the human-readable message.
    #[error("{0}")]
    Provider(#[from] ProviderError),

    /// The account exists but its profile row could not be created.
    ///
    /// Nothing was rolled back. Retry the missing step with
    /// [`AuthService::finish_registration`](crate::auth::AuthService::finish_registration).
    #[error("Account created but its profile could not be saved: {source}")]
    ProfileCreation {
        account: Account,
        #[source]
        source: ProviderError,
    },

    #[error("No user is signed in")]
    NotAuthenticated,

    #[error("Unexpected row from the backend: {0}")]
    InvalidRow(#[from] serde_json::Error),
}

/// Errors from the global and private chat services.
#[derive(Error, Debug)]
pub enum ChatError {
    #[error("{0}")]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Channel(#[from] ChannelError),

    #[error("Unexpected row from the backend: {0}")]
    InvalidRow(#[from] serde_json::Error),

    #[error("No user is signed in")]
    NotAuthenticated,
}

pub type AuthResult<T> = Result<T, AuthError>;
pub type ChatResult<T> = Result<T, ChatError>;
