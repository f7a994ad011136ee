pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod global_chat;
pub mod private_chat;
pub mod profiles;
pub mod realtime;
pub mod session;

pub use auth::AuthService;
pub use client::Client;
pub use config::ClientConfig;
pub use error::{AuthError, AuthResult, ChatError, ChatResult};
pub use global_chat::GlobalChat;
pub use private_chat::PrivateChats;
pub use profiles::ProfileStore;
pub use realtime::{Channel, ChannelName, FeedSubscription, RealtimeManager};
pub use session::{Session, SessionSubscription, UserState, UserStatePatch};

use tracing_subscriber::{fmt, EnvFilter};

/// Install the global fmt subscriber. `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("tertulia_client=debug,tertulia_store=info,warn"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}
