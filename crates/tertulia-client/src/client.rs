//! One handle over every client service.

use tertulia_shared::models::{GlobalChatMessage, NewGlobalChatMessage};
use tertulia_shared::Providers;
use tracing::info;

use crate::auth::AuthService;
use crate::error::{AuthResult, ChatError, ChatResult};
use crate::global_chat::GlobalChat;
use crate::private_chat::PrivateChats;
use crate::profiles::ProfileStore;
use crate::realtime::RealtimeManager;
use crate::session::Session;

/// Built once at startup; clones share the same session and caches.
#[derive(Clone)]
pub struct Client {
    pub session: Session,
    pub auth: AuthService,
    pub profiles: ProfileStore,
    pub realtime: RealtimeManager,
    pub global_chat: GlobalChat,
    pub private_chats: PrivateChats,
}

impl Client {
    pub fn new(providers: Providers) -> Self {
        let session = Session::new();
        let profiles = ProfileStore::new(providers.tables.clone());
        let realtime = RealtimeManager::new(providers.realtime.clone());

        Self {
            auth: AuthService::new(providers.identity, profiles.clone(), session.clone()),
            global_chat: GlobalChat::new(providers.tables.clone(), realtime.clone()),
            private_chats: PrivateChats::new(providers.tables, realtime.clone()),
            session,
            profiles,
            realtime,
        }
    }

    /// Restore a persisted session, if any. Returns whether one was found.
    pub async fn start(&self) -> AuthResult<bool> {
        let restored = self.auth.restore_session().await?;
        info!(restored, "client started");
        Ok(restored)
    }

    /// Post to the global room as the signed-in user.
    pub async fn send_global_message(&self, content: &str) -> ChatResult<GlobalChatMessage> {
        let user = self.session.snapshot();
        let (Some(id), Some(email)) = (user.id, user.email) else {
            return Err(ChatError::NotAuthenticated);
        };

        self.global_chat
            .send(&NewGlobalChatMessage {
                sender_id: Some(id),
                email,
                content: content.to_string(),
            })
            .await
    }
}
