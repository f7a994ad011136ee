//! Sign-up, sign-in, sign-out and profile edits.
//!
//! [`AuthService`] talks to the identity provider and the profile table, and
//! is the only writer of the shared [`Session`]. Subscribers observe:
//!
//! - one notification on register and on logout,
//! - two on login and on session restore: the bare identity first, then the
//!   identity merged with the stored profile (only the first when the
//!   profile was missing and had to be created),
//! - one on a successful profile edit (never before the edit is persisted).

use std::sync::{Arc, Mutex};

use tertulia_shared::constants::CODE_NOT_FOUND;
use tertulia_shared::models::{Account, NewUserProfile, ProfilePatch, UserProfile};
use tertulia_shared::{IdentityProvider, UserId};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::error::{AuthError, AuthResult};
use crate::profiles::ProfileStore;
use crate::session::{Session, SessionSubscription, UserState, UserStatePatch};

#[derive(Clone)]
pub struct AuthService {
    identity: Arc<dyn IdentityProvider>,
    profiles: ProfileStore,
    session: Session,
    /// Sign-out request still running in the background, if any.
    pending_sign_out: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl AuthService {
    pub fn new(identity: Arc<dyn IdentityProvider>, profiles: ProfileStore, session: Session) -> Self {
        Self {
            identity,
            profiles,
            session,
            pending_sign_out: Arc::new(Mutex::new(None)),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Observe the current user. The observer is called immediately.
    pub fn subscribe<F>(&self, observer: F) -> SessionSubscription
    where
        F: Fn(UserState) + Send + Sync + 'static,
    {
        self.session.subscribe(observer)
    }

    pub fn current_user(&self) -> UserState {
        self.session.snapshot()
    }

    // ------------------------------------------------------------------
    // Account lifecycle
    // ------------------------------------------------------------------

    /// Create an account, then its profile row, then publish the new user.
    ///
    /// If the account is created but the profile is not, the error is
    /// [`AuthError::ProfileCreation`] and the session is left unchanged.
    pub async fn register(&self, email: &str, password: &str) -> AuthResult<()> {
        self.settle_sign_out().await;

        let account = self.identity.sign_up(email, password).await.map_err(|e| {
            error!(error = %e, code = ?e.code, "failed to create account");
            e
        })?;

        info!(user_id = %account.id, "account registered");
        self.finish_registration(&account).await
    }

    /// Create the profile row for an existing account and publish the user.
    pub async fn finish_registration(&self, account: &Account) -> AuthResult<()> {
        self.profiles
            .create(&NewUserProfile::from(account))
            .await
            .map_err(|source| AuthError::ProfileCreation {
                account: account.clone(),
                source,
            })?;

        self.session.replace(UserState::from_account(account));
        Ok(())
    }

    pub async fn login(&self, email: &str, password: &str) -> AuthResult<()> {
        self.settle_sign_out().await;

        let account = self
            .identity
            .sign_in_with_password(email, password)
            .await
            .map_err(|e| {
                error!(error = %e, code = ?e.code, "failed to sign in");
                e
            })?;

        info!(user_id = %account.id, "signed in");
        self.session.replace(UserState::from_account(&account));
        self.load_profile(&account).await
    }

    /// Sign out locally right away; the provider is told in the background.
    pub async fn logout(&self) {
        let identity = self.identity.clone();
        let handle = tokio::spawn(async move {
            if let Err(e) = identity.sign_out().await {
                warn!(error = %e, "provider sign-out failed");
            }
        });
        *self.pending_sign_out.lock().unwrap_or_else(|e| e.into_inner()) = Some(handle);

        info!("signed out");
        self.session.replace(UserState::signed_out());
    }

    /// Pick up a session persisted by the provider, if there is one.
    ///
    /// Returns `Ok(false)` when there is no session; that is not an error.
    pub async fn restore_session(&self) -> AuthResult<bool> {
        let Some(account) = self.identity.current_session().await.map_err(|e| {
            error!(error = %e, "failed to read the persisted session");
            e
        })?
        else {
            info!("no persisted session");
            return Ok(false);
        };

        info!(user_id = %account.id, "session restored");
        self.session.replace(UserState::from_account(&account));
        self.load_profile(&account).await?;
        Ok(true)
    }

    // ------------------------------------------------------------------
    // Profile
    // ------------------------------------------------------------------

    /// Persist `patch` for the signed-in user, then merge it into the session.
    pub async fn update_profile(&self, patch: ProfilePatch) -> AuthResult<()> {
        let id = self.session.snapshot().id.ok_or(AuthError::NotAuthenticated)?;
        if patch.is_empty() {
            return Ok(());
        }

        self.profiles.update(&id, &patch).await?;

        if self.is_current_user(&id) {
            self.session.set_state(patch.into());
        }
        Ok(())
    }

    /// Any user's stored profile.
    pub async fn fetch_profile(&self, id: &UserId) -> AuthResult<UserProfile> {
        self.profiles.fetch_by_id(id).await
    }

    /// Merge the stored profile into the session.
    ///
    /// An account left without a profile by an interrupted registration
    /// gets an empty one here.
    async fn load_profile(&self, account: &Account) -> AuthResult<()> {
        let id = &account.id;
        let profile = match self.profiles.fetch_by_id(id).await {
            Ok(profile) => profile,
            Err(AuthError::Provider(e)) if e.has_code(CODE_NOT_FOUND) => {
                warn!(user_id = %id, "account has no profile, creating it");
                self.profiles
                    .create(&NewUserProfile::from(account))
                    .await
                    .map_err(|source| AuthError::ProfileCreation {
                        account: account.clone(),
                        source,
                    })?;
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        // Someone else may have signed in (or out) while the profile loaded.
        if !self.is_current_user(id) {
            debug!(user_id = %id, "session changed while loading profile, dropping it");
            return Ok(());
        }

        self.session.set_state(UserStatePatch::profile(&profile));
        Ok(())
    }

    fn is_current_user(&self, id: &UserId) -> bool {
        self.session.snapshot().id.as_ref() == Some(id)
    }

    /// Wait for a background sign-out so it cannot close a newer session.
    async fn settle_sign_out(&self) {
        let pending = self
            .pending_sign_out
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(handle) = pending {
            if let Err(e) = handle.await {
                warn!(error = %e, "sign-out task did not complete");
            }
        }
    }
}
