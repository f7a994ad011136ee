//! The current-user broadcaster.
//!
//! [`Session`] owns the single canonical [`UserState`] and an ordered list of
//! observers. Every change is pushed synchronously to each observer, in
//! registration order, as an independent clone of the new state. A new
//! observer is called once with the current state as soon as it subscribes.
//!
//! `Session` is a cheap handle (`Arc` inside): construct it once at startup
//! and clone it into whatever needs to read or change the current user.

use std::sync::{Arc, Mutex, MutexGuard, Weak};

use serde::Serialize;
use tertulia_shared::models::{Account, ProfilePatch, UserProfile};
use tertulia_shared::UserId;
use tracing::debug;

/// Identity and profile of the authenticated user, or all `None`.
///
/// `id` is `None` exactly when nobody is signed in, and then every other
/// field is `None` as well.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UserState {
    pub id: Option<UserId>,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub career: Option<String>,
}

impl UserState {
    /// The fully-absent state.
    pub fn signed_out() -> Self {
        Self::default()
    }

    /// Bare identity, no profile fields yet.
    pub fn from_account(account: &Account) -> Self {
        Self {
            id: Some(account.id.clone()),
            email: Some(account.email.clone()),
            ..Self::default()
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.id.is_some()
    }

    /// Shallow merge: fields not named by `patch` are left untouched.
    pub fn apply(&mut self, patch: UserStatePatch) {
        fn merge<T>(field: &mut Option<T>, value: Option<Option<T>>) {
            if let Some(value) = value {
                *field = value;
            }
        }

        merge(&mut self.id, patch.id);
        merge(&mut self.email, patch.email);
        merge(&mut self.display_name, patch.display_name);
        merge(&mut self.bio, patch.bio);
        merge(&mut self.career, patch.career);

        if self.id.is_none() {
            *self = Self::signed_out();
        }
    }
}

/// Partial update of a [`UserState`].
///
/// `None` leaves a field alone; `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserStatePatch {
    pub id: Option<Option<UserId>>,
    pub email: Option<Option<String>>,
    pub display_name: Option<Option<String>>,
    pub bio: Option<Option<String>>,
    pub career: Option<Option<String>>,
}

impl UserStatePatch {
    /// The profile fields of a stored profile.
    pub fn profile(profile: &UserProfile) -> Self {
        Self {
            display_name: Some(profile.display_name.clone()),
            bio: Some(profile.bio.clone()),
            career: Some(profile.career.clone()),
            ..Self::default()
        }
    }
}

impl From<ProfilePatch> for UserStatePatch {
    fn from(patch: ProfilePatch) -> Self {
        Self {
            display_name: patch.display_name,
            bio: patch.bio,
            career: patch.career,
            ..Self::default()
        }
    }
}

type Observer = Arc<dyn Fn(UserState) + Send + Sync>;

struct Inner {
    user: UserState,
    observers: Vec<(u64, Observer)>,
    next_id: u64,
}

#[derive(Clone)]
pub struct Session {
    inner: Arc<Mutex<Inner>>,
}

impl Session {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                user: UserState::signed_out(),
                observers: Vec::new(),
                next_id: 0,
            })),
        }
    }

    /// Register `observer` and call it right away with the current state.
    ///
    /// Observers run on the caller's thread, outside the session lock, so
    /// they may read or change the session themselves. A slow observer
    /// delays every observer registered after it.
    pub fn subscribe<F>(&self, observer: F) -> SessionSubscription
    where
        F: Fn(UserState) + Send + Sync + 'static,
    {
        let observer: Observer = Arc::new(observer);

        let (id, snapshot) = {
            let mut inner = self.lock();
            let id = inner.next_id;
            inner.next_id += 1;
            inner.observers.push((id, observer.clone()));
            (id, inner.user.clone())
        };

        debug!(observer = id, "session observer subscribed");
        observer(snapshot);

        SessionSubscription {
            id,
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Merge `patch` into the current state and notify every observer.
    pub fn set_state(&self, patch: UserStatePatch) {
        self.update(|user| user.apply(patch));
    }

    /// Replace the whole state and notify every observer.
    pub fn replace(&self, state: UserState) {
        self.update(|user| {
            *user = state;
            // Keep the signed-out invariant even for hand-built states.
            user.apply(UserStatePatch::default());
        });
    }

    /// A copy of the current state.
    pub fn snapshot(&self) -> UserState {
        self.lock().user.clone()
    }

    pub fn observer_count(&self) -> usize {
        self.lock().observers.len()
    }

    fn update(&self, change: impl FnOnce(&mut UserState)) {
        let (snapshot, observers) = {
            let mut inner = self.lock();
            change(&mut inner.user);
            let observers: Vec<Observer> =
                inner.observers.iter().map(|(_, o)| o.clone()).collect();
            (inner.user.clone(), observers)
        };

        debug!(
            observers = observers.len(),
            authenticated = snapshot.is_authenticated(),
            "broadcasting session state"
        );

        for observer in observers {
            observer(snapshot.clone());
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Returned by [`Session::subscribe`]; removes the observer when consumed.
#[must_use = "dropping the handle keeps the observer registered forever"]
pub struct SessionSubscription {
    id: u64,
    inner: Weak<Mutex<Inner>>,
}

impl SessionSubscription {
    pub fn unsubscribe(self) {
        if let Some(inner) = self.inner.upgrade() {
            let mut inner = inner.lock().unwrap_or_else(|e| e.into_inner());
            inner.observers.retain(|(id, _)| *id != self.id);
            debug!(observer = self.id, "session observer removed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder() -> (Arc<Mutex<Vec<UserState>>>, impl Fn(UserState) + Send + Sync + 'static) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        (seen, move |state| sink.lock().unwrap().push(state))
    }

    fn signed_in() -> UserState {
        UserState {
            id: Some(UserId::from("1")),
            email: Some("a".into()),
            display_name: None,
            bio: Some("b".into()),
            career: None,
        }
    }

    #[test]
    fn test_late_subscriber_gets_current_snapshot() {
        let session = Session::new();
        session.replace(signed_in());
        session.set_state(UserStatePatch {
            career: Some(Some("dev".into())),
            ..Default::default()
        });

        let (seen, observer) = recorder();
        let _sub = session.subscribe(observer);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0], session.snapshot());
        assert_eq!(seen[0].career.as_deref(), Some("dev"));
    }

    #[test]
    fn test_merge_changes_only_named_fields() {
        let session = Session::new();
        session.replace(signed_in());

        session.set_state(UserStatePatch {
            display_name: Some(Some("X".into())),
            ..Default::default()
        });

        assert_eq!(
            session.snapshot(),
            UserState {
                display_name: Some("X".into()),
                ..signed_in()
            }
        );
    }

    #[test]
    fn test_observer_copy_is_isolated() {
        let session = Session::new();
        session.replace(signed_in());

        let _first = session.subscribe(|mut state| {
            state.display_name = Some("tampered".into());
            state.id = None;
        });
        let (seen, observer) = recorder();
        let _second = session.subscribe(observer);

        session.set_state(UserStatePatch {
            bio: Some(None),
            ..Default::default()
        });

        let expected = UserState {
            bio: None,
            ..signed_in()
        };
        assert_eq!(session.snapshot(), expected);
        assert_eq!(seen.lock().unwrap().last(), Some(&expected));
    }

    #[test]
    fn test_notification_order_follows_registration() {
        let session = Session::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        let subs: Vec<_> = ["O1", "O2", "O3"]
            .into_iter()
            .map(|name| {
                let order = order.clone();
                session.subscribe(move |_| order.lock().unwrap().push(name))
            })
            .collect();

        order.lock().unwrap().clear();
        session.replace(signed_in());
        session.replace(UserState::signed_out());

        assert_eq!(
            *order.lock().unwrap(),
            vec!["O1", "O2", "O3", "O1", "O2", "O3"]
        );
        assert_eq!(subs.len(), 3);
    }

    #[test]
    fn test_unsubscribe_stops_notifications() {
        let session = Session::new();
        let (seen, observer) = recorder();
        let sub = session.subscribe(observer);
        assert_eq!(session.observer_count(), 1);

        sub.unsubscribe();
        session.replace(signed_in());

        assert_eq!(session.observer_count(), 0);
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_clearing_id_clears_everything() {
        let session = Session::new();
        session.replace(signed_in());

        session.set_state(UserStatePatch {
            id: Some(None),
            ..Default::default()
        });
        assert_eq!(session.snapshot(), UserState::signed_out());

        // Profile fields cannot appear without an identity.
        session.set_state(UserStatePatch {
            display_name: Some(Some("ghost".into())),
            ..Default::default()
        });
        assert_eq!(session.snapshot(), UserState::signed_out());
    }

    #[test]
    fn test_observer_may_reenter_session() {
        let session = Session::new();
        let inner = session.clone();
        let (seen, observer) = recorder();

        let _sub = session.subscribe(move |state| {
            observer(inner.snapshot());
            assert_eq!(state, inner.snapshot());
        });
        session.replace(signed_in());

        assert_eq!(seen.lock().unwrap().len(), 2);
    }
}
