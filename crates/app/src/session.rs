//! Session store: the auth token and current user, persisted across runs.

use std::sync::{Arc, RwLock};

use aimg_client::CredentialSink;
use aimg_core::session::{CurrentUser, Session};
use aimg_events::{ConsoleEvent, EventBus, ToastLevel, View};
use aimg_store::{keys, load_json, save_json, LocalStore, StoreError};

pub struct SessionStore {
    store: Arc<dyn LocalStore>,
    bus: Arc<EventBus>,
    current: RwLock<Option<Session>>,
}

impl SessionStore {
    pub fn new(store: Arc<dyn LocalStore>, bus: Arc<EventBus>) -> Self {
        Self {
            store,
            bus,
            current: RwLock::new(None),
        }
    }

    pub fn current(&self) -> Option<Session> {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn is_logged_in(&self) -> bool {
        self.current().is_some()
    }

    fn replace(&self, session: Option<Session>) {
        *self.current.write().unwrap_or_else(|e| e.into_inner()) = session;
    }

    /// Load the persisted session.
    ///
    /// Returns `None` when the token or the user is missing or unreadable;
    /// the caller then shows the login view.
    pub fn restore(&self) -> Option<Session> {
        let session = self.read_persisted();
        self.replace(session.clone());
        let view = if session.is_some() { View::App } else { View::Login };
        self.bus.publish(ConsoleEvent::ViewChanged { view });
        if let Some(s) = &session {
            tracing::info!(username = %s.username, "Restored session");
        }
        session
    }

    fn read_persisted(&self) -> Option<Session> {
        let token = match load_json::<String>(self.store.as_ref(), keys::AUTH_TOKEN) {
            Ok(Some(token)) if !token.trim().is_empty() => token,
            Ok(_) => return None,
            Err(e) => {
                tracing::warn!(error = %e, "Could not read persisted token");
                return None;
            }
        };
        match load_json::<CurrentUser>(self.store.as_ref(), keys::CURRENT_USER) {
            Ok(Some(user)) => Some(Session {
                token,
                username: user.username,
            }),
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(error = %e, "Could not read persisted user");
                None
            }
        }
    }

    /// Persist a freshly issued session and switch to the app view.
    ///
    /// Nothing is kept in memory when persisting fails.
    pub fn establish(&self, session: Session) -> Result<(), StoreError> {
        save_json(self.store.as_ref(), keys::AUTH_TOKEN, &session.token)?;
        let user = CurrentUser {
            username: session.username.clone(),
        };
        if let Err(e) = save_json(self.store.as_ref(), keys::CURRENT_USER, &user) {
            let _ = self.store.remove(keys::AUTH_TOKEN);
            return Err(e);
        }
        tracing::info!(username = %session.username, "Session established");
        self.replace(Some(session));
        self.bus.publish(ConsoleEvent::ViewChanged { view: View::App });
        Ok(())
    }

    /// Clear the in-memory and persisted session. Never fails.
    pub fn logout(&self) {
        self.replace(None);
        for key in [keys::AUTH_TOKEN, keys::CURRENT_USER] {
            if let Err(e) = self.store.remove(key) {
                tracing::warn!(key, error = %e, "Could not clear persisted session");
            }
        }
        self.bus.publish(ConsoleEvent::ViewChanged { view: View::Login });
    }

    /// Clear the session after the backend rejected it and ask the user to
    /// log in again.
    pub fn expire(&self) {
        tracing::warn!("Session expired");
        self.logout();
        self.bus
            .toast(ToastLevel::Warning, "Session expired, please log in again");
    }
}

impl CredentialSink for SessionStore {
    fn token(&self) -> Option<String> {
        self.current().map(|s| s.token)
    }

    fn invalidate(&self) {
        self.expire();
    }
}

#[cfg(test)]
mod tests {
    use aimg_store::MemoryStore;

    use super::*;

    fn session_store() -> (SessionStore, Arc<MemoryStore>, Arc<EventBus>) {
        let store = Arc::new(MemoryStore::new());
        let bus = Arc::new(EventBus::default());
        (SessionStore::new(store.clone(), bus.clone()), store, bus)
    }

    fn alice() -> Session {
        Session {
            token: "tok".into(),
            username: "alice".into(),
        }
    }

    #[test]
    fn established_session_is_restored_by_a_new_store() {
        let (sessions, store, bus) = session_store();
        sessions.establish(alice()).unwrap();

        let again = SessionStore::new(store, bus);
        assert_eq!(again.restore(), Some(alice()));
        assert_eq!(again.token().as_deref(), Some("tok"));
    }

    #[test]
    fn restore_requires_token_and_user() {
        let (sessions, store, _) = session_store();
        store.set(keys::AUTH_TOKEN, r#""tok""#).unwrap();
        assert_eq!(sessions.restore(), None);

        store.set(keys::CURRENT_USER, "{not json").unwrap();
        assert_eq!(sessions.restore(), None);

        store.set(keys::CURRENT_USER, r#"{"username":"bob"}"#).unwrap();
        assert_eq!(sessions.restore().map(|s| s.username).as_deref(), Some("bob"));
    }

    #[test]
    fn persisted_token_is_a_json_string() {
        let (sessions, store, bus) = session_store();
        sessions.establish(alice()).unwrap();
        assert_eq!(store.get(keys::AUTH_TOKEN).unwrap().as_deref(), Some(r#""tok""#));

        store.set(keys::AUTH_TOKEN, "tok").unwrap();
        store.set(keys::CURRENT_USER, r#"{"username":"alice"}"#).unwrap();
        assert_eq!(SessionStore::new(store, bus).restore(), None);
    }

    #[test]
    fn logout_clears_everything() {
        let (sessions, store, _) = session_store();
        sessions.establish(alice()).unwrap();
        sessions.logout();

        assert!(!sessions.is_logged_in());
        assert_eq!(store.get(keys::AUTH_TOKEN).unwrap(), None);
        assert_eq!(store.get(keys::CURRENT_USER).unwrap(), None);
        assert_eq!(sessions.restore(), None);
    }

    #[tokio::test]
    async fn invalidate_publishes_login_view_and_warning() {
        let (sessions, _, bus) = session_store();
        sessions.establish(alice()).unwrap();
        let mut rx = bus.subscribe();

        sessions.invalidate();

        assert_eq!(
            rx.recv().await.unwrap(),
            ConsoleEvent::ViewChanged { view: View::Login }
        );
        match rx.recv().await.unwrap() {
            ConsoleEvent::Toast(toast) => {
                assert_eq!(toast.level, ToastLevel::Warning);
                assert!(toast.message.contains("log in again"));
            }
            other => panic!("unexpected event: {other:?}"),
        }
        assert!(sessions.token().is_none());
    }
}
