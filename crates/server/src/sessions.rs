//! In-memory sessions for the Streamable HTTP transport.

use chrono::{DateTime, Utc};
use mcpdemo_core::Implementation;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub client: Option<Implementation>,
    pub protocol_version: String,
    pub created_at: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

/// Sessions keyed by id, expired after `idle_timeout` without traffic.
#[derive(Debug)]
pub struct SessionStore {
    sessions: Mutex<HashMap<String, Session>>,
    idle_timeout: Duration,
}

impl SessionStore {
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            idle_timeout,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Session>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_expired(&self, session: &Session, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(session.last_seen)
            .to_std()
            .is_ok_and(|idle| idle > self.idle_timeout)
    }

    pub fn create(&self, client: Option<Implementation>, protocol_version: impl Into<String>) -> Session {
        self.create_at(client, protocol_version, Utc::now())
    }

    fn create_at(
        &self,
        client: Option<Implementation>,
        protocol_version: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Session {
        let session = Session {
            id: uuid::Uuid::new_v4().simple().to_string(),
            client,
            protocol_version: protocol_version.into(),
            created_at: now,
            last_seen: now,
        };
        self.lock().insert(session.id.clone(), session.clone());
        session
    }

    /// Record activity. Returns `false` when the session is unknown or has
    /// expired; expired sessions are dropped on the spot.
    pub fn touch(&self, id: &str) -> bool {
        self.touch_at(id, Utc::now())
    }

    fn touch_at(&self, id: &str, now: DateTime<Utc>) -> bool {
        let mut sessions = self.lock();
        let expired = match sessions.get(id) {
            None => return false,
            Some(session) => self.is_expired(session, now),
        };

        if expired {
            sessions.remove(id);
            tracing::info!(session = %id, "Session expired");
            return false;
        }

        if let Some(session) = sessions.get_mut(id) {
            session.last_seen = now;
        }
        true
    }

    pub fn remove(&self, id: &str) -> Option<Session> {
        self.lock().remove(id)
    }

    /// Drop every expired session, returning how many went.
    pub fn sweep(&self) -> usize {
        self.sweep_at(Utc::now())
    }

    fn sweep_at(&self, now: DateTime<Utc>) -> usize {
        let mut sessions = self.lock();
        let before = sessions.len();
        sessions.retain(|_, session| !self.is_expired(session, now));
        before - sessions.len()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

/// Sweep expired sessions every `every` until the runtime shuts down.
pub fn spawn_sweeper(store: Arc<SessionStore>, every: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            let removed = store.sweep();
            if removed > 0 {
                tracing::info!(removed, remaining = store.len(), "Swept idle sessions");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    fn store() -> SessionStore {
        SessionStore::new(Duration::from_secs(60))
    }

    #[test]
    fn test_create_and_touch() {
        let store = store();
        let session = store.create(Some(Implementation::new("client", "1")), "2025-03-26");

        assert!(store.touch(&session.id));
        assert!(!store.touch("unknown"));
        assert_eq!(store.remove(&session.id).unwrap().protocol_version, "2025-03-26");
    }

    #[test]
    fn test_ids_are_unique() {
        let store = store();
        let a = store.create(None, "2025-03-26");
        let b = store.create(None, "2025-03-26");

        assert_ne!(a.id, b.id);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_idle_session_expires_on_touch() {
        let store = store();
        let start = Utc::now();
        let session = store.create_at(None, "2025-03-26", start);

        assert!(store.touch_at(&session.id, start + TimeDelta::seconds(59)));
        // Activity pushes expiry out
        assert!(store.touch_at(&session.id, start + TimeDelta::seconds(110)));
        assert!(!store.touch_at(&session.id, start + TimeDelta::seconds(200)));
        assert!(store.is_empty());
    }

    #[test]
    fn test_sweep_removes_only_expired() {
        let store = store();
        let start = Utc::now();
        let old = store.create_at(None, "2025-03-26", start);
        let fresh = store.create_at(None, "2025-03-26", start + TimeDelta::seconds(100));

        assert_eq!(store.sweep_at(start + TimeDelta::seconds(120)), 1);
        assert_eq!(store.len(), 1);
        assert!(store.remove(&old.id).is_none());
        assert!(store.remove(&fresh.id).is_some());
    }

    #[test]
    fn test_remove() {
        let store = store();
        let session = store.create(None, "2025-03-26");

        assert!(store.remove(&session.id).is_some());
        assert!(store.remove(&session.id).is_none());
        assert!(store.is_empty());
    }
}
