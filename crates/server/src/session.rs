//! Session management
//!
//! One agent per session, kept in memory. Sessions idle past the configured
//! timeout are swept on access; concurrent sessions are independent of one
//! another.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;

use meeting_agent_agent::MeetingAgent;

/// One active conversation session
pub struct Session {
    pub id: String,
    pub agent: Arc<MeetingAgent>,
    pub created_at: Instant,
    last_activity: RwLock<Instant>,
}

impl Session {
    pub fn new(id: impl Into<String>, agent: Arc<MeetingAgent>) -> Self {
        Self {
            id: id.into(),
            agent,
            created_at: Instant::now(),
            last_activity: RwLock::new(Instant::now()),
        }
    }

    pub fn touch(&self) {
        *self.last_activity.write() = Instant::now();
    }

    pub fn idle_for(&self) -> Duration {
        self.last_activity.read().elapsed()
    }
}

/// In-memory session store with idle expiry
pub struct SessionManager {
    sessions: RwLock<HashMap<String, Arc<Session>>>,
    idle_timeout: Duration,
}

impl SessionManager {
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            idle_timeout,
        }
    }

    /// Look up a session and mark it active
    pub fn get(&self, id: &str) -> Option<Arc<Session>> {
        self.cleanup_expired();
        let session = self.sessions.read().get(id).cloned()?;
        session.touch();
        Some(session)
    }

    /// Fetch an existing session, or build one via `make_agent`
    pub fn get_or_create(
        &self,
        id: &str,
        make_agent: impl FnOnce(&str) -> Arc<MeetingAgent>,
    ) -> Arc<Session> {
        if let Some(session) = self.get(id) {
            return session;
        }
        let session = Arc::new(Session::new(id, make_agent(id)));
        self.sessions.write().insert(id.to_string(), session.clone());
        tracing::info!(session_id = %id, "session created");
        session
    }

    pub fn remove(&self, id: &str) -> bool {
        self.sessions.write().remove(id).is_some()
    }

    pub fn list_ids(&self) -> Vec<String> {
        self.sessions.read().keys().cloned().collect()
    }

    pub fn count(&self) -> usize {
        self.sessions.read().len()
    }

    /// Drop sessions idle past the timeout
    pub fn cleanup_expired(&self) -> usize {
        let mut sessions = self.sessions.write();
        let before = sessions.len();
        sessions.retain(|id, session| {
            let keep = session.idle_for() < self.idle_timeout;
            if !keep {
                tracing::info!(session_id = %id, "session expired");
            }
            keep
        });
        before - sessions.len()
    }
}
