use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::info;
use uuid::Uuid;

use crate::survey::interpreter::SurveySession;
use crate::survey::models::SurveyResponse;

/// A running survey plus what has been persisted for it so far.
#[derive(Debug)]
pub struct SessionEntry {
    pub user_id: Uuid,
    pub user_name: String,
    pub session: SurveySession,
    /// Set once the completed survey has been stored.
    pub response: Option<SurveyResponse>,
    pub profile_synced: bool,
    pub last_touched: Instant,
}

impl SessionEntry {
    pub fn new(user_id: Uuid, user_name: String, session: SurveySession) -> Self {
        Self {
            user_id,
            user_name,
            session,
            response: None,
            profile_synced: false,
            last_touched: Instant::now(),
        }
    }

    pub fn touch(&mut self) {
        self.last_touched = Instant::now();
    }
}

pub type SharedSession = Arc<Mutex<SessionEntry>>;

/// Sessions untouched for this long are dropped on the next insert.
pub const IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// In-progress sessions, keyed by session id. Each entry has its own lock so
/// one slow finalize never blocks other users.
#[derive(Clone)]
pub struct SessionRegistry {
    sessions: Arc<Mutex<HashMap<Uuid, SharedSession>>>,
    idle_timeout: Duration,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::with_idle_timeout(IDLE_TIMEOUT)
    }
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_idle_timeout(idle_timeout: Duration) -> Self {
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            idle_timeout,
        }
    }

    /// Registers a new session, first evicting abandoned ones.
    pub async fn insert(&self, entry: SessionEntry) -> (Uuid, SharedSession) {
        let id = Uuid::new_v4();
        let shared = Arc::new(Mutex::new(entry));
        let mut sessions = self.sessions.lock().await;

        let before = sessions.len();
        let idle_timeout = self.idle_timeout;
        // A locked entry is in use, so it is not idle.
        sessions.retain(|_, entry| match entry.try_lock() {
            Ok(entry) => entry.last_touched.elapsed() < idle_timeout,
            Err(_) => true,
        });
        let evicted = before - sessions.len();
        if evicted > 0 {
            info!(evicted, "Evicted idle survey sessions");
        }

        sessions.insert(id, shared.clone());
        (id, shared)
    }

    pub async fn get(&self, id: Uuid) -> Option<SharedSession> {
        self.sessions.lock().await.get(&id).cloned()
    }

    /// Drops the session. Nothing was persisted mid-flow, so there is
    /// nothing to roll back.
    pub async fn remove(&self, id: Uuid) -> bool {
        self.sessions.lock().await.remove(&id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }
}
