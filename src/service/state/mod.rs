//! In-memory conversation and session store.
//!
//! Conversations are keyed by `(channel, thread root ts)`. Each one sits behind
//! its own async mutex, so messages in one thread are handled one at a time
//! while other threads proceed independently.
//!
//! Sessions are keyed by user. They carry the Jira issue a reporter's intake
//! is linked to, and any shared issues still waiting to be picked.

use std::{
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;
use tracing::debug;

use crate::{base::config::Config, interaction::conversation::Conversation};

// Types.

pub type ConversationKey = (String, String);
pub type ConversationHandle = Arc<Mutex<Conversation>>;

/// Whether a user's intake is tied to an incident issue yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    WaitingForIncident,
    Active,
}

/// A reporter's session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: String,
    pub state: SessionState,
    pub linked_issue_key: Option<String>,
    pub pending_incident_keys: Vec<String>,
    pub dm_channel: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn new(user_id: impl Into<String>) -> Self {
        let now = Utc::now();

        Self {
            user_id: user_id.into(),
            state: SessionState::WaitingForIncident,
            linked_issue_key: None,
            pending_incident_keys: Vec::new(),
            dm_channel: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    fn is_older_than(&self, max_age: Duration) -> bool {
        Utc::now() - self.created_at > max_age
    }
}

// Structs.

#[derive(Default)]
struct StateStoreInner {
    conversations: RwLock<HashMap<ConversationKey, ConversationHandle>>,
    sessions: RwLock<HashMap<String, Session>>,
}

/// Process-local state for conversations and sessions.
///
/// It is designed to be trivially cloneable, allowing it to be passed around
/// without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct StateStore {
    inner: Arc<StateStoreInner>,
    max_age: Duration,
}

impl StateStore {
    pub fn new(config: &Config) -> Self {
        Self::with_max_age_hours(config.session_max_age_hours)
    }

    pub fn with_max_age_hours(hours: u64) -> Self {
        Self {
            inner: Arc::new(StateStoreInner::default()),
            max_age: Duration::try_hours(i64::try_from(hours).unwrap_or(i64::MAX)).unwrap_or(Duration::MAX),
        }
    }

    // Conversations.

    /// The conversation of a thread, if one was started.
    pub fn conversation(&self, channel_id: &str, root_ts: &str) -> Option<ConversationHandle> {
        self.conversations().get(&key(channel_id, root_ts)).cloned()
    }

    /// Store a conversation for a thread, replacing any existing one, and return its handle.
    pub fn insert_conversation(&self, channel_id: &str, root_ts: &str, conversation: Conversation) -> ConversationHandle {
        let handle = Arc::new(Mutex::new(conversation));

        self.conversations_mut().insert(key(channel_id, root_ts), handle.clone());

        handle
    }

    /// Drop a thread's conversation.
    pub fn remove_conversation(&self, channel_id: &str, root_ts: &str) {
        self.conversations_mut().remove(&key(channel_id, root_ts));
    }

    // Sessions.

    /// A snapshot of the user's session, if any.
    pub fn session(&self, user_id: &str) -> Option<Session> {
        self.sessions().get(user_id).cloned()
    }

    /// The user's session, replaced by a fresh one when missing or older than the max age.
    pub fn get_or_create(&self, user_id: &str) -> Session {
        let mut sessions = self.sessions_mut();

        let stale = sessions.get(user_id).is_none_or(|s| s.is_older_than(self.max_age));
        if stale {
            debug!("Starting a new session for {}", user_id);
            sessions.insert(user_id.to_string(), Session::new(user_id));
        }

        sessions.get(user_id).cloned().unwrap_or_else(|| Session::new(user_id))
    }

    /// Start a fresh session for the user, replacing any existing one.
    pub fn create_session(&self, user_id: &str) -> Session {
        let session = Session::new(user_id);
        self.update(user_id, |s| *s = session.clone());
        session
    }

    /// Record the DM channel of the user's session, creating the session if needed.
    pub fn set_dm_channel(&self, user_id: &str, channel_id: &str) {
        self.get_or_create(user_id);
        self.update(user_id, |s| s.dm_channel = Some(channel_id.to_string()));
    }

    /// The session whose DM channel is `channel_id`.
    pub fn session_for_channel(&self, channel_id: &str) -> Option<Session> {
        self.sessions().values().find(|s| s.dm_channel.as_deref() == Some(channel_id)).cloned()
    }

    /// Link an issue: mark the session active and drop the key from the pending list.
    pub fn link_issue(&self, user_id: &str, issue_key: &str) {
        self.get_or_create(user_id);
        self.update(user_id, |s| {
            s.linked_issue_key = Some(issue_key.to_string());
            s.state = SessionState::Active;
            s.pending_incident_keys.retain(|k| k != issue_key);
        });
    }

    /// Put the session back to waiting for an incident.
    pub fn set_waiting(&self, user_id: &str) {
        self.update(user_id, |s| s.state = SessionState::WaitingForIncident);
    }

    /// Remember a shared issue the user may still want to link. Keys are kept once, in order.
    pub fn add_pending(&self, user_id: &str, issue_key: &str) {
        self.update(user_id, |s| {
            if !s.pending_incident_keys.iter().any(|k| k == issue_key) {
                s.pending_incident_keys.push(issue_key.to_string());
            }
        });
    }

    pub fn remove_session(&self, user_id: &str) {
        self.sessions_mut().remove(user_id);
    }

    /// Apply `change` to the user's session, creating it if needed.
    fn update(&self, user_id: &str, change: impl FnOnce(&mut Session)) {
        let mut sessions = self.sessions_mut();
        let session = sessions.entry(user_id.to_string()).or_insert_with(|| Session::new(user_id));
        change(session);
        session.touch();
    }

    // Locks.
    //
    // Every write is a single insert, remove or field change, so the maps stay
    // consistent when a holder panics and a poisoned lock is recovered.

    fn conversations(&self) -> RwLockReadGuard<'_, HashMap<ConversationKey, ConversationHandle>> {
        self.inner.conversations.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn conversations_mut(&self) -> RwLockWriteGuard<'_, HashMap<ConversationKey, ConversationHandle>> {
        self.inner.conversations.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn sessions(&self) -> RwLockReadGuard<'_, HashMap<String, Session>> {
        self.inner.sessions.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn sessions_mut(&self) -> RwLockWriteGuard<'_, HashMap<String, Session>> {
        self.inner.sessions.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn key(channel_id: &str, root_ts: &str) -> ConversationKey {
    (channel_id.to_string(), root_ts.to_string())
}
