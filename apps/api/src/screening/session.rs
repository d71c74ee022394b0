//! Per-candidate session state and the in-memory registry that holds it.
//!
//! Fields are only writable from within `screening`; the orchestrator is the
//! sole mutator. Handlers get read access through the accessors.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::debug;
use uuid::Uuid;

use crate::screening::extractor::ExtractedText;
use crate::screening::verdict::Verdict;

/// Where a session sits in the screening flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    TextPending,
    TextReady,
    ExtractionFailed,
    Evaluating,
    Decided { selected: bool },
}

impl SessionState {
    pub fn label(self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::TextPending => "text_pending",
            SessionState::TextReady => "text_ready",
            SessionState::ExtractionFailed => "extraction_failed",
            SessionState::Evaluating => "evaluating",
            SessionState::Decided { .. } => "decided",
        }
    }
}

/// Identity of an uploaded document. Two uploads are the same document when
/// their content fingerprints match, whatever the file name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentIdentity {
    pub file_name: String,
    /// Hex-encoded SHA-256 of the document bytes.
    pub fingerprint: String,
    pub size_bytes: usize,
}

impl DocumentIdentity {
    pub fn of(file_name: &str, bytes: &[u8]) -> Self {
        Self {
            file_name: file_name.to_string(),
            fingerprint: hex::encode(Sha256::digest(bytes)),
            size_bytes: bytes.len(),
        }
    }

    pub fn same_document(&self, other: &DocumentIdentity) -> bool {
        self.fingerprint == other.fingerprint
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ApplicationSession {
    #[serde(rename = "session_id")]
    pub(super) id: Uuid,
    pub(super) state: SessionState,
    pub(super) document: Option<DocumentIdentity>,
    /// `None` until a document is uploaded; `Some(empty)` after a failed extraction.
    pub(super) resume_text: Option<ExtractedText>,
    pub(super) analysis_complete: bool,
    pub(super) is_selected: bool,
    pub(super) verdict: Option<Verdict>,
    pub(super) created_at: DateTime<Utc>,
    pub(super) updated_at: DateTime<Utc>,
}

impl ApplicationSession {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            state: SessionState::Idle,
            document: None,
            resume_text: None,
            analysis_complete: false,
            is_selected: false,
            verdict: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn state(&self) -> SessionState {
        self.state
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn document(&self) -> Option<&DocumentIdentity> {
        self.document.as_ref()
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn resume_text(&self) -> Option<&ExtractedText> {
        self.resume_text.as_ref()
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn analysis_complete(&self) -> bool {
        self.analysis_complete
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn is_selected(&self) -> bool {
        self.is_selected
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn verdict(&self) -> Option<&Verdict> {
        self.verdict.as_ref()
    }

    pub(super) fn transition(&mut self, next: SessionState) {
        self.state = next;
        self.updated_at = Utc::now();
    }

    /// Drops everything tied to the current document. Id and creation time survive.
    pub(super) fn clear(&mut self) {
        self.document = None;
        self.resume_text = None;
        self.analysis_complete = false;
        self.is_selected = false;
        self.verdict = None;
        self.transition(SessionState::Idle);
    }
}

impl Default for ApplicationSession {
    fn default() -> Self {
        Self::new()
    }
}

pub type SessionHandle = Arc<Mutex<ApplicationSession>>;

struct StoredSession {
    handle: SessionHandle,
    /// Last time the session was created or looked up.
    last_access: Instant,
}

/// Registry of live sessions. Each session has its own lock, so work on one
/// session never waits on another.
///
/// Sessions untouched for `idle_ttl` are evicted, unless a request currently
/// holds their lock.
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, StoredSession>>>,
    idle_ttl: Duration,
}

impl SessionStore {
    pub fn new(idle_ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            idle_ttl,
        }
    }

    pub async fn create(&self) -> SessionHandle {
        self.evict_idle().await;

        let session = ApplicationSession::new();
        let id = session.id;
        let handle = Arc::new(Mutex::new(session));
        self.sessions.write().await.insert(
            id,
            StoredSession {
                handle: handle.clone(),
                last_access: Instant::now(),
            },
        );
        handle
    }

    /// Looks a session up and counts the lookup as activity.
    pub async fn get(&self, id: Uuid) -> Option<SessionHandle> {
        let mut sessions = self.sessions.write().await;
        let stored = sessions.get_mut(&id)?;
        stored.last_access = Instant::now();
        Some(stored.handle.clone())
    }

    /// Forgets a session. An evaluation already running on it finishes against
    /// the detached handle and its result is discarded.
    pub async fn remove(&self, id: Uuid) -> bool {
        self.sessions.write().await.remove(&id).is_some()
    }

    /// Drops sessions idle for longer than the TTL. Returns how many went.
    pub async fn evict_idle(&self) -> usize {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, stored| {
            now.duration_since(stored.last_access) < self.idle_ttl
                || stored.handle.try_lock().is_err()
        });
        before - sessions.len()
    }

    /// Runs `evict_idle` every `every` until the runtime shuts down.
    pub fn spawn_sweeper(&self, every: Duration) -> JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let evicted = store.evict_idle().await;
                if evicted > 0 {
                    debug!(evicted, "Evicted idle sessions");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_is_idle_and_empty() {
        let session = ApplicationSession::new();
        assert_eq!(session.state(), SessionState::Idle);
        assert!(session.document().is_none());
        assert!(session.resume_text().is_none());
        assert!(!session.analysis_complete());
        assert!(!session.is_selected());
    }

    #[test]
    fn test_clear_keeps_identity() {
        let mut session = ApplicationSession::new();
        let id = session.id();
        session.document = Some(DocumentIdentity::of("cv.pdf", b"bytes"));
        session.resume_text = Some(ExtractedText::new("text"));
        session.analysis_complete = true;
        session.transition(SessionState::Decided { selected: true });

        session.clear();

        assert_eq!(session.id(), id);
        assert_eq!(session.state(), SessionState::Idle);
        assert!(session.document().is_none());
        assert!(session.resume_text().is_none());
        assert!(!session.analysis_complete());
    }

    #[test]
    fn test_document_identity_ignores_file_name() {
        let a = DocumentIdentity::of("cv.pdf", b"same bytes");
        let b = DocumentIdentity::of("renamed.pdf", b"same bytes");
        let c = DocumentIdentity::of("cv.pdf", b"other bytes");
        assert!(a.same_document(&b));
        assert!(!a.same_document(&c));
        assert_eq!(a.fingerprint.len(), 64);
    }

    #[test]
    fn test_state_serializes_with_status_tag() {
        let json = serde_json::to_value(SessionState::Decided { selected: false }).unwrap();
        assert_eq!(json, serde_json::json!({"status": "decided", "selected": false}));
        let json = serde_json::to_value(SessionState::TextReady).unwrap();
        assert_eq!(json, serde_json::json!({"status": "text_ready"}));
    }

    const TTL: Duration = Duration::from_secs(60);

    #[tokio::test]
    async fn test_store_create_get_remove() {
        let store = SessionStore::new(TTL);
        let handle = store.create().await;
        let id = handle.lock().await.id();

        assert!(store.get(id).await.is_some());
        assert!(store.remove(id).await);
        assert!(store.get(id).await.is_none());
        assert!(!store.remove(id).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_session_is_evicted() {
        let store = SessionStore::new(TTL);
        let stale = store.create().await.lock().await.id();
        tokio::time::advance(Duration::from_secs(45)).await;
        let fresh = store.create().await.lock().await.id();
        tokio::time::advance(Duration::from_secs(30)).await;

        assert_eq!(store.evict_idle().await, 1);
        assert!(store.get(stale).await.is_none());
        assert!(store.get(fresh).await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_lookup_keeps_session_alive() {
        let store = SessionStore::new(TTL);
        let id = store.create().await.lock().await.id();

        tokio::time::advance(Duration::from_secs(50)).await;
        assert!(store.get(id).await.is_some());
        tokio::time::advance(Duration::from_secs(50)).await;

        assert_eq!(store.evict_idle().await, 0);
        assert!(store.get(id).await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_in_use_is_not_evicted() {
        let store = SessionStore::new(TTL);
        let handle = store.create().await;
        let guard = handle.lock().await;
        let id = guard.id();

        tokio::time::advance(Duration::from_secs(120)).await;
        assert_eq!(store.evict_idle().await, 0);

        drop(guard);
        assert_eq!(store.evict_idle().await, 1);
        assert!(store.get(id).await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_evicts_abandoned_sessions() {
        let store = SessionStore::new(TTL);
        let sweeper = store.spawn_sweeper(Duration::from_secs(10));
        let id = store.create().await.lock().await.id();

        tokio::time::sleep(Duration::from_secs(75)).await;

        assert!(store.get(id).await.is_none());
        sweeper.abort();
    }
}
