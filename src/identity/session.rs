//! In-memory sessions for the OAuth flow
//!
//! 会话 ID 放在 HttpOnly cookie 中，空闲超过 TTL 自动失效。
//! pending 状态在回调时只能被取走一次。

use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use moka::sync::Cache;
use parking_lot::Mutex;
use tracing::{debug, trace};

use super::Identity;
use crate::errors::{Result, SoplinkError};
use crate::tracking::ClickParams;

const MAX_SESSIONS: u64 = 100_000;

/// Click captured before the provider redirect.
#[derive(Debug, Clone)]
pub struct PendingAuth {
    pub state: String,
    pub click: ClickParams,
}

#[derive(Debug, Default)]
pub struct SessionData {
    pub identity: Option<Identity>,
    pub pending: Option<PendingAuth>,
    /// click attached to the session, processed by `/go`
    pub current: Option<ClickParams>,
}

impl SessionData {
    /// Remember `click` and return the anti-forgery `state` for the consent URL.
    pub fn begin_auth(&mut self, click: ClickParams) -> String {
        let state = generate_token();
        self.pending = Some(PendingAuth {
            state: state.clone(),
            click,
        });
        state
    }

    /// Take the pending click if `state` matches. Consumes it either way on a match.
    pub fn take_pending(&mut self, state: &str) -> Result<ClickParams> {
        match self.pending.as_ref() {
            None => Err(SoplinkError::session("no pending login for this session")),
            Some(p) if p.state != state => Err(SoplinkError::session("state mismatch")),
            Some(_) => Ok(self
                .pending
                .take()
                .map(|p| p.click)
                .unwrap_or_default()),
        }
    }

    pub fn complete_auth(&mut self, identity: Identity, click: ClickParams) {
        self.identity = Some(identity);
        self.current = Some(click);
    }
}

/// 32 bytes 随机数，URL safe Base64
pub fn generate_token() -> String {
    let bytes: [u8; 32] = rand::random();
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

pub type SessionHandle = Arc<Mutex<SessionData>>;

pub struct SessionStore {
    sessions: Cache<String, SessionHandle>,
}

impl SessionStore {
    pub fn new(idle_ttl: Duration) -> Self {
        let sessions = Cache::builder()
            .time_to_idle(idle_ttl)
            .max_capacity(MAX_SESSIONS)
            .build();
        Self { sessions }
    }

    pub fn get(&self, id: &str) -> Option<SessionHandle> {
        self.sessions.get(id)
    }

    /// Existing session for `id`, or a fresh one under a new id.
    pub fn get_or_create(&self, id: Option<&str>) -> (String, SessionHandle) {
        if let Some(id) = id
            && let Some(session) = self.sessions.get(id)
        {
            trace!("session reused");
            return (id.to_string(), session);
        }

        let id = generate_token();
        let session: SessionHandle = Arc::new(Mutex::new(SessionData::default()));
        self.sessions.insert(id.clone(), Arc::clone(&session));
        debug!("new session created");
        (id, session)
    }

    pub fn remove(&self, id: &str) {
        self.sessions.invalidate(id);
    }

    pub fn len(&self) -> u64 {
        self.sessions.run_pending_tasks();
        self.sessions.entry_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn click(sop: &str) -> ClickParams {
        ClickParams {
            sop: Some(sop.into()),
            target: Some("https://example.com/doc".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_tokens_are_unique_and_url_safe() {
        let a = generate_token();
        let b = generate_token();
        assert_ne!(a, b);
        assert_eq!(a.len(), 43);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn test_pending_consumed_once() {
        let mut data = SessionData::default();
        let state = data.begin_auth(click("SOP-1"));

        assert!(matches!(
            data.take_pending("forged"),
            Err(SoplinkError::Session(_))
        ));
        // 不匹配时不消费
        assert!(data.pending.is_some());

        let taken = data.take_pending(&state).unwrap();
        assert_eq!(taken.sop.as_deref(), Some("SOP-1"));
        assert!(matches!(
            data.take_pending(&state),
            Err(SoplinkError::Session(_))
        ));
    }

    #[test]
    fn test_store_get_or_create() {
        let store = SessionStore::new(Duration::from_secs(60));

        let (id, session) = store.get_or_create(None);
        session.lock().current = Some(click("SOP-1"));

        let (same_id, same) = store.get_or_create(Some(&id));
        assert_eq!(same_id, id);
        assert!(same.lock().current.is_some());

        let (other_id, _) = store.get_or_create(Some("unknown-session"));
        assert_ne!(other_id, "unknown-session");
        assert_eq!(store.len(), 2);

        store.remove(&id);
        assert!(store.get(&id).is_none());
    }
}
