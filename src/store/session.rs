use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

/// Signal from the authentication layer.
pub trait SessionSignal: Send + Sync {
    /// Whether an authenticated session is active right now.
    fn is_session_active(&self) -> bool;

    /// Identity of the signed-in user, if any.
    fn user_id(&self) -> Option<String>;
}

/// Session state set explicitly by the embedding application.
#[derive(Debug, Default)]
pub struct StaticSession {
    active: AtomicBool,
    user_id: RwLock<Option<String>>,
}

impl StaticSession {
    pub fn signed_out() -> Self {
        Self::default()
    }

    pub fn signed_in(user_id: impl Into<String>) -> Self {
        Self {
            active: AtomicBool::new(true),
            user_id: RwLock::new(Some(user_id.into())),
        }
    }

    pub fn sign_in(&self, user_id: impl Into<String>) {
        if let Ok(mut guard) = self.user_id.write() {
            *guard = Some(user_id.into());
        }
        self.active.store(true, Ordering::SeqCst);
    }

    pub fn sign_out(&self) {
        self.active.store(false, Ordering::SeqCst);
        if let Ok(mut guard) = self.user_id.write() {
            *guard = None;
        }
    }
}

impl SessionSignal for StaticSession {
    fn is_session_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    fn user_id(&self) -> Option<String> {
        self.user_id.read().ok().and_then(|guard| guard.clone())
    }
}
