//! In-memory authentication service.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::debug;
use typed_docstore::{
    AuthService, EmulatorOptions, StoreError, StoreResult, User, UserCredential,
};
use uuid::Uuid;

/// Issues a fresh anonymous user per sign-in.
///
/// `without_user()` builds a service whose sign-in succeeds at the transport
/// level but returns an empty credential.
pub struct MemoryAuth {
    issue_users: bool,
    users: RwLock<Vec<User>>,
    emulator: RwLock<Option<(String, EmulatorOptions)>>,
    offline: AtomicBool,
}

impl MemoryAuth {
    pub fn new() -> Self {
        Self {
            issue_users: true,
            users: RwLock::new(Vec::new()),
            emulator: RwLock::new(None),
            offline: AtomicBool::new(false),
        }
    }

    pub fn without_user() -> Self {
        Self {
            issue_users: false,
            ..Self::new()
        }
    }

    /// Every user issued so far, oldest first.
    pub fn users(&self) -> Vec<User> {
        self.users.read().clone()
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn emulator(&self) -> Option<(String, EmulatorOptions)> {
        self.emulator.read().clone()
    }
}

impl Default for MemoryAuth {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AuthService for MemoryAuth {
    async fn sign_in_anonymously(&self) -> StoreResult<UserCredential> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Transport("auth service unavailable".to_string()));
        }
        if !self.issue_users {
            return Ok(UserCredential { user: None });
        }

        let user = User {
            uid: Uuid::new_v4().simple().to_string(),
            is_anonymous: true,
        };
        self.users.write().push(user.clone());
        Ok(UserCredential { user: Some(user) })
    }

    fn connect_emulator(&self, url: &str, options: EmulatorOptions) {
        debug!(url, disable_warnings = options.disable_warnings, "auth routed to emulator");
        *self.emulator.write() = Some((url.to_string(), options));
    }
}
